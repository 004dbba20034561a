use crate::models::{budget_range, CandidateProduct, GiftFinderRequest};

/// Scores a candidate product against a recipient request.
///
/// Deterministic, side-effect-free, additive:
/// - interest overlap contributes up to 40 points (proportional),
/// - an occasion match contributes 20,
/// - a relationship match contributes 20,
/// - budget fit contributes 20 (fully inside the bucket) or 10 (overlap).
///
/// The sum is rounded once at the end, never per term, and capped at 100.
pub fn score(request: &GiftFinderRequest, product: &CandidateProduct) -> i32 {
    let mut total = interest_points(request, product);

    if product
        .occasion_tags
        .iter()
        .any(|o| o.eq_ignore_ascii_case(&request.occasion))
    {
        total += 20.0;
    }

    if !product.relationship_tags.is_empty()
        && product
            .relationship_tags
            .iter()
            .any(|r| r.eq_ignore_ascii_case(&request.relationship))
    {
        total += 20.0;
    }

    total += budget_points(&request.budget, product.price_min, product.price_max);

    (total.round() as i32).min(100)
}

/// Proportional interest overlap, up to 40 points
fn interest_points(request: &GiftFinderRequest, product: &CandidateProduct) -> f64 {
    let overlap = request
        .interests
        .iter()
        .filter(|interest| {
            product
                .interest_tags
                .iter()
                .any(|tag| tag.eq_ignore_ascii_case(interest))
        })
        .count();

    (overlap as f64 / request.interests.len().max(1) as f64) * 40.0
}

/// Budget fit points for a product price range against a budget bucket.
///
/// Fully inside the bucket: 20. Partial overlap: 10. Disjoint or unknown
/// bucket label: 0. The top bucket is open-ended upward.
pub fn budget_points(budget: &str, price_min: f64, price_max: f64) -> f64 {
    let Some((min, max)) = budget_range(budget) else {
        return 0.0;
    };

    match max {
        Some(max) => {
            if price_min >= min && price_max <= max {
                20.0
            } else if price_max >= min && price_min <= max {
                10.0
            } else {
                0.0
            }
        }
        None => {
            if price_min >= min {
                20.0
            } else if price_max >= min {
                10.0
            } else {
                0.0
            }
        }
    }
}

/// Whether a price range earns any budget points at all.
/// Used to pre-filter catalog candidates for "load more".
pub fn budget_compatible(budget: &str, price_min: f64, price_max: f64) -> bool {
    budget_points(budget, price_min, price_max) > 0.0
}
