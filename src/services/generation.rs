//! AI-augmented recommendation generation
//!
//! Primary tier: ask the suggestion collaborator for interest-specific
//! search phrases, then turn each phrase into one purchasable product via
//! the marketplace search collaborator. Any failure of the suggestion call
//! drops the whole batch down to the rule-based tier; the outcome records
//! which tier actually served the response.

use crate::{
    error::AppResult,
    models::{CatalogPick, CatalogProduct, GenerationTier, GiftFinderRequest, ScoredCandidate},
    services::fallback,
    services::providers::{ProductSearchProvider, SuggestionProvider},
    services::rate_limit::RateLimiter,
    services::scoring,
};

/// Results requested per AI phrase; only the top one is kept
const RESULTS_PER_SUGGESTION: usize = 3;

/// A generated batch plus the tier that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOutcome {
    pub tier: GenerationTier,
    pub candidates: Vec<ScoredCandidate>,
}

/// Generates candidates for a request, trying the AI tier first.
///
/// The fallback is total: either the whole batch comes from AI suggestions,
/// or the suggestion call failed and the whole batch comes from the
/// rule-based tier. Partial AI batches (some phrases without products) stay
/// AI-tier batches.
pub async fn generate(
    request: &GiftFinderRequest,
    exclude_names: &[String],
    suggestions: &dyn SuggestionProvider,
    search: &dyn ProductSearchProvider,
    limiter: &dyn RateLimiter,
    region: &str,
) -> GenerationOutcome {
    match generate_ai(request, exclude_names, suggestions, search, limiter, region).await {
        Ok(candidates) => {
            tracing::info!(
                candidates = candidates.len(),
                tier = "ai",
                "Generation served by AI tier"
            );
            GenerationOutcome {
                tier: GenerationTier::Ai,
                candidates,
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "AI tier failed, falling back to rules");
            let candidates =
                fallback::generate_fallback(request, exclude_names, search, limiter, region).await;
            tracing::info!(
                candidates = candidates.len(),
                tier = "rules",
                "Generation served by rule-based tier"
            );
            GenerationOutcome {
                tier: GenerationTier::Rules,
                candidates,
            }
        }
    }
}

/// The AI path proper: phrases from the collaborator, one product per phrase
async fn generate_ai(
    request: &GiftFinderRequest,
    exclude_names: &[String],
    suggestions: &dyn SuggestionProvider,
    search: &dyn ProductSearchProvider,
    limiter: &dyn RateLimiter,
    region: &str,
) -> AppResult<Vec<ScoredCandidate>> {
    let phrases = suggestions.suggest_phrases(request, exclude_names).await?;
    let mut candidates = Vec::new();

    for suggestion in phrases {
        limiter.acquire().await;

        let results = match search
            .search_products(&suggestion.search_phrase, RESULTS_PER_SUGGESTION, region)
            .await
        {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!(
                    phrase = %suggestion.search_phrase,
                    error = %e,
                    "Search failed for AI phrase, skipping"
                );
                continue;
            }
        };

        // Top-ranked non-excluded result only; a phrase with no products is
        // dropped silently and does not fail the batch
        let Some(result) = results
            .into_iter()
            .find(|r| !fallback::is_excluded(&r.title, exclude_names))
        else {
            tracing::debug!(phrase = %suggestion.search_phrase, "No product for AI phrase");
            continue;
        };

        // The AI-provided score is trusted verbatim in this path
        candidates.push(ScoredCandidate {
            product: result.into_candidate(&suggestion.category, request),
            reasoning: suggestion.reasoning,
            score: suggestion.relevance_score,
            search_phrase: suggestion.search_phrase,
        });
    }

    Ok(candidates)
}

/// Catalog-pick path for "load more": asks the collaborator to choose from
/// an already-stored product slice, falling back to relevance-scored
/// selection with template reasoning when the suggestion call fails.
pub async fn pick_from_catalog(
    request: &GiftFinderRequest,
    catalog: &[CatalogProduct],
    max_picks: usize,
    suggestions: &dyn SuggestionProvider,
) -> (GenerationTier, Vec<CatalogPick>) {
    match suggestions.pick_from_catalog(request, catalog, max_picks).await {
        Ok(picks) => (GenerationTier::Ai, picks),
        Err(e) => {
            tracing::warn!(error = %e, "Catalog picks failed, falling back to scored selection");
            (GenerationTier::Rules, scored_picks(request, catalog, max_picks))
        }
    }
}

/// Rule-based catalog selection: relevance score ordering, template reasoning
fn scored_picks(
    request: &GiftFinderRequest,
    catalog: &[CatalogProduct],
    max_picks: usize,
) -> Vec<CatalogPick> {
    let mut scored: Vec<(i32, &CatalogProduct)> = catalog
        .iter()
        .map(|p| (scoring::score(request, &p.as_candidate()), p))
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));

    scored
        .into_iter()
        .take(max_picks)
        .enumerate()
        .map(|(index, (score, product))| CatalogPick {
            product_id: product.id,
            reasoning: fallback::reasoning_for(&product.name, index),
            score,
        })
        .collect()
}
