//! Rule-based suggestion tier
//!
//! Deterministic fallback used when the suggestion collaborator is
//! unavailable: stated interests map to canned search phrases, each phrase
//! is searched on the marketplace, and reasoning comes from a fixed template
//! pool selected by hashing the product title. No randomness anywhere; the
//! same inputs always produce the same batch.

use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use crate::{
    models::{GiftFinderRequest, ScoredCandidate},
    services::providers::ProductSearchProvider,
    services::rate_limit::RateLimiter,
};

/// At most this many phrases are searched per batch
const MAX_PHRASES: usize = 10;

/// Results requested per phrase; the first non-excluded one is kept
const RESULTS_PER_PHRASE: usize = 5;

/// Base relevance for rule-generated candidates
const BASE_SCORE: i32 = 70;

/// Search phrases per known interest keyword.
///
/// Every phrase literally contains its interest keyword: a request for
/// "Cricket" yields cricket-specific phrases, never generic sports ones.
const INTEREST_PHRASES: &[(&str, &[&str])] = &[
    (
        "Cricket",
        &[
            "cricket bat kashmir willow",
            "cricket kit bag",
            "cricket batting gloves",
            "cricket helmet",
            "cricket jersey india",
            "cricket training ball set",
        ],
    ),
    (
        "Technology",
        &[
            "technology gadget gifts",
            "smart home technology device",
            "wearable technology fitness band",
            "technology accessories organizer",
        ],
    ),
    (
        "Cooking",
        &[
            "cooking utensil set",
            "cooking apron personalized",
            "indian cooking spice box",
            "cooking recipe stand",
            "non-stick cooking pan set",
        ],
    ),
    (
        "Reading",
        &[
            "reading lamp rechargeable",
            "reading book stand",
            "reading journal leather",
            "bookmarks reading accessories",
        ],
    ),
    (
        "Music",
        &[
            "music bluetooth speaker",
            "music headphones over ear",
            "music vinyl record player",
            "sheet music stand",
            "music themed mug",
        ],
    ),
    (
        "Fitness",
        &[
            "fitness resistance bands set",
            "fitness yoga mat",
            "fitness smartwatch tracker",
            "fitness shaker bottle",
            "home fitness dumbbell set",
        ],
    ),
    (
        "Travel",
        &[
            "travel backpack anti theft",
            "travel neck pillow memory foam",
            "travel organizer pouch set",
            "travel journal with map",
            "universal travel adapter",
        ],
    ),
    (
        "Gaming",
        &[
            "gaming mouse rgb",
            "gaming headset with mic",
            "gaming keyboard mechanical",
            "gaming chair cushion",
        ],
    ),
    (
        "Art",
        &[
            "art supplies sketching kit",
            "art easel tabletop",
            "art acrylic paint set",
            "wall art home decor",
        ],
    ),
    (
        "Photography",
        &[
            "photography tripod phone",
            "photography ring light",
            "photography camera bag",
            "instant photography camera",
        ],
    ),
    (
        "Fashion",
        &[
            "fashion jewellery set",
            "fashion sunglasses unisex",
            "fashion handbag women",
            "fashion watch analog",
        ],
    ),
    (
        "Gardening",
        &[
            "gardening tool kit",
            "gardening gloves set",
            "indoor gardening planter",
            "gardening seeds combo",
        ],
    ),
];

/// Used when no stated interest matches any known keyword
const GENERIC_PHRASES: &[(&str, &str)] = &[
    ("gift hamper premium", "Gifts"),
    ("personalized photo frame gift", "Gifts"),
    ("scented candle gift set", "Gifts"),
    ("coffee mug gift box", "Gifts"),
];

/// Reasoning template pool; `{}` receives the product name
const REASONING_TEMPLATES: &[&str] = &[
    "{} lines up with what they already love spending time on.",
    "A practical pick: {} is something they would use again and again.",
    "{} is a crowd-pleaser for this occasion and fits the budget.",
    "For someone with their interests, {} is an easy win.",
    "{} adds something new to a hobby they already enjoy.",
];

/// Builds the deduplicated, capped phrase list for a request.
/// Returns (phrase, category) pairs; category is the matched interest.
fn collect_phrases(request: &GiftFinderRequest) -> Vec<(String, String)> {
    let mut phrases = Vec::new();
    let mut seen = HashSet::new();

    for interest in &request.interests {
        let mapped = INTEREST_PHRASES
            .iter()
            .find(|(keyword, _)| keyword.eq_ignore_ascii_case(interest.trim()));

        // Unmapped interests are simply skipped
        let Some((keyword, interest_phrases)) = mapped else {
            continue;
        };

        for phrase in *interest_phrases {
            if seen.insert(*phrase) {
                phrases.push((phrase.to_string(), keyword.to_string()));
            }
        }
    }

    if phrases.is_empty() {
        for (phrase, category) in GENERIC_PHRASES {
            phrases.push((phrase.to_string(), category.to_string()));
        }
    }

    phrases.truncate(MAX_PHRASES);
    phrases
}

/// Case-insensitive substring match in either direction, so "Kindle
/// Paperwhite 11th Gen" is excluded by a prior "Kindle Paperwhite"
pub fn is_excluded(title: &str, exclude_names: &[String]) -> bool {
    let title = title.to_lowercase();
    exclude_names.iter().any(|name| {
        let name = name.to_lowercase();
        !name.is_empty() && (title.contains(&name) || name.contains(&title))
    })
}

/// Deterministic template selection: hash(title, index) mod pool size.
/// Reproducible by design so the same product at the same position always
/// gets the same reasoning.
pub fn reasoning_for(title: &str, index: usize) -> String {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    title.hash(&mut hasher);
    index.hash(&mut hasher);
    let template = REASONING_TEMPLATES[(hasher.finish() as usize) % REASONING_TEMPLATES.len()];
    template.replace("{}", title)
}

/// Generates fallback candidates by searching each rule-derived phrase.
///
/// One failed phrase search is logged and skipped; the batch continues.
/// Returns an empty list when every phrase fails or every result is
/// excluded — the caller surfaces that as a not-found condition.
pub async fn generate_fallback(
    request: &GiftFinderRequest,
    exclude_names: &[String],
    search: &dyn ProductSearchProvider,
    limiter: &dyn RateLimiter,
    region: &str,
) -> Vec<ScoredCandidate> {
    let phrases = collect_phrases(request);
    let mut candidates = Vec::new();

    for (phrase, category) in &phrases {
        limiter.acquire().await;

        let results = match search.search_products(phrase, RESULTS_PER_PHRASE, region).await {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!(phrase = %phrase, error = %e, "Fallback search failed, skipping phrase");
                continue;
            }
        };

        let survivor = results
            .into_iter()
            .find(|r| !is_excluded(&r.title, exclude_names));

        let Some(result) = survivor else {
            tracing::debug!(phrase = %phrase, "No non-excluded result for phrase");
            continue;
        };

        let index = candidates.len();
        let reasoning = reasoning_for(&result.title, index);
        let score = BASE_SCORE
            + if result.is_prime { 5 } else { 0 }
            + if result.is_best_seller { 5 } else { 0 };

        candidates.push(ScoredCandidate {
            product: result.into_candidate(category, request),
            reasoning,
            score,
            search_phrase: phrase.clone(),
        });
    }

    tracing::info!(
        phrases = phrases.len(),
        candidates = candidates.len(),
        "Rule-based generation completed"
    );

    candidates
}
