use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A recipient profile submitted to the gift finder.
///
/// Immutable once submitted; one request defines one recommendation
/// session's intent, including all "load more" continuations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GiftFinderRequest {
    #[serde(default)]
    pub recipient_name: Option<String>,
    #[serde(default)]
    pub age: Option<i32>,
    pub relationship: String,
    pub interests: Vec<String>,
    #[serde(default)]
    pub personality: Option<String>,
    pub budget: String,
    pub occasion: String,
}

impl GiftFinderRequest {
    /// Checks required profile fields before any external call is made.
    pub fn validate(&self) -> Result<(), String> {
        if self.relationship.trim().is_empty() {
            return Err("relationship is required".to_string());
        }
        if self.interests.iter().all(|i| i.trim().is_empty()) {
            return Err("at least one interest is required".to_string());
        }
        if self.budget.trim().is_empty() {
            return Err("budget is required".to_string());
        }
        if self.occasion.trim().is_empty() {
            return Err("occasion is required".to_string());
        }
        Ok(())
    }
}

// ============================================================================
// Budget buckets
// ============================================================================

/// Fixed price-range labels used for both user input and scoring.
/// The top bucket is open-ended.
pub const BUDGET_BUCKETS: [(&str, f64, Option<f64>); 5] = [
    ("Under ₹500", 0.0, Some(500.0)),
    ("₹500 - ₹2000", 500.0, Some(2000.0)),
    ("₹2000 - ₹5000", 2000.0, Some(5000.0)),
    ("₹5000 - ₹10000", 5000.0, Some(10000.0)),
    ("₹10000+", 10000.0, None),
];

/// Resolves a budget label to its numeric `[min, max]` range.
/// Unknown labels resolve to `None` and contribute nothing to scoring.
pub fn budget_range(label: &str) -> Option<(f64, Option<f64>)> {
    BUDGET_BUCKETS
        .iter()
        .find(|(name, _, _)| *name == label)
        .map(|(_, min, max)| (*min, *max))
}

// ============================================================================
// Products
// ============================================================================

/// Marketplace badges carried through to the client
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Badges {
    pub prime: bool,
    pub best_seller: bool,
    pub featured: bool,
}

/// A product under consideration for recommendation, from either a live
/// marketplace search or the stored catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidateProduct {
    pub name: String,
    pub description: String,
    pub category: String,
    pub price_min: f64,
    pub price_max: f64,
    /// Marketplace-formatted price for display, e.g. "₹1,499"
    pub price_label: String,
    pub currency: String,
    pub image_url: Option<String>,
    /// Where the item can be bought; distinct from any catalog identifier
    pub marketplace_url: Option<String>,
    pub interest_tags: Vec<String>,
    pub occasion_tags: Vec<String>,
    pub relationship_tags: Vec<String>,
    pub badges: Badges,
    pub rating: Option<f64>,
    pub rating_count: Option<i64>,
}

/// A candidate paired with its reasoning and relevance score
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScoredCandidate {
    pub product: CandidateProduct,
    pub reasoning: String,
    /// 0-100
    pub score: i32,
    /// The search phrase that surfaced this product
    pub search_phrase: String,
}

/// Which generation tier served a batch
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GenerationTier {
    Ai,
    Rules,
}

// ============================================================================
// Suggestion collaborator wire types
// ============================================================================

/// One suggestion returned by the generative-language collaborator
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct GiftSuggestion {
    pub search_phrase: String,
    pub reasoning: String,
    /// 1-100, trusted verbatim in the AI path
    pub relevance_score: i32,
    #[serde(default)]
    pub category: String,
}

/// A catalog selection made by the suggestion collaborator for "load more"
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct CatalogPick {
    pub product_id: Uuid,
    pub reasoning: String,
    /// 1-100
    pub score: i32,
}

// ============================================================================
// Product search collaborator wire types
// ============================================================================

/// Raw search result from the marketplace search API
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResult {
    #[serde(rename = "product_title")]
    pub title: String,
    #[serde(default, rename = "product_price")]
    pub price: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default, rename = "product_star_rating")]
    pub rating: Option<String>,
    #[serde(default, rename = "product_num_ratings")]
    pub rating_count: Option<i64>,
    #[serde(default, rename = "product_url")]
    pub url: Option<String>,
    #[serde(default, rename = "product_photo")]
    pub photo: Option<String>,
    #[serde(default)]
    pub is_prime: bool,
    #[serde(default)]
    pub is_best_seller: bool,
    #[serde(default)]
    pub is_amazon_choice: bool,
}

/// Extracts a numeric amount from a marketplace price string like "₹1,499.00"
pub fn parse_price(price: &str) -> Option<f64> {
    let cleaned: String = price
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    cleaned.parse::<f64>().ok()
}

impl SearchResult {
    /// Converts a live search hit into a candidate under a given category.
    /// Tags are inherited from the request that triggered the search, since
    /// the marketplace knows nothing about interests or occasions.
    pub fn into_candidate(self, category: &str, request: &GiftFinderRequest) -> CandidateProduct {
        let amount = self
            .price
            .as_deref()
            .and_then(parse_price)
            .unwrap_or_default();
        CandidateProduct {
            description: self.title.clone(),
            name: self.title,
            category: category.to_string(),
            price_min: amount,
            price_max: amount,
            price_label: self.price.unwrap_or_default(),
            currency: self.currency.unwrap_or_else(|| "INR".to_string()),
            image_url: self.photo,
            marketplace_url: self.url,
            interest_tags: request.interests.clone(),
            occasion_tags: vec![request.occasion.clone()],
            relationship_tags: vec![request.relationship.clone()],
            badges: Badges {
                prime: self.is_prime,
                best_seller: self.is_best_seller,
                featured: self.is_amazon_choice,
            },
            rating: self.rating.as_deref().and_then(|r| r.parse().ok()),
            rating_count: self.rating_count,
        }
    }
}

// ============================================================================
// Persisted records
// ============================================================================

/// Minimal catalog record persisted once a candidate is attached to a
/// recommendation
#[derive(Debug, Clone, Serialize, sqlx::FromRow, PartialEq)]
pub struct CatalogProduct {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category: String,
    pub price_min: f64,
    pub price_max: f64,
    pub price_label: String,
    pub currency: String,
    pub image_url: Option<String>,
    pub marketplace_url: Option<String>,
    pub interest_tags: Vec<String>,
    pub occasion_tags: Vec<String>,
    pub relationship_tags: Vec<String>,
    pub prime: bool,
    pub best_seller: bool,
    pub featured: bool,
}

impl CatalogProduct {
    pub fn badges(&self) -> Badges {
        Badges {
            prime: self.prime,
            best_seller: self.best_seller,
            featured: self.featured,
        }
    }

    /// View of the stored record as a scoring candidate
    pub fn as_candidate(&self) -> CandidateProduct {
        CandidateProduct {
            name: self.name.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            price_min: self.price_min,
            price_max: self.price_max,
            price_label: self.price_label.clone(),
            currency: self.currency.clone(),
            image_url: self.image_url.clone(),
            marketplace_url: self.marketplace_url.clone(),
            interest_tags: self.interest_tags.clone(),
            occasion_tags: self.occasion_tags.clone(),
            relationship_tags: self.relationship_tags.clone(),
            badges: self.badges(),
            rating: None,
            rating_count: None,
        }
    }
}

/// A persisted gift-finder session with its immutable request facts.
/// The request is written once at creation and read back by extension
/// operations, never rederived from recommendation rows.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, PartialEq)]
pub struct GiftSession {
    pub id: Uuid,
    pub recipient_name: Option<String>,
    pub age: Option<i32>,
    pub relationship: String,
    pub interests: Vec<String>,
    pub personality: Option<String>,
    pub budget: String,
    pub occasion: String,
    pub created_at: DateTime<Utc>,
}

impl GiftSession {
    pub fn request(&self) -> GiftFinderRequest {
        GiftFinderRequest {
            recipient_name: self.recipient_name.clone(),
            age: self.age,
            relationship: self.relationship.clone(),
            interests: self.interests.clone(),
            personality: self.personality.clone(),
            budget: self.budget.clone(),
            occasion: self.occasion.clone(),
        }
    }
}

/// A (session, product) pairing with reasoning and score.
/// Updated only to add or replace the personal message.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, PartialEq)]
pub struct Recommendation {
    pub id: Uuid,
    pub session_id: Uuid,
    pub product_id: Uuid,
    pub reasoning: String,
    pub score: i32,
    pub personal_message: Option<String>,
    pub marketplace_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields for a new recommendation row
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecommendation {
    pub session_id: Uuid,
    pub product_id: Uuid,
    pub reasoning: String,
    pub score: i32,
    pub marketplace_url: Option<String>,
}
