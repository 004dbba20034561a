//! Recommendation session assembly
//!
//! Ties the generation tiers to persistence: a gift-finder request becomes a
//! session row plus one recommendation row per surviving candidate, and
//! "load more" extends an existing session from the stored catalog while
//! never repeating a product already shown.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::{
    db::GiftStore,
    error::{AppError, AppResult},
    models::{Badges, CandidateProduct, CatalogProduct, GenerationTier, GiftFinderRequest,
        NewRecommendation, Recommendation, ScoredCandidate},
    services::generation,
    services::providers::{MessageProvider, ProductSearchProvider, SuggestionProvider},
    services::rate_limit::RateLimiter,
    services::scoring,
};

/// Catalog candidates offered to the collaborator per "load more" call
const CATALOG_SHORTLIST: usize = 30;

/// Recommendations added per "load more" call
const MAX_EXTENSION_PICKS: usize = 8;

/// Catalog candidates below this relevance are never offered
const MIN_CATALOG_SCORE: i32 = 30;

/// One recommendation enriched for display
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RecommendationView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub description: String,
    pub category: String,
    pub price_label: String,
    pub currency: String,
    pub image_url: Option<String>,
    pub marketplace_url: Option<String>,
    pub badges: Badges,
    pub reasoning: String,
    pub score: i32,
    pub personal_message: Option<String>,
}

impl RecommendationView {
    fn build(rec: &Recommendation, product: &CatalogProduct) -> Self {
        Self {
            id: rec.id,
            product_id: product.id,
            name: product.name.clone(),
            description: product.description.clone(),
            category: product.category.clone(),
            price_label: product.price_label.clone(),
            currency: product.currency.clone(),
            image_url: product.image_url.clone(),
            marketplace_url: rec
                .marketplace_url
                .clone()
                .or_else(|| product.marketplace_url.clone()),
            badges: product.badges(),
            reasoning: rec.reasoning.clone(),
            score: rec.score,
            personal_message: rec.personal_message.clone(),
        }
    }
}

/// Result of creating a session
#[derive(Debug, Serialize)]
pub struct SessionOutcome {
    pub session_id: Uuid,
    pub tier: GenerationTier,
    pub recommendations: Vec<RecommendationView>,
}

/// Result of extending a session
#[derive(Debug, Serialize)]
pub struct ExtensionOutcome {
    pub tier: GenerationTier,
    pub recommendations: Vec<RecommendationView>,
}

/// A session read back for the client
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub request: GiftFinderRequest,
    pub recommendations: Vec<RecommendationView>,
}

/// The assembler and its collaborators
pub struct GiftService {
    store: Arc<dyn GiftStore>,
    suggestions: Arc<dyn SuggestionProvider>,
    search: Arc<dyn ProductSearchProvider>,
    messages: Arc<dyn MessageProvider>,
    limiter: Arc<dyn RateLimiter>,
    region: String,
}

impl GiftService {
    pub fn new(
        store: Arc<dyn GiftStore>,
        suggestions: Arc<dyn SuggestionProvider>,
        search: Arc<dyn ProductSearchProvider>,
        messages: Arc<dyn MessageProvider>,
        limiter: Arc<dyn RateLimiter>,
        region: String,
    ) -> Self {
        Self {
            store,
            suggestions,
            search,
            messages,
            limiter,
            region,
        }
    }

    /// Creates a recommendation session from a gift-finder request.
    ///
    /// Validation happens before any external call. A request that yields
    /// zero candidates creates no session at all.
    pub async fn create_session(&self, request: &GiftFinderRequest) -> AppResult<SessionOutcome> {
        request
            .validate()
            .map_err(AppError::InvalidInput)?;

        let outcome = generation::generate(
            request,
            &[],
            self.suggestions.as_ref(),
            self.search.as_ref(),
            self.limiter.as_ref(),
            &self.region,
        )
        .await;

        if outcome.candidates.is_empty() {
            return Err(AppError::NotFound(
                "Couldn't find suitable gifts for this profile".to_string(),
            ));
        }

        let session = self.store.insert_session(request).await?;
        let mut views = Vec::new();

        // Each row is written on its own; one failed write drops that
        // candidate, not the batch
        for candidate in &outcome.candidates {
            match self.persist_candidate(session.id, candidate).await {
                Ok(view) => views.push(view),
                Err(e) => {
                    tracing::warn!(
                        product = %candidate.product.name,
                        error = %e,
                        "Failed to persist recommendation, skipping"
                    );
                }
            }
        }

        if views.is_empty() {
            return Err(AppError::Internal(
                "Failed to persist any recommendations".to_string(),
            ));
        }

        tracing::info!(
            session_id = %session.id,
            recommendations = views.len(),
            tier = ?outcome.tier,
            "Session created"
        );

        Ok(SessionOutcome {
            session_id: session.id,
            tier: outcome.tier,
            recommendations: views,
        })
    }

    async fn persist_candidate(
        &self,
        session_id: Uuid,
        candidate: &ScoredCandidate,
    ) -> AppResult<RecommendationView> {
        let product = self.store.upsert_product(&candidate.product).await?;
        let rec = self
            .store
            .insert_recommendation(&NewRecommendation {
                session_id,
                product_id: product.id,
                reasoning: candidate.reasoning.clone(),
                score: candidate.score.clamp(0, 100),
                marketplace_url: candidate.product.marketplace_url.clone(),
            })
            .await?;

        Ok(RecommendationView::build(&rec, &product))
    }

    /// Adds up to eight recommendations to an existing session from the
    /// stored catalog, never repeating a product already shown.
    pub async fn extend_session(&self, session_id: Uuid) -> AppResult<ExtensionOutcome> {
        let session = self
            .store
            .fetch_session(session_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;

        let existing = self.store.session_recommendations(session_id).await?;
        if existing.is_empty() {
            // Nothing was ever recommended here; bail before touching any
            // external collaborator
            return Err(AppError::NotFound(
                "Session has no recommendations to extend".to_string(),
            ));
        }

        let shown: HashSet<Uuid> = existing.iter().map(|r| r.product_id).collect();
        let request = session.request();

        let catalog = self.store.list_catalog().await?;
        let mut shortlist: Vec<(i32, CatalogProduct)> = catalog
            .into_iter()
            .filter(|p| !shown.contains(&p.id))
            .filter(|p| scoring::budget_compatible(&request.budget, p.price_min, p.price_max))
            .filter_map(|p| {
                let score = scoring::score(&request, &p.as_candidate());
                (score > MIN_CATALOG_SCORE).then_some((score, p))
            })
            .collect();
        shortlist.sort_by(|a, b| b.0.cmp(&a.0));
        shortlist.truncate(CATALOG_SHORTLIST);

        if shortlist.is_empty() {
            return Err(AppError::Exhausted(
                "No more gift ideas left for this session".to_string(),
            ));
        }

        let candidates: Vec<CatalogProduct> = shortlist.into_iter().map(|(_, p)| p).collect();
        let (tier, picks) = generation::pick_from_catalog(
            &request,
            &candidates,
            MAX_EXTENSION_PICKS,
            self.suggestions.as_ref(),
        )
        .await;

        let mut views = Vec::new();
        let mut persisted: HashSet<Uuid> = shown.clone();

        for pick in picks {
            // Belt and braces: the shortlist already omitted shown products,
            // but the collaborator's output is not trusted on this invariant
            if !persisted.insert(pick.product_id) {
                tracing::debug!(product_id = %pick.product_id, "Pick already shown, dropping");
                continue;
            }

            let Some(product) = candidates.iter().find(|p| p.id == pick.product_id) else {
                continue;
            };

            match self
                .store
                .insert_recommendation(&NewRecommendation {
                    session_id,
                    product_id: product.id,
                    reasoning: pick.reasoning.clone(),
                    score: pick.score.clamp(0, 100),
                    marketplace_url: product.marketplace_url.clone(),
                })
                .await
            {
                Ok(rec) => views.push(RecommendationView::build(&rec, product)),
                Err(e) => {
                    tracing::warn!(product_id = %product.id, error = %e, "Failed to persist extension row");
                }
            }
        }

        if views.is_empty() {
            return Err(AppError::Exhausted(
                "No more gift ideas left for this session".to_string(),
            ));
        }

        tracing::info!(
            session_id = %session_id,
            added = views.len(),
            tier = ?tier,
            "Session extended"
        );

        Ok(ExtensionOutcome {
            tier,
            recommendations: views,
        })
    }

    /// Reads a session and its recommendations back for the client
    pub async fn session_view(&self, session_id: Uuid) -> AppResult<SessionView> {
        let session = self
            .store
            .fetch_session(session_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;

        let mut views = Vec::new();
        for rec in self.store.session_recommendations(session_id).await? {
            if let Some(product) = self.store.fetch_product(rec.product_id).await? {
                views.push(RecommendationView::build(&rec, &product));
            }
        }

        Ok(SessionView {
            session_id,
            request: session.request(),
            recommendations: views,
        })
    }

    /// (Re)generates the personal message for a recommendation.
    ///
    /// Always calls the collaborator, always overwrites the stored message;
    /// on collaborator failure a deterministic template is stored instead.
    pub async fn regenerate_message(&self, recommendation_id: Uuid) -> AppResult<String> {
        let rec = self
            .store
            .fetch_recommendation(recommendation_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Recommendation not found".to_string()))?;

        let session = self
            .store
            .fetch_session(rec.session_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;

        let product = self
            .store
            .fetch_product(rec.product_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

        let request = session.request();
        let candidate = product.as_candidate();

        let message = match self
            .messages
            .compose_message(&request, &candidate, &rec.reasoning)
            .await
        {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(error = %e, "Message generation failed, using template");
                template_message(&request, &candidate)
            }
        };

        self.store
            .set_personal_message(recommendation_id, &message)
            .await?;

        Ok(message)
    }
}

/// Deterministic message used when the collaborator fails
fn template_message(request: &GiftFinderRequest, product: &CandidateProduct) -> String {
    let recipient = request.recipient_name.as_deref().unwrap_or("there");
    format!(
        "Happy {}, {}! I saw this {} and instantly thought of you. Hope you love it!",
        request.occasion, recipient, product.name
    )
}
