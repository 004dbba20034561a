/// External collaborator abstractions
///
/// This module provides a pluggable architecture for the three upstream
/// services the gift finder orchestrates: the generative-language API that
/// produces suggestions and personal messages, and the marketplace search
/// API that turns search phrases into purchasable products. Each is a trait
/// so the generation pipeline can be exercised against mocks.
use crate::{
    error::AppResult,
    models::{CandidateProduct, CatalogPick, CatalogProduct, GiftFinderRequest, GiftSuggestion,
        SearchResult},
};

pub mod amazon;
pub mod gemini;

#[cfg(test)]
use mockall::automock;

/// Generative-language collaborator for gift suggestions
///
/// The primary path asks for interest-specific search phrases; the catalog
/// path asks the collaborator to pick and explain items from an already
/// stored product list ("load more").
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait SuggestionProvider: Send + Sync {
    /// Generate 10-12 short search phrases with reasoning and relevance.
    ///
    /// Phrases must stay specific to the stated interests; names listed in
    /// `exclude_names` have already been shown and must not be repeated.
    async fn suggest_phrases(
        &self,
        request: &GiftFinderRequest,
        exclude_names: &[String],
    ) -> AppResult<Vec<GiftSuggestion>>;

    /// Pick up to `max_picks` products from a catalog slice and explain each
    async fn pick_from_catalog(
        &self,
        request: &GiftFinderRequest,
        catalog: &[CatalogProduct],
        max_picks: usize,
    ) -> AppResult<Vec<CatalogPick>>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Marketplace product search collaborator
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait ProductSearchProvider: Send + Sync {
    /// Search purchasable products for a query phrase
    async fn search_products(
        &self,
        query: &str,
        max_results: usize,
        region: &str,
    ) -> AppResult<Vec<SearchResult>>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Generative-language collaborator for short personal gift messages
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait MessageProvider: Send + Sync {
    /// Compose a short personal message for a chosen product
    async fn compose_message(
        &self,
        request: &GiftFinderRequest,
        product: &CandidateProduct,
        reasoning: &str,
    ) -> AppResult<String>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}
