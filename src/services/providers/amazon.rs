/// Marketplace product search provider (RapidAPI)
///
/// Wraps a real-time e-commerce search endpoint: one query phrase in, a page
/// of purchasable products out. Region is passed per call so the same client
/// can serve different marketplace storefronts.
use std::time::Duration;

use reqwest::Client as HttpClient;
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    models::SearchResult,
    services::providers::ProductSearchProvider,
};

const SEARCH_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Clone)]
pub struct AmazonSearchProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
}

/// Envelope shape of the search endpoint
#[derive(Debug, Deserialize)]
struct SearchResponse {
    data: SearchData,
}

#[derive(Debug, Deserialize)]
struct SearchData {
    #[serde(default)]
    products: Vec<SearchResult>,
}

impl AmazonSearchProvider {
    pub fn new(api_key: String, api_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url,
        }
    }
}

#[async_trait::async_trait]
impl ProductSearchProvider for AmazonSearchProvider {
    async fn search_products(
        &self,
        query: &str,
        max_results: usize,
        region: &str,
    ) -> AppResult<Vec<SearchResult>> {
        if query.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Search query cannot be empty".to_string(),
            ));
        }

        let url = format!("{}/search", self.api_url);

        let request = self
            .http_client
            .get(&url)
            .header("X-RapidAPI-Key", &self.api_key)
            .query(&[("query", query), ("country", region), ("page", "1")])
            .send();

        let response = tokio::time::timeout(SEARCH_TIMEOUT, request)
            .await
            .map_err(|_| AppError::ExternalApi("Product search timed out".to_string()))??;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                query = %query,
                status = %status,
                body = %body,
                "Product search request failed"
            );
            return Err(AppError::ExternalApi(format!(
                "Product search returned status {}: {}",
                status, body
            )));
        }

        let parsed: SearchResponse = response.json().await?;
        let mut products = parsed.data.products;
        products.truncate(max_results);

        tracing::info!(
            query = %query,
            results = products.len(),
            region = %region,
            provider = "amazon",
            "Product search completed"
        );

        Ok(products)
    }

    fn name(&self) -> &'static str {
        "amazon"
    }
}
