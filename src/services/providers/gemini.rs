/// Google generative-language API provider
///
/// Serves three call shapes:
/// 1. Suggestions: profile -> 10-12 interest-specific search phrases
/// 2. Catalog picks: profile + stored products -> up to N picks with reasoning
/// 3. Personal messages: profile + chosen product -> one short message
///
/// The model is asked for raw JSON; responses wrapped in markdown fences or
/// surrounding prose are tolerated by slicing out the outermost JSON value.
use std::collections::HashSet;
use std::time::Duration;

use reqwest::Client as HttpClient;
use serde::Deserialize;
use serde_json::json;

use crate::{
    error::{AppError, AppResult},
    models::{CandidateProduct, CatalogPick, CatalogProduct, GiftFinderRequest, GiftSuggestion},
    services::providers::{MessageProvider, SuggestionProvider},
};

const SUGGESTION_TIMEOUT: Duration = Duration::from_secs(30);
const MESSAGE_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Clone)]
pub struct GeminiProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    model: String,
}

impl GeminiProvider {
    pub fn new(api_key: String, api_url: String, model: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url,
            model,
        }
    }

    /// Sends one prompt and returns the model's text output
    async fn generate(&self, prompt: &str, timeout: Duration) -> AppResult<String> {
        if self.api_key.is_empty() {
            return Err(AppError::ExternalApi(
                "Suggestion API key not configured".to_string(),
            ));
        }

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_url, self.model
        );

        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": { "temperature": 0.7 }
        });

        let request = self
            .http_client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send();

        let response = tokio::time::timeout(timeout, request)
            .await
            .map_err(|_| AppError::ExternalApi("Suggestion API call timed out".to_string()))??;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "Suggestion API returned status {}: {}",
                status, body
            )));
        }

        #[derive(Deserialize)]
        struct GenerateResponse {
            candidates: Vec<ResponseCandidate>,
        }
        #[derive(Deserialize)]
        struct ResponseCandidate {
            content: ResponseContent,
        }
        #[derive(Deserialize)]
        struct ResponseContent {
            parts: Vec<ResponsePart>,
        }
        #[derive(Deserialize)]
        struct ResponsePart {
            text: String,
        }

        let parsed: GenerateResponse = response.json().await?;

        parsed
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.clone())
            .ok_or_else(|| AppError::ExternalApi("Suggestion API returned no text".to_string()))
    }
}

/// Prompt for the primary suggestion path
fn build_suggestion_prompt(request: &GiftFinderRequest, exclude_names: &[String]) -> String {
    let mut prompt = String::from(
        "You are a gift recommendation expert for Indian online shoppers. \
         Suggest 10 to 12 short product search phrases for the recipient below.\n\n",
    );

    prompt.push_str(&format!("Relationship: {}\n", request.relationship));
    prompt.push_str(&format!("Interests: {}\n", request.interests.join(", ")));
    prompt.push_str(&format!("Budget: {}\n", request.budget));
    prompt.push_str(&format!("Occasion: {}\n", request.occasion));
    if let Some(age) = request.age {
        prompt.push_str(&format!("Age: {}\n", age));
    }
    if let Some(personality) = &request.personality {
        prompt.push_str(&format!("Personality: {}\n", personality));
    }

    prompt.push_str(
        "\nRules:\n\
         - Every search phrase MUST literally contain one of the stated interest \
         keywords. Never broaden an interest to a generic category: for the \
         interest \"cricket\", write \"cricket bat\", never \"sports equipment\".\n\
         - Phrases must be 2-5 words, suitable for a marketplace search box.\n\
         - Stay within the stated budget.\n",
    );

    if !exclude_names.is_empty() {
        prompt.push_str(&format!(
            "- Do NOT suggest anything similar to these already-shown products: {}\n",
            exclude_names.join("; ")
        ));
    }

    prompt.push_str(
        "\nRespond with ONLY a JSON array, no prose, where each element is \
         {\"search_phrase\": string, \"reasoning\": string, \
         \"relevance_score\": integer 1-100, \"category\": string}.",
    );

    prompt
}

/// Prompt for the catalog-pick ("load more") path
fn build_catalog_prompt(
    request: &GiftFinderRequest,
    catalog: &[CatalogProduct],
    max_picks: usize,
) -> String {
    let mut prompt = format!(
        "You are a gift recommendation expert. Pick up to {} products from the \
         catalog below for this recipient and explain each choice.\n\n\
         Relationship: {}\nInterests: {}\nBudget: {}\nOccasion: {}\n\nCatalog:\n",
        max_picks,
        request.relationship,
        request.interests.join(", "),
        request.budget,
        request.occasion,
    );

    for product in catalog {
        prompt.push_str(&format!(
            "- id={} name={} category={} price={}\n",
            product.id, product.name, product.category, product.price_label
        ));
    }

    prompt.push_str(
        "\nRespond with ONLY a JSON array, no prose, where each element is \
         {\"product_id\": string (an id from the catalog), \"reasoning\": string, \
         \"score\": integer 1-100}.",
    );

    prompt
}

/// Prompt for a short personal gift message
fn build_message_prompt(
    request: &GiftFinderRequest,
    product: &CandidateProduct,
    reasoning: &str,
) -> String {
    let recipient = request.recipient_name.as_deref().unwrap_or("the recipient");
    format!(
        "Write one warm, short (under 40 words) gift message to {} from their {} \
         for {}. The gift is \"{}\" because: {}. \
         Respond with only the message text, no quotes.",
        recipient, request.relationship, request.occasion, product.name, reasoning
    )
}

/// Slices the outermost JSON array out of model output that may be wrapped
/// in markdown fences or prose
fn extract_json_array(text: &str) -> AppResult<&str> {
    let start = text
        .find('[')
        .ok_or_else(|| AppError::ExternalApi("No JSON array in suggestion output".to_string()))?;
    let end = text
        .rfind(']')
        .filter(|end| *end > start)
        .ok_or_else(|| AppError::ExternalApi("Unterminated JSON array in suggestion output".to_string()))?;
    Ok(&text[start..=end])
}

/// Parses suggestion output, clamping scores into 1-100
fn parse_suggestions(text: &str) -> AppResult<Vec<GiftSuggestion>> {
    let json = extract_json_array(text)?;
    let mut suggestions: Vec<GiftSuggestion> = serde_json::from_str(json)
        .map_err(|e| AppError::ExternalApi(format!("Unparseable suggestion output: {}", e)))?;

    for suggestion in &mut suggestions {
        suggestion.relevance_score = suggestion.relevance_score.clamp(1, 100);
    }

    suggestions.retain(|s| !s.search_phrase.trim().is_empty());

    if suggestions.is_empty() {
        return Err(AppError::ExternalApi(
            "Suggestion output contained no usable phrases".to_string(),
        ));
    }

    Ok(suggestions)
}

/// Parses catalog picks, dropping ids the catalog does not contain
fn parse_picks(text: &str, catalog: &[CatalogProduct]) -> AppResult<Vec<CatalogPick>> {
    let json = extract_json_array(text)?;
    let picks: Vec<CatalogPick> = serde_json::from_str(json)
        .map_err(|e| AppError::ExternalApi(format!("Unparseable catalog picks: {}", e)))?;

    let known: HashSet<_> = catalog.iter().map(|p| p.id).collect();
    let (valid, dropped): (Vec<_>, Vec<_>) =
        picks.into_iter().partition(|p| known.contains(&p.product_id));

    if !dropped.is_empty() {
        tracing::warn!(
            dropped = dropped.len(),
            "Catalog picks referenced unknown product ids"
        );
    }

    Ok(valid
        .into_iter()
        .map(|mut p| {
            p.score = p.score.clamp(1, 100);
            p
        })
        .collect())
}

#[async_trait::async_trait]
impl SuggestionProvider for GeminiProvider {
    async fn suggest_phrases(
        &self,
        request: &GiftFinderRequest,
        exclude_names: &[String],
    ) -> AppResult<Vec<GiftSuggestion>> {
        let prompt = build_suggestion_prompt(request, exclude_names);
        let text = self.generate(&prompt, SUGGESTION_TIMEOUT).await?;
        let suggestions = parse_suggestions(&text)?;

        tracing::info!(
            suggestions = suggestions.len(),
            provider = "gemini",
            "Suggestion phrases generated"
        );

        Ok(suggestions)
    }

    async fn pick_from_catalog(
        &self,
        request: &GiftFinderRequest,
        catalog: &[CatalogProduct],
        max_picks: usize,
    ) -> AppResult<Vec<CatalogPick>> {
        let prompt = build_catalog_prompt(request, catalog, max_picks);
        let text = self.generate(&prompt, SUGGESTION_TIMEOUT).await?;
        let mut picks = parse_picks(&text, catalog)?;
        picks.truncate(max_picks);

        tracing::info!(
            picks = picks.len(),
            catalog = catalog.len(),
            provider = "gemini",
            "Catalog picks generated"
        );

        Ok(picks)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

#[async_trait::async_trait]
impl MessageProvider for GeminiProvider {
    async fn compose_message(
        &self,
        request: &GiftFinderRequest,
        product: &CandidateProduct,
        reasoning: &str,
    ) -> AppResult<String> {
        let prompt = build_message_prompt(request, product, reasoning);
        let text = self.generate(&prompt, MESSAGE_TIMEOUT).await?;
        let message = text.trim().trim_matches('"').to_string();

        if message.is_empty() {
            return Err(AppError::ExternalApi(
                "Message generation returned empty text".to_string(),
            ));
        }

        Ok(message)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}
