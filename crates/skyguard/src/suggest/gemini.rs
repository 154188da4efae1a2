//! Gemini `generateContent` backend.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{Error, Result};

use super::{Suggestion, SuggestionProvider, SuggestionRequest};

/// Suggestion provider backed by the Gemini REST API.
///
/// The request asks for JSON output constrained by a response schema; the
/// returned text is then validated with [`Suggestion::from_json`].
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl GeminiProvider {
    /// Build a provider.
    ///
    /// `endpoint` is the API base, e.g. `https://generativelanguage.googleapis.com/v1beta`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::suggestion_transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
        })
    }

    /// URL of the `generateContent` call for the configured model.
    #[must_use]
    pub fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

/// Instruction sent to the model.
fn prompt(request: &SuggestionRequest) -> String {
    format!(
        "Analyse the following hazard identified during the {stage} stage of instrument flight \
         procedure design (ICAO Doc 8168).\n\n\
         Title: {title}\n\
         Description: {description}\n\n\
         Provide a safety management assessment (ICAO Doc 9859) including:\n\
         1. Possible consequences.\n\
         2. A recommended mitigation based on ICAO provisions.\n\
         3. A suggested likelihood (1-5) and severity (A-E).",
        stage = request.stage.label(),
        title = request.title,
        description = request.description,
    )
}

/// Request body with the structured output schema.
fn request_body(request: &SuggestionRequest) -> Value {
    json!({
        "contents": [{
            "parts": [{ "text": prompt(request) }]
        }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": {
                "type": "OBJECT",
                "properties": {
                    "consequences": { "type": "STRING" },
                    "suggestedMitigation": { "type": "STRING" },
                    "suggestedLikelihood": { "type": "NUMBER", "description": "1 to 5" },
                    "suggestedSeverity": { "type": "STRING", "description": "A to E" }
                },
                "required": [
                    "consequences",
                    "suggestedMitigation",
                    "suggestedLikelihood",
                    "suggestedSeverity"
                ]
            }
        }
    })
}

/// Pull the generated text out of a `generateContent` response.
fn response_text(body: &Value) -> Result<&str> {
    body.pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::suggestion_response("response has no candidate text"))
}

#[async_trait]
impl SuggestionProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn suggest(&self, request: &SuggestionRequest) -> Result<Suggestion> {
        let url = self.url();
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body(request))
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| Error::suggestion_transport(e.to_string()))?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| Error::suggestion_response(e.to_string()))?;

        Suggestion::from_json(response_text(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::{Severity, Stage};

    fn request() -> SuggestionRequest {
        SuggestionRequest {
            title: "Outdated DEM".to_string(),
            description: "Terrain model predates new construction".to_string(),
            stage: Stage::DataGathering,
        }
    }

    #[test]
    fn test_url() {
        let provider = GeminiProvider::new(
            "https://example.invalid/v1beta/",
            "gemini-3-flash-preview",
            "key",
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(
            provider.url(),
            "https://example.invalid/v1beta/models/gemini-3-flash-preview:generateContent"
        );
    }

    #[test]
    fn test_prompt_mentions_request_fields() {
        let text = prompt(&request());
        assert!(text.contains("Outdated DEM"));
        assert!(text.contains("Terrain model predates new construction"));
        assert!(text.contains("Data Gathering"));
    }

    #[test]
    fn test_request_body_requires_every_field() {
        let body = request_body(&request());
        let required = body
            .pointer("/generationConfig/responseSchema/required")
            .and_then(Value::as_array)
            .unwrap();
        assert_eq!(required.len(), 4);
        assert_eq!(
            body.pointer("/generationConfig/responseMimeType"),
            Some(&json!("application/json"))
        );
    }

    #[test]
    fn test_response_text_extracts_candidate() {
        let body = json!({
            "candidates": [{
                "content": {
                    "parts": [{
                        "text": "{\"consequences\":\"c\",\"suggestedMitigation\":\"m\",\"suggestedLikelihood\":5,\"suggestedSeverity\":\"A\"}"
                    }]
                }
            }]
        });
        let suggestion = Suggestion::from_json(response_text(&body).unwrap()).unwrap();
        assert_eq!(suggestion.suggested_severity, Severity::A);
    }

    #[test]
    fn test_response_text_missing_candidate() {
        let body = json!({ "candidates": [] });
        assert!(matches!(
            response_text(&body),
            Err(Error::SuggestionResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let provider = GeminiProvider::new(
            "http://127.0.0.1:9/v1beta",
            "model",
            "key",
            Duration::from_secs(2),
        )
        .unwrap();

        let err = provider.suggest(&request()).await.unwrap_err();
        assert!(matches!(err, Error::SuggestionTransport(_)));
    }
}
