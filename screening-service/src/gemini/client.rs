use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::{error, info, warn};

use super::request::GenerateRequest;
use super::response::GenerateResponse;
use crate::config::ServiceConfig;

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Inference request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Inference API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response format from inference API: {0}")]
    Decode(#[from] serde_json::Error),
}

/// One call to the hosted model per user action.
///
/// Implementations do not retry and do not enforce a timeout; any failure is
/// reported once to the caller.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn invoke(&self, request: &GenerateRequest) -> Result<GenerateResponse, InferenceError>;
}

/// Client for the Gemini `generateContent` REST endpoint
#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl GeminiClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
            api_key,
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(config.base_url.clone(), config.api_key.clone())
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(model)
        )
    }
}

#[async_trait]
impl InferenceClient for GeminiClient {
    async fn invoke(&self, request: &GenerateRequest) -> Result<GenerateResponse, InferenceError> {
        info!(
            model = %request.model,
            grounded = request.uses_search_grounding(),
            "Calling inference API"
        );

        let mut builder = self
            .http
            .post(self.endpoint(&request.model))
            .header("Content-Type", "application/json")
            .json(request);

        // Without a key the provider rejects the call, which surfaces as a status error
        if let Some(api_key) = &self.api_key {
            builder = builder.header("x-goog-api-key", api_key);
        }

        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Inference API request failed with status {}: {}", status, body);
            return Err(InferenceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let decoded: GenerateResponse = serde_json::from_str(&body)?;

        // A blocked prompt carries no candidates and parses as an empty payload
        if let Some(reason) = decoded.block_reason() {
            warn!(model = %request.model, reason, "Inference API blocked the prompt");
        }

        info!(
            model = %request.model,
            characters = decoded.text().len(),
            "Inference API call completed"
        );
        Ok(decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::request::RequestFormatter;
    use axum::{
        Json, Router,
        extract::Path,
        http::{HeaderMap, StatusCode},
        routing::post,
    };
    use serde_json::{Value, json};
    use tokio::net::TcpListener;

    async fn serve(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_invoke_posts_to_model_endpoint_with_key() {
        let router = Router::new().route(
            "/v1beta/models/{call}",
            post(
                |Path(call): Path<String>, headers: HeaderMap, Json(body): Json<Value>| async move {
                    let key = headers
                        .get("x-goog-api-key")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    let prompt = body["contents"][0]["parts"][0]["text"].clone();
                    Json(json!({
                        "candidates": [{
                            "content": { "parts": [{ "text": format!("{call}|{key}|{prompt}") }] }
                        }]
                    }))
                },
            ),
        );
        let base_url = serve(router).await;

        let client = GeminiClient::new(base_url, Some("test-key".to_string()));
        let request = RequestFormatter::default().knowledge_query("Early symptoms");
        let response = client.invoke(&request).await.unwrap();

        let text = response.text();
        assert!(text.starts_with("gemini-3-flash-preview:generateContent|test-key|"));
        assert!(text.contains("Early symptoms"));
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let router = Router::new().route(
            "/v1beta/models/{call}",
            post(|| async {
                (
                    StatusCode::FORBIDDEN,
                    Json(json!({ "error": { "message": "API key not valid" } })),
                )
            }),
        );
        let base_url = serve(router).await;

        let client = GeminiClient::new(base_url, None);
        let request = RequestFormatter::default().knowledge_query("anything");
        let err = client.invoke(&request).await.unwrap_err();

        match err {
            InferenceError::Status { status, body } => {
                assert_eq!(status, 403);
                assert!(body.contains("API key not valid"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_undecodable_body_is_an_error() {
        let router = Router::new().route(
            "/v1beta/models/{call}",
            post(|| async { "<html>gateway error</html>" }),
        );
        let base_url = serve(router).await;

        let client = GeminiClient::new(base_url, None);
        let request = RequestFormatter::default().knowledge_query("anything");
        let err = client.invoke(&request).await.unwrap_err();

        assert!(matches!(err, InferenceError::Decode(_)));
    }

    #[tokio::test]
    async fn test_blocked_prompt_yields_empty_payload() {
        let router = Router::new().route(
            "/v1beta/models/{call}",
            post(|| async { Json(json!({ "promptFeedback": { "blockReason": "SAFETY" } })) }),
        );
        let base_url = serve(router).await;

        let client = GeminiClient::new(base_url, None);
        let formatter = RequestFormatter::default();
        let response = client
            .invoke(&formatter.knowledge_query("anything"))
            .await
            .unwrap();

        assert_eq!(response.block_reason(), Some("SAFETY"));
        assert_eq!(
            crate::gemini::parse_knowledge_answer(&response).text,
            crate::gemini::KNOWLEDGE_FALLBACK
        );
        assert_eq!(
            crate::gemini::parse_risk_assessment(&response).text,
            crate::gemini::RISK_FALLBACK
        );
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = GeminiClient::new(format!("http://{}", addr), None);
        let request = RequestFormatter::default().knowledge_query("anything");
        let err = client.invoke(&request).await.unwrap_err();

        assert!(matches!(err, InferenceError::Transport(_)));
    }

    /// Live call against the hosted API
    /// Usage: GEMINI_API_KEY=key cargo test test_live_knowledge_query
    #[tokio::test]
    async fn test_live_knowledge_query() -> anyhow::Result<()> {
        let config = ServiceConfig::from_env();
        if config.api_key.is_none() {
            println!("Skipping test - set GEMINI_API_KEY environment variable");
            return Ok(());
        }

        let client = GeminiClient::from_config(&config);
        let request = RequestFormatter::new(config.models.clone()).knowledge_query("Early symptoms");

        match client.invoke(&request).await {
            Ok(response) => {
                let answer = crate::gemini::parse_knowledge_answer(&response);
                println!("Answer: {}", answer.text);
                println!("Sources: {}", answer.sources.len());
                assert!(!answer.text.trim().is_empty());
            }
            Err(e) => {
                println!("Note: live inference call failed: {}", e);
            }
        }

        Ok(())
    }
}
