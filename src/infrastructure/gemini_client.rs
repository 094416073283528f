// Gemini completion client - generateContent over HTTPS
use crate::application::completion_service::{
    CompletionError, CompletionService, ContextRole, ContextTurn,
};
use crate::infrastructure::config::GeminiSettings;
use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: ContextRole,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiClient {
    pub fn from_settings(settings: &GeminiSettings) -> anyhow::Result<Self> {
        let api_key = settings.require_api_key()?.to_string();
        let http = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self::new(http, settings.endpoint.clone(), settings.model.clone(), api_key))
    }

    pub fn new(http: reqwest::Client, endpoint: String, model: String, api_key: String) -> Self {
        Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model,
            api_key,
        }
    }

    fn build_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.endpoint,
            urlencoding::encode(&self.model),
            urlencoding::encode(&self.api_key)
        )
    }

    fn build_request<'a>(context: &'a [ContextTurn], prompt: &'a str) -> GenerateContentRequest<'a> {
        let mut contents: Vec<Content<'a>> = context
            .iter()
            .map(|turn| Content {
                role: turn.role,
                parts: vec![RequestPart { text: &turn.text }],
            })
            .collect();
        contents.push(Content {
            role: ContextRole::User,
            parts: vec![RequestPart { text: prompt }],
        });
        GenerateContentRequest { contents }
    }

    fn extract_text(response: GenerateContentResponse) -> Result<String, CompletionError> {
        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| CompletionError::MalformedResponse("no candidates".to_string()))?;

        let text: String = candidate
            .content
            .map(|content| content.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|part| part.text)
            .collect();

        if text.is_empty() {
            return Err(CompletionError::MalformedResponse(
                "candidate has no text".to_string(),
            ));
        }
        Ok(text)
    }
}

#[async_trait]
impl CompletionService for GeminiClient {
    async fn complete(&self, context: &[ContextTurn], prompt: &str) -> Result<String, CompletionError> {
        let body = Self::build_request(context, prompt);

        tracing::debug!("Sending generateContent request to model {}", self.model);
        let response = self
            .http
            .post(self.build_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| CompletionError::Transport(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::RateLimited(body));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let data = response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| CompletionError::MalformedResponse(e.to_string()))?;

        Self::extract_text(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> GeminiClient {
        GeminiClient::new(
            reqwest::Client::new(),
            "https://example.test/v1beta/".to_string(),
            "gemini-pro".to_string(),
            "a b&c".to_string(),
        )
    }

    #[test]
    fn test_build_url_encodes_key() {
        assert_eq!(
            client().build_url(),
            "https://example.test/v1beta/models/gemini-pro:generateContent?key=a%20b%26c"
        );
    }

    #[test]
    fn test_request_body_appends_prompt_as_user_turn() {
        let context = vec![
            ContextTurn {
                role: ContextRole::User,
                text: "hi".to_string(),
            },
            ContextTurn {
                role: ContextRole::Model,
                text: "hello!".to_string(),
            },
        ];
        let body = serde_json::to_value(GeminiClient::build_request(&context, "how are you?")).unwrap();

        assert_eq!(
            body,
            json!({
                "contents": [
                    {"role": "user", "parts": [{"text": "hi"}]},
                    {"role": "model", "parts": [{"text": "hello!"}]},
                    {"role": "user", "parts": [{"text": "how are you?"}]},
                ]
            })
        );
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [
                {"content": {"role": "model", "parts": [{"text": "Hello, "}, {"text": "world"}]}},
                {"content": {"role": "model", "parts": [{"text": "ignored"}]}}
            ]
        }))
        .unwrap();
        assert_eq!(GeminiClient::extract_text(response).unwrap(), "Hello, world");
    }

    #[test]
    fn test_extract_text_rejects_empty_responses() {
        let empty: GenerateContentResponse = serde_json::from_value(json!({})).unwrap();
        assert!(matches!(
            GeminiClient::extract_text(empty),
            Err(CompletionError::MalformedResponse(_))
        ));

        let blocked: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"finishReason": "SAFETY"}]
        }))
        .unwrap();
        assert!(matches!(
            GeminiClient::extract_text(blocked),
            Err(CompletionError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_from_settings_requires_key() {
        let settings = GeminiSettings::default();
        assert!(GeminiClient::from_settings(&settings).is_err());

        let settings = GeminiSettings {
            api_key: Some("k".to_string()),
            ..GeminiSettings::default()
        };
        assert!(GeminiClient::from_settings(&settings).is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_a_transport_error() {
        // Bind then release a port so nothing is listening on it.
        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        let client = GeminiClient::new(
            reqwest::Client::new(),
            format!("http://{}/v1beta", addr),
            "gemini-pro".to_string(),
            "k".to_string(),
        );

        let result = client.complete(&[], "hello").await;
        assert!(matches!(result, Err(CompletionError::Transport(_))), "{:?}", result);
    }
}
