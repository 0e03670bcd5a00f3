use serde_json::{Value, json};
use std::time::Duration;

use crate::config_file::ProviderSettings;
use crate::errors::ProviderError;
use crate::types::ModelId;

use super::{DEFAULT_TIMEOUT_SECS, Usage, VisionProvider, VisionRequest, VisionResponse, http_client};

const DEFAULT_HOST: &str = "http://localhost:11434";

fn default_host() -> String {
    std::env::var("OLLAMA_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string())
}

/// `base_url` from provider settings, else `OLLAMA_HOST`, else localhost.
fn resolve_host(settings: &ProviderSettings) -> String {
    settings
        .base_url
        .clone()
        .unwrap_or_else(default_host)
        .trim_end_matches('/')
        .to_string()
}

/// Ollama running a multimodal model (llava, llama3.2-vision, ...).
pub struct LocalProvider {
    client: reqwest::Client,
    host: String,
    model: ModelId,
    temperature: Option<f32>,
}

impl LocalProvider {
    pub fn new_with_model(
        model: Option<ModelId>,
        settings: &ProviderSettings,
    ) -> Result<Self, ProviderError> {
        let client = http_client(settings.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))?;
        let host = resolve_host(settings);
        let model = match model {
            Some(model) => model,
            None => std::env::var("OLLAMA_MODEL")
                .ok()
                .map(ModelId::new)
                .ok_or_else(|| {
                    ProviderError::Config(
                        "No local model configured. Set MODEL or OLLAMA_MODEL, or configure .nutrisnap/provider.json"
                            .to_string(),
                    )
                })?,
        };

        Ok(Self {
            client,
            host,
            model,
            temperature: settings.temperature,
        })
    }

    /// Whether an Ollama server answers at the host `settings` resolve to.
    pub async fn is_available(settings: &ProviderSettings) -> bool {
        let client = match reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
        {
            Ok(c) => c,
            Err(_) => return false,
        };

        match client.get(Self::tags_url(settings)).send().await {
            Ok(res) => res.status().is_success(),
            Err(_) => false,
        }
    }

    fn tags_url(settings: &ProviderSettings) -> String {
        format!("{}/api/tags", resolve_host(settings))
    }

    fn request_body(req: &VisionRequest<'_>, temperature: Option<f32>) -> Value {
        let mut body = json!({
            "model": req.model.as_str(),
            "messages": [{
                "role": "user",
                "content": req.instruction,
                "images": [req.image_base64()],
            }],
            "stream": false,
        });
        if let Some(temp) = req.temperature.or(temperature) {
            body["options"] = json!({ "temperature": temp });
        }
        body
    }
}

#[async_trait::async_trait]
impl VisionProvider for LocalProvider {
    async fn infer(&self, req: &VisionRequest<'_>) -> Result<VisionResponse, ProviderError> {
        let res = self
            .client
            .post(format!("{}/api/chat", self.host))
            .json(&Self::request_body(req, self.temperature))
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let err_text = res.text().await?;
            return Err(ProviderError::ApiError(format!(
                "Ollama API Error {status}: {err_text}"
            )));
        }

        let response_json: Value = res.json().await?;

        let text = response_json
            .get("message")
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| {
                ProviderError::InvalidResponse("No message content in response".to_string())
            })?
            .to_string();

        let usage = Usage {
            input_tokens: response_json
                .get("prompt_eval_count")
                .and_then(|v| v.as_u64())
                .unwrap_or(0) as u32,
            output_tokens: response_json
                .get("eval_count")
                .and_then(|v| v.as_u64())
                .unwrap_or(0) as u32,
        };

        Ok(VisionResponse { text, usage })
    }

    fn name(&self) -> &str {
        "local"
    }

    fn model(&self) -> &ModelId {
        &self.model
    }

    fn validate_config(&self) -> Result<(), ProviderError> {
        if self.host.is_empty() {
            return Err(ProviderError::Config("Ollama host is empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn images_ride_on_the_user_message() {
        let model = ModelId::new("llava");
        let req = VisionRequest {
            model: &model,
            image: b"abc",
            mime_type: "image/jpeg",
            instruction: "estimate",
            temperature: Some(0.0),
        };

        let body = LocalProvider::request_body(&req, Some(0.7));
        assert_eq!(body["messages"][0]["images"][0], "YWJj");
        assert_eq!(body["stream"], false);
        assert_eq!(body["options"]["temperature"], 0.0);
    }

    #[test]
    fn explicit_model_and_host_are_used() {
        let settings = ProviderSettings {
            base_url: Some("http://gpu-box:11434/".to_string()),
            ..Default::default()
        };
        let provider =
            LocalProvider::new_with_model(Some(ModelId::new("llava:13b")), &settings).unwrap();
        assert_eq!(provider.model().as_str(), "llava:13b");
        assert_eq!(provider.host, "http://gpu-box:11434");
    }

    #[test]
    fn availability_check_uses_configured_host() {
        let settings = ProviderSettings {
            base_url: Some("http://gpu-box:11434/".to_string()),
            ..Default::default()
        };
        assert_eq!(
            LocalProvider::tags_url(&settings),
            "http://gpu-box:11434/api/tags"
        );
    }

    #[tokio::test]
    async fn configured_host_answering_tags_is_available() {
        let app = axum::Router::new().route(
            "/api/tags",
            axum::routing::get(|| async { axum::Json(json!({ "models": [] })) }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let settings = ProviderSettings {
            base_url: Some(format!("http://{addr}/")),
            ..Default::default()
        };
        assert!(LocalProvider::is_available(&settings).await);
    }

    #[tokio::test]
    async fn unreachable_configured_host_is_not_available() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let settings = ProviderSettings {
            base_url: Some(format!("http://{addr}")),
            ..Default::default()
        };
        assert!(!LocalProvider::is_available(&settings).await);
    }
}
