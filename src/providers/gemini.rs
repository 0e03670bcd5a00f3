use serde_json::{Value, json};

use crate::config_file::ProviderSettings;
use crate::errors::ProviderError;
use crate::types::ModelId;

use super::{DEFAULT_TIMEOUT_SECS, Usage, VisionProvider, VisionRequest, VisionResponse, http_client};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

pub struct GeminiProvider {
    client: reqwest::Client,
    key: String,
    base_url: String,
    model: ModelId,
    temperature: Option<f32>,
}

impl GeminiProvider {
    pub fn new(key: String) -> Result<Self, ProviderError> {
        Self::new_with_model(key, None, &ProviderSettings::default())
    }

    pub fn new_with_model(
        key: String,
        model: Option<ModelId>,
        settings: &ProviderSettings,
    ) -> Result<Self, ProviderError> {
        let client = http_client(settings.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))?;
        let base_url = settings
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            client,
            key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.unwrap_or_else(ModelId::gemini_flash),
            temperature: settings.temperature,
        })
    }

    fn request_body(req: &VisionRequest<'_>, temperature: Option<f32>) -> Value {
        let mut body = json!({
            "contents": [{
                "role": "user",
                "parts": [
                    {
                        "inline_data": {
                            "mime_type": req.mime_type,
                            "data": req.image_base64(),
                        }
                    },
                    { "text": req.instruction }
                ]
            }]
        });
        if let Some(temp) = req.temperature.or(temperature) {
            body["generationConfig"] = json!({ "temperature": temp });
        }
        body
    }

    fn reply_text(response_json: &Value) -> Result<String, ProviderError> {
        let parts = response_json
            .get("candidates")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .and_then(|c| c.get("content"))
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.as_array())
            .ok_or_else(|| {
                ProviderError::InvalidResponse("No candidates in response".to_string())
            })?;

        let texts: Vec<&str> = parts
            .iter()
            .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
            .collect();

        // Blank text is still a reply; the parser rejects it.
        if texts.is_empty() {
            return Err(ProviderError::InvalidResponse(
                "Candidate has no text parts".to_string(),
            ));
        }
        Ok(texts.concat())
    }

    fn usage(response_json: &Value) -> Usage {
        let meta = response_json.get("usageMetadata");
        let count = |name: &str| {
            meta.and_then(|m| m.get(name))
                .and_then(|v| v.as_u64())
                .unwrap_or(0) as u32
        };
        Usage {
            input_tokens: count("promptTokenCount"),
            output_tokens: count("candidatesTokenCount"),
        }
    }
}

#[async_trait::async_trait]
impl VisionProvider for GeminiProvider {
    async fn infer(&self, req: &VisionRequest<'_>) -> Result<VisionResponse, ProviderError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url,
            req.model.as_str()
        );

        let res = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.key)
            .json(&Self::request_body(req, self.temperature))
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let err_text = res.text().await?;
            return Err(ProviderError::ApiError(format!(
                "Gemini API Error {status}: {err_text}"
            )));
        }

        let response_json: Value = res.json().await?;

        Ok(VisionResponse {
            text: Self::reply_text(&response_json)?,
            usage: Self::usage(&response_json),
        })
    }

    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &ModelId {
        &self.model
    }

    fn validate_config(&self) -> Result<(), ProviderError> {
        if self.key.is_empty() {
            return Err(ProviderError::Config("Gemini API key is empty".to_string()));
        }
        Ok(())
    }
}
