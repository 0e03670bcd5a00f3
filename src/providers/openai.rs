use serde_json::{Value, json};

use crate::config_file::ProviderSettings;
use crate::errors::ProviderError;
use crate::types::ModelId;

use super::{DEFAULT_TIMEOUT_SECS, Usage, VisionProvider, VisionRequest, VisionResponse, http_client};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAIProvider {
    client: reqwest::Client,
    key: String,
    base_url: String,
    model: ModelId,
    temperature: Option<f32>,
}

impl OpenAIProvider {
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
            model: model.unwrap_or_else(ModelId::gpt_4o_mini),
            temperature: settings.temperature,
        })
    }

    fn request_body(req: &VisionRequest<'_>, temperature: Option<f32>) -> Value {
        let data_url = format!("data:{};base64,{}", req.mime_type, req.image_base64());
        let mut body = json!({
            "model": req.model.as_str(),
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": req.instruction },
                    { "type": "image_url", "image_url": { "url": data_url } }
                ]
            }]
        });
        if let Some(temp) = req.temperature.or(temperature) {
            body["temperature"] = json!(temp);
        }
        body
    }

    fn reply_text(response_json: &Value) -> Result<String, ProviderError> {
        response_json
            .get("choices")
            .and_then(|arr| arr.as_array())
            .and_then(|arr| arr.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(|content| content.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                ProviderError::InvalidResponse("No message content in response".to_string())
            })
    }
}

#[async_trait::async_trait]
impl VisionProvider for OpenAIProvider {
    async fn infer(&self, req: &VisionRequest<'_>) -> Result<VisionResponse, ProviderError> {
        let res = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.key)
            .json(&Self::request_body(req, self.temperature))
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let err_text = res.text().await?;
            return Err(ProviderError::ApiError(format!(
                "OpenAI API Error {status}: {err_text}"
            )));
        }

        let response_json: Value = res.json().await?;
        let text = Self::reply_text(&response_json)?;

        let usage = response_json
            .get("usage")
            .map(|usage_obj| Usage {
                input_tokens: usage_obj
                    .get("prompt_tokens")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(0) as u32,
                output_tokens: usage_obj
                    .get("completion_tokens")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(0) as u32,
            })
            .unwrap_or_default();

        Ok(VisionResponse { text, usage })
    }

    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &ModelId {
        &self.model
    }

    fn validate_config(&self) -> Result<(), ProviderError> {
        if self.key.is_empty() {
            return Err(ProviderError::Config("OpenAI API key is empty".to_string()));
        }
        Ok(())
    }
}
