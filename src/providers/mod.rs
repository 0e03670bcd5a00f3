use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

pub mod gemini;
pub mod local;
pub mod openai;

use crate::config_file::ProviderConfig;
use crate::errors::ProviderError;
use crate::types::ModelId;
use reqwest::Client;

pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

pub(crate) fn http_client(timeout_secs: u64) -> Result<Client, ProviderError> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

/// One image + instruction sent to a vision model.
#[derive(Debug, Clone)]
pub struct VisionRequest<'a> {
    pub model: &'a ModelId,
    pub image: &'a [u8],
    pub mime_type: &'static str,
    pub instruction: &'a str,
    pub temperature: Option<f32>,
}

impl VisionRequest<'_> {
    pub fn image_base64(&self) -> String {
        STANDARD.encode(self.image)
    }
}

/// Raw reply from a vision model
#[derive(Debug, Clone)]
pub struct VisionResponse {
    pub text: String,
    pub usage: Usage,
}

/// Token usage information
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// A multimodal model that answers free text about an image.
///
/// Replies are non-deterministic; identical requests may differ in numbers
/// and in formatting.
#[async_trait::async_trait]
pub trait VisionProvider: Send + Sync {
    async fn infer(&self, req: &VisionRequest<'_>) -> Result<VisionResponse, ProviderError>;

    /// Get the name of this provider
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &ModelId;

    /// Validate that this provider is properly configured
    fn validate_config(&self) -> Result<(), ProviderError>;
}

/// Best-effort MIME type from magic bytes; JPEG when unknown.
pub fn sniff_mime_type(image: &[u8]) -> &'static str {
    match image {
        [0x89, b'P', b'N', b'G', ..] => "image/png",
        [b'G', b'I', b'F', b'8', ..] => "image/gif",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "image/webp",
        _ => "image/jpeg",
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProviderOverrides {
    /// Model override (e.g. from CLI -m/--model)
    pub model: Option<ModelId>,
}

/// Create a provider based on configuration priority:
/// 1. `PROVIDER` environment variable
/// 2. `provider` in `.nutrisnap/provider.json`
/// 3. Whichever of `GEMINI_API_KEY` / `OPENAI_API_KEY` is set, in that order
/// 4. A reachable local Ollama
pub async fn create_provider() -> Result<Box<dyn VisionProvider>, ProviderError> {
    create_provider_with_overrides(ProviderOverrides::default()).await
}

pub async fn create_provider_with_overrides(
    overrides: ProviderOverrides,
) -> Result<Box<dyn VisionProvider>, ProviderError> {
    let _ = dotenvy::dotenv();

    let config_file = match ProviderConfig::load() {
        Ok(config) => config,
        Err(e) => {
            log::warn!("Ignoring unreadable provider config: {e}");
            ProviderConfig::default()
        }
    };

    if let Ok(provider_name) = env::var("PROVIDER") {
        return create_provider_by_name(&provider_name, &config_file, overrides);
    }

    if let Some(provider_name) = &config_file.provider {
        return create_provider_by_name(provider_name, &config_file, overrides);
    }

    if env::var("GEMINI_API_KEY").is_ok() {
        return create_provider_by_name("gemini", &config_file, overrides);
    }

    if env::var("OPENAI_API_KEY").is_ok() {
        return create_provider_by_name("openai", &config_file, overrides);
    }

    if local::LocalProvider::is_available(&config_file.merged_settings("local")).await {
        return create_provider_by_name("local", &config_file, overrides);
    }

    Err(ProviderError::NoProviderConfigured)
}

fn resolve_model(
    config_file: &ProviderConfig,
    settings_key: &str,
    overrides: &ProviderOverrides,
) -> Option<ModelId> {
    overrides
        .model
        .clone()
        .or(env::var("MODEL").ok().map(ModelId::new))
        .or(config_file
            .merged_settings(settings_key)
            .model
            .map(ModelId::new))
}

/// Create a provider by explicit name
fn create_provider_by_name(
    name: &str,
    config_file: &ProviderConfig,
    overrides: ProviderOverrides,
) -> Result<Box<dyn VisionProvider>, ProviderError> {
    match name.to_lowercase().as_str() {
        "gemini" | "google" => {
            let key = env::var("GEMINI_API_KEY")
                .map_err(|_| ProviderError::MissingApiKey("gemini".to_string()))?;
            let settings = config_file.merged_settings("gemini");
            let model = resolve_model(config_file, "gemini", &overrides);
            Ok(Box::new(gemini::GeminiProvider::new_with_model(
                key, model, &settings,
            )?))
        }
        "openai" => {
            let key = env::var("OPENAI_API_KEY")
                .map_err(|_| ProviderError::MissingApiKey("openai".to_string()))?;
            let settings = config_file.merged_settings("openai");
            let model = resolve_model(config_file, "openai", &overrides);
            Ok(Box::new(openai::OpenAIProvider::new_with_model(
                key, model, &settings,
            )?))
        }
        "local" | "ollama" => {
            let settings = config_file.merged_settings("local");
            let model = resolve_model(config_file, "local", &overrides);
            Ok(Box::new(local::LocalProvider::new_with_model(
                model, &settings,
            )?))
        }
        other => Err(ProviderError::Config(format!("Unknown provider: {other}"))),
    }
}
