use std::sync::Arc;

use crate::errors::ProviderError;
use crate::providers::{VisionProvider, VisionRequest, sniff_mime_type};

/// One call to the vision model per `estimate`. No retries and no reply
/// normalisation happen here.
#[derive(Clone)]
pub struct EstimatorClient {
    provider: Arc<dyn VisionProvider>,
    temperature: Option<f32>,
}

impl EstimatorClient {
    pub fn new(provider: Arc<dyn VisionProvider>) -> Self {
        Self {
            provider,
            temperature: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn model(&self) -> &str {
        self.provider.model().as_str()
    }

    /// Raw reply text for `image` under `instruction`.
    pub async fn estimate(&self, image: &[u8], instruction: &str) -> Result<String, ProviderError> {
        if image.is_empty() {
            return Err(ProviderError::EmptyImage);
        }

        let req = VisionRequest {
            model: self.provider.model(),
            image,
            mime_type: sniff_mime_type(image),
            instruction,
            temperature: self.temperature,
        };

        let response = self.provider.infer(&req).await?;
        log::trace!(
            "{} replied with {} chars ({} in / {} out tokens)",
            self.provider.name(),
            response.text.len(),
            response.usage.input_tokens,
            response.usage.output_tokens
        );
        Ok(response.text)
    }
}
