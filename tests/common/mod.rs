#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use nutrisnap::errors::ProviderError;
use nutrisnap::providers::Usage;
use nutrisnap::{EstimatorClient, ModelId, VisionProvider, VisionRequest, VisionResponse};

/// What the scripted provider does on a given call.
#[derive(Clone, Debug)]
pub enum Reply {
    Text(&'static str),
    Fail(&'static str),
    Slow(Duration, &'static str),
}

/// Answers calls in arrival order from a fixed script, cycling if it runs out.
pub struct ScriptedProvider {
    model: ModelId,
    script: Vec<Reply>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Reply>) -> Self {
        Self {
            model: ModelId::new("scripted-vision"),
            script,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl VisionProvider for ScriptedProvider {
    async fn infer(&self, _req: &VisionRequest<'_>) -> Result<VisionResponse, ProviderError> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self.script[index % self.script.len()].clone();
        let text = match reply {
            Reply::Text(text) => text,
            Reply::Fail(message) => {
                return Err(ProviderError::ApiError(message.to_string()));
            }
            Reply::Slow(delay, text) => {
                tokio::time::sleep(delay).await;
                text
            }
        };
        Ok(VisionResponse {
            text: text.to_string(),
            usage: Usage::default(),
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &ModelId {
        &self.model
    }

    fn validate_config(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}

pub fn estimator(provider: &Arc<ScriptedProvider>) -> EstimatorClient {
    EstimatorClient::new(provider.clone())
}

pub fn scripted(script: Vec<Reply>) -> Arc<ScriptedProvider> {
    Arc::new(ScriptedProvider::new(script))
}

/// Well-formed reply with the given calorie count and fixed macros.
pub fn reply_with_calories(calories: u32) -> &'static str {
    let text = format!(
        r#"{{"calories_cal": {calories}, "macronutrients": {{"protein_g": 20, "fat_g": 10,
            "carbs_g": 30}}, "sugar_g": 5, "fiber_g": 4, "satiety_index": 1.5}}"#
    );
    Box::leak(text.into_boxed_str())
}

pub const JPEG: &[u8] = &[0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10, b'J', b'F', b'I', b'F'];
