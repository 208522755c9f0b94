//! Vision model interaction: build the query and call the provider.
//!
//! This module is intentionally thin — the extraction instruction lives in
//! [`crate::prompts`] so it can be changed without touching the call logic
//! here. [`VisionModel`] is the seam between the pipeline and the network:
//! production code goes through [`LlmVisionModel`] (edgequake-llm), while
//! tests substitute a scripted model and never touch the wire.
//!
//! The model is called exactly once. Failure modes the client may raise
//! (timeout, auth failure, rate limit) are not handled here — they propagate
//! as [`ReceiptError::ModelCallFailed`] and terminate the run.

use crate::config::ExtractionConfig;
use crate::error::ReceiptError;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use std::sync::Arc;
use tracing::debug;

/// Model used when neither the config nor the environment names one.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// An immutable query: the encoded receipt image plus the natural-language
/// extraction instruction. Built once per run and never mutated.
pub struct ExtractionQuery {
    pub image: ImageData,
    pub instruction: String,
}

impl ExtractionQuery {
    pub fn new(image: ImageData, instruction: impl Into<String>) -> Self {
        Self {
            image,
            instruction: instruction.into(),
        }
    }
}

/// The model's raw reply, before any normalisation.
///
/// `text` may be prose, partial JSON, or JSON wrapped in markdown fences —
/// there is no structural guarantee at this point.
#[derive(Debug, Clone)]
pub struct ModelReply {
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// A vision-capable model: accepts an image and an instruction, returns text.
///
/// The external service is consumed as a black box behind this trait; the
/// pipeline owns no retry, auth, or rate-limit handling.
#[async_trait]
pub trait VisionModel: Send + Sync {
    async fn query(&self, query: &ExtractionQuery) -> Result<ModelReply, ReceiptError>;
}

/// Production [`VisionModel`] backed by an edgequake-llm provider.
pub struct LlmVisionModel {
    provider: Arc<dyn LLMProvider>,
    temperature: f32,
    max_tokens: usize,
}

impl LlmVisionModel {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &ExtractionConfig) -> Self {
        Self {
            provider,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

#[async_trait]
impl VisionModel for LlmVisionModel {
    /// Send the receipt image with the instruction as a single user turn.
    ///
    /// One message, one call: the instruction is the user text and the image
    /// rides along as a base64 attachment. No retry — a transient failure is
    /// as fatal as a permanent one for this pipeline.
    async fn query(&self, query: &ExtractionQuery) -> Result<ModelReply, ReceiptError> {
        let messages = vec![ChatMessage::user_with_images(
            query.instruction.as_str(),
            vec![query.image.clone()],
        )];

        let options = CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| ReceiptError::ModelCallFailed {
                message: e.to_string(),
            })?;

        debug!(
            "Model replied: {} input tokens, {} output tokens, {} chars",
            response.prompt_tokens,
            response.completion_tokens,
            response.content.len()
        );

        Ok(ModelReply {
            text: response.content,
            input_tokens: response.prompt_tokens as u64,
            output_tokens: response.completion_tokens as u64,
        })
    }
}

/// Instantiate a named provider with the given model.
fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, ReceiptError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        ReceiptError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// The fallback chain lets library users and CLI users each set exactly as
/// much or as little as they need:
///
/// 1. **Pre-built provider** (`config.provider`) — the caller constructed and
///    configured the provider entirely; used as-is.
///
/// 2. **Named provider + model** (`config.provider_name`) — reads the
///    corresponding API key (`OPENAI_API_KEY`, etc.) from the environment.
///
/// 3. **Environment pair** (`RECEIPT_LLM_PROVIDER` + `RECEIPT_MODEL`) — a
///    provider/model choice made at the execution-environment level
///    (Makefile, shell script, CI). Checked before full auto-detection so
///    the model choice is honoured even when multiple API keys are present.
///
/// 4. **Full auto-detection** — prefer OpenAI when `OPENAI_API_KEY` is set,
///    otherwise let `ProviderFactory::from_env` scan all known key variables
///    and pick the first available provider.
pub fn resolve_provider(config: &ExtractionConfig) -> Result<Arc<dyn LLMProvider>, ReceiptError> {
    // 1) User-provided provider takes priority
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    // 2) Provider name + model
    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_vision_provider(name, model);
    }

    // 3) Provider + model pinned in the environment
    if let (Ok(prov), Ok(model)) = (
        std::env::var("RECEIPT_LLM_PROVIDER"),
        std::env::var("RECEIPT_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_vision_provider(&prov, &model);
        }
    }

    // 4) Prefer OpenAI when its key is present, so users with multiple
    // provider keys get a deterministic default.
    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_vision_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| ReceiptError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
