//! The translation model capability.
//!
//! The orchestrator needs three things from a model: a prompt for a unit,
//! one request/answer round-trip, and (optionally) a tokenizer for
//! accounting. [`TranslationModel`] is that seam; [`LlmModel`] is the
//! production implementation over `edgequake-llm`.

use crate::config::TranslatorConfig;
use crate::document::{Content, TranslationStatus};
use crate::error::TranslateError;
use crate::pipeline::postprocess::clean_translation;
use crate::prompts::{self, DEFAULT_SYSTEM_PROMPT};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tiktoken_rs::CoreBPE;
use tracing::{debug, info, warn};

/// Splits text into model tokens.
pub trait Tokenizer: Send + Sync {
    fn encode(&self, text: &str) -> Vec<u32>;

    fn count(&self, text: &str) -> u64 {
        self.encode(text).len() as u64
    }
}

/// BPE tokenizer for OpenAI-family models.
pub struct TiktokenTokenizer {
    bpe: CoreBPE,
}

impl TiktokenTokenizer {
    /// Tokenizer for `model`, or `None` when tiktoken has no encoding for it.
    pub fn for_model(model: &str) -> Option<Self> {
        tiktoken_rs::get_bpe_from_model(model)
            .ok()
            .map(|bpe| Self { bpe })
    }
}

impl Tokenizer for TiktokenTokenizer {
    fn encode(&self, text: &str) -> Vec<u32> {
        self.bpe
            .encode_with_special_tokens(text)
            .into_iter()
            .map(|t| t as u32)
            .collect()
    }
}

impl fmt::Debug for TiktokenTokenizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TiktokenTokenizer")
    }
}

/// A backend able to translate one content unit at a time.
#[async_trait]
pub trait TranslationModel: Send + Sync {
    /// Human-readable model identifier, for logs.
    fn name(&self) -> &str;

    /// Build the prompt for `content`. Tables are serialised with
    /// [`Content::render_for_prompt`] and asked back row by row.
    fn translate_prompt(&self, content: &Content, target_language: &str) -> String {
        let payload = content.render_for_prompt();
        match content {
            Content::Text(_) => prompts::text_prompt(&payload, target_language),
            Content::Table(_) => prompts::table_prompt(&payload, target_language),
        }
    }

    /// Send one prompt. Transport or provider errors come back as
    /// `(message, Failed)`; this never fails outright.
    async fn make_request(&self, prompt: &str) -> (String, TranslationStatus);

    /// Tokenizer used for accounting, when the model has one.
    fn tokenizer(&self) -> Option<&dyn Tokenizer> {
        None
    }
}

/// [`TranslationModel`] over an `edgequake-llm` chat provider.
pub struct LlmModel {
    provider: Arc<dyn LLMProvider>,
    model_name: String,
    system_prompt: String,
    options: CompletionOptions,
    tokenizer: Option<Box<dyn Tokenizer>>,
}

impl LlmModel {
    pub fn new(provider: Arc<dyn LLMProvider>, model_name: impl Into<String>) -> Self {
        Self {
            provider,
            model_name: model_name.into(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            options: CompletionOptions {
                temperature: Some(0.3),
                max_tokens: Some(4096),
                ..Default::default()
            },
            tokenizer: None,
        }
    }

    /// Resolve the provider and build a model from `config`.
    ///
    /// With `token_accounting` on, a tiktoken tokenizer is attached when one
    /// exists for the model; otherwise counts are reported as not available.
    pub fn from_config(config: &TranslatorConfig) -> Result<Self, TranslateError> {
        let (provider, model_name) = resolve_provider(config)?;
        let mut model = Self::new(provider, model_name)
            .with_options(build_options(config))
            .with_system_prompt(
                config
                    .system_prompt
                    .clone()
                    .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            );

        if config.token_accounting {
            match TiktokenTokenizer::for_model(&model.model_name) {
                Some(t) => model = model.with_tokenizer(Box::new(t)),
                None => warn!(
                    "No tokenizer known for model '{}'; token usage will not be counted",
                    model.model_name
                ),
            }
        }
        info!("Using model {}", model.model_name);
        Ok(model)
    }

    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_tokenizer(mut self, tokenizer: Box<dyn Tokenizer>) -> Self {
        self.tokenizer = Some(tokenizer);
        self
    }
}

impl fmt::Debug for LlmModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmModel")
            .field("model_name", &self.model_name)
            .field("tokenizer", &self.tokenizer.is_some())
            .finish()
    }
}

#[async_trait]
impl TranslationModel for LlmModel {
    fn name(&self) -> &str {
        &self.model_name
    }

    async fn make_request(&self, prompt: &str) -> (String, TranslationStatus) {
        let start = Instant::now();
        let messages = vec![
            ChatMessage::system(self.system_prompt.as_str()),
            ChatMessage::user(prompt),
        ];

        match self.provider.chat(&messages, Some(&self.options)).await {
            Ok(response) => {
                debug!(
                    "{}: {} input tokens, {} output tokens, {:?}",
                    self.model_name,
                    response.prompt_tokens,
                    response.completion_tokens,
                    start.elapsed()
                );
                (clean_translation(&response.content), TranslationStatus::Success)
            }
            Err(e) => {
                let msg = format!("{}", e);
                warn!("{}: request failed: {}", self.model_name, msg);
                (msg, TranslationStatus::Failed)
            }
        }
    }

    fn tokenizer(&self) -> Option<&dyn Tokenizer> {
        self.tokenizer.as_deref()
    }
}

fn build_options(config: &TranslatorConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

fn create_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, TranslateError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        TranslateError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the chat provider and the model name it serves, from most to
/// least specific:
///
/// 1. `config.provider`, used as-is.
/// 2. `config.provider_name` with `config.model`.
/// 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`, when both are set.
/// 4. OpenAI, when `OPENAI_API_KEY` is set.
/// 5. [`ProviderFactory::from_env`] auto-detection.
pub fn resolve_provider(
    config: &TranslatorConfig,
) -> Result<(Arc<dyn LLMProvider>, String), TranslateError> {
    let model = config.model_or_default().to_string();

    if let Some(ref provider) = config.provider {
        return Ok((Arc::clone(provider), model));
    }

    if let Some(ref name) = config.provider_name {
        return Ok((create_provider(name, &model)?, model));
    }

    if let (Ok(prov), Ok(env_model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !env_model.is_empty() {
            return Ok((create_provider(&prov, &env_model)?, env_model));
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            return Ok((create_provider("openai", &model)?, model));
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| TranslateError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok((llm_provider, model))
}
