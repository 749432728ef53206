//! Configuration types for PDF translation.
//!
//! Everything that shapes a translation run lives in [`TranslatorConfig`],
//! built via [`TranslatorConfigBuilder`]. What is translated and where it
//! goes (page range, target language, output format and path) are per-call
//! arguments of [`crate::translate::PdfTranslator::translate`], not config.

use crate::error::TranslateError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Target language the CLI uses when none is given.
pub const DEFAULT_TARGET_LANGUAGE: &str = "中文";

/// Model used when a provider is named without one.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Configuration for a PDF translation.
///
/// # Example
/// ```rust
/// use pdf_translate::TranslatorConfig;
///
/// let config = TranslatorConfig::builder()
///     .model("gpt-4o-mini")
///     .pdf_font("/usr/share/fonts/truetype/noto/NotoSansSC-Regular.ttf")
///     .build()
///     .unwrap();
/// assert!(config.token_accounting);
/// ```
#[derive(Clone)]
pub struct TranslatorConfig {
    /// LLM model identifier, e.g. "gpt-4o-mini", "claude-sonnet-4-20250514".
    /// If None, uses [`DEFAULT_MODEL`].
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, the provider is detected from the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for each completion. Default: 0.3.
    pub temperature: f32,

    /// Maximum tokens the model may generate per content unit. Default: 4096.
    pub max_tokens: usize,

    /// Custom system prompt. If None, uses the built-in translator prompt.
    pub system_prompt: Option<String>,

    /// Count prompt and answer tokens with the model's tokenizer. Default: true.
    ///
    /// Only takes effect when a tokenizer is available for the active model;
    /// otherwise the token count is reported as `-1`.
    pub token_accounting: bool,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Optional per-unit progress events.
    pub progress_callback: Option<ProgressCallback>,

    /// TrueType font embedded in PDF output. Needed for any text outside
    /// the WinAnsi range of the builtin fonts (CJK, Cyrillic, Greek, ...).
    /// If None, `PDF_TRANSLATE_FONT` is consulted.
    pub pdf_font: Option<PathBuf>,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.3,
            max_tokens: 4096,
            system_prompt: None,
            token_accounting: true,
            password: None,
            progress_callback: None,
            pdf_font: None,
        }
    }
}

impl fmt::Debug for TranslatorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslatorConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("token_accounting", &self.token_accounting)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn TranslationProgressCallback>"),
            )
            .field("pdf_font", &self.pdf_font)
            .finish()
    }
}

impl TranslatorConfig {
    pub fn builder() -> TranslatorConfigBuilder {
        TranslatorConfigBuilder {
            config: Self::default(),
        }
    }

    /// Model name to use, falling back to [`DEFAULT_MODEL`].
    pub fn model_or_default(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }
}

/// Builder for [`TranslatorConfig`].
#[derive(Debug)]
pub struct TranslatorConfigBuilder {
    config: TranslatorConfig,
}

impl TranslatorConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn token_accounting(mut self, enabled: bool) -> Self {
        self.config.token_accounting = enabled;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn pdf_font(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdf_font = Some(path.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<TranslatorConfig, TranslateError> {
        if self.config.max_tokens == 0 {
            return Err(TranslateError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}
