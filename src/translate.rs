//! Translation orchestrator: parse → cache lookup → per-unit model calls →
//! write → cache store.
//!
//! One [`PdfTranslator::translate`] call is strictly sequential; units are
//! sent to the model one after another, in page order. Concurrent calls on a
//! shared translator are allowed: calls with the same [`CacheKey`] are
//! serialised, so the second caller observes the first one's cache entry
//! instead of repeating the work.

use crate::cache::{CacheKey, MemoryCache, TranslationCache};
use crate::config::TranslatorConfig;
use crate::document::{Document, TranslationStatus};
use crate::error::{TranslateError, UnitFailure};
use crate::model::{LlmModel, TranslationModel};
use crate::pipeline::input;
use crate::pipeline::parse::PdfParser;
use crate::progress::{NoopProgressCallback, ProgressCallback};
use crate::writer::{OutputFormat, Writer};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Tokens spent by one translation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenUsage {
    /// Served from the cache; no model calls were made.
    Cached,
    /// Prompt and answer tokens, summed over every unit.
    Counted(u64),
    /// Nothing was counted: the document had no units or the model has no
    /// tokenizer.
    NotCounted,
}

impl TokenUsage {
    /// Integer form: `0` for a cache hit, the count, or `-1` when nothing
    /// was counted.
    ///
    /// `0` and `-1` are both "no tokens spent" but are kept apart so callers
    /// can tell a cache hit from a run without accounting.
    pub fn as_sentinel(self) -> i64 {
        match self {
            TokenUsage::Cached => 0,
            TokenUsage::Counted(n) => i64::try_from(n).unwrap_or(i64::MAX),
            TokenUsage::NotCounted => -1,
        }
    }
}

/// Result of a translation call.
#[derive(Debug, Clone, Serialize)]
pub struct TranslationOutcome {
    /// Where the translated document was written.
    pub output_path: PathBuf,
    pub tokens: TokenUsage,
    /// Content units in the document.
    pub units: usize,
    /// Units whose model call failed; written with their original text.
    pub failed: Vec<UnitFailure>,
    pub from_cache: bool,
    pub duration_ms: u64,
}

impl TranslationOutcome {
    /// Token count in integer sentinel form, see [`TokenUsage::as_sentinel`].
    pub fn token_count(&self) -> i64 {
        self.tokens.as_sentinel()
    }
}

/// Per-key lock plus the number of calls holding or waiting on it.
struct InflightSlot {
    lock: Arc<tokio::sync::Mutex<()>>,
    users: usize,
}

type InflightMap = HashMap<CacheKey, InflightSlot>;

/// A registration in the in-flight map; leaving it (normally or by the
/// owning future being dropped) releases the key's slot.
struct InflightEntry<'a> {
    map: &'a Mutex<InflightMap>,
    key: CacheKey,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl InflightEntry<'_> {
    async fn lock(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.lock.lock().await
    }
}

impl Drop for InflightEntry<'_> {
    fn drop(&mut self) {
        let mut map = self.map.lock().unwrap_or_else(PoisonError::into_inner);
        let unused = match map.get_mut(&self.key) {
            Some(slot) => {
                slot.users = slot.users.saturating_sub(1);
                slot.users == 0
            }
            None => false,
        };
        if unused {
            map.remove(&self.key);
        }
    }
}

/// Translates PDFs with a model, a parser, a writer and a cache.
pub struct PdfTranslator {
    model: Arc<dyn TranslationModel>,
    parser: PdfParser,
    writer: Writer,
    cache: Arc<dyn TranslationCache>,
    progress: ProgressCallback,
    inflight: Mutex<InflightMap>,
}

impl PdfTranslator {
    /// Translator over `model` with the pdfium parser and a fresh in-memory cache.
    pub fn new(model: Arc<dyn TranslationModel>) -> Self {
        Self {
            model,
            parser: PdfParser::default(),
            writer: Writer::new(),
            cache: Arc::new(MemoryCache::new()),
            progress: Arc::new(NoopProgressCallback),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Build an [`LlmModel`]-backed translator from `config`.
    pub fn from_config(config: &TranslatorConfig) -> Result<Self, TranslateError> {
        let model = LlmModel::from_config(config)?;
        let mut translator = Self::new(Arc::new(model))
            .with_parser(PdfParser::default().with_password(config.password.clone()))
            .with_writer(Writer::from_config(config));
        if let Some(ref cb) = config.progress_callback {
            translator = translator.with_progress(Arc::clone(cb));
        }
        Ok(translator)
    }

    pub fn with_parser(mut self, parser: PdfParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_writer(mut self, writer: Writer) -> Self {
        self.writer = writer;
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn TranslationCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = progress;
        self
    }

    pub fn cache(&self) -> &Arc<dyn TranslationCache> {
        &self.cache
    }

    /// Translate pages `start..=end` of `source` into `target_language` and
    /// write the result as `format`.
    ///
    /// `output_path` defaults to the source path with `_translated` inserted
    /// before the extension.
    ///
    /// # Errors
    /// An empty target language, input validation, page range, PDF and output
    /// errors. A unit whose model call fails does not fail the call: it is
    /// reported in [`TranslationOutcome::failed`] and written with its
    /// original text.
    pub async fn translate(
        &self,
        source: impl AsRef<Path>,
        format: OutputFormat,
        target_language: &str,
        output_path: Option<&Path>,
        start: Option<usize>,
        end: Option<usize>,
    ) -> Result<TranslationOutcome, TranslateError> {
        let started = Instant::now();
        let source = source.as_ref();
        if target_language.trim().is_empty() {
            return Err(TranslateError::InvalidConfig(
                "Target language must not be empty".into(),
            ));
        }
        info!(
            "Translating {} into {} ({})",
            source.display(),
            target_language,
            format
        );

        let mut document = self.parser.parse(source, start, end).await?;
        let key = CacheKey::new(document.fingerprint, format, target_language);

        let entry = self.inflight_entry(&key);
        let _guard = entry.lock().await;
        self.translate_locked(&mut document, &key, output_path, started)
            .await
    }

    /// [`Self::translate`] for an in-memory PDF. The bytes are spooled to a
    /// temp file for the duration of the call.
    pub async fn translate_bytes(
        &self,
        bytes: &[u8],
        format: OutputFormat,
        target_language: &str,
        output_path: &Path,
        start: Option<usize>,
        end: Option<usize>,
    ) -> Result<TranslationOutcome, TranslateError> {
        let spooled = input::spool_bytes(bytes)?;
        self.translate(
            spooled.path(),
            format,
            target_language,
            Some(output_path),
            start,
            end,
        )
        .await
    }

    async fn translate_locked(
        &self,
        document: &mut Document,
        key: &CacheKey,
        output_path: Option<&Path>,
        started: Instant,
    ) -> Result<TranslationOutcome, TranslateError> {
        if let Some(mut cached) = self.cache.get(key) {
            info!("Cache hit for {}", key);
            cached.source_path = document.source_path.clone();
            let path = self.writer.write(&cached, output_path, key.format).await?;
            return Ok(TranslationOutcome {
                output_path: path,
                tokens: TokenUsage::Cached,
                units: cached.unit_count(),
                failed: collect_failures(&cached),
                from_cache: true,
                duration_ms: started.elapsed().as_millis() as u64,
            });
        }

        let tokens = self.translate_units(document, &key.target_language).await;
        let failed = collect_failures(document);
        let path = self.writer.write(document, output_path, key.format).await?;
        let units = document.unit_count();
        self.cache.put(key.clone(), document.clone());

        let duration_ms = started.elapsed().as_millis() as u64;
        info!(
            "Translated {} units ({} failed) in {}ms, tokens: {}",
            units,
            failed.len(),
            duration_ms,
            tokens.as_sentinel()
        );

        Ok(TranslationOutcome {
            output_path: path,
            tokens,
            units,
            failed,
            from_cache: false,
            duration_ms,
        })
    }

    /// Send every unit to the model in order and record the answers.
    async fn translate_units(&self, document: &mut Document, target_language: &str) -> TokenUsage {
        let total_units = document.unit_count();
        let tokenizer = self.model.tokenizer();
        let first_page = document.first_page;
        self.progress.on_translation_start(total_units);

        let mut total_tokens: u64 = 0;
        let mut counted = false;
        let mut success_count = 0usize;

        for (page_idx, page) in document.pages.iter_mut().enumerate() {
            let page_num = first_page + page_idx;
            for (unit_idx, content) in page.contents.iter_mut().enumerate() {
                self.progress.on_unit_start(page_num, unit_idx);

                let prompt = self.model.translate_prompt(content, target_language);
                debug!("[prompt] page {} unit {}\n{}", page_num, unit_idx, prompt);
                if let Some(t) = tokenizer {
                    total_tokens += t.count(&prompt);
                    counted = true;
                }

                let (answer, status) = self.model.make_request(&prompt).await;
                if let Some(t) = tokenizer {
                    total_tokens += t.count(&answer);
                }

                match status {
                    TranslationStatus::Success => {
                        debug!("[answer] page {} unit {}\n{}", page_num, unit_idx, answer);
                        success_count += 1;
                        self.progress
                            .on_unit_complete(page_num, unit_idx, answer.len());
                    }
                    _ => {
                        warn!(
                            "Page {} {} unit {}: translation failed: {}",
                            page_num,
                            content.content_type(),
                            unit_idx,
                            answer
                        );
                        self.progress.on_unit_error(page_num, unit_idx, &answer);
                    }
                }
                content.set_translation(answer, status);
            }
        }

        self.progress
            .on_translation_complete(total_units, success_count);

        if counted {
            debug!("Token usage: {}", total_tokens);
            TokenUsage::Counted(total_tokens)
        } else {
            TokenUsage::NotCounted
        }
    }

    fn inflight_entry(&self, key: &CacheKey) -> InflightEntry<'_> {
        let mut map = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = map.entry(key.clone()).or_insert_with(|| InflightSlot {
            lock: Arc::new(tokio::sync::Mutex::new(())),
            users: 0,
        });
        slot.users += 1;
        InflightEntry {
            map: &self.inflight,
            key: key.clone(),
            lock: Arc::clone(&slot.lock),
        }
    }

    #[cfg(test)]
    fn inflight_len(&self) -> usize {
        self.inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

fn collect_failures(document: &Document) -> Vec<UnitFailure> {
    let mut failures = Vec::new();
    for (page_idx, page) in document.pages.iter().enumerate() {
        for (unit_idx, content) in page.contents.iter().enumerate() {
            if content.status() == TranslationStatus::Failed {
                failures.push(UnitFailure {
                    page: document.first_page + page_idx,
                    index: unit_idx,
                    content_type: content.content_type(),
                    detail: content
                        .translated_text()
                        .map(str::to_string)
                        .unwrap_or_else(|| "model call failed".to_string()),
                });
            }
        }
    }
    failures
}

/// Cache shared by the free-function entrypoints.
static SHARED_CACHE: Lazy<Arc<MemoryCache>> = Lazy::new(|| Arc::new(MemoryCache::new()));

/// Translate a PDF with the environment-configured model and return the
/// token count sentinel: `0` on a cache hit, the count, or `-1` when nothing
/// was counted.
///
/// Repeated calls in one process share a cache. Use [`PdfTranslator`] for an
/// explicit cache, model or progress reporting.
///
/// # Example
/// ```rust,no_run
/// use pdf_translate::{translate_pdf, OutputFormat};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let tokens = translate_pdf("paper.pdf", OutputFormat::Markdown, "Deutsch", None, Some(1), Some(3)).await?;
/// eprintln!("tokens: {tokens}");
/// # Ok(())
/// # }
/// ```
pub async fn translate_pdf(
    path: impl AsRef<Path>,
    format: OutputFormat,
    target_language: &str,
    output_path: Option<&Path>,
    start: Option<usize>,
    end: Option<usize>,
) -> Result<i64, TranslateError> {
    let config = TranslatorConfig::default();
    let translator = PdfTranslator::from_config(&config)?
        .with_cache(Arc::clone(&*SHARED_CACHE) as Arc<dyn TranslationCache>);
    let outcome = translator
        .translate(path, format, target_language, output_path, start, end)
        .await?;
    Ok(outcome.token_count())
}

/// Synchronous wrapper around [`translate_pdf`].
///
/// Creates a temporary tokio runtime internally.
pub fn translate_sync(
    path: impl AsRef<Path>,
    format: OutputFormat,
    target_language: &str,
    output_path: Option<&Path>,
    start: Option<usize>,
    end: Option<usize>,
) -> Result<i64, TranslateError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| TranslateError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(translate_pdf(
            path,
            format,
            target_language,
            output_path,
            start,
            end,
        ))
}
