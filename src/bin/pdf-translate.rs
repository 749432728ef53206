//! CLI binary for pdf-translate.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `TranslatorConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf_translate::{
    OutputFormat, PdfTranslator, ProgressCallback, TranslationProgressCallback, TranslatorConfig,
    DEFAULT_TARGET_LANGUAGE,
};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live progress bar with one log line per translated unit.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Start time per (page, unit).
    start_times: Mutex<HashMap<(usize, usize), Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner until `on_translation_start` reports the unit count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Parsing PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} units  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Translating");
        self.bar.reset_eta();
    }

    fn elapsed_secs(&self, page_num: usize, unit_index: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&(page_num, unit_index)))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Clear the spinner when the run ends without reaching the unit loop
    /// (cache hit or early error).
    fn finish(&self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

impl TranslationProgressCallback for CliProgressCallback {
    fn on_translation_start(&self, total_units: usize) {
        self.activate_bar(total_units);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Translating {total_units} units…"))
        ));
    }

    fn on_unit_start(&self, page_num: usize, unit_index: usize) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert((page_num, unit_index), Instant::now());
        }
        self.bar
            .set_message(format!("page {page_num} unit {unit_index}"));
    }

    fn on_unit_complete(&self, page_num: usize, unit_index: usize, translated_len: usize) {
        let secs = self.elapsed_secs(page_num, unit_index);
        self.bar.println(format!(
            "  {} Page {:>3} unit {}  {:<8}  {}",
            green("✓"),
            page_num,
            unit_index,
            dim(&format!("{translated_len:>5} bytes")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_unit_error(&self, page_num: usize, unit_index: usize, error: &str) {
        let secs = self.elapsed_secs(page_num, unit_index);
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Page {:>3} unit {}  {}  {}",
            red("✗"),
            page_num,
            unit_index,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_translation_complete(&self, total_units: usize, success_count: usize) {
        let failed = total_units.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} units translated successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} units translated  ({} kept in the original language)",
                if failed == total_units {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_units,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Translate page 1 into Chinese (the defaults), embedding a CJK font
  pdf-translate --font /usr/share/fonts/truetype/noto/NotoSansSC-Regular.ttf paper.pdf

  # Pages 2-5 into German, as Markdown
  pdf-translate --start 2 --end 5 --lang Deutsch --format markdown paper.pdf

  # Explicit output path and model
  pdf-translate --model gpt-4o --provider openai paper.pdf -o out/paper.de.pdf

  # Machine-readable result
  pdf-translate --json paper.pdf

OUTPUT:
  Without -o the result is written next to the input with "_translated"
  inserted before the extension (paper.pdf → paper_translated.pdf).
  PDF output uses the builtin Helvetica/Courier fonts, which only cover
  Western European text. For Chinese, Japanese, Korean, Cyrillic or Greek
  pass a TrueType font with --font (or PDF_TRANSLATE_FONT); without one such
  text fails to render instead of producing a PDF with missing glyphs.
  Markdown output needs no font.

TOKEN COUNT:
  The summary reports prompt + answer tokens. 0 means the translation came
  from the cache; -1 means nothing was counted (no text found, no tokenizer
  for the model, or --no-token-count).

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to libpdfium (otherwise ./ then the system path)
  PDF_TRANSLATE_FONT      TrueType font embedded in PDF output
"#;

/// Translate the text and tables of a PDF with an LLM.
#[derive(Parser, Debug)]
#[command(
    name = "pdf-translate",
    version,
    about = "Translate the text and tables of a PDF with an LLM",
    long_about = "Translate a page range of a PDF document with a Large Language Model. \
Prose and tables are translated separately and written back as PDF or Markdown. \
Supports OpenAI, Anthropic, Google Gemini, Azure OpenAI, and any OpenAI-compatible \
endpoint (Ollama, vLLM, LiteLLM, etc.).",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path.
    input: PathBuf,

    /// First page to translate (1-based).
    #[arg(long, default_value_t = 1)]
    start: usize,

    /// Last page to translate (inclusive). Defaults to --start.
    #[arg(long)]
    end: Option<usize>,

    /// Target language, e.g. Deutsch, Français, English, 中文.
    #[arg(short, long, env = "PDF_TRANSLATE_LANG", default_value = DEFAULT_TARGET_LANGUAGE)]
    lang: String,

    /// Output format: pdf or markdown.
    #[arg(short, long, env = "PDF_TRANSLATE_FORMAT", default_value = "pdf")]
    format: OutputFormat,

    /// Write the translation to this file instead of <input>_translated.<ext>.
    #[arg(short, long, env = "PDF_TRANSLATE_OUTPUT")]
    output: Option<PathBuf>,

    /// LLM model ID (e.g. gpt-4o-mini, gpt-4o, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(
        long,
        env = "EDGEQUAKE_LLM_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set.\n\
          Supported: openai, anthropic, gemini, azure, ollama, or any OpenAI-compatible URL."
    )]
    provider: Option<String>,

    /// TrueType font (.ttf) to embed in PDF output, e.g. a Noto Sans CJK face.
    #[arg(long, env = "PDF_TRANSLATE_FONT")]
    font: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF_TRANSLATE_PASSWORD")]
    password: Option<String>,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "PDF_TRANSLATE_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Max LLM output tokens per content unit.
    #[arg(long, env = "PDF_TRANSLATE_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "PDF_TRANSLATE_TEMPERATURE", default_value_t = 0.3)]
    temperature: f32,

    /// Skip token accounting; the reported count is -1.
    #[arg(long)]
    no_token_count: bool,

    /// Print the result as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF_TRANSLATE_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF_TRANSLATE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF_TRANSLATE_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; -v brings them back.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let cli_progress = show_progress.then(CliProgressCallback::new_dynamic);
    let progress_cb: Option<ProgressCallback> = cli_progress
        .as_ref()
        .map(|cb| Arc::clone(cb) as Arc<dyn TranslationProgressCallback>);

    let config = build_config(&cli, progress_cb).await?;
    let translator = PdfTranslator::from_config(&config).context("Failed to set up the model")?;

    // ── Run translation ──────────────────────────────────────────────────
    let result = translator
        .translate(
            &cli.input,
            cli.format,
            &cli.lang,
            cli.output.as_deref(),
            Some(cli.start),
            cli.end,
        )
        .await;
    if let Some(ref cb) = cli_progress {
        cb.finish();
    }
    let outcome = result.context("Translation failed")?;

    if cli.json {
        let json = serde_json::json!({
            "output_path": outcome.output_path,
            "token_count": outcome.token_count(),
            "units": outcome.units,
            "failed": outcome.failed,
            "from_cache": outcome.from_cache,
            "duration_ms": outcome.duration_ms,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&json).context("Failed to serialise output")?
        );
        return Ok(());
    }

    if !cli.quiet {
        if !show_progress {
            for failure in &outcome.failed {
                eprintln!("  {} {}", red("✗"), failure);
            }
        }
        eprintln!(
            "{}  {} units{}  {}ms  →  {}",
            if outcome.failed.is_empty() {
                green("✔")
            } else {
                cyan("⚠")
            },
            outcome.units,
            if outcome.from_cache {
                dim(" (cached)")
            } else {
                String::new()
            },
            outcome.duration_ms,
            bold(&outcome.output_path.display().to_string()),
        );
        eprintln!("   {} tokens", dim(&outcome.token_count().to_string()));
    }
    println!("{}", outcome.output_path.display());

    Ok(())
}

/// Map CLI args to `TranslatorConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<TranslatorConfig> {
    let mut builder = TranslatorConfig::builder()
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .token_accounting(!cli.no_token_count);

    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref font) = cli.font {
        builder = builder.pdf_font(font.clone());
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
