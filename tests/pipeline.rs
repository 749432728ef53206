//! Orchestrator tests over an in-memory PDF backend and a scripted model.
//!
//! No native pdfium library or API key is needed: the backend serves fixed
//! pages, and the model upper-cases whatever it is asked to translate.

use async_trait::async_trait;
use pdf_translate::{
    Content, ContentType, ExtractedPages, MemoryCache, OutputFormat, PageSelector, PdfBackend,
    PdfParser, PdfTranslator, RawPage, Table, TokenUsage, Tokenizer, TranslateError,
    TranslationCache, TranslationModel, TranslationProgressCallback, TranslationStatus,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

// ── Test helpers ─────────────────────────────────────────────────────────────

struct FixedBackend {
    pages: Vec<RawPage>,
}

impl PdfBackend for FixedBackend {
    fn extract_pages(
        &self,
        _path: &Path,
        _password: Option<&str>,
        select: PageSelector<'_>,
    ) -> Result<ExtractedPages, TranslateError> {
        let range = select(self.pages.len())?;
        Ok(ExtractedPages {
            total_pages: self.pages.len(),
            pages: self.pages[range.clone()].to_vec(),
            range,
        })
    }
}

/// Counts how often the document is opened.
struct CountingBackend {
    inner: FixedBackend,
    opens: AtomicUsize,
}

impl PdfBackend for CountingBackend {
    fn extract_pages(
        &self,
        path: &Path,
        password: Option<&str>,
        select: PageSelector<'_>,
    ) -> Result<ExtractedPages, TranslateError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.inner.extract_pages(path, password, select)
    }
}

/// One token per whitespace-separated word.
struct WordTokenizer;

impl Tokenizer for WordTokenizer {
    fn encode(&self, text: &str) -> Vec<u32> {
        (0..text.split_whitespace().count() as u32).collect()
    }
}

/// Upper-cases the payload of every prompt; fails on payloads containing "FAIL".
struct ScriptedModel {
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
    tokenizer: Option<WordTokenizer>,
}

impl ScriptedModel {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            tokenizer: Some(WordTokenizer),
        })
    }

    fn without_tokenizer() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            tokenizer: None,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranslationModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn make_request(&self, prompt: &str) -> (String, TranslationStatus) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        let payload = prompt.split_once("\n\n").map(|(_, p)| p).unwrap_or(prompt);
        if payload.contains("FAIL") {
            return ("upstream error: 503".to_string(), TranslationStatus::Failed);
        }
        (payload.to_uppercase(), TranslationStatus::Success)
    }

    fn tokenizer(&self) -> Option<&dyn Tokenizer> {
        self.tokenizer.as_ref().map(|t| t as &dyn Tokenizer)
    }
}

fn text_page(text: &str) -> RawPage {
    RawPage {
        text: text.to_string(),
        tables: vec![],
    }
}

fn grid(rows: &[&[&str]]) -> Table {
    Table::new(
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect(),
    )
}

/// A file the input checks accept: `.pdf` extension, `%PDF` magic.
fn fake_pdf(dir: &TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, b"%PDF-1.7\n% placeholder\n").unwrap();
    path
}

fn translator(model: &Arc<ScriptedModel>, pages: Vec<RawPage>) -> PdfTranslator {
    let backend = Arc::new(FixedBackend { pages });
    PdfTranslator::new(Arc::clone(model) as Arc<dyn TranslationModel>)
        .with_parser(PdfParser::new(backend))
}

// ── Parsing ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn parsed_page_count_matches_range() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = fake_pdf(&dir, "five.pdf");
    let pages = (1..=5).map(|i| text_page(&format!("page {i}"))).collect();
    let parser = PdfParser::new(Arc::new(FixedBackend { pages }));

    let doc = parser.parse(&pdf, Some(2), Some(4)).await.unwrap();
    assert_eq!(doc.pages.len(), 3);
    assert_eq!(doc.first_page, 2);
    assert_eq!(doc.pages[0].contents[0].original_text(), Some("page 2"));

    let single = parser.parse(&pdf, Some(5), None).await.unwrap();
    assert_eq!(single.pages.len(), 1);
}

#[tokio::test]
async fn parse_opens_the_document_once() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = fake_pdf(&dir, "three.pdf");
    let backend = Arc::new(CountingBackend {
        inner: FixedBackend {
            pages: (1..=3).map(|i| text_page(&format!("page {i}"))).collect(),
        },
        opens: AtomicUsize::new(0),
    });
    let parser = PdfParser::new(Arc::clone(&backend) as Arc<dyn PdfBackend>);

    let doc = parser.parse(&pdf, Some(2), Some(3)).await.unwrap();
    assert_eq!(doc.pages.len(), 2);
    assert_eq!(doc.first_page, 2);
    assert_eq!(backend.opens.load(Ordering::SeqCst), 1);

    let err = parser.parse(&pdf, Some(2), Some(9)).await.unwrap_err();
    assert!(matches!(
        err,
        TranslateError::PageOutOfRange {
            requested: 9,
            total: 3
        }
    ));
    assert_eq!(backend.opens.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn end_beyond_page_count_is_rejected_before_any_model_call() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = fake_pdf(&dir, "five.pdf");
    let model = ScriptedModel::new();
    let pages = (1..=5).map(|i| text_page(&format!("page {i}"))).collect();
    let t = translator(&model, pages);

    let err = t
        .translate(&pdf, OutputFormat::Markdown, "Deutsch", None, Some(1), Some(6))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TranslateError::PageOutOfRange {
            requested: 6,
            total: 5
        }
    ));
    assert_eq!(model.calls(), 0);

    // The last page itself is fine.
    t.translate(&pdf, OutputFormat::Markdown, "Deutsch", None, Some(5), Some(5))
        .await
        .unwrap();
}

#[tokio::test]
async fn table_cells_are_not_translated_as_prose() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = fake_pdf(&dir, "table.pdf");
    let page = RawPage {
        text: "Staff list\nName Age\nAlice 30\n".into(),
        tables: vec![grid(&[&["Name", "Age"], &["Alice", "30"]])],
    };
    let parser = PdfParser::new(Arc::new(FixedBackend { pages: vec![page] }));

    let doc = parser.parse(&pdf, None, None).await.unwrap();
    let units = &doc.pages[0].contents;
    assert_eq!(units.len(), 2);
    assert_eq!(units[0].content_type(), ContentType::Text);
    let prose = units[0].original_text().unwrap();
    assert_eq!(prose, "Staff list");
    for cell in ["Name", "Age", "Alice", "30"] {
        assert!(!prose.contains(cell), "cell {cell:?} leaked into prose");
    }
    assert_eq!(units[1].content_type(), ContentType::Table);
}

#[tokio::test]
async fn fingerprint_is_stable_across_parses() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = fake_pdf(&dir, "a.pdf");
    let parser = PdfParser::new(Arc::new(FixedBackend {
        pages: vec![text_page("same"), text_page("text")],
    }));

    let a = parser.parse(&pdf, Some(1), Some(2)).await.unwrap();
    let b = parser.parse(&pdf, Some(1), Some(2)).await.unwrap();
    assert_eq!(a.fingerprint, b.fingerprint);

    let c = parser.parse(&pdf, Some(1), Some(1)).await.unwrap();
    assert_ne!(a.fingerprint, c.fingerprint);
}

#[tokio::test]
async fn non_pdf_inputs_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let model = ScriptedModel::new();
    let t = translator(&model, vec![text_page("x")]);

    let txt = dir.path().join("notes.txt");
    std::fs::write(&txt, "hello").unwrap();
    let err = t
        .translate(&txt, OutputFormat::Pdf, "Deutsch", None, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, TranslateError::UnsupportedFileType { .. }));

    let missing = dir.path().join("missing.pdf");
    let err = t
        .translate(&missing, OutputFormat::Pdf, "Deutsch", None, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, TranslateError::FileNotFound { .. }));

    let disguised = dir.path().join("image.pdf");
    std::fs::write(&disguised, b"\x89PNG\r\n").unwrap();
    let err = t
        .translate(&disguised, OutputFormat::Pdf, "Deutsch", None, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, TranslateError::NotAPdf { .. }));
    assert_eq!(model.calls(), 0);
}

// ── Translation ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn two_page_prose_document_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = fake_pdf(&dir, "story.pdf");
    let model = ScriptedModel::new();
    let t = translator(
        &model,
        vec![text_page("Hello world"), text_page("Goodbye world")],
    );

    let first = t
        .translate(&pdf, OutputFormat::Markdown, "Deutsch", None, Some(1), Some(2))
        .await
        .unwrap();

    assert_eq!(model.calls(), 2);
    assert_eq!(first.units, 2);
    assert!(first.failed.is_empty());
    assert!(!first.from_cache);
    assert!(matches!(first.tokens, TokenUsage::Counted(n) if n > 0));
    assert!(first.token_count() > 0);
    assert_eq!(first.output_path, dir.path().join("story_translated.md"));

    let md = std::fs::read_to_string(&first.output_path).unwrap();
    assert_eq!(md, "HELLO WORLD\n\n---\n\nGOODBYE WORLD\n");

    let second = t
        .translate(&pdf, OutputFormat::Markdown, "Deutsch", None, Some(1), Some(2))
        .await
        .unwrap();
    assert_eq!(second.tokens, TokenUsage::Cached);
    assert_eq!(second.token_count(), 0);
    assert!(second.from_cache);
    assert_eq!(model.calls(), 2);
}

#[tokio::test]
async fn token_count_adds_prompts_and_answers() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = fake_pdf(&dir, "one.pdf");
    let model = ScriptedModel::new();
    let t = translator(&model, vec![text_page("one two three")]);

    let outcome = t
        .translate(&pdf, OutputFormat::Markdown, "Deutsch", None, None, None)
        .await
        .unwrap();

    let prompt = pdf_translate::prompts::text_prompt("one two three", "Deutsch");
    let expected = WordTokenizer.count(&prompt) + 3;
    assert_eq!(outcome.tokens, TokenUsage::Counted(expected));
}

#[tokio::test]
async fn any_key_component_change_translates_again() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = fake_pdf(&dir, "doc.pdf");
    let model = ScriptedModel::new();
    let t = translator(
        &model,
        vec![RawPage {
            text: "Intro\nA B\nC D\n".into(),
            tables: vec![grid(&[&["A", "B"], &["C", "D"]])],
        }],
    );
    let out = dir.path().join("out");

    t.translate(&pdf, OutputFormat::Markdown, "Deutsch", Some(out.join("a.md").as_path()), None, None)
        .await
        .unwrap();
    assert_eq!(model.calls(), 2);

    t.translate(&pdf, OutputFormat::Markdown, "Français", Some(out.join("b.md").as_path()), None, None)
        .await
        .unwrap();
    assert_eq!(model.calls(), 4);

    t.translate(&pdf, OutputFormat::Pdf, "Deutsch", Some(out.join("c.pdf").as_path()), None, None)
        .await
        .unwrap();
    assert_eq!(model.calls(), 6);

    let hit = t
        .translate(&pdf, OutputFormat::Markdown, "Deutsch", Some(out.join("d.md").as_path()), None, None)
        .await
        .unwrap();
    assert!(hit.from_cache);
    assert_eq!(model.calls(), 6);
    assert_eq!(t.cache().len(), 3);
}

#[tokio::test]
async fn language_and_format_come_from_each_call() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = fake_pdf(&dir, "doc.pdf");
    let model = ScriptedModel::new();
    let t = translator(&model, vec![text_page("Hello")]);

    let md = t
        .translate(&pdf, OutputFormat::Markdown, "Deutsch", None, None, None)
        .await
        .unwrap();
    let pdf_out = t
        .translate(&pdf, OutputFormat::Pdf, "Français", None, None, None)
        .await
        .unwrap();

    assert_eq!(md.output_path, dir.path().join("doc_translated.md"));
    assert_eq!(pdf_out.output_path, dir.path().join("doc_translated.pdf"));
    let prompts = model.prompts.lock().unwrap();
    assert!(prompts[0].contains("Deutsch"));
    assert!(prompts[1].contains("Français"));

    drop(prompts);
    let err = t
        .translate(&pdf, OutputFormat::Markdown, "  ", None, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, TranslateError::InvalidConfig(_)));
    assert_eq!(model.calls(), 2);
}

#[tokio::test]
async fn failed_unit_keeps_original_and_later_units_continue() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = fake_pdf(&dir, "mixed.pdf");
    let model = ScriptedModel::new();
    let t = translator(
        &model,
        vec![text_page("please FAIL here"), text_page("all fine")],
    );

    let outcome = t
        .translate(&pdf, OutputFormat::Markdown, "Deutsch", None, Some(1), Some(2))
        .await
        .unwrap();

    assert_eq!(model.calls(), 2);
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].page, 1);
    assert_eq!(outcome.failed[0].index, 0);
    assert!(outcome.failed[0].detail.contains("503"));

    // The failure answer is counted like any other answer.
    let prompts = WordTokenizer.count(&pdf_translate::prompts::text_prompt("please FAIL here", "Deutsch"))
        + WordTokenizer.count(&pdf_translate::prompts::text_prompt("all fine", "Deutsch"));
    let answers = WordTokenizer.count("upstream error: 503") + WordTokenizer.count("ALL FINE");
    assert_eq!(outcome.tokens, TokenUsage::Counted(prompts + answers));

    let md = std::fs::read_to_string(&outcome.output_path).unwrap();
    assert!(md.contains("please FAIL here"));
    assert!(md.contains("ALL FINE"));
    assert!(!md.contains("503"));
}

#[tokio::test]
async fn table_units_are_written_as_tables() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = fake_pdf(&dir, "table.pdf");
    let model = ScriptedModel::new();
    let t = translator(
        &model,
        vec![RawPage {
            text: "Staff\nName Age\nAlice 30\n".into(),
            tables: vec![grid(&[&["Name", "Age"], &["Alice", "30"]])],
        }],
    );

    let outcome = t
        .translate(&pdf, OutputFormat::Markdown, "Deutsch", None, None, None)
        .await
        .unwrap();
    assert_eq!(model.calls(), 2);

    let md = std::fs::read_to_string(&outcome.output_path).unwrap();
    assert!(md.starts_with("STAFF\n\n"), "got: {md}");
    assert!(md.contains("| NAME | AGE |"), "got: {md}");
    assert!(md.contains("| ALICE | 30 |"), "got: {md}");
}

#[tokio::test]
async fn document_without_units_reports_not_counted() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = fake_pdf(&dir, "blank.pdf");
    let model = ScriptedModel::new();
    let t = translator(&model, vec![text_page("  \n\n"), RawPage::default()]);

    let outcome = t
        .translate(&pdf, OutputFormat::Pdf, "Deutsch", None, Some(1), Some(2))
        .await
        .unwrap();

    assert_eq!(model.calls(), 0);
    assert_eq!(outcome.units, 0);
    assert_eq!(outcome.tokens, TokenUsage::NotCounted);
    assert_eq!(outcome.token_count(), -1);
    assert!(outcome.output_path.exists());
}

#[tokio::test]
async fn model_without_tokenizer_reports_not_counted() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = fake_pdf(&dir, "a.pdf");
    let model = ScriptedModel::without_tokenizer();
    let t = translator(&model, vec![text_page("Hello")]);

    let outcome = t
        .translate(&pdf, OutputFormat::Markdown, "Deutsch", None, None, None)
        .await
        .unwrap();
    assert_eq!(model.calls(), 1);
    assert_eq!(outcome.token_count(), -1);
}

#[tokio::test]
async fn injected_cache_is_shared_between_translators() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = fake_pdf(&dir, "a.pdf");
    let cache: Arc<dyn TranslationCache> = Arc::new(MemoryCache::new());
    let model = ScriptedModel::new();

    let first = translator(&model, vec![text_page("Hello")]).with_cache(Arc::clone(&cache));
    first
        .translate(&pdf, OutputFormat::Markdown, "Deutsch", None, None, None)
        .await
        .unwrap();

    let second = translator(&model, vec![text_page("Hello")]).with_cache(Arc::clone(&cache));
    let outcome = second
        .translate(&pdf, OutputFormat::Markdown, "Deutsch", None, None, None)
        .await
        .unwrap();
    assert!(outcome.from_cache);
    assert_eq!(model.calls(), 1);

    // Separate caches do not share entries.
    let isolated = translator(&model, vec![text_page("Hello")]);
    isolated
        .translate(&pdf, OutputFormat::Markdown, "Deutsch", None, None, None)
        .await
        .unwrap();
    assert_eq!(model.calls(), 2);
}

#[tokio::test]
async fn cache_hit_writes_next_to_the_new_source() {
    let dir = tempfile::tempdir().unwrap();
    let a = fake_pdf(&dir, "a.pdf");
    let b = fake_pdf(&dir, "copy.pdf");
    let model = ScriptedModel::new();
    let t = translator(&model, vec![text_page("Hello")]);

    t.translate(&a, OutputFormat::Markdown, "Deutsch", None, None, None)
        .await
        .unwrap();
    let hit = t
        .translate(&b, OutputFormat::Markdown, "Deutsch", None, None, None)
        .await
        .unwrap();

    assert!(hit.from_cache);
    assert_eq!(hit.output_path, dir.path().join("copy_translated.md"));
    assert_eq!(std::fs::read_to_string(&hit.output_path).unwrap(), "HELLO\n");
}

#[tokio::test]
async fn concurrent_calls_with_same_key_translate_once() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = fake_pdf(&dir, "a.pdf");
    let model = ScriptedModel::new();
    let t = Arc::new(translator(&model, vec![text_page("Hello"), text_page("World")]));

    let spawn = |name: &str| {
        let t = Arc::clone(&t);
        let pdf = pdf.clone();
        let out = dir.path().join(name);
        tokio::spawn(async move {
            t.translate(&pdf, OutputFormat::Markdown, "Deutsch", Some(out.as_path()), Some(1), Some(2))
                .await
                .unwrap()
        })
    };
    let (x, y) = tokio::join!(spawn("x.md"), spawn("y.md"));
    let (x, y) = (x.unwrap(), y.unwrap());

    assert_eq!(model.calls(), 2);
    assert_eq!([x.from_cache, y.from_cache].iter().filter(|c| **c).count(), 1);
    assert_eq!(
        std::fs::read_to_string(&x.output_path).unwrap(),
        std::fs::read_to_string(&y.output_path).unwrap()
    );
}

#[tokio::test]
async fn bytes_input_is_translated() {
    let dir = tempfile::tempdir().unwrap();
    let model = ScriptedModel::new();
    let t = translator(&model, vec![text_page("Hello")]);
    let out = dir.path().join("from_bytes.md");

    let outcome = t
        .translate_bytes(b"%PDF-1.4\n", OutputFormat::Markdown, "Deutsch", &out, None, None)
        .await
        .unwrap();
    assert_eq!(outcome.output_path, out);
    assert_eq!(std::fs::read_to_string(&out).unwrap(), "HELLO\n");

    let err = t
        .translate_bytes(b"GIF89a", OutputFormat::Markdown, "Deutsch", &out, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, TranslateError::NotAPdf { .. }));
}

// ── Progress ────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl TranslationProgressCallback for Recorder {
    fn on_translation_start(&self, total_units: usize) {
        self.events.lock().unwrap().push(format!("start {total_units}"));
    }

    fn on_unit_complete(&self, page_num: usize, unit_index: usize, _len: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("ok {page_num}.{unit_index}"));
    }

    fn on_unit_error(&self, page_num: usize, unit_index: usize, _error: &str) {
        self.events
            .lock()
            .unwrap()
            .push(format!("err {page_num}.{unit_index}"));
    }

    fn on_translation_complete(&self, total_units: usize, success_count: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("done {success_count}/{total_units}"));
    }
}

#[tokio::test]
async fn progress_events_follow_unit_order() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = fake_pdf(&dir, "a.pdf");
    let model = ScriptedModel::new();
    let recorder = Arc::new(Recorder::default());
    let t = translator(
        &model,
        vec![text_page("x"), text_page("y"), text_page("FAIL"), text_page("z")],
    )
    .with_progress(Arc::clone(&recorder) as Arc<dyn TranslationProgressCallback>);

    t.translate(&pdf, OutputFormat::Markdown, "Deutsch", None, Some(2), Some(4))
        .await
        .unwrap();

    assert_eq!(
        *recorder.events.lock().unwrap(),
        vec!["start 3", "ok 2.0", "err 3.0", "ok 4.0", "done 2/3"]
    );
}

#[test]
fn content_round_trips_through_json() {
    let mut c = Content::table(grid(&[&["a", "b"]]));
    c.set_translation("x y", TranslationStatus::Success);
    let json = serde_json::to_string(&c).unwrap();
    let back: Content = serde_json::from_str(&json).unwrap();
    assert_eq!(back, c);
}
