//! Progress-callback trait for per-unit translation events.
//!
//! Inject an [`Arc<dyn TranslationProgressCallback>`] via
//! [`crate::config::TranslatorConfigBuilder::progress_callback`] to receive
//! events as the orchestrator walks each content unit.
//!
//! # Example
//!
//! ```rust
//! use pdf_translate::{TranslationProgressCallback, TranslatorConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: Arc<AtomicUsize>,
//! }
//!
//! impl TranslationProgressCallback for CountingCallback {
//!     fn on_unit_complete(&self, page_num: usize, unit_index: usize, translated_len: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("page {page_num} unit {unit_index}: {translated_len} bytes");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     completed: Arc::new(AtomicUsize::new(0)),
//! });
//!
//! let config = TranslatorConfig::builder()
//!     .progress_callback(counter as Arc<dyn TranslationProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the orchestrator as it processes each content unit.
///
/// Units are processed one at a time, but a shared callback may observe
/// several translations running on different tasks, so implementations must
/// be `Send + Sync`. All methods default to no-ops.
pub trait TranslationProgressCallback: Send + Sync {
    /// Called once after parsing, before the first model call.
    ///
    /// Not called when the result comes from the cache.
    fn on_translation_start(&self, total_units: usize) {
        let _ = total_units;
    }

    /// Called just before the model request for a unit.
    ///
    /// `page_num` is the 1-based physical page; `unit_index` is 0-based
    /// within the page.
    fn on_unit_start(&self, page_num: usize, unit_index: usize) {
        let _ = (page_num, unit_index);
    }

    /// Called when a unit was translated successfully.
    fn on_unit_complete(&self, page_num: usize, unit_index: usize, translated_len: usize) {
        let _ = (page_num, unit_index, translated_len);
    }

    /// Called when a unit's model call reported failure.
    fn on_unit_error(&self, page_num: usize, unit_index: usize, error: &str) {
        let _ = (page_num, unit_index, error);
    }

    /// Called once after every unit has been attempted.
    fn on_translation_complete(&self, total_units: usize, success_count: usize) {
        let _ = (total_units, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl TranslationProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::TranslatorConfig`].
pub type ProgressCallback = Arc<dyn TranslationProgressCallback>;
