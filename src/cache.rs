//! Whole-document translation cache.
//!
//! A cache entry maps `(fingerprint, output format, target language)` to a
//! fully translated [`Document`]. Entries are written once, after a complete
//! pass, and never hold pending units. The cache is an injected object so
//! tests and independent translators don't share hidden state.

use crate::document::Document;
use crate::writer::OutputFormat;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use tracing::warn;

/// Composite cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub fingerprint: u64,
    pub format: OutputFormat,
    pub target_language: String,
}

impl CacheKey {
    pub fn new(fingerprint: u64, format: OutputFormat, target_language: impl Into<String>) -> Self {
        Self {
            fingerprint,
            format,
            target_language: target_language.into(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}",
            self.fingerprint, self.format, self.target_language
        )
    }
}

/// Storage for translated documents.
pub trait TranslationCache: Send + Sync {
    fn get(&self, key: &CacheKey) -> Option<Document>;

    /// Store a translated document. Returns `false` (and stores nothing)
    /// when the document still has pending units.
    fn put(&self, key: CacheKey, document: Document) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-process cache; entries live as long as the cache object.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<CacheKey, Document>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl TranslationCache for MemoryCache {
    fn get(&self, key: &CacheKey) -> Option<Document> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn put(&self, key: CacheKey, document: Document) -> bool {
        if !document.is_fully_translated() {
            warn!("Refusing to cache {key}: document has pending units");
            return false;
        }
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, document);
        true
    }

    fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
