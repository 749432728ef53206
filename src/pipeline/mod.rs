//! Pipeline stages for PDF translation.
//!
//! Each submodule implements one step; the orchestrator in
//! [`crate::translate`] drives them.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ tables ──▶ parse ──▶ (model) ──▶ postprocess
//! (path)    (pdfium)    (grid)     (Document)            (cleanup)
//! ```
//!
//! 1. [`input`]   — validate the path (extension, magic bytes) or spool bytes
//! 2. [`extract`] — raw text and positioned segments per page; blocking
//! 3. [`tables`]  — rebuild tables from segment geometry
//! 4. [`parse`]   — range validation, cell removal, cleanup, fingerprint
//! 5. [`postprocess`] — deterministic cleanup of model answers

pub mod extract;
pub mod input;
pub mod parse;
pub mod postprocess;
pub mod tables;
