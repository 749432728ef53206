//! Post-processing: deterministic cleanup of model answers.
//!
//! Even when told to return only the translation, chat models sometimes wrap
//! the answer in a code fence, prefix it with a label such as
//! `Translation:`, use `\r\n` line endings, or leak zero-width characters.
//! These rules fix such quirks without touching the translated content.
//!
//! ## Rule Order
//!
//! Fences are stripped before line endings are normalised so the fence regex
//! sees the raw answer; the label rule runs after fence stripping because the
//! label usually sits inside the fence.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all post-processing rules to a raw model answer.
///
/// Rules (applied in order):
/// 1. Strip outer code fences
/// 2. Strip a leading `Translation:` style label
/// 3. Normalise line endings (CRLF → LF)
/// 4. Trim trailing whitespace per line
/// 5. Collapse 3+ consecutive blank lines down to 1
/// 6. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 7. Trim leading and trailing blank lines
pub fn clean_translation(input: &str) -> String {
    let s = strip_code_fences(input);
    let s = strip_answer_label(&s);
    let s = normalise_line_endings(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    let s = remove_invisible_chars(&s);
    s.trim_matches('\n').to_string()
}

// ── Rule 1: Strip outer code fences ──────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z0-9_-]*\r?\n(.*?)\r?\n```\s*$").unwrap());

fn strip_code_fences(input: &str) -> String {
    match RE_OUTER_FENCES.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

// ── Rule 2: Strip answer label ───────────────────────────────────────────────

static RE_ANSWER_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?i:translation|translated text)\s*[:：]\s*").unwrap());

fn strip_answer_label(input: &str) -> String {
    RE_ANSWER_LABEL.replace(input, "").to_string()
}

// ── Rule 3: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 4: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 5: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

// ── Rule 6: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}
