//! Prompts for LLM-based translation.
//!
//! The system prompt frames the model as a translator that returns only the
//! translation; the per-unit prompt wraps the unit's text. Tables are sent in
//! their space/newline textual form and the model is asked to answer in the
//! same shape so [`crate::document::Table::from_text`] can rebuild the grid.

/// Default system prompt sent before every unit.
///
/// Used when `TranslatorConfig::system_prompt` is `None`.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a professional translator. Translate the user's text faithfully into the requested language.

Rules:
- Output ONLY the translation, with no commentary, notes or explanations
- Do NOT wrap the answer in code fences or quotation marks
- Keep numbers, names, codes and units unchanged unless they have a standard translation
- Keep the line structure of the input: one output line per input line"#;

/// Prompt for a prose unit.
pub fn text_prompt(text: &str, target_language: &str) -> String {
    format!("Translate the following text into {target_language}:\n\n{text}")
}

/// Prompt for a table unit, already rendered as space-separated cells and
/// newline-separated rows.
pub fn table_prompt(table_text: &str, target_language: &str) -> String {
    format!(
        "Translate the following table into {target_language}. \
Keep exactly one output line per row and separate cells with ` | `. \
Keep the same number of rows and columns:\n\n{table_text}"
    )
}
