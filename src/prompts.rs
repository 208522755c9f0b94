//! Extraction instruction sent alongside the receipt image.
//!
//! Centralising the prompt here serves two purposes:
//!
//! 1. **Single source of truth** — changing what is asked of the model (e.g.
//!    adding a currency field) requires editing exactly one place.
//!
//! 2. **Testability** — unit tests can inspect the prompt directly without
//!    spinning up a real VLM, making prompt regressions easy to catch.
//!
//! Callers can override the default via
//! [`crate::config::ExtractionConfig::instruction`]; the constant here is used
//! only when no override is provided.

/// Default instruction for extracting structured data from a receipt image.
///
/// This prompt is used when `ExtractionConfig::instruction` is `None`.
///
/// The "JSON object only, no fences" rule is an instruction, not a contract —
/// models still occasionally wrap their answer in ```` ```json ```` fences,
/// which is why [`crate::pipeline::normalize`] strips them defensively.
pub const DEFAULT_EXTRACTION_PROMPT: &str = r#"You are an expert receipt reader. Extract structured data from this receipt image.

Follow these rules precisely:

1. FIELDS
   - "business": the business or store name printed at the top of the receipt
   - "items": an array of line items, each with "name" and "price"
   - "tax": the tax amount, if printed
   - "total": the final total amount

2. VALUES
   - Transcribe names exactly as printed; do not invent or expand abbreviations
   - Report prices as plain numbers without currency symbols
   - Use null for any field that is not legible or not present

3. OUTPUT FORMAT
   - Answer with a single JSON object ONLY
   - Do NOT wrap the answer in ```json fences
   - Do NOT add commentary, explanations, or any text outside the object"#;
