//! Output types: the parsed receipt record and run accounting.

use crate::error::ReceiptError;
use crate::pipeline::normalize;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The result of one extraction run.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionOutput {
    /// The parsed receipt record (typically a JSON object mapping field
    /// names to values). Written once, never mutated.
    pub record: serde_json::Value,

    /// The model's raw reply, kept for diagnosis. May contain the markdown
    /// fences that were stripped before parsing.
    pub raw_response: String,

    /// Token and timing accounting for the run.
    pub stats: ExtractionStats,
}

impl ExtractionOutput {
    /// Render the record pretty-printed with 4-space indentation, exactly as
    /// it is written to the output file.
    pub fn pretty_json(&self) -> Result<String, ReceiptError> {
        normalize::to_pretty_json(&self.record)
    }
}

/// Token usage and wall-clock timing for one extraction run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// Prompt tokens billed by the provider (includes the image tiles).
    pub input_tokens: u64,
    /// Completion tokens billed by the provider.
    pub output_tokens: u64,
    /// Wall-clock time of the vision model call.
    pub llm_duration_ms: u64,
    /// Wall-clock time of the whole pipeline run.
    pub total_duration_ms: u64,
}

/// The output path for an input image: same path with the extension replaced
/// by `json`.
///
/// `receipt.jpg` → `receipt.json`; an extensionless input gains the `.json`
/// extension.
pub fn default_output_path(input: &Path) -> PathBuf {
    input.with_extension("json")
}
