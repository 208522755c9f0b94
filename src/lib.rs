//! # receipt2json
//!
//! Extract structured data from photographed receipts using Vision Language
//! Models (VLMs).
//!
//! ## Why this crate?
//!
//! Classical OCR on receipt photos produces a jumble of unaligned text —
//! crumpled paper, thermal-printer fading, and perspective skew defeat
//! template-based parsers. Instead this crate hands the photo to a VLM and
//! asks for the business name, line items with prices, tax, and total as a
//! single JSON object, then normalises the model's answer (which may arrive
//! wrapped in markdown fences) into a parsed record.
//!
//! ## Pipeline Overview
//!
//! ```text
//! receipt.jpg
//!  │
//!  ├─ 1. Load       validate the path, decode the image
//!  ├─ 2. Encode     bitmap → base64 PNG ImageData
//!  ├─ 3. Vision     one call to gpt-4.1-nano / claude / gemini / …
//!  ├─ 4. Normalize  strip markdown fences, parse as JSON
//!  └─ 5. Output     receipt.json (4-space pretty-printed)
//! ```
//!
//! The pipeline is strictly sequential and fail-fast: one image in, one JSON
//! file out, and any stage failure aborts the run before the output file is
//! written. There is deliberately no retry, batching, or schema validation —
//! the model's answer is trusted to be JSON (by instruction, not contract)
//! and a malformed answer surfaces as [`ReceiptError::InvalidJson`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use receipt2json::{extract, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / …
//!     let config = ExtractionConfig::default();
//!     let output = extract("receipt.jpg", &config).await?;
//!     println!("{}", output.pretty_json()?);
//!     eprintln!("tokens: {} in / {} out",
//!         output.stats.input_tokens,
//!         output.stats.output_tokens);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `receipt2json` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! receipt2json = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder};
pub use error::ReceiptError;
pub use extract::{
    extract, extract_sync, extract_to_file, extract_to_file_with_model, extract_with_model,
};
pub use output::{default_output_path, ExtractionOutput, ExtractionStats};
pub use pipeline::vision::{
    ExtractionQuery, LlmVisionModel, ModelReply, VisionModel, DEFAULT_MODEL,
};
