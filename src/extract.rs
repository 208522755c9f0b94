//! Extraction entry points: the orchestrator that runs the stages in order.
//!
//! Control flow is strictly linear — load, encode, query, normalise — with
//! each stage consuming the previous stage's output. The first failure aborts
//! the run; the output file is written only after every stage has succeeded,
//! and the write itself is atomic (temp file + rename) so a partial JSON file
//! can never be observed.

use crate::config::ExtractionConfig;
use crate::error::ReceiptError;
use crate::output::{ExtractionOutput, ExtractionStats};
use crate::pipeline::vision::{resolve_provider, ExtractionQuery, LlmVisionModel, VisionModel};
use crate::pipeline::{encode, load, normalize};
use crate::prompts::DEFAULT_EXTRACTION_PROMPT;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Extract structured data from a receipt image.
///
/// This is the primary entry point for the library. The provider is resolved
/// from the config (pre-built provider, named provider, or environment
/// auto-detection) and queried exactly once.
///
/// # Arguments
/// * `input`  — Path to a local receipt image (JPEG or PNG)
/// * `config` — Extraction configuration
///
/// # Errors
/// Fails fast on the first stage error: missing/unreadable file, undecodable
/// image, provider not configured, model call failure, or a reply that is not
/// valid JSON after fence stripping.
pub async fn extract(
    input: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ReceiptError> {
    // The path check runs before provider construction so a typo'd path
    // never costs a network round-trip.
    let path = load::resolve_input(input.as_ref())?;
    let provider = resolve_provider(config)?;
    let model = LlmVisionModel::new(provider, config);
    run_pipeline(&path, &model, config).await
}

/// Run the pipeline with a caller-supplied vision model.
///
/// The seam for tests and middleware: everything except the model call is
/// identical to [`extract`].
pub async fn extract_with_model(
    input: impl AsRef<str>,
    model: &dyn VisionModel,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ReceiptError> {
    let path = load::resolve_input(input.as_ref())?;
    run_pipeline(&path, model, config).await
}

/// Extract a receipt and write the record to `output_path`.
///
/// The file is pretty-printed with 4-space indentation and written
/// atomically; on any pipeline failure no output file is created.
pub async fn extract_to_file(
    input: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionStats, ReceiptError> {
    let output = extract(input, config).await?;
    write_record(&output, output_path.as_ref()).await?;
    Ok(output.stats)
}

/// File-writing variant of [`extract_with_model`].
pub async fn extract_to_file_with_model(
    input: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    model: &dyn VisionModel,
    config: &ExtractionConfig,
) -> Result<ExtractionStats, ReceiptError> {
    let output = extract_with_model(input, model, config).await?;
    write_record(&output, output_path.as_ref()).await?;
    Ok(output.stats)
}

/// Synchronous wrapper around [`extract`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_sync(
    input: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ReceiptError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ReceiptError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(extract(input, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// The three stages, in order, against an already-resolved path.
async fn run_pipeline(
    path: &Path,
    model: &dyn VisionModel,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ReceiptError> {
    let total_start = Instant::now();
    info!("Extracting receipt: {}", path.display());

    // ── Stage 1: Load ────────────────────────────────────────────────────
    let img = load::load_image(path)?;
    let image_data = encode::encode_image(&img).map_err(|e| {
        ReceiptError::Internal(format!("PNG re-encoding failed: {e}"))
    })?;
    // The decoded bitmap is no longer needed once encoded for the wire.
    drop(img);

    // ── Stage 2: Query the vision model ──────────────────────────────────
    let instruction = config
        .instruction
        .as_deref()
        .unwrap_or(DEFAULT_EXTRACTION_PROMPT);
    let query = ExtractionQuery::new(image_data, instruction);

    let llm_start = Instant::now();
    let reply = model.query(&query).await?;
    let llm_duration_ms = llm_start.elapsed().as_millis() as u64;
    debug!(
        "Model call took {}ms ({} in / {} out tokens)",
        llm_duration_ms, reply.input_tokens, reply.output_tokens
    );

    // ── Stage 3: Normalise the reply into a record ───────────────────────
    let record = normalize::parse_record(&reply.text)?;

    let stats = ExtractionStats {
        input_tokens: reply.input_tokens,
        output_tokens: reply.output_tokens,
        llm_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Extraction complete in {}ms ({} fields)",
        stats.total_duration_ms,
        record.as_object().map(|o| o.len()).unwrap_or(0)
    );

    Ok(ExtractionOutput {
        record,
        raw_response: reply.text,
        stats,
    })
}

/// Write the record to `path` atomically (temp file + rename).
async fn write_record(output: &ExtractionOutput, path: &Path) -> Result<(), ReceiptError> {
    let json = output.pretty_json()?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                ReceiptError::OutputWriteFailed {
                    path: path.to_path_buf(),
                    source: e,
                }
            })?;
        }
    }

    let tmp_path = tmp_sibling(path);
    tokio::fs::write(&tmp_path, &json)
        .await
        .map_err(|e| ReceiptError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| ReceiptError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    info!("Receipt record written to {}", path.display());
    Ok(())
}

/// Temp-file path next to the final output (same filesystem, so the rename
/// is atomic).
fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "output.json".into());
    name.push(".tmp");
    path.with_file_name(name)
}
