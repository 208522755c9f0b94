//! Error types for the receipt2json library.
//!
//! One pipeline run handles exactly one image, so there is a single fatal
//! error enum rather than a fatal/per-item split: every failure aborts the
//! run, no partial result is saved, and the error maps directly onto the
//! stage that raised it (input, decode, extraction, normalisation, output).

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the receipt2json library.
///
/// Every variant is terminal for the run — the pipeline never retries and
/// never writes an output file once any stage has failed.
#[derive(Debug, Error)]
pub enum ReceiptError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Receipt image not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    // ── Decode errors ─────────────────────────────────────────────────────
    /// The file exists but is not a decodable image.
    ///
    /// The format is not pre-validated; this carries whatever the image
    /// library raised for an unsupported or corrupt file.
    #[error("Could not decode image '{path}': {detail}")]
    DecodeFailed { path: PathBuf, detail: String },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The vision model call failed (network, auth, rate limit, timeout).
    ///
    /// Whatever the underlying client raised is passed through untouched —
    /// the pipeline owns no retry or backoff.
    #[error("Vision model call failed: {message}")]
    ModelCallFailed { message: String },

    // ── Normalisation errors ──────────────────────────────────────────────
    /// The model's reply was not valid JSON after fence stripping.
    ///
    /// The model is asked — not guaranteed — to answer with a JSON object.
    /// A truncated snippet of the raw reply is kept so the user can see what
    /// the model actually said.
    #[error("Model reply is not valid JSON: {detail}\nReply started with: {snippet:?}")]
    InvalidJson { detail: String, snippet: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output JSON file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}
