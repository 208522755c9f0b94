//! Integration tests for the extraction pipeline.
//!
//! The vision model is the only stage that touches the network, so these
//! tests inject a scripted [`VisionModel`] and exercise everything around it
//! for real: path validation, image decoding, fence stripping, JSON parsing,
//! and the atomic output write.

use async_trait::async_trait;
use receipt2json::{
    default_output_path, extract_to_file_with_model, extract_with_model, ExtractionConfig,
    ExtractionQuery, ModelReply, ReceiptError, VisionModel,
};
use serde_json::json;
use std::path::{Path, PathBuf};

// ── Test doubles ─────────────────────────────────────────────────────────────

/// Replies with a fixed canned string, whatever the image.
struct ScriptedModel {
    reply: &'static str,
}

#[async_trait]
impl VisionModel for ScriptedModel {
    async fn query(&self, _query: &ExtractionQuery) -> Result<ModelReply, ReceiptError> {
        Ok(ModelReply {
            text: self.reply.to_string(),
            input_tokens: 900,
            output_tokens: 42,
        })
    }
}

/// Fails the test if the pipeline reaches the model at all.
struct UnreachableModel;

#[async_trait]
impl VisionModel for UnreachableModel {
    async fn query(&self, _query: &ExtractionQuery) -> Result<ModelReply, ReceiptError> {
        panic!("the vision model must not be called for this input");
    }
}

/// Simulates a provider-side failure (timeout, auth, rate limit).
struct FailingModel;

#[async_trait]
impl VisionModel for FailingModel {
    async fn query(&self, _query: &ExtractionQuery) -> Result<ModelReply, ReceiptError> {
        Err(ReceiptError::ModelCallFailed {
            message: "HTTP 429 from provider".into(),
        })
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Write a small but genuine JPEG receipt stand-in at `dir/name`.
fn write_test_image(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
        32,
        64,
        image::Rgb([240, 240, 240]),
    ));
    img.save(&path).expect("test image should encode");
    path
}

fn config() -> ExtractionConfig {
    ExtractionConfig::default()
}

// ── Input validation ─────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_input_errors_before_any_model_call() {
    let err = extract_with_model("/no/such/receipt.jpg", &UnreachableModel, &config())
        .await
        .expect_err("missing file must fail");

    assert!(matches!(err, ReceiptError::FileNotFound { .. }));
    assert!(
        err.to_string().contains("/no/such/receipt.jpg"),
        "error must reference the given path, got: {err}"
    );
}

#[tokio::test]
async fn undecodable_input_errors_before_any_model_call() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("receipt.jpg");
    std::fs::write(&path, b"definitely not an image").unwrap();

    let err = extract_with_model(path.to_str().unwrap(), &UnreachableModel, &config())
        .await
        .expect_err("garbage bytes must fail to decode");

    assert!(matches!(err, ReceiptError::DecodeFailed { .. }));
}

// ── Normalisation behaviour through the full pipeline ────────────────────────

#[tokio::test]
async fn fenced_reply_is_parsed() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_test_image(dir.path(), "receipt.jpg");

    let model = ScriptedModel {
        reply: "```json\n{\"total\": 10.5}\n```",
    };
    let output = extract_with_model(path.to_str().unwrap(), &model, &config())
        .await
        .expect("fenced JSON should normalise");

    assert_eq!(output.record, json!({"total": 10.5}));
    assert_eq!(output.stats.input_tokens, 900);
    assert_eq!(output.stats.output_tokens, 42);
}

#[tokio::test]
async fn unfenced_reply_is_parsed_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_test_image(dir.path(), "receipt.jpg");

    let model = ScriptedModel {
        reply: "{\"business\": \"Corner Deli\", \"total\": 8.25}",
    };
    let output = extract_with_model(path.to_str().unwrap(), &model, &config())
        .await
        .expect("bare JSON should parse");

    assert_eq!(output.record["business"], "Corner Deli");
}

#[tokio::test]
async fn prose_reply_aborts_with_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_test_image(dir.path(), "receipt.jpg");

    let model = ScriptedModel {
        reply: "Sorry, I cannot read this receipt.",
    };
    let err = extract_with_model(path.to_str().unwrap(), &model, &config())
        .await
        .expect_err("prose is not JSON");

    assert!(matches!(err, ReceiptError::InvalidJson { .. }));
}

#[tokio::test]
async fn model_failure_propagates_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_test_image(dir.path(), "receipt.jpg");

    let err = extract_with_model(path.to_str().unwrap(), &FailingModel, &config())
        .await
        .expect_err("provider failure is fatal");

    match err {
        ReceiptError::ModelCallFailed { message } => assert!(message.contains("429")),
        other => panic!("expected ModelCallFailed, got {other:?}"),
    }
}

// ── File output ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn end_to_end_writes_pretty_json_beside_input() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_test_image(dir.path(), "receipt.jpg");
    let out_path = default_output_path(&input);
    assert_eq!(out_path.file_name().unwrap(), "receipt.json");

    let model = ScriptedModel {
        reply: "```json\n{\"business\":\"Acme\",\"total\":12.0}\n```",
    };
    let stats =
        extract_to_file_with_model(input.to_str().unwrap(), &out_path, &model, &config())
            .await
            .expect("extraction should succeed");

    let written = std::fs::read_to_string(&out_path).expect("output file exists");
    assert_eq!(
        written,
        "{\n    \"business\": \"Acme\",\n    \"total\": 12.0\n}\n",
        "record must be pretty-printed with 4-space indentation"
    );
    assert!(stats.total_duration_ms >= stats.llm_duration_ms);

    // The atomic write must not leave its temp file behind.
    assert!(!dir.path().join("receipt.json.tmp").exists());
}

#[tokio::test]
async fn no_output_file_on_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_test_image(dir.path(), "receipt.jpg");
    let out_path = default_output_path(&input);

    let model = ScriptedModel {
        reply: "Sorry, I cannot read this receipt.",
    };
    let err = extract_to_file_with_model(input.to_str().unwrap(), &out_path, &model, &config())
        .await
        .expect_err("parse failure must abort");

    assert!(matches!(err, ReceiptError::InvalidJson { .. }));
    assert!(
        !out_path.exists(),
        "no output file may be written after a failed run"
    );
}

#[tokio::test]
async fn no_output_file_on_model_error() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_test_image(dir.path(), "receipt.jpg");
    let out_path = default_output_path(&input);

    let err = extract_to_file_with_model(input.to_str().unwrap(), &out_path, &FailingModel, &config())
        .await
        .expect_err("model failure must abort");

    assert!(matches!(err, ReceiptError::ModelCallFailed { .. }));
    assert!(!out_path.exists());
}

#[tokio::test]
async fn output_matches_pretty_json_accessor() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_test_image(dir.path(), "receipt.png");
    let out_path = default_output_path(&input);

    let model = ScriptedModel {
        reply: "{\"items\": [{\"name\": \"Coffee\", \"price\": 3.5}], \"total\": 3.5}",
    };
    let output = extract_with_model(input.to_str().unwrap(), &model, &config())
        .await
        .expect("extraction should succeed");
    extract_to_file_with_model(input.to_str().unwrap(), &out_path, &model, &config())
        .await
        .expect("file variant should succeed");

    let written = std::fs::read_to_string(&out_path).unwrap();
    assert_eq!(written, output.pretty_json().unwrap());
}
