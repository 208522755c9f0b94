//! CLI binary for receipt2json.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use receipt2json::{default_output_path, extract, extract_to_file, ExtractionConfig};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Basic extraction (writes receipt.json next to the input)
  receipt2json receipt.jpg

  # Choose the output path
  receipt2json receipt.jpg -o expenses/lunch.json

  # Print the record to stdout instead of writing a file
  receipt2json --stdout receipt.jpg

  # Use a specific model
  receipt2json --model gpt-4.1 --provider openai receipt.jpg

  # Custom extraction instruction
  receipt2json --instruction-file prompts/receipt-fr.txt receipt.jpg

SUPPORTED PROVIDERS & MODELS:
  Provider     Model                        Vision
  ─────────    ──────────────────────────   ──────
  openai       gpt-4.1-nano (default)       ✓
  openai       gpt-4.1-mini, gpt-4.1        ✓
  anthropic    claude-sonnet-4-20250514     ✓
  gemini       gemini-2.0-flash             ✓
  ollama       llava, llama3.2-vision       ✓

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  RECEIPT_LLM_PROVIDER    Override provider (openai, anthropic, gemini, ollama)
  RECEIPT_MODEL           Override model ID

SETUP:
  1. Set API key:     export OPENAI_API_KEY=sk-...
  2. Extract:         receipt2json receipt.jpg
"#;

/// Extract structured receipt data from photos using Vision LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "receipt2json",
    version,
    about = "Extract structured receipt data from photos using Vision LLMs",
    long_about = "Extract the business name, line items with prices, tax, and total from a \
photographed receipt using a Vision Language Model, and save the result as JSON. Supports \
OpenAI, Anthropic, Google Gemini, and any OpenAI-compatible endpoint (Ollama, vLLM, etc.).",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Path to the receipt image (JPEG or PNG).
    input: String,

    /// Write the JSON record to this path instead of <input>.json.
    #[arg(short, long, env = "RECEIPT_OUTPUT")]
    output: Option<PathBuf>,

    /// Vision LLM model ID (e.g. gpt-4.1-nano, claude-sonnet-4-20250514).
    #[arg(long, env = "RECEIPT_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama.
    #[arg(
        long,
        env = "RECEIPT_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set."
    )]
    provider: Option<String>,

    /// Path to a text file containing a custom extraction instruction.
    #[arg(long, env = "RECEIPT_INSTRUCTION")]
    instruction_file: Option<PathBuf>,

    /// Max LLM output tokens.
    #[arg(long, env = "RECEIPT_MAX_TOKENS", default_value_t = 1024)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "RECEIPT_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Print the JSON record to stdout instead of writing a file.
    #[arg(long)]
    stdout: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "RECEIPT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the record itself.
    #[arg(short, long, env = "RECEIPT_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Usage errors (wrong argument count, unknown flags) must exit 1 like
    // every other failure, not clap's default 2. Keep clap's rendering and
    // own only the exit code; --help / --version still exit 0.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            std::process::exit(if e.use_stderr() { 1 } else { 0 });
        }
    };

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli).await?;

    // ── Run extraction ───────────────────────────────────────────────────
    if cli.stdout {
        let output = extract(&cli.input, &config)
            .await
            .context("Extraction failed")?;

        let json = output.pretty_json().context("Failed to render record")?;
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(json.as_bytes())
            .context("Failed to write to stdout")?;

        if !cli.quiet {
            eprintln!(
                "   {} tokens in  /  {} tokens out  —  {}ms total",
                dim(&output.stats.input_tokens.to_string()),
                dim(&output.stats.output_tokens.to_string()),
                output.stats.total_duration_ms,
            );
        }
    } else {
        let output_path = cli
            .output
            .clone()
            .unwrap_or_else(|| default_output_path(Path::new(&cli.input)));

        let stats = extract_to_file(&cli.input, &output_path, &config)
            .await
            .context("Extraction failed")?;

        if !cli.quiet {
            println!(
                "{} Receipt data saved to {}",
                green("✔"),
                bold(&output_path.display().to_string()),
            );
            eprintln!(
                "   {} tokens in  /  {} tokens out  —  {}ms total",
                dim(&stats.input_tokens.to_string()),
                dim(&stats.output_tokens.to_string()),
                stats.total_duration_ms,
            );
        }
    }

    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
async fn build_config(cli: &Cli) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature);

    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref path) = cli.instruction_file {
        let instruction = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read instruction from {:?}", path))?;
        builder = builder.instruction(instruction);
    }

    builder.build().context("Invalid configuration")
}
