//! CLI binary for aadhaar-qr.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig` and prints the decoded record.

use aadhaar_qr::{
    extract, extract_to_file, install_help, AadhaarQrError, ExtractionConfig,
    ExtractionProgressCallback, IdentityRecord, ProgressCallback, StrategyKind,
};
use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner naming the current strategy, plus
/// one log line per strategy that gave up.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_strategy_start(&self, strategy: StrategyKind, position: usize, total: usize) {
        self.bar.set_prefix(format!("[{position}/{total}] {strategy}"));
        self.bar.set_message("rendering…");
    }

    fn on_page(&self, _strategy: StrategyKind, page_num: usize) {
        self.bar.set_message(format!("scanning page {page_num}"));
    }

    fn on_strategy_failed(&self, strategy: StrategyKind, reason: &str) {
        // Keep one line per strategy even for long tool diagnostics.
        let msg = match reason.char_indices().nth(100) {
            Some((cut, _)) => format!("{}\u{2026}", &reason[..cut]),
            None => reason.to_string(),
        };
        self.bar.println(format!(
            "  {} {:<8} {}",
            red("✗"),
            strategy.name(),
            dim(&msg)
        ));
    }

    fn on_extraction_complete(&self, winner: Option<StrategyKind>) {
        self.bar.finish_and_clear();
        if let Some(strategy) = winner {
            eprintln!("{} QR code decoded using {}", green("✔"), bold(strategy.name()));
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Print the decoded details
  aadhaar-qr eaadhaar.pdf --password KASH2005

  # Save as JSON
  aadhaar-qr eaadhaar.pdf --password KASH2005 -o details.json

  # Only use the system rasterisers
  aadhaar-qr eaadhaar.pdf --password KASH2005 --strategies system,decrypt

  # JSON on stdout, no progress
  aadhaar-qr eaadhaar.pdf --json > details.json

STRATEGIES (tried in this order by default):
  pdfium    pdfium library, renders page by page
  poppler   pdftoppm
  system    Ghostscript, falling back to ImageMagick
  decrypt   pdftk (or qpdf) removes the password, then pdftoppm

ENVIRONMENT VARIABLES:
  AADHAAR_QR_PASSWORD        PDF password
  PDFIUM_LIB_PATH            pdfium shared library or its directory
  AADHAAR_QR_PDFTOPPM_PATH   pdftoppm binary
  AADHAAR_QR_GS_PATH         Ghostscript binary
  AADHAAR_QR_MAGICK_PATH     ImageMagick binary
  AADHAAR_QR_PDFTK_PATH      pdftk binary
  AADHAAR_QR_QPDF_PATH       qpdf binary
  RUST_LOG                   log filter (overrides -v / -q)

The e-Aadhaar password is usually the first four letters of the name in
capitals followed by the year of birth (e.g. KASH2005).
"#;

/// Extract identity details from the QR code of an e-Aadhaar PDF.
#[derive(Parser, Debug)]
#[command(
    name = "aadhaar-qr",
    version,
    about = "Extract identity details from the QR code of an e-Aadhaar PDF",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Path to the e-Aadhaar PDF.
    pdf: PathBuf,

    /// PDF password.
    #[arg(short, long, env = "AADHAAR_QR_PASSWORD", default_value = "", hide_env_values = true)]
    password: String,

    /// Write the record as JSON to this file.
    #[arg(short, long, env = "AADHAAR_QR_OUTPUT")]
    output: Option<PathBuf>,

    /// Print the record as JSON on stdout instead of a summary.
    #[arg(long, env = "AADHAAR_QR_JSON")]
    json: bool,

    /// Comma-separated strategies to try, in order.
    #[arg(long, env = "AADHAAR_QR_STRATEGIES", value_delimiter = ',',
          default_value = "pdfium,poppler,system,decrypt")]
    strategies: Vec<StrategyKind>,

    /// Rendering DPI for pdfium, Ghostscript and ImageMagick (72–600).
    #[arg(long, env = "AADHAAR_QR_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Parent directory for the per-run scratch folder (removed afterwards).
    #[arg(long, env = "AADHAAR_QR_WORK_DIR")]
    work_dir: Option<PathBuf>,

    /// pdfium shared library file or directory.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Disable the progress spinner.
    #[arg(long, env = "AADHAAR_QR_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "AADHAAR_QR_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the result.
    #[arg(short, long, env = "AADHAAR_QR_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner gives all the feedback that matters; keep library INFO
    // logs out of its way unless asked for.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Run extraction ───────────────────────────────────────────────────
    let result = match cli.output {
        Some(ref output_path) => {
            extract_to_file(&cli.pdf, &cli.password, output_path, &config).await
        }
        None => extract(&cli.pdf, &cli.password, &config).await,
    };

    let record = match result {
        Ok(record) => record,
        Err(e @ AadhaarQrError::AllStrategiesFailed { .. }) => {
            eprintln!("{} {}", red("✘"), e);
            eprintln!();
            eprintln!("{}", install_help());
            std::process::exit(1);
        }
        Err(e) => return Err(e).context("Extraction failed"),
    };

    if cli.json {
        let json = serde_json::to_string_pretty(&record.without_raw_data())
            .context("Failed to serialise record")?;
        println!("{json}");
    } else {
        print_record(&record);
    }

    if let Some(ref output_path) = cli.output {
        if !cli.quiet {
            eprintln!("{}  saved  →  {}", green("✔"), bold(&output_path.display().to_string()));
        }
    }

    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .strategies(cli.strategies.clone())
        .pdfium_dpi(cli.dpi)
        .rasterizer_dpi(cli.dpi);

    if let Some(ref dir) = cli.work_dir {
        builder = builder.work_dir(dir);
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_library_path(lib);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_record(record: &IdentityRecord) {
    let rows = [
        ("Name", record.name.as_deref()),
        ("Aadhaar", record.aadhaar_number.as_deref()),
        ("DOB", record.date_of_birth.as_deref()),
        ("Gender", record.gender.as_deref()),
        ("Care of", record.care_of.as_deref()),
        ("Mobile", record.mobile.as_deref()),
        ("Email", record.email.as_deref()),
    ];

    println!("{}", bold("Extracted Aadhaar details"));
    for (label, value) in rows {
        if let Some(value) = value {
            println!("  {:<9} {}", format!("{label}:"), value);
        }
    }
    if record.has_address() {
        println!("  {:<9} {}", "Address:", record.format_address());
    }
}
