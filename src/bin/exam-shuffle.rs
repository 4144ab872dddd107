//! CLI binary for exam-shuffle.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ShuffleConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use exam_shuffle::{
    inspect, shuffle_async, PageOrder, ProgressCallback, ShortPagePolicy, ShuffleConfig,
    ShuffleProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: one bar that counts rendering then cropping, so it
/// runs to twice the page count.
struct CliProgressCallback {
    bar: ProgressBar,
    passed_through: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            passed_through: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} steps  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(2 * total as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Rendering");
        self.bar.reset_eta();
    }
}

impl ShuffleProgressCallback for CliProgressCallback {
    fn on_shuffle_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Shuffling {total_pages} pages…"))
        ));
    }

    fn on_page_rendered(&self, index: usize, _total: usize) {
        self.bar.set_message(format!("page {index}"));
        self.bar.inc(1);
    }

    fn on_page_cropped(&self, index: usize, total: usize, height: u32) {
        self.bar.set_prefix("Cropping");
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            green("✓"),
            index,
            total,
            dim(&format!("{height:>5} px tall")),
        ));
        self.bar.inc(1);
    }

    fn on_page_passed_through(&self, index: usize, total: usize, reason: &str) {
        self.bar.set_prefix("Cropping");
        self.passed_through.fetch_add(1, Ordering::SeqCst);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            yellow("⚠"),
            index,
            total,
            yellow(&format!("uncropped: {reason}")),
        ));
        self.bar.inc(1);
    }

    fn on_shuffle_complete(&self, total_pages: usize, output_pages: usize) {
        self.bar.finish_and_clear();
        let skipped = self.passed_through.load(Ordering::SeqCst);
        if skipped == 0 {
            eprintln!(
                "{} {} pages cropped into {} output pages",
                green("✔"),
                bold(&total_pages.to_string()),
                bold(&output_pages.to_string())
            );
        } else {
            eprintln!(
                "{} {} pages → {} output pages  ({} left uncropped)",
                yellow("⚠"),
                bold(&total_pages.to_string()),
                bold(&output_pages.to_string()),
                yellow(&skipped.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Explicit order: output page 0 is source page 2, and so on
  exam-shuffle exam.pdf -o shuffled.pdf --order 2,0,3,1

  # Stack pages 0 and 1 onto one output page
  exam-shuffle exam.pdf -o shuffled.pdf --order 0+1,2,3

  # Last page first, keep the intermediate images and zip everything
  exam-shuffle exam.pdf -o shuffled.pdf --reverse \
      --scratch-dir ./work --zip bundle.zip

  # Different header/footer height, abort on pages that are too short
  exam-shuffle exam.pdf -o shuffled.pdf --margin 120 --strict-margins

  # Page count and metadata only
  exam-shuffle --inspect-only exam.pdf

ORDER SYNTAX:
  Comma-separated 0-based page indices, one per output page.
  Join indices with '+' to stack several pages onto one output page.
  Pages may be left out; no page may be used twice.
  With neither --order nor --reverse the original order is kept.

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH   Path to an existing libpdfium
  RUST_LOG          Log filter (overrides -v / -q)
  EXAM_SHUFFLE_*    Fallback for every long flag, e.g. EXAM_SHUFFLE_MARGIN=120
"#;

/// Crop exam pages and reassemble them in a new order.
#[derive(Parser, Debug)]
#[command(
    name = "exam-shuffle",
    version,
    about = "Crop exam PDF pages and reassemble them in a new order",
    long_about = "Rasterise every page of an exam PDF, strip the fixed header and footer \
band plus trailing whitespace, and reassemble the cropped pages into a new PDF in the \
order you give. Intermediate images can be kept and bundled into a zip.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Source PDF file.
    input: PathBuf,

    /// Where to write the shuffled PDF.
    #[arg(short, long, env = "EXAM_SHUFFLE_OUTPUT", required_unless_present = "inspect_only")]
    output: Option<PathBuf>,

    /// Output order, e.g. 2,0,3,1 or 0+1,2 (0-based).
    #[arg(long, env = "EXAM_SHUFFLE_ORDER", conflicts_with = "reverse")]
    order: Option<PageOrder>,

    /// Put the pages in reverse order.
    #[arg(long, env = "EXAM_SHUFFLE_REVERSE")]
    reverse: bool,

    /// Also write a zip of the cropped images and the final PDF.
    #[arg(long, env = "EXAM_SHUFFLE_ZIP")]
    zip: Option<PathBuf>,

    /// Keep intermediate images in this directory (default: temporary).
    #[arg(long, env = "EXAM_SHUFFLE_SCRATCH_DIR")]
    scratch_dir: Option<PathBuf>,

    /// Rows removed from the top and the bottom of every page.
    #[arg(long, env = "EXAM_SHUFFLE_MARGIN", default_value_t = 150)]
    margin: u32,

    /// Rendering DPI (72–600).
    #[arg(long, env = "EXAM_SHUFFLE_DPI", default_value_t = 200,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Channel value at or above which a pixel counts as blank.
    #[arg(long, env = "EXAM_SHUFFLE_BLANK_THRESHOLD", default_value_t = 245)]
    blank_threshold: u8,

    /// Blank rows kept below the last content row.
    #[arg(long, env = "EXAM_SHUFFLE_TRIM_PADDING", default_value_t = 0)]
    trim_padding: u32,

    /// Fail when a page is too short for the margin instead of keeping it uncropped.
    #[arg(long, env = "EXAM_SHUFFLE_STRICT_MARGINS")]
    strict_margins: bool,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "EXAM_SHUFFLE_PASSWORD")]
    password: Option<String>,

    /// Path to the pdfium shared library.
    #[arg(long, env = "EXAM_SHUFFLE_PDFIUM_LIB")]
    pdfium_lib: Option<PathBuf>,

    /// Print the run report as JSON on stdout. Image paths in it only exist
    /// afterwards when --scratch-dir is given.
    #[arg(long, env = "EXAM_SHUFFLE_JSON")]
    json: bool,

    /// Print page count and metadata only.
    #[arg(long)]
    inspect_only: bool,

    /// Disable progress bar.
    #[arg(long, env = "EXAM_SHUFFLE_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "EXAM_SHUFFLE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "EXAM_SHUFFLE_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs unless -v asks for them.
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

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let config = build_config(&cli, None)?;
        let meta = tokio::task::block_in_place(|| inspect(&cli.input, &config))
            .context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", cli.input.display());
            if let Some(ref t) = meta.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = meta.author {
                println!("Author:       {}", a);
            }
            if let Some(ref s) = meta.subject {
                println!("Subject:      {}", s);
            }
            println!("Pages:        {}", meta.page_count);
            println!("PDF Version:  {}", meta.pdf_version);
            if let Some(ref p) = meta.producer {
                println!("Producer:     {}", p);
            }
            if let Some(ref c) = meta.creator {
                println!("Creator:      {}", c);
            }
        }
        return Ok(());
    }

    let output_path = cli
        .output
        .clone()
        .context("--output is required unless --inspect-only is given")?;

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ShuffleProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Resolve order ────────────────────────────────────────────────────
    let order = match &cli.order {
        Some(order) => order.clone(),
        None => {
            let meta = tokio::task::block_in_place(|| inspect(&cli.input, &config))
                .context("Failed to read page count")?;
            if cli.reverse {
                PageOrder::reversed(meta.page_count)
            } else {
                PageOrder::identity(meta.page_count)
            }
        }
    };

    // ── Run shuffle ──────────────────────────────────────────────────────
    let output = shuffle_async(cli.input.clone(), output_path.clone(), order.clone(), config)
        .await
        .with_context(|| format!("Shuffle of {} failed", cli.input.display()))?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if !cli.quiet {
        let stats = &output.stats;
        eprintln!(
            "{}  {} → {} pages  {}ms  →  {}",
            if stats.passed_through_pages == 0 {
                green("✔")
            } else {
                yellow("⚠")
            },
            stats.total_pages,
            stats.output_pages,
            stats.total_duration_ms,
            bold(&output_path.display().to_string()),
        );
        eprintln!("   {}", dim(&format!("order {order}")));
        if let Some(ref archive) = output.archive {
            eprintln!(
                "   {} {} ({} files, {} bytes)",
                dim("zip"),
                archive.path.display(),
                archive.entries.len(),
                archive.bytes
            );
        }
        if let Some(ref dir) = output.scratch_dir {
            eprintln!("   {} {}", dim("images"), dir.display());
        }
    }

    Ok(())
}

/// Map CLI args to `ShuffleConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ShuffleConfig> {
    let mut builder = ShuffleConfig::builder()
        .dpi(cli.dpi)
        .margin_px(cli.margin)
        .blank_threshold(cli.blank_threshold)
        .trim_padding(cli.trim_padding)
        .short_pages(if cli.strict_margins {
            ShortPagePolicy::Fail
        } else {
            ShortPagePolicy::PassThrough
        });

    if let Some(ref dir) = cli.scratch_dir {
        builder = builder.scratch_dir(dir);
    }
    if let Some(ref zip) = cli.zip {
        builder = builder.archive(zip);
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password);
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_library(lib);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
