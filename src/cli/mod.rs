//! Command-line interface for citemark.
//!
//! Provides commands for verifying extracted evidence against a PDF,
//! inspecting a PDF's text layer, listing past runs and showing the
//! resolved configuration.

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::config;
use crate::core::{Engine, Ledger, LedgerEntry};
use crate::domain::status_counts;
use crate::evidence::parse_evidence;
use crate::layout::{PageTextIndex, TextLayer};

pub mod report;

/// citemark - Verify AI-extracted claims against their source PDF
#[derive(Parser, Debug)]
#[command(name = "citemark")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Verify evidence against a PDF and write a highlighted copy
    Verify {
        /// Source PDF
        pdf: PathBuf,

        /// Evidence JSON (extraction response or evidence list; "-" for stdin)
        #[arg(short, long)]
        evidence: PathBuf,

        /// Annotated output path (default: <output dir>/<stem>.highlighted.pdf)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,

        /// Do not record this run in the ledger
        #[arg(long)]
        no_ledger: bool,
    },

    /// Print the text layer of a PDF
    Text {
        /// Source PDF
        pdf: PathBuf,

        /// Only this page (1-based)
        #[arg(short, long)]
        page: Option<usize>,

        /// Print the normalized search text instead
        #[arg(long)]
        normalized: bool,
    },

    /// List recent verification runs
    History {
        /// Maximum number of runs to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Verify {
                pdf,
                evidence,
                output,
                json,
                no_ledger,
            } => verify(&pdf, &evidence, output, json, !no_ledger).await,
            Commands::Text {
                pdf,
                page,
                normalized,
            } => print_text(&pdf, page, normalized).await,
            Commands::History { limit } => show_history(limit).await,
            Commands::Config => show_config().await,
        }
    }
}

/// Read evidence JSON from a file, or stdin for "-"
async fn read_evidence(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read evidence from stdin")?;
        Ok(buffer)
    } else {
        tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read evidence file: {}", path.display()))
    }
}

/// Run a verification and report it
async fn verify(
    pdf_path: &Path,
    evidence_path: &Path,
    output: Option<PathBuf>,
    json: bool,
    record: bool,
) -> Result<()> {
    let cfg = config::config()?;
    let run_id = Uuid::new_v4();

    let raw = read_evidence(evidence_path).await?;
    let evidence = parse_evidence(&raw)
        .with_context(|| format!("Invalid evidence in {}", evidence_path.display()))?;

    let bytes = tokio::fs::read(pdf_path)
        .await
        .with_context(|| format!("Failed to read PDF: {}", pdf_path.display()))?;

    let output = output.unwrap_or_else(|| cfg.output_path_for(pdf_path));
    let engine = Engine::new(cfg.engine);
    let pdf = engine
        .open_bytes(&bytes)
        .with_context(|| format!("Cannot verify {}", pdf_path.display()))?;
    let verification = engine.verify_to_path(&pdf, &evidence, &output);

    let written = verification.annotated.as_ref().ok().cloned();

    if json {
        let summary = report::JsonReport {
            run_id,
            document: pdf_path,
            output: written.as_deref(),
            write_error: verification.annotated.as_ref().err().map(|e| e.to_string()),
            pages: verification.page_count,
            citations: &verification.citations,
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", report::render_report(&evidence, &verification.citations));

        let (verified, unverified, missing) = status_counts(&verification.citations);
        eprintln!();
        eprintln!(
            "[{} verified, {} unverified, {} missing across {} pages]",
            verified, unverified, missing, verification.page_count
        );
        if let Some(path) = &written {
            eprintln!("[Highlighted copy: {}]", path.display());
        }
    }

    if record {
        let ledger = Ledger::open(&config::ledger_dir()?)?;
        ledger.append(&LedgerEntry::new(
            run_id,
            pdf_path,
            &bytes,
            verification.page_count,
            &verification.citations,
            written,
        ))?;
    }

    verification
        .annotated
        .map(|_| ())
        .with_context(|| format!("Failed to write annotated document: {}", output.display()))
}

/// Print each page's text, or one page's
async fn print_text(pdf_path: &Path, page: Option<usize>, normalized: bool) -> Result<()> {
    let cfg = config::config()?;
    let pdf = Engine::new(cfg.engine)
        .open(pdf_path)
        .with_context(|| format!("Cannot read {}", pdf_path.display()))?;

    let count = pdf.page_count();
    let pages = match page {
        Some(n) if (1..=count).contains(&n) => (n - 1)..n,
        Some(n) => anyhow::bail!("Page {} out of range (document has {} pages)", n, count),
        None => 0..count,
    };

    for idx in pages {
        println!("═══ Page {} ═══", idx + 1);
        match pdf.page_layout(idx) {
            Ok(layout) => {
                if normalized {
                    println!("{}", PageTextIndex::build(&layout).normalized_text());
                } else {
                    let text: String = layout.units().map(|u| u.ch).collect();
                    println!("{}", text);
                }
            }
            Err(e) => eprintln!("[Page {} unreadable: {}]", idx + 1, e),
        }
    }

    Ok(())
}

/// List recent ledger entries
async fn show_history(limit: usize) -> Result<()> {
    let ledger = Ledger::open(&config::ledger_dir()?)?;
    let entries = ledger.recent(limit).await?;

    if entries.is_empty() {
        println!("No runs recorded");
        return Ok(());
    }

    println!(
        "{:<38} {:<20} {:>5} {:>5} {:>5}  {:<40}",
        "RUN ID", "WHEN", "OK", "APPX", "MISS", "DOCUMENT"
    );
    println!("{}", "-".repeat(120));

    for entry in entries {
        println!(
            "{:<38} {:<20} {:>5} {:>5} {:>5}  {:<40}",
            entry.run_id,
            entry.ts.format("%Y-%m-%d %H:%M:%S"),
            entry.verified,
            entry.unverified,
            entry.missing,
            entry.document.display()
        );
    }

    Ok(())
}

/// Show the resolved configuration (for debugging)
async fn show_config() -> Result<()> {
    let cfg = config::config()?;

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("  citemark Configuration");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home (ledger):  {}", cfg.home.display());
    println!("  Ledger file:    {}", cfg.home.join("ledger.jsonl").display());
    println!("  Output:         {}", cfg.output.display());
    println!();
    println!("Matching:");
    println!("  Line tolerance:   {}", cfg.engine.line_tolerance);
    println!("  Word margin:      {}", cfg.engine.layout.word_margin);
    println!("  Line break ratio: {}", cfg.engine.layout.line_break_ratio);

    Ok(())
}
