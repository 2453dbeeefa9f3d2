//! Command-line entrypoint running the summarization pipeline in-process.
//!
//! Shares configuration with the HTTP server and talks to the same Ollama runtime.
use std::{fs, path::{Path, PathBuf}};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use docdigest::{
    config, logging,
    processing::{BudgetOverrides, ProcessingService, SummaryOutcome},
};

#[derive(Parser)]
#[command(
    name = "docdigest-cli",
    about = "Summarize documents and ask questions about them"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Summarize a text or PDF file.
    Summarize {
        path: PathBuf,
        #[arg(long)]
        min_words: Option<usize>,
        #[arg(long)]
        max_words: Option<usize>,
        /// Also write the summary as a PDF to this path.
        #[arg(long)]
        pdf: Option<PathBuf>,
    },
    /// Summarize a file, then answer a question about it.
    Ask { path: PathBuf, question: String },
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = config::init_config().context("failed to load configuration")?;
    logging::init_tracing(config, logging::Console::Stderr)
        .context("failed to initialize logging")?;
    config.log_summary();
    let service = ProcessingService::from_config(config)
        .context("failed to initialize processing service")?;

    match cli.command {
        Command::Summarize {
            path,
            min_words,
            max_words,
            pdf,
        } => {
            let overrides = BudgetOverrides {
                min_words,
                max_words,
            };
            let outcome = summarize_file(&service, &path, overrides).await?;
            println!("{}", outcome.summary);
            println!();
            println!(
                "original words: {}, summary words: {}, chunks: {}{}",
                outcome.original_length,
                outcome.summary_length,
                outcome.chunk_count,
                if outcome.condensed { ", condensed" } else { "" }
            );
            if let Some(target) = pdf {
                let bytes = service
                    .render_summary_pdf(outcome.summary)
                    .await
                    .context("failed to render summary PDF")?;
                fs::write(&target, bytes)
                    .with_context(|| format!("failed to write {}", target.display()))?;
                println!("wrote {}", target.display());
            }
        }
        Command::Ask { path, question } => {
            summarize_file(&service, &path, BudgetOverrides::default()).await?;
            let outcome = service
                .answer_question(question)
                .await
                .context("failed to answer question")?;
            println!("{}", outcome.answer);
        }
    }
    Ok(())
}

async fn summarize_file(
    service: &ProcessingService,
    path: &Path,
    overrides: BudgetOverrides,
) -> Result<SummaryOutcome> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let is_pdf = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

    let outcome = if is_pdf {
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("document.pdf")
            .to_string();
        service.summarize_pdf(filename, bytes, overrides).await
    } else {
        let Ok(text) = String::from_utf8(bytes) else {
            bail!("{} is neither a PDF nor UTF-8 text", path.display());
        };
        service.summarize_text(text, overrides).await
    };
    outcome.with_context(|| format!("failed to summarize {}", path.display()))
}
