//! upkit CLI: upload local files through the bounded-concurrency pipeline.
//!
//! Set UPKIT_API_URL (or API_URL) and optionally UPKIT_API_KEY / UPKIT_TOKEN.
//! Constraint defaults come from UPKIT_* variables and can be overridden by flags.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::sync::mpsc;
use upkit_api_client::HttpTransport;
use upkit_cli::{
    display_name, init_tracing, load_candidates, render_event, ConstraintArgs, UploadSummary,
};
use upkit_core::{
    classify, DefaultTranslator, Translator, UploadConfig, UploadEvent, UploadPipeline,
    UploadTransport,
};

#[derive(Parser)]
#[command(name = "upkit", about = "Upload files with bounded concurrency")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload files, printing pipeline events as JSON lines
    Upload {
        /// Files to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[command(flatten)]
        constraints: ConstraintArgs,
        /// JSON file with translated failure reasons
        #[arg(long)]
        translations: Option<PathBuf>,
    },
    /// Classify files against the constraints without uploading
    Check {
        /// Files to check
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[command(flatten)]
        constraints: ConstraintArgs,
        /// JSON file with translated failure reasons
        #[arg(long)]
        translations: Option<PathBuf>,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

fn load_translator(path: Option<PathBuf>) -> anyhow::Result<DefaultTranslator> {
    match path {
        Some(path) => DefaultTranslator::from_json_file(&path)
            .with_context(|| format!("Failed to load translations: {}", path.display())),
        None => Ok(DefaultTranslator::new()),
    }
}

/// Print events until the batch completes or the pipeline goes away.
async fn stream_events(events: &mut mpsc::UnboundedReceiver<UploadEvent>) -> anyhow::Result<()> {
    while let Some(event) = events.recv().await {
        println!("{}", render_event(&event)?);
        if matches!(event, UploadEvent::Complete(_)) {
            break;
        }
    }
    Ok(())
}

async fn upload(
    files: Vec<PathBuf>,
    config: UploadConfig,
    translator: DefaultTranslator,
) -> anyhow::Result<()> {
    let transport: Arc<dyn UploadTransport> = Arc::new(
        HttpTransport::from_env()
            .context("Failed to create HTTP transport. Set UPKIT_API_URL (or API_URL)")?,
    );

    let names: Vec<String> = files.iter().map(|p| display_name(p)).collect();
    tracing::info!(files = ?names, target_url = %config.target_url, "Uploading files");

    let candidates = load_candidates(&files).await?;
    let (pipeline, mut events) =
        UploadPipeline::new(config, Some(transport), Arc::new(translator));

    let submitted = pipeline.submit(candidates).await?;
    if submitted.valid.is_empty() {
        while let Ok(event) = events.try_recv() {
            println!("{}", render_event(&event)?);
        }
    } else {
        stream_events(&mut events).await?;
    }

    let snapshot = pipeline.snapshot().await?;
    pipeline.shutdown().await;
    while let Ok(event) = events.try_recv() {
        println!("{}", render_event(&event)?);
    }

    let summary = UploadSummary::new(&snapshot.valid, &snapshot.invalid);
    print_json(&summary)?;

    if summary.has_failures() {
        anyhow::bail!(
            "{} file(s) failed to upload, {} rejected",
            summary.failed,
            summary.rejected
        );
    }
    Ok(())
}

async fn check(
    files: Vec<PathBuf>,
    config: UploadConfig,
    translator: &dyn Translator,
) -> anyhow::Result<()> {
    let candidates = load_candidates(&files).await?;
    let result = classify(candidates, &config, translator);
    print_json(&serde_json::json!({
        "valid": result.valid,
        "invalid": result.invalid,
    }))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Upload {
            files,
            constraints,
            translations,
        } => {
            let config = constraints.apply(UploadConfig::from_env());
            let translator = load_translator(translations)?;
            upload(files, config, translator).await?;
        }
        Commands::Check {
            files,
            constraints,
            translations,
        } => {
            let config = constraints.apply(UploadConfig::from_env());
            let translator = load_translator(translations)?;
            check(files, config, &translator).await?;
        }
    }

    Ok(())
}
