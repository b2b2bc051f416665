use anyhow::Context;
use clap::Parser;
use s3sync::{
    sync_prefix, DownloadFailurePolicy, S3Store, S3StoreConfig, SyncConfig, SyncSummary,
    SyncTarget, DEFAULT_CONCURRENCY, DEFAULT_REGION,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "s3sync")]
#[command(about = "Recursively download all objects under an S3 bucket/prefix", long_about = None)]
#[command(version)]
struct Args {
    /// The s3 url to fetch from, e.g. s3://foo/bar
    #[arg(long)]
    url: String,

    /// The directory to output to
    #[arg(short, long)]
    output: PathBuf,

    /// Number of download workers
    #[arg(short, long, default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Storage region
    #[arg(long, default_value = DEFAULT_REGION)]
    region: String,

    /// Custom endpoint for S3-compatible storage (R2, MinIO)
    #[arg(long)]
    endpoint_url: Option<String>,

    /// Use path-style bucket addressing
    #[arg(long)]
    path_style: bool,

    /// Keys requested per listing page
    #[arg(long)]
    page_size: Option<i32>,

    /// What to do when a single object fails to download
    #[arg(long, value_enum, default_value_t = DownloadFailurePolicy::SkipObject)]
    on_error: DownloadFailurePolicy,

    /// Per-object download timeout (e.g. "30s", "5m")
    #[arg(long, value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,

    /// Also print the run summary as JSON
    #[arg(long)]
    json: bool,

    /// Hide the progress spinner
    #[arg(long)]
    no_progress: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(format!("s3sync={}", log_level))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(args).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let target = SyncTarget::parse(&args.url, &args.output)?;

    info!("Source: bucket {}, prefix {:?}", target.bucket, target.prefix);
    info!("Output directory: {:?}", target.dest_dir);

    let store = S3Store::from_env(&S3StoreConfig {
        region: args.region,
        endpoint_url: args.endpoint_url,
        force_path_style: args.path_style,
        page_size: args.page_size,
    })
    .await;

    let config = SyncConfig {
        concurrency: args.concurrency,
        on_download_error: args.on_error,
        download_timeout: args.timeout,
        show_progress: !args.no_progress,
    };

    let summary = sync_prefix(Arc::new(store), target, &config)
        .await
        .with_context(|| format!("sync of {} failed", args.url))?;

    println!("{}", render_summary(&summary, args.json)?);

    Ok(())
}

/// Text printed to stdout once a run succeeds.
fn render_summary(summary: &SyncSummary, json: bool) -> anyhow::Result<String> {
    let mut out = format!("Found {} objects to download.", summary.listed);
    if json {
        out.push('\n');
        out.push_str(&serde_json::to_string_pretty(summary)?);
    }
    Ok(out)
}
