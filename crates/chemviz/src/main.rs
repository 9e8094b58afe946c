use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chemviz::{build_history_store, router, AppState};
use chemviz_core::config::AppConfig;
use chemviz_core::db;
use chemviz_core::history::{HistoryItem, HISTORY_LIMIT};
use chemviz_core::ingestion::{IngestPipeline, UploadedFile};
use clap::{Args, Parser, Subcommand};
use comfy_table::Table;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Chemical equipment upload analytics", long_about = None)]
struct Cli {
    /// TOML configuration file (falls back to CHEMVIZ_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP API server
    Serve(ServeArgs),
    /// Run database migrations
    Migrate,
    /// Ingest local CSV files through the upload pipeline
    Ingest(IngestArgs),
    /// Show the most recent uploads
    History(HistoryArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Address to listen on, overriding the configuration
    #[arg(long)]
    bind: Option<String>,
}

#[derive(Args, Debug)]
struct IngestArgs {
    /// Files or glob patterns, e.g. `data/*.csv`
    #[arg(required = true)]
    patterns: Vec<String>,
}

#[derive(Args, Debug)]
struct HistoryArgs {
    #[arg(long, default_value_t = HISTORY_LIMIT)]
    limit: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    let config_path = cli
        .config
        .or_else(|| env::var_os("CHEMVIZ_CONFIG").map(PathBuf::from));
    let mut config = AppConfig::load(config_path.as_deref())?;

    match cli.command {
        Command::Serve(args) => {
            if let Some(bind) = args.bind {
                config.bind_addr = bind;
            }
            serve(config).await
        }
        Command::Migrate => {
            let database_url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL (or CHEMVIZ_DATABASE_URL) must be set")?;
            let pool = db::connect(database_url, &config.pool).await?;
            db::run_migrations(&pool).await?;
            info!("Database migrations applied");
            Ok(())
        }
        Command::Ingest(args) => ingest(config, args).await,
        Command::History(args) => history(config, args).await,
    }
}

async fn serve(config: AppConfig) -> Result<()> {
    let addr = config.socket_addr()?;
    let history = build_history_store(&config).await?;
    let state = Arc::new(AppState::new(history, config.timezone()?));
    let app = router(state, config.max_upload_bytes);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

async fn ingest(config: AppConfig, args: IngestArgs) -> Result<()> {
    let pipeline = IngestPipeline::new(build_history_store(&config).await?);

    let mut table = Table::new();
    table.set_header(vec![
        "File",
        "Rows",
        "Avg flowrate",
        "Avg pressure",
        "Avg temperature",
        "Types",
    ]);

    let mut failures = 0;
    for pattern in &args.patterns {
        for entry in glob::glob(pattern).with_context(|| format!("invalid pattern '{pattern}'"))? {
            let path = match entry {
                Ok(path) if path.is_file() => path,
                Ok(_) => continue,
                Err(err) => {
                    warn!("could not read path from pattern '{pattern}': {err}");
                    failures += 1;
                    continue;
                }
            };

            let contents = std::fs::read(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let filename = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());

            match pipeline
                .ingest_upload(Some(UploadedFile {
                    filename: &filename,
                    contents: &contents,
                }))
                .await
            {
                Ok(report) => {
                    let summary = report.summary;
                    let types = summary
                        .type_distribution
                        .iter()
                        .map(|(category, count)| format!("{category}: {count}"))
                        .collect::<Vec<_>>()
                        .join(", ");
                    table.add_row(vec![
                        filename,
                        summary.total_count.to_string(),
                        summary.avg_flowrate.to_string(),
                        summary.avg_pressure.to_string(),
                        summary.avg_temperature.to_string(),
                        types,
                    ]);
                }
                Err(err) if err.is_client_error() => {
                    eprintln!("{}: {err}", path.display());
                    failures += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    println!("{table}");
    if failures > 0 {
        bail!("{failures} file(s) could not be ingested");
    }
    Ok(())
}

async fn history(config: AppConfig, args: HistoryArgs) -> Result<()> {
    let store = build_history_store(&config).await?;
    let timezone = config.timezone()?;

    let mut table = Table::new();
    table.set_header(vec!["File", "Rows", "Avg temperature", "Uploaded"]);
    for record in store.list_recent(args.limit).await? {
        let item = HistoryItem::from_record(&record, timezone);
        table.add_row(vec![
            item.filename,
            item.total.to_string(),
            item.avg_temp.to_string(),
            item.date,
        ]);
    }

    println!("{table}");
    Ok(())
}
