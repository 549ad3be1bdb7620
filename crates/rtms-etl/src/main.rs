//! RTMS ETL - apartment trade extraction job

use anyhow::{Context, Result};
use clap::Parser;
use rtms_common::logging::{init_logging, LogConfig, LogLevel};
use rtms_etl::api::ApiClient;
use rtms_etl::config::{
    EtlConfig, RunConfig, DEFAULT_CONFIG_DIR, DEFAULT_DEAL_YMD, DEFAULT_ENV, DEFAULT_OBJECT_KEY,
    DEFAULT_PAGE_SIZE, DEFAULT_REGION_CODE,
};
use rtms_etl::sink::{LocalDirObjectStore, S3ObjectStore};
use rtms_etl::{EtlJob, RunSummary};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "rtms-etl")]
#[command(author, version, about = "Extract apartment trade records into a CSV object")]
struct Cli {
    /// Environment name; selects <env>_config.json and <env>_aws_config.json
    #[arg(long, default_value = DEFAULT_ENV)]
    env: String,

    /// Directory holding the configuration documents
    #[arg(long, default_value = DEFAULT_CONFIG_DIR)]
    config_dir: PathBuf,

    /// Legal-district region code (LAWD_CD)
    #[arg(long, default_value = DEFAULT_REGION_CODE)]
    region_code: String,

    /// Contract month, YYYYMM (DEAL_YMD)
    #[arg(long, default_value = DEFAULT_DEAL_YMD)]
    period: String,

    /// Rows requested per page
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: u32,

    /// Destination bucket (overrides the configuration document)
    #[arg(long)]
    bucket: Option<String>,

    /// Object key of the uploaded CSV
    #[arg(long, default_value = DEFAULT_OBJECT_KEY)]
    object_key: String,

    /// Write the CSV under this directory instead of uploading it
    #[arg(long, value_name = "DIR")]
    dry_run: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("rtms-etl")
        .build()
        .merge_env()?;

    let _guard = init_logging(&log_config)?;

    match run(cli).await {
        Ok(summary) => {
            info!(
                pages = summary.page_count,
                rows = summary.row_count,
                location = %summary.location,
                bytes = summary.bytes_written,
                "Extraction complete"
            );
            println!("rows: {}", summary.row_count);
            Ok(())
        },
        Err(e) => {
            error!(error = %e, "Extraction failed");
            Err(e)
        },
    }
}

async fn run(cli: Cli) -> Result<RunSummary> {
    let run = RunConfig {
        region_code: cli.region_code,
        deal_ymd: cli.period,
        page_size: cli.page_size,
        object_key: cli.object_key,
    };

    let mut config = EtlConfig::load(&cli.config_dir, &cli.env, run)
        .with_context(|| format!("Failed to load '{}' configuration", cli.env))?;
    if let Some(bucket) = cli.bucket {
        config.storage.bucket = bucket;
        config.validate()?;
    }

    let client = ApiClient::new(config.api.timeout())?;

    let summary = match cli.dry_run {
        Some(dir) => {
            info!(dir = %dir.display(), "Dry run: writing CSV locally");
            EtlJob::new(&config, client, LocalDirObjectStore::new(dir)).run().await?
        },
        None => {
            let store = S3ObjectStore::new(&config.storage).await?;
            EtlJob::new(&config, client, store).run().await?
        },
    };

    Ok(summary)
}
