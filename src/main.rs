use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use futures::future;
use log::{error, info, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use tokio::fs::File;
use tokio::runtime::Runtime;

use bundle_forwarder::cli::{Args, Commands};
use bundle_forwarder::config::Configuration;
use bundle_forwarder::models::UploadStatus;
use bundle_forwarder::output::{build_destination, DestinationBehavior};

fn main() -> Result<()> {
    // Parse arguments
    let args = Args::parse();

    // Initialize logging
    initialize_logging(args.verbose)?;

    match &args.command {
        Commands::InitConfig { path } => {
            info!("Creating default configuration file at {}", path.display());
            Configuration::create_default_config_file(path)?;
            Ok(())
        },
        Commands::Upload { config, files } => {
            let runtime = Runtime::new().context("Failed to create Tokio runtime")?;
            runtime.block_on(upload_bundles(config, files))
        },
    }
}

/// Initialize logging with the specified verbosity level
fn initialize_logging(verbose: bool) -> Result<()> {
    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    TermLogger::init(
        log_level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ).context("Failed to initialize logger")?;
    Ok(())
}

/// Upload every bundle concurrently and report the outcome
async fn upload_bundles(config_path: &Path, files: &[PathBuf]) -> Result<()> {
    let config = Configuration::from_yaml_file(config_path)?;
    let destination = build_destination(&config).await?;

    info!("Uploading {} bundles to {}", files.len(), destination);

    let uploads = files.iter().map(|path| upload_bundle(destination.as_ref(), path));
    let statuses = future::join_all(uploads).await;

    let mut failures = 0;
    for status in &statuses {
        match &status.result {
            Ok(()) => info!("Uploaded {} (status {})", status.file_name, status.status),
            Err(e) => {
                failures += 1;
                error!("Failed to upload {}: {:#}", status.file_name, e);
            },
        }
    }

    let statistics = serde_json::to_string_pretty(&destination.statistics())
        .context("Failed to serialize destination statistics")?;
    println!("{}", statistics);

    if failures > 0 {
        bail!("{} of {} uploads failed", failures, statuses.len());
    }

    info!("All {} bundles delivered to {}", statuses.len(), destination.key());
    Ok(())
}

async fn upload_bundle(destination: &dyn DestinationBehavior, path: &Path) -> UploadStatus {
    let file_name = path.to_string_lossy().into_owned();

    match File::open(path).await {
        Ok(file) => destination.upload(&file_name, file).await,
        Err(e) => UploadStatus::failure(
            &file_name,
            anyhow!(e).context(format!("Failed to open bundle {}", path.display())),
            0,
        ),
    }
}
