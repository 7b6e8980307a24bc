//! recovery-rs: recover deleted mail into a new folder
//!
//! # Usage
//!
//! ```bash
//! # Show the folder hierarchy the classifier will use
//! recovery-rs --config recovery.toml folders
//!
//! # Recover everything from Recoverable Items into a new folder
//! recovery-rs --config recovery.toml recover --folder-name "Recovered mail"
//!
//! # Force the SOAP transport and smaller batches
//! recovery-rs --transport ews recover --batch-size 20
//! ```

use clap::{Parser, Subcommand};
use recovery_rs::copier::StatusCallback;
use recovery_rs::host::HttpMailboxHost;
use recovery_rs::recovery::RecoveryJob;
use recovery_rs::transport::{TransportFactory, TransportKind};
use recovery_rs::RecoveryConfig;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "recovery-rs")]
#[command(about = "Recover deleted mail into a new folder", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured transport
    #[arg(short, long, global = true, value_enum)]
    transport: Option<TransportKind>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the mailbox folder hierarchy
    Folders,
    /// Copy recoverable items into a new folder
    Recover {
        /// Folder to recover from (id or well-known name)
        #[arg(long)]
        source: Option<String>,
        /// Name of the folder to create
        #[arg(long)]
        folder_name: Option<String>,
        /// Items per discovery page and copy batch
        #[arg(long)]
        batch_size: Option<usize>,
        /// Print status updates as they happen
        #[arg(long)]
        progress: bool,
        /// Print the final report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(config: &RecoveryConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("recovery_rs={}", config.logging.level).into());

    if config.logging.format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = match &cli.config {
        Some(path) => RecoveryConfig::from_file(path)?,
        None => RecoveryConfig::development(),
    };

    init_logging(&config);
    info!("Starting recovery-rs v{}", env!("CARGO_PKG_VERSION"));

    if let Some(kind) = cli.transport {
        config.transport.kind = kind;
    }

    if let Commands::Recover {
        source,
        folder_name,
        batch_size,
        ..
    } = &cli.command
    {
        if let Some(source) = source {
            config.recovery.source_folder = source.clone();
        }
        if let Some(name) = folder_name {
            config.recovery.folder_name = Some(name.clone());
        }
        if let Some(size) = batch_size {
            config.recovery.batch_size = *size;
        }
    }

    config.validate()?;

    let host = Arc::new(HttpMailboxHost::new(config.host.clone())?);
    let transport = TransportFactory::create(host, &config.transport);

    match cli.command {
        Commands::Folders => {
            let job = RecoveryJob::new(
                transport,
                config.recovery.clone(),
                config.transport.folder_page_size,
            );
            let hierarchy = job.load_hierarchy().await?;

            for folder in hierarchy.folders() {
                match &folder.distinguished_folder_id {
                    Some(name) => println!("{}  {}  [{}]", folder.short_folder_id, folder.folder_path, name),
                    None => println!("{}  {}", folder.short_folder_id, folder.folder_path),
                }
            }
            println!("{} folders", hierarchy.len());
        }
        Commands::Recover { progress, json, .. } => {
            let mut job = RecoveryJob::new(
                transport,
                config.recovery.clone(),
                config.transport.folder_page_size,
            );
            if progress {
                let callback: StatusCallback = Arc::new(|status: &str| println!("» {}", status));
                job = job.with_status_callback(callback);
            }

            let hierarchy = job.load_hierarchy().await?;
            let report = job.run(hierarchy).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "Copied {} items into '{}' ({} passes)",
                    report.copied, report.target_folder_name, report.passes
                );
                println!(
                    "Skipped: {} documents, {} outside the mail tree, {} in contact subfolders",
                    report.skipped_documents, report.skipped_outside_ipm, report.skipped_contacts
                );
                for item_id in &report.bad_items {
                    println!("Could not copy {}", item_id);
                }
            }

            if !report.bad_items.is_empty() {
                warn!("{} items could not be recovered", report.bad_items.len());
            }

            if let Some(discovery_error) = &report.discovery_error {
                error!("Discovery stopped early: {}", discovery_error);
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
