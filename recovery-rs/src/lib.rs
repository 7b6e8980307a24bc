//! recovery-rs: deleted mail recovery for Exchange mailboxes
//!
//! Finds items in a recoverable-items folder, filters out the ones that
//! never belonged to the mail tree, and copies the rest into a freshly
//! created folder. Works over SOAP (EWS) or the REST/OData API.
//!
//! # Example
//!
//! ```no_run
//! use recovery_rs::host::HttpMailboxHost;
//! use recovery_rs::recovery::RecoveryJob;
//! use recovery_rs::transport::TransportFactory;
//! use recovery_rs::RecoveryConfig;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RecoveryConfig::default();
//!     let host = Arc::new(HttpMailboxHost::new(config.host.clone())?);
//!     let transport = TransportFactory::create(host, &config.transport);
//!
//!     let job = RecoveryJob::new(transport, config.recovery.clone(), config.transport.folder_page_size);
//!     let hierarchy = job.load_hierarchy().await?;
//!     let report = job.run(hierarchy).await?;
//!     println!("Copied {} items", report.copied);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`identifier`]: Entry id to short folder id codec
//! - [`hierarchy`]: Folder hierarchy index and classification
//! - [`copier`]: Item discovery and transfer engine
//! - [`transport`]: SOAP and REST backends
//! - [`host`]: Mailbox host capabilities
//! - [`recovery`]: Run driver

pub mod config;
pub mod copier;
pub mod error;
pub mod hierarchy;
pub mod host;
pub mod identifier;
pub mod recovery;
pub mod transport;

// Re-export commonly used types
pub use config::RecoveryConfig;
pub use error::{RecoveryError, Result};
