//! Transport selection

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::info;

use super::ews::EwsTransport;
use super::rest::RestTransport;
use super::ExchangeTransport;
use crate::config::TransportSettings;
use crate::host::MailboxHost;

/// Requirement set probed when choosing a transport
pub const MAILBOX_REQUIREMENT_SET: &str = "Mailbox";

/// Which backend to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// REST when the host supports it, SOAP otherwise
    #[default]
    Auto,
    Ews,
    Rest,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Auto => write!(f, "auto"),
            TransportKind::Ews => write!(f, "ews"),
            TransportKind::Rest => write!(f, "rest"),
        }
    }
}

/// Builds the transport matching the host's capabilities
pub struct TransportFactory;

impl TransportFactory {
    /// Resolve `Auto` against the host
    pub fn resolve(host: &dyn MailboxHost, settings: &TransportSettings) -> TransportKind {
        match settings.kind {
            TransportKind::Auto => {
                if host.is_set_supported(MAILBOX_REQUIREMENT_SET, &settings.min_rest_version) {
                    TransportKind::Rest
                } else {
                    TransportKind::Ews
                }
            }
            kind => kind,
        }
    }

    pub fn create(
        host: Arc<dyn MailboxHost>,
        settings: &TransportSettings,
    ) -> Arc<dyn ExchangeTransport> {
        let kind = Self::resolve(host.as_ref(), settings);
        info!("Using {} transport (configured: {})", kind, settings.kind);

        match kind {
            TransportKind::Rest => Arc::new(RestTransport::new(host)),
            _ => Arc::new(EwsTransport::new(host)),
        }
    }
}
