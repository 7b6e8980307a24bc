//! Configuration for recovery-rs

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::copier::{DEFAULT_BATCH_SIZE, DEFAULT_MAX_DISCOVERY_RETRIES};
use crate::error::{RecoveryError, Result};
use crate::hierarchy::index::DEFAULT_PAGE_SIZE;
use crate::hierarchy::MSG_FOLDER_ROOT;
use crate::transport::TransportKind;

/// Environment variable that overrides `host.access_token`
pub const ACCESS_TOKEN_ENV: &str = "RECOVERY_ACCESS_TOKEN";

/// Main configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RecoveryConfig {
    /// Mailbox host configuration
    pub host: HostConfig,
    /// Transport selection
    #[serde(default)]
    pub transport: TransportSettings,
    /// Recovery run settings
    #[serde(default)]
    pub recovery: RecoverySettings,
    /// Logging
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Mailbox host configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HostConfig {
    /// SOAP endpoint (e.g., "https://outlook.office365.com/EWS/Exchange.asmx")
    pub ews_url: String,
    /// REST endpoint property, if the host exposes one
    pub rest_url: Option<String>,
    /// Bearer token for both transports
    pub access_token: Option<String>,
    /// Highest "Mailbox" requirement set the host supports
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

/// Transport selection
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransportSettings {
    /// auto, ews or rest
    #[serde(default)]
    pub kind: TransportKind,
    /// Minimum requirement set needed to use REST
    #[serde(default = "default_min_rest_version")]
    pub min_rest_version: String,
    /// Folders requested per hierarchy page
    #[serde(default = "default_page_size")]
    pub folder_page_size: usize,
}

/// Recovery run settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RecoverySettings {
    /// Folder to recover from
    #[serde(default = "default_source_folder")]
    pub source_folder: String,
    /// Parent of the folder recovered items are copied into
    #[serde(default = "default_target_parent")]
    pub target_parent: String,
    /// Name of the target folder (default: "Email Recovery <timestamp>")
    pub folder_name: Option<String>,
    /// Discovery page size and initial copy batch size
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Consecutive discovery failures tolerated before giving up
    #[serde(default = "default_max_discovery_retries")]
    pub max_discovery_retries: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    /// pretty or json
    pub format: String,
}

fn default_api_version() -> String {
    "1.5".to_string()
}

fn default_timeout() -> u64 {
    60
}

fn default_min_rest_version() -> String {
    "1.5".to_string()
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_source_folder() -> String {
    "recoverableitemsdeletions".to_string()
}

fn default_target_parent() -> String {
    MSG_FOLDER_ROOT.to_string()
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_max_discovery_retries() -> u32 {
    DEFAULT_MAX_DISCOVERY_RETRIES
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            kind: TransportKind::default(),
            min_rest_version: default_min_rest_version(),
            folder_page_size: default_page_size(),
        }
    }
}

impl Default for RecoverySettings {
    fn default() -> Self {
        Self {
            source_folder: default_source_folder(),
            target_parent: default_target_parent(),
            folder_name: None,
            batch_size: default_batch_size(),
            max_discovery_retries: default_max_discovery_retries(),
        }
    }
}

impl RecoverySettings {
    /// Target folder name, generating a timestamped one if unset
    pub fn folder_name_or_default(&self) -> String {
        self.folder_name.clone().unwrap_or_else(|| {
            format!(
                "Email Recovery {}",
                chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
            )
        })
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl RecoveryConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RecoveryError::Config(format!("Failed to read config file: {}", e)))?;

        let mut config: Self = toml::from_str(&content)
            .map_err(|e| RecoveryError::Config(format!("Failed to parse config: {}", e)))?;

        config.apply_env();
        Ok(config)
    }

    /// Create a default development configuration
    pub fn development() -> Self {
        let mut config = Self {
            host: HostConfig {
                ews_url: "https://outlook.office365.com/EWS/Exchange.asmx".to_string(),
                rest_url: None,
                access_token: None,
                api_version: default_api_version(),
                timeout_seconds: default_timeout(),
            },
            transport: TransportSettings::default(),
            recovery: RecoverySettings::default(),
            logging: LoggingConfig::default(),
        };
        config.apply_env();
        config
    }

    fn apply_env(&mut self) {
        if let Ok(token) = std::env::var(ACCESS_TOKEN_ENV) {
            if !token.is_empty() {
                self.host.access_token = Some(token);
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.host.ews_url).map_err(|e| {
            RecoveryError::Config(format!("Invalid EWS URL '{}': {}", self.host.ews_url, e))
        })?;

        if let Some(rest_url) = &self.host.rest_url {
            url::Url::parse(rest_url).map_err(|e| {
                RecoveryError::Config(format!("Invalid REST URL '{}': {}", rest_url, e))
            })?;
        }

        if self.recovery.batch_size == 0 {
            return Err(RecoveryError::Config("batch_size must be at least 1".to_string()));
        }

        if self.transport.folder_page_size == 0 {
            return Err(RecoveryError::Config(
                "folder_page_size must be at least 1".to_string(),
            ));
        }

        if self.recovery.source_folder.trim().is_empty() {
            return Err(RecoveryError::Config("No source folder configured".to_string()));
        }

        Ok(())
    }
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self::development()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = RecoveryConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.recovery.batch_size, 50);
        assert_eq!(config.recovery.source_folder, "recoverableitemsdeletions");
        assert_eq!(config.recovery.target_parent, "msgfolderroot");
        assert_eq!(config.transport.kind, TransportKind::Auto);
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[host]
ews_url = "https://mail.example.com/EWS/Exchange.asmx"
rest_url = "https://mail.example.com/api/v2.0/me"

[transport]
kind = "rest"

[recovery]
batch_size = 25
folder_name = "Recovered"
"#;
        let config: RecoveryConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.transport.kind, TransportKind::Rest);
        assert_eq!(config.transport.folder_page_size, 50);
        assert_eq!(config.recovery.batch_size, 25);
        assert_eq!(config.recovery.folder_name_or_default(), "Recovered");
        assert_eq!(config.recovery.max_discovery_retries, 3);
        assert_eq!(config.logging.format, "pretty");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[host]\news_url = \"https://mail.example.com/EWS/Exchange.asmx\"\n\n[recovery]\nsource_folder = \"deleteditems\""
        )
        .unwrap();

        let config = RecoveryConfig::from_file(file.path()).unwrap();
        assert_eq!(config.recovery.source_folder, "deleteditems");
    }

    #[test]
    fn test_missing_file() {
        let result = RecoveryConfig::from_file(Path::new("/nonexistent/recovery.toml"));
        assert!(matches!(result, Err(RecoveryError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = RecoveryConfig::default();
        config.recovery.batch_size = 0;
        assert!(config.validate().is_err());

        let mut config = RecoveryConfig::default();
        config.host.ews_url = "not a url".to_string();
        assert!(config.validate().is_err());

        let mut config = RecoveryConfig::default();
        config.recovery.source_folder = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_generated_folder_name() {
        let settings = RecoverySettings::default();
        assert!(settings.folder_name_or_default().starts_with("Email Recovery "));
    }
}
