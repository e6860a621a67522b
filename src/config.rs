use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::protocol::capabilities::{DEFAULT_CAPABILITIES, SERVER_STATUS_AUTOCOMMIT};
use crate::protocol::charset::{BuiltinCharsets, Charset, CharsetResolver};

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub codec: CodecConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CodecConfig {
    /// Largest logical payload the codec will frame, as the server's `max_allowed_packet`.
    /// Unset means no limit.
    #[serde(default)]
    pub max_allowed_packet: Option<usize>,
    /// Charset used to encode column names.
    #[serde(default = "default_charset")]
    pub charset: String,
    /// Capability flags assumed for the client when the session has none.
    #[serde(default = "default_capabilities")]
    pub capabilities: u32,
    #[serde(default = "default_server_status")]
    pub server_status: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_charset() -> String {
    "utf8mb4".to_string()
}

fn default_capabilities() -> u32 {
    DEFAULT_CAPABILITIES
}

fn default_server_status() -> u16 {
    SERVER_STATUS_AUTOCOMMIT
}

fn default_log_filter() -> String {
    "info,mysql_wire=debug".to_string()
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_allowed_packet: None,
            charset: default_charset(),
            capabilities: default_capabilities(),
            server_status: default_server_status(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

impl CodecConfig {
    pub fn charset(&self) -> Result<Charset> {
        BuiltinCharsets
            .resolve_name(&self.charset)
            .with_context(|| format!("invalid codec.charset {:?}", self.charset))
    }
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: AppConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.codec.charset()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::capabilities::{CLIENT_PROTOCOL_41, CLIENT_TRANSACTIONS};
    use std::io::Write;

    #[test]
    fn test_config_load_valid_yaml() {
        let yaml = r#"
codec:
  max_allowed_packet: 4194304
  charset: latin1
  capabilities: 512
logging:
  filter: "warn"
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.codec.max_allowed_packet, Some(4 * 1024 * 1024));
        assert_eq!(config.codec.charset().unwrap(), Charset::Latin1);
        assert_eq!(config.codec.capabilities, CLIENT_PROTOCOL_41);
        assert_eq!(config.codec.server_status, SERVER_STATUS_AUTOCOMMIT);
        assert_eq!(config.logging.filter, "warn");
    }

    #[test]
    fn test_config_defaults() {
        let config: AppConfig = serde_yaml::from_str("{}").unwrap();

        assert_eq!(config.codec.max_allowed_packet, None);
        assert_eq!(config.codec.charset().unwrap(), Charset::Utf8mb4);
        assert_eq!(
            config.codec.capabilities,
            CLIENT_PROTOCOL_41 | CLIENT_TRANSACTIONS
        );
        assert_eq!(config.logging.filter, "info,mysql_wire=debug");
    }

    #[test]
    fn test_invalid_yaml_fails() {
        let yaml = r#"
invalid yaml content {{
"#;
        let result: Result<AppConfig, _> = serde_yaml::from_str(yaml);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "codec:\n  charset: ascii").unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.codec.charset().unwrap(), Charset::Ascii);
    }

    #[test]
    fn test_load_rejects_unknown_charset() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "codec:\n  charset: ebcdic").unwrap();

        let err = AppConfig::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("ebcdic"));
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(AppConfig::load("/nonexistent/mysql-wire.yaml").is_err());
    }
}
