use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

// =============================================================================
// Unified config (figment-deserialized from defaults / config.toml / env vars)
// =============================================================================
//
// Three equivalent ways to configure:
//
//   config.toml:     [session]
//                    backend = "loopback"
//
//   env var:         CODECHAT_SESSION__BACKEND=loopback   (double underscore = nesting)
//
//   (single underscore stays within field names: CODECHAT_SESSION__FETCH_LIMIT)

pub const DEFAULT_PORT: u16 = 4000;
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Which messaging account implementation the bridge drives.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Messaging gateway sidecar over HTTP + WebSocket
    #[default]
    Gateway,
    /// In-process demo account
    Loopback,
}

/// Top-level tunable configuration, deserialized by figment.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerFileConfig,
    #[serde(default)]
    pub session: SessionFileConfig,
}

/// Server tuning knobs (lives under `[server]` in config.toml).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerFileConfig {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default = "default_push_capacity")]
    pub push_capacity: usize,
}

impl Default for ServerFileConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: None,
            push_capacity: default_push_capacity(),
        }
    }
}

/// Messaging account settings (lives under `[session]` in config.toml).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionFileConfig {
    #[serde(default)]
    pub backend: Backend,
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,
    #[serde(default = "default_fetch_limit")]
    pub fetch_limit: usize,
    /// Loopback only: pair automatically after this many seconds (0 = never)
    #[serde(default = "default_auto_pair_secs")]
    pub auto_pair_secs: u64,
}

impl Default for SessionFileConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            gateway_url: default_gateway_url(),
            fetch_limit: default_fetch_limit(),
            auto_pair_secs: default_auto_pair_secs(),
        }
    }
}

fn default_push_capacity() -> usize {
    256
}
fn default_gateway_url() -> String {
    "http://127.0.0.1:4001".to_string()
}
fn default_fetch_limit() -> usize {
    chat_session::DEFAULT_FETCH_LIMIT
}
fn default_auto_pair_secs() -> u64 {
    5
}

/// Build a figment that layers: defaults → config.toml → CODECHAT_* env vars.
///
/// Env vars use double-underscore for nesting into sections:
///   `CODECHAT_SERVER__PORT=8080`  →  `server.port = 8080`
///   `CODECHAT_SESSION__GATEWAY_URL=http://10.0.0.2:4001`  →  `session.gateway_url = ...`
pub fn load_config(data_dir: &Path) -> figment::Figment {
    use figment::{
        Figment,
        providers::{Env, Format, Serialized, Toml},
    };

    Figment::from(Serialized::defaults(FileConfig::default()))
        .merge(Toml::file(data_dir.join("config.toml")))
        .merge(Env::prefixed("CODECHAT_").split("__"))
}

// =============================================================================
// Runtime config structs (derived from FileConfig, used throughout the server)
// =============================================================================

/// Server configuration for runtime behavior.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Capacity of the push broadcast channel
    pub push_capacity: usize,
    /// Messages returned per history request
    pub fetch_limit: usize,
}

impl ServerConfig {
    pub fn from_file(fc: &FileConfig) -> Self {
        Self {
            push_capacity: fc.server.push_capacity.max(1),
            fetch_limit: fc.session.fetch_limit,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from_file(&FileConfig::default())
    }
}

/// Messaging session configuration (runtime view).
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub backend: Backend,
    pub gateway_url: String,
    /// Loopback auto-pair delay (None = pair only on request)
    pub auto_pair: Option<Duration>,
}

impl SessionConfig {
    pub fn from_file(fc: &SessionFileConfig) -> Self {
        Self {
            backend: fc.backend,
            gateway_url: fc.gateway_url.clone(),
            auto_pair: if fc.auto_pair_secs == 0 {
                None
            } else {
                Some(Duration::from_secs(fc.auto_pair_secs))
            },
        }
    }
}

// =============================================================================
// Directory layout config (not tunable via figment; derived from --data-dir)
// =============================================================================

#[derive(Clone, Debug)]
pub struct CodechatConfig {
    pub data_dir: PathBuf,
}

impl CodechatConfig {
    pub fn new(custom_dir: Option<PathBuf>) -> Result<Self> {
        let data_dir = match custom_dir {
            Some(dir) => dir,
            None => dirs::home_dir()
                .context("Could not find home directory")?
                .join(".codechat"),
        };

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {:?}", data_dir))?;

        info!("Data directory: {}", data_dir.display());

        Ok(Self { data_dir })
    }

    pub fn config_toml_path(&self) -> PathBuf {
        self.data_dir.join("config.toml")
    }

    /// Resolve the layered file config for this data directory.
    pub fn file_config(&self) -> Result<FileConfig> {
        load_config(&self.data_dir)
            .extract()
            .with_context(|| format!("Invalid configuration in {:?}", self.config_toml_path()))
    }
}
