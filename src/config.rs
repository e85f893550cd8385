//! Configuration handling for the document store.
//!
//! This module merges caller-supplied connection options with documented defaults,
//! normalizes model search paths and exposes the CLI/environment configuration
//! used by the binary.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use crate::error::{DbError, DbResult};

pub const DEFAULT_SCHEME: &str = "mongodb";
pub const DEFAULT_HOSTNAME: &str = "localhost";
pub const DEFAULT_PORT: u16 = 27017;
pub const DEFAULT_MODELS_DIR: &str = "app/models";

// Driver option defaults
pub const DEFAULT_POOL_SIZE: u32 = 15;
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_SOCKET_TIMEOUT_MS: u64 = 45_000;

/// Placeholder written over secrets in published or logged configuration.
pub const MASK: &str = "****";

/// IP protocol family used to reach the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AddressFamily {
    /// Use IPv4, skip trying IPv6
    #[default]
    Ipv4,
    Ipv6,
    /// Let the resolver decide
    Any,
}

impl std::fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ipv4 => write!(f, "ipv4"),
            Self::Ipv6 => write!(f, "ipv6"),
            Self::Any => write!(f, "any"),
        }
    }
}

/// Driver options as supplied by the caller. Unset fields fall back to defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreOptionsInput {
    pub pool_size: Option<u32>,
    pub connect_timeout_ms: Option<u64>,
    pub socket_timeout_ms: Option<u64>,
    pub family: Option<AddressFamily>,
}

/// Effective driver options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreOptions {
    /// Maintain up to this many socket connections
    pub pool_size: u32,
    /// Give up initial connection after this many milliseconds
    pub connect_timeout_ms: u64,
    /// Close sockets after this many milliseconds of inactivity
    pub socket_timeout_ms: u64,
    pub family: AddressFamily,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            socket_timeout_ms: DEFAULT_SOCKET_TIMEOUT_MS,
            family: AddressFamily::default(),
        }
    }
}

impl StoreOptions {
    /// Fill every unset field of `input` from the defaults.
    pub fn merge(input: StoreOptionsInput) -> Self {
        let defaults = Self::default();
        Self {
            pool_size: input.pool_size.unwrap_or(defaults.pool_size),
            connect_timeout_ms: input
                .connect_timeout_ms
                .unwrap_or(defaults.connect_timeout_ms),
            socket_timeout_ms: input.socket_timeout_ms.unwrap_or(defaults.socket_timeout_ms),
            family: input.family.unwrap_or(defaults.family),
        }
    }

    /// Get the connect timeout as a Duration.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Get the socket timeout as a Duration.
    pub fn socket_timeout(&self) -> Duration {
        Duration::from_millis(self.socket_timeout_ms)
    }

    /// Validate options and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.pool_size == 0 {
            return Err("pool_size must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// One model path or a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelPaths {
    One(PathBuf),
    Many(Vec<PathBuf>),
}

impl ModelPaths {
    /// Coerce into a list.
    pub fn into_vec(self) -> Vec<PathBuf> {
        match self {
            Self::One(path) => vec![path],
            Self::Many(paths) => paths,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PathInput {
    pub models: Option<ModelPaths>,
}

/// Partial configuration supplied by the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfigInput {
    /// Full connect URL. Takes precedence over the structured fields.
    pub url: Option<String>,
    pub hostname: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    pub path: PathInput,
    pub options: StoreOptionsInput,
}

impl StoreConfigInput {
    /// Read a partial configuration from a JSON file.
    pub fn from_json_file(path: &Path) -> DbResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            DbError::invalid_input(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            DbError::invalid_input(format!("Invalid config file {}: {}", path.display(), e))
        })
    }

    /// Overlay `other` on top of `self`; fields set in `other` win.
    pub fn overlay(self, other: StoreConfigInput) -> Self {
        Self {
            url: other.url.or(self.url),
            hostname: other.hostname.or(self.hostname),
            port: other.port.or(self.port),
            user: other.user.or(self.user),
            password: other.password.or(self.password),
            database: other.database.or(self.database),
            path: PathInput {
                models: other.path.models.or(self.path.models),
            },
            options: StoreOptionsInput {
                pool_size: other.options.pool_size.or(self.options.pool_size),
                connect_timeout_ms: other
                    .options
                    .connect_timeout_ms
                    .or(self.options.connect_timeout_ms),
                socket_timeout_ms: other
                    .options
                    .socket_timeout_ms
                    .or(self.options.socket_timeout_ms),
                family: other.options.family.or(self.options.family),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorePaths {
    pub models: Vec<PathBuf>,
}

/// Merged store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Contains credentials when derived - never log
    pub url: Option<String>,
    pub hostname: Option<String>,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    pub path: StorePaths,
    pub options: StoreOptions,
}

impl StoreConfig {
    /// Merge caller input with defaults.
    ///
    /// Relative default paths are anchored at `root`. `extra_paths` (queued before
    /// initialization) are appended after the configured model paths.
    pub fn merge(input: StoreConfigInput, root: &Path, extra_paths: &[PathBuf]) -> Self {
        let mut models = input
            .path
            .models
            .map(ModelPaths::into_vec)
            .unwrap_or_else(|| vec![root.join(DEFAULT_MODELS_DIR)]);
        models.extend(extra_paths.iter().cloned());

        Self {
            url: input.url.filter(|u| !u.is_empty()),
            hostname: Some(input.hostname.unwrap_or_else(|| DEFAULT_HOSTNAME.to_string()))
                .filter(|h| !h.is_empty()),
            port: input.port.unwrap_or(DEFAULT_PORT),
            user: input.user.filter(|u| !u.is_empty()),
            password: input.password.filter(|p| !p.is_empty()),
            database: input.database.filter(|d| !d.is_empty()),
            path: StorePaths { models },
            options: StoreOptions::merge(input.options),
        }
    }

    /// Copy of this configuration safe to publish or log.
    pub fn masked(&self) -> Self {
        let mut masked = self.clone();
        if masked.password.is_some() {
            masked.password = Some(MASK.to_string());
        }
        masked.url = masked.url.as_deref().map(mask_url);
        masked
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::merge(StoreConfigInput::default(), Path::new("."), &[])
    }
}

/// Mask the password in a connection URL.
pub fn mask_url(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) if parsed.password().is_some() => {
            // Only fails for URLs that cannot carry credentials
            if parsed.set_password(Some(MASK)).is_ok() {
                parsed.to_string()
            } else {
                url.to_string()
            }
        }
        _ => url.to_string(),
    }
}

/// Named configuration slots published for introspection.
///
/// Replaces a process-wide config registry: the host owns one instance and hands
/// clones to every store.
#[derive(Debug, Clone, Default)]
pub struct ConfigSlots {
    slots: Arc<RwLock<HashMap<String, serde_json::Value>>>,
}

impl ConfigSlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a value under `key`, replacing any previous value.
    pub fn publish<T: Serialize>(&self, key: impl Into<String>, value: &T) -> DbResult<()> {
        let value = serde_json::to_value(value)
            .map_err(|e| DbError::internal(format!("Cannot serialize config slot: {}", e)))?;
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        slots.insert(key.into(), value);
        Ok(())
    }

    /// Read a published value.
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots.get(key).cloned()
    }

    /// List the published keys.
    pub fn keys(&self) -> Vec<String> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        let mut keys: Vec<String> = slots.keys().cloned().collect();
        keys.sort();
        keys
    }
}

/// Command line configuration for the docstore-lifecycle binary.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "docstore-lifecycle",
    about = "Load document store models, connect and report the registry",
    version,
    author
)]
pub struct Cli {
    /// JSON file with a partial store configuration. CLI flags override it.
    #[arg(short, long, value_name = "FILE", env = "STORE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Store name, used for the config slot and log target
    #[arg(long, default_value = "mongo", env = "STORE_NAME")]
    pub name: String,

    /// Project root that relative model paths resolve against
    #[arg(long, value_name = "DIR", env = "STORE_ROOT")]
    pub root: Option<PathBuf>,

    /// Full connection URL (sensitive - not logged)
    #[arg(long, env = "STORE_URL")]
    pub url: Option<String>,

    #[arg(long, env = "STORE_HOSTNAME")]
    pub hostname: Option<String>,

    #[arg(long, env = "STORE_PORT")]
    pub port: Option<u16>,

    #[arg(long, env = "STORE_USER")]
    pub user: Option<String>,

    #[arg(long, env = "STORE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    #[arg(long, env = "STORE_DATABASE")]
    pub database: Option<String>,

    /// Model definition files or directories.
    /// Can be specified multiple times or as comma-separated values.
    #[arg(
        short = 'm',
        long = "models",
        value_name = "PATH",
        env = "STORE_MODELS",
        value_delimiter = ','
    )]
    pub models: Vec<PathBuf>,

    /// Connection pool size
    #[arg(long, env = "STORE_POOL_SIZE")]
    pub pool_size: Option<u32>,

    /// Connection timeout in milliseconds
    #[arg(long, env = "STORE_CONNECT_TIMEOUT")]
    pub connect_timeout: Option<u64>,

    /// Socket inactivity timeout in milliseconds
    #[arg(long, env = "STORE_SOCKET_TIMEOUT")]
    pub socket_timeout: Option<u64>,

    /// IP protocol family
    #[arg(long, value_enum, env = "STORE_FAMILY")]
    pub family: Option<AddressFamily>,

    /// Connect after loading models
    #[arg(long, env = "STORE_CONNECT")]
    pub connect: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "STORE_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "STORE_JSON_LOGS")]
    pub json_logs: bool,
}

impl Cli {
    /// Parse configuration from command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Partial store configuration carried by the flags.
    pub fn store_input(&self) -> StoreConfigInput {
        StoreConfigInput {
            url: self.url.clone(),
            hostname: self.hostname.clone(),
            port: self.port,
            user: self.user.clone(),
            password: self.password.clone(),
            database: self.database.clone(),
            path: PathInput {
                models: (!self.models.is_empty()).then(|| ModelPaths::Many(self.models.clone())),
            },
            options: StoreOptionsInput {
                pool_size: self.pool_size,
                connect_timeout_ms: self.connect_timeout,
                socket_timeout_ms: self.socket_timeout,
                family: self.family,
            },
        }
    }

    /// Layer the flags over the optional config file.
    pub fn resolve_input(&self) -> DbResult<StoreConfigInput> {
        let base = match &self.config {
            Some(path) => StoreConfigInput::from_json_file(path)?,
            None => StoreConfigInput::default(),
        };
        Ok(base.overlay(self.store_input()))
    }

    /// Project root, defaulting to the working directory.
    pub fn root_dir(&self) -> PathBuf {
        self.root.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}
