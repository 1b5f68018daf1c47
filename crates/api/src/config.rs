//! Process configuration read from the environment.
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `STOREFRONT_BACKEND` | `file` | `file` or `document` |
//! | `STOREFRONT_DATA_DIR` | `./data` | JSON files for the `file` backend |
//! | `DATABASE_URL` | none | PostgreSQL URL, required for `document` |
//! | `STOREFRONT_BIND_ADDR` | `0.0.0.0:8080` | HTTP listen address |

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

pub const BACKEND_ENV: &str = "STOREFRONT_BACKEND";
pub const DATA_DIR_ENV: &str = "STOREFRONT_DATA_DIR";
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";
pub const BIND_ADDR_ENV: &str = "STOREFRONT_BIND_ADDR";

pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("STOREFRONT_BACKEND must be `file` or `document`, got `{0}`")]
    UnknownBackend(String),

    #[error("DATABASE_URL is required when STOREFRONT_BACKEND=document")]
    MissingDatabaseUrl,

    #[error("STOREFRONT_BIND_ADDR is not a socket address: `{0}`")]
    InvalidBindAddr(String),
}

/// Which persistence backend serves the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    File { data_dir: PathBuf },
    Document { database_url: String },
}

impl StorageBackend {
    pub fn name(&self) -> &'static str {
        match self {
            Self::File { .. } => "file",
            Self::Document { .. } => "document",
        }
    }
}

impl fmt::Display for StorageBackend {
    // Never prints the database URL; it may carry credentials.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File { data_dir } => write!(f, "file ({})", data_dir.display()),
            Self::Document { .. } => f.write_str("document (postgres)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub backend: StorageBackend,
    pub bind_addr: SocketAddr,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let backend = match get(BACKEND_ENV).as_deref().map(str::to_ascii_lowercase).as_deref() {
            None | Some("file") => StorageBackend::File {
                data_dir: PathBuf::from(get(DATA_DIR_ENV).unwrap_or_else(|| DEFAULT_DATA_DIR.to_string())),
            },
            Some("document") => StorageBackend::Document {
                database_url: get(DATABASE_URL_ENV).ok_or(ConfigError::MissingDatabaseUrl)?,
            },
            Some(other) => return Err(ConfigError::UnknownBackend(other.to_string())),
        };

        let raw_addr = get(BIND_ADDR_ENV).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr =
            SocketAddr::from_str(&raw_addr).map_err(|_| ConfigError::InvalidBindAddr(raw_addr))?;

        Ok(Self { backend, bind_addr })
    }

    /// File backend in `data_dir`, bound to an ephemeral localhost port.
    pub fn for_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            backend: StorageBackend::File {
                data_dir: data_dir.into(),
            },
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        }
    }
}
