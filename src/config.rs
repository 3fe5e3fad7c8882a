// Runtime configuration
// Command line arguments and the resolved settings derived from them
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use thiserror::Error;

use crate::state::db::DEFAULT_BUSY_TIMEOUT;
use crate::state::storage::{default_database_path, StorageError};

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No database path given and no default location: {0}")]
    NoDefaultDatabase(#[from] StorageError),

    #[error("Invalid listen address {addr:?}: {source}")]
    InvalidListenAddr {
        addr: String,
        source: std::net::AddrParseError,
    },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Database options shared by every subcommand
#[derive(Debug, Clone, Args)]
pub struct DatabaseArgs {
    /// SQLite database file (defaults to the platform data directory)
    #[arg(long, global = true, env = "METABOLITE_DB_DATABASE")]
    pub database: Option<PathBuf>,

    /// How long (ms) to wait for a locked database before failing
    #[arg(long, global = true, default_value_t = DEFAULT_BUSY_TIMEOUT.as_millis() as u64)]
    pub busy_timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub busy_timeout: Duration,
}

impl DatabaseConfig {
    /// Resolve the database location, falling back to the platform data directory
    pub fn from_args(args: &DatabaseArgs) -> ConfigResult<Self> {
        let path = match &args.database {
            Some(path) => path.clone(),
            None => default_database_path()?,
        };

        Ok(Self {
            path,
            busy_timeout: Duration::from_millis(args.busy_timeout_ms),
        })
    }
}

/// HTTP server options
#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    /// Address to listen on for HTTP requests
    #[arg(short, long, default_value = DEFAULT_LISTEN_ADDR)]
    pub listen: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
}

impl TryFrom<&ServeArgs> for ServerConfig {
    type Error = ConfigError;

    fn try_from(args: &ServeArgs) -> ConfigResult<Self> {
        let listen_addr = args
            .listen
            .parse()
            .map_err(|source| ConfigError::InvalidListenAddr {
                addr: args.listen.clone(),
                source,
            })?;
        Ok(Self { listen_addr })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
        }
    }
}
