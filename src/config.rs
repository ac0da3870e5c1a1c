// config.rs
use clap::Parser;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::db::TableName;
use crate::errors::MigrationResult;

/// Copy property records from a local SQLite file into a remote libSQL database.
///
/// Every flag can also be set through the environment (or a `.env` file).
#[derive(Parser, Debug, Clone)]
#[command(name = "turso_migrate", version)]
pub struct Config {
    /// Path of the local SQLite database to read from.
    #[arg(long = "source", env = "SOURCE_DB_PATH", default_value = "db/properties.db")]
    pub source_path: PathBuf,

    /// Table to read in the source database.
    #[arg(long, env = "SOURCE_TABLE", default_value = "properties_unique")]
    pub source_table: String,

    /// Remote database URL (libsql://, https:// or http://).
    #[arg(long = "url", env = "TURSO_DATABASE_URL")]
    pub destination_url: String,

    /// Bearer token for the remote database.
    #[arg(long, env = "TURSO_AUTH_TOKEN", hide_env_values = true)]
    pub auth_token: Secret,

    /// Table to create and fill in the remote database.
    #[arg(long = "table", env = "DESTINATION_TABLE", default_value = "properties")]
    pub destination_table: String,

    /// Per-request timeout against the remote database, in seconds.
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Also create lookup indexes on the destination table.
    #[arg(long, env = "CREATE_INDEXES")]
    pub create_indexes: bool,

    /// Log the destination row count once all rows are sent.
    #[arg(long, env = "VERIFY_COUNT")]
    pub verify: bool,
}

impl Config {
    pub fn source_table(&self) -> MigrationResult<TableName> {
        TableName::parse(&self.source_table)
    }

    pub fn destination_table(&self) -> MigrationResult<TableName> {
        TableName::parse(&self.destination_table)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// A credential that never shows up in `Debug` output or logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}
