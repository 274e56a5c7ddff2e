use std::path::PathBuf;

use thiserror::Error;

/// Everything that can abort a fixture run.
#[derive(Debug, Error)]
pub enum Error {
    #[error("storage access failed while trying to {operation} {path}: {source}")]
    StorageAccess {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("database connection at {path} failed: {source}")]
    Connection {
        path: PathBuf,
        #[source]
        source: sqlx::Error,
    },

    #[error("invalid schema for table `{table}`: {reason}")]
    SchemaCompilation { table: String, reason: String },

    #[error("insert into `{table}` names {columns} columns but carries {values} values")]
    ArityMismatch {
        table: String,
        columns: usize,
        values: usize,
    },

    #[error("no `{table}` row named `{name}` was seeded")]
    LookupMiss { table: String, name: String },

    #[error("randomness unavailable: {0}")]
    RandomnessUnavailable(String),

    #[error("executing `{statement}` failed: {source}")]
    Database {
        statement: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("`{statement}` returned an unexpected result: {reason}")]
    UnexpectedResult { statement: String, reason: String },

    #[error("cannot encode seed row: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn schema(table: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SchemaCompilation {
            table: table.into(),
            reason: reason.into(),
        }
    }

    pub fn lookup_miss(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self::LookupMiss {
            table: table.into(),
            name: name.into(),
        }
    }
}
