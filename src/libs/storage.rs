use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteConnectOptions, SqliteRow};
use sqlx::{Column, ConnectOptions, Connection, Row, SqliteConnection};
use tracing::debug;

use crate::libs::error::{Error, Result};
use crate::libs::query_builder::Statement;

/// One decoded row, keyed by column name.
pub type Record = serde_json::Map<String, Value>;

/// The operations the migrator needs from a database connection.
#[async_trait]
pub trait Storage: Send {
    /// Run a statement and return the number of affected rows.
    async fn execute(&mut self, statement: &Statement) -> Result<u64>;

    async fn fetch_all(&mut self, statement: &Statement) -> Result<Vec<Record>>;
}

/// A single SQLite connection, exclusively owned by whoever opened it.
pub struct SqliteStorage {
    path: PathBuf,
    conn: SqliteConnection,
}

impl SqliteStorage {
    /// Open the database at `path` read-write, creating the file if needed.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .connect()
            .await
            .map_err(|source| Error::Connection {
                path: path.clone(),
                source,
            })?;
        debug!(path = %path.display(), "opened database");
        Ok(Self { path, conn })
    }

    pub async fn close(self) -> Result<()> {
        let path = self.path;
        self.conn.close().await.map_err(|source| Error::Connection {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), "closed database");
        Ok(())
    }
}

fn database_error(statement: &Statement) -> impl FnOnce(sqlx::Error) -> Error + '_ {
    move |source| Error::Database {
        statement: statement.sql.clone(),
        source,
    }
}

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// Integral numbers bind as INTEGER, other numbers as REAL.
fn bind_params<'q>(mut query: SqliteQuery<'q>, params: &'q [Value]) -> SqliteQuery<'q> {
    for v in params {
        query = match v {
            Value::String(s) => query.bind(s.as_str()),
            Value::Number(n) => match n.as_i64() {
                Some(i) => query.bind(i),
                None => query.bind(n.as_f64()),
            },
            Value::Bool(b) => query.bind(*b),
            Value::Null => query.bind(None::<String>),
            other => query.bind(other.to_string()),
        };
    }
    query
}

fn decode_row(r: &SqliteRow) -> Record {
    let mut map = serde_json::Map::new();
    for col in r.columns() {
        let col_name = col.name();
        let value = match r.try_get::<Option<i64>, _>(col_name) {
            Ok(Some(v)) => Value::from(v),
            Ok(None) => Value::Null,
            Err(_) => match r.try_get::<Option<f64>, _>(col_name) {
                Ok(Some(v)) => Value::from(v),
                Ok(None) => Value::Null,
                Err(_) => match r.try_get::<Option<String>, _>(col_name) {
                    Ok(Some(v)) => Value::from(v),
                    Ok(None) => Value::Null,
                    Err(_) => Value::Null,
                },
            },
        };
        map.insert(col_name.to_string(), value);
    }
    map
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn execute(&mut self, statement: &Statement) -> Result<u64> {
        debug!(sql = %statement.sql, params = statement.params.len(), "execute");
        let query = bind_params(sqlx::query(&statement.sql), &statement.params);
        let result = query
            .execute(&mut self.conn)
            .await
            .map_err(database_error(statement))?;
        Ok(result.rows_affected())
    }

    async fn fetch_all(&mut self, statement: &Statement) -> Result<Vec<Record>> {
        debug!(sql = %statement.sql, "fetch");
        let query = bind_params(sqlx::query(&statement.sql), &statement.params);
        let rows = query
            .fetch_all(&mut self.conn)
            .await
            .map_err(database_error(statement))?;
        Ok(rows.iter().map(decode_row).collect())
    }
}
