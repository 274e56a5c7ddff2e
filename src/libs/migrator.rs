use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::libs::config::MigratorConfig;
use crate::libs::error::{Error, Result};
use crate::libs::id::generate_id;
use crate::libs::query_builder::{
    compile_count, compile_create_indexes, compile_create_table, compile_insert,
    compile_schema_version,
};
use crate::libs::schema::{ID_COLUMN, Schema, TableName};
use crate::libs::seed::{AccountRow, Catalog};
use crate::libs::storage::{SqliteStorage, Storage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MigrationState {
    #[default]
    NotStarted,
    StorageReset,
    Connected,
    SchemaCreated,
    BaseSeeded,
    ExtendedSeeded,
    Closed,
}

/// What a run produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MigrationReport {
    pub state: MigrationState,
    /// Generated id of every seeded currency, keyed by currency name.
    pub currency_ids: HashMap<String, String>,
    pub account_ids: Vec<String>,
    /// Rows per table, read back after seeding, in schema order.
    pub row_counts: Vec<(TableName, i64)>,
}

impl MigrationReport {
    fn advance(&mut self, next: MigrationState) {
        debug!(from = ?self.state, to = ?next, "migration state");
        self.state = next;
    }

    pub fn row_count(&self, table: TableName) -> Option<i64> {
        self.row_counts
            .iter()
            .find(|(name, _)| *name == table)
            .map(|(_, count)| *count)
    }
}

/// Rebuilds the fixture database: reset, connect, create, seed, close.
pub struct Migrator {
    config: MigratorConfig,
    schema: Schema,
    catalog: Catalog,
}

impl Migrator {
    /// Every currency in `catalog` is seeded. Its accounts are seeded only
    /// when `config.extended_fixtures` is set; [`Migrator::from_config`]
    /// pairs the two.
    pub fn new(config: MigratorConfig, schema: Schema, catalog: Catalog) -> Self {
        Self {
            config,
            schema,
            catalog,
        }
    }

    /// The app schema and the catalog matching `config.extended_fixtures`.
    pub fn from_config(config: MigratorConfig) -> Self {
        let catalog = Catalog::for_fixtures(config.extended_fixtures);
        Self::new(config, Schema::app(), catalog)
    }

    pub async fn run(&self) -> Result<MigrationReport> {
        let path = &self.config.database_path;
        info!(
            path = %path.display(),
            extended = self.config.extended_fixtures,
            "rebuilding fixture database"
        );
        let mut report = MigrationReport::default();

        if let Err(err) = self.reset_storage().await {
            error!(%err, "storage reset failed");
            return Err(err);
        }
        report.advance(MigrationState::StorageReset);

        let mut storage = match SqliteStorage::open(path).await {
            Ok(storage) => storage,
            Err(err) => {
                error!(%err, "cannot open database");
                return Err(err);
            }
        };
        report.advance(MigrationState::Connected);

        let outcome = self.populate_into(&mut storage, &mut report).await;
        let closed = storage.close().await;
        if let Err(err) = &closed {
            error!(%err, "closing database failed");
        }
        if let Err(err) = &outcome {
            error!(%err, "fixture generation aborted");
        }
        outcome?;
        closed?;
        report.advance(MigrationState::Closed);

        info!(path = %path.display(), "fixture database ready");
        Ok(report)
    }

    /// Create the schema and seed it on an already open storage.
    pub async fn populate<S>(&self, storage: &mut S) -> Result<MigrationReport>
    where
        S: Storage + ?Sized,
    {
        let mut report = MigrationReport {
            state: MigrationState::Connected,
            ..Default::default()
        };
        self.populate_into(storage, &mut report).await?;
        Ok(report)
    }

    async fn populate_into<S>(&self, storage: &mut S, report: &mut MigrationReport) -> Result<()>
    where
        S: Storage + ?Sized,
    {
        self.catalog.validate()?;
        self.create_tables(storage).await?;
        report.advance(MigrationState::SchemaCreated);

        report.currency_ids = self.seed_currencies(storage).await?;
        report.advance(MigrationState::BaseSeeded);

        if self.config.extended_fixtures {
            if self.catalog.accounts.is_empty() {
                warn!("extended fixtures requested but the catalog has no accounts");
            }
            report.account_ids = self.seed_accounts(storage, &report.currency_ids).await?;
            report.advance(MigrationState::ExtendedSeeded);
        } else if !self.catalog.accounts.is_empty() {
            warn!(
                accounts = self.catalog.accounts.len(),
                "catalog accounts skipped without extended fixtures"
            );
        }

        report.row_counts = self.count_rows(storage).await?;
        Ok(())
    }

    /// Delete the previous database and its sidecars. A missing file is fine.
    async fn reset_storage(&self) -> Result<()> {
        let path = &self.config.database_path;
        remove_if_exists(path).await?;
        for sidecar in self.config.sidecar_paths() {
            remove_if_exists(&sidecar).await?;
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| Error::StorageAccess {
                    operation: "create directory",
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        Ok(())
    }

    // -------- Create tables --------
    async fn create_tables<S>(&self, storage: &mut S) -> Result<()>
    where
        S: Storage + ?Sized,
    {
        self.schema.validate()?;
        for table in &self.schema.tables {
            storage.execute(&compile_create_table(table)).await?;
            for index in compile_create_indexes(table) {
                storage.execute(&index).await?;
            }
            debug!(table = %table.name, columns = table.columns.len(), "created table");
        }
        storage
            .execute(&compile_schema_version(self.schema.version))
            .await?;
        info!(tables = self.schema.tables.len(), version = self.schema.version, "schema created");
        Ok(())
    }

    async fn seed_currencies<S>(&self, storage: &mut S) -> Result<HashMap<String, String>>
    where
        S: Storage + ?Sized,
    {
        let mut ids = HashMap::with_capacity(self.catalog.currencies.len());
        for currency in &self.catalog.currencies {
            let id = self.insert(storage, TableName::Currencies, currency).await?;
            ids.insert(currency.name.clone(), id);
        }
        info!(rows = ids.len(), "seeded currencies");
        Ok(ids)
    }

    async fn seed_accounts<S>(
        &self,
        storage: &mut S,
        currency_ids: &HashMap<String, String>,
    ) -> Result<Vec<String>>
    where
        S: Storage + ?Sized,
    {
        let mut ids = Vec::with_capacity(self.catalog.accounts.len());
        for account in &self.catalog.accounts {
            let currency_id = currency_ids
                .get(&account.currency)
                .ok_or_else(|| Error::lookup_miss(TableName::Currencies.as_str(), &account.currency))?;
            let row = AccountRow {
                name: &account.name,
                balance: account.balance,
                currency_id: currency_id.as_str(),
            };
            ids.push(self.insert(storage, TableName::Accounts, &row).await?);
        }
        info!(rows = ids.len(), "seeded accounts");
        Ok(ids)
    }

    // -------- Insert a record --------
    /// Insert `item` with a freshly generated id and return that id.
    async fn insert<S, T>(&self, storage: &mut S, table_name: TableName, item: &T) -> Result<String>
    where
        S: Storage + ?Sized,
        T: Serialize,
    {
        let table = self
            .schema
            .table(table_name)
            .ok_or_else(|| Error::schema(table_name.as_str(), "table is not part of the schema"))?;

        let mut map = match serde_json::to_value(item)? {
            Value::Object(map) => map,
            other => {
                return Err(Error::schema(
                    table_name.as_str(),
                    format!("seed row must be an object, got {other}"),
                ));
            }
        };

        let mut cols = vec![ID_COLUMN];
        let mut values = Vec::with_capacity(table.columns.len() + 1);
        for c in &table.columns {
            if let Some(v) = map.remove(c.name) {
                cols.push(c.name);
                values.push(v);
            }
        }
        if let Some(extra) = map.keys().next() {
            return Err(Error::schema(
                table_name.as_str(),
                format!("seed row carries undeclared column `{extra}`"),
            ));
        }

        let id = generate_id().await?;
        values.insert(0, Value::String(id.clone()));

        insert_values(storage, table_name, &cols, values).await?;
        debug!(table = %table_name, %id, "inserted row");
        Ok(id)
    }

    async fn count_rows<S>(&self, storage: &mut S) -> Result<Vec<(TableName, i64)>>
    where
        S: Storage + ?Sized,
    {
        let mut counts = Vec::with_capacity(self.schema.tables.len());
        for table in &self.schema.tables {
            let statement = compile_count(table.name);
            let rows = storage.fetch_all(&statement).await?;
            let count = rows
                .first()
                .and_then(|r| r.get("count"))
                .and_then(Value::as_i64)
                .ok_or_else(|| Error::UnexpectedResult {
                    statement: statement.sql.clone(),
                    reason: "no integer `count` column".into(),
                })?;
            counts.push((table.name, count));
        }
        Ok(counts)
    }
}

/// Compile and execute one insert. A column/value count mismatch fails
/// before anything reaches `storage`.
pub async fn insert_values<S>(
    storage: &mut S,
    table: TableName,
    columns: &[&str],
    values: Vec<Value>,
) -> Result<u64>
where
    S: Storage + ?Sized,
{
    let statement = compile_insert(table, columns, values)?;
    storage.execute(&statement).await
}

async fn remove_if_exists(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            debug!(path = %path.display(), "removed previous file");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(Error::StorageAccess {
            operation: "remove",
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::query_builder::Statement;
    use crate::libs::schema::{ColumnSpec, TableSpec};
    use crate::libs::seed::{AccountSeed, CurrencySeed};
    use crate::libs::storage::Record;
    use async_trait::async_trait;
    use serde_json::json;

    /// Records statements and answers every count query with zero rows,
    /// or with no rows at all when `empty_results` is set.
    #[derive(Default)]
    struct RecordingStorage {
        executed: Vec<Statement>,
        empty_results: bool,
    }

    #[async_trait]
    impl Storage for RecordingStorage {
        async fn execute(&mut self, statement: &Statement) -> Result<u64> {
            self.executed.push(statement.clone());
            Ok(1)
        }

        async fn fetch_all(&mut self, _statement: &Statement) -> Result<Vec<Record>> {
            if self.empty_results {
                return Ok(Vec::new());
            }
            let mut row = Record::new();
            row.insert("count".into(), json!(0));
            Ok(vec![row])
        }
    }

    fn currencies_only(catalog: Catalog, extended: bool) -> Migrator {
        let schema = Schema::new(vec![TableSpec::new(
            TableName::Currencies,
            vec![ColumnSpec::text("name"), ColumnSpec::text("alpha_code")],
        )]);
        let config = MigratorConfig::new("unused.db").with_extended_fixtures(extended);
        Migrator::new(config, schema, catalog)
    }

    #[tokio::test]
    async fn creates_tables_before_inserting_in_catalog_order() {
        let migrator = currencies_only(Catalog::base(), false);
        let mut storage = RecordingStorage::default();
        let report = migrator.populate(&mut storage).await.unwrap();

        let sql: Vec<&str> = storage.executed.iter().map(|s| s.sql.as_str()).collect();
        assert!(sql[0].starts_with("CREATE TABLE \"currencies\""));
        assert_eq!(sql[1], "PRAGMA user_version = 1");
        assert_eq!(sql.len(), 5);

        let names: Vec<&Value> = storage.executed[2..].iter().map(|s| &s.params[1]).collect();
        assert_eq!(names, [&json!("Ruble"), &json!("Dollar"), &json!("Euro")]);
        assert_eq!(report.state, MigrationState::BaseSeeded);
        assert_eq!(report.currency_ids.len(), 3);
    }

    #[tokio::test]
    async fn unknown_account_currency_is_a_lookup_miss() {
        let mut catalog = Catalog::base();
        catalog.accounts.push(AccountSeed::new("Card", 10, "Yen"));
        let config = MigratorConfig::new("unused.db").with_extended_fixtures(true);
        let migrator = Migrator::new(config, Schema::app(), catalog);

        let err = migrator
            .populate(&mut RecordingStorage::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::LookupMiss { ref name, .. } if name == "Yen"));
    }

    #[tokio::test]
    async fn undeclared_seed_column_fails_before_insert() {
        let schema = Schema::new(vec![TableSpec::new(
            TableName::Currencies,
            vec![ColumnSpec::text("name")],
        )]);
        let catalog = Catalog {
            currencies: vec![CurrencySeed::new("Ruble", "RUB")],
            accounts: Vec::new(),
        };
        let migrator = Migrator::new(MigratorConfig::new("unused.db"), schema, catalog);
        let mut storage = RecordingStorage::default();

        let err = migrator.populate(&mut storage).await.unwrap_err();
        assert!(err.to_string().contains("alpha_code"));
        assert!(storage.executed.iter().all(|s| !s.sql.starts_with("INSERT")));
    }

    #[tokio::test]
    async fn invalid_schema_executes_nothing() {
        let schema = Schema::new(vec![TableSpec::new(
            TableName::Categories,
            vec![ColumnSpec::text("_status")],
        )]);
        let migrator = Migrator::new(MigratorConfig::new("unused.db"), schema, Catalog::default());
        let mut storage = RecordingStorage::default();

        let err = migrator.populate(&mut storage).await.unwrap_err();
        assert!(matches!(err, Error::SchemaCompilation { .. }));
        assert!(storage.executed.is_empty());
    }

    #[tokio::test]
    async fn arity_mismatch_never_reaches_storage() {
        let mut storage = RecordingStorage::default();
        let result = insert_values(
            &mut storage,
            TableName::Currencies,
            &["id", "name", "alpha_code"],
            vec![json!("0011223344556677"), json!("Ruble")],
        )
        .await;
        assert!(matches!(
            result,
            Err(Error::ArityMismatch { columns: 3, values: 2, .. })
        ));
        assert!(storage.executed.is_empty());
    }

    #[tokio::test]
    async fn duplicate_currency_name_fails_before_any_statement() {
        let mut catalog = Catalog::base();
        catalog.currencies.push(CurrencySeed::new("Ruble", "RUR"));
        catalog.accounts.push(AccountSeed::new("Savings", 100, "Ruble"));
        let config = MigratorConfig::new("unused.db").with_extended_fixtures(true);
        let migrator = Migrator::new(config, Schema::app(), catalog);
        let mut storage = RecordingStorage::default();

        let err = migrator.populate(&mut storage).await.unwrap_err();
        assert!(matches!(err, Error::SchemaCompilation { ref table, .. } if table == "currencies"));
        assert!(storage.executed.is_empty());
    }

    #[tokio::test]
    async fn accounts_need_the_extended_flag() {
        let config = MigratorConfig::new("unused.db");
        let migrator = Migrator::new(config, Schema::app(), Catalog::extended());
        let mut storage = RecordingStorage::default();

        let report = migrator.populate(&mut storage).await.unwrap();
        assert_eq!(report.state, MigrationState::BaseSeeded);
        assert!(report.account_ids.is_empty());
        assert_eq!(report.currency_ids.len(), 4);
        assert!(
            storage
                .executed
                .iter()
                .all(|s| !s.sql.starts_with("INSERT INTO \"accounts\""))
        );
    }

    #[tokio::test]
    async fn missing_count_row_is_an_error() {
        let migrator = currencies_only(Catalog::base(), false);
        let mut storage = RecordingStorage {
            empty_results: true,
            ..Default::default()
        };

        let err = migrator.populate(&mut storage).await.unwrap_err();
        assert!(matches!(err, Error::UnexpectedResult { ref statement, .. } if statement.contains("COUNT(*)")));
    }
}
