// schema.rs
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::libs::error::{Error, Result};

/// Version written to `PRAGMA user_version` on a fresh database.
pub const SCHEMA_VERSION: u32 = 1;

pub const ID_COLUMN: &str = "id";
pub const STATUS_COLUMN: &str = "_status";
pub const CHANGED_COLUMN: &str = "_changed";

/// Columns every table carries in addition to its declared ones.
pub const SYSTEM_COLUMNS: [&str; 3] = [ID_COLUMN, STATUS_COLUMN, CHANGED_COLUMN];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TableName {
    Currencies,
    Accounts,
    Transactions,
    Categories,
    SubCategories,
}

impl TableName {
    pub const ALL: [TableName; 5] = [
        TableName::Currencies,
        TableName::Accounts,
        TableName::Transactions,
        TableName::Categories,
        TableName::SubCategories,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TableName::Currencies => "currencies",
            TableName::Accounts => "accounts",
            TableName::Transactions => "transactions",
            TableName::Categories => "categories",
            TableName::SubCategories => "sub_categories",
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Number,
    Boolean,
}

impl ColumnType {
    /// Storage type used in `CREATE TABLE`. SQLite has no boolean type.
    pub fn sql_type(self) -> &'static str {
        match self {
            ColumnType::Text => "TEXT",
            ColumnType::Number | ColumnType::Boolean => "INTEGER",
        }
    }
}

impl FromStr for ColumnType {
    type Err = Error;

    fn from_str(tag: &str) -> Result<Self> {
        match tag {
            "text" | "string" => Ok(ColumnType::Text),
            "number" => Ok(ColumnType::Number),
            "boolean" => Ok(ColumnType::Boolean),
            other => Err(Error::schema("<unknown>", format!("unknown column type `{other}`"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub column_type: ColumnType,
    pub is_optional: bool,
    pub is_indexed: bool,
}

impl ColumnSpec {
    pub fn new(name: &'static str, column_type: ColumnType) -> Self {
        Self {
            name,
            column_type,
            is_optional: false,
            is_indexed: false,
        }
    }

    pub fn text(name: &'static str) -> Self {
        Self::new(name, ColumnType::Text)
    }

    pub fn number(name: &'static str) -> Self {
        Self::new(name, ColumnType::Number)
    }

    pub fn boolean(name: &'static str) -> Self {
        Self::new(name, ColumnType::Boolean)
    }

    pub fn optional(mut self) -> Self {
        self.is_optional = true;
        self
    }

    pub fn indexed(mut self) -> Self {
        self.is_indexed = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    pub name: TableName,
    pub columns: Vec<ColumnSpec>,
}

impl TableSpec {
    pub fn new(name: TableName, columns: Vec<ColumnSpec>) -> Self {
        Self { name, columns }
    }

    pub fn indexed_columns(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.columns.iter().filter(|c| c.is_indexed)
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for column in &self.columns {
            if column.name.is_empty() {
                return Err(Error::schema(self.name.as_str(), "column with an empty name"));
            }
            if SYSTEM_COLUMNS.contains(&column.name) {
                return Err(Error::schema(
                    self.name.as_str(),
                    format!("`{}` is a system column", column.name),
                ));
            }
            if !seen.insert(column.name) {
                return Err(Error::schema(
                    self.name.as_str(),
                    format!("column `{}` declared twice", column.name),
                ));
            }
        }
        Ok(())
    }
}

/// Tables in creation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub version: u32,
    pub tables: Vec<TableSpec>,
}

impl Schema {
    pub fn new(tables: Vec<TableSpec>) -> Self {
        Self {
            version: SCHEMA_VERSION,
            tables,
        }
    }

    pub fn table(&self, name: TableName) -> Option<&TableSpec> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for table in &self.tables {
            if !seen.insert(table.name) {
                return Err(Error::schema(table.name.as_str(), "table declared twice"));
            }
            table.validate()?;
        }
        Ok(())
    }

    /// The budgeting app's tables.
    pub fn app() -> Self {
        Self::new(vec![
            TableSpec::new(
                TableName::Currencies,
                vec![
                    ColumnSpec::text("name"),
                    ColumnSpec::text("alpha_code").indexed(),
                ],
            ),
            TableSpec::new(
                TableName::Accounts,
                vec![
                    ColumnSpec::text("name"),
                    ColumnSpec::number("balance"),
                    ColumnSpec::text("currency_id").indexed(),
                    ColumnSpec::text("description").optional(),
                ],
            ),
            TableSpec::new(
                TableName::Transactions,
                vec![
                    ColumnSpec::number("amount"),
                    ColumnSpec::boolean("is_income"),
                    ColumnSpec::text("account_id").indexed(),
                    ColumnSpec::text("sub_category_id").optional().indexed(),
                    ColumnSpec::text("note").optional(),
                    ColumnSpec::number("occurred_at"),
                ],
            ),
            TableSpec::new(
                TableName::Categories,
                vec![ColumnSpec::text("name"), ColumnSpec::text("icon").optional()],
            ),
            TableSpec::new(
                TableName::SubCategories,
                vec![
                    ColumnSpec::text("name"),
                    ColumnSpec::text("category_id").indexed(),
                ],
            ),
        ])
    }
}
