use serde_json::Value;

use crate::libs::error::{Error, Result};
use crate::libs::schema::{CHANGED_COLUMN, ID_COLUMN, STATUS_COLUMN, TableName, TableSpec};

/// SQL text plus the values bound to its placeholders, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Number of `?` placeholders in the statement text.
    pub fn placeholder_count(&self) -> usize {
        self.sql.matches('?').count()
    }
}

/// Double-quote an identifier, doubling any quote inside it.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn placeholders(count: usize) -> Vec<&'static str> {
    vec!["?"; count]
}

/// `CREATE TABLE` with the system columns first, then the declared columns
/// in declaration order.
pub fn compile_create_table(table: &TableSpec) -> Statement {
    let mut cols = vec![
        format!("{} TEXT PRIMARY KEY", quote_ident(ID_COLUMN)),
        format!("{} TEXT", quote_ident(STATUS_COLUMN)),
        format!("{} INTEGER", quote_ident(CHANGED_COLUMN)),
    ];
    cols.extend(table.columns.iter().map(|c| {
        let mut col_def = format!("{} {}", quote_ident(c.name), c.column_type.sql_type());
        if !c.is_optional {
            col_def.push_str(" NOT NULL");
        }
        col_def
    }));

    Statement::new(format!(
        "CREATE TABLE {} ({})",
        quote_ident(table.name.as_str()),
        cols.join(", ")
    ))
}

/// One `CREATE INDEX` per indexed column.
pub fn compile_create_indexes(table: &TableSpec) -> Vec<Statement> {
    table
        .indexed_columns()
        .map(|c| {
            Statement::new(format!(
                "CREATE INDEX {} ON {} ({})",
                quote_ident(&format!("{}_{}", table.name, c.name)),
                quote_ident(table.name.as_str()),
                quote_ident(c.name)
            ))
        })
        .collect()
}

/// Parameterized `INSERT`. Values never enter the statement text.
pub fn compile_insert(table: TableName, columns: &[&str], values: Vec<Value>) -> Result<Statement> {
    if columns.len() != values.len() {
        return Err(Error::ArityMismatch {
            table: table.to_string(),
            columns: columns.len(),
            values: values.len(),
        });
    }

    let sql = if columns.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES", quote_ident(table.as_str()))
    } else {
        let cols: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(table.as_str()),
            cols.join(", "),
            placeholders(columns.len()).join(", ")
        )
    };

    Ok(Statement { sql, params: values })
}

pub fn compile_count(table: TableName) -> Statement {
    Statement::new(format!(
        "SELECT COUNT(*) AS \"count\" FROM {}",
        quote_ident(table.as_str())
    ))
}

pub fn compile_select_all(table: TableName) -> Statement {
    Statement::new(format!("SELECT * FROM {}", quote_ident(table.as_str())))
}

pub fn compile_schema_version(version: u32) -> Statement {
    Statement::new(format!("PRAGMA user_version = {version}"))
}
