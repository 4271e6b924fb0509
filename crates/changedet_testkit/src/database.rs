//! In-memory tables with a statement log.
//!
//! Stands in for a SQL connection so tests can count the statements a flush
//! issues and read back raw stored values.

use crate::error::{HostError, HostResult};
use changedet_codec::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// A stored row: column name to database value.
pub type Row = BTreeMap<String, Value>;

/// One executed statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// Row lookup by id.
    Select {
        /// Table read.
        table: String,
        /// Row id.
        id: i64,
    },
    /// Row creation.
    Insert {
        /// Table written.
        table: String,
        /// Id of the new row.
        id: i64,
        /// Columns written.
        columns: Vec<String>,
    },
    /// Row modification.
    Update {
        /// Table written.
        table: String,
        /// Row id.
        id: i64,
        /// Columns written.
        columns: Vec<String>,
    },
}

impl Statement {
    /// True for `INSERT` and `UPDATE`.
    #[must_use]
    pub fn is_write(&self) -> bool {
        !matches!(self, Statement::Select { .. })
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Select { table, id } => write!(f, "SELECT * FROM {table} WHERE id = {id}"),
            Statement::Insert { table, id, columns } => {
                write!(f, "INSERT INTO {table} (id, {}) [id={id}]", columns.join(", "))
            }
            Statement::Update { table, id, columns } => {
                let sets: Vec<String> = columns.iter().map(|c| format!("{c} = ?")).collect();
                write!(f, "UPDATE {table} SET {} WHERE id = {id}", sets.join(", "))
            }
        }
    }
}

/// Ordered record of executed statements.
#[derive(Debug, Clone, Default)]
pub struct QueryLog {
    statements: Vec<Statement>,
}

impl QueryLog {
    /// All statements since the last reset.
    #[must_use]
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Number of statements since the last reset.
    #[must_use]
    pub fn count(&self) -> usize {
        self.statements.len()
    }

    /// Number of `INSERT` and `UPDATE` statements since the last reset.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.statements.iter().filter(|s| s.is_write()).count()
    }

    /// Forgets logged statements.
    pub fn reset(&mut self) {
        self.statements.clear();
    }

    fn push(&mut self, statement: Statement) {
        tracing::trace!(%statement, "executed");
        self.statements.push(statement);
    }
}

#[derive(Debug, Default)]
struct Table {
    rows: BTreeMap<i64, Row>,
    last_id: i64,
}

/// A set of tables keyed by integer id, with auto-increment ids.
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    tables: HashMap<String, Table>,
    log: QueryLog,
}

impl MemoryDatabase {
    /// Creates an empty database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table if it does not exist.
    pub fn create_table(&mut self, name: impl Into<String>) {
        self.tables.entry(name.into()).or_default();
    }

    /// Writes a row directly, bypassing the log.
    ///
    /// Used to set up state before the part of a test that counts
    /// statements.
    pub fn seed(&mut self, table: &str, id: i64, row: Row) -> HostResult<()> {
        let table = self.table_mut(table)?;
        table.last_id = table.last_id.max(id);
        table.rows.insert(id, row);
        Ok(())
    }

    /// Inserts a row under the next id and returns it.
    pub fn insert(&mut self, table: &str, row: Row) -> HostResult<i64> {
        let data = self.table_mut(table)?;
        data.last_id += 1;
        let id = data.last_id;
        let columns = row.keys().cloned().collect();
        data.rows.insert(id, row);
        self.log.push(Statement::Insert {
            table: table.to_string(),
            id,
            columns,
        });
        Ok(id)
    }

    /// Reads a row.
    pub fn select(&mut self, table: &str, id: i64) -> HostResult<Option<Row>> {
        let row = self.table(table)?.rows.get(&id).cloned();
        self.log.push(Statement::Select {
            table: table.to_string(),
            id,
        });
        Ok(row)
    }

    /// Overwrites columns of an existing row.
    pub fn update(&mut self, table: &str, id: i64, changes: Row) -> HostResult<()> {
        let row = self
            .table_mut(table)?
            .rows
            .get_mut(&id)
            .ok_or_else(|| HostError::row_not_found(table, id))?;
        let columns = changes.keys().cloned().collect();
        row.extend(changes);
        self.log.push(Statement::Update {
            table: table.to_string(),
            id,
            columns,
        });
        Ok(())
    }

    /// Reads one stored value without logging.
    pub fn fetch_value(&self, table: &str, id: i64, column: &str) -> HostResult<Option<Value>> {
        let row = self
            .table(table)?
            .rows
            .get(&id)
            .ok_or_else(|| HostError::row_not_found(table, id))?;
        Ok(row.get(column).cloned())
    }

    /// The statement log.
    #[must_use]
    pub fn log(&self) -> &QueryLog {
        &self.log
    }

    /// Forgets logged statements.
    pub fn reset_log(&mut self) {
        self.log.reset();
    }

    fn table(&self, name: &str) -> HostResult<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| HostError::unknown_table(name))
    }

    fn table_mut(&mut self, name: &str) -> HostResult<&mut Table> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| HostError::unknown_table(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(value: &str) -> Row {
        Row::from([("day".to_string(), Value::from(value))])
    }

    #[test]
    fn insert_assigns_increasing_ids() {
        let mut db = MemoryDatabase::new();
        db.create_table("t");

        assert_eq!(db.insert("t", row("a")).unwrap(), 1);
        assert_eq!(db.insert("t", row("b")).unwrap(), 2);
        assert_eq!(db.log().writes(), 2);
    }

    #[test]
    fn seed_is_not_logged_and_moves_ids() {
        let mut db = MemoryDatabase::new();
        db.create_table("t");

        db.seed("t", 111, row("a")).unwrap();
        assert_eq!(db.log().count(), 0);
        assert_eq!(db.insert("t", row("b")).unwrap(), 112);
    }

    #[test]
    fn update_and_fetch() {
        let mut db = MemoryDatabase::new();
        db.create_table("t");
        let id = db.insert("t", row("a")).unwrap();

        db.update("t", id, row("b")).unwrap();

        assert_eq!(db.fetch_value("t", id, "day").unwrap(), Some(Value::from("b")));
        assert_eq!(
            db.log().statements().last().unwrap().to_string(),
            "UPDATE t SET day = ? WHERE id = 1"
        );
    }

    #[test]
    fn select_logs_reads() {
        let mut db = MemoryDatabase::new();
        db.create_table("t");

        assert!(db.select("t", 9).unwrap().is_none());
        assert_eq!(db.log().count(), 1);
        assert_eq!(db.log().writes(), 0);

        db.reset_log();
        assert_eq!(db.log().count(), 0);
    }

    #[test]
    fn missing_table_and_row() {
        let mut db = MemoryDatabase::new();
        assert!(matches!(db.insert("nope", Row::new()), Err(HostError::UnknownTable { .. })));

        db.create_table("t");
        assert!(matches!(db.update("t", 1, Row::new()), Err(HostError::RowNotFound { .. })));
    }
}
