//! Typed operation descriptions and their SQL rendering.
//!
//! Units build [`Statement`]s instead of SQL strings so that a session
//! can either render them against a live catalog or interpret them
//! directly in tests. Rendering validates every identifier; a statement
//! that fails validation never reaches the engine.

use crate::{BenchError, BenchResult, SnapshotId};

/// A named unit of work executed and timed by the runner.
#[derive(Debug, Clone)]
pub struct Operation {
    pub name: String,
    pub statement: Statement,
}

impl Operation {
    pub fn new(name: impl Into<String>, statement: Statement) -> Self {
        Self {
            name: name.into(),
            statement,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub sql_type: String,
}

impl Column {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    Null,
}

impl Value {
    fn render(&self) -> String {
        match self {
            Value::Int(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::Text(v) => quoted(v),
            Value::Bool(v) => if *v { "TRUE" } else { "FALSE" }.to_string(),
            Value::Null => "NULL".to_string(),
        }
    }
}

/// Row predicate for updates and deletes.
#[derive(Debug, Clone)]
pub enum Filter {
    All,
    Eq(String, Value),
}

impl Filter {
    fn render_where(&self) -> BenchResult<String> {
        match self {
            Filter::All => Ok(String::new()),
            Filter::Eq(column, value) => {
                check_ident(column)?;
                Ok(format!(" WHERE {} = {}", column, value.render()))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum Statement {
    CreateTable {
        table: String,
        columns: Vec<Column>,
    },
    Insert {
        table: String,
        columns: Vec<String>,
        rows: Vec<Vec<Value>>,
    },
    /// Seeds the canonical three-column test table (`id BIGINT,
    /// username VARCHAR, score DOUBLE`) with `rows` generated rows in a
    /// single engine-side statement.
    BulkSeed {
        table: String,
        rows: u64,
    },
    Update {
        table: String,
        assignments: Vec<(String, Value)>,
        filter: Filter,
    },
    Delete {
        table: String,
        filter: Filter,
    },
    AddColumn {
        table: String,
        column: Column,
    },
    RenameColumn {
        table: String,
        from: String,
        to: String,
    },
    DropColumn {
        table: String,
        column: String,
    },
    /// Re-inserts the rows a table held at `version`. This is the
    /// recovery idiom: history stays immutable and the restore itself
    /// commits a new snapshot.
    RestoreFrom {
        table: String,
        version: SnapshotId,
    },
    Begin,
    Commit,
    Rollback,
}

impl Statement {
    /// Renders the statement as a single SQL string, validating every
    /// identifier on the way.
    pub fn render(&self) -> BenchResult<String> {
        match self {
            Statement::CreateTable { table, columns } => {
                check_ident(table)?;
                if columns.is_empty() {
                    return Err(BenchError::Config(format!(
                        "create table '{}' with no columns",
                        table
                    )));
                }
                let cols = columns
                    .iter()
                    .map(|c| {
                        check_ident(&c.name)?;
                        check_type(&c.sql_type)?;
                        Ok(format!("{} {}", c.name, c.sql_type))
                    })
                    .collect::<BenchResult<Vec<_>>>()?
                    .join(", ");
                Ok(format!("CREATE TABLE {} ({})", table, cols))
            }
            Statement::Insert {
                table,
                columns,
                rows,
            } => {
                check_ident(table)?;
                if rows.is_empty() {
                    return Err(BenchError::Config(format!("insert into '{}' with no rows", table)));
                }
                for column in columns {
                    check_ident(column)?;
                }
                let mut tuples = Vec::with_capacity(rows.len());
                for row in rows {
                    if row.len() != columns.len() {
                        return Err(BenchError::Config(format!(
                            "insert into '{}': row has {} values for {} columns",
                            table,
                            row.len(),
                            columns.len()
                        )));
                    }
                    let tuple = row.iter().map(Value::render).collect::<Vec<_>>().join(", ");
                    tuples.push(format!("({})", tuple));
                }
                Ok(format!(
                    "INSERT INTO {} ({}) VALUES {}",
                    table,
                    columns.join(", "),
                    tuples.join(", ")
                ))
            }
            Statement::BulkSeed { table, rows } => {
                check_ident(table)?;
                Ok(format!(
                    "INSERT INTO {} SELECT range AS id, 'user_' || range AS username, \
                     random() * 100 AS score FROM range({})",
                    table, rows
                ))
            }
            Statement::Update {
                table,
                assignments,
                filter,
            } => {
                check_ident(table)?;
                if assignments.is_empty() {
                    return Err(BenchError::Config(format!(
                        "update '{}' with no assignments",
                        table
                    )));
                }
                let sets = assignments
                    .iter()
                    .map(|(column, value)| {
                        check_ident(column)?;
                        Ok(format!("{} = {}", column, value.render()))
                    })
                    .collect::<BenchResult<Vec<_>>>()?
                    .join(", ");
                Ok(format!("UPDATE {} SET {}{}", table, sets, filter.render_where()?))
            }
            Statement::Delete { table, filter } => {
                check_ident(table)?;
                Ok(format!("DELETE FROM {}{}", table, filter.render_where()?))
            }
            Statement::AddColumn { table, column } => {
                check_ident(table)?;
                check_ident(&column.name)?;
                check_type(&column.sql_type)?;
                Ok(format!(
                    "ALTER TABLE {} ADD COLUMN {} {}",
                    table, column.name, column.sql_type
                ))
            }
            Statement::RenameColumn { table, from, to } => {
                check_ident(table)?;
                check_ident(from)?;
                check_ident(to)?;
                Ok(format!(
                    "ALTER TABLE {} RENAME COLUMN {} TO {}",
                    table, from, to
                ))
            }
            Statement::DropColumn { table, column } => {
                check_ident(table)?;
                check_ident(column)?;
                Ok(format!("ALTER TABLE {} DROP COLUMN {}", table, column))
            }
            Statement::RestoreFrom { table, version } => {
                check_ident(table)?;
                Ok(format!(
                    "INSERT INTO {} SELECT * FROM {} AT (VERSION => {})",
                    table, table, version
                ))
            }
            Statement::Begin => Ok("BEGIN TRANSACTION".to_string()),
            Statement::Commit => Ok("COMMIT".to_string()),
            Statement::Rollback => Ok("ROLLBACK".to_string()),
        }
    }

    /// Short form for logs and audit lines.
    pub fn summary(&self) -> String {
        match self {
            Statement::CreateTable { table, .. } => format!("create_table {}", table),
            Statement::Insert { table, rows, .. } => {
                format!("insert {} ({} rows)", table, rows.len())
            }
            Statement::BulkSeed { table, rows } => format!("bulk_seed {} ({} rows)", table, rows),
            Statement::Update { table, .. } => format!("update {}", table),
            Statement::Delete { table, .. } => format!("delete {}", table),
            Statement::AddColumn { table, column } => {
                format!("add_column {}.{}", table, column.name)
            }
            Statement::RenameColumn { table, from, to } => {
                format!("rename_column {}.{} -> {}", table, from, to)
            }
            Statement::DropColumn { table, column } => {
                format!("drop_column {}.{}", table, column)
            }
            Statement::RestoreFrom { table, version } => {
                format!("restore {} @ v{}", table, version)
            }
            Statement::Begin => "begin".to_string(),
            Statement::Commit => "commit".to_string(),
            Statement::Rollback => "rollback".to_string(),
        }
    }

    /// Whether the statement touches table data or schema. Transaction
    /// control statements do not; the snapshot for their staged work is
    /// created at commit.
    pub fn is_mutating(&self) -> bool {
        !matches!(
            self,
            Statement::Begin | Statement::Commit | Statement::Rollback
        )
    }
}

pub(crate) fn check_ident(s: &str) -> BenchResult<()> {
    let mut chars = s.chars();
    let head_ok = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    let tail_ok = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if head_ok && tail_ok && s.len() <= 64 {
        Ok(())
    } else {
        Err(BenchError::Config(format!("invalid identifier '{}'", s)))
    }
}

fn check_type(s: &str) -> BenchResult<()> {
    let ok = !s.is_empty()
        && s.len() <= 64
        && s.chars().all(|c| {
            c.is_ascii_alphanumeric() || matches!(c, ' ' | '(' | ')' | ',' | '_')
        });
    if ok {
        Ok(())
    } else {
        Err(BenchError::Config(format!("invalid column type '{}'", s)))
    }
}

/// Single-quoted SQL string literal with embedded quotes doubled.
pub(crate) fn quoted(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_create_table() {
        let stmt = Statement::CreateTable {
            table: "sensor_data".into(),
            columns: vec![
                Column::new("sensor_id", "VARCHAR"),
                Column::new("temperature", "DOUBLE"),
            ],
        };
        assert_eq!(
            stmt.render().unwrap(),
            "CREATE TABLE sensor_data (sensor_id VARCHAR, temperature DOUBLE)"
        );
    }

    #[test]
    fn renders_insert_with_escaped_text() {
        let stmt = Statement::Insert {
            table: "inventory".into(),
            columns: vec!["product_name".into(), "quantity".into()],
            rows: vec![vec![Value::Text("O'Brien special".into()), Value::Int(7)]],
        };
        let sql = stmt.render().unwrap();
        assert_eq!(
            sql,
            "INSERT INTO inventory (product_name, quantity) VALUES ('O''Brien special', 7)"
        );
    }

    #[test]
    fn renders_restore_with_version_pin() {
        let stmt = Statement::RestoreFrom {
            table: "users".into(),
            version: 2,
        };
        assert_eq!(
            stmt.render().unwrap(),
            "INSERT INTO users SELECT * FROM users AT (VERSION => 2)"
        );
    }

    #[test]
    fn renders_update_without_filter() {
        let stmt = Statement::Update {
            table: "events".into(),
            assignments: vec![("priority".into(), Value::Int(5))],
            filter: Filter::All,
        };
        assert_eq!(stmt.render().unwrap(), "UPDATE events SET priority = 5");
    }

    #[test]
    fn renders_filtered_delete() {
        let stmt = Statement::Delete {
            table: "users".into(),
            filter: Filter::Eq("id".into(), Value::Int(3)),
        };
        assert_eq!(stmt.render().unwrap(), "DELETE FROM users WHERE id = 3");
    }

    #[test]
    fn rejects_hostile_identifiers() {
        let stmt = Statement::Delete {
            table: "users; DROP TABLE users".into(),
            filter: Filter::All,
        };
        assert!(matches!(stmt.render(), Err(BenchError::Config(_))));

        let stmt = Statement::CreateTable {
            table: "t".into(),
            columns: vec![Column::new("x", "VARCHAR); --")],
        };
        assert!(matches!(stmt.render(), Err(BenchError::Config(_))));
    }

    #[test]
    fn rejects_shapeless_inserts() {
        let stmt = Statement::Insert {
            table: "t".into(),
            columns: vec!["a".into(), "b".into()],
            rows: vec![vec![Value::Int(1)]],
        };
        assert!(matches!(stmt.render(), Err(BenchError::Config(_))));
    }

    #[test]
    fn transaction_control_is_not_mutating() {
        assert!(!Statement::Begin.is_mutating());
        assert!(!Statement::Commit.is_mutating());
        assert!(!Statement::Rollback.is_mutating());
        assert!(Statement::Delete {
            table: "t".into(),
            filter: Filter::All
        }
        .is_mutating());
    }
}
