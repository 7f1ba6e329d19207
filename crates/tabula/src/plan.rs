//! Ordered migration plans and their MySQL rendering.

use crate::diff::ChangeSet;
use crate::quote_ident;
use std::fmt;
use tabula_schema::{FieldDescription, TableDescription};

/// A single DDL step.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// Create a table with its `id` primary key plus `columns`.
    CreateTable {
        table: String,
        columns: TableDescription,
    },
    /// Drop a whole table.
    DropTable(String),
    AddColumn {
        table: String,
        column: String,
        description: FieldDescription,
    },
    DropColumn {
        table: String,
        column: String,
    },
    /// Rewrite a column to its full desired description.
    ModifyColumn {
        table: String,
        column: String,
        description: FieldDescription,
    },
}

impl Change {
    /// The table this change touches.
    pub fn table(&self) -> &str {
        match self {
            Change::CreateTable { table, .. }
            | Change::DropTable(table)
            | Change::AddColumn { table, .. }
            | Change::DropColumn { table, .. }
            | Change::ModifyColumn { table, .. } => table,
        }
    }

    /// Render as a MySQL statement.
    ///
    /// Defaults are never emitted; only type and nullability reach the DDL.
    pub fn to_sql(&self) -> String {
        match self {
            Change::CreateTable { table, columns } => {
                let mut defs = vec![format!(
                    "{} INT NOT NULL AUTO_INCREMENT PRIMARY KEY",
                    quote_ident(tabula_schema::PRIMARY_KEY)
                )];
                defs.extend(
                    columns
                        .iter()
                        .map(|(name, description)| column_def(name, description)),
                );
                format!(
                    "CREATE TABLE IF NOT EXISTS {} ({});",
                    quote_ident(table),
                    defs.join(", ")
                )
            }
            Change::DropTable(table) => format!("DROP TABLE {};", quote_ident(table)),
            Change::AddColumn {
                table,
                column,
                description,
            } => format!(
                "ALTER TABLE {} ADD {};",
                quote_ident(table),
                column_def(column, description)
            ),
            Change::DropColumn { table, column } => format!(
                "ALTER TABLE {} DROP {};",
                quote_ident(table),
                quote_ident(column)
            ),
            Change::ModifyColumn {
                table,
                column,
                description,
            } => format!(
                "ALTER TABLE {} MODIFY {};",
                quote_ident(table),
                column_def(column, description)
            ),
        }
    }
}

fn column_def(name: &str, description: &FieldDescription) -> String {
    format!(
        "{} {} {}",
        quote_ident(name),
        description.type_name,
        description.required.to_sql()
    )
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Change::CreateTable { table, .. } => write!(f, "+ table {}", table),
            Change::DropTable(table) => write!(f, "- table {}", table),
            Change::AddColumn {
                table,
                column,
                description,
            } => write!(f, "+ {}.{}: {}", table, column, description),
            Change::DropColumn { table, column } => write!(f, "- {}.{}", table, column),
            Change::ModifyColumn {
                table,
                column,
                description,
            } => write!(f, "~ {}.{}: {}", table, column, description),
        }
    }
}

/// Changes in the order they must be applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MigrationPlan {
    pub changes: Vec<Change>,
}

impl MigrationPlan {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn change_count(&self) -> usize {
        self.changes.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Change> {
        self.changes.iter()
    }

    /// One statement per line.
    pub fn to_sql(&self) -> String {
        let mut sql = String::new();
        for change in &self.changes {
            sql.push_str(&change.to_sql());
            sql.push('\n');
        }
        sql
    }
}

impl<'a> IntoIterator for &'a MigrationPlan {
    type Item = &'a Change;
    type IntoIter = std::slice::Iter<'a, Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for MigrationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return writeln!(f, "No changes detected.");
        }
        writeln!(f, "Changes detected:\n")?;
        for change in &self.changes {
            writeln!(f, "  {}", change)?;
        }
        Ok(())
    }
}

impl ChangeSet {
    /// Flatten into an ordered plan: create tables, drop tables, then for
    /// each updated table add, drop, and modify columns.
    pub fn plan(&self) -> MigrationPlan {
        let mut changes = Vec::new();

        for (table, columns) in self.added.iter().flatten() {
            changes.push(Change::CreateTable {
                table: table.clone(),
                columns: columns.clone(),
            });
        }

        for table in self.removed.iter().flatten() {
            changes.push(Change::DropTable(table.clone()));
        }

        for (table, columns) in self.updated.iter().flatten() {
            for (column, description) in columns.added.iter().flatten() {
                changes.push(Change::AddColumn {
                    table: table.clone(),
                    column: column.clone(),
                    description: description.clone(),
                });
            }
            for column in columns.removed.iter().flatten() {
                changes.push(Change::DropColumn {
                    table: table.clone(),
                    column: column.clone(),
                });
            }
            for (column, description) in columns.updated.iter().flatten() {
                changes.push(Change::ModifyColumn {
                    table: table.clone(),
                    column: column.clone(),
                    description: description.clone(),
                });
            }
        }

        MigrationPlan { changes }
    }
}
