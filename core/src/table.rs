//! Table identities, column sets and table DDL rendering.

use std::collections::HashSet;
use std::fmt;

use crate::column::Column;
use crate::error::{ModelError, Result, validate_identifier};
use crate::schema::Schema;

/// Schema-qualified identity of a table or view.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableName {
    schema: String,
    name: String,
}

impl TableName {
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidIdentifier`] if `name` is not a plain
    /// identifier.
    pub fn new(schema: &Schema, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_identifier(&name)?;
        Ok(Self {
            schema: schema.name().to_string(),
            name,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema_name(&self) -> &str {
        &self.schema
    }

    /// Returns `<schema>.<name>`.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

/// A named `UNIQUE` constraint over one or more columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueConstraint {
    pub name: String,
    pub columns: Vec<String>,
}

impl UniqueConstraint {
    pub fn new(name: impl Into<String>, columns: &[&Column]) -> Self {
        Self {
            name: name.into(),
            columns: columns.iter().map(|c| c.name().to_string()).collect(),
        }
    }

    pub fn sql(&self) -> String {
        format!("CONSTRAINT {} UNIQUE({})", self.name, self.columns.join(", "))
    }
}

/// Ordered columns plus the uniqueness constraints declared over them.
///
/// This is also what a satellite's organic-column supplier returns.
#[derive(Debug, Clone, Default)]
pub struct TableColumns {
    pub all: Vec<Column>,
    pub unique: Vec<UniqueConstraint>,
}

impl TableColumns {
    pub fn new(all: Vec<Column>) -> Self {
        Self {
            all,
            unique: Vec::new(),
        }
    }

    /// Adds a unique constraint over the named columns.
    pub fn with_unique(mut self, name: impl Into<String>, columns: &[&str]) -> Self {
        self.unique.push(UniqueConstraint {
            name: name.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        });
        self
    }
}

/// A table whose column order is fixed at construction and used verbatim
/// for emission.
#[derive(Debug, Clone)]
pub struct Table {
    name: TableName,
    columns: Vec<Column>,
    unique: Vec<UniqueConstraint>,
}

impl Table {
    /// Builds a table and records it in `schema`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::DuplicateColumn`] if two columns share a name,
    /// or [`ModelError::DuplicateTable`] if the schema already has a table
    /// of this name.
    pub fn new(schema: &Schema, name: TableName, columns: TableColumns) -> Result<Self> {
        let mut seen = HashSet::new();
        for column in &columns.all {
            if !seen.insert(column.name()) {
                return Err(ModelError::DuplicateColumn {
                    table: name.name().to_string(),
                    column: column.name().to_string(),
                });
            }
        }
        schema.register_table(name.name())?;
        Ok(Self {
            name,
            columns: columns.all,
            unique: columns.unique,
        })
    }

    pub fn table_name(&self) -> &TableName {
        &self.name
    }

    pub fn name(&self) -> &str {
        self.name.name()
    }

    pub fn qualified_name(&self) -> String {
        self.name.qualified_name()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    pub fn unique_constraints(&self) -> &[UniqueConstraint] {
        &self.unique
    }

    /// Idempotent `CREATE TABLE` followed by index creation.
    pub fn create_sql(&self) -> String {
        let mut lines: Vec<String> = self.columns.iter().map(Column::definition_sql).collect();
        lines.extend(
            self.columns
                .iter()
                .filter_map(|c| c.constraint_sql().map(str::to_string)),
        );
        lines.extend(self.unique.iter().map(UniqueConstraint::sql));

        let mut sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n);",
            self.qualified_name(),
            lines.join(",\n    ")
        );
        for index in self.columns.iter().filter_map(Column::index_sql) {
            sql.push('\n');
            sql.push_str(index);
        }
        sql
    }

    pub fn drop_sql(&self) -> String {
        format!("DROP TABLE IF EXISTS {};", self.qualified_name())
    }
}
