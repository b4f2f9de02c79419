//! Derived views over model tables.
//!
//! A [`View`] holds no state of its own beyond its name and the `SELECT`
//! it was built from; builders close over the tables they join.

use crate::error::Result;
use crate::schema::Schema;
use crate::table::TableName;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    name: TableName,
    select_sql: String,
}

impl View {
    /// Builds a view and records it in `schema`.
    ///
    /// `select_sql` is a single statement without trailing semicolon.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidIdentifier`](crate::ModelError::InvalidIdentifier)
    /// for a malformed name, or [`ModelError::DuplicateView`](crate::ModelError::DuplicateView)
    /// if the schema already has a view of this name.
    pub fn new(schema: &Schema, name: &str, select_sql: impl Into<String>) -> Result<Self> {
        let name = TableName::new(schema, name)?;
        schema.register_view(name.name())?;
        Ok(Self {
            name,
            select_sql: select_sql.into(),
        })
    }

    pub fn name(&self) -> &str {
        self.name.name()
    }

    pub fn qualified_name(&self) -> String {
        self.name.qualified_name()
    }

    pub fn select_sql(&self) -> &str {
        &self.select_sql
    }

    pub fn create_sql(&self) -> String {
        format!(
            "CREATE OR REPLACE VIEW {} AS\n{};",
            self.qualified_name(),
            self.select_sql.trim_end().trim_end_matches(';')
        )
    }

    pub fn drop_sql(&self) -> String {
        format!("DROP VIEW IF EXISTS {};", self.qualified_name())
    }
}
