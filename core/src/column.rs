//! Table columns bound to domains or inline SQL types.
//!
//! Columns are produced by [`Domain::table_column`] (or [`Column::inline`]
//! for one-off attributes). A domain-bound column inherits the domain's
//! default column name, nullability and default expression; anything set in
//! [`ColumnOptions`] takes precedence.
//!
//! Identity domains add a primary-key flag, a `<table>_pk` uniqueness
//! constraint and a `<table>_<column>_idx` index. When the caller supplies
//! a constraint or index fragment it replaces the computed one outright;
//! fragments are never merged.

use std::rc::Rc;

use crate::domain::Domain;
use crate::error::{Result, validate_identifier};
use crate::table::TableName;

/// SQL type of a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    /// Typed by a registered domain.
    Domain(Rc<Domain>),
    /// Typed by a literal SQL type.
    Inline(String),
}

impl ColumnType {
    pub fn sql(&self) -> String {
        match self {
            ColumnType::Domain(domain) => domain.qualified_name(),
            ColumnType::Inline(sql_type) => sql_type.clone(),
        }
    }
}

/// Target of a `REFERENCES` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub table: TableName,
    pub column: String,
}

impl ForeignKey {
    pub fn new(table: &TableName, column: &Column) -> Self {
        Self {
            table: table.clone(),
            column: column.name().to_string(),
        }
    }

    pub fn sql(&self) -> String {
        format!("REFERENCES {}({})", self.table.qualified_name(), self.column)
    }
}

/// Caller overrides applied when building a column from a domain.
///
/// Every `None` field falls back to the value computed from the domain.
#[derive(Debug, Clone, Default)]
pub struct ColumnOptions {
    pub column_name: Option<String>,
    pub not_null: Option<bool>,
    pub default_expr: Option<String>,
    pub foreign_key: Option<ForeignKey>,
    /// Replaces the computed table-level constraint fragment.
    pub constraint_sql: Option<String>,
    /// Replaces the computed index statement.
    pub index_sql: Option<String>,
}

impl ColumnOptions {
    pub fn named(column_name: impl Into<String>) -> Self {
        Self {
            column_name: Some(column_name.into()),
            ..Self::default()
        }
    }

    pub fn with_column_name(mut self, column_name: impl Into<String>) -> Self {
        self.column_name = Some(column_name.into());
        self
    }

    pub fn with_not_null(mut self, not_null: bool) -> Self {
        self.not_null = Some(not_null);
        self
    }

    pub fn with_default_expr(mut self, expr: impl Into<String>) -> Self {
        self.default_expr = Some(expr.into());
        self
    }

    pub fn with_foreign_key(mut self, foreign_key: ForeignKey) -> Self {
        self.foreign_key = Some(foreign_key);
        self
    }

    pub fn with_constraint_sql(mut self, sql: impl Into<String>) -> Self {
        self.constraint_sql = Some(sql.into());
        self
    }

    pub fn with_index_sql(mut self, sql: impl Into<String>) -> Self {
        self.index_sql = Some(sql.into());
        self
    }
}

/// A column belonging to one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    name: String,
    table: TableName,
    column_type: ColumnType,
    not_null: bool,
    default_expr: Option<String>,
    primary_key: bool,
    foreign_key: Option<ForeignKey>,
    constraint_sql: Option<String>,
    index_sql: Option<String>,
}

impl Column {
    /// Creates a nullable column with a literal SQL type and no default.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidIdentifier`](crate::ModelError::InvalidIdentifier)
    /// if `name` is not a plain identifier.
    pub fn inline(
        table: &TableName,
        name: impl Into<String>,
        sql_type: impl Into<String>,
    ) -> Result<Self> {
        let name = name.into();
        validate_identifier(&name)?;
        Ok(Self {
            name,
            table: table.clone(),
            column_type: ColumnType::Inline(sql_type.into()),
            not_null: false,
            default_expr: None,
            primary_key: false,
            foreign_key: None,
            constraint_sql: None,
            index_sql: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &TableName {
        &self.table
    }

    pub fn column_type(&self) -> &ColumnType {
        &self.column_type
    }

    /// The bound domain, if the column is domain-typed.
    pub fn domain(&self) -> Option<&Rc<Domain>> {
        match &self.column_type {
            ColumnType::Domain(domain) => Some(domain),
            ColumnType::Inline(_) => None,
        }
    }

    pub fn is_not_null(&self) -> bool {
        self.not_null
    }

    pub fn default_expr(&self) -> Option<&str> {
        self.default_expr.as_deref()
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    pub fn foreign_key(&self) -> Option<&ForeignKey> {
        self.foreign_key.as_ref()
    }

    pub fn constraint_sql(&self) -> Option<&str> {
        self.constraint_sql.as_deref()
    }

    pub fn index_sql(&self) -> Option<&str> {
        self.index_sql.as_deref()
    }

    /// Column definition as it appears inside `CREATE TABLE`.
    pub fn definition_sql(&self) -> String {
        let mut sql = format!("{} {}", self.name, self.column_type.sql());
        if self.primary_key {
            sql.push_str(" PRIMARY KEY");
        }
        if self.not_null {
            sql.push_str(" NOT NULL");
        }
        if let Some(expr) = &self.default_expr {
            sql.push_str(" DEFAULT ");
            sql.push_str(expr);
        }
        if let Some(fk) = &self.foreign_key {
            sql.push(' ');
            sql.push_str(&fk.sql());
        }
        sql
    }
}

impl Domain {
    /// Builds a column of `table` typed by this domain.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidIdentifier`](crate::ModelError::InvalidIdentifier)
    /// if an overriding column name is not a plain identifier.
    ///
    /// # Examples
    ///
    /// ```
    /// use vaultgen_core::{ColumnOptions, Domain, Schema, TableName};
    ///
    /// let schema = Schema::new("lib").unwrap();
    /// let table = TableName::new(&schema, "hub_exception").unwrap();
    /// let id = schema
    ///     .use_domain("hub_exception_id", |name, schema| {
    ///         Domain::identity(schema, name, "hub_id")
    ///     })
    ///     .unwrap();
    ///
    /// let column = id.table_column(&table, ColumnOptions::default()).unwrap();
    /// assert_eq!(column.name(), "hub_id");
    /// assert!(column.is_primary_key());
    /// assert_eq!(
    ///     column.constraint_sql(),
    ///     Some("CONSTRAINT hub_exception_pk UNIQUE(hub_id)")
    /// );
    /// ```
    pub fn table_column(self: &Rc<Self>, table: &TableName, options: ColumnOptions) -> Result<Column> {
        let name = match options.column_name {
            Some(name) => {
                validate_identifier(&name)?;
                name
            }
            None => self.default_column_name().to_string(),
        };

        let (computed_constraint, computed_index) = if self.is_identity() {
            (
                Some(format!("CONSTRAINT {}_pk UNIQUE({})", table.name(), name)),
                Some(format!(
                    "CREATE INDEX IF NOT EXISTS {}_{}_idx ON {} ({});",
                    table.name(),
                    name,
                    table.qualified_name(),
                    name
                )),
            )
        } else {
            (None, None)
        };

        Ok(Column {
            table: table.clone(),
            column_type: ColumnType::Domain(Rc::clone(self)),
            not_null: options.not_null.unwrap_or(self.is_not_null()),
            default_expr: options
                .default_expr
                .or_else(|| self.default_expr().map(str::to_string)),
            primary_key: self.is_identity(),
            foreign_key: options.foreign_key,
            constraint_sql: options.constraint_sql.or(computed_constraint),
            index_sql: options.index_sql.or(computed_index),
            name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;

    fn fixture() -> (Schema, TableName) {
        let schema = Schema::new("lib").unwrap();
        let table = TableName::new(&schema, "sat_diag").unwrap();
        (schema, table)
    }

    #[test]
    fn test_column_inherits_domain_settings() {
        let (schema, table) = fixture();
        let domain = schema
            .use_domain("loaded_by_db_user_name", |n, s| {
                Ok(Domain::new(s, n, "name")?
                    .with_default_column_name("loaded_by")?
                    .with_default_expr("current_user"))
            })
            .unwrap();

        let column = domain.table_column(&table, ColumnOptions::default()).unwrap();
        assert_eq!(column.name(), "loaded_by");
        assert!(!column.is_not_null());
        assert_eq!(column.default_expr(), Some("current_user"));
        assert!(!column.is_primary_key());
        assert_eq!(column.constraint_sql(), None);
        assert_eq!(column.index_sql(), None);
        assert_eq!(
            column.definition_sql(),
            "loaded_by lib.loaded_by_db_user_name DEFAULT current_user"
        );
    }

    #[test]
    fn test_options_override_domain_settings() {
        let (schema, table) = fixture();
        let domain = schema
            .use_domain("metric_value", |n, s| Domain::new(s, n, "integer"))
            .unwrap();

        let column = domain
            .table_column(
                &table,
                ColumnOptions::named("total")
                    .with_not_null(true)
                    .with_default_expr("0"),
            )
            .unwrap();
        assert_eq!(column.name(), "total");
        assert!(column.is_not_null());
        assert_eq!(column.default_expr(), Some("0"));
    }

    #[test]
    fn test_identity_column_computed_fragments() {
        let (schema, table) = fixture();
        let id = schema
            .use_domain("sat_diag_id", |n, s| Domain::identity(s, n, "sat_id"))
            .unwrap();
        let column = id.table_column(&table, ColumnOptions::default()).unwrap();

        assert!(column.is_primary_key());
        assert!(column.is_not_null());
        assert_eq!(column.constraint_sql(), Some("CONSTRAINT sat_diag_pk UNIQUE(sat_id)"));
        assert_eq!(
            column.index_sql(),
            Some("CREATE INDEX IF NOT EXISTS sat_diag_sat_id_idx ON lib.sat_diag (sat_id);")
        );
        assert_eq!(
            column.definition_sql(),
            "sat_id lib.sat_diag_id PRIMARY KEY NOT NULL DEFAULT gen_random_uuid()"
        );
    }

    #[test]
    fn test_caller_fragments_replace_computed_ones() {
        let (schema, table) = fixture();
        let id = schema
            .use_domain("sat_diag_id", |n, s| Domain::identity(s, n, "sat_id"))
            .unwrap();
        let column = id
            .table_column(
                &table,
                ColumnOptions::default().with_constraint_sql("CONSTRAINT custom_pk UNIQUE(sat_id)"),
            )
            .unwrap();

        assert_eq!(column.constraint_sql(), Some("CONSTRAINT custom_pk UNIQUE(sat_id)"));
        // Not supplied by the caller, so still computed.
        assert!(column.index_sql().unwrap().contains("sat_diag_sat_id_idx"));
    }

    #[test]
    fn test_foreign_key_renders_references() {
        let (schema, table) = fixture();
        let hub = TableName::new(&schema, "hub_exception").unwrap();
        let hub_id = schema
            .use_domain("hub_exception_id", |n, s| Domain::identity(s, n, "hub_id"))
            .unwrap();
        let hub_id_column = hub_id.table_column(&hub, ColumnOptions::default()).unwrap();
        let reference = schema.define_domain(hub_id.reference_domain()).unwrap();

        let column = reference
            .table_column(
                &table,
                ColumnOptions::default()
                    .with_not_null(true)
                    .with_foreign_key(ForeignKey::new(&hub, &hub_id_column)),
            )
            .unwrap();
        assert_eq!(column.name(), "hub_exception_id");
        assert_eq!(
            column.definition_sql(),
            "hub_exception_id lib.hub_exception_id_ref NOT NULL REFERENCES lib.hub_exception(hub_id)"
        );
    }

    #[test]
    fn test_inline_column() {
        let (_, table) = fixture();
        let column = Column::inline(&table, "message", "text").unwrap();
        assert_eq!(column.definition_sql(), "message text");
        assert!(column.domain().is_none());
        assert!(Column::inline(&table, "", "text").is_err());
    }

    #[test]
    fn test_invalid_column_name_override() {
        let (schema, table) = fixture();
        let domain = schema.use_domain("x", |n, s| Domain::new(s, n, "text")).unwrap();
        assert!(
            domain
                .table_column(&table, ColumnOptions::named("x; drop"))
                .is_err()
        );
    }
}
