//! Named, reusable column-type definitions.
//!
//! A [`Domain`] captures a base SQL type together with the naming,
//! nullability and default conventions of every column built from it. It
//! renders to a PostgreSQL `CREATE DOMAIN` and produces bound table columns
//! through [`Domain::table_column`](crate::Domain::table_column).
//!
//! Three kinds exist:
//!
//! - **typical** domains describe ordinary attribute columns;
//! - **identity** domains describe generated surrogate keys; columns built
//!   from them are primary keys with a uniqueness constraint and an index;
//! - **reference** domains describe columns pointing at an identity domain
//!   from another table.

use std::fmt;

use crate::error::{Result, validate_identifier};
use crate::schema::Schema;

/// Base type of every identity domain.
pub const IDENTITY_BASE_TYPE: &str = "UUID";

/// Default expression generating identity values.
pub const IDENTITY_DEFAULT_EXPR: &str = "gen_random_uuid()";

/// Classification of a domain.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DomainKind {
    /// Ordinary attribute domain.
    #[default]
    Typical,
    /// Generated surrogate key.
    Identity,
    /// Column type referencing the named identity domain.
    Reference(String),
}

/// A named column-type definition scoped to a schema.
///
/// # Examples
///
/// ```
/// use vaultgen_core::{Domain, Schema};
///
/// let schema = Schema::new("lib").unwrap();
/// let loaded_at = Domain::new(&schema, "loaded_at_timestamptz", "timestamptz")
///     .unwrap()
///     .with_default_column_name("loaded_at")
///     .unwrap()
///     .with_default_expr("current_timestamp");
/// assert_eq!(loaded_at.default_column_name(), "loaded_at");
/// assert!(!loaded_at.is_not_null());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Domain {
    schema: String,
    name: String,
    base_type: String,
    default_column_name: String,
    not_null: bool,
    default_expr: Option<String>,
    kind: DomainKind,
}

impl Domain {
    /// Creates a typical domain whose default column name equals its name.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidIdentifier`](crate::ModelError::InvalidIdentifier)
    /// if `name` is not a plain identifier.
    pub fn new(
        schema: &Schema,
        name: impl Into<String>,
        base_type: impl Into<String>,
    ) -> Result<Self> {
        let name = name.into();
        validate_identifier(&name)?;
        Ok(Self {
            schema: schema.name().to_string(),
            default_column_name: name.clone(),
            name,
            base_type: base_type.into(),
            not_null: false,
            default_expr: None,
            kind: DomainKind::Typical,
        })
    }

    /// Creates an identity domain: `UUID`, not null, generated by
    /// `gen_random_uuid()`.
    pub fn identity(
        schema: &Schema,
        name: impl Into<String>,
        default_column_name: impl Into<String>,
    ) -> Result<Self> {
        let mut domain = Self::new(schema, name, IDENTITY_BASE_TYPE)?
            .with_default_column_name(default_column_name)?
            .not_null()
            .with_default_expr(IDENTITY_DEFAULT_EXPR);
        domain.kind = DomainKind::Identity;
        Ok(domain)
    }

    /// Derives the domain used by columns that reference this one.
    ///
    /// The reference is named `<name>_ref`, shares the base type, carries no
    /// default and names its columns after this domain.
    pub fn reference_domain(&self) -> Self {
        Self {
            schema: self.schema.clone(),
            name: format!("{}_ref", self.name),
            base_type: self.base_type.clone(),
            default_column_name: self.name.clone(),
            not_null: false,
            default_expr: None,
            kind: DomainKind::Reference(self.name.clone()),
        }
    }

    /// Overrides the column name used when no explicit one is given.
    pub fn with_default_column_name(mut self, column: impl Into<String>) -> Result<Self> {
        let column = column.into();
        validate_identifier(&column)?;
        self.default_column_name = column;
        Ok(self)
    }

    /// Marks values of this domain as required.
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Sets the SQL default expression.
    pub fn with_default_expr(mut self, expr: impl Into<String>) -> Self {
        self.default_expr = Some(expr.into());
        self
    }

    pub fn schema_name(&self) -> &str {
        &self.schema
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `<schema>.<name>`.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }

    pub fn base_type(&self) -> &str {
        &self.base_type
    }

    pub fn default_column_name(&self) -> &str {
        &self.default_column_name
    }

    pub fn is_not_null(&self) -> bool {
        self.not_null
    }

    pub fn default_expr(&self) -> Option<&str> {
        self.default_expr.as_deref()
    }

    pub fn kind(&self) -> &DomainKind {
        &self.kind
    }

    pub fn is_identity(&self) -> bool {
        self.kind == DomainKind::Identity
    }

    /// Name of the identity domain this domain references, if any.
    pub fn referenced_domain(&self) -> Option<&str> {
        match &self.kind {
            DomainKind::Reference(target) => Some(target),
            _ => None,
        }
    }

    /// Idempotent `CREATE DOMAIN`, skipped when the domain already exists.
    pub fn create_sql(&self) -> String {
        let qname = self.qualified_name();
        format!(
            r#"DO $$
BEGIN
    CREATE DOMAIN {qname} AS {definition};
EXCEPTION
    WHEN DUPLICATE_OBJECT THEN
        RAISE NOTICE 'domain "{qname}" already exists, skipping';
END
$$;"#,
            definition = self.type_definition()
        )
    }

    pub fn drop_sql(&self) -> String {
        format!("DROP DOMAIN IF EXISTS {};", self.qualified_name())
    }

    fn type_definition(&self) -> String {
        let mut definition = self.base_type.clone();
        if self.not_null {
            definition.push_str(" NOT NULL");
        }
        if let Some(expr) = &self.default_expr {
            definition.push_str(" DEFAULT ");
            definition.push_str(expr);
        }
        definition
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} AS {}", self.qualified_name(), self.type_definition())
    }
}
