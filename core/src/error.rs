//! Error types for schema object model operations.
//!
//! Every failure the model can detect at generation time is reported
//! through [`ModelError`] so a run aborts before any conflicting DDL is
//! emitted.

use thiserror::Error;

/// Errors raised while building domains, tables and views.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// Identifier is empty or contains characters other than ASCII
    /// alphanumerics and underscores.
    #[error("invalid identifier '{0}': must contain only alphanumeric characters and underscores")]
    InvalidIdentifier(String),

    /// A domain name was registered twice with different definitions.
    #[error("conflicting definitions for domain '{name}': existing {existing}, requested {requested}")]
    DomainConflict {
        name: String,
        existing: String,
        requested: String,
    },

    /// A table with the same name was already built against the schema.
    #[error("duplicate table in schema '{schema}': {table}")]
    DuplicateTable { schema: String, table: String },

    /// A view with the same name was already built against the schema.
    #[error("duplicate view in schema '{schema}': {view}")]
    DuplicateView { schema: String, view: String },

    /// Two columns of the same table share a name (including collisions with
    /// the reserved identity and audit columns).
    #[error("duplicate column '{column}' in table '{table}'")]
    DuplicateColumn { table: String, column: String },

    /// A hub was declared without business keys.
    #[error("hub '{0}' requires at least one business key")]
    EmptyBusinessKeys(String),

    /// A link was declared without hubs.
    #[error("link '{0}' requires at least one hub")]
    EmptyLink(String),
}

/// Convenience alias for results with [`ModelError`].
pub type Result<T> = std::result::Result<T, ModelError>;

/// Validates that an identifier contains only alphanumeric characters and
/// underscores.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ModelError::InvalidIdentifier(name.to_string()));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ModelError::InvalidIdentifier(name.to_string()));
    }
    Ok(())
}
