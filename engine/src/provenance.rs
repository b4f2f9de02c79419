//! Where generated text came from and which execution produced it.

use chrono::{DateTime, Utc};

/// Identity, source descriptor and version of a generator module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateProvenance {
    /// Module identity, e.g. `lib/housekeeping.sql.rs`.
    pub identity: String,
    /// Free-form source descriptor, e.g. `builtin`.
    pub source: String,
    pub version: String,
}

impl TemplateProvenance {
    /// The identity's last path segment without extensions.
    pub fn stem(&self) -> &str {
        module_stem(&self.identity)
    }
}

/// A module about to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleExecution {
    pub provenance: TemplateProvenance,
}

/// Identity assigned to one rendered result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionId {
    /// 1-based, strictly increasing within one engine.
    pub index: u32,
    pub stamp: DateTime<Utc>,
}

/// Strips directories and every extension from a module identity.
///
/// ```
/// use vaultgen_engine::module_stem;
///
/// assert_eq!(module_stem("lib/exception_diagnostics.sql.ts"), "exception_diagnostics");
/// assert_eq!(module_stem("bootstrap"), "bootstrap");
/// ```
pub fn module_stem(identity: &str) -> &str {
    let segment = identity.rsplit('/').next().unwrap_or(identity);
    match segment.find('.') {
        Some(dot) => &segment[..dot],
        None => segment,
    }
}
