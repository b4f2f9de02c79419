//! Run configuration for interpolation passes.
//!
//! Defines the YAML-serializable settings controlling where artifacts go,
//! how loudly a run reports, and which modules skip the search-path
//! fallback. Every field has a default, so a partial file is valid.
//!
//! # Example YAML
//!
//! ```yaml
//! dest_dir: target/sql
//! dry_run: false
//! verbose: true
//! tool_name: vaultctl
//! default_search_path: public
//! bootstrap_modules:
//!   - bootstrap
//! ```

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use vaultgen_core::validate_identifier;

use crate::error::{EngineError, Result};
use crate::provenance::module_stem;

/// Settings for one generation run.
///
/// # Examples
///
/// ```
/// use vaultgen_engine::RunConfig;
///
/// let config: RunConfig = serde_yaml::from_str("dry_run: true").unwrap();
/// assert!(config.is_verbose());
/// assert!(config.is_bootstrap("lib/bootstrap.sql"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Directory receiving artifacts; `None` writes to standard output.
    pub dest_dir: Option<PathBuf>,
    /// Compute and log everything but create no directories or files.
    pub dry_run: bool,
    /// Log each resolved artifact path.
    pub verbose: bool,
    /// Identifier shared by every artifact of this run.
    pub transaction_id: Option<String>,
    /// Tool name stamped into each preamble.
    pub tool_name: String,
    /// Search path emitted when a module supplies none.
    pub default_search_path: String,
    /// Module stems exempt from the search-path fallback.
    pub bootstrap_modules: Vec<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            dest_dir: None,
            dry_run: false,
            verbose: false,
            transaction_id: None,
            tool_name: "vaultctl".to_string(),
            default_search_path: "public".to_string(),
            bootstrap_modules: vec!["bootstrap".to_string()],
        }
    }
}

impl RunConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`FileError`](EngineError::FileError) if the file cannot be
    /// read, or [`YamlError`](EngineError::YamlError) if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| EngineError::file(path, e))?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`FileError`](EngineError::FileError) if the file cannot be
    /// written, or [`YamlError`](EngineError::YamlError) if serialization
    /// fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = std::fs::File::create(path).map_err(|e| EngineError::file(path, e))?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Checks the settings before any generation happens.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidConfig`](EngineError::InvalidConfig) for an empty
    /// tool name, a default search path containing a non-identifier, or a
    /// destination that exists but is not a directory.
    pub fn validate(&self) -> Result<()> {
        if self.tool_name.trim().is_empty() {
            return Err(EngineError::InvalidConfig("tool_name must not be empty".into()));
        }
        for schema in self.default_search_path.split(',').map(str::trim) {
            validate_identifier(schema).map_err(|_| {
                EngineError::InvalidConfig(format!(
                    "default_search_path contains invalid schema name {schema:?}"
                ))
            })?;
        }
        if let Some(dest) = &self.dest_dir {
            if dest.exists() && !dest.is_dir() {
                return Err(EngineError::InvalidConfig(format!(
                    "destination {} is not a directory",
                    dest.display()
                )));
            }
        }
        Ok(())
    }

    /// Dry runs always report what they would have done.
    pub fn is_verbose(&self) -> bool {
        self.verbose || self.dry_run
    }

    /// Returns `true` if the module identified by `identity` is exempt from
    /// the search-path fallback.
    pub fn is_bootstrap(&self, identity: &str) -> bool {
        let stem = module_stem(identity);
        self.bootstrap_modules.iter().any(|m| m == stem)
    }
}
