//! Interpolation engine for generated SQL artifacts.
//!
//! This crate turns rendered module bodies into numbered, traceable
//! artifacts:
//!
//! - [`InterpolationContext`]: builds a module's [`State`] (schema,
//!   affinity group, extensions, search path).
//! - [`InterpolationEngine`]: assigns execution identity, prepends the
//!   preamble and writes `NNN_<stem>.auto.sql` files or streams the text.
//! - [`Controller`]: runs a list of [`SqlModule`]s against one engine.
//! - [`RunConfig`]: YAML-backed run settings.
//!
//! # Example
//!
//! ```
//! use vaultgen_engine::*;
//!
//! let context = InterpolationContext::new(Box::new(StaticVersion("v1.0.0".into())));
//! let mut engine = InterpolationEngine::new(
//!     RunConfig::default(),
//!     &FixedHost::new("build", "linux", "x86_64"),
//! )
//! .with_sink(Box::new(std::io::sink()));
//!
//! let state = context.prepare("lib/telemetry.sql", "builtin", StateOptions::default());
//! let result = engine
//!     .register_result("SELECT 1;", state, RenderOptions::default())
//!     .unwrap();
//!
//! assert_eq!(result.output_name, "001_telemetry.auto.sql");
//! assert!(result.decorated.contains("SET search_path TO public;"));
//! ```

mod config;
mod context;
mod controller;
mod engine;
mod error;
mod host;
mod provenance;
mod version;

pub use config::RunConfig;
pub use context::{InterpolationContext, SearchPath, State, StateOptions};
pub use controller::{Artifact, Controller, Rendered, RunSummary, SqlModule};
pub use engine::{
    Emission, InterpolationEngine, InterpolationResult, RenderOptions, output_name,
};
pub use error::{EngineError, Result};
pub use host::{FixedHost, HostInfo, HostProbe, SystemHost};
pub use provenance::{ExecutionId, ModuleExecution, TemplateProvenance, module_stem};
pub use version::{PackageVersion, StaticVersion, VersionResolver};
