//! Runs generator modules through the engine.
//!
//! The [`Controller`] validates the configuration, prepares the destination
//! directory and feeds every [`SqlModule`] through one
//! [`InterpolationEngine`], in order. The first error aborts the run;
//! artifacts already written stay in place.

use std::fs;
use std::io::Write;

use tracing::info;

use crate::config::RunConfig;
use crate::context::{InterpolationContext, State};
use crate::engine::{Emission, InterpolationEngine, RenderOptions};
use crate::error::{EngineError, Result};
use crate::host::HostProbe;
use crate::provenance::ModuleExecution;
use crate::version::VersionResolver;

/// A generator producing one SQL artifact.
pub trait SqlModule {
    /// Module identity, e.g. `lib/housekeeping.sql`. Its stem names the
    /// artifact.
    fn identity(&self) -> &str;

    /// Source descriptor stamped into the preamble.
    fn source(&self) -> &str {
        "builtin"
    }

    /// Renders the module body and the state it was rendered against.
    fn render(&self, context: &InterpolationContext, execution: ModuleExecution)
    -> Result<Rendered>;
}

/// Output of [`SqlModule::render`].
#[derive(Debug, Clone)]
pub struct Rendered {
    pub body: String,
    pub state: State,
    pub options: RenderOptions,
}

impl Rendered {
    pub fn new(body: impl Into<String>, state: State) -> Self {
        Self {
            body: body.into(),
            state,
            options: RenderOptions::default(),
        }
    }
}

/// One artifact of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub index: u32,
    pub identity: String,
    pub output_name: String,
    pub emission: Emission,
}

/// Outcome of [`Controller::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub transaction_id: String,
    pub artifacts: Vec<Artifact>,
}

pub struct Controller {
    transaction_id: String,
    context: InterpolationContext,
    engine: InterpolationEngine,
}

impl Controller {
    /// # Errors
    ///
    /// Returns [`InvalidConfig`](EngineError::InvalidConfig) when the
    /// configuration fails [`RunConfig::validate`] or carries no
    /// transaction id.
    pub fn new(
        config: RunConfig,
        versions: Box<dyn VersionResolver>,
        host: &dyn HostProbe,
    ) -> Result<Self> {
        config.validate()?;
        let transaction_id = config
            .transaction_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| EngineError::InvalidConfig("transaction_id is required".into()))?;
        Ok(Self {
            transaction_id,
            context: InterpolationContext::new(versions),
            engine: InterpolationEngine::new(config, host),
        })
    }

    /// Replaces the stream used when no destination directory is set.
    pub fn with_sink(mut self, sink: Box<dyn Write>) -> Self {
        self.engine = self.engine.with_sink(sink);
        self
    }

    pub fn transaction_id(&self) -> &str {
        &self.transaction_id
    }

    pub fn engine(&self) -> &InterpolationEngine {
        &self.engine
    }

    /// Creates the destination directory (`mkdir -p`) when it is missing.
    ///
    /// Logged in verbose mode; skipped entirely in dry-run mode.
    pub fn prepare_destination(&self) -> Result<()> {
        let config = self.engine.config();
        let Some(dest) = &config.dest_dir else {
            return Ok(());
        };
        if dest.exists() {
            return Ok(());
        }
        if config.is_verbose() {
            info!("mkdir -p {}", dest.display());
        }
        if config.dry_run {
            return Ok(());
        }
        fs::create_dir_all(dest).map_err(|e| EngineError::file(dest, e))
    }

    /// Renders and emits every module, in order.
    ///
    /// # Errors
    ///
    /// Propagates the first module, model or I/O error.
    pub fn run(&mut self, modules: &[Box<dyn SqlModule>]) -> Result<RunSummary> {
        info!(
            transaction_id = %self.transaction_id,
            modules = modules.len(),
            "starting interpolation run"
        );
        self.prepare_destination()?;

        let mut artifacts = Vec::with_capacity(modules.len());
        for module in modules {
            let execution = self
                .context
                .prepare_module_execution(module.identity(), module.source());
            let rendered = module.render(&self.context, execution)?;
            let result = self
                .engine
                .register_result(&rendered.body, rendered.state, rendered.options)?;
            artifacts.push(Artifact {
                index: result.execution_id.index,
                identity: result.state.provenance().identity.clone(),
                output_name: result.output_name.clone(),
                emission: result.emission.clone(),
            });
        }

        info!(
            transaction_id = %self.transaction_id,
            artifacts = artifacts.len(),
            "interpolation run finished"
        );
        Ok(RunSummary {
            transaction_id: self.transaction_id.clone(),
            artifacts,
        })
    }
}
