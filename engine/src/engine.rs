//! Stamping, decorating, naming and routing of rendered SQL.
//!
//! Each call to [`InterpolationEngine::register_result`] walks the same
//! steps: assign the next execution identity, prepend the preamble, compute
//! the artifact name, then write the decorated text to the destination
//! directory or the output stream.
//!
//! Artifacts are named `<index:03>_<stem>.auto.sql`, where `stem` is the
//! module identity's last path segment without extensions. Indices start at
//! 1, increase by one per registered result and are never reused, even when
//! a write fails.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::RunConfig;
use crate::context::State;
use crate::error::{EngineError, Result};
use crate::host::{HostInfo, HostProbe};
use crate::provenance::{ExecutionId, TemplateProvenance, module_stem};

/// Artifact file name for the `index`-th result of module `identity`.
///
/// ```
/// use vaultgen_engine::output_name;
///
/// assert_eq!(
///     output_name(7, "exception_diagnostics.sql.ts"),
///     "007_exception_diagnostics.auto.sql"
/// );
/// ```
pub fn output_name(index: u32, identity: &str) -> String {
    format!("{index:03}_{}.auto.sql", module_stem(identity))
}

/// Where a decorated result went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Emission {
    /// Written to this file.
    File(PathBuf),
    /// Written to the output stream.
    Stream,
    /// Dry run: nothing written. Holds the path a real run would write.
    DryRun(Option<PathBuf>),
}

impl Emission {
    /// Destination path, for both real and dry runs.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Emission::File(path) => Some(path),
            Emission::DryRun(path) => path.as_ref(),
            Emission::Stream => None,
        }
    }
}

/// Per-result rendering switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Strip the common leading indentation from the body.
    pub unindent: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { unindent: true }
    }
}

/// One registered result.
#[derive(Debug, Clone)]
pub struct InterpolationResult {
    pub execution_id: ExecutionId,
    /// Body as rendered by the module (after unindenting, if requested).
    pub raw: String,
    /// Preamble plus body, exactly as emitted.
    pub decorated: String,
    pub state: State,
    pub output_name: String,
    pub emission: Emission,
}

/// Assigns execution identity and emits decorated artifacts.
///
/// Not thread-safe; one engine serves one sequential run.
pub struct InterpolationEngine {
    config: RunConfig,
    host: HostInfo,
    counter: u32,
    results: Vec<InterpolationResult>,
    sink: Box<dyn Write>,
}

impl InterpolationEngine {
    /// Creates an engine writing stream output to standard output.
    pub fn new(config: RunConfig, host: &dyn HostProbe) -> Self {
        Self {
            config,
            host: host.probe(),
            counter: 0,
            results: Vec::new(),
            sink: Box::new(io::stdout()),
        }
    }

    /// Replaces the stream used when no destination directory is set.
    pub fn with_sink(mut self, sink: Box<dyn Write>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn host(&self) -> &HostInfo {
        &self.host
    }

    /// Results in registration order.
    pub fn results(&self) -> &[InterpolationResult] {
        &self.results
    }

    /// Returns the next execution identity.
    pub fn assign_identity(&mut self, provenance: &TemplateProvenance) -> ExecutionId {
        self.counter += 1;
        let id = ExecutionId {
            index: self.counter,
            stamp: Utc::now(),
        };
        debug!(
            index = id.index,
            identity = %provenance.identity,
            "assigned execution identity"
        );
        id
    }

    /// Header lines emitted before every body, in their fixed order.
    pub fn preamble(&self, state: &State) -> Vec<String> {
        let provenance = state.provenance();
        let mut lines = vec![
            format!(
                "-- Code generated by `{}` `{}`. DO NOT EDIT.",
                self.config.tool_name, provenance.version
            ),
            format!("-- Build host: {}", self.host),
            format!("-- Source: {} ({})", provenance.identity, provenance.source),
            format!("-- Version: {}", provenance.version),
        ];

        if let Some(schema) = state.schema_supplier() {
            lines.push(schema.create_sql());
        }

        match state.search_path_supplier() {
            Some(search_path) => lines.push(search_path.sql()),
            None if self.config.is_bootstrap(&provenance.identity) => {
                debug!(identity = %provenance.identity, "bootstrap module, no search_path");
            }
            None => {
                warn!(
                    identity = %provenance.identity,
                    fallback = %self.config.default_search_path,
                    "module supplies no search_path, using fallback"
                );
                lines.push(self.fallback_search_path());
            }
        }

        lines.extend(state.extensions().iter().map(|e| e.create_sql()));
        lines
    }

    /// Preamble followed by `body`, newline-terminated.
    pub fn decorate(&self, state: &State, body: &str) -> String {
        let mut text = self.preamble(state).join("\n");
        text.push_str("\n\n");
        text.push_str(body);
        if !text.ends_with('\n') {
            text.push('\n');
        }
        text
    }

    /// Stamps, decorates, names and routes one module's rendered body.
    ///
    /// # Errors
    ///
    /// Returns [`FileError`](EngineError::FileError) or
    /// [`IoError`](EngineError::IoError) when the artifact cannot be
    /// written. The identity consumed by a failed call is not reused.
    pub fn register_result(
        &mut self,
        content: &str,
        state: State,
        options: RenderOptions,
    ) -> Result<&InterpolationResult> {
        let execution_id = self.assign_identity(state.provenance());
        let raw = if options.unindent {
            unindent(content)
        } else {
            content.to_string()
        };
        let decorated = self.decorate(&state, &raw);
        let output_name = output_name(execution_id.index, &state.provenance().identity);
        let emission = self.route_output(&output_name, &decorated)?;

        self.results.push(InterpolationResult {
            execution_id,
            raw,
            decorated,
            state,
            output_name,
            emission,
        });
        Ok(&self.results[self.results.len() - 1])
    }

    /// Writes `decorated` to `<dest_dir>/<output_name>` or to the stream.
    ///
    /// # Errors
    ///
    /// Returns [`FileError`](EngineError::FileError) when the directory or
    /// file cannot be written, [`IoError`](EngineError::IoError) when the
    /// stream fails.
    pub fn route_output(&mut self, output_name: &str, decorated: &str) -> Result<Emission> {
        let Some(dest) = &self.config.dest_dir else {
            if self.config.dry_run {
                info!(output_name, "dry run, stream output skipped");
                return Ok(Emission::DryRun(None));
            }
            self.sink.write_all(decorated.as_bytes())?;
            self.sink.flush()?;
            return Ok(Emission::Stream);
        };

        let path = dest.join(output_name);
        if self.config.is_verbose() {
            info!(dry_run = self.config.dry_run, "{}", path.display());
        }
        if self.config.dry_run {
            return Ok(Emission::DryRun(Some(path)));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| EngineError::file(parent, e))?;
        }
        fs::write(&path, decorated).map_err(|e| EngineError::file(&path, e))?;
        Ok(Emission::File(path))
    }

    fn fallback_search_path(&self) -> String {
        let schemas: Vec<&str> = self
            .config
            .default_search_path
            .split(',')
            .map(str::trim)
            .collect();
        format!("SET search_path TO {};", schemas.join(", "))
    }
}

const INDENT: [char; 2] = [' ', '\t'];

/// Width in bytes of the leading spaces and tabs of `line`.
fn indent_width(line: &str) -> usize {
    line.len() - line.trim_start_matches(INDENT).len()
}

/// Removes the space/tab indentation common to all non-blank lines, plus
/// leading and trailing blank lines. Other whitespace is content.
fn unindent(text: &str) -> String {
    let lines: Vec<&str> = text.lines().map(str::trim_end).collect();
    let indent = lines
        .iter()
        .filter(|l| !l.is_empty())
        .map(|l| indent_width(l))
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .map(|l| &l[indent.min(indent_width(l))..])
        .collect::<Vec<_>>()
        .join("\n")
        .trim_matches('\n')
        .to_string()
}
