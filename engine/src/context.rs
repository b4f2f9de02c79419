//! Per-module execution state.
//!
//! A generator module asks the [`InterpolationContext`] for a
//! [`ModuleExecution`], then for a [`State`] binding the schema, affinity
//! group, extensions and search path it renders against. The engine reads
//! the state's optional capabilities to decide which preamble lines to
//! emit; a missing capability is a normal, queryable condition.
//!
//! The context also owns the run's schemas. Every module asking for
//! `dcp_lib` gets the same [`Schema`], so a domain is defined once per run
//! no matter how many modules use it, and [`InterpolationContext::claim_domains`]
//! hands each new domain to exactly one module for emission.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;
use vaultgen_core::{AffinityGroup, Domain, Extension, ModelError, Schema, validate_identifier};

use crate::error::Result;
use crate::provenance::{ModuleExecution, TemplateProvenance};
use crate::version::VersionResolver;

/// Ordered schemas for `SET search_path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPath {
    schemas: Vec<String>,
}

impl SearchPath {
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidIdentifier`](vaultgen_core::ModelError::InvalidIdentifier)
    /// for an empty list or a malformed schema name.
    pub fn new<I, S>(schemas: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let schemas: Vec<String> = schemas.into_iter().map(Into::into).collect();
        if schemas.is_empty() {
            return Err(ModelError::InvalidIdentifier(String::new()).into());
        }
        for schema in &schemas {
            validate_identifier(schema)?;
        }
        Ok(Self { schemas })
    }

    /// Search path over the given model schemas, in order.
    pub fn of(schemas: &[&Schema]) -> Self {
        Self {
            schemas: schemas.iter().map(|s| s.name().to_string()).collect(),
        }
    }

    pub fn schemas(&self) -> &[String] {
        &self.schemas
    }

    pub fn sql(&self) -> String {
        format!("SET search_path TO {};", self.schemas.join(", "))
    }
}

/// What a module binds its state to. Everything is optional.
#[derive(Debug, Clone, Default)]
pub struct StateOptions {
    pub schema: Option<Rc<Schema>>,
    /// Emit `CREATE SCHEMA` for the bound schema in the preamble.
    pub create_schema: bool,
    pub affinity_group: Option<Rc<AffinityGroup>>,
    pub extensions: Vec<Extension>,
    pub search_path: Option<SearchPath>,
}

/// Execution state of one module render.
#[derive(Debug, Clone)]
pub struct State {
    execution: ModuleExecution,
    schema: Option<Rc<Schema>>,
    create_schema: bool,
    affinity_group: Option<Rc<AffinityGroup>>,
    extensions: Vec<Extension>,
    search_path: Option<SearchPath>,
}

impl State {
    pub fn provenance(&self) -> &TemplateProvenance {
        &self.execution.provenance
    }

    /// The schema the module rendered against.
    pub fn schema(&self) -> Option<&Rc<Schema>> {
        self.schema.as_ref()
    }

    /// The schema this state creates, if it supplies one.
    pub fn schema_supplier(&self) -> Option<&Schema> {
        self.schema.as_deref().filter(|_| self.create_schema)
    }

    /// The search path this state sets, if it supplies one.
    pub fn search_path_supplier(&self) -> Option<&SearchPath> {
        self.search_path.as_ref()
    }

    pub fn affinity_group(&self) -> Option<&Rc<AffinityGroup>> {
        self.affinity_group.as_ref()
    }

    pub fn extensions(&self) -> &[Extension] {
        &self.extensions
    }
}

/// Builds module executions and their states, and owns the run's schemas.
pub struct InterpolationContext {
    versions: Box<dyn VersionResolver>,
    schemas: RefCell<Vec<Rc<Schema>>>,
    /// Per schema name, how many registered domains have been claimed.
    claimed: RefCell<HashMap<String, usize>>,
}

impl InterpolationContext {
    pub fn new(versions: Box<dyn VersionResolver>) -> Self {
        Self {
            versions,
            schemas: RefCell::new(Vec::new()),
            claimed: RefCell::new(HashMap::new()),
        }
    }

    /// The run's schema named `name`, created on first use.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidIdentifier`](vaultgen_core::ModelError::InvalidIdentifier)
    /// for a malformed name.
    pub fn schema(&self, name: &str) -> Result<Rc<Schema>> {
        if let Some(schema) = self.schemas.borrow().iter().find(|s| s.name() == name) {
            return Ok(Rc::clone(schema));
        }
        let schema = Rc::new(Schema::new(name)?);
        debug!(schema = name, "opened run schema");
        self.schemas.borrow_mut().push(Rc::clone(&schema));
        Ok(schema)
    }

    /// Domains registered in `schema` since the previous claim, in
    /// registration order. Each domain is handed out once per run.
    pub fn claim_domains(&self, schema: &Schema) -> Vec<Rc<Domain>> {
        let domains = schema.domains();
        let total = domains.len();
        let mut claimed = self.claimed.borrow_mut();
        let start = claimed.entry(schema.name().to_string()).or_insert(0);
        let fresh: Vec<Rc<Domain>> = domains.into_iter().skip(*start).collect();
        *start = total;
        debug!(schema = %schema.name(), claimed = fresh.len(), "claimed domains");
        fresh
    }

    /// Resolves provenance for the module identified by `identity`.
    pub fn prepare_module_execution(&self, identity: &str, source: &str) -> ModuleExecution {
        ModuleExecution {
            provenance: TemplateProvenance {
                identity: identity.to_string(),
                source: source.to_string(),
                version: self.versions.resolve(identity),
            },
        }
    }

    pub fn prepare_state(&self, execution: ModuleExecution, options: StateOptions) -> State {
        State {
            execution,
            schema: options.schema,
            create_schema: options.create_schema,
            affinity_group: options.affinity_group,
            extensions: options.extensions,
            search_path: options.search_path,
        }
    }

    /// Shorthand for [`prepare_module_execution`](Self::prepare_module_execution)
    /// followed by [`prepare_state`](Self::prepare_state).
    pub fn prepare(&self, identity: &str, source: &str, options: StateOptions) -> State {
        self.prepare_state(self.prepare_module_execution(identity, source), options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::version::StaticVersion;

    fn context() -> InterpolationContext {
        InterpolationContext::new(Box::new(StaticVersion("v1.2.3".into())))
    }

    #[test]
    fn test_prepare_module_execution_resolves_version() {
        let execution = context().prepare_module_execution("lib/image.sql.rs", "builtin");
        assert_eq!(execution.provenance.identity, "lib/image.sql.rs");
        assert_eq!(execution.provenance.source, "builtin");
        assert_eq!(execution.provenance.version, "v1.2.3");
    }

    #[test]
    fn test_state_without_capabilities() {
        let state = context().prepare("plain", "builtin", StateOptions::default());
        assert!(state.schema_supplier().is_none());
        assert!(state.search_path_supplier().is_none());
        assert!(state.affinity_group().is_none());
        assert!(state.extensions().is_empty());
    }

    #[test]
    fn test_state_with_capabilities() {
        let schema = Rc::new(Schema::new("dcp_lib").unwrap());
        let state = context().prepare(
            "lib",
            "builtin",
            StateOptions {
                schema: Some(Rc::clone(&schema)),
                create_schema: true,
                search_path: Some(SearchPath::of(&[schema.as_ref()])),
                ..StateOptions::default()
            },
        );
        assert_eq!(state.schema_supplier().map(Schema::name), Some("dcp_lib"));
        assert_eq!(
            state.search_path_supplier().map(SearchPath::sql).as_deref(),
            Some("SET search_path TO dcp_lib;")
        );
    }

    #[test]
    fn test_bound_schema_is_not_created_unless_asked() {
        let context = context();
        let schema = context.schema("dcp_lib").unwrap();
        let state = context.prepare(
            "lib",
            "builtin",
            StateOptions {
                schema: Some(Rc::clone(&schema)),
                ..StateOptions::default()
            },
        );
        assert!(state.schema_supplier().is_none());
        assert!(Rc::ptr_eq(state.schema().unwrap(), &schema));
    }

    #[test]
    fn test_schemas_are_shared_across_the_run() {
        let context = context();
        let first = context.schema("dcp_lib").unwrap();
        let second = context.schema("dcp_lib").unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert!(!Rc::ptr_eq(&first, &context.schema("dcp_context").unwrap()));
        assert!(context.schema("bad name").is_err());
    }

    #[test]
    fn test_claim_domains_hands_out_each_domain_once() {
        let context = context();
        let schema = context.schema("dcp_lib").unwrap();
        let text = |name: &str, schema: &Schema| Domain::new(schema, name, "text");

        schema.use_domain("a", text).unwrap();
        schema.use_domain("b", text).unwrap();
        let names = |domains: Vec<Rc<Domain>>| -> Vec<String> {
            domains.iter().map(|d| d.name().to_string()).collect()
        };
        assert_eq!(names(context.claim_domains(&schema)), vec!["a", "b"]);

        schema.use_domain("a", text).unwrap();
        schema.use_domain("c", text).unwrap();
        assert_eq!(names(context.claim_domains(&schema)), vec!["c"]);
        assert!(context.claim_domains(&schema).is_empty());
    }

    #[test]
    fn test_search_path_validation() {
        assert_eq!(
            SearchPath::new(["dcp_context", "public"]).unwrap().sql(),
            "SET search_path TO dcp_context, public;"
        );
        assert!(matches!(
            SearchPath::new(Vec::<String>::new()),
            Err(EngineError::Model(_))
        ));
        assert!(SearchPath::new(["bad name"]).is_err());
    }
}
