//! Schema namespaces and the per-schema domain registry.
//!
//! A [`Schema`] owns every [`Domain`] defined in it for the duration of a
//! generation run. Domains are memoized by name: the first request runs the
//! factory, every later request for the same name returns the same
//! [`Rc<Domain>`] without constructing anything. Tables and views built
//! against the schema are recorded so duplicate names surface as errors
//! rather than as colliding `CREATE` statements.
//!
//! The registry uses interior mutability and is deliberately `!Sync`; a run
//! builds its model on a single thread.
//!
//! # Examples
//!
//! ```
//! use std::rc::Rc;
//! use vaultgen_core::{Domain, Schema};
//!
//! let schema = Schema::new("dcp_lib").unwrap();
//! let first = schema
//!     .use_domain("content_hash", |name, schema| {
//!         Ok(Domain::new(schema, name, "text")?.not_null())
//!     })
//!     .unwrap();
//! let second = schema
//!     .use_domain("content_hash", |_, _| unreachable!("memoized"))
//!     .unwrap();
//! assert!(Rc::ptr_eq(&first, &second));
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

use crate::domain::Domain;
use crate::error::{ModelError, Result, validate_identifier};

#[derive(Debug, Default)]
struct DomainRegistry {
    by_name: HashMap<String, Rc<Domain>>,
    order: Vec<String>,
}

impl DomainRegistry {
    fn insert(&mut self, name: &str, domain: Rc<Domain>) -> Rc<Domain> {
        self.order.push(name.to_string());
        self.by_name.insert(name.to_string(), Rc::clone(&domain));
        domain
    }
}

/// A database schema (namespace) owning domain, table and view registries.
#[derive(Debug)]
pub struct Schema {
    name: String,
    domains: RefCell<DomainRegistry>,
    tables: RefCell<Vec<String>>,
    views: RefCell<Vec<String>>,
}

impl Schema {
    /// Creates an empty schema.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidIdentifier`] if `name` is not a plain
    /// SQL identifier.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_identifier(&name)?;
        Ok(Self {
            name,
            domains: RefCell::new(DomainRegistry::default()),
            tables: RefCell::new(Vec::new()),
            views: RefCell::new(Vec::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `<schema>.<object>`.
    pub fn qualified_reference(&self, object: &str) -> String {
        format!("{}.{}", self.name, object)
    }

    /// Idempotent DDL creating this schema.
    pub fn create_sql(&self) -> String {
        format!("CREATE SCHEMA IF NOT EXISTS {};", self.name)
    }

    /// Returns the domain registered under `name`, running `factory` only if
    /// no such domain exists yet.
    ///
    /// The factory receives the requested name and this schema. Its errors
    /// propagate unchanged and nothing is registered in that case.
    pub fn use_domain<F>(&self, name: &str, factory: F) -> Result<Rc<Domain>>
    where
        F: FnOnce(&str, &Schema) -> Result<Domain>,
    {
        if let Some(existing) = self.domain(name) {
            debug!(schema = %self.name, domain = name, "Reusing memoized domain");
            return Ok(existing);
        }

        let domain = factory(name, self)?;

        // A factory may define dependent domains, possibly including this one.
        let mut registry = self.domains.borrow_mut();
        if let Some(existing) = registry.by_name.get(name) {
            return Ok(Rc::clone(existing));
        }
        debug!(schema = %self.name, domain = name, "Registered domain");
        Ok(registry.insert(name, Rc::new(domain)))
    }

    /// Registers a fully built domain under its own name.
    ///
    /// Registering a definition equal to the existing one returns the
    /// existing instance.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::DomainConflict`] when a different definition is
    /// already registered under the same name.
    pub fn define_domain(&self, domain: Domain) -> Result<Rc<Domain>> {
        let mut registry = self.domains.borrow_mut();
        if let Some(existing) = registry.by_name.get(domain.name()) {
            if **existing == domain {
                return Ok(Rc::clone(existing));
            }
            return Err(ModelError::DomainConflict {
                name: domain.name().to_string(),
                existing: existing.to_string(),
                requested: domain.to_string(),
            });
        }
        let name = domain.name().to_string();
        debug!(schema = %self.name, domain = %name, "Defined domain");
        Ok(registry.insert(&name, Rc::new(domain)))
    }

    /// Looks up a registered domain.
    pub fn domain(&self, name: &str) -> Option<Rc<Domain>> {
        self.domains.borrow().by_name.get(name).cloned()
    }

    pub fn contains_domain(&self, name: &str) -> bool {
        self.domains.borrow().by_name.contains_key(name)
    }

    /// Domain names in registration order.
    pub fn domain_names(&self) -> Vec<String> {
        self.domains.borrow().order.clone()
    }

    /// Registered domains in registration order.
    pub fn domains(&self) -> Vec<Rc<Domain>> {
        let registry = self.domains.borrow();
        registry
            .order
            .iter()
            .filter_map(|name| registry.by_name.get(name).cloned())
            .collect()
    }

    /// Records a table built against this schema.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::DuplicateTable`] if the name was already used.
    pub fn register_table(&self, table: &str) -> Result<()> {
        let mut tables = self.tables.borrow_mut();
        if tables.iter().any(|t| t == table) {
            return Err(ModelError::DuplicateTable {
                schema: self.name.clone(),
                table: table.to_string(),
            });
        }
        tables.push(table.to_string());
        Ok(())
    }

    /// Records a view built against this schema.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::DuplicateView`] if the name was already used.
    pub fn register_view(&self, view: &str) -> Result<()> {
        let mut views = self.views.borrow_mut();
        if views.iter().any(|v| v == view) {
            return Err(ModelError::DuplicateView {
                schema: self.name.clone(),
                view: view.to_string(),
            });
        }
        views.push(view.to_string());
        Ok(())
    }

    /// Table names in registration order.
    pub fn table_names(&self) -> Vec<String> {
        self.tables.borrow().clone()
    }

    /// View names in registration order.
    pub fn view_names(&self) -> Vec<String> {
        self.views.borrow().clone()
    }
}

/// A PostgreSQL extension a module depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension {
    name: String,
    schema: Option<String>,
}

impl Extension {
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidIdentifier`] for names that are not plain
    /// identifiers.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_identifier(&name)?;
        Ok(Self { name, schema: None })
    }

    /// Installs the extension's objects into `schema`.
    pub fn in_schema(mut self, schema: &Schema) -> Self {
        self.schema = Some(schema.name().to_string());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn create_sql(&self) -> String {
        match &self.schema {
            Some(schema) => format!(
                "CREATE EXTENSION IF NOT EXISTS {} SCHEMA {};",
                self.name, schema
            ),
            None => format!("CREATE EXTENSION IF NOT EXISTS {};", self.name),
        }
    }
}
