//! Affinity groups and canonical lifecycle routine names.
//!
//! An [`AffinityGroup`] names a set of related schema objects and may be
//! nested under a parent group; its qualified name joins all ancestor names
//! with `_`. [`LifecycleFunctions`] derives the construct, destroy and
//! unit-test routine names from that qualified name. Generators must use
//! these names instead of spelling them out, so construct/destroy/test
//! routines stay in sync when nesting changes.
//!
//! # Examples
//!
//! ```
//! use std::rc::Rc;
//! use vaultgen_core::AffinityGroup;
//!
//! let hub = Rc::new(AffinityGroup::new("hub_foo").unwrap());
//! let sat = AffinityGroup::nested("sat_foo", &hub).unwrap();
//! let fns = sat.lifecycle_functions();
//!
//! assert_eq!(sat.qualified_name(), "hub_foo_sat_foo");
//! assert_eq!(fns.construct_storage().name(), "hub_foo_sat_foo_construct_storage");
//! assert_eq!(fns.unit_test().name(), "test_hub_foo_sat_foo");
//! ```

use std::fmt;
use std::rc::Rc;

use crate::error::{Result, validate_identifier};
use crate::schema::Schema;

/// A naming/lifecycle group, optionally nested under a parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AffinityGroup {
    name: String,
    parent: Option<Rc<AffinityGroup>>,
}

impl AffinityGroup {
    /// Creates a root group.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidIdentifier`](crate::ModelError::InvalidIdentifier)
    /// if `name` is not a plain identifier.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_identifier(&name)?;
        Ok(Self { name, parent: None })
    }

    /// Creates a group nested under `parent`.
    pub fn nested(name: impl Into<String>, parent: &Rc<AffinityGroup>) -> Result<Self> {
        let mut group = Self::new(name)?;
        group.parent = Some(Rc::clone(parent));
        Ok(group)
    }

    /// Creates a root group or one nested under `parent` when given.
    pub fn with_parent(name: impl Into<String>, parent: Option<&Rc<AffinityGroup>>) -> Result<Self> {
        match parent {
            Some(parent) => Self::nested(name, parent),
            None => Self::new(name),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Rc<AffinityGroup>> {
        self.parent.as_ref()
    }

    /// Ancestor names joined with `_`, root first.
    pub fn qualified_name(&self) -> String {
        match &self.parent {
            Some(parent) => format!("{}_{}", parent.qualified_name(), self.name),
            None => self.name.clone(),
        }
    }

    pub fn lifecycle_functions(&self) -> LifecycleFunctions {
        LifecycleFunctions {
            qualified_name: self.qualified_name(),
        }
    }
}

/// A lifecycle operation with a canonical routine name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleOperation {
    ConstructStorage,
    ConstructIdempotent,
    DestroyIdempotent,
    UnitTest,
}

impl LifecycleOperation {
    pub const ALL: [LifecycleOperation; 4] = [
        LifecycleOperation::ConstructStorage,
        LifecycleOperation::ConstructIdempotent,
        LifecycleOperation::DestroyIdempotent,
        LifecycleOperation::UnitTest,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            LifecycleOperation::ConstructStorage => "construct_storage",
            LifecycleOperation::ConstructIdempotent => "construct_idempotent",
            LifecycleOperation::DestroyIdempotent => "destroy_idempotent",
            LifecycleOperation::UnitTest => "test",
        }
    }
}

/// Pure derivation of lifecycle routine names for one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleFunctions {
    qualified_name: String,
}

impl LifecycleFunctions {
    /// Routine name for `operation`.
    ///
    /// Unit tests are prefixed (`test_<group>`) so pgTAP's runner discovers
    /// them; every other operation is suffixed (`<group>_<tag>`).
    pub fn routine(&self, operation: LifecycleOperation) -> RoutineName {
        let name = match operation {
            LifecycleOperation::UnitTest => format!("{}_{}", operation.tag(), self.qualified_name),
            _ => format!("{}_{}", self.qualified_name, operation.tag()),
        };
        RoutineName { schema: None, name }
    }

    pub fn construct_storage(&self) -> RoutineName {
        self.routine(LifecycleOperation::ConstructStorage)
    }

    pub fn construct_idempotent(&self) -> RoutineName {
        self.routine(LifecycleOperation::ConstructIdempotent)
    }

    pub fn destroy_idempotent(&self) -> RoutineName {
        self.routine(LifecycleOperation::DestroyIdempotent)
    }

    pub fn unit_test(&self) -> RoutineName {
        self.routine(LifecycleOperation::UnitTest)
    }
}

/// Name of a stored procedure or function, optionally schema-qualified.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoutineName {
    schema: Option<String>,
    name: String,
}

impl RoutineName {
    /// Qualifies the routine with `schema`.
    pub fn in_schema(mut self, schema: &Schema) -> Self {
        self.schema = Some(schema.name().to_string());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `<schema>.<name>` when qualified, otherwise the bare name.
    pub fn qualified_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{schema}.{}", self.name),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for RoutineName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified_name())
    }
}
