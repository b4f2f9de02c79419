//! Schema object model for generated, idempotent PostgreSQL DDL.
//!
//! This crate defines the building blocks SQL generator modules use:
//!
//! - [`Schema`]: a named namespace owning the memoized domain registry.
//! - [`Domain`]: a reusable column-type definition (typical, identity or
//!   reference).
//! - [`Column`] / [`Table`] / [`View`]: DDL objects built from domains.
//! - [`AffinityGroup`]: naming scope whose [`LifecycleFunctions`] derive
//!   construct, destroy and test routine names.
//! - [`HubTable`], [`LinkTable`], [`SatelliteTable`]: Data Vault 2.0
//!   builders with fixed column layouts.
//!
//! Nothing here performs I/O or talks to a database; every object renders
//! its own SQL text.
//!
//! # Example
//!
//! ```
//! use vaultgen_core::*;
//!
//! let schema = Schema::new("dcp_lib").unwrap();
//! let key = text_business_key_domain(&schema, "exception_hub_key", "key").unwrap();
//! let hub = HubTable::new(&schema, "exception", vec![BusinessKey::new(key)],
//!     HubOptions::default()).unwrap();
//!
//! let sat = SatelliteTable::new(
//!     &schema,
//!     &hub,
//!     "exception_diagnostics",
//!     |table| Ok(TableColumns::new(vec![Column::inline(table, "message", "text")?])),
//!     SatelliteOptions::default(),
//! )
//! .unwrap();
//!
//! assert_eq!(sat.parent_column().name(), "hub_exception_id");
//! assert_eq!(
//!     hub.lifecycle_functions().construct_idempotent().name(),
//!     "hub_exception_construct_idempotent"
//! );
//! assert!(schema.contains_domain("hub_exception_id_ref"));
//! ```

mod affinity;
mod column;
mod domain;
mod error;
mod schema;
mod table;
mod vault;
mod view;

pub use affinity::{AffinityGroup, LifecycleFunctions, LifecycleOperation, RoutineName};
pub use column::{Column, ColumnOptions, ColumnType, ForeignKey};
pub use domain::{Domain, DomainKind, IDENTITY_BASE_TYPE, IDENTITY_DEFAULT_EXPR};
pub use error::{ModelError, Result, validate_identifier};
pub use schema::{Extension, Schema};
pub use table::{Table, TableColumns, TableName, UniqueConstraint};
pub use vault::{
    AUDIT_COLUMNS, BusinessKey, HubOptions, HubTable, LinkOptions, LinkTable, SatelliteOptions,
    SatelliteParent, SatelliteTable, VaultTable, content_hash_domain, hub_id_domain,
    link_id_domain, loaded_at_domain, loaded_by_domain, ltree_business_key_domain,
    provenance_uri_domain, satellite_id_domain, telemetry_metric_int_value_domain,
    telemetry_metric_labels_domain, telemetry_metric_real_value_domain, text_business_key_domain,
    uri_business_key_domain,
};
pub use view::View;
