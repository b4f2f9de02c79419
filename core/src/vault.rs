//! Data Vault 2.0 Hub, Link and Satellite table builders.
//!
//! Every vault table has the same skeleton: a generated identity column
//! first, the kind-specific columns next, and the three audit columns
//! (`loaded_at`, `loaded_by`, `provenance`) last. The column order is
//! deterministic and is the order in which the DDL is emitted.
//!
//! - A [`HubTable`] holds one row per unique business key; its uniqueness
//!   constraint covers exactly the business-key columns.
//! - A [`LinkTable`] relates N hubs; it has one non-nullable foreign key per
//!   hub and its uniqueness constraint covers exactly those columns.
//! - A [`SatelliteTable`] describes a hub or link over time; it references
//!   its parent's identity and carries caller-supplied organic columns whose
//!   supplier also decides the uniqueness constraints.
//!
//! Each builder registers the domains it needs in the [`Schema`], so
//! building two tables that share a domain reuses a single definition.
//!
//! Ref: <https://www.sciencedirect.com/topics/computer-science/data-vault-model>

use std::rc::Rc;

use crate::affinity::{AffinityGroup, LifecycleFunctions};
use crate::column::{Column, ColumnOptions, ForeignKey};
use crate::domain::Domain;
use crate::error::{ModelError, Result};
use crate::schema::Schema;
use crate::table::{Table, TableColumns, TableName, UniqueConstraint};
use crate::view::View;

/// Default names of the audit columns, in emission order.
pub const AUDIT_COLUMNS: [&str; 3] = ["loaded_at", "loaded_by", "provenance"];

/// `timestamptz` stamped with the load time.
pub fn loaded_at_domain(schema: &Schema) -> Result<Rc<Domain>> {
    schema.use_domain("loaded_at_timestamptz", |name, schema| {
        Ok(Domain::new(schema, name, "timestamptz")?
            .with_default_column_name("loaded_at")?
            .with_default_expr("current_timestamp"))
    })
}

/// Database user that loaded the row.
pub fn loaded_by_domain(schema: &Schema) -> Result<Rc<Domain>> {
    schema.use_domain("loaded_by_db_user_name", |name, schema| {
        Ok(Domain::new(schema, name, "name")?
            .with_default_column_name("loaded_by")?
            .with_default_expr("current_user"))
    })
}

/// URI describing where a row came from.
pub fn provenance_uri_domain(schema: &Schema) -> Result<Rc<Domain>> {
    schema.use_domain("provenance_uri", |name, schema| {
        Ok(Domain::new(schema, name, "text")?
            .with_default_column_name("provenance")?
            .with_default_expr("'system://'"))
    })
}

/// Required content hash.
pub fn content_hash_domain(schema: &Schema) -> Result<Rc<Domain>> {
    schema.use_domain("content_hash", |name, schema| {
        Ok(Domain::new(schema, name, "text")?.not_null())
    })
}

/// Metric labels as a JSON object.
pub fn telemetry_metric_labels_domain(schema: &Schema) -> Result<Rc<Domain>> {
    schema.use_domain("telemetry_metric_labels", |name, schema| {
        Domain::new(schema, name, "jsonb")?.with_default_column_name("labels")
    })
}

pub fn telemetry_metric_int_value_domain(schema: &Schema) -> Result<Rc<Domain>> {
    schema.use_domain("telemetry_metric_int_value", |name, schema| {
        Ok(Domain::new(schema, name, "integer")?.not_null())
    })
}

pub fn telemetry_metric_real_value_domain(schema: &Schema) -> Result<Rc<Domain>> {
    schema.use_domain("telemetry_metric_real_value", |name, schema| {
        Ok(Domain::new(schema, name, "real")?.not_null())
    })
}

pub fn hub_id_domain(schema: &Schema, hub_name: &str) -> Result<Rc<Domain>> {
    schema.use_domain(&format!("hub_{hub_name}_id"), |name, schema| {
        Domain::identity(schema, name, "hub_id")
    })
}

pub fn link_id_domain(schema: &Schema, link_name: &str) -> Result<Rc<Domain>> {
    schema.use_domain(&format!("link_{link_name}_id"), |name, schema| {
        Domain::identity(schema, name, "link_id")
    })
}

pub fn satellite_id_domain(schema: &Schema, satellite_name: &str) -> Result<Rc<Domain>> {
    schema.use_domain(&format!("sat_{satellite_name}_id"), |name, schema| {
        Domain::identity(schema, name, "sat_id")
    })
}

/// Required free-text business key.
pub fn text_business_key_domain(schema: &Schema, name: &str, column: &str) -> Result<Rc<Domain>> {
    schema.use_domain(name, |name, schema| {
        Ok(Domain::new(schema, name, "text")?
            .with_default_column_name(column)?
            .not_null())
    })
}

/// Required URI business key.
// TODO: add a CHECK constraint validating URI syntax once domains carry checks.
pub fn uri_business_key_domain(schema: &Schema, name: &str, column: &str) -> Result<Rc<Domain>> {
    schema.use_domain(name, |name, schema| {
        Ok(Domain::new(schema, name, "text")?
            .with_default_column_name(column)?
            .not_null())
    })
}

/// Required hierarchical (`ltree`) business key.
pub fn ltree_business_key_domain(schema: &Schema, name: &str, column: &str) -> Result<Rc<Domain>> {
    schema.use_domain(name, |name, schema| {
        Ok(Domain::new(schema, name, "ltree")?
            .with_default_column_name(column)?
            .not_null())
    })
}

/// One business-key column of a hub.
#[derive(Debug, Clone)]
pub struct BusinessKey {
    pub domain: Rc<Domain>,
    /// Overrides the domain's default column name.
    pub column_name: Option<String>,
}

impl BusinessKey {
    pub fn new(domain: Rc<Domain>) -> Self {
        Self {
            domain,
            column_name: None,
        }
    }

    pub fn named(domain: Rc<Domain>, column_name: impl Into<String>) -> Self {
        Self {
            domain,
            column_name: Some(column_name.into()),
        }
    }
}

/// Overrides for [`HubTable::new`]. `None` means "derive from the hub name".
#[derive(Debug, Clone, Default)]
pub struct HubOptions {
    pub hub_id_domain: Option<Rc<Domain>>,
    pub provenance_domain: Option<Rc<Domain>>,
    pub parent_affinity_group: Option<Rc<AffinityGroup>>,
}

/// Overrides for [`LinkTable::new`].
#[derive(Debug, Clone, Default)]
pub struct LinkOptions {
    pub link_id_domain: Option<Rc<Domain>>,
    pub provenance_domain: Option<Rc<Domain>>,
    pub parent_affinity_group: Option<Rc<AffinityGroup>>,
}

/// Overrides for [`SatelliteTable::new`]. The provenance domain defaults to
/// the parent's.
#[derive(Debug, Clone, Default)]
pub struct SatelliteOptions {
    pub satellite_id_domain: Option<Rc<Domain>>,
    pub provenance_domain: Option<Rc<Domain>>,
    pub parent_affinity_group: Option<Rc<AffinityGroup>>,
}

/// Behavior shared by hubs, links and satellites.
pub trait VaultTable {
    fn table(&self) -> &Table;

    /// Domain of this table's identity column.
    fn identity_domain(&self) -> &Rc<Domain>;

    /// Domain used by columns referencing this table's identity.
    fn identity_reference_domain(&self) -> &Rc<Domain>;

    fn provenance_domain(&self) -> &Rc<Domain>;

    fn affinity_group(&self) -> &Rc<AffinityGroup>;

    /// Columns that identify a row from the business point of view.
    fn business_key_columns(&self) -> Vec<&Column>;

    /// The identity column, always first.
    fn identity_column(&self) -> &Column {
        &self.table().columns()[0]
    }

    /// The audit columns, always last.
    fn audit_columns(&self) -> &[Column] {
        let columns = self.table().columns();
        &columns[columns.len() - AUDIT_COLUMNS.len()..]
    }

    fn lifecycle_functions(&self) -> LifecycleFunctions {
        self.affinity_group().lifecycle_functions()
    }

    fn create_sql(&self) -> String {
        self.table().create_sql()
    }

    fn drop_sql(&self) -> String {
        self.table().drop_sql()
    }
}

/// Identity, reference and provenance domains plus the affinity group every
/// vault table resolves before building columns.
struct Skeleton {
    name: TableName,
    identity_domain: Rc<Domain>,
    reference_domain: Rc<Domain>,
    provenance_domain: Rc<Domain>,
    affinity_group: Rc<AffinityGroup>,
}

impl Skeleton {
    fn resolve(
        schema: &Schema,
        table_name: &str,
        identity_domain: Rc<Domain>,
        provenance_domain: Option<Rc<Domain>>,
        parent_group: Option<&Rc<AffinityGroup>>,
    ) -> Result<Self> {
        let name = TableName::new(schema, table_name)?;
        let reference_domain = schema.define_domain(identity_domain.reference_domain())?;
        let provenance_domain = match provenance_domain {
            Some(domain) => domain,
            None => provenance_uri_domain(schema)?,
        };
        let affinity_group = Rc::new(AffinityGroup::with_parent(table_name, parent_group)?);
        Ok(Self {
            name,
            identity_domain,
            reference_domain,
            provenance_domain,
            affinity_group,
        })
    }

    fn identity_column(&self) -> Result<Column> {
        self.identity_domain
            .table_column(&self.name, ColumnOptions::default())
    }

    fn audit_columns(&self, schema: &Schema) -> Result<Vec<Column>> {
        Ok(vec![
            loaded_at_domain(schema)?.table_column(&self.name, ColumnOptions::default())?,
            loaded_by_domain(schema)?.table_column(&self.name, ColumnOptions::default())?,
            self.provenance_domain
                .table_column(&self.name, ColumnOptions::default())?,
        ])
    }

    /// Non-nullable column referencing `parent`'s identity.
    fn reference_column(
        &self,
        parent: &dyn VaultTable,
        column_name: Option<String>,
    ) -> Result<Column> {
        let options = ColumnOptions {
            column_name,
            ..ColumnOptions::default()
        }
        .with_not_null(true)
        .with_foreign_key(ForeignKey::new(
            parent.table().table_name(),
            parent.identity_column(),
        ));
        parent
            .identity_reference_domain()
            .table_column(&self.name, options)
    }
}

/// A hub: unique business keys of one business concept.
#[derive(Debug, Clone)]
pub struct HubTable {
    hub_name: String,
    table: Table,
    key_count: usize,
    identity_domain: Rc<Domain>,
    reference_domain: Rc<Domain>,
    provenance_domain: Rc<Domain>,
    affinity_group: Rc<AffinityGroup>,
}

impl HubTable {
    /// Builds `hub_<hub_name>` with the given business keys.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::EmptyBusinessKeys`] when `keys` is empty,
    /// [`ModelError::DuplicateColumn`] when a key collides with the identity
    /// or audit columns, and propagates domain and naming errors.
    ///
    /// # Examples
    ///
    /// ```
    /// use vaultgen_core::{BusinessKey, HubOptions, HubTable, Schema, VaultTable,
    ///     text_business_key_domain};
    ///
    /// let schema = Schema::new("lib").unwrap();
    /// let key = text_business_key_domain(&schema, "exception_hub_key", "key").unwrap();
    /// let hub = HubTable::new(&schema, "exception", vec![BusinessKey::new(key)],
    ///     HubOptions::default()).unwrap();
    ///
    /// assert_eq!(hub.table().name(), "hub_exception");
    /// assert_eq!(
    ///     hub.table().column_names(),
    ///     vec!["hub_id", "key", "loaded_at", "loaded_by", "provenance"]
    /// );
    /// ```
    pub fn new(
        schema: &Schema,
        hub_name: &str,
        keys: Vec<BusinessKey>,
        options: HubOptions,
    ) -> Result<Self> {
        let table_name = format!("hub_{hub_name}");
        if keys.is_empty() {
            return Err(ModelError::EmptyBusinessKeys(table_name));
        }
        let identity_domain = match options.hub_id_domain {
            Some(domain) => domain,
            None => hub_id_domain(schema, hub_name)?,
        };
        let skeleton = Skeleton::resolve(
            schema,
            &table_name,
            identity_domain,
            options.provenance_domain,
            options.parent_affinity_group.as_ref(),
        )?;

        let key_columns = keys
            .into_iter()
            .map(|key| {
                key.domain.table_column(
                    &skeleton.name,
                    ColumnOptions {
                        column_name: key.column_name,
                        ..ColumnOptions::default()
                    },
                )
            })
            .collect::<Result<Vec<_>>>()?;
        let key_refs: Vec<&Column> = key_columns.iter().collect();
        let unique = UniqueConstraint::new(format!("{table_name}_unq"), &key_refs);
        let key_count = key_columns.len();

        let mut all = vec![skeleton.identity_column()?];
        all.extend(key_columns);
        all.extend(skeleton.audit_columns(schema)?);

        let table = Table::new(
            schema,
            skeleton.name,
            TableColumns {
                all,
                unique: vec![unique],
            },
        )?;

        Ok(Self {
            hub_name: hub_name.to_string(),
            table,
            key_count,
            identity_domain: skeleton.identity_domain,
            reference_domain: skeleton.reference_domain,
            provenance_domain: skeleton.provenance_domain,
            affinity_group: skeleton.affinity_group,
        })
    }

    /// Name without the `hub_` prefix.
    pub fn hub_name(&self) -> &str {
        &self.hub_name
    }
}

impl VaultTable for HubTable {
    fn table(&self) -> &Table {
        &self.table
    }

    fn identity_domain(&self) -> &Rc<Domain> {
        &self.identity_domain
    }

    fn identity_reference_domain(&self) -> &Rc<Domain> {
        &self.reference_domain
    }

    fn provenance_domain(&self) -> &Rc<Domain> {
        &self.provenance_domain
    }

    fn affinity_group(&self) -> &Rc<AffinityGroup> {
        &self.affinity_group
    }

    fn business_key_columns(&self) -> Vec<&Column> {
        self.table.columns()[1..=self.key_count].iter().collect()
    }
}

/// A link: an N-ary relationship between hubs.
#[derive(Debug, Clone)]
pub struct LinkTable {
    link_name: String,
    table: Table,
    hub_names: Vec<String>,
    identity_domain: Rc<Domain>,
    reference_domain: Rc<Domain>,
    provenance_domain: Rc<Domain>,
    affinity_group: Rc<AffinityGroup>,
}

impl LinkTable {
    /// Builds `link_<link_name>` with one `<hub>_hub_id` column per hub.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::EmptyLink`] when `hubs` is empty and
    /// [`ModelError::DuplicateColumn`] when the same hub appears twice.
    pub fn new(
        schema: &Schema,
        link_name: &str,
        hubs: &[&HubTable],
        options: LinkOptions,
    ) -> Result<Self> {
        let table_name = format!("link_{link_name}");
        if hubs.is_empty() {
            return Err(ModelError::EmptyLink(table_name));
        }
        let identity_domain = match options.link_id_domain {
            Some(domain) => domain,
            None => link_id_domain(schema, link_name)?,
        };
        let skeleton = Skeleton::resolve(
            schema,
            &table_name,
            identity_domain,
            options.provenance_domain,
            options.parent_affinity_group.as_ref(),
        )?;

        let hub_columns = hubs
            .iter()
            .map(|hub| {
                skeleton.reference_column(*hub, Some(format!("{}_hub_id", hub.hub_name())))
            })
            .collect::<Result<Vec<_>>>()?;
        let hub_refs: Vec<&Column> = hub_columns.iter().collect();
        let unique = UniqueConstraint::new(format!("{table_name}_unq"), &hub_refs);

        let mut all = vec![skeleton.identity_column()?];
        all.extend(hub_columns);
        all.extend(skeleton.audit_columns(schema)?);

        let table = Table::new(
            schema,
            skeleton.name,
            TableColumns {
                all,
                unique: vec![unique],
            },
        )?;

        Ok(Self {
            link_name: link_name.to_string(),
            table,
            hub_names: hubs.iter().map(|h| h.hub_name().to_string()).collect(),
            identity_domain: skeleton.identity_domain,
            reference_domain: skeleton.reference_domain,
            provenance_domain: skeleton.provenance_domain,
            affinity_group: skeleton.affinity_group,
        })
    }

    /// Name without the `link_` prefix.
    pub fn link_name(&self) -> &str {
        &self.link_name
    }

    /// Linked hub names, in column order.
    pub fn hub_names(&self) -> &[String] {
        &self.hub_names
    }

    /// The foreign-key columns, one per hub.
    pub fn hub_columns(&self) -> &[Column] {
        &self.table.columns()[1..=self.hub_names.len()]
    }
}

impl VaultTable for LinkTable {
    fn table(&self) -> &Table {
        &self.table
    }

    fn identity_domain(&self) -> &Rc<Domain> {
        &self.identity_domain
    }

    fn identity_reference_domain(&self) -> &Rc<Domain> {
        &self.reference_domain
    }

    fn provenance_domain(&self) -> &Rc<Domain> {
        &self.provenance_domain
    }

    fn affinity_group(&self) -> &Rc<AffinityGroup> {
        &self.affinity_group
    }

    fn business_key_columns(&self) -> Vec<&Column> {
        self.hub_columns().iter().collect()
    }
}

/// The hub or link a satellite describes.
///
/// Satellites never hang off other satellites:
///
/// ```compile_fail
/// use vaultgen_core::{SatelliteParent, SatelliteTable};
///
/// fn nest(sat: &SatelliteTable) -> SatelliteParent<'_> {
///     sat.into()
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub enum SatelliteParent<'a> {
    Hub(&'a HubTable),
    Link(&'a LinkTable),
}

impl<'a> SatelliteParent<'a> {
    pub fn table(self) -> &'a dyn VaultTable {
        match self {
            SatelliteParent::Hub(hub) => hub,
            SatelliteParent::Link(link) => link,
        }
    }
}

impl<'a> From<&'a HubTable> for SatelliteParent<'a> {
    fn from(hub: &'a HubTable) -> Self {
        SatelliteParent::Hub(hub)
    }
}

impl<'a> From<&'a LinkTable> for SatelliteParent<'a> {
    fn from(link: &'a LinkTable) -> Self {
        SatelliteParent::Link(link)
    }
}

/// A satellite: descriptive, time-versioned attributes of a hub or link.
#[derive(Debug, Clone)]
pub struct SatelliteTable {
    satellite_name: String,
    table: Table,
    attribute_count: usize,
    parent_table: TableName,
    parent_identity_column: String,
    parent_key_columns: Vec<String>,
    identity_domain: Rc<Domain>,
    reference_domain: Rc<Domain>,
    provenance_domain: Rc<Domain>,
    affinity_group: Rc<AffinityGroup>,
}

impl SatelliteTable {
    /// Builds `sat_<satellite_name>` under `parent`, a [`HubTable`] or a
    /// [`LinkTable`].
    ///
    /// `organic_columns` receives the satellite's table name and returns the
    /// attribute columns together with the satellite's unique constraints.
    ///
    /// # Errors
    ///
    /// Propagates errors from `organic_columns`, and returns
    /// [`ModelError::DuplicateColumn`] when an organic column collides with
    /// the identity, parent or audit columns.
    pub fn new<'p, P, F>(
        schema: &Schema,
        parent: P,
        satellite_name: &str,
        organic_columns: F,
        options: SatelliteOptions,
    ) -> Result<Self>
    where
        P: Into<SatelliteParent<'p>>,
        F: FnOnce(&TableName) -> Result<TableColumns>,
    {
        let parent = parent.into().table();
        let table_name = format!("sat_{satellite_name}");
        let identity_domain = match options.satellite_id_domain {
            Some(domain) => domain,
            None => satellite_id_domain(schema, satellite_name)?,
        };
        let provenance_domain = options
            .provenance_domain
            .unwrap_or_else(|| Rc::clone(parent.provenance_domain()));
        let skeleton = Skeleton::resolve(
            schema,
            &table_name,
            identity_domain,
            Some(provenance_domain),
            options.parent_affinity_group.as_ref(),
        )?;

        let parent_column = skeleton.reference_column(parent, None)?;
        let attributes = organic_columns(&skeleton.name)?;
        let attribute_count = attributes.all.len();

        let mut all = vec![skeleton.identity_column()?, parent_column];
        all.extend(attributes.all);
        all.extend(skeleton.audit_columns(schema)?);

        let table = Table::new(
            schema,
            skeleton.name,
            TableColumns {
                all,
                unique: attributes.unique,
            },
        )?;

        Ok(Self {
            satellite_name: satellite_name.to_string(),
            table,
            attribute_count,
            parent_table: parent.table().table_name().clone(),
            parent_identity_column: parent.identity_column().name().to_string(),
            parent_key_columns: parent
                .business_key_columns()
                .iter()
                .map(|c| c.name().to_string())
                .collect(),
            identity_domain: skeleton.identity_domain,
            reference_domain: skeleton.reference_domain,
            provenance_domain: skeleton.provenance_domain,
            affinity_group: skeleton.affinity_group,
        })
    }

    /// Name without the `sat_` prefix.
    pub fn satellite_name(&self) -> &str {
        &self.satellite_name
    }

    pub fn parent_table(&self) -> &TableName {
        &self.parent_table
    }

    /// The non-nullable column referencing the parent's identity.
    pub fn parent_column(&self) -> &Column {
        &self.table.columns()[1]
    }

    /// Caller-supplied organic columns, in declared order.
    pub fn attribute_columns(&self) -> &[Column] {
        &self.table.columns()[2..2 + self.attribute_count]
    }

    /// A view joining the parent's business keys with this satellite's
    /// organic attributes.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::DuplicateView`] if `view_name` is already taken.
    pub fn parent_join_view(&self, schema: &Schema, view_name: &str) -> Result<View> {
        let projection: Vec<String> = self
            .parent_key_columns
            .iter()
            .map(|c| format!("parent.{c}"))
            .chain(self.attribute_columns().iter().map(|c| format!("sat.{}", c.name())))
            .collect();
        let select = format!(
            "SELECT {}\n  FROM {} parent\n  JOIN {} sat ON parent.{} = sat.{}",
            projection.join(",\n       "),
            self.parent_table.qualified_name(),
            self.table.qualified_name(),
            self.parent_identity_column,
            self.parent_column().name()
        );
        View::new(schema, view_name, select)
    }
}

impl VaultTable for SatelliteTable {
    fn table(&self) -> &Table {
        &self.table
    }

    fn identity_domain(&self) -> &Rc<Domain> {
        &self.identity_domain
    }

    fn identity_reference_domain(&self) -> &Rc<Domain> {
        &self.reference_domain
    }

    fn provenance_domain(&self) -> &Rc<Domain> {
        &self.provenance_domain
    }

    fn affinity_group(&self) -> &Rc<AffinityGroup> {
        &self.affinity_group
    }

    fn business_key_columns(&self) -> Vec<&Column> {
        vec![self.parent_column()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hub(schema: &Schema, name: &str, keys: &[&str]) -> HubTable {
        let keys = keys
            .iter()
            .map(|k| {
                BusinessKey::new(text_business_key_domain(schema, &format!("{name}_{k}"), k).unwrap())
            })
            .collect();
        HubTable::new(schema, name, keys, HubOptions::default()).unwrap()
    }

    fn diagnostics(table: &TableName) -> Result<TableColumns> {
        Ok(TableColumns::new(vec![
            Column::inline(table, "message", "text")?,
            Column::inline(table, "err_returned_sqlstate", "text")?,
        ]))
    }

    #[test]
    fn test_hub_unique_constraint_is_exactly_the_keys() {
        let schema = Schema::new("lib").unwrap();
        let hub = hub(&schema, "account", &["k1", "k2"]);

        let unique = hub.table().unique_constraints();
        assert_eq!(unique.len(), 1);
        assert_eq!(unique[0].name, "hub_account_unq");
        assert_eq!(unique[0].columns, vec!["k1", "k2"]);
        let keys: Vec<&str> = hub.business_key_columns().iter().map(|c| c.name()).collect();
        assert_eq!(keys, vec!["k1", "k2"]);
    }

    #[test]
    fn test_hub_column_layout_for_any_key_count() {
        for count in 1..=5 {
            let schema = Schema::new("lib").unwrap();
            let keys: Vec<String> = (0..count).map(|i| format!("k{i}")).collect();
            let key_refs: Vec<&str> = keys.iter().map(String::as_str).collect();
            let hub = hub(&schema, "multi", &key_refs);

            let names = hub.table().column_names();
            assert_eq!(names.len(), count + 4);
            assert_eq!(names[0], "hub_id");
            assert_eq!(&names[names.len() - 3..], &AUDIT_COLUMNS);
            assert!(hub.identity_column().is_primary_key());
            assert_eq!(hub.audit_columns().len(), 3);
            assert_eq!(hub.table().unique_constraints()[0].columns, keys);
        }
    }

    #[test]
    fn test_hub_requires_keys() {
        let schema = Schema::new("lib").unwrap();
        let err = HubTable::new(&schema, "empty", Vec::new(), HubOptions::default()).unwrap_err();
        assert_eq!(err, ModelError::EmptyBusinessKeys("hub_empty".into()));
    }

    #[test]
    fn test_hub_key_colliding_with_audit_column_is_rejected() {
        let schema = Schema::new("lib").unwrap();
        let key = text_business_key_domain(&schema, "odd_key", "loaded_at").unwrap();
        let err = HubTable::new(&schema, "odd", vec![BusinessKey::new(key)], HubOptions::default())
            .unwrap_err();
        assert_eq!(
            err,
            ModelError::DuplicateColumn {
                table: "hub_odd".into(),
                column: "loaded_at".into()
            }
        );
    }

    #[test]
    fn test_hub_registers_shared_domains_once() {
        let schema = Schema::new("lib").unwrap();
        hub(&schema, "a", &["key"]);
        hub(&schema, "b", &["key"]);
        let names = schema.domain_names();
        let count = |n: &str| names.iter().filter(|x| *x == n).count();
        assert_eq!(count("loaded_at_timestamptz"), 1);
        assert_eq!(count("provenance_uri"), 1);
        assert!(schema.contains_domain("hub_a_id"));
        assert!(schema.contains_domain("hub_a_id_ref"));
        assert!(schema.contains_domain("hub_b_id_ref"));
    }

    #[test]
    fn test_link_over_three_hubs() {
        let schema = Schema::new("lib").unwrap();
        let a = hub(&schema, "a", &["key"]);
        let b = hub(&schema, "b", &["key"]);
        let c = hub(&schema, "c", &["key"]);
        let link = LinkTable::new(&schema, "abc", &[&a, &b, &c], LinkOptions::default()).unwrap();

        let fks = link.hub_columns();
        assert_eq!(fks.len(), 3);
        for (column, hub) in fks.iter().zip([&a, &b, &c]) {
            assert!(column.is_not_null());
            let fk = column.foreign_key().unwrap();
            assert_eq!(fk.table, *hub.table().table_name());
            assert_eq!(fk.column, "hub_id");
            assert_eq!(column.name(), format!("{}_hub_id", hub.hub_name()));
        }
        let unique = link.table().unique_constraints();
        assert_eq!(unique.len(), 1);
        assert_eq!(unique[0].columns, vec!["a_hub_id", "b_hub_id", "c_hub_id"]);
        assert_eq!(link.table().column_names()[0], "link_id");
        assert_eq!(link.hub_names(), &["a", "b", "c"]);
    }

    #[test]
    fn test_link_requires_hubs() {
        let schema = Schema::new("lib").unwrap();
        assert_eq!(
            LinkTable::new(&schema, "none", &[], LinkOptions::default()).unwrap_err(),
            ModelError::EmptyLink("link_none".into())
        );
    }

    #[test]
    fn test_link_rejects_same_hub_twice() {
        let schema = Schema::new("lib").unwrap();
        let a = hub(&schema, "a", &["key"]);
        assert!(matches!(
            LinkTable::new(&schema, "aa", &[&a, &a], LinkOptions::default()),
            Err(ModelError::DuplicateColumn { .. })
        ));
    }

    #[test]
    fn test_satellite_layout_and_parent_reference() {
        let schema = Schema::new("lib").unwrap();
        let exception = hub(&schema, "exception", &["key"]);
        let sat = SatelliteTable::new(
            &schema,
            &exception,
            "exception_diagnostics",
            diagnostics,
            SatelliteOptions::default(),
        )
        .unwrap();

        assert_eq!(
            sat.table().column_names(),
            vec![
                "sat_id",
                "hub_exception_id",
                "message",
                "err_returned_sqlstate",
                "loaded_at",
                "loaded_by",
                "provenance"
            ]
        );
        let parent = sat.parent_column();
        assert!(parent.is_not_null());
        assert_eq!(
            parent.foreign_key().unwrap().sql(),
            "REFERENCES lib.hub_exception(hub_id)"
        );
        assert!(Rc::ptr_eq(sat.provenance_domain(), exception.provenance_domain()));
        assert!(sat.table().unique_constraints().is_empty());
    }

    #[test]
    fn test_satellite_uses_organic_unique_constraints() {
        let schema = Schema::new("lib").unwrap();
        let metric = hub(&schema, "metric", &["metric_key"]);
        let sat = SatelliteTable::new(
            &schema,
            &metric,
            "metric_gauge",
            |table| {
                Ok(TableColumns::new(vec![Column::inline(table, "labels", "jsonb")?])
                    .with_unique("sat_metric_gauge_unq", &["hub_metric_id", "labels"]))
            },
            SatelliteOptions::default(),
        )
        .unwrap();
        assert_eq!(
            sat.table().unique_constraints()[0].columns,
            vec!["hub_metric_id", "labels"]
        );
    }

    #[test]
    fn test_satellite_of_link() {
        let schema = Schema::new("lib").unwrap();
        let a = hub(&schema, "a", &["key"]);
        let b = hub(&schema, "b", &["key"]);
        let link = LinkTable::new(&schema, "ab", &[&a, &b], LinkOptions::default()).unwrap();
        let sat = SatelliteTable::new(
            &schema,
            &link,
            "ab_notes",
            |table| Ok(TableColumns::new(vec![Column::inline(table, "note", "text")?])),
            SatelliteOptions::default(),
        )
        .unwrap();
        assert_eq!(sat.parent_column().name(), "link_ab_id");
        assert_eq!(sat.parent_column().foreign_key().unwrap().column, "link_id");
    }

    #[test]
    fn test_metric_domains() {
        let schema = Schema::new("lib").unwrap();
        let labels = telemetry_metric_labels_domain(&schema).unwrap();
        assert_eq!(labels.default_column_name(), "labels");
        assert!(!labels.is_not_null());
        assert!(telemetry_metric_int_value_domain(&schema).unwrap().is_not_null());
        assert_eq!(
            telemetry_metric_real_value_domain(&schema).unwrap().base_type(),
            "real"
        );
        assert!(Rc::ptr_eq(&labels, &telemetry_metric_labels_domain(&schema).unwrap()));
    }

    #[test]
    fn test_satellite_parent_kinds() {
        let schema = Schema::new("lib").unwrap();
        let a = hub(&schema, "a", &["key"]);
        let b = hub(&schema, "b", &["key"]);
        let link = LinkTable::new(&schema, "ab", &[&a, &b], LinkOptions::default()).unwrap();

        assert!(matches!(SatelliteParent::from(&a), SatelliteParent::Hub(_)));
        let parent = SatelliteParent::from(&link);
        assert!(matches!(parent, SatelliteParent::Link(_)));
        assert_eq!(parent.table().table().name(), "link_ab");
    }

    #[test]
    fn test_satellite_organic_collision_rejected() {
        let schema = Schema::new("lib").unwrap();
        let exception = hub(&schema, "exception", &["key"]);
        let result = SatelliteTable::new(
            &schema,
            &exception,
            "bad",
            |table| Ok(TableColumns::new(vec![Column::inline(table, "sat_id", "text")?])),
            SatelliteOptions::default(),
        );
        assert!(matches!(result, Err(ModelError::DuplicateColumn { .. })));
    }

    #[test]
    fn test_parent_join_view() {
        let schema = Schema::new("lib").unwrap();
        let exception = hub(&schema, "exception", &["key"]);
        let sat = SatelliteTable::new(
            &schema,
            &exception,
            "exception_diagnostics",
            diagnostics,
            SatelliteOptions::default(),
        )
        .unwrap();
        let view = sat.parent_join_view(&schema, "exception_diagnostics").unwrap();
        let sql = view.create_sql();
        assert!(sql.starts_with("CREATE OR REPLACE VIEW lib.exception_diagnostics AS"));
        assert!(sql.contains("parent.key"));
        assert!(sql.contains("sat.message"));
        assert!(sql.contains("FROM lib.hub_exception parent"));
        assert!(sql.contains("JOIN lib.sat_exception_diagnostics sat ON parent.hub_id = sat.hub_exception_id"));
    }

    #[test]
    fn test_nested_affinity_group_lifecycle() {
        let schema = Schema::new("lib").unwrap();
        let key = text_business_key_domain(&schema, "foo_key", "key").unwrap();
        let foo = HubTable::new(&schema, "foo", vec![BusinessKey::new(key)], HubOptions::default())
            .unwrap();
        let sat = SatelliteTable::new(
            &schema,
            &foo,
            "foo",
            |table| Ok(TableColumns::new(vec![Column::inline(table, "note", "text")?])),
            SatelliteOptions {
                parent_affinity_group: Some(Rc::clone(foo.affinity_group())),
                ..SatelliteOptions::default()
            },
        )
        .unwrap();
        assert_eq!(sat.affinity_group().qualified_name(), "hub_foo_sat_foo");
        assert_eq!(
            sat.lifecycle_functions().destroy_idempotent().name(),
            "hub_foo_sat_foo_destroy_idempotent"
        );
    }

    #[test]
    fn test_conflicting_reference_domain_aborts() {
        let schema = Schema::new("lib").unwrap();
        schema
            .define_domain(Domain::new(&schema, "hub_clash_id_ref", "text").unwrap())
            .unwrap();
        let key = text_business_key_domain(&schema, "clash_key", "key").unwrap();
        let err = HubTable::new(&schema, "clash", vec![BusinessKey::new(key)], HubOptions::default())
            .unwrap_err();
        assert!(matches!(err, ModelError::DomainConflict { .. }));
    }
}
