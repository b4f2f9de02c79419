//! Exception and telemetry housekeeping vault.
//!
//! Hubs: `exception`, `telemetry_span`, `telemetry_metric`. Satellites:
//! `exception_diagnostics` and `exception_http_client` on the exception
//! hub; counter, gauge and info instances on the metric hub. Links:
//! `exception_span` and `exception_metric`. Every table gets storage and
//! destroy procedures; the `housekeeping` group ties them together with a
//! construct, a destroy and a pgTAP test routine.

use std::rc::Rc;

use vaultgen_core::{
    AffinityGroup, BusinessKey, Column, ColumnOptions, Domain, HubOptions, HubTable, LinkOptions,
    LinkTable, SatelliteOptions, SatelliteTable, Schema, TableColumns, VaultTable, View,
    ltree_business_key_domain, telemetry_metric_int_value_domain, telemetry_metric_labels_domain,
    telemetry_metric_real_value_domain, text_business_key_domain,
};
use vaultgen_engine::{
    InterpolationContext, ModuleExecution, Rendered, Result, SearchPath, SqlModule, StateOptions,
};

use super::{LIB_SCHEMA, call, procedure, table_procedures};

pub struct Housekeeping;

impl SqlModule for Housekeeping {
    fn identity(&self) -> &str {
        "lib/housekeeping.sql"
    }

    fn render(&self, context: &InterpolationContext, execution: ModuleExecution) -> Result<Rendered> {
        let schema = context.schema(LIB_SCHEMA)?;
        let group = Rc::new(AffinityGroup::new("housekeeping")?);
        let vault = Vault::build(&schema, &group)?;
        let domains = context.claim_domains(&schema);
        let body = vault.render(&schema, &group, &domains);

        let state = context.prepare_state(
            execution,
            StateOptions {
                search_path: Some(SearchPath::new([LIB_SCHEMA, "public"])?),
                schema: Some(schema),
                affinity_group: Some(group),
                ..StateOptions::default()
            },
        );
        Ok(Rendered::new(body, state))
    }
}

struct Vault {
    exception: HubTable,
    diagnostics: SatelliteTable,
    http_client: SatelliteTable,
    span: HubTable,
    metric: HubTable,
    counter: SatelliteTable,
    gauge: SatelliteTable,
    info: SatelliteTable,
    exception_span: LinkTable,
    exception_metric: LinkTable,
    diagnostics_view: View,
    http_client_view: View,
}

/// Metric satellite: an optional value column followed by the labels.
fn metric_instance(
    schema: &Schema,
    metric: &HubTable,
    name: &str,
    value: Option<(Rc<Domain>, &str)>,
    options: SatelliteOptions,
) -> vaultgen_core::Result<SatelliteTable> {
    SatelliteTable::new(
        schema,
        metric,
        name,
        |table| {
            let mut columns = Vec::new();
            if let Some((domain, column)) = value {
                columns.push(
                    domain.table_column(table, ColumnOptions::named(column).with_not_null(true))?,
                );
            }
            columns.push(
                telemetry_metric_labels_domain(schema)?.table_column(table, ColumnOptions::default())?,
            );
            Ok(TableColumns::new(columns))
        },
        options,
    )
}

impl Vault {
    fn build(schema: &Schema, group: &Rc<AffinityGroup>) -> vaultgen_core::Result<Self> {
        let parent = Some(Rc::clone(group));
        let satellite_options = || SatelliteOptions {
            parent_affinity_group: parent.clone(),
            ..SatelliteOptions::default()
        };
        let hub_options = || HubOptions {
            parent_affinity_group: parent.clone(),
            ..HubOptions::default()
        };
        let link_options = || LinkOptions {
            parent_affinity_group: parent.clone(),
            ..LinkOptions::default()
        };

        let exception_key = text_business_key_domain(schema, "exception_hub_key", "key")?;
        let exception = HubTable::new(
            schema,
            "exception",
            vec![BusinessKey::new(exception_key)],
            hub_options(),
        )?;

        let diagnostics = SatelliteTable::new(
            schema,
            &exception,
            "exception_diagnostics",
            |table| {
                let columns = [
                    "message",
                    "err_returned_sqlstate",
                    "err_pg_exception_detail",
                    "err_pg_exception_hint",
                    "err_pg_exception_context",
                ]
                .into_iter()
                .map(|name| Column::inline(table, name, "text"))
                .collect::<vaultgen_core::Result<Vec<_>>>()?;
                Ok(TableColumns::new(columns))
            },
            satellite_options(),
        )?;

        let http_client = SatelliteTable::new(
            schema,
            &exception,
            "exception_http_client",
            |table| {
                Ok(TableColumns::new(vec![
                    Column::inline(table, "http_req", "jsonb")?,
                    Column::inline(table, "http_resp", "jsonb")?,
                ]))
            },
            satellite_options(),
        )?;

        let span_key = schema.use_domain("telemetry_span_id", |name, schema| {
            Ok(Domain::new(schema, name, "text")?
                .with_default_column_name("span_id")?
                .not_null())
        })?;
        let span = HubTable::new(
            schema,
            "telemetry_span",
            vec![BusinessKey::new(span_key)],
            hub_options(),
        )?;

        let metric_key = ltree_business_key_domain(schema, "metric_key", "metric_key")?;
        let metric = HubTable::new(
            schema,
            "telemetry_metric",
            vec![BusinessKey::new(metric_key)],
            hub_options(),
        )?;
        let counter = metric_instance(
            schema,
            &metric,
            "telemetry_metric_counter",
            Some((telemetry_metric_int_value_domain(schema)?, "total")),
            satellite_options(),
        )?;
        let gauge = metric_instance(
            schema,
            &metric,
            "telemetry_metric_gauge",
            Some((telemetry_metric_real_value_domain(schema)?, "value")),
            satellite_options(),
        )?;
        let info = metric_instance(schema, &metric, "telemetry_metric_info", None, satellite_options())?;

        let exception_span =
            LinkTable::new(schema, "exception_span", &[&exception, &span], link_options())?;
        let exception_metric =
            LinkTable::new(schema, "exception_metric", &[&exception, &metric], link_options())?;

        let diagnostics_view = diagnostics.parent_join_view(schema, "exception_diagnostics")?;
        let http_client_view = http_client.parent_join_view(schema, "exception_http_client")?;

        Ok(Self {
            exception,
            diagnostics,
            http_client,
            span,
            metric,
            counter,
            gauge,
            info,
            exception_span,
            exception_metric,
            diagnostics_view,
            http_client_view,
        })
    }

    /// Tables in dependency order: parents before children.
    fn tables(&self) -> [&dyn VaultTable; 10] {
        [
            &self.exception,
            &self.span,
            &self.metric,
            &self.diagnostics,
            &self.http_client,
            &self.counter,
            &self.gauge,
            &self.info,
            &self.exception_span,
            &self.exception_metric,
        ]
    }

    fn views(&self) -> [&View; 2] {
        [&self.diagnostics_view, &self.http_client_view]
    }

    /// `domains` are the ones this module emits; earlier modules of the run
    /// already created the rest.
    fn render(&self, schema: &Schema, group: &AffinityGroup, domains: &[Rc<Domain>]) -> String {
        let fns = group.lifecycle_functions();
        let mut sections: Vec<String> = domains.iter().map(|d| d.create_sql()).collect();
        sections.extend(self.tables().iter().map(|t| table_procedures(schema, *t)));

        let mut construct: Vec<String> = self
            .tables()
            .iter()
            .map(|t| call(&t.lifecycle_functions().construct_storage().in_schema(schema)))
            .collect();
        construct.extend(self.views().iter().map(|v| v.create_sql()));
        sections.push(procedure(&fns.construct_idempotent().in_schema(schema), &construct));

        let mut destroy: Vec<String> = self.views().iter().map(|v| v.drop_sql()).collect();
        destroy.extend(
            self.tables()
                .iter()
                .rev()
                .map(|t| call(&t.lifecycle_functions().destroy_idempotent().in_schema(schema))),
        );
        sections.push(procedure(&fns.destroy_idempotent().in_schema(schema), &destroy));

        sections.push(self.unit_test(schema, group));
        sections.join("\n\n")
    }

    /// pgTAP checks for every table and view.
    fn unit_test(&self, schema: &Schema, group: &AffinityGroup) -> String {
        let mut checks: Vec<String> = self
            .tables()
            .iter()
            .map(|t| {
                let name = t.table().name();
                format!(
                    "    RETURN NEXT has_table('{}', '{name}', '{name} should exist');",
                    schema.name()
                )
            })
            .collect();
        checks.extend(self.views().iter().map(|v| {
            let view = v.name();
            format!(
                "    RETURN NEXT has_view('{}', '{view}', '{view} should exist');",
                schema.name()
            )
        }));
        format!(
            "CREATE OR REPLACE FUNCTION {}() RETURNS SETOF TEXT LANGUAGE plpgsql AS $$\nBEGIN\n{}\nEND;\n$$;",
            group.lifecycle_functions().unit_test().in_schema(schema),
            checks.join("\n")
        )
    }
}
