//! Schemas, extensions and shared audit domains every later module needs.
//!
//! Runs before any search path can be set, so it is exempt from the
//! search-path fallback.

use std::rc::Rc;

use vaultgen_core::{
    AffinityGroup, Extension, content_hash_domain, loaded_at_domain, loaded_by_domain,
    provenance_uri_domain,
};
use vaultgen_engine::{InterpolationContext, ModuleExecution, Rendered, Result, SqlModule, StateOptions};

use super::{CONTEXT_SCHEMA, LIB_SCHEMA, procedure};

pub struct Bootstrap;

impl SqlModule for Bootstrap {
    fn identity(&self) -> &str {
        "lib/bootstrap.sql"
    }

    fn render(&self, context: &InterpolationContext, execution: ModuleExecution) -> Result<Rendered> {
        let lib = context.schema(LIB_SCHEMA)?;
        let group = Rc::new(AffinityGroup::new("bootstrap")?);

        loaded_at_domain(&lib)?;
        loaded_by_domain(&lib)?;
        provenance_uri_domain(&lib)?;
        content_hash_domain(&lib)?;
        let domains = context.claim_domains(&lib);

        let mut sections = vec![context.schema(CONTEXT_SCHEMA)?.create_sql()];
        sections.extend(domains.iter().map(|d| d.create_sql()));
        sections.push(procedure(
            &group.lifecycle_functions().destroy_idempotent().in_schema(&lib),
            &domains.iter().rev().map(|d| d.drop_sql()).collect::<Vec<_>>(),
        ));

        let state = context.prepare_state(
            execution,
            StateOptions {
                extensions: vec![
                    Extension::new("pgcrypto")?,
                    Extension::new("ltree")?.in_schema(&lib),
                ],
                schema: Some(lib),
                create_schema: true,
                affinity_group: Some(group),
                search_path: None,
            },
        );
        Ok(Rendered::new(sections.join("\n\n"), state))
    }
}
