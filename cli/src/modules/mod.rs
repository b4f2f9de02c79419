//! Built-in generator modules, in emission order.

use vaultgen_core::{RoutineName, Schema, VaultTable};
use vaultgen_engine::SqlModule;

mod bootstrap;
mod housekeeping;

pub use bootstrap::Bootstrap;
pub use housekeeping::Housekeeping;

/// Schema holding generated library objects.
pub const LIB_SCHEMA: &str = "dcp_lib";

/// Schema holding per-tenant context objects.
pub const CONTEXT_SCHEMA: &str = "dcp_context";

pub fn builtin() -> Vec<Box<dyn SqlModule>> {
    vec![Box::new(Bootstrap), Box::new(Housekeeping)]
}

/// `CREATE OR REPLACE PROCEDURE` wrapping `statements`.
pub(crate) fn procedure(routine: &RoutineName, statements: &[String]) -> String {
    format!(
        "CREATE OR REPLACE PROCEDURE {}() AS $$\nBEGIN\n{}\nEND;\n$$ LANGUAGE PLPGSQL;",
        routine.qualified_name(),
        indent(&statements.join("\n"))
    )
}

/// Construct-storage and destroy-idempotent procedures for one table.
pub(crate) fn table_procedures(schema: &Schema, table: &dyn VaultTable) -> String {
    let fns = table.lifecycle_functions();
    format!(
        "{}\n\n{}",
        procedure(&fns.construct_storage().in_schema(schema), &[table.create_sql()]),
        procedure(&fns.destroy_idempotent().in_schema(schema), &[table.drop_sql()])
    )
}

pub(crate) fn call(routine: &RoutineName) -> String {
    format!("CALL {}();", routine.qualified_name())
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("    {line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
