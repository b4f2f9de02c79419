use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;
use vaultgen_engine::{
    Controller, Emission, PackageVersion, RunConfig, StaticVersion, SystemHost, VersionResolver,
    output_name,
};

mod modules;

const TOOL_NAME: &str = "vaultctl";

#[derive(Debug, Parser)]
#[command(name = "vaultctl")]
#[command(about = "Generate idempotent, versioned Data Vault SQL artifacts")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Render every built-in module into numbered SQL artifacts.
    Interpolate(InterpolateArgs),
    /// Print the tool name and resolved version.
    Version(VersionArgs),
    /// List built-in modules in emission order.
    Modules(ModulesArgs),
}

#[derive(Debug, Args)]
struct InterpolateArgs {
    /// Directory receiving `NNN_<module>.auto.sql` files (default: stdout).
    #[arg(long)]
    dest: Option<PathBuf>,
    /// YAML run configuration; flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Compute and log artifact paths without creating directories or files.
    #[arg(long)]
    dry_run: bool,
    /// Log each artifact path.
    #[arg(long)]
    verbose: bool,
    /// Transaction id shared by the run (default: random UUID).
    #[arg(long)]
    tx_id: Option<String>,
    /// Version stamped into every artifact instead of the package version.
    #[arg(long)]
    version_override: Option<String>,
}

#[derive(Debug, Args)]
struct VersionArgs {
    /// Report this version instead of the package version.
    #[arg(long)]
    version_override: Option<String>,
}

#[derive(Debug, Args)]
struct ModulesArgs {
    /// Print JSON instead of plain text.
    #[arg(long)]
    json: bool,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Interpolate(args) => run_interpolate(args),
        Command::Version(args) => run_version(args),
        Command::Modules(args) => run_modules(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

/// Logs go to stderr; stdout carries SQL when no destination is set.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}

fn version_resolver(version_override: Option<String>) -> Box<dyn VersionResolver> {
    match version_override {
        Some(version) => Box::new(StaticVersion(version)),
        None => Box::new(PackageVersion),
    }
}

fn run_interpolate(args: InterpolateArgs) -> Result<(), String> {
    let mut config = match &args.config {
        Some(path) => RunConfig::load(path)
            .map_err(|e| format!("Failed to load config '{}': {e}", path.display()))?,
        None => RunConfig::default(),
    };
    if let Some(dest) = args.dest {
        config.dest_dir = Some(dest);
    }
    config.dry_run |= args.dry_run;
    config.verbose |= args.verbose;
    if let Some(tx_id) = args.tx_id {
        config.transaction_id = Some(tx_id);
    }
    if config.transaction_id.is_none() {
        config.transaction_id = Some(Uuid::new_v4().to_string());
    }

    init_tracing(config.is_verbose());

    let mut controller = Controller::new(config, version_resolver(args.version_override), &SystemHost)
        .map_err(|e| e.to_string())?;
    let summary = controller
        .run(&modules::builtin())
        .map_err(|e| e.to_string())?;

    let written = summary
        .artifacts
        .iter()
        .filter(|a| matches!(a.emission, Emission::File(_)))
        .count();
    if written > 0 {
        eprintln!(
            "Wrote {written} artifact(s) for transaction {}",
            summary.transaction_id
        );
    }
    Ok(())
}

fn run_version(args: VersionArgs) -> Result<(), String> {
    init_tracing(false);
    let version = version_resolver(args.version_override).resolve(TOOL_NAME);
    println!("{TOOL_NAME} {version}");
    Ok(())
}

fn run_modules(args: ModulesArgs) -> Result<(), String> {
    init_tracing(false);
    let modules = modules::builtin();
    if args.json {
        let entries: Vec<serde_json::Value> = modules
            .iter()
            .zip(1u32..)
            .map(|(module, index)| {
                serde_json::json!({
                    "index": index,
                    "identity": module.identity(),
                    "source": module.source(),
                    "output_name": output_name(index, module.identity()),
                })
            })
            .collect();
        let json = serde_json::to_string_pretty(&entries)
            .map_err(|e| format!("Failed to serialize modules: {e}"))?;
        println!("{json}");
    } else {
        for (module, index) in modules.iter().zip(1u32..) {
            println!("{index:03} {}", module.identity());
        }
    }
    Ok(())
}
