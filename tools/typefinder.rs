//! Scan plugin directories and query loaded modules by capability
//!
//! Usage:
//!   typefinder --root ./plugins [--module <name>] [--capability "Handler<>"]

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use typefinder::module::registry::DiscoveredModule;
use typefinder::module::ModuleState;
use typefinder::utils::init_logging_from_config;
use typefinder::{Capability, HostRuntime, TypeFinder, TypeFinderConfig};

#[derive(Parser, Debug)]
#[command(name = "typefinder", version, about = "Discover plugin modules and query their types")]
struct Args {
    /// Configuration file (.toml or .json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Root directory to scan (repeatable)
    #[arg(long = "root")]
    roots: Vec<PathBuf>,

    /// Module to load by name regardless of the scan (repeatable)
    #[arg(long = "module")]
    modules: Vec<String>,

    /// Skip pattern (regex over module full names)
    #[arg(long)]
    skip: Option<String>,

    /// Restrict pattern (regex over module full names)
    #[arg(long)]
    restrict: Option<String>,

    /// Capability to query, e.g. "IHandler" or "Handler<>"
    #[arg(long)]
    capability: Option<String>,

    /// Include abstract classes in query results
    #[arg(long)]
    include_abstract: bool,

    /// Leave out modules that cannot be introspected instead of failing
    #[arg(long)]
    lenient: bool,

    /// Log filter (RUST_LOG takes precedence)
    #[arg(long)]
    log_filter: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => TypeFinderConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => TypeFinderConfig::default(),
    };
    apply_args(&mut config, &args);
    init_logging_from_config(Some(&config.logging));

    let mut runtime = HostRuntime::new();
    for root in &config.root_directories {
        runtime = runtime.with_probe_directory(root);
    }

    let finder = TypeFinder::new(config, Arc::new(runtime)).context("Invalid configuration")?;
    info!("Entry point: {}", finder.entry_point());

    let report = finder.load_matching_modules();
    for root in &report.bootstrapped {
        println!("bootstrapped {}", root.display());
    }
    for discovered in &report.discovered {
        println!("{}", describe(discovered));
    }

    let Some(capability) = &args.capability else {
        return Ok(());
    };
    let capability = Capability::parse(capability).context("Invalid capability")?;
    let matches = finder
        .find_classes_of_type(&capability, !args.include_abstract)
        .with_context(|| format!("Query for {} failed", capability))?;

    println!("{} match(es) for {}", matches.len(), capability);
    for descriptor in matches {
        println!("{}  ({})", descriptor.type_ref, descriptor.module);
    }
    Ok(())
}

fn apply_args(config: &mut TypeFinderConfig, args: &Args) {
    config.root_directories.extend(args.roots.iter().cloned());
    config.module_names.extend(args.modules.iter().cloned());
    if let Some(skip) = &args.skip {
        config.skip_pattern = skip.clone();
    }
    if let Some(restrict) = &args.restrict {
        config.restrict_pattern = restrict.clone();
    }
    if args.lenient {
        config.strict_introspection = false;
    }
    if let Some(filter) = &args.log_filter {
        config.logging.filter = Some(filter.clone());
    }
}

fn describe(discovered: &DiscoveredModule) -> String {
    let name = discovered
        .identity
        .as_ref()
        .map_or_else(|| "?".to_string(), |id| id.full_name());
    let state = match &discovered.state {
        ModuleState::Loaded => "loaded".to_string(),
        ModuleState::AlreadyLoaded => "already loaded".to_string(),
        ModuleState::Rejected => "rejected".to_string(),
        ModuleState::Failed(reason) => format!("failed: {}", reason),
    };
    format!("{:<16} {} [{}]", state, name, discovered.path.display())
}
