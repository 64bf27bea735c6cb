//! hep-featurespec - Command-line entry point
//!
//! Validates persisted task configs, builds them from name-based specs and
//! inspects the branch registry.

use anyhow::{bail, Context};
use hep_featurespec::{
    config::{LoggingSettings, Settings, TaskConfig, TaskSpec},
    registry::{self, BranchRegistry},
    types::format_shape,
    Branch,
};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const USAGE: &str = "\
Usage: hep-featurespec <command> [args]

Commands:
  validate <task.json>             Load a task config and print its feature sizes
  build <spec.toml|spec.json> <out.json>
                                   Build a task config from branch names and save it
  branch <name>...                 Resolve branch names and print their metadata
  categories                       List branch index categories";

fn init_logging(settings: &LoggingSettings) -> Option<WorkerGuard> {
    let (file_layer, guard) = match &settings.log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            match (path.file_name(), std::fs::create_dir_all(dir)) {
                (Some(file_name), Ok(())) => {
                    let appender = tracing_appender::rolling::never(dir, file_name);
                    let (writer, guard) = tracing_appender::non_blocking(appender);
                    let layer = tracing_subscriber::fmt::layer()
                        .with_writer(writer)
                        .with_ansi(false);
                    (Some(layer), Some(guard))
                }
                _ => {
                    eprintln!("Cannot open log file {:?}, logging to stderr only", path);
                    (None, None)
                }
            }
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.filter)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    guard
}

fn main() -> anyhow::Result<()> {
    let settings = Settings::load_or_default();
    let _log_guard = init_logging(&settings.logging);

    let registry = registry::install(BranchRegistry::load(&settings.registry))?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("validate") => match args.get(1) {
            Some(path) => validate(path),
            None => usage_error("validate needs a task config path"),
        },
        Some("build") => match (args.get(1), args.get(2)) {
            (Some(spec), Some(out)) => build(spec, out),
            _ => usage_error("build needs a spec path and an output path"),
        },
        Some("branch") if args.len() > 1 => {
            show_branches(registry, &args[1..]);
            Ok(())
        }
        Some("branch") => usage_error("branch needs at least one name"),
        Some("categories") => list_categories(registry),
        Some("-h" | "--help" | "help") => {
            println!("{}", USAGE);
            Ok(())
        }
        Some(other) => usage_error(&format!("unknown command '{}'", other)),
        None => usage_error("missing command"),
    }
}

fn usage_error(message: &str) -> anyhow::Result<()> {
    eprintln!("{}\n", USAGE);
    bail!("{}", message)
}

fn print_summary(config: &TaskConfig) {
    println!("{}", config);
    println!("  event filters: {}", config.event_filters().len());
    for filter in config.event_filters() {
        println!("    {}", filter);
    }
    println!(
        "  {}: {} features",
        config.input().name(),
        config.input_size()
    );
    for (label, size) in config.labels().iter().zip(config.label_sizes()) {
        println!("  {}: {} features", label.name(), size);
    }
}

fn validate(path: &str) -> anyhow::Result<()> {
    let config =
        TaskConfig::load(path).with_context(|| format!("Task config {} is not valid", path))?;
    print_summary(&config);
    Ok(())
}

fn build(spec_path: &str, out_path: &str) -> anyhow::Result<()> {
    let spec = TaskSpec::load(spec_path)
        .with_context(|| format!("Failed to read task spec {}", spec_path))?;
    let config = TaskConfig::from_spec(&spec).context("Failed to build task config")?;
    config
        .save(out_path)
        .with_context(|| format!("Failed to save task config to {}", out_path))?;
    print_summary(&config);
    println!("Saved to {}", out_path);
    Ok(())
}

fn show_branches(registry: &BranchRegistry, names: &[String]) {
    for name in names {
        match Branch::resolve(name, registry) {
            Ok(branch) => println!(
                "{}\tkind={}\tshape={}\tdtype={}\torigin={}",
                branch.name(),
                branch.kind(),
                branch.shape().map(format_shape).unwrap_or_default(),
                branch.dtype().unwrap_or("-"),
                branch.origin()
            ),
            Err(e) => println!("{}\terror: {}", name, e),
        }
    }
}

fn list_categories(registry: &BranchRegistry) -> anyhow::Result<()> {
    let Some(index) = registry.index().filter(|_| registry.is_available()) else {
        bail!("Branch index is not available");
    };

    if let Some(info) = index.generation_info() {
        println!("generation_info: {}", info);
    }
    for category in index.categories() {
        println!("{}\t{}", category, index.features(category).count());
    }
    Ok(())
}
