use anyhow::{Context, bail};
use clap::Parser;
use core::time::Duration;
use std::path::{Path, PathBuf};
use tally::{GeneratorConfig, GeneratorRegistry, RegistryConfig};

/// Runtime configuration for the `tally-stress` binary.
///
/// Every setting can come from a CLI flag or an environment variable (a `.env`
/// file is loaded first). The defaults run one caller per CPU against two
/// entities sharing the default collection.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "tally-stress",
    version,
    about = "Hammer tally sequences with concurrent callers and verify every id is unique"
)]
pub struct CliArgs {
    /// Path to a JSON registry definition.
    ///
    /// When set, `ENTITIES`, `COLLECTION` and `STARTING_VALUE` are ignored and
    /// every entity in the file is exercised.
    ///
    /// Environment variable: `REGISTRY_PATH`
    #[arg(long, env = "REGISTRY_PATH")]
    pub registry_path: Option<PathBuf>,

    /// Comma separated entity types to allocate for. Each entity's counter key
    /// is its own name.
    ///
    /// Environment variable: `ENTITIES`
    #[arg(long, env = "ENTITIES", value_delimiter = ',', default_value = "orders,invoices")]
    pub entities: Vec<String>,

    /// Collection holding the counters when no registry file is given.
    ///
    /// Environment variable: `COLLECTION`
    #[arg(long, env = "COLLECTION")]
    pub collection: Option<String>,

    /// First id for every counter when no registry file is given.
    ///
    /// Environment variable: `STARTING_VALUE`
    #[arg(long, env = "STARTING_VALUE", default_value_t = tally::DEFAULT_STARTING_VALUE)]
    pub starting_value: u64,

    /// Number of concurrent callers. Defaults to the number of CPUs.
    ///
    /// Environment variable: `CONCURRENCY`
    #[arg(long, env = "CONCURRENCY")]
    pub concurrency: Option<usize>,

    /// Allocations attempted by each caller.
    ///
    /// Environment variable: `IDS_PER_TASK`
    #[arg(long, env = "IDS_PER_TASK", default_value_t = 10_000)]
    pub ids_per_task: usize,

    /// Deadline for a single store operation, in milliseconds.
    ///
    /// Environment variable: `STORE_TIMEOUT_MS`
    #[arg(long, env = "STORE_TIMEOUT_MS", default_value_t = 500)]
    pub store_timeout_ms: u64,
}

#[derive(Debug, Clone)]
pub struct StressConfig {
    pub registry: GeneratorRegistry,
    pub entities: Vec<String>,
    pub concurrency: usize,
    pub ids_per_task: usize,
    pub store_timeout: Duration,
}

impl TryFrom<CliArgs> for StressConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let concurrency = args.concurrency.unwrap_or_else(num_cpus::get);
        if concurrency == 0 {
            bail!("CONCURRENCY must be greater than 0");
        }

        if args.ids_per_task == 0 {
            bail!("IDS_PER_TASK must be greater than 0");
        }

        if args.store_timeout_ms == 0 {
            bail!("STORE_TIMEOUT_MS must be greater than 0");
        }

        let registry = match &args.registry_path {
            Some(path) => load_registry(path)?,
            None => registry_from_args(&args)?,
        };
        if registry.is_empty() {
            bail!("no entities configured");
        }

        let mut entities: Vec<String> = registry
            .iter()
            .map(|(entity, _)| entity.to_owned())
            .collect();
        entities.sort();

        Ok(Self {
            registry,
            entities,
            concurrency,
            ids_per_task: args.ids_per_task,
            store_timeout: Duration::from_millis(args.store_timeout_ms),
        })
    }
}

fn load_registry(path: &Path) -> anyhow::Result<GeneratorRegistry> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read registry `{}`", path.display()))?;
    let config: RegistryConfig = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse registry `{}`", path.display()))?;
    Ok(GeneratorRegistry::try_from(config)?)
}

fn registry_from_args(args: &CliArgs) -> anyhow::Result<GeneratorRegistry> {
    let mut builder = GeneratorRegistry::builder();
    for entity in args.entities.iter().map(|e| e.trim()).filter(|e| !e.is_empty()) {
        let mut config = GeneratorConfig::builder(entity).starting_value(args.starting_value);
        if let Some(collection) = &args.collection {
            config = config.collection(collection.as_str());
        }
        builder = builder.register(entity, config.build()?)?;
    }
    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> CliArgs {
        let mut argv = vec!["tally-stress", "--concurrency", "2"];
        argv.extend_from_slice(extra);
        CliArgs::try_parse_from(argv).unwrap()
    }

    #[test]
    fn builds_registry_from_entity_list() {
        let config = StressConfig::try_from(args(&[
            "--entities",
            "orders,invoices",
            "--collection",
            "bench_ids",
            "--starting-value",
            "100",
        ]))
        .unwrap();

        assert_eq!(config.entities, vec!["invoices", "orders"]);
        let orders = config.registry.resolve("orders").unwrap();
        assert_eq!(orders.collection(), "bench_ids");
        assert_eq!(orders.starting_value(), 100);
        assert_eq!(config.concurrency, 2);
        assert_eq!(config.store_timeout, Duration::from_millis(500));
    }

    #[test]
    fn rejects_zero_sizes() {
        assert!(StressConfig::try_from(args(&["--ids-per-task", "0"])).is_err());
        assert!(StressConfig::try_from(args(&["--store-timeout-ms", "0"])).is_err());

        let argv = ["tally-stress", "--concurrency", "0"];
        assert!(StressConfig::try_from(CliArgs::try_parse_from(argv).unwrap()).is_err());
    }

    #[test]
    fn rejects_invalid_generator_settings() {
        let err = StressConfig::try_from(args(&["--starting-value", "0"])).unwrap_err();
        assert!(err.to_string().contains("starting value"));
    }

    #[test]
    fn rejects_empty_entity_list() {
        assert!(StressConfig::try_from(args(&["--entities", " , "])).is_err());
    }

    #[test]
    fn missing_registry_file_is_reported() {
        let err = StressConfig::try_from(args(&["--registry-path", "/nonexistent/registry.json"]))
            .unwrap_err();
        assert!(err.to_string().contains("failed to read registry"));
    }
}
