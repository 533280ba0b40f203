// ABOUTME: Command-line runner for a ring of agents sharing exclusive tokens.
// ABOUTME: Builds a TableConfig from a JSON file, env, and flags, then runs it to completion.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use forkring::prelude::*;

/// Run N agents around a ring of N tokens until each completes its cycles
#[derive(Parser, Debug)]
#[command(name = "dine")]
#[command(version, about, long_about = None)]
struct Cli {
    /// JSON file with a table configuration; flags override its fields
    #[arg(short, long, env = "DINE_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of agents (and tokens)
    #[arg(short, long, env = "DINE_AGENTS")]
    agents: Option<usize>,

    /// Cycles each agent must complete
    #[arg(long, env = "DINE_CYCLES")]
    cycles: Option<u32>,

    /// Bound on waiting for the right token, in milliseconds
    #[arg(long, env = "DINE_TIMEOUT_MS")]
    timeout_ms: Option<u64>,

    #[arg(long, env = "DINE_THINK_MIN_MS")]
    think_min_ms: Option<u64>,

    #[arg(long, env = "DINE_THINK_MAX_MS")]
    think_max_ms: Option<u64>,

    #[arg(long, env = "DINE_USE_MIN_MS")]
    use_min_ms: Option<u64>,

    #[arg(long, env = "DINE_USE_MAX_MS")]
    use_max_ms: Option<u64>,

    /// Seed for think and use durations
    #[arg(long, env = "DINE_SEED")]
    seed: Option<u64>,

    /// Acquisition policy (bounded-wait, ordered-pair)
    #[arg(long, env = "DINE_POLICY")]
    policy: Option<AcquisitionPolicy>,

    /// Print the run report as JSON
    #[arg(long)]
    json: bool,

    /// Do not narrate agent events
    #[arg(short, long)]
    quiet: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "DINE_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl Cli {
    /// Resolve the table configuration: file (or defaults), then flag overrides.
    ///
    /// Validation runs once, after every override is applied.
    fn table_config(&self) -> Result<TableConfig> {
        let mut config = match &self.config {
            Some(path) => TableConfig::read(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => TableConfig::default(),
        };

        if let Some(agents) = self.agents {
            config.agents = agents;
        }
        if let Some(cycles) = self.cycles {
            config.cycles_per_agent = cycles;
        }
        if let Some(timeout) = self.timeout_ms {
            config.acquire_timeout_ms = timeout;
        }
        if let Some(ms) = self.think_min_ms {
            config.think_min_ms = ms;
        }
        if let Some(ms) = self.think_max_ms {
            config.think_max_ms = ms;
        }
        if let Some(ms) = self.use_min_ms {
            config.use_min_ms = ms;
        }
        if let Some(ms) = self.use_max_ms {
            config.use_max_ms = ms;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if let Some(policy) = self.policy {
            config.policy = policy;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_logging(&cli.log_level)?;

    let config = cli.table_config()?;
    let agents = config.agents;

    let hooks = Arc::new(HookRegistry::new());
    if !cli.quiet {
        hooks.register(NarrationHook).await;
    }

    let coordinator = Coordinator::new(config)?.with_hooks(hooks);
    let cancel = coordinator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling run");
            cancel.cancel();
        }
    });

    let report = coordinator.run().await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("all {} agents finished", agents);
    }

    Ok(())
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    Ok(())
}
