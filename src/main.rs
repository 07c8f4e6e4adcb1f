//! kira-scenario - run scripted scenarios against a KIRA node.
//!
//! Loads YAML playbooks, validates them and executes their steps in order
//! through the node's CLI.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use kira_scenario::core::duration::{format_duration, parse_duration};
use kira_scenario::core::Config;
use kira_scenario::dispatch::{ActionDispatcher, ActionRegistry};
use kira_scenario::scenario::{
    discover_scenarios, load_playbook, CancelToken, ExecuteOptions, ExecutionResult,
    ScenarioRunner, Value, KNOWN_MODULES,
};
use kira_scenario::SekaidClient;

#[derive(Parser)]
#[command(name = "kira-scenario")]
#[command(author, version, about = "Scenario automation for KIRA networks", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging and progress narration
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Dry run mode - render steps without dispatching anything
    #[arg(long, global = true)]
    dry_run: bool,

    /// Configuration file to use instead of the default locations
    #[arg(short, long, global = true, env = "KIRA_SCENARIO_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a playbook
    Run {
        /// Playbook file
        file: PathBuf,

        /// Override a variable (key=value, value parsed as JSON when possible)
        #[arg(long = "var", value_name = "KEY=VALUE")]
        vars: Vec<String>,

        /// Keep running steps after a failure
        #[arg(long)]
        continue_on_error: bool,

        /// Confirmation wait for async broadcasts (e.g. 30s, 2m)
        #[arg(long, value_parser = parse_duration)]
        wait_timeout: Option<Duration>,

        /// Interval between confirmation checks (e.g. 500ms)
        #[arg(long, value_parser = parse_duration)]
        poll_interval: Option<Duration>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Validate playbooks without running them
    Validate {
        /// Playbook files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// List playbooks found in a directory
    List {
        /// Directory to search
        #[arg(default_value = ".")]
        dir: PathBuf,
    },

    /// Show known modules and their routed actions
    Modules,

    /// Show configuration
    Config {
        /// Show config file path
        #[arg(long)]
        path: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Yaml,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Run { ref file, ref vars, continue_on_error, wait_timeout, poll_interval, format } => {
            let config = load_config(cli.config.as_deref())?;
            let mut options = ExecuteOptions::from(&config.engine);
            options.dry_run = cli.dry_run;
            options.verbose = cli.verbose;
            options.continue_on_error |= continue_on_error;
            options.variable_overrides = parse_vars(vars)?;
            if let Some(wait) = wait_timeout {
                options.wait_timeout = wait;
            }
            if let Some(interval) = poll_interval {
                options.poll_interval = interval;
            }

            let result = cmd_run(file, &config, options)?;
            print_result(&result, format)?;
            if !result.success {
                std::process::exit(1);
            }
        }
        Commands::Validate { ref files } => {
            cmd_validate(files)?;
        }
        Commands::List { ref dir } => {
            cmd_list(dir)?;
        }
        Commands::Modules => {
            cmd_modules();
        }
        Commands::Config { path } => {
            cmd_config(cli.config.as_deref(), path)?;
        }
        Commands::Completions { shell } => {
            cmd_completions(shell);
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from_file(path),
        None => Config::load(),
    }
}

/// Parse `key=value` overrides.
fn parse_vars(vars: &[String]) -> Result<BTreeMap<String, Value>> {
    let mut overrides = BTreeMap::new();

    for var in vars {
        let (key, raw) = var
            .split_once('=')
            .with_context(|| format!("Invalid variable '{var}', expected KEY=VALUE"))?;
        let value = serde_json::from_str(raw)
            .unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));
        overrides.insert(key.trim().to_string(), Value::from(value));
    }

    Ok(overrides)
}

/// Load and execute a playbook.
fn cmd_run(file: &Path, config: &Config, options: ExecuteOptions) -> Result<ExecutionResult> {
    let playbook = load_playbook(file)
        .with_context(|| format!("Failed to load playbook {}", file.display()))?;

    let cancel: CancelToken = options.cancel.clone();
    ctrlc::set_handler(move || {
        eprintln!("Cancelling...");
        cancel.cancel();
    })?;

    let client = SekaidClient::from_config(config);
    let dispatcher = ActionDispatcher::new(client, config.node.address_prefix.clone());
    let runner = ScenarioRunner::new(dispatcher);

    let runtime = tokio::runtime::Runtime::new()?;
    let (result, error) = runtime.block_on(runner.execute(&playbook, &options));
    if let Some(error) = error {
        tracing::warn!(step = error.step(), "Run stopped early: {error}");
    }
    Ok(result)
}

fn print_result(result: &ExecutionResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(result)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(result)?),
        OutputFormat::Text => {
            for step in &result.steps {
                println!("{}", step.summary());
            }
            println!();

            let status = if result.success { "passed" } else { "failed" };
            println!(
                "Scenario '{}' {status}: {} passed, {} failed, {} skipped in {}",
                result.scenario,
                result.passed() - result.skipped(),
                result.failed(),
                result.skipped(),
                format_duration(result.duration),
            );
            if let Some(ref error) = result.error {
                println!("Error: {error}");
            }
        }
    }
    Ok(())
}

/// Validate playbooks.
fn cmd_validate(files: &[PathBuf]) -> Result<()> {
    let mut failures = 0;

    for file in files {
        match load_playbook(file) {
            Ok(playbook) => {
                println!("{}: ok ({}, {} steps)", file.display(), playbook.name, playbook.step_count());
            }
            Err(e) => {
                eprintln!("{}: {e}", file.display());
                failures += 1;
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} of {} playbooks failed validation", files.len());
    }
    Ok(())
}

/// List discovered playbooks.
fn cmd_list(dir: &Path) -> Result<()> {
    let scenarios = discover_scenarios(dir)?;

    if scenarios.is_empty() {
        println!("No scenarios found in {}", dir.display());
        return Ok(());
    }

    for (file, playbook) in &scenarios {
        let description = playbook.description.as_deref().unwrap_or("");
        println!("{file:20} {:24} {:3} steps  {description}", playbook.name, playbook.step_count());
    }
    Ok(())
}

/// Show modules and builtin actions.
fn cmd_modules() {
    let registry = ActionRegistry::builtin();
    let actions = registry.actions();

    for module in KNOWN_MODULES {
        let routed: Vec<&str> =
            actions.iter().filter(|(m, _)| m == module).map(|(_, a)| *a).collect();
        if routed.is_empty() {
            println!("{module}");
        } else {
            println!("{module}: {}", routed.join(", "));
        }
    }
}

/// Show configuration.
fn cmd_config(explicit: Option<&Path>, show_path: bool) -> Result<()> {
    if show_path {
        let path = explicit.map(Path::to_path_buf).or_else(Config::active_path);
        match path {
            Some(path) => println!("{}", path.display()),
            None => println!("(defaults)"),
        }
        return Ok(());
    }

    let config = load_config(explicit)?;
    print!("{}", config.to_toml()?);
    Ok(())
}

/// Generate shell completions.
fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "kira-scenario", &mut io::stdout());
}
