//! Auth Connector CLI
//!
//! Command-line harness for the wallet authentication connector. Manages the
//! connector configuration file and drives a full connection lifecycle against
//! the simulated SDK, printing every store transition.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use auth_connector::prelude::*;
use auth_connector::simulated::{SimulatedSdk, SimulatedWalletConfig};
use clap::{Parser, Subcommand};
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Auth Connector CLI
#[derive(Parser, Debug)]
#[command(
    name = "auth-connector-cli",
    version = env!("CARGO_PKG_VERSION"),
    about = "Command-line harness for the wallet authentication connector",
    long_about = "Manage connector configuration and run the connection lifecycle \
                 (eager reconnect, activation, provider events, deactivation) \
                 against a simulated authentication SDK."
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "auth-connector.yaml")]
    config: PathBuf,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

/// Main CLI commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Configuration management
    #[command(subcommand, alias = "cfg")]
    Config(ConfigCommands),

    /// Run the connection lifecycle against the simulated SDK
    #[command(alias = "sim")]
    Simulate(SimulateArgs),

    /// Show current version
    Version,
}

/// Configuration management subcommands
#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Write a default configuration file
    Init {
        /// Where to write it (defaults to --config)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Show current configuration
    Show {
        /// Show as JSON instead of YAML
        #[arg(short, long)]
        json: bool,
    },

    /// Check the configuration can build a connector
    Validate,
}

/// Simulation options
#[derive(clap::Args, Debug)]
struct SimulateArgs {
    /// Chain the simulated wallet starts on (defaults to the configured network)
    #[arg(long)]
    chain_id: Option<u64>,

    /// Accounts the simulated wallet exposes
    #[arg(long, value_delimiter = ',', default_value = "0x71c7656ec7ab88b098defb751b7401b5f6d8976f")]
    accounts: Vec<String>,

    /// Present the provider as an injected wallet (implies external-wallet-bridge mode)
    #[arg(long)]
    injected: bool,

    /// Start with an existing session, so the eager reconnect succeeds
    #[arg(long)]
    logged_in: bool,

    /// Chain to switch to after activation
    #[arg(long)]
    switch_to: Option<u64>,

    /// RPC URL for the chain given by --switch-to
    #[arg(long, requires = "switch_to")]
    switch_rpc: Option<String>,
}

/// Initialize logging at the given level
fn init_logging(level: Level) -> Result<()> {
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")
}

/// Log level from --verbose, else from the config file, else info
fn log_level(cli: &Cli) -> Level {
    if cli.verbose {
        return Level::DEBUG;
    }
    ConnectorConfig::from_file(&cli.config)
        .map(|config| config.logging.level.to_tracing_level())
        .unwrap_or(Level::INFO)
}

/// Main entry point
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(log_level(&cli))?;

    info!("Auth Connector CLI v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Config(cmd) => handle_config_command(cmd, &cli.config)?,
        Commands::Simulate(args) => {
            let config = load_config(&cli.config)?;
            run_simulation(config, args).await?;
        }
        Commands::Version => {
            println!("Auth Connector CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Core library: {}", auth_connector_core::VERSION);
            println!("Connector library: {}", auth_connector::VERSION);
        }
    }

    Ok(())
}

/// Load the config file, falling back to defaults when it does not exist
fn load_config(path: &Path) -> Result<ConnectorConfig> {
    let mut config = if path.exists() {
        debug!("Loading configuration from {}", path.display());
        ConnectorConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?
    } else {
        warn!("{} not found, using defaults", path.display());
        ConnectorConfig::default()
    };
    config.apply_env_overrides();
    Ok(config)
}

/// Handle configuration commands
fn handle_config_command(cmd: ConfigCommands, config_path: &Path) -> Result<()> {
    match cmd {
        ConfigCommands::Init { output, force } => {
            let path = output.unwrap_or_else(|| config_path.to_path_buf());
            if path.exists() && !force {
                bail!("{} already exists, use --force to overwrite", path.display());
            }
            ConnectorConfig::default().save_to_file(&path)?;
            info!("Configuration written to {}", path.display());
            println!("Set client_key in {} before use", path.display());
        }
        ConfigCommands::Show { json } => {
            let config = load_config(config_path)?;
            let rendered = if json {
                serde_json::to_string_pretty(&config)?
            } else {
                serde_yaml::to_string(&config)?
            };
            println!("{}", rendered);
        }
        ConfigCommands::Validate => {
            let config = load_config(config_path)?;
            config.validate()?;
            println!(
                "Configuration is valid: chain {} via {} ({:?} mode, {} known network(s))",
                config.network.chain_id,
                config.network.rpc_url,
                config.mode,
                config.known_networks.len()
            );
        }
    }
    Ok(())
}

fn print_state(step: &str, store: &ConnectionStore) -> Result<()> {
    println!("{:<18} {}", step, serde_json::to_string(&store.snapshot())?);
    Ok(())
}

/// Drive the connector through a whole lifecycle against the simulated SDK
async fn run_simulation(mut config: ConnectorConfig, args: SimulateArgs) -> Result<()> {
    if config.client_key.trim().is_empty() {
        debug!("No client key configured, using a placeholder");
        config.client_key = "pk_simulated".to_string();
    }
    if let Some(chain_id) = args.chain_id {
        config.network.chain_id = chain_id;
    }
    if args.injected {
        config.mode = AuthenticationMode::ExternalWalletBridge;
    }

    let sdk = SimulatedSdk::new(SimulatedWalletConfig {
        accounts: args.accounts.clone(),
        logged_in: args.logged_in,
        injected: args.injected,
        supports_chain_switch: args.injected,
        ..Default::default()
    });
    let store = ConnectionStore::new();

    let mut transitions = store.subscribe();
    tokio::spawn(async move {
        while transitions.changed().await.is_ok() {
            let state = transitions.borrow_and_update().clone();
            debug!("Store transition: {:?}", state);
        }
    });

    let on_error: ErrorHandler = Arc::new(|e: &Error| warn!("Provider error: {}", e));
    let connector = AuthConnector::new(ConnectorArgs {
        actions: Arc::new(store.clone()),
        factory: Arc::new(sdk.clone()),
        config,
        on_error: Some(on_error),
    })?;

    connector.connect_eagerly().await?;
    print_state("connect_eagerly", &store)?;

    if !store.snapshot().is_connected() {
        connector.activate(None).await?;
        print_state("activate", &store)?;
    }

    if let Some(chain_id) = args.switch_to {
        let desired = match args.switch_rpc {
            Some(rpc_url) => DesiredChain::from(ChainParameters::new(chain_id, rpc_url)),
            None => DesiredChain::Id(chain_id),
        };
        connector.activate(Some(desired)).await?;
        print_state("switch", &store)?;
    }

    let provider = sdk
        .last_provider()
        .context("simulated SDK built no provider")?;

    if args.accounts.len() > 1 {
        let mut rotated = args.accounts.clone();
        rotated.rotate_left(1);
        provider.emit(ProviderEvent::AccountsChanged(rotated));
        print_state("accountsChanged", &store)?;
    }

    provider.emit(ProviderEvent::AccountsChanged(Vec::new()));
    print_state("accounts cleared", &store)?;

    connector.deactivate().await?;
    print_state("deactivate", &store)?;

    info!(
        "Simulation finished: {} client(s) built, {} login(s), {} logout(s)",
        connector.clients_created().await,
        sdk.logins(),
        sdk.logouts()
    );
    Ok(())
}
