//! command-relay CLI
//!
//! Sends one command through the relay pipeline (token injection, timeout,
//! retry, refresh) to an HTTP command endpoint and prints the payload.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::Value;

use command_relay::auth::{CommandRefresher, MemoryCredentialStore};
use command_relay::config::validation::validate_config;
use command_relay::config::{load_config, RelayConfig};
use command_relay::observability::{logging, metrics};
use command_relay::{CommandClient, HttpTransport, InvokeOptions, Transport};

#[derive(Parser)]
#[command(name = "command-relay")]
#[command(about = "Invoke backend commands through the resilient relay", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Invoke a command and print its payload
    Invoke {
        /// Command name
        name: String,

        /// Argument bag as JSON
        #[arg(short, long, default_value = "{}")]
        args: String,

        /// Bypass the response cache
        #[arg(long)]
        no_cache: bool,

        /// Single attempt, no backoff
        #[arg(long)]
        no_retry: bool,

        /// Do not inject the access token
        #[arg(long)]
        public: bool,
    },
    /// Validate the configuration and print the effective values
    CheckConfig,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => RelayConfig::default(),
    };

    logging::init_logging(&config.observability.log_level);

    match cli.command {
        Commands::CheckConfig => {
            if let Err(errors) = validate_config(&config) {
                for error in &errors {
                    eprintln!("Error: {error}");
                }
                return ExitCode::FAILURE;
            }
            match toml::to_string_pretty(&config) {
                Ok(rendered) => {
                    println!("{rendered}");
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("Error: {e}");
                    ExitCode::FAILURE
                }
            }
        }
        Commands::Invoke {
            name,
            args,
            no_cache,
            no_retry,
            public,
        } => {
            let args: Value = match serde_json::from_str(&args) {
                Ok(args) => args,
                Err(e) => {
                    eprintln!("Error: --args is not valid JSON: {e}");
                    return ExitCode::FAILURE;
                }
            };
            let options = invoke_options(no_cache, no_retry, public);
            run_invoke(config, &name, args, options).await
        }
    }
}

/// Per-call overrides for the flags that were passed; everything else is
/// left to the configuration.
fn invoke_options(no_cache: bool, no_retry: bool, public: bool) -> InvokeOptions {
    let mut options = InvokeOptions::new();
    if no_cache {
        options = options.with_cache(false);
    }
    if no_retry {
        options = options.with_retry(false);
    }
    if public {
        options = options.with_auth(false);
    }
    options
}

async fn run_invoke(config: RelayConfig, name: &str, args: Value, options: InvokeOptions) -> ExitCode {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let transport: Arc<dyn Transport> = match HttpTransport::new(&config.transport.endpoint) {
        Ok(transport) => Arc::new(transport),
        Err(e) => {
            eprintln!("Error: invalid endpoint '{}': {e}", config.transport.endpoint);
            return ExitCode::FAILURE;
        }
    };

    let credentials = Arc::new(MemoryCredentialStore::from_env(
        &config.credentials.access_token_env,
        &config.credentials.refresh_token_env,
    ));
    let refresher = Arc::new(CommandRefresher::new(
        transport.clone(),
        credentials.clone(),
        config.credentials.refresh_command.clone(),
        config.client.timeout(),
    ));

    tracing::info!(
        endpoint = %config.transport.endpoint,
        command = %name,
        "Invoking command"
    );

    let client = CommandClient::new(config.client, transport, credentials, refresher);

    match client.invoke(name, args, options).await {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(rendered) => {
                println!("{rendered}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error: {e}");
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            eprintln!("Error: {e}");
            if let Some(details) = e.details() {
                eprintln!("Details: {details}");
            }
            ExitCode::FAILURE
        }
    }
}
