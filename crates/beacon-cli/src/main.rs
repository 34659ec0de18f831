mod cmd_chat;
mod cmd_config;
mod cmd_login;
mod cmd_values;

use beacon_client::ApiClient;
use beacon_core::ContextMode;
use beacon_store::{BeaconConfig, StorePaths};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Filter directives for stderr logging, e.g. `BEACON_LOG=beacon_intent=debug`.
const LOG_ENV: &str = "BEACON_LOG";

#[derive(Parser)]
#[command(name = "beacon", version, about = "Talk through what matters to you")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start a conversation with the values assistant
    Chat {
        /// Conversation context: values or priorities (default from config)
        #[arg(long)]
        mode: Option<ContextMode>,
    },
    /// List your values, or change one
    Values {
        #[command(subcommand)]
        cmd: Option<cmd_values::ValuesCmd>,
        /// Output as JSON (list and history)
        #[arg(long, global = true)]
        json: bool,
    },
    /// Log in and store credentials
    Login {
        /// Use the development login endpoint
        #[arg(long)]
        dev: bool,
    },
    /// Revoke the session and forget stored credentials
    Logout,
    /// Show the account behind the stored credentials
    Whoami,
    /// Manage config.json
    Config {
        #[command(subcommand)]
        cmd: cmd_config::ConfigCmd,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Client for the configured API, carrying stored credentials.
pub(crate) fn api_client(paths: &StorePaths) -> anyhow::Result<(ApiClient, BeaconConfig)> {
    let config = BeaconConfig::load(paths);
    let client = ApiClient::new(&config.api_url)?.with_store(paths.clone());
    Ok((client, config))
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.cmd {
        Command::Chat { mode } => cmd_chat::execute(mode),
        Command::Values { cmd, json } => cmd_values::execute(cmd, json),
        Command::Login { dev } => cmd_login::login(dev),
        Command::Logout => cmd_login::logout(),
        Command::Whoami => cmd_login::whoami(),
        Command::Config { cmd } => cmd_config::run(cmd),
    }
}
