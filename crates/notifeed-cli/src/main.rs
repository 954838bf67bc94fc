use std::path::PathBuf;

use clap::{Parser, Subcommand};
use notifeed_cli::cli::config::resolve_config;
use notifeed_cli::cli::tracing_setup::init_tracing;
use notifeed_cli::cli::{run_command, ConfigOverrides, FeedCommand};

#[derive(Parser)]
#[command(name = "notifeed")]
#[command(about = "Notification feed client")]
struct Cli {
    /// Pretty-print JSON output
    #[arg(long, short)]
    pretty: bool,

    /// Path to JSON config file (apiBaseUrl, pushAddress, credentials, organization)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Base URL of the notification API
    #[arg(long)]
    api_url: Option<String>,

    /// host:port of the push socket
    #[arg(long)]
    push: Option<String>,

    /// Bearer token for the API
    #[arg(long)]
    token: Option<String>,

    /// User to sign in as
    #[arg(long, short = 'u')]
    user: Option<String>,

    /// Organization whose feed is shown
    #[arg(long, short = 'o')]
    org: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the first page of the feed
    List {
        /// Only unread notifications
        #[arg(long)]
        unread: bool,
        /// Number of pages to load
        #[arg(long, default_value_t = 1)]
        pages: usize,
    },

    /// Mark one notification read
    Read {
        /// Notification ID
        id: String,
    },

    /// Mark every notification in the organization read
    ReadAll,

    /// Stay connected and print feed changes and notices until Ctrl-C
    Watch,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_tracing() {
        eprintln!("Warning: {:#}", e);
    }

    let overrides = ConfigOverrides {
        api_base_url: cli.api_url,
        push_address: cli.push,
        access_token: cli.token,
        user_id: cli.user,
        organization_id: cli.org,
    };
    let config = match resolve_config(cli.config.as_deref(), overrides) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    let command = match cli.command {
        Commands::List { unread, pages } => FeedCommand::List { unread, pages },
        Commands::Read { id } => FeedCommand::Read { id },
        Commands::ReadAll => FeedCommand::ReadAll,
        Commands::Watch => FeedCommand::Watch,
    };

    if let Err(e) = run_command(command, config, cli.pretty).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
