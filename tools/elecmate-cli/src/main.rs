//! Elec-Mate consultation CLI
//! Terminal client for the agent router: one-shot consultations, an
//! interactive session, and roster inspection.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use elecmate_router::{RouterClient, RouterConfig, Session};
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Router endpoint URL (or ELECMATE_ROUTER_URL)
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Bearer access token (or ELECMATE_ACCESS_TOKEN)
    #[arg(long, global = true)]
    token: Option<String>,

    /// Project API key (or ELECMATE_API_KEY)
    #[arg(long, global = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Put one question to the agents
    Consult {
        /// The question to ask
        message: String,

        /// Agents to consult (comma-separated)
        #[arg(short, long)]
        agents: Option<String>,

        /// Route the question to a single agent
        #[arg(long, conflicts_with = "agents")]
        target: Option<String>,

        /// JSON file holding the current design context
        #[arg(short, long)]
        design: Option<PathBuf>,

        /// Print consultation metrics afterwards
        #[arg(long)]
        stats: bool,
    },

    /// Interactive consultation session
    Chat {
        /// Agents to consult on every turn (comma-separated)
        #[arg(short, long)]
        agents: Option<String>,
    },

    /// List the agents the router routes to
    Agents,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Consult {
            message,
            agents,
            target,
            design,
            stats,
        } => {
            let client = build_client(&cli)?;
            commands::consult(
                &client,
                message,
                parse_agents(agents.as_deref()),
                target.as_deref(),
                design.as_deref(),
                *stats,
            )
            .await
        }
        Commands::Chat { agents } => {
            let client = build_client(&cli)?;
            commands::chat(&client, parse_agents(agents.as_deref())).await
        }
        Commands::Agents => {
            commands::list_agents();
            Ok(())
        }
    }
}

fn build_client(cli: &Cli) -> Result<RouterClient> {
    let endpoint = cli
        .endpoint
        .clone()
        .or_else(|| std::env::var("ELECMATE_ROUTER_URL").ok())
        .context("router endpoint required: pass --endpoint or set ELECMATE_ROUTER_URL")?;
    debug!("using router endpoint {}", endpoint);

    let access_token = cli
        .token
        .clone()
        .or_else(|| std::env::var("ELECMATE_ACCESS_TOKEN").ok());
    let api_key = cli
        .api_key
        .clone()
        .or_else(|| std::env::var("ELECMATE_API_KEY").ok());

    let mut client = RouterClient::new(RouterConfig::new(endpoint));
    if access_token.is_some() || api_key.is_some() {
        client = client.with_session(Session {
            access_token,
            api_key,
        });
    }
    Ok(client)
}

fn parse_agents(agents: Option<&str>) -> Option<Vec<String>> {
    agents.map(|list| {
        list.split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect()
    })
}
