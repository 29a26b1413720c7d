#![forbid(unsafe_code)]
//! HTTP node for forgechain

use clap::Parser;
use colored::*;
use forgechain::api::{run_api_server, Node};
use forgechain::config::{load_config, load_config_from};
use forgechain::crypto::generate_node_identifier;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "forgechain-node", version, about = "Run a forgechain ledger node over HTTP")]
struct Args {
    /// Path to a TOML config file (defaults to ./config.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Interface to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Leading hex zeros required of a proof
    #[arg(short, long)]
    difficulty: Option<usize>,

    /// Recipient of mining rewards (random when omitted)
    #[arg(long)]
    node_id: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    config.apply_env_overrides();
    if let Some(host) = args.host {
        config.network.host = host;
    }
    if let Some(port) = args.port {
        config.network.api_port = port;
    }
    if let Some(difficulty) = args.difficulty {
        config.miner.difficulty = difficulty;
    }
    if let Some(node_id) = args.node_id {
        config.miner.node_identifier = Some(node_id);
    }
    config.validate()?;

    let node_identifier = config
        .node_identifier()
        .map(str::to_string)
        .unwrap_or_else(generate_node_identifier);
    let addr: SocketAddr = format!("{}:{}", config.network.host, config.network.api_port).parse()?;

    println!("{}", "forgechain node".bright_cyan().bold());
    println!("{}", "---------------".bright_cyan());
    println!("  node id    : {}", node_identifier.bright_white());
    println!("  difficulty : {}", config.miner.difficulty.to_string().bright_white());
    println!("  listening  : {}", format!("http://{}", addr).bright_green());
    println!();

    let node = Arc::new(Node::from_config(&config, node_identifier));
    run_api_server(node, addr).await?;

    Ok(())
}
