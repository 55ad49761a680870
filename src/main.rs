use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rai_node::config::NodeConfig;
use rai_node::node::Node;
use rai_node::rpc::{self, Rpc};

#[derive(Parser)]
#[command(author, version, about = "rai cryptocurrency node with a JSON-over-HTTP control interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the node and its RPC server using the provided configuration
    Start {
        #[arg(short, long, default_value = "config/node.toml")]
        config: PathBuf,
    },
    /// Generate a default node configuration file
    GenerateConfig {
        #[arg(short, long, default_value = "config/node.toml")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Start { config } => start_node(config).await?,
        Commands::GenerateConfig { path } => generate_config(path)?,
    }

    Ok(())
}

async fn start_node(config_path: PathBuf) -> Result<()> {
    let config = if config_path.exists() {
        NodeConfig::load(&config_path)?
    } else {
        let config = NodeConfig::default();
        config.save(&config_path)?;
        config
    };

    let rpc_config = config.rpc.clone();
    let node = Node::new(config);
    let handle = node.handle();
    let rpc = Rpc::new(handle.clone(), rpc_config);
    let server = rpc.clone();
    let rpc_task = tokio::spawn(async move { rpc::serve(server, None).await });

    tokio::select! {
        res = rpc_task => {
            res??;
        }
        _ = signal::ctrl_c() => {
            info!("shutdown signal received");
            rpc.stop();
            handle.stop();
        }
    }

    Ok(())
}

fn generate_config(path: PathBuf) -> Result<()> {
    let config = NodeConfig::default();
    config.save(&path)?;
    info!(?path, "wrote default configuration");
    Ok(())
}
