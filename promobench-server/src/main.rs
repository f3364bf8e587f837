use clap::Parser;
use promobench_server::config::DEFAULT_ADDRESS;
use promobench_server::{Server, ServerConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "promobench-server", about = "Promotion pricing API with a query benchmark")]
struct Args {
    /// Address to bind.
    #[arg(long, default_value = DEFAULT_ADDRESS)]
    address: SocketAddr,

    /// SQLite database file. Omit to keep data in memory.
    #[arg(long)]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let args = Args::parse();
    let config = ServerConfig { address: args.address, database: args.database };

    let (ready_tx, ready_rx) = tokio::sync::oneshot::channel();

    tokio::spawn(async move {
        if let Ok(addr) = ready_rx.await {
            info!("Listening on {}", addr);
        }
    });

    Server::new(config).run(ready_tx).await?;
    Ok(())
}
