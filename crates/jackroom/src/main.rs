use clap::Parser;
use jackroom::{Args, JackroomError, JackroomServerBuilder};
use jackroom_store::MemoryStore;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), JackroomError> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if args.json_logs {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!("Jackroom server v{} starting", env!("CARGO_PKG_VERSION"));

    let config = args.server_config()?;
    let store = match &args.seed {
        Some(path) => MemoryStore::load(path)?,
        None => {
            tracing::warn!("no --seed given, starting with an empty store");
            MemoryStore::new()
        }
    };

    let server = JackroomServerBuilder::new().config(config).build(store).await?;
    server.run().await
}
