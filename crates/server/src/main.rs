//! HerHealth Server binary

use server::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::load()?;

    server::start_server(config).await?;

    Ok(())
}
