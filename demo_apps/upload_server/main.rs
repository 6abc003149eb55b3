//! Upload server.
//!
//! ```text
//! PORT=5000 ARVIEW_PUBLIC_URL=http://localhost:5000 cargo run -p upload_server
//! curl -F file=@DamagedHelmet.glb http://localhost:5000/upload
//! ```

use arview::server::{self, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::from_env()?;
    log::info!("Accepting {:?} uploads up to {} bytes", config.upload.allowed_extensions, config.upload.max_bytes);

    server::serve(config).await?;
    Ok(())
}
