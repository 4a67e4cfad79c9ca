use crate::config::ServerConfig;
use crate::services::library::MediaLibrary;
use std::sync::Arc;
use tokio::fs;
use tracing::info;

pub async fn setup_library(config: &ServerConfig) -> anyhow::Result<Arc<MediaLibrary>> {
    fs::create_dir_all(&config.storage_root).await?;

    info!("🎬 Video storage root: {}", config.storage_root.display());

    Ok(Arc::new(MediaLibrary::new(
        &config.storage_root,
        config.max_name_probes,
        config.upload_retry_limit,
    )))
}
