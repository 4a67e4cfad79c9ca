use std::env;
use std::path::PathBuf;

/// Runtime configuration for uploads and storage
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Root directory holding the per-user partitions (default: "uploads")
    pub storage_root: PathBuf,

    /// Maximum upload size in bytes (default: 256 MB)
    pub max_file_size: u64,

    /// Bound on the collision-suffix probe loop (default: 10000)
    pub max_name_probes: u32,

    /// Retries when an exclusive-create commit races another upload (default: 3)
    pub upload_retry_limit: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from("uploads"),
            max_file_size: 256 * 1024 * 1024, // 256 MB
            max_name_probes: 10_000,
            upload_retry_limit: 3,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            storage_root: env::var("STORAGE_ROOT")
                .map(PathBuf::from)
                .unwrap_or(default.storage_root),

            max_file_size: env::var("MAX_FILE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_file_size),

            max_name_probes: env::var("MAX_NAME_PROBES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_name_probes),

            upload_retry_limit: env::var("UPLOAD_RETRY_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.upload_retry_limit),
        }
    }

    /// Config for tests and local development (small limits, tmp-friendly)
    pub fn development(storage_root: impl Into<PathBuf>) -> Self {
        Self {
            storage_root: storage_root.into(),
            max_file_size: 16 * 1024 * 1024,
            max_name_probes: 100,
            upload_retry_limit: 3,
        }
    }
}
