//! Shared application state, injected into handlers as `web::Data<AppState>`.

use crate::config::Config;
use crate::db::Database;

#[derive(Debug, Clone)]
pub struct AppState {
    /// Opens a connection to the tenant selected by each request.
    pub db: Database,
    /// Insert batch size for bulk imports.
    pub chunk_size: usize,
    /// Uploads larger than this are rejected before decoding.
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        Self {
            db: Database::new(&config.data_dir),
            chunk_size: config.chunk_size as usize,
            max_upload_bytes: config.max_upload_bytes,
        }
    }
}
