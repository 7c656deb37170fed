//! Server configuration.
//!
//! Every option can be given on the command line or through its `VOTER_ROLL_*`
//! environment variable. Log verbosity is controlled separately by `RUST_LOG`.

use crate::services::voters::import::write::DEFAULT_CHUNK_SIZE;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "voter-roll", about = "Voter roll management backend")]
pub struct Config {
    /// Address the HTTP server binds to.
    #[arg(long, env = "VOTER_ROLL_HOST", default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, env = "VOTER_ROLL_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Directory holding one SQLite database per tenant.
    #[arg(long, env = "VOTER_ROLL_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Number of voters written per insert batch during a bulk import.
    #[arg(
        long,
        env = "VOTER_ROLL_CHUNK_SIZE",
        default_value_t = DEFAULT_CHUNK_SIZE,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub chunk_size: u32,

    /// Largest spreadsheet upload accepted, in bytes.
    #[arg(long, env = "VOTER_ROLL_MAX_UPLOAD_BYTES", default_value_t = 20 * 1024 * 1024)]
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn bind_address(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}
