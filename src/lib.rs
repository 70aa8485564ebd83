pub mod audio;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod records;
pub mod scoring;
pub mod stats;
pub mod storage;
pub mod supabase;

pub use config::Config;
pub use error::{AppError, Result};

pub struct AppState {
    pub config: Config,
    pub records: records::RecordStore,
    pub audio: storage::AudioStore,
}
