use crate::scoring::Questionnaire;
use serde::Deserialize;

/// Where submitted records are persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordBackend {
    Sqlite,
    Supabase,
}

/// Where voice recordings are stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioBackend {
    Local,
    S3,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_questionnaire")]
    pub questionnaire: Questionnaire,
    #[serde(default = "default_min_age")]
    pub min_age: i64,

    // Record storage
    #[serde(default = "default_record_store")]
    pub record_store: RecordBackend,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    pub supabase_url: Option<String>,
    pub supabase_service_role_key: Option<String>,
    #[serde(default = "default_supabase_table")]
    pub supabase_table: String,

    // Audio storage
    #[serde(default = "default_audio_store")]
    pub audio_store: AudioBackend,
    #[serde(default = "default_local_files_dir")]
    pub local_files_dir: String,
    pub s3_endpoint: Option<String>,
    #[serde(default = "default_s3_region")]
    pub s3_region: String,
    pub s3_access_key_id: Option<String>,
    pub s3_secret_access_key: Option<String>,
    #[serde(default = "default_s3_bucket")]
    pub s3_bucket: String,
    #[serde(default = "default_signed_url_ttl")]
    pub signed_url_ttl_secs: u64,

    // Audio intake
    #[serde(default = "default_max_audio_size")]
    pub max_audio_size_mb: u64,
    #[serde(default)]
    pub convert_audio_to_wav: bool,

    #[serde(default = "default_stats_limit")]
    pub stats_limit: i64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_questionnaire() -> Questionnaire {
    Questionnaire::Phq8
}

fn default_min_age() -> i64 {
    18
}

fn default_record_store() -> RecordBackend {
    RecordBackend::Sqlite
}

fn default_database_url() -> String {
    "sqlite:./data/assessments.db?mode=rwc".to_string()
}

fn default_supabase_table() -> String {
    "phq8_assessments".to_string()
}

fn default_audio_store() -> AudioBackend {
    AudioBackend::Local
}

fn default_local_files_dir() -> String {
    "./local_files".to_string()
}

fn default_s3_region() -> String {
    "auto".to_string()
}

fn default_s3_bucket() -> String {
    "voice_recordings".to_string()
}

fn default_signed_url_ttl() -> u64 {
    24 * 60 * 60
}

fn default_max_audio_size() -> u64 {
    25
}

fn default_stats_limit() -> i64 {
    1000
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Env(#[from] envy::Error),

    #[error("{0} must be set when {1}")]
    Missing(&'static str, &'static str),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let config: Config = envy::from_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_iter<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config: Config = envy::from_iter(vars)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the selected backends have what they need to start.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.record_store == RecordBackend::Supabase {
            if self.supabase_url.is_none() {
                return Err(ConfigError::Missing(
                    "SUPABASE_URL",
                    "RECORD_STORE=supabase",
                ));
            }
            if self.supabase_service_role_key.is_none() {
                return Err(ConfigError::Missing(
                    "SUPABASE_SERVICE_ROLE_KEY",
                    "RECORD_STORE=supabase",
                ));
            }
        }

        if self.audio_store == AudioBackend::S3 {
            if self.s3_access_key_id.is_none() {
                return Err(ConfigError::Missing("S3_ACCESS_KEY_ID", "AUDIO_STORE=s3"));
            }
            if self.s3_secret_access_key.is_none() {
                return Err(ConfigError::Missing(
                    "S3_SECRET_ACCESS_KEY",
                    "AUDIO_STORE=s3",
                ));
            }
        }

        Ok(())
    }

    pub fn max_audio_size_bytes(&self) -> u64 {
        self.max_audio_size_mb * 1024 * 1024
    }

    pub fn max_request_body_bytes(&self) -> usize {
        // Base64 inflates by 4/3; allow some overhead for the other fields.
        ((self.max_audio_size_mb * 4 / 3 + 2) * 1024 * 1024) as usize
    }
}
