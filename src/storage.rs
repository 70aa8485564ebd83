use crate::config::{AudioBackend, Config};
use crate::{AppError, Result};
use aws_sdk_s3::primitives::ByteStream;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// Build the storage key for an assessment's recording.
pub fn recording_key(assessment_id: &str, ext: &str) -> String {
    if ext.is_empty() {
        format!("recordings/{}", assessment_id)
    } else {
        format!("recordings/{}.{}", assessment_id, ext)
    }
}

/// Recording storage, chosen once at startup.
#[derive(Clone, Debug)]
pub enum AudioStore {
    LocalDisk(LocalDiskStore),
    ObjectStore(ObjectStore),
}

impl AudioStore {
    pub fn from_config(config: &Config) -> Result<Self> {
        match config.audio_store {
            AudioBackend::Local => Ok(AudioStore::LocalDisk(LocalDiskStore::new(
                &config.local_files_dir,
            ))),
            AudioBackend::S3 => Ok(AudioStore::ObjectStore(ObjectStore::from_config(config)?)),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            AudioStore::LocalDisk(_) => "local",
            AudioStore::ObjectStore(_) => "s3",
        }
    }

    pub async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<()> {
        match self {
            AudioStore::LocalDisk(store) => store.put(key, &data).await,
            AudioStore::ObjectStore(store) => store.put(key, data, content_type).await,
        }
    }

    /// Fetch an object and its content type.
    pub async fn get(&self, key: &str) -> Result<(Vec<u8>, String)> {
        match self {
            AudioStore::LocalDisk(store) => store.get(key).await,
            AudioStore::ObjectStore(store) => store.get(key).await,
        }
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        match self {
            AudioStore::LocalDisk(store) => store.delete(key).await,
            AudioStore::ObjectStore(store) => store.delete(key).await,
        }
    }

    /// Time-limited read URL. Local storage has none; its files are served
    /// by the API instead.
    pub async fn signed_url(&self, key: &str) -> Result<Option<String>> {
        match self {
            AudioStore::LocalDisk(_) => Ok(None),
            AudioStore::ObjectStore(store) => store.presigned_url(key).await.map(Some),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Local disk
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct LocalDiskStore {
    root: PathBuf,
}

impl LocalDiskStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a key to a path under the root, rejecting anything that could
    /// escape it.
    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let is_safe = !key.is_empty()
            && !key.contains("//")
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));

        if !is_safe {
            return Err(AppError::BadRequest(format!("Invalid storage key: {}", key)));
        }

        Ok(self.root.join(relative))
    }

    pub async fn open(&self, key: &str) -> Result<tokio::fs::File> {
        let path = self.path_for(key)?;
        tokio::fs::File::open(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => AppError::NotFound("Recording not found".to_string()),
            _ => AppError::Storage(format!("Failed to open file: {}", e)),
        })
    }

    async fn put(&self, key: &str, data: &[u8]) -> Result<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to create directory: {}", e)))?;
        }

        tokio::fs::write(&path, data)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write file: {}", e)))?;

        tracing::debug!("Stored {} bytes at {}", data.len(), path.display());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<(Vec<u8>, String)> {
        let path = self.path_for(key)?;
        let data = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => AppError::NotFound("Recording not found".to_string()),
            _ => AppError::Storage(format!("Failed to read file: {}", e)),
        })?;

        let content_type = mime_guess::from_path(&path)
            .first_or_octet_stream()
            .to_string();

        Ok((data, content_type))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Storage(format!("Failed to delete file: {}", e))),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// S3-compatible object store
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct ObjectStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    signed_url_ttl: Duration,
}

impl ObjectStore {
    pub fn from_config(config: &Config) -> Result<Self> {
        let (Some(access_key_id), Some(secret_access_key)) = (
            config.s3_access_key_id.as_deref(),
            config.s3_secret_access_key.as_deref(),
        ) else {
            return Err(AppError::Internal(
                "S3 credentials are not configured".to_string(),
            ));
        };

        // Avoid aws-config; everything needed comes from our own config.
        let mut builder = aws_sdk_s3::Config::builder()
            .credentials_provider(aws_sdk_s3::config::Credentials::new(
                access_key_id,
                secret_access_key,
                None,
                None,
                "phq-screening",
            ))
            .region(aws_sdk_s3::config::Region::new(config.s3_region.clone()));

        if let Some(endpoint) = &config.s3_endpoint {
            // Most S3-compatible services (Supabase, R2, MinIO) want path-style URLs.
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Ok(Self {
            client: aws_sdk_s3::Client::from_conf(builder.build()),
            bucket: config.s3_bucket.clone(),
            signed_url_ttl: Duration::from_secs(config.signed_url_ttl_secs),
        })
    }

    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to upload file: {}", e)))?;

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<(Vec<u8>, String)> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to download file: {}", e)))?;

        let content_type = response
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to read file: {}", e)))?
            .into_bytes()
            .to_vec();

        Ok((data, content_type))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to delete file: {}", e)))?;

        Ok(())
    }

    async fn presigned_url(&self, key: &str) -> Result<String> {
        let presigning_config = aws_sdk_s3::presigning::PresigningConfig::builder()
            .expires_in(self.signed_url_ttl)
            .build()
            .map_err(|e| AppError::Storage(format!("Failed to create presigning config: {}", e)))?;

        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning_config)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to generate presigned URL: {}", e)))?;

        Ok(presigned.uri().to_string())
    }
}
