use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::primitives::ByteStream;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// StorageError
///
/// Failure modes shared by every backend. `AppError` maps them to 404, 403 and 500.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("File not found: {0}")]
    NotFound(String),
    #[error("Access denied: {0}")]
    Forbidden(String),
    #[error("Storage backend failure: {0}")]
    Backend(String),
}

// 1. StorageService Contract
/// StorageService
///
/// Abstract contract for the media byte store. Handlers only ever see this trait, so the
/// local filesystem, S3 and the in-memory mock are interchangeable.
///
/// Keys are relative, slash-separated paths such as `uploads/products/7/<uuid>.jpg`.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Prepares the backend (creates the media root or the bucket). Called once at startup.
    async fn ensure_ready(&self) -> Result<(), StorageError>;

    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StorageError>;

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Removes an object. Deleting a key that does not exist succeeds.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// normalize_key
///
/// Turns a client- or URL-derived path into a storage key: strips leading slashes and
/// `.` segments and refuses any `..` segment, so a key can never leave the media root.
pub fn normalize_key(key: &str) -> Result<String, StorageError> {
    let mut segments = Vec::new();
    for segment in key.split(['/', '\\']) {
        match segment {
            "" | "." => continue,
            ".." => return Err(StorageError::Forbidden(key.to_string())),
            s => segments.push(s),
        }
    }
    if segments.is_empty() {
        return Err(StorageError::NotFound(key.to_string()));
    }
    Ok(segments.join("/"))
}

// 2. Local Filesystem Implementation
/// LocalStorage
///
/// Stores objects as plain files below `media_root`. This is the default backend for
/// development and single-node deployments.
#[derive(Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        let key = normalize_key(key)?;
        let path = self.root.join(&key);
        if !path.starts_with(&self.root) {
            return Err(StorageError::Forbidden(key));
        }
        Ok(path)
    }
}

#[async_trait]
impl StorageService for LocalStorage {
    async fn ensure_ready(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| StorageError::Backend(format!("{}: {}", self.root.display(), e)))
    }

    async fn put(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> Result<(), StorageError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::Backend(e.to_string()))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(StorageError::Backend(e.to_string())),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Backend(e.to_string())),
        }
    }
}

// 3. The S3 Implementation (S3/MinIO)
/// S3StorageClient
///
/// Object storage through the AWS SDK. Works against AWS itself, MinIO locally, or any
/// other S3-compatible gateway.
///
/// `force_path_style(true)` is required for MinIO compatibility.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    bucket_name: String,
}

impl S3StorageClient {
    pub async fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
    ) -> Self {
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            .force_path_style(true)
            .build();

        Self {
            client: s3::Client::from_conf(config),
            bucket_name: bucket.to_string(),
        }
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    /// CreateBucket is idempotent enough for startup: an "already owned" error is ignored.
    async fn ensure_ready(&self) -> Result<(), StorageError> {
        if let Err(e) = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await
        {
            tracing::debug!(bucket = %self.bucket_name, error = ?e, "create_bucket skipped");
        }
        Ok(())
    }

    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StorageError> {
        let key = normalize_key(key)?;
        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(&key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let key = normalize_key(key)?;
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket_name)
            .key(&key)
            .send()
            .await
            .map_err(|e| {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    StorageError::NotFound(key.clone())
                } else {
                    StorageError::Backend(service_error.to_string())
                }
            })?;

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(data.into_bytes().to_vec())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let key = normalize_key(key)?;
        self.client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(&key)
            .send()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(())
    }
}

// 4. The Mock Implementation (For Unit Tests)
/// MockStorageService
///
/// In-memory `StorageService` for handler tests. Objects live in a shared map so clones
/// observe each other's writes; `should_fail` turns every write and read into a backend
/// error.
#[derive(Clone, Default)]
pub struct MockStorageService {
    pub should_fail: bool,
    objects: Arc<Mutex<HashMap<String, (Vec<u8>, String)>>>,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects
            .lock()
            .map(|objects| objects.contains_key(key))
            .unwrap_or(false)
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .lock()
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    fn simulated_failure(&self) -> Result<(), StorageError> {
        if self.should_fail {
            Err(StorageError::Backend(
                "Mock Storage Error: Simulation requested".to_string(),
            ))
        } else {
            Ok(())
        }
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, (Vec<u8>, String)>>, StorageError> {
        self.objects
            .lock()
            .map_err(|_| StorageError::Backend("mock storage poisoned".to_string()))
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_ready(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StorageError> {
        self.simulated_failure()?;
        let key = normalize_key(key)?;
        self.lock()?.insert(key, (bytes, content_type.to_string()));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.simulated_failure()?;
        let key = normalize_key(key)?;
        self.lock()?
            .get(&key)
            .map(|(bytes, _)| bytes.clone())
            .ok_or(StorageError::NotFound(key))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let key = normalize_key(key)?;
        self.lock()?.remove(&key);
        Ok(())
    }
}

/// StorageState
///
/// The concrete type used to share the storage service across the application state.
pub type StorageState = Arc<dyn StorageService>;
