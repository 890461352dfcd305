use std::{hash::Hasher, path::PathBuf};

use bytes::{Bytes, BytesMut};
use futures_util::{StreamExt, future::BoxFuture};

use crate::resource::reference::ResourceReference;

/// A resource whose body has been fetched and attached.
#[derive(Debug, Clone)]
pub struct LoadedAsset {
    reference: ResourceReference,
    body: Bytes,
}

impl LoadedAsset {
    pub fn new(reference: ResourceReference, body: impl Into<Bytes>) -> Self {
        Self {
            reference,
            body: body.into(),
        }
    }

    pub fn reference(&self) -> &ResourceReference {
        &self.reference
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }
}

/// Fetches and attaches a single resource. The returned future must not
/// borrow the loader: the gate drives it on its own task.
pub trait AssetLoader: Send + Sync {
    fn load(&self, reference: &ResourceReference) -> BoxFuture<'static, Result<LoadedAsset, FetchError>>;
}

pub struct HttpAssetLoader {
    client: reqwest::Client,
}

impl HttpAssetLoader {
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Fetch the resource body, verifying its digest when the reference pins one.
    pub async fn fetch(
        client: reqwest::Client,
        reference: ResourceReference,
    ) -> Result<LoadedAsset, FetchError> {
        let response = client
            .get(reference.id())
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(reference.id().to_string()));
        }

        if !response.status().is_success() {
            return Err(FetchError::Network(format!("HTTP {}", response.status())));
        }

        let mut stream = response.bytes_stream();
        let mut body = BytesMut::new();
        let mut hasher = twox_hash::xxhash3_64::Hasher::new();

        while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(|e| FetchError::Network(e.to_string()))?;
            hasher.write(&bytes);
            body.extend_from_slice(&bytes);
        }

        if let Some(expected) = reference.integrity() {
            let actual = hasher.finish();
            if actual != expected {
                return Err(FetchError::IntegrityMismatch { expected, actual });
            }
        }

        tracing::debug!(url = reference.id(), bytes = body.len(), "fetched asset");
        Ok(LoadedAsset::new(reference, body.freeze()))
    }
}

impl Default for HttpAssetLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetLoader for HttpAssetLoader {
    fn load(&self, reference: &ResourceReference) -> BoxFuture<'static, Result<LoadedAsset, FetchError>> {
        Box::pin(Self::fetch(self.client.clone(), reference.clone()))
    }
}

/// Loads resources from a local directory, matching on the URL's file name.
pub struct FileAssetLoader {
    root: PathBuf,
}

impl FileAssetLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetLoader for FileAssetLoader {
    fn load(&self, reference: &ResourceReference) -> BoxFuture<'static, Result<LoadedAsset, FetchError>> {
        let path = self.root.join(reference.file_name());
        let reference = reference.clone();
        Box::pin(async move {
            let body = match tokio::fs::read(&path).await {
                Ok(body) => body,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    return Err(FetchError::NotFound(path.display().to_string()));
                }
                Err(e) => return Err(e.into()),
            };

            if let Some(expected) = reference.integrity() {
                let actual = crate::resource::reference::digest(&body);
                if actual != expected {
                    return Err(FetchError::IntegrityMismatch { expected, actual });
                }
            }

            Ok(LoadedAsset::new(reference, body))
        })
    }
}

#[derive(Debug)]
pub enum FetchError {
    Io(std::io::Error),
    NotFound(String),
    Network(String),
    IntegrityMismatch { expected: u64, actual: u64 },
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Io(e) => write!(f, "IO error: {}", e),
            FetchError::NotFound(url) => write!(f, "Resource not found: {}", url),
            FetchError::Network(msg) => write!(f, "Network error: {}", msg),
            FetchError::IntegrityMismatch { expected, actual } => write!(
                f,
                "Integrity mismatch: expected {:016x}, got {:016x}",
                expected, actual
            ),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for FetchError {
    fn from(e: std::io::Error) -> Self {
        FetchError::Io(e)
    }
}
