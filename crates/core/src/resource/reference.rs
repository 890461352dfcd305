use std::{hash::Hasher, sync::Arc};

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Stylesheet,
    Script,
}

impl ResourceKind {
    pub fn content_type(&self) -> &'static str {
        match self {
            ResourceKind::Stylesheet => "text/css; charset=utf-8",
            ResourceKind::Script => "text/javascript; charset=utf-8",
        }
    }
}

/// One external asset, identified by its URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceReference {
    #[serde(rename = "url")]
    id: Arc<str>,
    kind: ResourceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    integrity: Option<u64>,
}

impl ResourceReference {
    pub fn new(url: impl Into<Arc<str>>, kind: ResourceKind) -> Self {
        Self {
            id: url.into(),
            kind,
            integrity: None,
        }
    }

    pub fn stylesheet(url: impl Into<Arc<str>>) -> Self {
        Self::new(url, ResourceKind::Stylesheet)
    }

    pub fn script(url: impl Into<Arc<str>>) -> Self {
        Self::new(url, ResourceKind::Script)
    }

    /// Pin the expected xxh3-64 digest of the asset body.
    pub fn with_integrity(mut self, digest: u64) -> Self {
        self.integrity = Some(digest);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn shared_id(&self) -> Arc<str> {
        Arc::clone(&self.id)
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn integrity(&self) -> Option<u64> {
        self.integrity
    }

    /// Last path segment of the URL, query string stripped.
    pub fn file_name(&self) -> &str {
        let path = self.id.split(['?', '#']).next().unwrap_or_default();
        path.rsplit('/').next().unwrap_or(path)
    }
}

pub fn digest(bytes: &[u8]) -> u64 {
    let mut hasher = twox_hash::xxhash3_64::Hasher::new();
    hasher.write(bytes);
    hasher.finish()
}
