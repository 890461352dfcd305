use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::resource::reference::ResourceReference;

pub const LEAFLET_STYLESHEET: &str =
    "https://cdnjs.cloudflare.com/ajax/libs/leaflet/1.9.4/leaflet.min.css";
pub const LEAFLET_SCRIPT: &str =
    "https://cdnjs.cloudflare.com/ajax/libs/leaflet/1.9.4/leaflet.min.js";

/// The ordered set of assets a map needs before it can be constructed.
/// Stylesheets are expected ahead of the script that uses them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceBundle {
    id: Arc<str>,
    resources: Vec<ResourceReference>,
}

impl ResourceBundle {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self {
            id: id.into(),
            resources: Vec::new(),
        }
    }

    pub fn leaflet() -> Self {
        let mut bundle = Self::new("leaflet-1.9.4");
        bundle.insert(ResourceReference::stylesheet(LEAFLET_STYLESHEET));
        bundle.insert(ResourceReference::script(LEAFLET_SCRIPT));
        bundle
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn resources(&self) -> &[ResourceReference] {
        &self.resources
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn get(&self, url: &str) -> Option<&ResourceReference> {
        self.resources.iter().find(|resource| resource.id() == url)
    }

    /// Appends a reference unless one with the same URL is already present.
    pub fn insert(&mut self, resource: ResourceReference) -> bool {
        if self.get(resource.id()).is_some() {
            return false;
        }
        self.resources.push(resource);
        true
    }

    pub fn remove(&mut self, url: &str) -> Option<ResourceReference> {
        let index = self.resources.iter().position(|r| r.id() == url)?;
        Some(self.resources.remove(index))
    }
}
