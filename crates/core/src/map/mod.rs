use std::sync::Arc;

use geo::Point;
use serde::{Deserialize, Serialize};

use crate::{map::icon::IconSpec, resource::gate::AttachedAssets};

pub mod icon;
pub mod lifecycle;
pub mod marker;

// ============================================================================
// Identifiers
// ============================================================================

/// The drawable surface a map is attached to (an element id in the page).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ContainerId(Arc<str>);

impl ContainerId {
    pub fn new(s: impl AsRef<str>) -> Self {
        Self(s.as_ref().into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContainerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Options
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViewOptions {
    /// `[lat, lng]`
    pub center: [f64; 2],
    pub zoom: u8,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            center: [20.0, 0.0],
            zoom: 2,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TileLayerOptions {
    pub url_template: String,
    pub attribution: String,
    pub max_zoom: u8,
}

impl Default for TileLayerOptions {
    fn default() -> Self {
        Self {
            url_template: "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
            attribution: "© OpenStreetMap contributors".to_string(),
            max_zoom: 19,
        }
    }
}

// ============================================================================
// Engine surface
// ============================================================================

/// The imperative surface of a mapping library, as far as the lifecycle uses it.
pub trait MapEngine: Send {
    type Map: Send;
    type Marker: Send;

    fn create_map(
        &mut self,
        container: &ContainerId,
        view: &ViewOptions,
    ) -> Result<Self::Map, EngineError>;

    fn add_tile_layer(
        &mut self,
        map: &mut Self::Map,
        layer: &TileLayerOptions,
    ) -> Result<(), EngineError>;

    /// Create a marker and add it to `map`.
    fn create_marker(
        &mut self,
        map: &mut Self::Map,
        position: Point,
        icon: &IconSpec,
    ) -> Result<Self::Marker, EngineError>;

    fn bind_popup(&mut self, marker: &mut Self::Marker, text: &str);

    fn remove_marker(&mut self, map: &mut Self::Map, marker: Self::Marker);

    /// Release the map. Markers still attached go with it.
    fn remove_map(&mut self, map: Self::Map);
}

/// Produces an engine once its assets are attached.
pub trait EngineBinder: Send + Sync {
    type Engine: MapEngine;

    fn bind(&self, assets: &AttachedAssets) -> Result<Self::Engine, EngineError>;
}

#[derive(Debug, Clone)]
pub enum EngineError {
    /// The attached assets do not provide the library.
    MissingLibrary(String),
    /// Another map is already bound to the container.
    ContainerBusy(ContainerId),
    Rejected(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::MissingLibrary(name) => write!(f, "Mapping library missing: {}", name),
            EngineError::ContainerBusy(container) => {
                write!(f, "Container already holds a map: {}", container)
            }
            EngineError::Rejected(msg) => write!(f, "Engine rejected operation: {}", msg),
        }
    }
}

impl std::error::Error for EngineError {}
