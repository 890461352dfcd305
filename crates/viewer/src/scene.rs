use std::{collections::HashMap, sync::Arc};

use geo::Point;
use parking_lot::RwLock;
use pointmap_core::{
    map::{
        ContainerId, EngineBinder, EngineError, MapEngine, TileLayerOptions, ViewOptions,
        icon::IconSpec,
    },
    resource::{gate::AttachedAssets, reference::ResourceKind},
};
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct PlacedMarker {
    id: u64,
    pub position: Point,
    pub icon: IconSpec,
    pub popup: Option<String>,
}

/// Everything the page needs to draw one map.
#[derive(Debug, Clone)]
pub struct MapSnapshot {
    pub container: ContainerId,
    pub view: ViewOptions,
    pub tiles: Vec<TileLayerOptions>,
    pub markers: Vec<PlacedMarker>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerView {
    pub lat: f64,
    pub lng: f64,
    pub color: String,
    pub label: Option<String>,
}

impl MapSnapshot {
    pub fn marker_views(&self) -> Vec<MarkerView> {
        self.markers
            .iter()
            .map(|marker| MarkerView {
                lat: marker.position.y(),
                lng: marker.position.x(),
                color: marker.icon.color.clone(),
                label: marker.popup.clone(),
            })
            .collect()
    }
}

#[derive(Default)]
struct SceneState {
    maps: HashMap<u64, MapSnapshot>,
    bound: HashMap<ContainerId, u64>,
    next_id: u64,
}

impl SceneState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// The maps currently alive, shared between the engine that edits them and
/// the server that draws them.
#[derive(Clone, Default)]
pub struct Scene {
    state: Arc<RwLock<SceneState>>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self, container: &ContainerId) -> Option<MapSnapshot> {
        let state = self.state.read();
        let id = state.bound.get(container)?;
        state.maps.get(id).cloned()
    }

    pub fn live_maps(&self) -> usize {
        self.state.read().maps.len()
    }
}

pub struct MapHandle {
    id: u64,
}

pub struct MarkerHandle {
    id: u64,
}

/// [`MapEngine`] that records maps into a [`Scene`] instead of drawing them.
pub struct SceneEngine {
    scene: Scene,
}

impl SceneEngine {
    fn with_map<T>(
        &self,
        map: &MapHandle,
        f: impl FnOnce(&mut MapSnapshot) -> T,
    ) -> Result<T, EngineError> {
        let mut state = self.scene.state.write();
        let snapshot = state
            .maps
            .get_mut(&map.id)
            .ok_or_else(|| EngineError::Rejected(format!("map {} was removed", map.id)))?;
        Ok(f(snapshot))
    }
}

impl MapEngine for SceneEngine {
    type Map = MapHandle;
    type Marker = MarkerHandle;

    fn create_map(&mut self, container: &ContainerId, view: &ViewOptions) -> Result<MapHandle, EngineError> {
        let mut state = self.scene.state.write();
        if state.bound.contains_key(container) {
            return Err(EngineError::ContainerBusy(container.clone()));
        }

        let id = state.next_id();
        state.bound.insert(container.clone(), id);
        state.maps.insert(
            id,
            MapSnapshot {
                container: container.clone(),
                view: view.clone(),
                tiles: Vec::new(),
                markers: Vec::new(),
            },
        );

        Ok(MapHandle { id })
    }

    fn add_tile_layer(&mut self, map: &mut MapHandle, layer: &TileLayerOptions) -> Result<(), EngineError> {
        self.with_map(map, |snapshot| snapshot.tiles.push(layer.clone()))
    }

    fn create_marker(
        &mut self,
        map: &mut MapHandle,
        position: Point,
        icon: &IconSpec,
    ) -> Result<MarkerHandle, EngineError> {
        let id = self.scene.state.write().next_id();
        self.with_map(map, |snapshot| {
            snapshot.markers.push(PlacedMarker {
                id,
                position,
                icon: icon.clone(),
                popup: None,
            })
        })?;

        Ok(MarkerHandle { id })
    }

    fn bind_popup(&mut self, marker: &mut MarkerHandle, text: &str) {
        let mut state = self.scene.state.write();
        let placed = state
            .maps
            .values_mut()
            .flat_map(|snapshot| snapshot.markers.iter_mut())
            .find(|placed| placed.id == marker.id);

        if let Some(placed) = placed {
            placed.popup = Some(text.to_string());
        }
    }

    fn remove_marker(&mut self, map: &mut MapHandle, marker: MarkerHandle) {
        let _ = self.with_map(map, |snapshot| {
            snapshot.markers.retain(|placed| placed.id != marker.id)
        });
    }

    fn remove_map(&mut self, map: MapHandle) {
        let mut state = self.scene.state.write();
        if let Some(snapshot) = state.maps.remove(&map.id) {
            state.bound.remove(&snapshot.container);
        }
    }
}

/// Binds a [`SceneEngine`] once a script has been attached.
#[derive(Clone, Default)]
pub struct SceneBinder {
    scene: Scene,
}

impl SceneBinder {
    pub fn new(scene: Scene) -> Self {
        Self { scene }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }
}

impl EngineBinder for SceneBinder {
    type Engine = SceneEngine;

    fn bind(&self, assets: &AttachedAssets) -> Result<SceneEngine, EngineError> {
        let has_library = assets
            .of_kind(ResourceKind::Script)
            .any(|asset| !asset.body().is_empty());

        if !has_library {
            return Err(EngineError::MissingLibrary(format!(
                "bundle {} attached no script",
                assets.bundle_id()
            )));
        }

        Ok(SceneEngine {
            scene: self.scene.clone(),
        })
    }
}
