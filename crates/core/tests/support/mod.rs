#![allow(dead_code)]

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use futures_util::future::BoxFuture;
use geo::Point;
use parking_lot::Mutex;
use pointmap_core::{
    map::{
        ContainerId, EngineBinder, EngineError, MapEngine, TileLayerOptions, ViewOptions,
        icon::IconSpec,
    },
    resource::{
        bundle::ResourceBundle,
        fetcher::{AssetLoader, FetchError, LoadedAsset},
        gate::AttachedAssets,
        reference::ResourceReference,
    },
};
use tokio::sync::Semaphore;

pub fn test_bundle() -> ResourceBundle {
    let mut bundle = ResourceBundle::new("test");
    bundle.insert(ResourceReference::stylesheet("https://cdn.test/map.css"));
    bundle.insert(ResourceReference::script("https://cdn.test/map.js"));
    bundle
}

/// Counts loads; each load waits for a permit unless the loader is open.
pub struct CountingLoader {
    pub calls: AtomicUsize,
    permits: Arc<Semaphore>,
    fail: bool,
}

impl CountingLoader {
    pub fn open() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            permits: Arc::new(Semaphore::new(Semaphore::MAX_PERMITS)),
            fail: false,
        })
    }

    pub fn gated() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            permits: Arc::new(Semaphore::new(0)),
            fail: false,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            permits: Arc::new(Semaphore::new(Semaphore::MAX_PERMITS)),
            fail: true,
        })
    }

    pub fn release(&self, loads: usize) {
        self.permits.add_permits(loads);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl AssetLoader for CountingLoader {
    fn load(&self, reference: &ResourceReference) -> BoxFuture<'static, Result<LoadedAsset, FetchError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let permits = Arc::clone(&self.permits);
        let reference = reference.clone();
        let fail = self.fail;

        Box::pin(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|e| FetchError::Network(e.to_string()))?;
            if fail {
                return Err(FetchError::NotFound(reference.id().to_string()));
            }
            let body = format!("/* {} */", reference.file_name());
            Ok(LoadedAsset::new(reference, body))
        })
    }
}

#[derive(Debug, Default)]
pub struct EngineLog {
    pub maps_created: usize,
    pub maps_removed: usize,
    pub tile_layers: usize,
    pub markers_created: usize,
    pub markers_removed: usize,
    pub popups: Vec<String>,
    pub containers: Vec<ContainerId>,
}

impl EngineLog {
    pub fn live_maps(&self) -> usize {
        self.maps_created - self.maps_removed
    }

    pub fn live_markers(&self) -> usize {
        self.markers_created - self.markers_removed
    }
}

#[derive(Clone, Default)]
pub struct FakeBinder {
    pub log: Arc<Mutex<EngineLog>>,
    pub refuse: bool,
}

impl EngineBinder for FakeBinder {
    type Engine = FakeEngine;

    fn bind(&self, assets: &AttachedAssets) -> Result<FakeEngine, EngineError> {
        if self.refuse || assets.is_empty() {
            return Err(EngineError::MissingLibrary("fake".to_string()));
        }
        Ok(FakeEngine {
            log: Arc::clone(&self.log),
        })
    }
}

pub struct FakeEngine {
    log: Arc<Mutex<EngineLog>>,
}

pub struct FakeMarker {
    pub position: Point,
    pub popup: Option<String>,
}

impl MapEngine for FakeEngine {
    type Map = Vec<Point>;
    type Marker = FakeMarker;

    fn create_map(&mut self, container: &ContainerId, _view: &ViewOptions) -> Result<Self::Map, EngineError> {
        let mut log = self.log.lock();
        log.maps_created += 1;
        log.containers.push(container.clone());
        Ok(Vec::new())
    }

    fn add_tile_layer(&mut self, _map: &mut Self::Map, _layer: &TileLayerOptions) -> Result<(), EngineError> {
        self.log.lock().tile_layers += 1;
        Ok(())
    }

    fn create_marker(
        &mut self,
        map: &mut Self::Map,
        position: Point,
        _icon: &IconSpec,
    ) -> Result<Self::Marker, EngineError> {
        self.log.lock().markers_created += 1;
        map.push(position);
        Ok(FakeMarker {
            position,
            popup: None,
        })
    }

    fn bind_popup(&mut self, marker: &mut Self::Marker, text: &str) {
        marker.popup = Some(text.to_string());
        self.log.lock().popups.push(text.to_string());
    }

    fn remove_marker(&mut self, map: &mut Self::Map, marker: Self::Marker) {
        self.log.lock().markers_removed += 1;
        if let Some(index) = map.iter().position(|p| *p == marker.position) {
            map.remove(index);
        }
    }

    fn remove_map(&mut self, _map: Self::Map) {
        self.log.lock().maps_removed += 1;
    }
}
