use std::sync::Arc;

use pointmap_core::{
    map::{
        ContainerId,
        lifecycle::{LifecycleError, MapLifecycle, MarkerReport, Phase, PointsUpdate},
        marker::PointDescriptor,
    },
    resource::{
        fetcher::{AssetLoader, FileAssetLoader, HttpAssetLoader, LoadedAsset},
        gate::{ResourceGate, ResourceState},
    },
};

use crate::{
    config::ViewerConfig,
    document::{Document, DocumentLoader},
    render::{PageBody, render_page},
    scene::{MarkerView, Scene, SceneBinder},
};

/// One mounted map and the page that shows it.
pub struct ViewState {
    config: ViewerConfig,
    container: ContainerId,
    document: Arc<Document>,
    gate: ResourceGate,
    scene: Scene,
    lifecycle: MapLifecycle<SceneBinder>,
}

impl ViewState {
    /// Loads assets from `asset_dir` when configured, over HTTP otherwise.
    ///
    /// Assets another view already attached through a shared gate are not
    /// loaded again; a successful mount copies them into this view's head.
    pub fn new(config: ViewerConfig, gate: ResourceGate) -> Self {
        let source: Arc<dyn AssetLoader> = match &config.asset_dir {
            Some(dir) => Arc::new(FileAssetLoader::new(dir)),
            None => Arc::new(HttpAssetLoader::new()),
        };
        Self::with_source(config, gate, source)
    }

    pub fn with_source(config: ViewerConfig, gate: ResourceGate, source: Arc<dyn AssetLoader>) -> Self {
        let document = Arc::new(Document::new());
        let scene = Scene::new();
        let loader = DocumentLoader::new(source, Arc::clone(&document));

        let lifecycle = MapLifecycle::new(SceneBinder::new(scene.clone()), Arc::new(loader))
            .with_gate(gate.clone())
            .with_view(config.view.clone())
            .with_tile_layer(config.tiles.clone());

        Self {
            container: config.container_id(),
            config,
            document,
            gate,
            scene,
            lifecycle,
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.lifecycle.phase()
    }

    pub async fn mount(&self) -> Result<MarkerReport, LifecycleError> {
        let report = self
            .lifecycle
            .on_mount(self.container.clone(), &self.config.bundle)
            .await?;
        self.seed_head();
        Ok(report)
    }

    fn seed_head(&self) {
        let attached = self.document.references();

        for reference in self.config.bundle.resources() {
            if attached.iter().any(|existing| existing.id() == reference.id()) {
                continue;
            }
            if let ResourceState::Ready(asset) = self.gate.state(reference.id()) {
                tracing::debug!(url = reference.id(), "reusing asset attached by another view");
                self.document.attach(LoadedAsset::clone(&asset));
            }
        }
    }

    pub fn update_points(&self, points: Vec<PointDescriptor>) -> Result<PointsUpdate, LifecycleError> {
        self.lifecycle.on_points_change(points)
    }

    pub fn unmount(&self) -> bool {
        self.lifecycle.on_unmount()
    }

    pub fn asset(&self, index: usize) -> Option<LoadedAsset> {
        self.document.asset(index)
    }

    pub fn markers(&self) -> Vec<MarkerView> {
        self.scene
            .snapshot(&self.container)
            .map(|snapshot| snapshot.marker_views())
            .unwrap_or_default()
    }

    pub fn page(&self) -> String {
        let head = self.document.render_head();
        let container = self.container.as_str();

        match self.lifecycle.phase() {
            Phase::Ready => match self.scene.snapshot(&self.container) {
                Some(snapshot) => render_page(&head, container, PageBody::Map(&snapshot)),
                None => render_page(&head, container, PageBody::Loading),
            },
            Phase::Failed => {
                let reason = self
                    .lifecycle
                    .failure()
                    .map(|error| error.to_string())
                    .unwrap_or_default();
                render_page(&head, container, PageBody::Fallback { reason: &reason })
            }
            Phase::Unmounted | Phase::AwaitingResource => {
                render_page(&head, container, PageBody::Loading)
            }
        }
    }
}
