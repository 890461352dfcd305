use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::{
    map::{
        ContainerId, EngineBinder, EngineError, MapEngine, TileLayerOptions, ViewOptions,
        marker::{InvalidPoint, PointDescriptor, to_markers},
    },
    resource::{
        bundle::ResourceBundle,
        fetcher::AssetLoader,
        gate::{AttachedAssets, GateError, ResourceGate},
    },
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Unmounted,
    AwaitingResource,
    Ready,
    Failed,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Unmounted => "unmounted",
            Phase::AwaitingResource => "awaiting resource",
            Phase::Ready => "ready",
            Phase::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MarkerReport {
    pub applied: usize,
    pub rejected: Vec<InvalidPoint>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PointsUpdate {
    /// Not mounted yet; the list is applied by the next successful mount.
    Deferred,
    /// Same content as the markers already shown.
    Unchanged,
    Applied(MarkerReport),
}

struct Mounted<E: MapEngine> {
    container: ContainerId,
    engine: E,
    map: E::Map,
    markers: Vec<E::Marker>,
    applied: Vec<PointDescriptor>,
}

impl<E: MapEngine> Mounted<E> {
    /// Replace the whole marker set with markers for `points`.
    fn apply(&mut self, points: &[PointDescriptor]) -> Result<MarkerReport, EngineError> {
        self.clear_markers();
        self.applied.clear();

        let batch = to_markers(points);
        for invalid in &batch.rejected {
            tracing::warn!(container = %self.container, "{invalid}");
        }

        for spec in &batch.markers {
            let mut marker = self
                .engine
                .create_marker(&mut self.map, spec.position, &spec.icon)?;
            self.engine.bind_popup(&mut marker, &spec.label);
            self.markers.push(marker);
        }

        self.applied = points.to_vec();
        Ok(MarkerReport {
            applied: batch.markers.len(),
            rejected: batch.rejected,
        })
    }

    fn clear_markers(&mut self) {
        for marker in self.markers.drain(..) {
            self.engine.remove_marker(&mut self.map, marker);
        }
    }

    fn teardown(mut self) {
        self.clear_markers();
        self.engine.remove_map(self.map);
    }
}

enum Slot<E: MapEngine> {
    Unmounted,
    Awaiting {
        container: ContainerId,
        cancel: CancellationToken,
    },
    Ready(Mounted<E>),
    Failed {
        container: ContainerId,
        error: LifecycleError,
    },
}

impl<E: MapEngine> Slot<E> {
    fn phase(&self) -> Phase {
        match self {
            Slot::Unmounted => Phase::Unmounted,
            Slot::Awaiting { .. } => Phase::AwaitingResource,
            Slot::Ready(_) => Phase::Ready,
            Slot::Failed { .. } => Phase::Failed,
        }
    }
}

struct Inner<E: MapEngine> {
    slot: Slot<E>,
    desired: Vec<PointDescriptor>,
    /// Bumped on every mount so a stale wait can tell it was superseded.
    generation: u64,
}

/// Owns one map bound to one container across mount and unmount.
///
/// `on_mount` is the only method that suspends. Everything that touches the
/// engine runs under the lifecycle lock, and `on_unmount` takes the same lock,
/// so a resource that finishes after unmount never reaches the engine.
pub struct MapLifecycle<B: EngineBinder> {
    gate: ResourceGate,
    loader: Arc<dyn AssetLoader>,
    binder: B,
    view: ViewOptions,
    tiles: Option<TileLayerOptions>,
    inner: Mutex<Inner<B::Engine>>,
}

impl<B: EngineBinder> MapLifecycle<B> {
    /// A lifecycle on the process-wide gate with the default view and tiles.
    pub fn new(binder: B, loader: Arc<dyn AssetLoader>) -> Self {
        Self {
            gate: ResourceGate::global().clone(),
            loader,
            binder,
            view: ViewOptions::default(),
            tiles: Some(TileLayerOptions::default()),
            inner: Mutex::new(Inner {
                slot: Slot::Unmounted,
                desired: Vec::new(),
                generation: 0,
            }),
        }
    }

    pub fn with_gate(mut self, gate: ResourceGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_view(mut self, view: ViewOptions) -> Self {
        self.view = view;
        self
    }

    pub fn with_tile_layer(mut self, tiles: Option<TileLayerOptions>) -> Self {
        self.tiles = tiles;
        self
    }

    pub fn binder(&self) -> &B {
        &self.binder
    }

    pub fn phase(&self) -> Phase {
        self.inner.lock().slot.phase()
    }

    pub fn container(&self) -> Option<ContainerId> {
        match &self.inner.lock().slot {
            Slot::Unmounted => None,
            Slot::Awaiting { container, .. } | Slot::Failed { container, .. } => {
                Some(container.clone())
            }
            Slot::Ready(mounted) => Some(mounted.container.clone()),
        }
    }

    /// Why the current mount failed, while in [`Phase::Failed`].
    pub fn failure(&self) -> Option<LifecycleError> {
        match &self.inner.lock().slot {
            Slot::Failed { error, .. } => Some(error.clone()),
            _ => None,
        }
    }

    /// Number of markers currently attached to the map.
    pub fn marker_count(&self) -> usize {
        match &self.inner.lock().slot {
            Slot::Ready(mounted) => mounted.markers.len(),
            _ => 0,
        }
    }

    pub async fn on_mount(
        &self,
        container: ContainerId,
        bundle: &ResourceBundle,
    ) -> Result<MarkerReport, LifecycleError> {
        let (generation, cancel) = {
            let mut inner = self.inner.lock();
            if !matches!(inner.slot, Slot::Unmounted) {
                return Err(LifecycleError::DoubleMount {
                    phase: inner.slot.phase(),
                });
            }

            let cancel = CancellationToken::new();
            inner.generation += 1;
            inner.slot = Slot::Awaiting {
                container: container.clone(),
                cancel: cancel.clone(),
            };
            (inner.generation, cancel)
        };

        tracing::info!(%container, bundle = bundle.id(), "mounting map");
        let attached = self
            .gate
            .ensure_bundle(bundle, self.loader.as_ref(), &cancel)
            .await;

        let mut inner = self.inner.lock();
        if inner.generation != generation || !matches!(inner.slot, Slot::Awaiting { .. }) {
            tracing::debug!(%container, "mount superseded by unmount");
            return Err(LifecycleError::Cancelled);
        }

        let result = attached
            .map_err(LifecycleError::from)
            .and_then(|attached| {
                self.construct(&container, &attached, &inner.desired)
                    .map_err(LifecycleError::from)
            });

        match result {
            Ok((mounted, report)) => {
                tracing::info!(
                    %container,
                    markers = report.applied,
                    rejected = report.rejected.len(),
                    "map ready"
                );
                inner.slot = Slot::Ready(mounted);
                Ok(report)
            }
            Err(error) => {
                tracing::warn!(%container, %error, "map mount failed");
                inner.slot = Slot::Failed {
                    container,
                    error: error.clone(),
                };
                Err(error)
            }
        }
    }

    /// Set the points to display. Markers are rebuilt only when the content
    /// differs from what is already shown.
    pub fn on_points_change(
        &self,
        points: Vec<PointDescriptor>,
    ) -> Result<PointsUpdate, LifecycleError> {
        let mut guard = self.inner.lock();
        let Inner { slot, desired, .. } = &mut *guard;
        *desired = points;

        let Slot::Ready(mounted) = slot else {
            return Ok(PointsUpdate::Deferred);
        };

        if mounted.applied == *desired {
            return Ok(PointsUpdate::Unchanged);
        }

        let report = mounted.apply(desired)?;
        tracing::debug!(
            container = %mounted.container,
            markers = report.applied,
            "marker set replaced"
        );
        Ok(PointsUpdate::Applied(report))
    }

    /// Tear down whatever this lifecycle holds. Returns `false` if there was
    /// nothing to do.
    pub fn on_unmount(&self) -> bool {
        let mut inner = self.inner.lock();
        let previous = std::mem::replace(&mut inner.slot, Slot::Unmounted);

        match previous {
            Slot::Unmounted => false,
            Slot::Awaiting { container, cancel } => {
                tracing::info!(%container, "unmounted while awaiting resources");
                cancel.cancel();
                true
            }
            Slot::Ready(mounted) => {
                tracing::info!(container = %mounted.container, "unmounting map");
                mounted.teardown();
                true
            }
            Slot::Failed { container, .. } => {
                tracing::debug!(%container, "cleared failed mount");
                true
            }
        }
    }

    fn construct(
        &self,
        container: &ContainerId,
        attached: &AttachedAssets,
        points: &[PointDescriptor],
    ) -> Result<(Mounted<B::Engine>, MarkerReport), EngineError> {
        let mut engine = self.binder.bind(attached)?;
        let mut map = engine.create_map(container, &self.view)?;

        if let Some(tiles) = &self.tiles {
            if let Err(error) = engine.add_tile_layer(&mut map, tiles) {
                engine.remove_map(map);
                return Err(error);
            }
        }

        let mut mounted = Mounted {
            container: container.clone(),
            engine,
            map,
            markers: Vec::new(),
            applied: Vec::new(),
        };

        match mounted.apply(points) {
            Ok(report) => Ok((mounted, report)),
            Err(error) => {
                mounted.teardown();
                Err(error)
            }
        }
    }
}

impl<B: EngineBinder> Drop for MapLifecycle<B> {
    fn drop(&mut self) {
        self.on_unmount();
    }
}

#[derive(Debug, Clone)]
pub enum LifecycleError {
    DoubleMount { phase: Phase },
    ResourceLoad(GateError),
    Engine(EngineError),
    /// Unmounted before the resources were ready.
    Cancelled,
}

impl std::fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleError::DoubleMount { phase } => {
                write!(f, "Map already mounted (phase: {})", phase)
            }
            LifecycleError::ResourceLoad(e) => write!(f, "{}", e),
            LifecycleError::Engine(e) => write!(f, "Map construction failed: {}", e),
            LifecycleError::Cancelled => write!(f, "Mount cancelled by unmount"),
        }
    }
}

impl std::error::Error for LifecycleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LifecycleError::ResourceLoad(e) => Some(e),
            LifecycleError::Engine(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GateError> for LifecycleError {
    fn from(e: GateError) -> Self {
        match e {
            GateError::Cancelled => LifecycleError::Cancelled,
            e => LifecycleError::ResourceLoad(e),
        }
    }
}

impl From<EngineError> for LifecycleError {
    fn from(e: EngineError) -> Self {
        LifecycleError::Engine(e)
    }
}
