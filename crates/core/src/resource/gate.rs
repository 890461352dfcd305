use std::{
    collections::HashMap,
    future::Future,
    panic::AssertUnwindSafe,
    sync::{Arc, LazyLock},
};

use futures_util::FutureExt;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::resource::{
    bundle::ResourceBundle,
    fetcher::{AssetLoader, FetchError, LoadedAsset},
    reference::{ResourceKind, ResourceReference},
};

#[derive(Debug, Clone)]
pub enum ResourceState {
    Unattached,
    Attaching,
    Ready(Arc<LoadedAsset>),
    Failed(Arc<FetchError>),
    /// The load panicked before reporting an outcome.
    Abandoned,
}

impl ResourceState {
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            ResourceState::Ready(_) | ResourceState::Failed(_) | ResourceState::Abandoned
        )
    }
}

/// At-most-once attachment of external resources.
///
/// Each URL gets one slot for the lifetime of the gate. The first `ensure`
/// for a URL starts the load on its own task; everyone else, including later
/// callers, subscribes to the same outcome. A failed slot stays failed until
/// [`ResourceGate::reset`] drops it.
///
/// Cancelling a waiter only stops that waiter. The load keeps running for the
/// others, which is why the loader's future must be `'static`.
#[derive(Clone, Default)]
pub struct ResourceGate {
    slots: Arc<Mutex<HashMap<Arc<str>, watch::Receiver<ResourceState>>>>,
}

static GLOBAL_GATE: LazyLock<ResourceGate> = LazyLock::new(ResourceGate::new);

impl ResourceGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide gate.
    pub fn global() -> &'static ResourceGate {
        &GLOBAL_GATE
    }

    /// Wait until `reference` is attached, starting the load with `loader`
    /// if nobody has yet. Must be called from within a tokio runtime.
    pub async fn ensure<F, Fut>(
        &self,
        reference: &ResourceReference,
        loader: F,
        cancel: &CancellationToken,
    ) -> Result<Arc<LoadedAsset>, GateError>
    where
        F: FnOnce(&ResourceReference) -> Fut,
        Fut: Future<Output = Result<LoadedAsset, FetchError>> + Send + 'static,
    {
        if cancel.is_cancelled() {
            return Err(GateError::Cancelled);
        }

        let mut state = self.subscribe(reference, loader);

        let settled = async {
            state
                .wait_for(ResourceState::is_settled)
                .await
                .map(|state| state.clone())
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(url = reference.id(), "resource wait cancelled");
                Err(GateError::Cancelled)
            }
            settled = settled => match settled {
                Ok(ResourceState::Ready(asset)) => Ok(asset),
                Ok(ResourceState::Failed(error)) => Err(GateError::Load(error)),
                _ => Err(GateError::Abandoned(reference.id().to_string())),
            },
        }
    }

    /// Ensure every resource of `bundle` in order. The first failure stops the
    /// walk; resources already attached stay attached.
    pub async fn ensure_bundle<L>(
        &self,
        bundle: &ResourceBundle,
        loader: &L,
        cancel: &CancellationToken,
    ) -> Result<AttachedAssets, GateError>
    where
        L: AssetLoader + ?Sized,
    {
        let mut assets = Vec::with_capacity(bundle.len());

        for reference in bundle.resources() {
            let asset = self
                .ensure(reference, |reference| loader.load(reference), cancel)
                .await?;
            assets.push(asset);
        }

        Ok(AttachedAssets {
            bundle_id: bundle.id().into(),
            assets,
        })
    }

    pub fn state(&self, url: &str) -> ResourceState {
        self.slots
            .lock()
            .get(url)
            .map(|state| state.borrow().clone())
            .unwrap_or(ResourceState::Unattached)
    }

    /// Forget a resource so the next `ensure` loads it again. Waiters already
    /// subscribed to an in-flight load still receive its outcome.
    pub fn reset(&self, url: &str) -> bool {
        self.slots.lock().remove(url).is_some()
    }

    pub fn clear(&self) {
        self.slots.lock().clear();
    }

    fn subscribe<F, Fut>(&self, reference: &ResourceReference, loader: F) -> watch::Receiver<ResourceState>
    where
        F: FnOnce(&ResourceReference) -> Fut,
        Fut: Future<Output = Result<LoadedAsset, FetchError>> + Send + 'static,
    {
        let sender = {
            let mut slots = self.slots.lock();
            if let Some(state) = slots.get(reference.id()) {
                return state.clone();
            }

            let (sender, receiver) = watch::channel(ResourceState::Attaching);
            slots.insert(reference.shared_id(), receiver);
            sender
        };

        // the slot is claimed, so the loader runs outside the lock
        tracing::debug!(url = reference.id(), kind = ?reference.kind(), "attaching resource");
        let receiver = sender.subscribe();
        let load = loader(reference);
        let url = reference.shared_id();

        tokio::spawn(async move {
            let state = match AssertUnwindSafe(load).catch_unwind().await {
                Ok(Ok(asset)) => {
                    tracing::debug!(url = &*url, "resource ready");
                    ResourceState::Ready(Arc::new(asset))
                }
                Ok(Err(error)) => {
                    tracing::warn!(url = &*url, %error, "resource failed to load");
                    ResourceState::Failed(Arc::new(error))
                }
                Err(_) => {
                    tracing::error!(url = &*url, "resource load panicked");
                    ResourceState::Abandoned
                }
            };
            sender.send_replace(state);
        });

        receiver
    }
}

/// Every asset of a bundle, attached. Engines are bound from this value.
#[derive(Debug, Clone)]
pub struct AttachedAssets {
    bundle_id: Arc<str>,
    assets: Vec<Arc<LoadedAsset>>,
}

impl AttachedAssets {
    pub fn bundle_id(&self) -> &str {
        &self.bundle_id
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<LoadedAsset>> {
        self.assets.iter()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn get(&self, url: &str) -> Option<&Arc<LoadedAsset>> {
        self.assets.iter().find(|asset| asset.reference().id() == url)
    }

    pub fn of_kind(&self, kind: ResourceKind) -> impl Iterator<Item = &Arc<LoadedAsset>> {
        self.assets
            .iter()
            .filter(move |asset| asset.reference().kind() == kind)
    }
}

#[derive(Debug, Clone)]
pub enum GateError {
    Load(Arc<FetchError>),
    Cancelled,
    /// The load task went away without reporting an outcome.
    Abandoned(String),
}

impl std::fmt::Display for GateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GateError::Load(e) => write!(f, "Resource load failed: {}", e),
            GateError::Cancelled => write!(f, "Resource wait cancelled"),
            GateError::Abandoned(url) => write!(f, "Resource load abandoned: {}", url),
        }
    }
}

impl std::error::Error for GateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GateError::Load(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}
