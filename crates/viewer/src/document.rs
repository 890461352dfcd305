use std::sync::Arc;

use futures_util::future::BoxFuture;
use parking_lot::RwLock;
use pointmap_core::resource::{
    fetcher::{AssetLoader, FetchError, LoadedAsset},
    reference::{ResourceKind, ResourceReference},
};

/// The page's `<head>`: every asset attached so far, in attach order.
#[derive(Default)]
pub struct Document {
    head: RwLock<Vec<LoadedAsset>>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an asset, returning its position in the head. An asset whose
    /// URL is already present replaces the earlier body in place.
    pub fn attach(&self, asset: LoadedAsset) -> usize {
        let mut head = self.head.write();

        if let Some(index) = head
            .iter()
            .position(|existing| existing.reference().id() == asset.reference().id())
        {
            head[index] = asset;
            return index;
        }

        head.push(asset);
        head.len() - 1
    }

    pub fn asset(&self, index: usize) -> Option<LoadedAsset> {
        self.head.read().get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.head.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.head.read().is_empty()
    }

    pub fn references(&self) -> Vec<ResourceReference> {
        self.head
            .read()
            .iter()
            .map(|asset| asset.reference().clone())
            .collect()
    }

    /// Head markup, with every asset served from `/assets/{index}`.
    pub fn render_head(&self) -> String {
        let mut html = String::new();

        for (index, reference) in self.references().iter().enumerate() {
            match reference.kind() {
                ResourceKind::Stylesheet => {
                    html.push_str(&format!(
                        "<link rel=\"stylesheet\" href=\"/assets/{index}\">\n"
                    ));
                }
                ResourceKind::Script => {
                    html.push_str(&format!("<script src=\"/assets/{index}\"></script>\n"));
                }
            }
        }

        html
    }
}

/// Attaches every successful load to a [`Document`].
pub struct DocumentLoader {
    inner: Arc<dyn AssetLoader>,
    document: Arc<Document>,
}

impl DocumentLoader {
    pub fn new(inner: Arc<dyn AssetLoader>, document: Arc<Document>) -> Self {
        Self { inner, document }
    }
}

impl AssetLoader for DocumentLoader {
    fn load(&self, reference: &ResourceReference) -> BoxFuture<'static, Result<LoadedAsset, FetchError>> {
        let load = self.inner.load(reference);
        let document = Arc::clone(&self.document);

        Box::pin(async move {
            let asset = load.await?;
            let index = document.attach(asset.clone());
            tracing::debug!(url = asset.reference().id(), index, "attached to document head");
            Ok::<_, FetchError>(asset)
        })
    }
}
