mod routes;

use std::{net::SocketAddr, sync::Arc};

use tokio::sync::oneshot;

use crate::state::ViewState;

pub use routes::create_router;

#[derive(Debug)]
pub enum ServerError {
    IoError(std::io::Error),
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerError::IoError(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServerError::IoError(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for ServerError {
    fn from(e: std::io::Error) -> Self {
        ServerError::IoError(e)
    }
}

/// Serves the map page until dropped.
pub struct MapServer {
    local_addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MapServer {
    pub async fn start(state: Arc<ViewState>, listen: SocketAddr) -> Result<Self, ServerError> {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let listener = tokio::net::TcpListener::bind(listen).await?;
        let local_addr = listener.local_addr()?;
        let app = create_router(state);

        tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;

            if let Err(error) = served {
                tracing::error!(%error, "map server stopped");
            }
        });

        tracing::info!(%local_addr, "map server listening");
        Ok(Self {
            local_addr,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl Drop for MapServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
