use std::net::SocketAddr;

use axum::{Router, http::StatusCode, routing::get};
use pointmap_core::resource::{
    fetcher::{AssetLoader, FetchError, HttpAssetLoader},
    reference::{ResourceReference, digest},
};

const SCRIPT_BODY: &str = "window.L = {};";

async fn serve() -> SocketAddr {
    let app = Router::new()
        .route("/leaflet.js", get(|| async { SCRIPT_BODY }))
        .route(
            "/broken.js",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn fetches_and_verifies_the_body() {
    let addr = serve().await;
    let reference = ResourceReference::script(format!("http://{addr}/leaflet.js"))
        .with_integrity(digest(SCRIPT_BODY.as_bytes()));

    let asset = HttpAssetLoader::new().load(&reference).await.unwrap();

    assert_eq!(asset.body().as_ref(), SCRIPT_BODY.as_bytes());
    assert_eq!(asset.reference(), &reference);
}

#[tokio::test]
async fn missing_resource_is_not_found() {
    let addr = serve().await;
    let reference = ResourceReference::script(format!("http://{addr}/absent.js"));

    let result = HttpAssetLoader::new().load(&reference).await;

    assert!(matches!(result, Err(FetchError::NotFound(ref url)) if url == reference.id()));
}

#[tokio::test]
async fn server_error_is_a_network_failure() {
    let addr = serve().await;
    let reference = ResourceReference::script(format!("http://{addr}/broken.js"));

    let result = HttpAssetLoader::new().load(&reference).await;

    assert!(matches!(result, Err(FetchError::Network(ref message)) if message.contains("500")));
}

#[tokio::test]
async fn tampered_body_fails_integrity() {
    let addr = serve().await;
    let reference = ResourceReference::script(format!("http://{addr}/leaflet.js"))
        .with_integrity(digest(b"window.L = { tampered: true };"));

    let result = HttpAssetLoader::new().load(&reference).await;

    assert!(matches!(
        result,
        Err(FetchError::IntegrityMismatch { expected, actual })
            if expected != actual && actual == digest(SCRIPT_BODY.as_bytes())
    ));
}
