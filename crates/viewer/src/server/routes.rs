use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, put};
use pointmap_core::map::{
    lifecycle::{LifecycleError, PointsUpdate},
    marker::PointDescriptor,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};

use crate::{scene::MarkerView, state::ViewState};

type SharedState = Arc<ViewState>;

pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(serve_page))
        .route("/assets/{index}", get(serve_asset))
        .route("/markers.json", get(serve_markers))
        .route("/points", put(replace_points))
        .route("/health", get(health))
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}

async fn serve_page(State(state): State<SharedState>) -> Html<String> {
    Html(state.page())
}

async fn serve_asset(State(state): State<SharedState>, Path(index): Path<usize>) -> Response {
    match state.asset(index) {
        Some(asset) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, asset.reference().kind().content_type())],
            asset.body().clone(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn serve_markers(State(state): State<SharedState>) -> Json<Vec<MarkerView>> {
    Json(state.markers())
}

#[derive(Debug, Serialize)]
struct RejectedPoint {
    index: usize,
    reason: String,
}

#[derive(Debug, Serialize)]
struct PointsResponse {
    status: &'static str,
    applied: usize,
    rejected: Vec<RejectedPoint>,
}

async fn replace_points(
    State(state): State<SharedState>,
    Json(points): Json<Vec<PointDescriptor>>,
) -> Response {
    let update = match state.update_points(points) {
        Ok(update) => update,
        Err(error @ LifecycleError::Engine(_)) => {
            return (StatusCode::INTERNAL_SERVER_ERROR, error.to_string()).into_response();
        }
        Err(error) => return (StatusCode::CONFLICT, error.to_string()).into_response(),
    };

    let response = match update {
        PointsUpdate::Deferred => PointsResponse {
            status: "deferred",
            applied: 0,
            rejected: Vec::new(),
        },
        PointsUpdate::Unchanged => PointsResponse {
            status: "unchanged",
            applied: state.markers().len(),
            rejected: Vec::new(),
        },
        PointsUpdate::Applied(report) => PointsResponse {
            status: "applied",
            applied: report.applied,
            rejected: report
                .rejected
                .iter()
                .map(|invalid| RejectedPoint {
                    index: invalid.index,
                    reason: invalid.reason.to_string(),
                })
                .collect(),
        },
    };

    Json(response).into_response()
}

async fn health() -> &'static str {
    "OK"
}
