//! Axum HTTP transport: `POST /rpc`, the well-known agent-card endpoint, and
//! a minimal status page (§4.6, §6).

use std::net::SocketAddr;

use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::{Json, Router};
use orc_core::protocol::{RpcRequest, RpcResponse};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::rpc::route_rpc;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/rpc", post(rpc_handler))
        .route("/.well-known/agent-card.json", get(agent_card_handler))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any))
        .with_state(state)
}

pub async fn serve(state: AppState, port: u16) -> anyhow::Result<()> {
    let app = build_router(state);
    let bind_addr: SocketAddr = format!("0.0.0.0:{port}").parse().expect("invalid bind address");
    info!("orchestration gateway listening on {bind_addr}");
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn rpc_handler(State(state): State<AppState>, Json(req): Json<RpcRequest>) -> impl IntoResponse {
    tracing::debug!(method = %req.method, "dispatching rpc request");
    match route_rpc(&req.method, req.params, &state).await {
        Ok(result) => Json(RpcResponse::ok(req.id, result)),
        Err((code, message)) => {
            tracing::warn!(method = %req.method, code, %message, "rpc handler failed");
            Json(RpcResponse::err(req.id, code, message))
        }
    }
}

#[derive(Debug, Deserialize)]
struct AgentCardQuery {
    slug: Option<String>,
}

async fn agent_card_handler(State(state): State<AppState>, Query(query): Query<AgentCardQuery>) -> impl IntoResponse {
    let Some(slug) = query.slug.filter(|s| !s.is_empty()) else {
        return (axum::http::StatusCode::BAD_REQUEST, "missing slug").into_response();
    };
    let agent = match state.store.get_agent_by_slug(&slug).await {
        Ok(Some(agent)) => agent,
        Ok(None) => return (axum::http::StatusCode::NOT_FOUND, "agent not found").into_response(),
        Err(err) => return (axum::http::StatusCode::INTERNAL_SERVER_ERROR, err.message()).into_response(),
    };
    let Some(card) = agent.metadata.card.clone() else {
        return (axum::http::StatusCode::NOT_FOUND, "card not found").into_response();
    };
    Json(card).into_response()
}

/// Minimal status page: liveness and version only, no JavaScript and no
/// calls back into `/rpc` (§6).
async fn index_handler() -> Html<String> {
    let version = env!("CARGO_PKG_VERSION");
    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>orchestration gateway</title>
<style>
body {{ font-family: monospace; background: #111; color: #ddd; padding: 2rem; }}
h1 {{ color: #9ad; }}
.ok {{ color: #6c6; }}
</style>
</head>
<body>
<h1>orchestration gateway</h1>
<p class="ok">status: running</p>
<p>version: {version}</p>
<p>JSON-RPC endpoint: POST /rpc</p>
</body>
</html>"#
    ))
}
