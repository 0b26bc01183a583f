//! Route table and endpoint handlers

use super::reply::{self, Outcome};
use super::AppState;
use canary_core::Result;
use hyper::{Body, Request, Response, StatusCode};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::debug;

/// hyper service entry point
pub async fn handle(
    state: Arc<AppState>,
    req: Request<Body>,
) -> std::result::Result<Response<Body>, Infallible> {
    let response = route(&state, &req).await;
    debug!(
        method = %req.method(),
        path = req.uri().path(),
        status = response.status().as_u16(),
        "handled request"
    );
    Ok(response)
}

async fn route(state: &AppState, req: &Request<Body>) -> Response<Body> {
    // Any other path or method is a liveness check: empty 200
    match req.uri().path() {
        "/list" => {
            let path = list_path(req.uri().query());
            reply::finalize(&state.pod, list(state, &path).await)
        }
        "/write-storage" => reply::finalize(&state.pod, write_storage(state).await),
        "/read-storage" => reply::finalize(&state.pod, read_storage(state).await),
        _ => reply::empty(StatusCode::OK),
    }
}

/// `path` query parameter, `/` when missing or blank
fn list_path(query: Option<&str>) -> String {
    query
        .and_then(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .find(|(key, _)| key == "path")
                .map(|(_, value)| value.into_owned())
        })
        .filter(|path| !path.is_empty())
        .unwrap_or_else(|| "/".to_string())
}

async fn list(state: &AppState, path: &str) -> Result<Outcome> {
    let files = state.lister.list(path).await?;
    debug!(path, entries = files.len(), "listed remote directory");
    Ok(Outcome::Listing(files))
}

async fn write_storage(state: &AppState) -> Result<Outcome> {
    let ts = state.scalar.write().await?;
    Ok(Outcome::Message(format!("current time written to store: {ts}")))
}

async fn read_storage(state: &AppState) -> Result<Outcome> {
    let content = state.scalar.read().await?;
    Ok(Outcome::Message(format!("last time written to store: {content}")))
}
