//! HTTP endpoints
//!
//! - `GET /health`
//! - `GET /datasets`: registered datasets and their sections
//! - `GET /query?q=&skip=&limit=`: one page of a query's items
//! - `GET /schema?q=`: properties of a query's result

use axum::extract::{Query as UrlQuery, Request, State};
use axum::http::HeaderValue;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tabula_algebra::{paginate, AlgebraError, Collection, Key, Kind, Operator, Properties};
use tabula_ast::{compile, Query};
use tabula_registry::{Dataset, DatasetRegistry};
use tracing::{debug, info, info_span, Instrument, Span};
use uuid::Uuid;

use crate::config::QueryConfig;
use crate::error::ApiResult;

/// State shared by all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub registry: Arc<DatasetRegistry>,
    pub paging: QueryConfig,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/datasets", get(list_datasets))
        .route("/query", get(run_query))
        .route("/schema", get(get_schema))
        .layer(middleware::from_fn(request_span))
        .with_state(state)
}

/// Run each request inside a span carrying a fresh request id, and echo the
/// id back in `x-request-id`.
async fn request_span(request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4();
    let span = info_span!(
        "request",
        %request_id,
        method = %request.method(),
        path = %request.uri().path()
    );
    let mut response = next.run(request).instrument(span.clone()).await;
    span.in_scope(|| debug!(status = response.status().as_u16(), "response"));
    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Serialize)]
struct DatasetInfo {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    sections: Vec<String>,
}

async fn list_datasets(State(state): State<AppState>) -> Json<Vec<DatasetInfo>> {
    let datasets = state
        .registry
        .datasets()
        .map(|d| DatasetInfo {
            name: d.name().to_string(),
            title: d.title().map(str::to_string),
            sections: d.sections(),
        })
        .collect();
    Json(datasets)
}

#[derive(Debug, Deserialize)]
struct PageParams {
    q: String,
    #[serde(default)]
    skip: usize,
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct PageItem {
    key: Key,
    tuple: Value,
}

#[derive(Debug, Serialize)]
struct Page {
    id: String,
    fingerprint: String,
    kind: Kind,
    properties: Properties,
    skip: usize,
    limit: usize,
    items: Vec<PageItem>,
    /// Whether items remain after this page.
    more: bool,
}

/// The collection a query reads. `draw` has none here.
fn collection_of(query: &Query) -> ApiResult<&Operator> {
    match query {
        Query::Display(op) | Query::Table(op) => Ok(op),
        Query::Draw(dataset) => Err(AlgebraError::NotImplemented(format!("draw({})", dataset)).into()),
    }
}

/// Parsing and row iteration are synchronous, so they run off the async
/// workers, inside the request span.
async fn blocking<T, F>(work: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> ApiResult<T> + Send + 'static,
{
    let span = Span::current();
    tokio::task::spawn_blocking(move || span.in_scope(work)).await?
}

async fn run_query(State(state): State<AppState>, UrlQuery(params): UrlQuery<PageParams>) -> ApiResult<Json<Page>> {
    let page = blocking(move || build_page(&state, &params)).await?;
    Ok(Json(page))
}

fn build_page(state: &AppState, params: &PageParams) -> ApiResult<Page> {
    let query = compile(&params.q, state.registry.as_ref())?;
    let op = collection_of(&query)?;
    let limit = state.paging.page_limit(params.limit);

    let mut rows = paginate(op, params.skip)?;
    let mut items = Vec::with_capacity(limit);
    for row in rows.by_ref().take(limit) {
        let (key, tuple) = row?;
        items.push(PageItem { key, tuple });
    }
    let more = rows.next().is_some();

    info!(collection = %op.id(), skip = params.skip, items = items.len(), more, "query page");
    Ok(Page {
        id: op.id(),
        fingerprint: op.fingerprint(),
        kind: op.kind(),
        properties: op.properties().clone(),
        skip: params.skip,
        limit,
        items,
        more,
    })
}

#[derive(Debug, Deserialize)]
struct SchemaParams {
    q: String,
}

async fn get_schema(State(state): State<AppState>, UrlQuery(params): UrlQuery<SchemaParams>) -> ApiResult<Json<Value>> {
    let schema = blocking(move || {
        let query = compile(&params.q, state.registry.as_ref())?;
        let op = collection_of(&query)?;
        Ok(json!({
            "id": op.id(),
            "kind": op.kind(),
            "properties": op.properties(),
        }))
    })
    .await?;
    Ok(Json(schema))
}
