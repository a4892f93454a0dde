//! # HTTP API
//!
//! Builds the axum router for the seeding node. Handlers are thin: each one
//! hands its input to [`SeedingService`] or [`ContentResolver`] on the
//! blocking pool and maps the outcome to a response.
//!
//! ## Endpoints
//!
//! | Method | Path                | Description                              |
//! |--------|---------------------|------------------------------------------|
//! | GET    | `/health`           | Liveness probe                           |
//! | GET    | `/info`             | End offset and store counts              |
//! | POST   | `/tx`               | Submit a signed transaction (JSON)       |
//! | POST   | `/chunk`            | Submit one payload chunk (JSON)          |
//! | POST   | `/bundle/item`      | Submit a binary bundled item             |
//! | GET    | `/tx/:id/offset`    | End offset and size of a transaction     |
//! | GET    | `/chunk/:offset`    | Chunk stored at an absolute start offset |
//! | GET    | `/:id`              | Content of a transaction or bundled item |
//! | GET    | `/:id/*path`        | Path within a manifest                   |
//!
//! Ids this node does not hold answer 404 with `x-permaseed-local-miss:
//! true`, so a gateway in front can fetch them upstream instead. A manifest
//! path with no entry is a plain 404.
//!
//! [`ContentResolver`]: permaseed::ContentResolver

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use permaseed::transaction::{Chunk, Transaction, TxOffset};
use permaseed::{Content, ContentSource, SeedError, SeedResult, SeedingService};

use crate::metrics::{SharedMetrics, KIND_BUNDLE_ITEM, KIND_CHUNK, KIND_TX};

/// Response header marking a 404 as "not held here".
pub const LOCAL_MISS_HEADER: &str = "x-permaseed-local-miss";

/// Request bodies above this size are refused before reaching a handler.
const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    pub version: String,
    pub service: Arc<SeedingService>,
    pub metrics: SharedMetrics,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the API [`Router`] with CORS, request tracing and a body limit.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .expose_headers([header::HeaderName::from_static(LOCAL_MISS_HEADER)]);

    Router::new()
        .route("/health", get(health_handler))
        .route("/info", get(info_handler))
        .route("/tx", post(submit_tx_handler))
        .route("/chunk", post(submit_chunk_handler))
        .route("/bundle/item", post(submit_bundle_item_handler))
        .route("/tx/:id/offset", get(tx_offset_handler))
        .route("/chunk/:offset", get(chunk_handler))
        .route("/:id", get(content_handler))
        .route("/:id/*path", get(content_path_handler))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Response Types
// ---------------------------------------------------------------------------

/// Response payload for `GET /info`.
#[derive(Debug, Serialize, Deserialize)]
pub struct InfoResponse {
    pub version: String,
    pub end_offset: u64,
    pub transactions: usize,
    pub chunks: usize,
    pub bundle_items: usize,
    pub allocations: usize,
    /// RFC 3339 time of the response.
    pub timestamp: String,
}

/// Response payload for `POST /tx` and `POST /bundle/item`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub id: String,
}

/// Response payload for `POST /chunk`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChunkResponse {
    /// Absolute start offset the chunk was stored under.
    pub offset: u64,
}

/// Error body returned by every endpoint on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ApiError {
    Seed(SeedError),
    /// The blocking task running the request panicked or was cancelled.
    Internal(String),
}

impl From<SeedError> for ApiError {
    fn from(err: SeedError) -> Self {
        Self::Seed(err)
    }
}

fn status_for(err: &SeedError) -> StatusCode {
    match err {
        SeedError::VerificationFailed(_) | SeedError::MalformedInput(_) => StatusCode::BAD_REQUEST,
        SeedError::AlreadyExists(_) => StatusCode::CONFLICT,
        SeedError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        SeedError::NotFoundLocally(_) | SeedError::PageNotFound(_) => StatusCode::NOT_FOUND,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body, local_miss) = match &self {
            ApiError::Seed(err) => {
                if let SeedError::Storage(e) = err {
                    tracing::error!(error = %e, "storage failure while serving request");
                }
                let body = ErrorResponse {
                    error: err.to_string(),
                    kind: err.kind().to_string(),
                };
                (status_for(err), body, err.is_not_found_locally())
            }
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "request task failed");
                let body = ErrorResponse {
                    error: message.clone(),
                    kind: "internal".to_string(),
                };
                (StatusCode::INTERNAL_SERVER_ERROR, body, false)
            }
        };

        let mut response = (status, Json(body)).into_response();
        if local_miss {
            response
                .headers_mut()
                .insert(LOCAL_MISS_HEADER, HeaderValue::from_static("true"));
        }
        response
    }
}

// ---------------------------------------------------------------------------
// Blocking Helpers
// ---------------------------------------------------------------------------

/// Run `work` against the service on the blocking pool. sled reads and the
/// submission lock both block.
async fn blocking<T, F>(state: &AppState, work: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&SeedingService) -> SeedResult<T> + Send + 'static,
{
    let service = Arc::clone(&state.service);
    let outcome = tokio::task::spawn_blocking(move || work(&service))
        .await
        .map_err(|e| ApiError::Internal(format!("blocking task failed: {e}")))?;
    Ok(outcome?)
}

/// Like [`blocking`], and records the submission in the metrics.
async fn submission<T, F>(state: &AppState, kind: &'static str, work: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&SeedingService) -> SeedResult<T> + Send + 'static,
{
    let started = Instant::now();
    let outcome = blocking(state, work).await;
    state
        .metrics
        .observe_latency(kind, started.elapsed().as_secs_f64());

    match &outcome {
        Ok(_) => {
            state.metrics.record_accepted(kind);
            match state.service.end_offset() {
                Ok(end) => state.metrics.set_end_offset(end),
                Err(e) => tracing::warn!(error = %e, "could not read end offset"),
            }
        }
        Err(ApiError::Seed(err)) => state.metrics.record_rejected(kind, err.kind()),
        Err(ApiError::Internal(_)) => state.metrics.record_rejected(kind, "internal"),
    }
    outcome
}

fn content_response(content: Content) -> Response {
    let content_type = content
        .content_type()
        .and_then(|ct| HeaderValue::from_str(ct).ok())
        .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));
    let source = match content.source {
        ContentSource::Transaction => "transaction",
        ContentSource::BundleItem => "bundle_item",
    };

    let mut response = (StatusCode::OK, content.data).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, content_type);
    headers.insert("x-permaseed-source", HeaderValue::from_static(source));
    response
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health`
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /info`
async fn info_handler(State(state): State<AppState>) -> Result<Json<InfoResponse>, ApiError> {
    let version = state.version.clone();
    let info = blocking(&state, move |service| {
        let db = service.db();
        Ok(InfoResponse {
            version,
            end_offset: service.end_offset()?,
            transactions: db.tx_count(),
            chunks: db.chunk_count(),
            bundle_items: db.bundle_item_count(),
            allocations: db.allocation_count(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        })
    })
    .await?;
    Ok(Json(info))
}

/// `POST /tx`
async fn submit_tx_handler(
    State(state): State<AppState>,
    Json(tx): Json<Transaction>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let id = tx.id.clone();
    submission(&state, KIND_TX, move |service| service.submit_tx(&tx)).await?;
    Ok(Json(SubmitResponse { id }))
}

/// `POST /chunk`
async fn submit_chunk_handler(
    State(state): State<AppState>,
    Json(chunk): Json<Chunk>,
) -> Result<Json<ChunkResponse>, ApiError> {
    let offset = submission(&state, KIND_CHUNK, move |service| service.submit_chunk(&chunk)).await?;
    Ok(Json(ChunkResponse { offset }))
}

/// `POST /bundle/item`. The body is the raw binary item.
async fn submit_bundle_item_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SubmitResponse>, ApiError> {
    let id = submission(&state, KIND_BUNDLE_ITEM, move |service| {
        service.submit_bundle_item(&body)
    })
    .await?;
    Ok(Json(SubmitResponse { id }))
}

/// `GET /tx/:id/offset`
async fn tx_offset_handler(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<TxOffset>, ApiError> {
    let offset = blocking(&state, move |service| service.tx_offset(&id)).await?;
    Ok(Json(offset))
}

/// `GET /chunk/:offset`
async fn chunk_handler(
    Path(offset): Path<u64>,
    State(state): State<AppState>,
) -> Result<Json<Chunk>, ApiError> {
    let chunk = blocking(&state, move |service| service.chunk_at_offset(offset)).await?;
    Ok(Json(chunk))
}

/// `GET /:id`. A manifest id serves its index.
async fn content_handler(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let content = blocking(&state, move |service| {
        service.resolver().resolve_path(&id, "")
    })
    .await?;
    Ok(content_response(content))
}

/// `GET /:id/*path`
async fn content_path_handler(
    Path((id, path)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let content = blocking(&state, move |service| {
        service.resolver().resolve_path(&id, &path)
    })
    .await?;
    Ok(content_response(content))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use permaseed::bundle::BundleItemBuilder;
    use permaseed::config::MANIFEST_CONTENT_TYPE;
    use permaseed::crypto::keys::OwnerKeypair;
    use permaseed::transaction::{BuiltTransaction, TransactionBuilder};
    use permaseed::SeedDB;
    use tower::ServiceExt;

    use crate::metrics::SeedMetrics;

    fn test_app_state() -> AppState {
        let db = SeedDB::open_temporary().expect("temp db");
        AppState {
            version: "0.1.0-test".into(),
            service: Arc::new(SeedingService::new(db)),
            metrics: Arc::new(SeedMetrics::new().expect("metrics")),
        }
    }

    fn keypair(seed: u8) -> OwnerKeypair {
        OwnerKeypair::from_seed(&[seed; 32])
    }

    fn inline_tx(seed: u8, body: &[u8], content_type: &str) -> BuiltTransaction {
        TransactionBuilder::new()
            .data(body.to_vec())
            .tag("Content-Type", content_type)
            .build(&keypair(seed))
            .unwrap()
    }

    struct TestResponse {
        status: StatusCode,
        headers: axum::http::HeaderMap,
        body: Vec<u8>,
    }

    impl TestResponse {
        fn json<T: serde::de::DeserializeOwned>(&self) -> T {
            serde_json::from_slice(&self.body).unwrap()
        }
    }

    async fn send(router: &Router, req: Request<Body>) -> TestResponse {
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.into_body().collect().await.unwrap().to_bytes().to_vec();
        TestResponse {
            status,
            headers,
            body,
        }
    }

    async fn get(router: &Router, path: &str) -> TestResponse {
        let req = Request::builder().uri(path).body(Body::empty()).unwrap();
        send(router, req).await
    }

    async fn post_json<T: Serialize>(router: &Router, path: &str, body: &T) -> TestResponse {
        let req = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap();
        send(router, req).await
    }

    async fn post_bytes(router: &Router, path: &str, body: Vec<u8>) -> TestResponse {
        let req = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/octet-stream")
            .body(Body::from(body))
            .unwrap();
        send(router, req).await
    }

    // -- Health & info ------------------------------------------------------

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let router = create_router(test_app_state());
        let resp = get(&router, "/health").await;

        assert_eq!(resp.status, StatusCode::OK);
        let json: serde_json::Value = resp.json();
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn info_reflects_submissions() {
        let router = create_router(test_app_state());
        let built = inline_tx(1, b"hello", "text/plain");
        post_json(&router, "/tx", &built.tx).await;

        let info: InfoResponse = get(&router, "/info").await.json();
        assert_eq!(info.version, "0.1.0-test");
        assert_eq!(info.end_offset, 5);
        assert_eq!(info.transactions, 1);
        assert_eq!(info.chunks, 1);
        assert_eq!(info.allocations, 1);
    }

    // -- Transactions -------------------------------------------------------

    #[tokio::test]
    async fn submitted_transaction_is_served_with_its_content_type() {
        let router = create_router(test_app_state());
        let built = inline_tx(2, b"<h1>hi</h1>", "text/html");

        let resp = post_json(&router, "/tx", &built.tx).await;
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.json::<SubmitResponse>().id, built.tx.id);

        let resp = get(&router, &format!("/{}", built.tx.id)).await;
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.body, b"<h1>hi</h1>");
        assert_eq!(resp.headers[header::CONTENT_TYPE], "text/html");
        assert_eq!(resp.headers["x-permaseed-source"], "transaction");
    }

    #[tokio::test]
    async fn duplicate_transaction_is_conflict() {
        let router = create_router(test_app_state());
        let built = inline_tx(3, b"once", "text/plain");

        assert_eq!(post_json(&router, "/tx", &built.tx).await.status, StatusCode::OK);
        let resp = post_json(&router, "/tx", &built.tx).await;
        assert_eq!(resp.status, StatusCode::CONFLICT);
        assert_eq!(resp.json::<ErrorResponse>().kind, "already_exists");
    }

    #[tokio::test]
    async fn tampered_transaction_is_rejected_and_counted() {
        let state = test_app_state();
        let metrics = Arc::clone(&state.metrics);
        let router = create_router(state);

        let mut built = inline_tx(4, b"payload", "text/plain");
        built.tx.reward = "999".into();

        let resp = post_json(&router, "/tx", &built.tx).await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        assert_eq!(resp.json::<ErrorResponse>().kind, "verification_failed");
        assert_eq!(
            metrics
                .rejected_total
                .with_label_values(&[KIND_TX, "verification_failed"])
                .get(),
            1
        );
    }

    // -- Chunks -------------------------------------------------------------

    #[tokio::test]
    async fn chunks_are_placed_and_readable_by_offset() {
        let router = create_router(test_app_state());
        let data: Vec<u8> = (0..400 * 1024).map(|i| (i % 241) as u8).collect();
        let built = TransactionBuilder::new()
            .data(data.clone())
            .without_inline_data()
            .build(&keypair(5))
            .unwrap();

        assert_eq!(post_json(&router, "/tx", &built.tx).await.status, StatusCode::OK);
        let mut starts = Vec::new();
        for chunk in &built.chunks {
            let resp = post_json(&router, "/chunk", chunk).await;
            assert_eq!(resp.status, StatusCode::OK);
            starts.push(resp.json::<ChunkResponse>().offset);
        }
        assert_eq!(starts[0], 0);

        let offset: TxOffset = get(&router, &format!("/tx/{}/offset", built.tx.id))
            .await
            .json();
        assert_eq!(offset.offset, data.len() as u64);
        assert_eq!(offset.size, data.len() as u64);

        let stored: Chunk = get(&router, &format!("/chunk/{}", starts[1])).await.json();
        assert_eq!(stored, built.chunks[1]);

        let resp = get(&router, &format!("/{}", built.tx.id)).await;
        assert_eq!(resp.body, data);
        assert_eq!(resp.headers[header::CONTENT_TYPE], "application/octet-stream");
    }

    #[tokio::test]
    async fn non_numeric_chunk_offset_is_bad_request() {
        let router = create_router(test_app_state());
        let resp = get(&router, "/chunk/not-a-number").await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    }

    // -- Misses -------------------------------------------------------------

    #[tokio::test]
    async fn unknown_id_is_a_local_miss() {
        let router = create_router(test_app_state());
        let resp = get(&router, "/nothing-here").await;

        assert_eq!(resp.status, StatusCode::NOT_FOUND);
        assert_eq!(resp.headers[LOCAL_MISS_HEADER], "true");
        assert_eq!(resp.json::<ErrorResponse>().kind, "not_found_locally");
    }

    #[tokio::test]
    async fn manifest_paths_resolve_and_missing_page_is_plain_404() {
        let router = create_router(test_app_state());
        let page = inline_tx(6, b"index page", "text/html");
        let about = inline_tx(7, b"about page", "text/html");
        post_json(&router, "/tx", &page.tx).await;
        post_json(&router, "/tx", &about.tx).await;

        let manifest = format!(
            r#"{{"manifest":"arweave/paths","version":"0.1.0","index":{{"path":"index.html"}},"paths":{{"index.html":{{"txId":"{}"}},"about/index.html":{{"txId":"{}"}}}}}}"#,
            page.tx.id, about.tx.id
        );
        let manifest_tx = inline_tx(8, manifest.as_bytes(), MANIFEST_CONTENT_TYPE);
        post_json(&router, "/tx", &manifest_tx.tx).await;

        let resp = get(&router, &format!("/{}", manifest_tx.tx.id)).await;
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.body, b"index page");

        let resp = get(&router, &format!("/{}/about/", manifest_tx.tx.id)).await;
        assert_eq!(resp.body, b"about page");

        let resp = get(&router, &format!("/{}/missing.html", manifest_tx.tx.id)).await;
        assert_eq!(resp.status, StatusCode::NOT_FOUND);
        assert!(resp.headers.get(LOCAL_MISS_HEADER).is_none());
        assert_eq!(resp.json::<ErrorResponse>().kind, "page_not_found");
    }

    // -- Bundled items ------------------------------------------------------

    #[tokio::test]
    async fn bundle_item_is_accepted_and_served() {
        let router = create_router(test_app_state());
        let binary = BundleItemBuilder::new()
            .tag("Content-Type", "text/plain")
            .data(b"from a bundle".to_vec())
            .sign(&keypair(9));

        let resp = post_bytes(&router, "/bundle/item", binary.clone()).await;
        assert_eq!(resp.status, StatusCode::OK);
        let id = resp.json::<SubmitResponse>().id;

        let resp = get(&router, &format!("/{id}")).await;
        assert_eq!(resp.body, b"from a bundle");
        assert_eq!(resp.headers["x-permaseed-source"], "bundle_item");

        let resp = post_bytes(&router, "/bundle/item", binary).await;
        assert_eq!(resp.status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn truncated_bundle_item_is_bad_request() {
        let router = create_router(test_app_state());
        let resp = post_bytes(&router, "/bundle/item", vec![2, 0, 1]).await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        assert_eq!(resp.json::<ErrorResponse>().kind, "malformed_input");
    }
}
