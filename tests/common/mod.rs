//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    body::{to_bytes, Body},
    extract::State,
    http::{header, HeaderMap, HeaderValue, Request, StatusCode},
    response::Response,
    routing::{self, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower::ServiceExt;
use tracing_subscriber::fmt::MakeWriter;

use json_boundary::http::{AppState, Envelope, IdParam, RequestContext, StrictJson};
use json_boundary::validator::{unique, Validator};
use json_boundary::{ApiConfig, ApiServer, Logger};

/// Text of the downstream failure the `/v1/fail` route reports.
pub const SECRET_FAILURE: &str = "pq: password authentication failed for user \"greenlight\"";

/// In-memory log sink.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }

    /// Every captured line, parsed as a JSON log entry.
    pub fn entries(&self) -> Vec<serde_json::Value> {
        self.text()
            .lines()
            .map(|line| serde_json::from_str(line).expect("log line is a complete JSON object"))
            .collect()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MovieInput {
    pub title: String,
    pub year: i32,
    pub runtime: i32,
    pub genres: Vec<String>,
}

async fn create_movie(
    State(state): State<AppState>,
    StrictJson(input): StrictJson<MovieInput>,
) -> Response {
    let mut v = Validator::new();
    v.check(!input.title.is_empty(), "title", "must be provided");
    v.check(input.year >= 1888, "year", "must be greater than 1888");
    v.check(input.runtime > 0, "runtime", "must be a positive integer");
    v.check(!input.genres.is_empty(), "genres", "must contain at least 1 genre");
    v.check(unique(&input.genres), "genres", "must not contain duplicate values");

    if !v.valid() {
        return state.errors.failed_validation(v.errors());
    }

    let mut headers = HeaderMap::new();
    headers.insert(header::LOCATION, HeaderValue::from_static("/v1/movies/1"));
    state
        .encoder
        .write_json(StatusCode::CREATED, Envelope::new().with("movie", &input), Some(headers))
}

async fn show_movie(State(state): State<AppState>, IdParam(id): IdParam) -> Response {
    if id == 404 {
        return state.errors.not_found();
    }
    let movie = serde_json::json!({"id": id, "title": "Casablanca"});
    state
        .encoder
        .write_json(StatusCode::OK, Envelope::new().with("movie", movie), None)
}

async fn fail(State(state): State<AppState>, ctx: RequestContext) -> Response {
    let err = io::Error::other(SECRET_FAILURE);
    state.errors.server_error(&ctx, &err)
}

async fn explode() -> Response {
    panic!("handler bug: index out of range");
}

async fn unencodable(State(state): State<AppState>) -> Response {
    let mut grid = BTreeMap::new();
    grid.insert((0, 0), "origin");
    state
        .encoder
        .write_json(StatusCode::OK, Envelope::new().with("grid", grid), None)
}

/// Resource routes of a small movie service built on the boundary.
pub fn movie_routes() -> Router<AppState> {
    Router::new()
        .route("/v1/movies", post(create_movie))
        .route("/v1/movies/{id}", routing::get(show_movie))
        .route("/v1/fail", routing::get(fail))
        .route("/v1/panic", routing::get(explode))
        .route("/v1/unencodable", routing::get(unencodable))
}

/// Server over `config` whose logs land in the returned sink.
pub fn server(config: ApiConfig) -> (ApiServer, CapturedLogs) {
    let logs = CapturedLogs::default();
    let logger = Logger::with_writer(&config.observability, logs.clone()).unwrap();
    (ApiServer::new(config, logger), logs)
}

pub fn app(config: ApiConfig) -> (Router, CapturedLogs) {
    let (server, logs) = server(config);
    (server.router_with(movie_routes()), logs)
}

pub async fn send(router: &Router, request: Request<Body>) -> Response {
    router.clone().oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub fn post_json(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Serve the movie routes on an ephemeral local port.
pub async fn spawn_server(config: ApiConfig) -> (SocketAddr, CapturedLogs) {
    let (server, logs) = server(config);
    let router = server.router_with(movie_routes());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = server.run_with(listener, router).await;
    });
    (addr, logs)
}
