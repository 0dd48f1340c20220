//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the shared [`AppState`] handed to every handler and extractor
//! - Create the Axum Router with the healthcheck and error fallbacks
//! - Wire up middleware (request ID, tracing, panic recovery, metrics)
//!
//! # Design Decisions
//! - Server errors are logged once, by the error responder; tower-http's
//!   failure events are demoted to DEBUG
//! - Serve on a bound listener

use std::any::Any;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{Method, StatusCode},
    middleware,
    response::Response,
    routing::get,
    Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    trace::{DefaultOnFailure, TraceLayer},
};
use tracing::Level;

use crate::config::ApiConfig;
use crate::http::decode::Decoder;
use crate::http::envelope::Envelope;
use crate::http::errors::ErrorResponder;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::http::response::Encoder;
use crate::observability::{metrics, Logger};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application state injected into handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<ApiConfig>,
    pub logger: Logger,
    pub decoder: Decoder,
    pub encoder: Encoder,
    pub errors: ErrorResponder,
}

impl AppState {
    pub fn new(config: ApiConfig, logger: Logger) -> Self {
        let decoder = Decoder::new(config.limits.max_body_bytes);
        let encoder = Encoder::new(logger.clone());
        let errors = ErrorResponder::new(encoder.clone(), logger.clone());
        Self {
            config: Arc::new(config),
            logger,
            decoder,
            encoder,
            errors,
        }
    }
}

/// HTTP server for the API.
pub struct ApiServer {
    state: AppState,
}

impl ApiServer {
    pub fn new(config: ApiConfig, logger: Logger) -> Self {
        Self {
            state: AppState::new(config, logger),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// The built-in routes merged with `routes`, plus fallbacks and middleware.
    ///
    /// `routes` is where the resource handlers of the embedding service go;
    /// they can use [`StrictJson`](crate::http::StrictJson),
    /// [`IdParam`](crate::http::IdParam) and the state's responder.
    pub fn router_with(&self, routes: Router<AppState>) -> Router {
        let errors = self.state.errors.clone();

        Router::new()
            .route("/v1/healthcheck", get(healthcheck))
            .merge(routes)
            .fallback(not_found)
            .method_not_allowed_fallback(method_not_allowed)
            .with_state(self.state.clone())
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(
                        TraceLayer::new_for_http()
                            .on_failure(DefaultOnFailure::new().level(Level::DEBUG)),
                    )
                    .layer(propagate_request_id_layer())
                    .layer(middleware::from_fn(metrics::track_metrics))
                    .layer(CatchPanicLayer::custom(
                        move |panic: Box<dyn Any + Send + 'static>| errors.recover_panic(panic),
                    )),
            )
    }

    pub fn router(&self) -> Router {
        self.router_with(Router::new())
    }

    /// Serve `router` until the listener fails.
    pub async fn run_with(self, listener: TcpListener, router: Router) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        self.state.logger.in_scope(|| {
            tracing::info!(
                address = %addr,
                env = %self.state.config.env,
                "Starting server"
            );
        });

        axum::serve(listener, router).await
    }

    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let router = self.router();
        self.run_with(listener, router).await
    }
}

#[derive(Serialize)]
struct SystemInfo {
    environment: String,
    version: &'static str,
}

async fn healthcheck(State(state): State<AppState>) -> Response {
    let envelope = Envelope::new().with("status", "available").with(
        "system_info",
        SystemInfo {
            environment: state.config.env.to_string(),
            version: VERSION,
        },
    );
    state.encoder.write_json(StatusCode::OK, envelope, None)
}

async fn not_found(State(state): State<AppState>) -> Response {
    state.errors.not_found()
}

async fn method_not_allowed(State(state): State<AppState>, method: Method) -> Response {
    state.errors.method_not_allowed(&method)
}
