//! Client-safe error responses.
//!
//! Every failure category maps to one status code and one `{"error": ...}`
//! envelope written through the [`Encoder`]. Only server-caused failures are
//! logged; their detail never reaches the client.

use std::any::Any;
use std::error::Error as StdError;

use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::Response;
use serde::Serialize;

use crate::http::envelope::Envelope;
use crate::http::request::RequestContext;
use crate::http::response::Encoder;
use crate::observability::Logger;
use crate::validator::ValidationErrors;

pub const SERVER_ERROR_MESSAGE: &str =
    "the server encountered a problem and could not process your request";
pub const NOT_FOUND_MESSAGE: &str = "the requested resource could not be found";

/// Maps failure categories onto JSON error responses.
#[derive(Debug, Clone)]
pub struct ErrorResponder {
    encoder: Encoder,
    logger: Logger,
}

impl ErrorResponder {
    pub fn new(encoder: Encoder, logger: Logger) -> Self {
        Self { encoder, logger }
    }

    /// `{"error": message}` with a caller-chosen status. `message` may be a
    /// string or any serializable structure.
    ///
    /// If the envelope cannot be encoded the encoder logs it and answers with
    /// a bare 500; nothing here retries.
    pub fn error_response(&self, status: StatusCode, message: impl Serialize) -> Response {
        self.encoder.write_json(status, Envelope::error(message), None)
    }

    /// Unexpected server-side failure: log `err` in full, answer 500 with a
    /// fixed message.
    pub fn server_error(&self, ctx: &RequestContext, err: &(dyn StdError + 'static)) -> Response {
        self.logger.in_scope(|| {
            tracing::error!(
                request_id = ctx.request_id.as_deref().unwrap_or("unknown"),
                request_method = %ctx.method,
                request_url = %ctx.uri,
                error = %err,
                "Request failed"
            );
        });
        self.error_response(StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR_MESSAGE)
    }

    pub fn not_found(&self) -> Response {
        self.error_response(StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE)
    }

    pub fn method_not_allowed(&self, method: &Method) -> Response {
        let message = format!("the {method} method is not supported for this resource");
        self.error_response(StatusCode::METHOD_NOT_ALLOWED, message)
    }

    /// Malformed or invalid client request; the error's message is shown.
    pub fn bad_request(&self, err: &dyn StdError) -> Response {
        self.error_response(StatusCode::BAD_REQUEST, err.to_string())
    }

    pub fn failed_validation(&self, errors: &ValidationErrors) -> Response {
        self.error_response(StatusCode::UNPROCESSABLE_ENTITY, errors)
    }

    /// Response for a handler that panicked. The connection is closed since
    /// the handler's state can no longer be trusted.
    pub fn recover_panic(&self, panic: Box<dyn Any + Send + 'static>) -> Response {
        let detail = if let Some(s) = panic.downcast_ref::<String>() {
            s.as_str()
        } else if let Some(s) = panic.downcast_ref::<&str>() {
            s
        } else {
            "non-string panic payload"
        };

        self.logger.in_scope(|| {
            tracing::error!(error = %detail, "Handler panicked");
        });

        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("close"));
        self.encoder.write_json(
            StatusCode::INTERNAL_SERVER_ERROR,
            Envelope::error(SERVER_ERROR_MESSAGE),
            Some(headers),
        )
    }
}
