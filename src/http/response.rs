//! JSON response encoding.
//!
//! # Responsibilities
//! - Serialize an [`Envelope`] into the stable wire format
//! - Merge caller headers, then force `Content-Type: application/json`
//! - Turn encoding failures into a logged, bodiless 500
//!
//! # Design Decisions
//! - Tab-indented JSON terminated by a newline; keys are sorted, so the same
//!   envelope always produces the same bytes
//! - A response is an owned value: one status line and one body per call

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use thiserror::Error;

use crate::http::envelope::Envelope;
use crate::observability::Logger;

/// Failure turning an envelope into JSON bytes.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("envelope field {key:?} cannot be represented as JSON: {source}")]
    Field {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize envelope: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Encode an envelope as tab-indented JSON with a trailing newline.
pub fn to_json_bytes(envelope: Envelope) -> Result<Vec<u8>, EncodeError> {
    let value = envelope.into_value()?;

    let mut buf = Vec::with_capacity(128);
    let mut serializer = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"\t"));
    value.serialize(&mut serializer)?;
    buf.push(b'\n');
    Ok(buf)
}

/// Build a complete JSON response without logging.
pub fn render(
    status: StatusCode,
    envelope: Envelope,
    headers: Option<HeaderMap>,
) -> Result<Response, EncodeError> {
    let body = to_json_bytes(envelope)?;

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;

    if let Some(headers) = headers {
        response.headers_mut().extend(headers);
    }
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );

    Ok(response)
}

/// Writes envelopes as HTTP responses.
#[derive(Debug, Clone)]
pub struct Encoder {
    logger: Logger,
}

impl Encoder {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }

    /// Write `envelope` with `status` and optional extra headers.
    ///
    /// If the envelope cannot be encoded the failure is logged and the client
    /// gets a bare 500 with no body.
    pub fn write_json(
        &self,
        status: StatusCode,
        envelope: Envelope,
        headers: Option<HeaderMap>,
    ) -> Response {
        match render(status, envelope, headers) {
            Ok(response) => response,
            Err(err) => {
                self.logger.in_scope(|| {
                    tracing::error!(error = %err, status = status.as_u16(), "Failed to encode JSON response");
                });
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}
