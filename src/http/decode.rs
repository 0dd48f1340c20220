//! Strict JSON request decoding.
//!
//! # Responsibilities
//! - Read the request body up to a hard size ceiling
//! - Decode exactly one JSON value into the destination type
//! - Reject object keys the destination does not consume, at any depth
//! - Classify every failure once into a [`DecodeError`]
//!
//! # Design Decisions
//! - The whole body is read before parsing, so an oversized body is rejected
//!   even when its leading bytes form a valid document
//! - Unknown keys are detected with `serde_ignored`, so destination types do
//!   not have to opt into `#[serde(deny_unknown_fields)]`
//! - Field paths for type errors come from `serde_path_to_error`
//! - A destination that can never be decoded from an owned buffer is a
//!   defect in the binary; it panics instead of producing a client error

use axum::body::Body;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use serde::de::DeserializeOwned;
use serde_json::error::Category;
use serde_path_to_error::Segment;
use thiserror::Error;

use crate::config::DEFAULT_MAX_BODY_BYTES;

/// Client-facing decode failure. `Display` is the message sent to clients.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("body contains badly-formed JSON at character {offset}")]
    Syntax { offset: usize },

    #[error("body contains badly-formed JSON")]
    Truncated,

    #[error("body contains incorrect JSON type for field {field:?}")]
    FieldType { field: String },

    #[error("body contains incorrect JSON type")]
    Type,

    #[error("body must not be empty")]
    Empty,

    #[error("body contains unknown key {0}")]
    UnknownKey(String),

    #[error("body must not be larger than max size")]
    TooLarge { limit: usize },

    #[error("body must only contain a single JSON value")]
    MultipleValues,

    /// Failures outside the categories above, passed through verbatim.
    #[error("{0}")]
    Other(String),
}

/// Outcome of classifying a raw deserialization failure.
#[derive(Debug, PartialEq, Eq)]
enum Triage {
    Client(DecodeError),
    /// The destination type itself is broken; never shown to a client.
    Defect(String),
}

/// Decodes request bodies into typed destinations.
#[derive(Debug, Clone, Copy)]
pub struct Decoder {
    max_bytes: usize,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BODY_BYTES)
    }
}

impl Decoder {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Read at most `max_bytes` from `body` and decode it.
    pub async fn read_json<T: DeserializeOwned>(&self, body: Body) -> Result<T, DecodeError> {
        let bytes = self.read_limited(body).await?;
        self.decode(&bytes)
    }

    /// Decode `bytes` into a new `T`.
    ///
    /// # Panics
    ///
    /// Panics if `T` can only be built from data borrowed out of the input.
    pub fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, DecodeError> {
        if bytes.len() > self.max_bytes {
            return Err(DecodeError::TooLarge {
                limit: self.max_bytes,
            });
        }

        match decode_strict(bytes) {
            Ok(value) => Ok(value),
            Err(Triage::Client(err)) => Err(err),
            Err(Triage::Defect(reason)) => {
                panic!("JSON destination type cannot be decoded from a request body: {reason}")
            }
        }
    }

    /// Decode `bytes` into an existing destination. `dst` is only replaced
    /// when decoding succeeds.
    pub fn decode_into<T: DeserializeOwned>(&self, bytes: &[u8], dst: &mut T) -> Result<(), DecodeError> {
        *dst = self.decode(bytes)?;
        Ok(())
    }

    async fn read_limited(&self, body: Body) -> Result<Vec<u8>, DecodeError> {
        match Limited::new(body, self.max_bytes).collect().await {
            Ok(collected) => Ok(collected.to_bytes().to_vec()),
            Err(err) if err.is::<LengthLimitError>() => Err(DecodeError::TooLarge {
                limit: self.max_bytes,
            }),
            Err(err) => Err(DecodeError::Other(err.to_string())),
        }
    }
}

fn decode_strict<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, Triage> {
    let mut unknown: Option<String> = None;
    let mut de = serde_json::Deserializer::from_slice(bytes);

    let decoded: Result<T, _> = {
        let mut track = |path: serde_ignored::Path<'_>| {
            if unknown.is_none() {
                unknown = Some(key_path(&path));
            }
        };
        serde_path_to_error::deserialize(serde_ignored::Deserializer::new(&mut de, &mut track))
    };

    let value = decoded.map_err(|err| triage(err, bytes))?;

    if let Some(key) = unknown {
        return Err(Triage::Client(DecodeError::UnknownKey(key)));
    }

    de.end()
        .map_err(|_| Triage::Client(DecodeError::MultipleValues))?;

    Ok(value)
}

fn triage(err: serde_path_to_error::Error<serde_json::Error>, body: &[u8]) -> Triage {
    let path = err.path();
    let field = path.iter().next().map(|_| path.to_string());
    let last_key = match path.iter().last() {
        Some(Segment::Map { key }) => Some(key.clone()),
        _ => None,
    };
    let inner = err.into_inner();

    let decode_err = match inner.classify() {
        Category::Syntax => DecodeError::Syntax {
            offset: byte_offset(body, inner.line(), inner.column()),
        },
        Category::Eof if body.iter().all(u8::is_ascii_whitespace) => DecodeError::Empty,
        Category::Eof => DecodeError::Truncated,
        Category::Data => {
            let message = inner.to_string();
            if message.starts_with("invalid type: ")
                && expecting(&message).is_some_and(|e| e.starts_with("a borrowed "))
            {
                return Triage::Defect(message);
            }
            if message.starts_with("invalid type: ") || message.starts_with("invalid value: ") {
                match field {
                    Some(field) => DecodeError::FieldType { field },
                    None => DecodeError::Type,
                }
            } else if let Some(key) = unknown_field(&message) {
                // The tracked path ends at the rejected key once it was read.
                let key = match (field, last_key) {
                    (Some(field), Some(last)) if last == key => field,
                    (Some(field), _) => format!("{field}.{key}"),
                    (None, _) => key.to_string(),
                };
                DecodeError::UnknownKey(key)
            } else {
                DecodeError::Other(message)
            }
        }
        Category::Io => DecodeError::Other(inner.to_string()),
    };

    Triage::Client(decode_err)
}

/// What the destination type expected, taken after the last `, expected `
/// so that text quoted from the client's value is never inspected.
fn expecting(message: &str) -> Option<&str> {
    message.rsplit_once(", expected ").map(|(_, expected)| expected)
}

/// Name carried by serde's `unknown field` message, raised by destinations
/// declaring `#[serde(deny_unknown_fields)]`.
fn unknown_field(message: &str) -> Option<&str> {
    let rest = message.strip_prefix("unknown field `")?;
    rest.split('`').next()
}

/// Dotted path of an ignored key, e.g. `cast[0].agent`.
fn key_path(path: &serde_ignored::Path<'_>) -> String {
    use serde_ignored::Path;

    match path {
        Path::Root => String::new(),
        Path::Seq { parent, index } => format!("{}[{}]", key_path(parent), index),
        Path::Map { parent, key } => {
            let parent = key_path(parent);
            if parent.is_empty() {
                key.clone()
            } else {
                format!("{parent}.{key}")
            }
        }
        Path::Some { parent } | Path::NewtypeStruct { parent } | Path::NewtypeVariant { parent } => {
            key_path(parent)
        }
    }
}

/// Bytes consumed up to and including the byte at `line`:`column`
/// (both one-based, as reported by `serde_json`).
fn byte_offset(body: &[u8], line: usize, column: usize) -> usize {
    let preceding: usize = body
        .split(|b| *b == b'\n')
        .take(line.saturating_sub(1))
        .map(|l| l.len() + 1)
        .sum();
    preceding + column
}
