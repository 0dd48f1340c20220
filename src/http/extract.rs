//! Axum extractors wired to the JSON boundary.

use std::collections::HashMap;

use axum::extract::{FromRef, FromRequest, FromRequestParts, Path, Request};
use axum::http::request::Parts;
use axum::response::Response;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::http::server::AppState;

/// Request body decoded strictly with the application's [`Decoder`].
///
/// Rejects with a 400 `{"error": ...}` response carrying the normalized
/// decode message.
///
/// [`Decoder`]: crate::http::Decoder
#[derive(Debug, Clone, Copy, Default)]
pub struct StrictJson<T>(pub T);

impl<S, T> FromRequest<S> for StrictJson<T>
where
    T: DeserializeOwned,
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let app = AppState::from_ref(state);
        match app.decoder.read_json(req.into_body()).await {
            Ok(value) => Ok(StrictJson(value)),
            Err(err) => Err(app.errors.bad_request(&err)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid id parameter")]
pub struct InvalidIdParam;

/// Parse a resource id: a positive 64-bit integer.
pub fn parse_id(raw: Option<&str>) -> Result<i64, InvalidIdParam> {
    match raw.and_then(|s| s.parse::<i64>().ok()) {
        Some(id) if id >= 1 => Ok(id),
        _ => Err(InvalidIdParam),
    }
}

/// The `{id}` path parameter of the matched route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdParam(pub i64);

impl<S> FromRequestParts<S> for IdParam
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app = AppState::from_ref(state);
        let params = Path::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .map(|Path(params)| params)
            .unwrap_or_default();

        parse_id(params.get("id").map(String::as_str))
            .map(IdParam)
            .map_err(|err| app.errors.bad_request(&err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id(Some("42")), Ok(42));
        assert_eq!(parse_id(Some("0")), Err(InvalidIdParam));
        assert_eq!(parse_id(Some("-3")), Err(InvalidIdParam));
        assert_eq!(parse_id(Some("abc")), Err(InvalidIdParam));
        assert_eq!(parse_id(Some("99999999999999999999")), Err(InvalidIdParam));
        assert_eq!(parse_id(None), Err(InvalidIdParam));
        assert_eq!(InvalidIdParam.to_string(), "invalid id parameter");
    }
}
