//! Top-level wrapper for every JSON response body.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::http::response::EncodeError;

/// Named values written as the single top-level JSON object of a response.
///
/// Values are converted to [`Value`] on insertion. The first value that
/// cannot be represented as JSON is kept as an [`EncodeError`] and reported
/// when the envelope is encoded, so handlers can build envelopes without
/// threading a `Result` through every insertion.
#[derive(Debug, Default)]
pub struct Envelope {
    fields: Map<String, Value>,
    failure: Option<EncodeError>,
}

impl Envelope {
    pub fn new() -> Self {
        Self::default()
    }

    /// `{"error": message}`, the body of every error response.
    pub fn error(message: impl Serialize) -> Self {
        Self::new().with("error", message)
    }

    /// Builder form of [`Envelope::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert `value` under `key`, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Serialize) {
        let key = key.into();
        match serde_json::to_value(value) {
            Ok(value) => {
                self.fields.insert(key, value);
            }
            Err(source) => {
                if self.failure.is_none() {
                    self.failure = Some(EncodeError::Field { key, source });
                }
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The JSON object this envelope encodes to.
    pub fn into_value(self) -> Result<Value, EncodeError> {
        match self.failure {
            Some(err) => Err(err),
            None => Ok(Value::Object(self.fields)),
        }
    }
}

impl From<Map<String, Value>> for Envelope {
    fn from(fields: Map<String, Value>) -> Self {
        Self {
            fields,
            failure: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::ser::{Error as _, Serializer};
    use serde_json::json;
    use std::collections::BTreeMap;

    struct Unrepresentable;

    impl Serialize for Unrepresentable {
        fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("cannot be represented as JSON"))
        }
    }

    #[test]
    fn test_heterogeneous_values() {
        let mut nested = BTreeMap::new();
        nested.insert("title", "must be provided");

        let envelope = Envelope::new()
            .with("count", 3)
            .with("name", "casablanca")
            .with("errors", &nested);

        assert_eq!(envelope.len(), 3);
        assert_eq!(
            envelope.into_value().unwrap(),
            json!({
                "count": 3,
                "name": "casablanca",
                "errors": {"title": "must be provided"},
            })
        );
    }

    #[test]
    fn test_insert_replaces() {
        let envelope = Envelope::error("first").with("error", "second");
        assert_eq!(envelope.get("error"), Some(&json!("second")));
        assert_eq!(envelope.len(), 1);
    }

    #[test]
    fn test_first_failure_is_kept() {
        let envelope = Envelope::new()
            .with("ok", 1)
            .with("bad", Unrepresentable)
            .with("worse", Unrepresentable);

        match envelope.into_value() {
            Err(EncodeError::Field { key, .. }) => assert_eq!(key, "bad"),
            other => panic!("expected field failure, got {other:?}"),
        }
    }

    #[test]
    fn test_non_string_map_keys_fail() {
        let mut grid = BTreeMap::new();
        grid.insert((1, 2), "cell");

        let envelope = Envelope::new().with("grid", grid);
        assert!(envelope.into_value().is_err());
    }
}
