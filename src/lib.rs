//! JSON request/response boundary for CRUD API servers.
//!
//! Decodes request bodies strictly into typed destinations, encodes results
//! into a single-object envelope, and turns every failure into a uniform,
//! client-safe `{"error": ...}` response.

pub mod config;
pub mod http;
pub mod observability;
pub mod validator;

pub use config::ApiConfig;
pub use http::{ApiServer, Decoder, Encoder, Envelope, ErrorResponder};
pub use observability::Logger;
pub use validator::{ValidationErrors, Validator};
