//! JSON-over-HTTP boundary.
//!
//! # Data Flow
//! ```text
//! Request
//!     → request.rs (request ID, context for log entries)
//!     → extract.rs (StrictJson / IdParam, built on decode.rs)
//!     → [resource handler, outside this crate]
//!     → response.rs (Encoder: envelope.rs → tab-indented JSON)
//!       or errors.rs (ErrorResponder: failure category → status + envelope)
//!     → Response
//! ```

pub mod decode;
pub mod envelope;
pub mod errors;
pub mod extract;
pub mod request;
pub mod response;
pub mod server;

pub use decode::{DecodeError, Decoder};
pub use envelope::Envelope;
pub use errors::ErrorResponder;
pub use extract::{IdParam, InvalidIdParam, StrictJson};
pub use request::{RequestContext, X_REQUEST_ID};
pub use response::{EncodeError, Encoder};
pub use server::{ApiServer, AppState};
