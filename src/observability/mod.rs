//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Boundary components (decoder, encoder, error responder):
//!     → logging.rs (structured log events through an injected Logger)
//! Router middleware:
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID is attached to every server-side error entry
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;

pub use logging::{Logger, LoggingError};
