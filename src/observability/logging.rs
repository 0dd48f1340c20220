//! Structured logging.
//!
//! # Responsibilities
//! - Build the process-wide log sink from configuration
//! - Hand components an explicit handle to that sink
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - Log level configurable via config, `RUST_LOG` wins when set
//! - The sink is a `tracing::Dispatch` carried by [`Logger`]; components emit
//!   through their own handle instead of whatever default happens to be set
//!   on the current thread
//! - Each event is formatted into one buffer and written with a single call,
//!   so lines from concurrent requests never interleave

use std::io;

use thiserror::Error;
use tracing::Dispatch;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, ObservabilityConfig};

/// Error building the log sink.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter {directive:?}: {reason}")]
    Filter { directive: String, reason: String },

    #[error("a global logger is already installed")]
    AlreadyInstalled,
}

/// Cloneable handle to the process-wide log sink.
#[derive(Clone)]
pub struct Logger {
    dispatch: Dispatch,
}

impl Logger {
    /// Build a logger writing to stdout. `RUST_LOG` takes precedence over
    /// the configured level.
    pub fn from_config(config: &ObservabilityConfig) -> Result<Self, LoggingError> {
        let filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => parse_filter(&config.log_level)?,
        };
        Ok(Self::build(filter, config.log_format, io::stdout))
    }

    /// Build a logger writing to an arbitrary sink.
    pub fn with_writer<W>(config: &ObservabilityConfig, writer: W) -> Result<Self, LoggingError>
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let filter = parse_filter(&config.log_level)?;
        Ok(Self::build(filter, config.log_format, writer))
    }

    fn build<W>(filter: EnvFilter, format: LogFormat, writer: W) -> Self
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer);

        let dispatch = match format {
            LogFormat::Json => Dispatch::new(
                builder
                    .json()
                    .with_current_span(false)
                    .with_span_list(false)
                    .finish(),
            ),
            LogFormat::Pretty => Dispatch::new(builder.with_target(false).finish()),
        };

        Self { dispatch }
    }

    /// A logger that drops every event.
    pub fn disabled() -> Self {
        Self {
            dispatch: Dispatch::none(),
        }
    }

    /// Make this sink the process default, so events emitted outside of
    /// [`Logger::in_scope`] (e.g. `tower-http` spans) land in it too.
    pub fn install_global(&self) -> Result<(), LoggingError> {
        tracing::dispatcher::set_global_default(self.dispatch.clone())
            .map_err(|_| LoggingError::AlreadyInstalled)
    }

    /// Run `f` with this sink as the current dispatcher.
    pub fn in_scope<R>(&self, f: impl FnOnce() -> R) -> R {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }
}

fn parse_filter(directive: &str) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_new(directive).map_err(|err| LoggingError::Filter {
        directive: directive.to_string(),
        reason: err.to_string(),
    })
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger").finish_non_exhaustive()
    }
}
