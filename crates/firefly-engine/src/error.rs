//! Error types for the engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during startup and serving.

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: firefly_core::config::ConfigError,
    },

    /// The viewer server failed to start.
    #[error("startup error: {source}")]
    Startup {
        /// The underlying startup error.
        #[from]
        source: firefly_server::StartupError,
    },

    /// The viewer server stopped with an error.
    #[error("server error: {source}")]
    Server {
        /// The underlying server error.
        #[from]
        source: firefly_server::ServerError,
    },

    /// A background task ended unexpectedly.
    #[error("task error: {message}")]
    Task {
        /// Description of the task failure.
        message: String,
    },
}
