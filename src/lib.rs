//! # Promem
//!
//! Background user-profile memory for LLM command-line tools.
//!
//! Promem maintains a small persistent markdown profile describing the user,
//! injects it into prompts on request, and keeps it up to date by watching
//! the host tool's interaction log and asking a language model to revise the
//! profile after each new interaction.
//!
//! ## Architecture
//!
//! - [`profile::ProfileStore`]: the profile document on disk
//! - [`logstore::InteractionLog`]: read-only view of the host tool's log
//! - [`updater::ProfileUpdater`]: model-driven update-or-skip decision
//! - [`monitor::ProfileMonitor`]: single background polling worker
//! - [`fragment::FragmentService`]: request-time injection surface
//!
//! ## Example
//!
//! ```rust,ignore
//! use promem::config::PromemConfig;
//! use promem::fragment::FragmentService;
//!
//! let config = PromemConfig::load_default();
//! let service = FragmentService::from_config(&config);
//! let fragment = service.resolve("auto");
//! println!("{}", fragment.text);
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

use thiserror::Error as ThisError;

// Module declarations
pub mod config;
pub mod fragment;
pub mod host;
pub mod llm;
pub mod logstore;
pub mod models;
pub mod monitor;
pub mod observability;
pub mod profile;
pub mod shell;
pub mod updater;

// Re-exports for convenience
pub use config::PromemConfig;
pub use fragment::{Fragment, FragmentService};
pub use llm::ModelInvoker;
pub use models::InteractionRecord;
pub use monitor::ProfileMonitor;
pub use profile::ProfileStore;
pub use updater::{ProfileUpdater, UpdateOutcome};

/// Error type for promem operations.
///
/// Uses `thiserror` for automatic `Display` and `Error` trait implementations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Unrecognized shell family, malformed config values |
/// | `OperationFailed` | I/O errors, log-store queries fail, model invocation fails |
/// | `HostUnavailable` | The host tool cannot be executed, exits non-zero, or times out |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    ///
    /// Raised when:
    /// - The `SHELL` environment variable names an unsupported shell family
    /// - A config file value cannot be interpreted
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    ///
    /// Raised when:
    /// - Filesystem I/O on the profile or an rc file fails
    /// - A log-store connection or query fails
    /// - A model invocation returns an error or unusable output
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// The host tool could not be reached.
    ///
    /// Raised when the host command cannot be spawned, exits with a non-zero
    /// status, exceeds its timeout, or reports a log path that does not
    /// exist. Callers on the background path degrade this to "log
    /// unavailable" rather than surfacing it.
    #[error("host tool unavailable: {0}")]
    HostUnavailable(String),
}

/// Result type alias for promem operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Shorthand for an [`Error::OperationFailed`] with a named operation.
    pub(crate) fn operation(operation: &str, cause: impl std::fmt::Display) -> Self {
        Self::OperationFailed {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }
}
