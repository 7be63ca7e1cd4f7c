//! Model invocation abstraction.
//!
//! The production implementation routes every completion through the host
//! tool itself, so the profile update runs on whichever model the user was
//! already talking to, with the user's own credentials and configuration.

mod update_prompt;

pub use update_prompt::{NO_UPDATE_SENTINEL, build_update_prompt};

use crate::Result;
use crate::host::HostTool;

/// Trait for synchronous model invocation.
pub trait ModelInvoker: Send + Sync {
    /// The invoker name, for logging.
    fn name(&self) -> &'static str;

    /// Generates a completion for `prompt` from the model identified by
    /// `model`. An empty identifier means "whatever the backend's default
    /// model is".
    ///
    /// # Errors
    ///
    /// Returns an error if the completion fails.
    fn complete(&self, model: &str, prompt: &str) -> Result<String>;
}

/// [`ModelInvoker`] backed by the host command-line tool.
#[derive(Debug, Clone)]
pub struct HostToolInvoker {
    /// Subprocess adapter for the host tool.
    host: HostTool,
}

impl HostToolInvoker {
    /// Creates an invoker over the given host tool adapter.
    #[must_use]
    pub fn new(host: HostTool) -> Self {
        Self { host }
    }

    /// Creates an invoker from configuration.
    #[must_use]
    pub fn from_config(config: &crate::config::HostToolConfig) -> Self {
        Self::new(HostTool::from_config(config))
    }
}

impl ModelInvoker for HostToolInvoker {
    fn name(&self) -> &'static str {
        "host-tool"
    }

    fn complete(&self, model: &str, prompt: &str) -> Result<String> {
        self.host.complete(model, prompt)
    }
}
