//! Request-time fragment surface.
//!
//! This is the entry point the host tool integration calls on every
//! invocation. It must never break or slow the user's primary command:
//! every failure degrades to an empty fragment, and the only side effect is
//! lazily starting the background monitor.

use crate::monitor::ProfileMonitor;
use crate::profile::ProfileStore;
use std::sync::Arc;

/// Source tag for profile-backed fragments.
pub const PROFILE_SOURCE: &str = "memory:profile";

/// Source tag for the diagnostic fragment.
pub const TEST_SOURCE: &str = "memory:test";

/// Fixed diagnostic text returned for the `test` argument.
pub const TEST_FRAGMENT: &str =
    "TEST FRAGMENT: This memory fragment system is working correctly!";

/// A named piece of text injected into a prompt, with origin attribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// The text to inject. Empty means "inject nothing".
    pub text: String,
    /// Where the text came from.
    pub source: &'static str,
}

impl Fragment {
    /// The empty fragment: nothing to inject.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            text: String::new(),
            source: "",
        }
    }

    /// Whether this fragment carries any text.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Resolves fragment arguments to injectable text.
///
/// Owns the process's [`ProfileMonitor`] handle; the monitor is started
/// lazily on the first `auto` resolution and stopped by whoever owns the
/// service (best-effort, on exit).
pub struct FragmentService {
    /// Profile document storage.
    store: ProfileStore,
    /// The process-wide monitor handle.
    monitor: Arc<ProfileMonitor>,
    /// Whether `auto` starts the monitor at all.
    monitor_enabled: bool,
}

impl FragmentService {
    /// Creates a service over explicit collaborators.
    #[must_use]
    pub fn new(store: ProfileStore, monitor: Arc<ProfileMonitor>, monitor_enabled: bool) -> Self {
        Self {
            store,
            monitor,
            monitor_enabled,
        }
    }

    /// Builds the full production wiring from configuration.
    #[must_use]
    pub fn from_config(config: &crate::config::PromemConfig) -> Self {
        Self::new(
            ProfileStore::from_config(config),
            Arc::new(ProfileMonitor::from_config(config)),
            config.monitor.enabled,
        )
    }

    /// The monitor handle, for lifecycle management by the owner.
    #[must_use]
    pub fn monitor(&self) -> &Arc<ProfileMonitor> {
        &self.monitor
    }

    /// Resolves a fragment argument.
    ///
    /// - `auto`: lazily starts the monitor, then returns the profile tagged
    ///   [`PROFILE_SOURCE`], or the empty fragment when the profile is blank
    ///   or unreadable.
    /// - `test`: the fixed diagnostic text tagged [`TEST_SOURCE`].
    /// - anything else: the empty fragment.
    ///
    /// This path is failure-opaque: it never errors and never panics.
    #[must_use]
    pub fn resolve(&self, argument: &str) -> Fragment {
        match argument {
            "auto" => {
                if self.monitor_enabled {
                    self.monitor.start();
                }
                match self.store.load() {
                    Ok(content) if !content.is_empty() => Fragment {
                        text: content,
                        source: PROFILE_SOURCE,
                    },
                    Ok(_) => Fragment::empty(),
                    Err(e) => {
                        tracing::debug!(error = %e, "profile unreadable, injecting nothing");
                        Fragment::empty()
                    },
                }
            },
            "test" => Fragment {
                text: TEST_FRAGMENT.to_string(),
                source: TEST_SOURCE,
            },
            other => {
                tracing::debug!(argument = %other, "unrecognized fragment argument");
                Fragment::empty()
            },
        }
    }
}
