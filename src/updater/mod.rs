//! Model-driven profile updates.
//!
//! One interaction in, one update-or-skip decision out. The updater never
//! retries and never raises past its boundary; the monitor decides what to
//! do with the outcome (currently: log it).

use crate::llm::{ModelInvoker, NO_UPDATE_SENTINEL, build_update_prompt};
use crate::models::InteractionRecord;
use crate::profile::{DEFAULT_PROFILE, ProfileStore};
use crate::Result;
use std::sync::Arc;

/// What an update attempt did to the profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The model declined the update or echoed the current profile.
    Unchanged,
    /// A replacement profile was written.
    Updated,
}

/// Applies model-generated revisions to the profile.
pub struct ProfileUpdater {
    /// Profile document storage.
    store: ProfileStore,
    /// Model invocation backend.
    invoker: Arc<dyn ModelInvoker>,
}

impl ProfileUpdater {
    /// Creates an updater over the given store and invoker.
    #[must_use]
    pub fn new(store: ProfileStore, invoker: Arc<dyn ModelInvoker>) -> Self {
        Self { store, invoker }
    }

    /// Runs one update-or-skip decision for `record`.
    ///
    /// Loads the current profile (substituting the default skeleton when it
    /// is blank, so the model never updates from an empty slate), asks the
    /// model named by the record for either the no-change sentinel or a
    /// complete replacement, and writes the replacement if one comes back.
    ///
    /// A response equal to the current profile is treated as no change even
    /// without the sentinel, in case the model echoes its input.
    ///
    /// # Errors
    ///
    /// Returns an error when the profile cannot be read or written or the
    /// model invocation fails. Nothing is retried.
    pub fn apply(&self, record: &InteractionRecord) -> Result<UpdateOutcome> {
        let loaded = self.store.load()?;
        let current = if loaded.trim().is_empty() {
            DEFAULT_PROFILE.to_string()
        } else {
            loaded
        };

        let prompt = build_update_prompt(&current, &record.prompt);
        let response = self.invoker.complete(&record.model, &prompt)?;
        let response = response.trim();

        if response == NO_UPDATE_SENTINEL || response == current.trim() {
            tracing::debug!(
                invoker = self.invoker.name(),
                model = %record.model,
                "model declined profile update"
            );
            return Ok(UpdateOutcome::Unchanged);
        }

        self.store.save(response)?;
        tracing::info!(
            invoker = self.invoker.name(),
            model = %record.model,
            bytes = response.len(),
            "profile updated"
        );
        Ok(UpdateOutcome::Updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Scripted invoker that records every call.
    struct MockInvoker {
        response: std::result::Result<String, String>,
        calls: Mutex<Vec<(String, String)>>,
    }

    impl MockInvoker {
        fn returning(response: &str) -> Self {
            Self {
                response: Ok(response.to_string()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing(cause: &str) -> Self {
            Self {
                response: Err(cause.to_string()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<(String, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ModelInvoker for MockInvoker {
        fn name(&self) -> &'static str {
            "mock"
        }

        fn complete(&self, model: &str, prompt: &str) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push((model.to_string(), prompt.to_string()));
            match &self.response {
                Ok(text) => Ok(text.clone()),
                Err(cause) => Err(Error::operation("mock_complete", cause)),
            }
        }
    }

    fn record(prompt: &str) -> InteractionRecord {
        InteractionRecord {
            id: 1,
            prompt: prompt.to_string(),
            model: "gpt-4".to_string(),
            timestamp: "2024-01-01 12:00:00".to_string(),
        }
    }

    fn updater_in(dir: &TempDir, invoker: Arc<MockInvoker>) -> (ProfileUpdater, ProfileStore) {
        let store = ProfileStore::new(dir.path().join("profile.md"));
        (ProfileUpdater::new(store.clone(), invoker), store)
    }

    #[test]
    fn test_sentinel_on_empty_profile_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let invoker = Arc::new(MockInvoker::returning(NO_UPDATE_SENTINEL));
        let (updater, store) = updater_in(&dir, Arc::clone(&invoker));

        let outcome = updater.apply(&record("hello")).unwrap();

        assert_eq!(outcome, UpdateOutcome::Unchanged);
        assert_eq!(store.load().unwrap(), "");
    }

    #[test]
    fn test_empty_profile_substitutes_skeleton_in_prompt() {
        let dir = TempDir::new().unwrap();
        let invoker = Arc::new(MockInvoker::returning(NO_UPDATE_SENTINEL));
        let (updater, _store) = updater_in(&dir, Arc::clone(&invoker));

        updater.apply(&record("hello")).unwrap();

        let calls = invoker.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].1.contains("## Personal Information"));
        assert!(calls[0].1.contains("hello"));
    }

    #[test]
    fn test_new_response_overwrites_profile_exactly() {
        let dir = TempDir::new().unwrap();
        let replacement = "# User Profile\n\n## Interests\n- Databases";
        let invoker = Arc::new(MockInvoker::returning(replacement));
        let (updater, store) = updater_in(&dir, invoker);

        let outcome = updater.apply(&record("I love databases")).unwrap();

        assert_eq!(outcome, UpdateOutcome::Updated);
        assert_eq!(store.load().unwrap(), replacement);
    }

    #[test]
    fn test_echoed_profile_is_suppressed() {
        let dir = TempDir::new().unwrap();
        let existing = "# User Profile\n\n## Interests\n- Compilers";
        let invoker = Arc::new(MockInvoker::returning(existing));
        let (updater, store) = updater_in(&dir, invoker);
        store.save(existing).unwrap();

        let outcome = updater.apply(&record("tell me about parsing")).unwrap();

        assert_eq!(outcome, UpdateOutcome::Unchanged);
        assert_eq!(store.load().unwrap(), existing);
    }

    #[test]
    fn test_sentinel_tolerates_surrounding_whitespace() {
        let dir = TempDir::new().unwrap();
        let invoker = Arc::new(MockInvoker::returning("  NO_UPDATE_NEEDED\n"));
        let (updater, store) = updater_in(&dir, invoker);
        store.save("existing profile").unwrap();

        let outcome = updater.apply(&record("hello")).unwrap();

        assert_eq!(outcome, UpdateOutcome::Unchanged);
        assert_eq!(store.load().unwrap(), "existing profile");
    }

    #[test]
    fn test_record_model_is_used_for_invocation() {
        let dir = TempDir::new().unwrap();
        let invoker = Arc::new(MockInvoker::returning(NO_UPDATE_SENTINEL));
        let (updater, _store) = updater_in(&dir, Arc::clone(&invoker));

        let mut rec = record("hello");
        rec.model = "claude-3-haiku".to_string();
        updater.apply(&rec).unwrap();

        assert_eq!(invoker.calls()[0].0, "claude-3-haiku");
    }

    #[test]
    fn test_invocation_failure_propagates() {
        let dir = TempDir::new().unwrap();
        let invoker = Arc::new(MockInvoker::failing("backend down"));
        let (updater, store) = updater_in(&dir, invoker);

        assert!(updater.apply(&record("hello")).is_err());
        assert_eq!(store.load().unwrap(), "");
    }
}
