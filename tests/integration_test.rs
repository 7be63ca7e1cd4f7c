//! End-to-end integration tests.
//!
//! Wires the real services together over a temporary profile file and a
//! temporary SQLite interaction log, with a scripted model invoker standing
//! in for the host tool.

use promem::config::MonitorConfig;
use promem::fragment::{FragmentService, PROFILE_SOURCE, TEST_FRAGMENT, TEST_SOURCE};
use promem::llm::{ModelInvoker, NO_UPDATE_SENTINEL};
use promem::logstore::InteractionLog;
use promem::monitor::ProfileMonitor;
use promem::profile::ProfileStore;
use promem::updater::ProfileUpdater;
use rusqlite::{Connection, params};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Scripted invoker: counts calls, returns a fixed response or fails.
struct ScriptedInvoker {
    response: Option<String>,
    calls: AtomicUsize,
}

impl ScriptedInvoker {
    fn returning(response: &str) -> Self {
        Self {
            response: Some(response.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    fn failing() -> Self {
        Self {
            response: None,
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ModelInvoker for ScriptedInvoker {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn complete(&self, _model: &str, _prompt: &str) -> promem::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response.clone().ok_or_else(|| {
            promem::Error::OperationFailed {
                operation: "scripted_complete".to_string(),
                cause: "scripted failure".to_string(),
            }
        })
    }
}

struct Harness {
    _dir: TempDir,
    db_path: PathBuf,
    store: ProfileStore,
    invoker: Arc<ScriptedInvoker>,
    service: FragmentService,
}

fn harness(invoker: ScriptedInvoker) -> Harness {
    let dir = TempDir::new().unwrap();

    let db_path = dir.path().join("logs.db");
    let conn = Connection::open(&db_path).unwrap();
    conn.execute_batch(
        "CREATE TABLE responses (
            id INTEGER PRIMARY KEY,
            prompt TEXT,
            response TEXT,
            model TEXT,
            datetime_utc TEXT
        )",
    )
    .unwrap();

    let store = ProfileStore::new(dir.path().join("memory").join("profile.md"));
    let invoker = Arc::new(invoker);
    let updater = Arc::new(ProfileUpdater::new(
        store.clone(),
        Arc::clone(&invoker) as Arc<dyn ModelInvoker>,
    ));
    let log = Arc::new(InteractionLog::with_path(&db_path));
    let monitor = Arc::new(ProfileMonitor::new(
        log,
        updater,
        MonitorConfig {
            enabled: true,
            poll_interval: Duration::from_millis(20),
            stop_check_interval: Duration::from_millis(5),
            stop_join_timeout: Duration::from_secs(1),
        },
    ));
    let service = FragmentService::new(store.clone(), monitor, true);

    Harness {
        _dir: dir,
        db_path,
        store,
        invoker,
        service,
    }
}

fn insert_interaction(harness: &Harness, prompt: &str, ts: &str) {
    let conn = Connection::open(&harness.db_path).unwrap();
    conn.execute(
        "INSERT INTO responses (prompt, response, model, datetime_utc) VALUES (?1, ?2, ?3, ?4)",
        params![prompt, "a response", "gpt-4", ts],
    )
    .unwrap();
}

fn wait_until(deadline: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let end = Instant::now() + deadline;
    while Instant::now() < end {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    condition()
}

#[test]
fn test_fragment_resolution_lifecycle() {
    let h = harness(ScriptedInvoker::returning(NO_UPDATE_SENTINEL));

    // No profile yet: auto resolves to nothing.
    let fragment = h.service.resolve("auto");
    assert!(fragment.is_empty());

    // A saved profile is returned verbatim, with source attribution.
    h.store.save("hello").unwrap();
    let fragment = h.service.resolve("auto");
    assert_eq!(fragment.text, "hello");
    assert_eq!(fragment.source, PROFILE_SOURCE);

    // The diagnostic fragment ignores file state.
    let fragment = h.service.resolve("test");
    assert_eq!(fragment.text, TEST_FRAGMENT);
    assert_eq!(fragment.source, TEST_SOURCE);

    // Unrecognized arguments resolve to nothing.
    assert!(h.service.resolve("bogus").is_empty());

    h.service.monitor().stop();
}

#[test]
fn test_monitor_updates_profile_from_new_interactions() {
    let replacement = "# User Profile\n\n## Interests\n- Rust development";
    let h = harness(ScriptedInvoker::returning(replacement));

    // Starting the monitor through the fragment surface.
    h.service.resolve("auto");
    assert!(h.service.monitor().is_running());

    insert_interaction(&h, "I mostly write Rust these days", "2024-01-01 10:00:00");

    assert!(
        wait_until(Duration::from_secs(2), || {
            h.store.load().unwrap() == replacement
        }),
        "profile was not updated from the interaction log"
    );

    // The record is processed exactly once.
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(h.invoker.calls(), 1);

    h.service.monitor().stop();
    assert!(!h.service.monitor().is_running());
}

#[test]
fn test_failed_update_is_dropped_not_retried() {
    let h = harness(ScriptedInvoker::failing());

    h.service.resolve("auto");
    insert_interaction(&h, "this update will fail", "2024-01-01 10:00:00");

    assert!(
        wait_until(Duration::from_secs(2), || h.invoker.calls() >= 1),
        "monitor never attempted the update"
    );

    // Several poll intervals later the failed record has not been retried.
    std::thread::sleep(Duration::from_millis(150));
    assert_eq!(h.invoker.calls(), 1);
    assert_eq!(h.store.load().unwrap(), "");

    // A newer record is still picked up: the failure stopped nothing.
    insert_interaction(&h, "but this one works", "2024-01-01 11:00:00");
    assert!(
        wait_until(Duration::from_secs(2), || h.invoker.calls() >= 2),
        "monitor stalled after a failed update"
    );

    h.service.monitor().stop();
}

#[test]
fn test_sentinel_keeps_profile_stable() {
    let h = harness(ScriptedInvoker::returning(NO_UPDATE_SENTINEL));
    h.store.save("# User Profile\n- stable").unwrap();

    h.service.resolve("auto");
    insert_interaction(&h, "nothing new about me", "2024-01-01 10:00:00");

    assert!(
        wait_until(Duration::from_secs(2), || h.invoker.calls() >= 1),
        "monitor never consulted the model"
    );
    std::thread::sleep(Duration::from_millis(100));

    assert_eq!(h.store.load().unwrap(), "# User Profile\n- stable");

    h.service.monitor().stop();
}
