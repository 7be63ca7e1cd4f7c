//! Read-only access to the host tool's interaction log.
//!
//! The log is an append-only SQLite database owned by the host tool. Its
//! location varies by installation, so it is resolved by asking the host
//! tool itself (see [`crate::host::HostTool::logs_path`]) and cached for the
//! process lifetime. The database is opened read-only on every query; promem
//! never writes to it.

use crate::host::HostTool;
use crate::models::InteractionRecord;
use crate::{Error, Result};
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

/// Most recent interaction newer than the watermark, or simply the most
/// recent one when no watermark is given. Ties on equal timestamps are
/// broken by the store's own ordering.
const LATEST_SINCE_SQL: &str = "\
SELECT id, prompt, model, datetime_utc FROM responses \
WHERE ?1 IS NULL OR datetime_utc > ?1 \
ORDER BY datetime_utc DESC LIMIT 1";

/// Reader for the host tool's interaction log.
pub struct InteractionLog {
    /// Host tool adapter used to resolve the log location lazily.
    host: Option<HostTool>,
    /// Resolved log path, cached after the first successful lookup.
    path: Mutex<Option<PathBuf>>,
}

/// Acquires a mutex lock, recovering from poisoning.
///
/// The cached path stays valid even if a previous holder panicked, so
/// recovery is safe here.
fn acquire_lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("interaction log mutex was poisoned, recovering");
            poisoned.into_inner()
        },
    }
}

impl InteractionLog {
    /// Creates a reader that resolves the log location through the host tool.
    #[must_use]
    pub fn new(host: HostTool) -> Self {
        Self {
            host: Some(host),
            path: Mutex::new(None),
        }
    }

    /// Creates a reader over an explicit database path, bypassing host tool
    /// resolution.
    #[must_use]
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            host: None,
            path: Mutex::new(Some(path.into())),
        }
    }

    /// Resolves the log database path, caching the first successful lookup.
    fn resolve_path(&self) -> Result<PathBuf> {
        let mut cached = acquire_lock(&self.path);
        if let Some(path) = cached.as_ref() {
            return Ok(path.clone());
        }

        let host = self.host.as_ref().ok_or_else(|| {
            Error::HostUnavailable("no host tool and no explicit log path".to_string())
        })?;
        let path = host.logs_path()?;
        tracing::debug!(path = %path.display(), "resolved interaction log location");
        *cached = Some(path.clone());
        Ok(path)
    }

    /// Returns the single most recent interaction with a timestamp strictly
    /// greater than `watermark`, or the most recent interaction overall when
    /// `watermark` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HostUnavailable`] when the log cannot be located and
    /// [`Error::OperationFailed`] on connection or query failures. Callers
    /// on the background path degrade both to "no record found".
    pub fn latest_since(&self, watermark: Option<&str>) -> Result<Option<InteractionRecord>> {
        let path = self.resolve_path()?;

        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| Error::operation("open_interaction_log", e))?;

        let mut stmt = conn
            .prepare(LATEST_SINCE_SQL)
            .map_err(|e| Error::operation("prepare_latest_since", e))?;

        stmt.query_row(params![watermark], |row| {
            Ok(InteractionRecord {
                id: row.get(0)?,
                // Tolerate NULL text columns; a record with no prompt is
                // skipped downstream anyway.
                prompt: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                model: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                timestamp: row.get(3)?,
            })
        })
        .optional()
        .map_err(|e| Error::operation("query_latest_since", e))
    }
}
