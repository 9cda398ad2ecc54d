//! Background session writes with a bounded shutdown grace period.
//!
//! Capturing a session happens on the owner thread; serializing and writing
//! it runs on the tokio blocking pool. When the host is about to be
//! suspended it calls [`SessionWriter::flush`] with the background-task
//! allowance: writes that finish inside the window are reported as
//! completed, anything still running is abandoned.

use super::PersistedSession;
use super::storage::save_session_to;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;

/// Outcome of waiting for in-flight writes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub completed: usize,
    pub failed: usize,
    pub abandoned: usize,
}

/// Offloads session writes to a runtime's blocking pool.
pub struct SessionWriter {
    runtime: Arc<Runtime>,
    path: PathBuf,
    in_flight: Mutex<Vec<JoinHandle<bool>>>,
    /// Highest sequence number written so far; older writes that land late are skipped
    last_written: Arc<Mutex<u64>>,
    next_seq: u64,
}

impl SessionWriter {
    pub fn new(runtime: Arc<Runtime>, path: PathBuf) -> Self {
        Self {
            runtime,
            path,
            in_flight: Mutex::new(Vec::new()),
            last_written: Arc::new(Mutex::new(0)),
            next_seq: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Queue `session` to be written in the background.
    pub fn submit(&mut self, session: PersistedSession) {
        self.next_seq += 1;
        let seq = self.next_seq;
        let path = self.path.clone();
        let last_written = Arc::clone(&self.last_written);

        let handle = self.runtime.spawn_blocking(move || {
            let mut last = last_written.lock();
            if *last > seq {
                log::debug!("Skipping stale session write {} (already wrote {})", seq, *last);
                return true;
            }
            match save_session_to(&session, &path) {
                Ok(()) => {
                    *last = seq;
                    true
                }
                Err(e) => {
                    log::warn!("Background session write failed: {:#}", e);
                    false
                }
            }
        });

        let mut in_flight = self.in_flight.lock();
        in_flight.retain(|h| !h.is_finished());
        in_flight.push(handle);
    }

    /// Number of writes not yet observed as finished
    pub fn pending(&self) -> usize {
        self.in_flight
            .lock()
            .iter()
            .filter(|h| !h.is_finished())
            .count()
    }

    /// Wait up to `grace` for every queued write.
    ///
    /// Must not be called from inside the writer's runtime.
    pub fn flush(&self, grace: Duration) -> FlushReport {
        let handles = std::mem::take(&mut *self.in_flight.lock());
        if handles.is_empty() {
            return FlushReport::default();
        }

        let report = self.runtime.block_on(async move {
            let deadline = tokio::time::Instant::now() + grace;
            let mut report = FlushReport::default();
            for handle in handles {
                match tokio::time::timeout_at(deadline, handle).await {
                    Ok(Ok(true)) => report.completed += 1,
                    Ok(Ok(false)) => report.failed += 1,
                    Ok(Err(e)) => {
                        log::warn!("Session write task panicked: {}", e);
                        report.failed += 1;
                    }
                    // Dropping the handle detaches the task
                    Err(_) => report.abandoned += 1,
                }
            }
            report
        });

        if report.abandoned > 0 {
            log::warn!(
                "Abandoned {} session write(s) after {:?} grace period",
                report.abandoned,
                grace
            );
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::storage::load_session_from;
    use chrono::{DateTime, TimeZone, Utc};
    use tempfile::tempdir;

    fn saved_at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, hour, 0, 0).unwrap()
    }

    fn session(saved_at: DateTime<Utc>) -> PersistedSession {
        PersistedSession {
            saved_at,
            selected: None,
            tabs: Vec::new(),
        }
    }

    #[test]
    fn test_flush_waits_for_writes() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("session.yaml");
        let runtime = Arc::new(Runtime::new().unwrap());
        let mut writer = SessionWriter::new(runtime, path.clone());

        writer.submit(session(saved_at(1)));
        writer.submit(session(saved_at(2)));
        let report = writer.flush(Duration::from_secs(5));

        assert_eq!(report.completed, 2);
        assert_eq!(report.failed + report.abandoned, 0);
        let loaded = load_session_from(&path).unwrap().unwrap();
        assert_eq!(loaded.session.saved_at, saved_at(2));
        assert_eq!(writer.pending(), 0);
    }

    #[test]
    fn test_flush_with_nothing_queued() {
        let temp = tempdir().unwrap();
        let runtime = Arc::new(Runtime::new().unwrap());
        let writer = SessionWriter::new(runtime, temp.path().join("s.yaml"));
        assert_eq!(writer.flush(Duration::from_millis(10)), FlushReport::default());
    }

    #[test]
    fn test_write_failure_is_reported_not_fatal() {
        let temp = tempdir().unwrap();
        // A directory in place of the file makes the rename fail
        let path = temp.path().join("blocked");
        std::fs::create_dir_all(path.join("child")).unwrap();
        let runtime = Arc::new(Runtime::new().unwrap());
        let mut writer = SessionWriter::new(runtime, path);

        writer.submit(session(saved_at(3)));
        let report = writer.flush(Duration::from_secs(5));
        assert_eq!(report.failed, 1);
    }
}
