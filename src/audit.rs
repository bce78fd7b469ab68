//! Append-only audit log writer.
//!
//! This is the in-crate half of the boundary described by the design notes:
//! the log's *consumers* (dashboards, alerting) are external, but the write
//! path lives here because every transport needs it.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use chrono::Local;

/// Append-only sink for `timestamp | event | user=<v> | <detail>` lines.
pub struct AuditLog {
    path: PathBuf,
    // A single mutex around the whole write path is simplest and matches
    // the audit log's own low-frequency, append-only usage pattern.
    lock: Arc<Mutex<()>>,
}

impl AuditLog {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Record one audit event synchronously. Logs (but does not propagate)
    /// write failures — an audit-log hiccup must never fail the request
    /// that triggered it.
    pub fn record(&self, event: &str, user: Option<&str>, detail: &str) {
        Self::write_line(&self.path, &self.lock, event, user, detail);
    }

    /// Record one audit event off the async scheduler (§5: all I/O must be
    /// non-blocking relative to it). Fire-and-forget: a slow or failing
    /// disk must never delay or fail the request that triggered the entry.
    pub fn record_async(&self, event: String, user: Option<String>, detail: String) {
        let path = self.path.clone();
        let lock = Arc::clone(&self.lock);
        tokio::task::spawn_blocking(move || {
            Self::write_line(&path, &lock, &event, user.as_deref(), &detail);
        });
    }

    fn write_line(path: &PathBuf, lock: &Mutex<()>, event: &str, user: Option<&str>, detail: &str) {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        let user = user.unwrap_or("-");
        let line = format!("{timestamp} | {event} | user={user} | {detail}\n");

        let _guard = lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut f| f.write_all(line.as_bytes()));

        if let Err(err) = result {
            tracing::warn!(path = %path.display(), %err, "failed to write audit log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_expected_line_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let log = AuditLog::new(path.clone());
        log.record("tools/call search_users", Some("alice"), "query=region EU");

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("tools/call search_users"));
        assert!(contents.contains("user=alice"));
        assert!(contents.ends_with('\n'));
    }

    #[test]
    fn anonymous_user_renders_as_dash() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let log = AuditLog::new(path.clone());
        log.record("initialize", None, "");

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("user=-"));
    }

    #[tokio::test]
    async fn record_async_writes_off_the_calling_task() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let log = AuditLog::new(path.clone());

        log.record_async("tools/call query_data".to_string(), None, "ok".to_string());
        // spawn_blocking work is scheduled immediately but may not have
        // completed yet; yield until the blocking pool has run it.
        for _ in 0..50 {
            if std::fs::read_to_string(&path).is_ok_and(|c| !c.is_empty()) {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("tools/call query_data"));
    }
}
