//! Fan-out of watch rules into concurrent sessions.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::{Settings, WatchRule};
use crate::operation::OperationKind;

use super::error::{DispatchError, WatchError};
use super::session::{SessionReport, WatchSession};

/// Outcome of a dispatcher run.
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Sessions that started, in rule order.
    pub sessions: Vec<SessionReport>,
    /// Sessions that failed to start or ended abnormally.
    pub failed: Vec<WatchError>,
}

impl DispatchReport {
    /// Total files the operation was applied to across all sessions.
    pub fn files_processed(&self) -> usize {
        self.sessions.iter().map(|s| s.files_processed).sum()
    }
}

/// Runs one watch session per rule until the stop signal fires.
///
/// A session that fails to start is logged and the others keep running.
/// Only when no session starts does the run fail.
pub struct Dispatcher {
    rules: Vec<Arc<WatchRule>>,
    operation: OperationKind,
    debounce_ms: u64,
}

struct Launched {
    watch: PathBuf,
    started: oneshot::Receiver<Result<(), WatchError>>,
    handle: JoinHandle<Option<SessionReport>>,
}

impl Dispatcher {
    pub fn new(settings: &Settings, operation: OperationKind) -> Self {
        Self {
            rules: settings.file.iter().cloned().map(Arc::new).collect(),
            operation,
            debounce_ms: settings.debounce_ms,
        }
    }

    /// Launch every session and wait for all of them to end.
    ///
    /// Returns once `shutdown` is cancelled and every session has released
    /// its watch, or early with [`DispatchError::NoActiveSessions`].
    pub async fn run(self, shutdown: CancellationToken) -> Result<DispatchReport, DispatchError> {
        crate::log_event!(
            "dispatch",
            "starting",
            "{} sessions, operation {}",
            self.rules.len(),
            self.operation
        );

        let launched: Vec<Launched> = self
            .rules
            .iter()
            .map(|rule| self.launch(Arc::clone(rule), shutdown.clone()))
            .collect();

        let mut report = DispatchReport::default();
        let mut active = 0;
        let mut pending = Vec::with_capacity(launched.len());

        for session in launched {
            match session.started.await {
                Ok(Ok(())) => {
                    active += 1;
                    pending.push((session.watch, session.handle));
                }
                Ok(Err(e)) => {
                    tracing::error!("[dispatch] session failed to start: {e}");
                    report.failed.push(e);
                }
                Err(_) => {
                    let error = abnormal_end(session.watch, session.handle).await;
                    tracing::error!("[dispatch] {error}");
                    report.failed.push(error);
                }
            }
        }

        if active == 0 {
            return Err(DispatchError::NoActiveSessions {
                failed: report.failed.len(),
            });
        }

        if report.failed.is_empty() {
            crate::log_event!("dispatch", "watching", "{active} directories");
        } else {
            tracing::warn!(
                "[dispatch] watching {active} directories, {} failed to start",
                report.failed.len()
            );
        }

        for (watch, handle) in pending {
            match handle.await {
                Ok(Some(session)) => report.sessions.push(session),
                Ok(None) => {}
                Err(e) => {
                    let error = WatchError::SessionFailed {
                        path: watch,
                        details: e.to_string(),
                    };
                    tracing::error!("[dispatch] {error}");
                    report.failed.push(error);
                }
            }
        }

        crate::log_event!(
            "dispatch",
            "stopped",
            "{} files processed",
            report.files_processed()
        );
        Ok(report)
    }

    fn launch(&self, rule: Arc<WatchRule>, shutdown: CancellationToken) -> Launched {
        let (started_tx, started_rx) = oneshot::channel();
        let watch = rule.watch.clone();
        let operation = self.operation;
        let debounce_ms = self.debounce_ms;

        let handle = tokio::spawn(async move {
            match WatchSession::start(rule, operation, debounce_ms, shutdown) {
                Ok(session) => {
                    let _ = started_tx.send(Ok(()));
                    Some(session.run().await)
                }
                Err(e) => {
                    let _ = started_tx.send(Err(e));
                    None
                }
            }
        });

        Launched {
            watch,
            started: started_rx,
            handle,
        }
    }
}

/// The session task ended without reporting its start.
async fn abnormal_end(watch: PathBuf, handle: JoinHandle<Option<SessionReport>>) -> WatchError {
    let details = match handle.await {
        Err(e) => e.to_string(),
        Ok(_) => "ended before starting".to_string(),
    };
    WatchError::SessionFailed {
        path: watch,
        details,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn settings(rules: Vec<WatchRule>) -> Settings {
        Settings {
            file: rules,
            debounce_ms: 20,
            ..Settings::default()
        }
    }

    #[tokio::test]
    async fn test_all_sessions_failing_is_an_error() {
        let temp = TempDir::new().unwrap();
        let settings = settings(vec![
            WatchRule {
                extensions: vec![".log".to_string()],
                watch: temp.path().join("missing-a"),
                destination: None,
            },
            WatchRule {
                extensions: vec![".log".to_string()],
                watch: temp.path().join("missing-b"),
                destination: None,
            },
        ]);

        let dispatcher = Dispatcher::new(&settings, OperationKind::Delete);
        assert_eq!(dispatcher.rules.len(), 2);

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            dispatcher.run(CancellationToken::new()),
        )
        .await
        .expect("dispatcher should not wait when nothing is watched");

        assert!(matches!(
            result,
            Err(DispatchError::NoActiveSessions { failed: 2 })
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_stop_signal_ends_run() {
        let src = TempDir::new().unwrap();
        fs::write(src.path().join("stale.tmp"), "").unwrap();

        let settings = settings(vec![WatchRule {
            extensions: vec![".tmp".to_string()],
            watch: src.path().to_path_buf(),
            destination: None,
        }]);
        let dispatcher = Dispatcher::new(&settings, OperationKind::Delete);

        let shutdown = CancellationToken::new();
        let run = tokio::spawn(dispatcher.run(shutdown.clone()));

        let stale = src.path().join("stale.tmp");
        for _ in 0..100 {
            if !stale.exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(!stale.exists());

        shutdown.cancel();
        let report = tokio::time::timeout(Duration::from_secs(5), run)
            .await
            .expect("dispatcher did not stop")
            .unwrap()
            .unwrap();

        assert_eq!(report.sessions.len(), 1);
        assert!(report.failed.is_empty());
        assert_eq!(report.files_processed(), 1);
    }
}
