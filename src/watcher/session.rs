//! A watch session: one directory, one watch handle, sequential rescans.

use std::path::PathBuf;
use std::sync::Arc;

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

use crate::config::WatchRule;
use crate::matcher::matching_files;
use crate::operation::{BatchSummary, OperationKind};

use super::debouncer::Debouncer;
use super::error::WatchError;

/// Notifications buffered while a rescan is running.
const EVENT_BUFFER: usize = 100;

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Starting,
    Watching,
    Triggered,
    Stopped,
}

/// What a session did before it stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub watch: PathBuf,
    /// Rescans run, including the initial pass.
    pub cycles: usize,
    /// Rescans that ended in an error.
    pub failed_cycles: usize,
    /// Files the operation was applied to.
    pub files_processed: usize,
    /// Files skipped because the destination name was taken.
    pub files_skipped: usize,
}

/// Match `rule` against its directory and apply `operation` to the result.
///
/// Blocking. An empty match leaves the filesystem untouched.
pub fn scan_and_apply(
    rule: &WatchRule,
    operation: OperationKind,
) -> Result<BatchSummary, WatchError> {
    let matched =
        matching_files(&rule.watch, &rule.extensions).map_err(|source| WatchError::DirectoryRead {
            path: rule.watch.clone(),
            source,
        })?;

    if matched.is_empty() {
        return Ok(BatchSummary::default());
    }

    crate::debug_event!(
        "session",
        "matched",
        "{} files in {}",
        matched.len(),
        rule.watch.display()
    );

    operation
        .apply(&rule.watch, rule.destination_dir(), &matched)
        .map_err(|source| WatchError::Operation {
            path: rule.watch.clone(),
            source,
        })
}

/// Whether an event means a new entry appeared in the directory.
///
/// A rename into the directory counts, so `foo.part -> foo.pdf` triggers.
/// Backends that cannot tell the rename direction report `RenameMode::Any`,
/// which is accepted too.
pub fn is_creation(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_)
            | EventKind::Modify(ModifyKind::Name(
                RenameMode::To | RenameMode::Both | RenameMode::Any
            ))
    )
}

/// Owns the watch on one directory and rescans it on creation events.
pub struct WatchSession {
    rule: Arc<WatchRule>,
    operation: OperationKind,
    state: SessionState,
    debouncer: Debouncer,
    report: SessionReport,
    shutdown: CancellationToken,
    /// Declared before the watcher so a blocked sender is released first on drop.
    event_rx: mpsc::Receiver<notify::Result<Event>>,
    _watcher: notify::RecommendedWatcher,
}

impl WatchSession {
    /// Register the watch for `rule`.
    ///
    /// Failure here is fatal for the session.
    pub fn start(
        rule: Arc<WatchRule>,
        operation: OperationKind,
        debounce_ms: u64,
        shutdown: CancellationToken,
    ) -> Result<Self, WatchError> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        Self::with_channel(rule, operation, debounce_ms, shutdown, tx, rx)
    }

    /// Register the watch, forwarding notifications into `tx`.
    fn with_channel(
        rule: Arc<WatchRule>,
        operation: OperationKind,
        debounce_ms: u64,
        shutdown: CancellationToken,
        tx: mpsc::Sender<notify::Result<Event>>,
        rx: mpsc::Receiver<notify::Result<Event>>,
    ) -> Result<Self, WatchError> {
        let registration = |source| WatchError::Registration {
            path: rule.watch.clone(),
            source,
        };

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = tx.blocking_send(res);
        })
        .map_err(registration)?;

        watcher
            .watch(&rule.watch, RecursiveMode::NonRecursive)
            .map_err(registration)?;

        crate::debug_event!("session", "watching", "{}", rule.watch.display());

        let report = SessionReport {
            watch: rule.watch.clone(),
            cycles: 0,
            failed_cycles: 0,
            files_processed: 0,
            files_skipped: 0,
        };

        Ok(Self {
            rule,
            operation,
            state: SessionState::Starting,
            debouncer: Debouncer::new(debounce_ms),
            report,
            shutdown,
            event_rx: rx,
            _watcher: watcher,
        })
    }

    /// Run the initial pass, then rescan on creation events until stopped.
    ///
    /// The stop signal is only observed between rescans; a running batch
    /// always completes. The watch is released when this returns.
    pub async fn run(mut self) -> SessionReport {
        self.cycle("initial pass").await;
        self.transition(SessionState::Watching);

        loop {
            let deadline = self.debouncer.deadline().map(Instant::from_std);

            tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => break,

                received = self.event_rx.recv() => match received {
                    Some(Ok(event)) => self.handle_event(event),
                    Some(Err(e)) => {
                        let error = WatchError::from(e);
                        tracing::warn!("[session] {}: {error}", self.rule.watch.display());
                    }
                    None => {
                        tracing::warn!(
                            "[session] {}: notification channel closed",
                            self.rule.watch.display()
                        );
                        break;
                    }
                },

                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if let Some(events) = self.debouncer.take_ready() {
                        self.transition(SessionState::Triggered);
                        self.cycle(&format!("{events} creation events")).await;
                        self.transition(SessionState::Watching);
                    }
                }
            }
        }

        self.transition(SessionState::Stopped);
        crate::log_event!("session", "stopped", "{}", self.rule.watch.display());
        self.report
    }

    fn handle_event(&mut self, event: Event) {
        if is_creation(&event.kind) {
            self.debouncer.record();
        } else {
            crate::debug_event!("session", "ignored", "{:?} {:?}", event.kind, event.paths);
        }
    }

    /// One scan-and-apply on the blocking pool. Errors are logged, not returned.
    async fn cycle(&mut self, trigger: &str) {
        let rule = Arc::clone(&self.rule);
        let operation = self.operation;
        let outcome = tokio::task::spawn_blocking(move || scan_and_apply(&rule, operation)).await;

        self.report.cycles += 1;
        match outcome {
            Ok(Ok(summary)) => {
                self.report.files_processed += summary.processed;
                self.report.files_skipped += summary.skipped;
                if summary.skipped > 0 {
                    crate::debug_event!(
                        "session",
                        "skipped",
                        "{} files in {}, name taken in destination",
                        summary.skipped,
                        self.rule.watch.display()
                    );
                }
                if summary.processed > 0 {
                    crate::log_event!(
                        "session",
                        self.operation.as_str(),
                        "{} files from {} ({trigger})",
                        summary.processed,
                        self.rule.watch.display()
                    );
                } else {
                    crate::debug_event!(
                        "session",
                        "nothing to do",
                        "{} ({trigger})",
                        self.rule.watch.display()
                    );
                }
            }
            Ok(Err(e)) => {
                self.report.failed_cycles += 1;
                tracing::error!("[session] {e}");
            }
            Err(e) => {
                self.report.failed_cycles += 1;
                tracing::error!(
                    "[session] rescan of {} aborted: {e}",
                    self.rule.watch.display()
                );
            }
        }
    }

    fn transition(&mut self, next: SessionState) {
        crate::debug_event!(
            "session",
            "state",
            "{}: {:?} -> {next:?}",
            self.rule.watch.display(),
            self.state
        );
        self.state = next;
    }
}
