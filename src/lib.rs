//! Directory-watching file organizer.
//!
//! Watches the directories named in `config.json` and moves, copies or
//! deletes files whose names end in a configured extension, both those
//! present at startup and those created later.

pub mod cli;
pub mod config;
pub mod logging;
pub mod matcher;
pub mod operation;
pub mod watcher;

pub use config::{ConfigError, LoggingConfig, Settings, WatchRule};
pub use matcher::matching_files;
pub use operation::{BatchSummary, InvalidOperationKind, OperationError, OperationKind};
pub use watcher::{
    DispatchError, DispatchReport, Dispatcher, SessionReport, WatchError, WatchSession,
    scan_and_apply,
};
