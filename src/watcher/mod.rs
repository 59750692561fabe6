//! Directory watching and rule dispatch.
//!
//! # Architecture
//!
//! ```text
//! Dispatcher
//!   - one tokio task per WatchRule
//!   - shared CancellationToken as stop signal
//!         |
//!    +----------+----------+
//!    |          |          |
//! Session    Session    Session
//!   - own notify::RecommendedWatcher (non-recursive)
//!   - own Debouncer
//!   - initial pass, then rescan on creation events
//!   - scan + operation on the blocking pool
//! ```

mod debouncer;
mod dispatcher;
mod error;
mod session;

pub use dispatcher::{DispatchReport, Dispatcher};
pub use error::{DispatchError, WatchError};
pub use session::{SessionReport, SessionState, WatchSession, is_creation, scan_and_apply};
