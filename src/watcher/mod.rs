//! Directory watching with per-file debouncing.
//!
//! ```text
//! notify thread --mpsc--> DirectoryWatcher loop
//!                           - Debouncer (per-path quiet period)
//!                           - 100ms tick collects settled paths
//!                                 |
//!                           WatchHandler (owned, &mut self)
//! ```

mod debouncer;
mod directory;
mod error;
mod handler;

pub use debouncer::Debouncer;
pub use directory::{DirectoryWatcher, DirectoryWatcherBuilder};
pub use error::WatchError;
pub use handler::WatchHandler;
