//! Debounced filesystem watcher that re-runs the analysis pipeline and
//! broadcasts the resulting artifact (§6.4).

pub mod watcher;

pub use watcher::WatcherService;
