//! Change notification for configuration files.
//!
//! Signals when a file behind a loaded store is written. Stores load once, so
//! acting on a signal means building a new store.

pub mod watcher;

pub use watcher::ConfigWatcher;
