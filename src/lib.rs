// Library exports for the binary and integration tests

pub mod assets;
pub mod binder;
pub mod chrome;
pub mod config;
pub mod dom;
pub mod engine;
pub mod i18n;
pub mod observe;
pub mod persistence;
pub mod state;
pub mod storage;
pub mod widget;

// Re-export commonly used types for tests
pub use config::WidgetConfig;
pub use dom::{Document, NodeId};
pub use state::{PreferenceState, PreferenceStore};
pub use storage::{KeyValueStore, MemoryStore, SqliteStore};
pub use widget::WidgetContext;
