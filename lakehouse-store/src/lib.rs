pub mod error;
pub mod file_store;
pub mod layer;
pub mod run_log;
pub mod sqlite_store;

pub use error::{Result, StoreError};
pub use file_store::FileStore;
pub use layer::{get_json, put_json, Layer, LayerStore};
pub use run_log::{RunCounts, RunEntry, RunLog, Stage};
pub use sqlite_store::SqliteStore;
