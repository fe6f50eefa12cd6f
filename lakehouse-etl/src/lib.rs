//! lakehouse-etl - Bronze to Silver jobs over a layer store
//!
//! Generates raw FHIR bundles into Bronze, masks and validates them into
//! Silver, and keeps a run log of every job.

pub mod audit;
pub mod config;
pub mod error;
pub mod jobs;
pub mod logging;

use config::{EtlConfig, StorageBackend};
use error::Result;
use lakehouse_store::{FileStore, LayerStore, RunLog, SqliteStore};

/// Everything a job needs: configuration, the layer store and the run log
pub struct AppState {
    pub config: EtlConfig,
    pub store: Box<dyn LayerStore>,
    pub run_log: RunLog,
}

impl AppState {
    /// Create the data directory and open the configured backend
    pub fn open(config: EtlConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.storage.data_dir).map_err(lakehouse_store::StoreError::from)?;

        let store: Box<dyn LayerStore> = match config.storage.backend {
            StorageBackend::File => Box::new(FileStore::open(&config.storage.data_dir)?),
            StorageBackend::Sqlite => Box::new(SqliteStore::open(config.documents_db_path())?),
        };
        let run_log = RunLog::open(config.run_log_db_path())?;

        tracing::debug!(
            backend = %config.storage.backend,
            data_dir = %config.storage.data_dir.display(),
            "Opened layer store"
        );

        Ok(Self {
            config,
            store,
            run_log,
        })
    }
}
