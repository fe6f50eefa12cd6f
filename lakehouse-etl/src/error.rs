use lakehouse_core::LakehouseError;
use lakehouse_store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] LakehouseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EtlError>;
