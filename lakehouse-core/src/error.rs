use crate::validation::Rejection;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LakehouseError {
    #[error("Malformed field {field} on record {record_id}: {reason}")]
    MalformedField {
        record_id: String,
        field: String,
        reason: String,
    },

    #[error("Validation rejected record {record_id}: {rejection}")]
    Rejected {
        record_id: String,
        rejection: Rejection,
    },

    #[error("Batch ingest failed: {message}")]
    BatchIngest { message: String },

    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl LakehouseError {
    pub fn malformed(
        record_id: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::MalformedField {
            record_id: record_id.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// FHIRPath-style expression of the offending element, when the error is record-level
    pub fn expression(&self) -> Option<String> {
        match self {
            Self::MalformedField { field, .. } => Some(field.clone()),
            Self::Rejected { rejection, .. } => Some(rejection.expression().to_string()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, LakehouseError>;
