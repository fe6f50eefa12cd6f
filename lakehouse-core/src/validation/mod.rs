//! Data quality validation for masked Patient records
//!
//! Rule order: patient id → birth year range → gender value set.
//! Validation is all-or-nothing per record; nothing is repaired.

pub mod rules;

pub use rules::{Gender, Rejection, MIN_BIRTH_YEAR};

use crate::clock::Clock;
use crate::masking::{AgeGroup, MaskedPatient};
use serde::{Deserialize, Serialize};

/// A masked record that passed every rule
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedPatient {
    pub patient_id: String,
    pub name_masked: String,
    pub birth_year: i32,
    pub age_group: AgeGroup,
    pub gender: Gender,
    pub zip_region: String,
    pub mrn_masked: String,
    pub ssn_masked: Option<String>,
}

/// `initial == final_count + dropped` always holds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationCounts {
    pub initial: usize,
    #[serde(rename = "final")]
    pub final_count: usize,
    pub dropped: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedRecord {
    pub record_id: String,
    pub rejection: Rejection,
}

impl RejectedRecord {
    pub fn into_error(self) -> crate::error::LakehouseError {
        crate::error::LakehouseError::Rejected {
            record_id: self.record_id,
            rejection: self.rejection,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationOutcome {
    pub records: Vec<ValidatedPatient>,
    pub counts: ValidationCounts,
    pub rejected: Vec<RejectedRecord>,
}

pub struct Validator {
    current_year: i32,
}

impl Validator {
    pub fn new(current_year: i32) -> Self {
        Self { current_year }
    }

    pub fn from_clock(clock: &impl Clock) -> Self {
        Self::new(clock.current_year())
    }

    /// Run every rule against one record
    pub fn validate_one(&self, candidate: MaskedPatient) -> Result<ValidatedPatient, Rejection> {
        let patient_id = rules::check_patient_id(candidate.patient_id.as_deref())?.to_string();
        rules::check_birth_year(candidate.birth_year, self.current_year)?;
        let gender = rules::check_gender(candidate.gender.as_deref())?;

        Ok(ValidatedPatient {
            patient_id,
            name_masked: candidate.name_masked,
            birth_year: candidate.birth_year,
            age_group: candidate.age_group,
            gender,
            zip_region: candidate.zip_region,
            mrn_masked: candidate.mrn_masked,
            ssn_masked: candidate.ssn_masked,
        })
    }

    /// Filter a batch, keeping input order
    pub fn validate(&self, candidates: Vec<MaskedPatient>) -> ValidationOutcome {
        tracing::info!("Running data quality validations...");

        let initial = candidates.len();
        let mut records = Vec::with_capacity(initial);
        let mut rejected = Vec::new();

        for candidate in candidates {
            let record_id = candidate
                .patient_id
                .clone()
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| crate::resource::MISSING_ID.to_string());

            match self.validate_one(candidate) {
                Ok(record) => records.push(record),
                Err(rejection) => {
                    tracing::debug!(
                        record_id = %record_id,
                        rule = rejection.expression(),
                        "Record rejected: {}",
                        rejection
                    );
                    rejected.push(RejectedRecord {
                        record_id,
                        rejection,
                    });
                }
            }
        }

        let counts = ValidationCounts {
            initial,
            final_count: records.len(),
            dropped: rejected.len(),
        };

        tracing::info!(
            valid = counts.final_count,
            dropped = counts.dropped,
            "Validation complete: {} valid, {} dropped",
            counts.final_count,
            counts.dropped
        );

        if counts.dropped > 0 {
            tracing::warn!(
                "Data quality issue: {} records failed validation",
                counts.dropped
            );
        }

        ValidationOutcome {
            records,
            counts,
            rejected,
        }
    }
}
