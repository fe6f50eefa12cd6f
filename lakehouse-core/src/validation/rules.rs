//! Data quality rules for masked Patient records
//!
//! Applied in declaration order; the first failing rule rejects the record.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Earliest accepted birth year
pub const MIN_BIRTH_YEAR: i32 = 1900;

/// Administrative gender, restricted to the FHIR value set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
    Unknown,
}

impl Gender {
    pub const ALL: [Gender; 4] = [Gender::Male, Gender::Female, Gender::Other, Gender::Unknown];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
            Gender::Unknown => "unknown",
        }
    }

    /// Exact, case-sensitive match against the value set
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.as_str() == s)
    }
}

/// Why a record was dropped by validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Rejection {
    #[error("patient id is missing or empty")]
    MissingPatientId,

    #[error("birth year {year} is after the current year {current_year}")]
    BirthYearInFuture { year: i32, current_year: i32 },

    #[error("birth year {year} is before 1900")]
    BirthYearTooEarly { year: i32 },

    #[error("gender {value:?} is not one of male, female, other, unknown")]
    InvalidGender { value: String },
}

impl Rejection {
    /// Element the failing rule looked at
    pub fn expression(&self) -> &'static str {
        match self {
            Rejection::MissingPatientId => "Patient.id",
            Rejection::BirthYearInFuture { .. } | Rejection::BirthYearTooEarly { .. } => {
                "Patient.birthDate"
            }
            Rejection::InvalidGender { .. } => "Patient.gender",
        }
    }
}

pub fn check_patient_id(patient_id: Option<&str>) -> Result<&str, Rejection> {
    patient_id
        .filter(|id| !id.is_empty())
        .ok_or(Rejection::MissingPatientId)
}

pub fn check_birth_year(year: i32, current_year: i32) -> Result<(), Rejection> {
    if year > current_year {
        Err(Rejection::BirthYearInFuture { year, current_year })
    } else if year < MIN_BIRTH_YEAR {
        Err(Rejection::BirthYearTooEarly { year })
    } else {
        Ok(())
    }
}

pub fn check_gender(gender: Option<&str>) -> Result<Gender, Rejection> {
    match gender {
        Some(g) => Gender::parse(g).ok_or_else(|| Rejection::InvalidGender {
            value: g.to_string(),
        }),
        None => Err(Rejection::InvalidGender {
            value: String::new(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patient_id() {
        assert_eq!(check_patient_id(Some("1001")), Ok("1001"));
        assert_eq!(check_patient_id(Some("")), Err(Rejection::MissingPatientId));
        assert_eq!(check_patient_id(None), Err(Rejection::MissingPatientId));
    }

    #[test]
    fn test_birth_year_bounds() {
        assert!(check_birth_year(1900, 2024).is_ok());
        assert!(check_birth_year(2024, 2024).is_ok());
        assert_eq!(
            check_birth_year(2050, 2024),
            Err(Rejection::BirthYearInFuture {
                year: 2050,
                current_year: 2024
            })
        );
        assert_eq!(
            check_birth_year(1899, 2024),
            Err(Rejection::BirthYearTooEarly { year: 1899 })
        );
    }

    #[test]
    fn test_gender_value_set() {
        assert_eq!(check_gender(Some("female")), Ok(Gender::Female));
        assert_eq!(check_gender(Some("unknown")), Ok(Gender::Unknown));
        assert!(check_gender(Some("Male")).is_err());
        assert!(check_gender(Some("invalid_gender")).is_err());
        assert!(check_gender(None).is_err());
    }

    #[test]
    fn test_rejection_display() {
        let r = Rejection::BirthYearTooEarly { year: 1850 };
        assert_eq!(r.to_string(), "birth year 1850 is before 1900");
        assert_eq!(r.expression(), "Patient.birthDate");
    }

    #[test]
    fn test_rejection_serializes_rule_tag() {
        let json = serde_json::to_value(Rejection::MissingPatientId).unwrap();
        assert_eq!(json["rule"], "missing_patient_id");
    }
}
