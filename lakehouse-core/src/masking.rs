//! HIPAA PII masking
//!
//! Every function here is pure and lossy: the masked value carries strictly
//! less identifying information than its input, and there is no inverse.
//!
//! | Element    | Masked form                  |
//! |------------|------------------------------|
//! | name       | `J. Smith` (first initial)   |
//! | ssn        | `***-**-6789`                |
//! | identifier | `***1001` (last 4 of MRN)    |
//! | postalCode | `100` (3-digit region)       |
//! | birthDate  | birth year + age group       |

use crate::error::{LakehouseError, Result};
use crate::resource::{Address, HumanName, Identifier, Patient};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Zip region used when the patient has no usable address
pub const UNKNOWN_ZIP_REGION: &str = "UNK";

/// Birth years after this are classified `Adult`, the rest `Senior`.
///
/// This is a fixed birth-year cut-off, not an age computed against the current
/// date, so a patient born in 1961 stays `Adult` forever. Downstream reports
/// depend on the literal behavior.
pub const AGE_GROUP_THRESHOLD_YEAR: i32 = 1960;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgeGroup {
    Adult,
    Senior,
}

impl AgeGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgeGroup::Adult => "Adult",
            AgeGroup::Senior => "Senior",
        }
    }
}

/// A masking input that violates its constraint
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct FieldError {
    pub field: &'static str,
    pub reason: String,
}

impl FieldError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }

    /// Attach the owning record id
    pub fn for_record(self, record_id: &str) -> LakehouseError {
        LakehouseError::malformed(record_id, self.field, self.reason)
    }
}

/// `"{given[0][0]}. {family}"` from the first name entry
pub fn mask_name(names: &[HumanName]) -> std::result::Result<String, FieldError> {
    let name = names
        .first()
        .ok_or_else(|| FieldError::new("Patient.name", "missing"))?;

    let initial = name
        .given
        .first()
        .and_then(|given| given.chars().next())
        .ok_or_else(|| FieldError::new("Patient.name[0].given[0]", "missing or empty"))?;

    let family = name
        .family
        .as_deref()
        .filter(|f| !f.is_empty())
        .ok_or_else(|| FieldError::new("Patient.name[0].family", "missing or empty"))?;

    Ok(format!("{}. {}", initial, family))
}

/// `"***-**-{last 4}"`; an absent SSN stays absent
///
/// Accepts `ddddddddd` or `ddd-dd-dddd`.
pub fn mask_ssn(ssn: Option<&str>) -> std::result::Result<Option<String>, FieldError> {
    let Some(ssn) = ssn else {
        return Ok(None);
    };

    if !is_ssn_shape(ssn) {
        return Err(FieldError::new(
            "Patient.ssn",
            "expected 9 digits, optionally hyphenated as ddd-dd-dddd",
        ));
    }

    // ASCII-only at this point, so byte slicing is safe
    Ok(Some(format!("***-**-{}", &ssn[ssn.len() - 4..])))
}

fn is_ssn_shape(ssn: &str) -> bool {
    let bytes = ssn.as_bytes();
    match bytes.len() {
        9 => bytes.iter().all(u8::is_ascii_digit),
        11 => bytes.iter().enumerate().all(|(i, b)| {
            if i == 3 || i == 6 {
                *b == b'-'
            } else {
                b.is_ascii_digit()
            }
        }),
        _ => false,
    }
}

/// `"***{last 4}"` of the first identifier's value
pub fn mask_mrn(identifiers: &[Identifier]) -> std::result::Result<String, FieldError> {
    let value = identifiers
        .first()
        .and_then(|i| i.value.as_deref())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| FieldError::new("Patient.identifier[0].value", "missing or empty"))?;

    let chars: Vec<char> = value.chars().collect();
    if chars.len() < 4 {
        return Err(FieldError::new(
            "Patient.identifier[0].value",
            format!("needs at least 4 characters, got {}", chars.len()),
        ));
    }

    let tail: String = chars[chars.len() - 4..].iter().collect();
    Ok(format!("***{}", tail))
}

/// First 3 characters of the first address's postal code, `"UNK"` without one
pub fn mask_zip(address: Option<&[Address]>) -> std::result::Result<String, FieldError> {
    let postal_code = address
        .and_then(|a| a.first())
        .and_then(|a| a.postal_code.as_deref());

    let Some(postal_code) = postal_code else {
        return Ok(UNKNOWN_ZIP_REGION.to_string());
    };

    let region: String = postal_code.chars().take(3).collect();
    if region.chars().count() < 3 {
        return Err(FieldError::new(
            "Patient.address[0].postalCode",
            format!("{:?} is shorter than 3 characters", postal_code),
        ));
    }
    Ok(region)
}

/// Year from the leading 4 characters of an ISO `birthDate`
pub fn parse_birth_year(birth_date: Option<&str>) -> std::result::Result<i32, FieldError> {
    let birth_date = birth_date.ok_or_else(|| FieldError::new("Patient.birthDate", "missing"))?;

    let year = birth_date
        .get(..4)
        .filter(|y| y.bytes().all(|b| b.is_ascii_digit()))
        .ok_or_else(|| {
            FieldError::new(
                "Patient.birthDate",
                format!("{:?} does not start with a 4-digit year", birth_date),
            )
        })?;

    year.parse()
        .map_err(|e| FieldError::new("Patient.birthDate", format!("{}", e)))
}

pub fn derive_age_group(birth_year: i32) -> AgeGroup {
    if birth_year > AGE_GROUP_THRESHOLD_YEAR {
        AgeGroup::Adult
    } else {
        AgeGroup::Senior
    }
}

/// A Patient with every PII element masked, not yet validated
#[derive(Debug, Clone, PartialEq)]
pub struct MaskedPatient {
    pub patient_id: Option<String>,
    pub name_masked: String,
    pub birth_year: i32,
    pub age_group: AgeGroup,
    pub gender: Option<String>,
    pub zip_region: String,
    pub mrn_masked: String,
    pub ssn_masked: Option<String>,
}

/// Mask one Bronze Patient. Fails on the first malformed element.
pub fn mask_patient(patient: &Patient) -> Result<MaskedPatient> {
    let record_id = patient.display_id();
    let malformed = |e: FieldError| e.for_record(record_id);

    let mrn_masked = mask_mrn(&patient.identifier).map_err(malformed)?;
    let name_masked = mask_name(&patient.name).map_err(malformed)?;
    let zip_region = mask_zip(patient.address.as_deref()).map_err(malformed)?;
    let ssn_masked = mask_ssn(patient.ssn.as_deref()).map_err(malformed)?;
    let birth_year = parse_birth_year(patient.birth_date.as_deref()).map_err(malformed)?;

    Ok(MaskedPatient {
        patient_id: patient.id.clone(),
        name_masked,
        birth_year,
        age_group: derive_age_group(birth_year),
        gender: patient.gender.clone(),
        zip_region,
        mrn_masked,
        ssn_masked,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(family: &str, given: &[&str]) -> Vec<HumanName> {
        vec![HumanName {
            family: Some(family.to_string()),
            given: given.iter().map(|g| g.to_string()).collect(),
            ..Default::default()
        }]
    }

    fn postal(code: &str) -> Vec<Address> {
        vec![Address {
            postal_code: Some(code.to_string()),
            ..Default::default()
        }]
    }

    fn mrn(value: &str) -> Vec<Identifier> {
        vec![Identifier {
            value: Some(value.to_string()),
            ..Default::default()
        }]
    }

    #[test]
    fn test_mask_name() {
        assert_eq!(mask_name(&name("Smith", &["Johnathan"])).unwrap(), "J. Smith");
        assert_eq!(mask_name(&name("Dubois", &["Élodie", "Marie"])).unwrap(), "É. Dubois");
    }

    #[test]
    fn test_mask_name_missing_parts() {
        assert_eq!(mask_name(&[]).unwrap_err().field, "Patient.name");
        assert_eq!(
            mask_name(&name("Smith", &[""])).unwrap_err().field,
            "Patient.name[0].given[0]"
        );
        assert_eq!(
            mask_name(&name("", &["John"])).unwrap_err().field,
            "Patient.name[0].family"
        );
    }

    #[test]
    fn test_mask_ssn() {
        assert_eq!(mask_ssn(Some("123-45-6789")).unwrap().as_deref(), Some("***-**-6789"));
        assert_eq!(mask_ssn(Some("987654321")).unwrap().as_deref(), Some("***-**-4321"));
        assert_eq!(mask_ssn(None).unwrap(), None);
    }

    #[test]
    fn test_mask_ssn_rejects_bad_shapes() {
        for bad in ["", "12345678", "1234-5-6789", "123-45-678x", "123 45 6789"] {
            assert!(mask_ssn(Some(bad)).is_err(), "{bad:?} should be malformed");
        }
    }

    #[test]
    fn test_mask_mrn() {
        assert_eq!(mask_mrn(&mrn("MRN001001")).unwrap(), "***1001");
        assert_eq!(mask_mrn(&mrn("1234")).unwrap(), "***1234");
        assert!(mask_mrn(&mrn("123")).is_err());
        assert!(mask_mrn(&mrn("")).is_err());
        assert!(mask_mrn(&[]).is_err());
    }

    #[test]
    fn test_mask_zip() {
        assert_eq!(mask_zip(Some(postal("10001").as_slice())).unwrap(), "100");
        assert_eq!(mask_zip(Some(postal("02101").as_slice())).unwrap(), "021");
        assert_eq!(mask_zip(None).unwrap(), "UNK");
        assert_eq!(mask_zip(Some(Vec::new().as_slice())).unwrap(), "UNK");
        assert_eq!(mask_zip(Some(vec![Address::default()].as_slice())).unwrap(), "UNK");
        assert!(mask_zip(Some(postal("10").as_slice())).is_err());
    }

    #[test]
    fn test_birth_year_and_age_group() {
        assert_eq!(parse_birth_year(Some("1985-05-15")).unwrap(), 1985);
        assert_eq!(derive_age_group(1985), AgeGroup::Adult);
        assert_eq!(derive_age_group(1961), AgeGroup::Adult);
        assert_eq!(derive_age_group(1960), AgeGroup::Senior);
        assert_eq!(derive_age_group(1940), AgeGroup::Senior);
    }

    #[test]
    fn test_malformed_birth_date() {
        assert!(parse_birth_year(Some("19x5-05-15")).is_err());
        assert!(parse_birth_year(Some("85")).is_err());
        assert!(parse_birth_year(Some("")).is_err());
        assert!(parse_birth_year(None).is_err());
    }

    #[test]
    fn test_mask_patient() {
        let patient = Patient {
            id: Some("1001".to_string()),
            name: name("Smith", &["Johnathan"]),
            birth_date: Some("1985-05-15".to_string()),
            gender: Some("male".to_string()),
            address: Some(postal("10001")),
            identifier: mrn("MRN001001"),
            ssn: Some("123-45-6789".to_string()),
            ..Default::default()
        };

        let masked = mask_patient(&patient).unwrap();
        assert_eq!(masked.patient_id.as_deref(), Some("1001"));
        assert_eq!(masked.name_masked, "J. Smith");
        assert_eq!(masked.ssn_masked.as_deref(), Some("***-**-6789"));
        assert_eq!(masked.zip_region, "100");
        assert_eq!(masked.mrn_masked, "***1001");
        assert_eq!(masked.age_group, AgeGroup::Adult);
        assert_eq!(masked.birth_year, 1985);
    }

    #[test]
    fn test_mask_patient_reports_record_and_field() {
        let patient = Patient {
            id: Some("2001".to_string()),
            name: name("Doe", &["Jane"]),
            birth_date: Some("abcd-01-01".to_string()),
            identifier: mrn("MRN002001"),
            ..Default::default()
        };

        match mask_patient(&patient).unwrap_err() {
            LakehouseError::MalformedField {
                record_id, field, ..
            } => {
                assert_eq!(record_id, "2001");
                assert_eq!(field, "Patient.birthDate");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
