//! Silver metadata stamping

use crate::masking::AgeGroup;
use crate::validation::{Gender, ValidatedPatient};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_DATA_SOURCE: &str = "FHIR-R4-API";
pub const DEFAULT_COMPLIANCE_FLAG: &str = "HIPAA-MASKED";

/// Silver layer Patient. Write-once output of the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskedPatientRecord {
    pub resource_type: String,
    pub patient_id: String,
    pub name_masked: String,
    pub birth_year: i32,
    pub age_group: AgeGroup,
    pub gender: Gender,
    pub zip_region: String,
    pub mrn_masked: String,
    #[serde(default)]
    pub ssn_masked: Option<String>,
    pub ingestion_timestamp: DateTime<Utc>,
    pub data_source: String,
    pub compliance_flag: String,
}

/// Stamps validated records with run metadata
#[derive(Debug, Clone)]
pub struct Enricher {
    ingestion_timestamp: DateTime<Utc>,
    data_source: String,
    compliance_flag: String,
}

impl Enricher {
    pub fn new(
        ingestion_timestamp: DateTime<Utc>,
        data_source: impl Into<String>,
        compliance_flag: impl Into<String>,
    ) -> Self {
        Self {
            ingestion_timestamp,
            data_source: data_source.into(),
            compliance_flag: compliance_flag.into(),
        }
    }

    pub fn stamp(&self, record: ValidatedPatient) -> MaskedPatientRecord {
        MaskedPatientRecord {
            resource_type: "Patient".to_string(),
            patient_id: record.patient_id,
            name_masked: record.name_masked,
            birth_year: record.birth_year,
            age_group: record.age_group,
            gender: record.gender,
            zip_region: record.zip_region,
            mrn_masked: record.mrn_masked,
            ssn_masked: record.ssn_masked,
            ingestion_timestamp: self.ingestion_timestamp,
            data_source: self.data_source.clone(),
            compliance_flag: self.compliance_flag.clone(),
        }
    }

    pub fn enrich(&self, records: Vec<ValidatedPatient>) -> Vec<MaskedPatientRecord> {
        records.into_iter().map(|r| self.stamp(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn validated(id: &str) -> ValidatedPatient {
        ValidatedPatient {
            patient_id: id.to_string(),
            name_masked: "M. Johnson".to_string(),
            birth_year: 1990,
            age_group: AgeGroup::Adult,
            gender: Gender::Female,
            zip_region: "021".to_string(),
            mrn_masked: "***1002".to_string(),
            ssn_masked: Some("***-**-4321".to_string()),
        }
    }

    #[test]
    fn test_stamp_sets_constants() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 31, 10, 0, 0).unwrap();
        let enricher = Enricher::new(ts, DEFAULT_DATA_SOURCE, DEFAULT_COMPLIANCE_FLAG);
        let records = enricher.enrich(vec![validated("1002"), validated("1003")]);

        assert_eq!(records.len(), 2);
        for record in &records {
            assert_eq!(record.resource_type, "Patient");
            assert_eq!(record.ingestion_timestamp, ts);
            assert_eq!(record.data_source, "FHIR-R4-API");
            assert_eq!(record.compliance_flag, "HIPAA-MASKED");
        }
        assert_eq!(records[1].patient_id, "1003");
    }

    #[test]
    fn test_record_json_shape() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 31, 10, 0, 0).unwrap();
        let mut record = Enricher::new(ts, "FHIR-R4-API", "HIPAA-MASKED").stamp(validated("1002"));
        record.ssn_masked = None;

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["age_group"], "Adult");
        assert_eq!(json["gender"], "female");
        assert_eq!(json["ingestion_timestamp"], "2024-01-31T10:00:00Z");
        assert!(json["ssn_masked"].is_null());

        let back: MaskedPatientRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
