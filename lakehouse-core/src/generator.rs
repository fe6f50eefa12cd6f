//! Synthetic FHIR R4 Patient and Observation generation
//!
//! Feeds the Bronze layer with test data. Randomness and time are injected so
//! a seeded generator with a fixed clock is fully reproducible.

use crate::bundle::Bundle;
use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use crate::resource::{
    Address, BronzeResource, CodeableConcept, Coding, HumanName, Identifier, Meta, Observation,
    Patient, Quantity, Reference,
};
use chrono::Duration;
use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha20Rng;
use serde_json::{json, Map, Number};

pub const MRN_SYSTEM: &str = "http://hospital.smarthealth.com/mrn";

const FIRST_NAMES: &[&str] = &["John", "Jane", "Robert", "Maria", "David", "Lisa"];
const LAST_NAMES: &[&str] = &["Smith", "Johnson", "Williams", "Brown", "Jones"];
const GENDERS: &[&str] = &["male", "female"];
const PROVIDERS: &[&str] = &["Dr. Sarah Smith", "Dr. James Johnson", "Dr. Emily Brown"];

/// Patients are between 18 and 85 years old
const MIN_AGE_DAYS: i64 = 18 * 365;
const MAX_AGE_DAYS: i64 = 85 * 365;

/// Patient ids start here and count up within a batch
const FIRST_PATIENT_ID: usize = 1000;

struct VitalSign {
    code: &'static str,
    display: &'static str,
    unit: &'static str,
    min: f64,
    max: f64,
}

const VITAL_SIGNS: &[VitalSign] = &[
    VitalSign {
        code: "8867-4",
        display: "Heart rate",
        unit: "beats/min",
        min: 60.0,
        max: 100.0,
    },
    VitalSign {
        code: "2708-6",
        display: "Oxygen saturation",
        unit: "%",
        min: 95.0,
        max: 100.0,
    },
    VitalSign {
        code: "8310-5",
        display: "Body temperature",
        unit: "Cel",
        min: 36.5,
        max: 37.5,
    },
];

pub struct FhirGenerator<R = ChaCha20Rng, C = SystemClock> {
    rng: R,
    clock: C,
    include_ssn: bool,
}

impl<R: Rng, C: Clock> FhirGenerator<R, C> {
    pub fn new(rng: R, clock: C) -> Self {
        Self {
            rng,
            clock,
            include_ssn: true,
        }
    }

    /// Whether generated Patients carry a synthetic SSN
    pub fn with_ssn(mut self, include_ssn: bool) -> Self {
        self.include_ssn = include_ssn;
        self
    }

    fn pick(&mut self, choices: &[&'static str]) -> &'static str {
        choices.choose(&mut self.rng).copied().unwrap_or_default()
    }

    pub fn generate_patient(&mut self, patient_id: &str) -> Patient {
        let now = self.clock.now();
        let days_old = self.rng.gen_range(MIN_AGE_DAYS..=MAX_AGE_DAYS);
        let birth_date = (now - Duration::days(days_old))
            .format("%Y-%m-%d")
            .to_string();

        let ssn = self.include_ssn.then(|| {
            format!(
                "{:03}-{:02}-{:04}",
                self.rng.gen_range(100..=899),
                self.rng.gen_range(10..=99),
                self.rng.gen_range(1000..=9999)
            )
        });

        let family = self.pick(LAST_NAMES);
        let given = self.pick(FIRST_NAMES);
        let gender = self.pick(GENDERS);
        let postal_code = self.rng.gen_range(10000..=99999).to_string();
        let provider = self.pick(PROVIDERS);

        let mut extra = Map::new();
        extra.insert(
            "generalPractitioner".to_string(),
            json!([{ "display": provider }]),
        );

        Patient {
            id: Some(patient_id.to_string()),
            meta: Some(Meta {
                version_id: Some("1".to_string()),
                last_updated: Some(now.to_rfc3339()),
                ..Default::default()
            }),
            identifier: vec![Identifier {
                system: Some(MRN_SYSTEM.to_string()),
                value: Some(format!("MRN{:0>6}", patient_id)),
                ..Default::default()
            }],
            name: vec![HumanName {
                use_: Some("official".to_string()),
                family: Some(family.to_string()),
                given: vec![given.to_string()],
                ..Default::default()
            }],
            gender: Some(gender.to_string()),
            birth_date: Some(birth_date),
            address: Some(vec![Address {
                use_: Some("home".to_string()),
                city: Some("New York".to_string()),
                state: Some("NY".to_string()),
                postal_code: Some(postal_code),
                ..Default::default()
            }]),
            ssn,
            extra,
        }
    }

    /// One vital-sign Observation for `patient_id`
    pub fn generate_observation(&mut self, patient_id: &str) -> Observation {
        let vital = &VITAL_SIGNS[self.rng.gen_range(0..VITAL_SIGNS.len())];
        let suffix = self.rng.gen_range(1000..=9999);
        let raw = self.rng.gen_range(vital.min..=vital.max);
        let value = (raw * 10.0).round() / 10.0;

        Observation {
            id: Some(format!("obs-{}-{}", patient_id, suffix)),
            status: Some("final".to_string()),
            category: vec![CodeableConcept {
                coding: vec![Coding {
                    system: Some(
                        "http://terminology.hl7.org/CodeSystem/observation-category".to_string(),
                    ),
                    code: Some("vital-signs".to_string()),
                    display: Some("Vital Signs".to_string()),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            code: Some(CodeableConcept {
                coding: vec![Coding {
                    system: Some("http://loinc.org".to_string()),
                    code: Some(vital.code.to_string()),
                    display: Some(vital.display.to_string()),
                    ..Default::default()
                }],
                ..Default::default()
            }),
            subject: Some(Reference {
                reference: Some(format!("Patient/{}", patient_id)),
                ..Default::default()
            }),
            effective_date_time: Some(self.clock.now().to_rfc3339()),
            value_quantity: Some(Quantity {
                value: Number::from_f64(value),
                unit: Some(vital.unit.to_string()),
                system: Some("http://unitsofmeasure.org".to_string()),
                ..Default::default()
            }),
            extra: Map::new(),
        }
    }

    /// `batch_size` Patients, each followed by 1-3 of its Observations
    pub fn generate_batch(&mut self, batch_size: usize) -> Vec<BronzeResource> {
        let mut resources = Vec::with_capacity(batch_size * 3);

        for i in 0..batch_size {
            let patient_id = (FIRST_PATIENT_ID + i).to_string();
            resources.push(BronzeResource::Patient(self.generate_patient(&patient_id)));

            let observations = self.rng.gen_range(1..=3);
            for _ in 0..observations {
                resources.push(BronzeResource::Observation(
                    self.generate_observation(&patient_id),
                ));
            }
        }

        tracing::debug!(
            patients = batch_size,
            resources = resources.len(),
            "Generated synthetic batch"
        );
        resources
    }

    /// Wrap a batch in a collection Bundle stamped with the generator's clock
    pub fn to_bundle(&self, resources: &[BronzeResource]) -> Result<Bundle> {
        Bundle::collection(resources, self.clock.now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::pipeline::{transform_to_silver, PipelineContext, TransformSettings};
    use rand::SeedableRng;

    fn generator(seed: u64) -> FhirGenerator<ChaCha20Rng, FixedClock> {
        FhirGenerator::new(
            ChaCha20Rng::seed_from_u64(seed),
            FixedClock::at_date(2024, 1, 31).unwrap(),
        )
    }

    #[test]
    fn test_patient_shape() {
        let patient = generator(7).generate_patient("42");
        assert_eq!(patient.identifier[0].value.as_deref(), Some("MRN000042"));
        assert_eq!(patient.identifier[0].system.as_deref(), Some(MRN_SYSTEM));
        assert!(FIRST_NAMES.contains(&patient.name[0].given[0].as_str()));
        assert!(LAST_NAMES.contains(&patient.name[0].family.as_deref().unwrap()));

        let year: i32 = patient.birth_date.as_deref().unwrap()[..4].parse().unwrap();
        assert!((1939..=2006).contains(&year), "birth year {year} out of range");

        let postal = patient.address.as_ref().unwrap()[0].postal_code.clone().unwrap();
        assert_eq!(postal.len(), 5);
        assert_eq!(patient.ssn.as_ref().unwrap().len(), 11);
        assert!(patient.extra.contains_key("generalPractitioner"));
    }

    #[test]
    fn test_without_ssn() {
        let patient = generator(7).with_ssn(false).generate_patient("1");
        assert!(patient.ssn.is_none());
    }

    #[test]
    fn test_observation_ranges() {
        let mut generator = generator(11);
        for _ in 0..50 {
            let obs = generator.generate_observation("1000");
            let code = obs.code.as_ref().unwrap().coding[0].code.clone().unwrap();
            let vital = VITAL_SIGNS.iter().find(|v| v.code == code).unwrap();
            let value = obs
                .value_quantity
                .as_ref()
                .and_then(|q| q.value.as_ref())
                .and_then(Number::as_f64)
                .unwrap();
            assert!(value >= vital.min && value <= vital.max);
            assert_eq!(obs.subject_patient_id(), Some("1000"));
            assert!(obs.id.as_deref().unwrap().starts_with("obs-1000-"));
        }
    }

    #[test]
    fn test_batch_layout() {
        let batch = generator(3).generate_batch(10);
        let patients: Vec<&str> = batch
            .iter()
            .filter(|r| r.resource_type() == "Patient")
            .filter_map(|r| r.id())
            .collect();
        assert_eq!(patients.len(), 10);
        assert_eq!(patients[0], "1000");
        assert_eq!(patients[9], "1009");
        assert!(batch.len() >= 20 && batch.len() <= 40);
        assert_eq!(batch[0].resource_type(), "Patient");
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        assert_eq!(generator(99).generate_batch(5), generator(99).generate_batch(5));
    }

    #[test]
    fn test_generated_batch_survives_pipeline() {
        let batch = generator(5).generate_batch(25);
        let ctx = PipelineContext::with_clock(
            FixedClock::at_date(2024, 1, 31).unwrap(),
            TransformSettings::default(),
        );
        let silver = transform_to_silver(&ctx, &batch).unwrap();
        assert_eq!(silver.patients.len(), 25);
        assert!(silver.report.is_complete());
    }
}
