//! In-memory walkthrough of the Silver transformation on built-in records

use crate::audit::{log_run_error, log_run_success, RunContext};
use crate::error::Result;
use crate::AppState;
use lakehouse_core::{
    transform_to_silver, BronzeResource, Clock, PipelineContext, SilverBatch, TransformSettings,
};
use lakehouse_store::{put_json, Layer, RunCounts, Stage};
use serde_json::json;
use std::fmt::Write;

/// Silver document name used when the demo output is kept
pub const DEMO_DOCUMENT: &str = "silver_layer_patients";

/// Two patients and one of their observations
pub fn demo_resources() -> Result<Vec<BronzeResource>> {
    let raw = [
        json!({
            "resourceType": "Patient",
            "id": "1001",
            "name": [{"family": "Smith", "given": ["Johnathan"]}],
            "birthDate": "1985-05-15",
            "gender": "male",
            "address": [{"city": "New York", "postalCode": "10001"}],
            "identifier": [{"value": "MRN001001"}],
            "ssn": "123-45-6789"
        }),
        json!({
            "resourceType": "Patient",
            "id": "1002",
            "name": [{"family": "Johnson", "given": ["Maria"]}],
            "birthDate": "1990-08-22",
            "gender": "female",
            "address": [{"city": "Boston", "postalCode": "02101"}],
            "identifier": [{"value": "MRN001002"}],
            "ssn": "987-65-4321"
        }),
        json!({
            "resourceType": "Observation",
            "id": "obs-1001",
            "subject": {"reference": "Patient/1001"},
            "effectiveDateTime": "2024-01-31T10:00:00",
            "valueQuantity": {"value": 120, "unit": "beats/min"}
        }),
    ];

    let resources = raw
        .into_iter()
        .map(BronzeResource::from_value)
        .collect::<lakehouse_core::Result<Vec<_>>>()?;
    Ok(resources)
}

pub struct DemoRun {
    pub bronze: Vec<BronzeResource>,
    pub batch: SilverBatch,
}

impl DemoRun {
    /// Human-readable before/after report
    pub fn render(&self) -> String {
        let mut out = String::new();
        let rule = "-".repeat(60);

        let _ = writeln!(out, "Bronze layer: {} raw FHIR resources", self.bronze.len());
        let _ = writeln!(out, "{}", rule);

        for record in &self.batch.patients {
            let raw = self.bronze.iter().find_map(|r| match r {
                BronzeResource::Patient(p) if p.id.as_deref() == Some(record.patient_id.as_str()) => {
                    Some(p)
                }
                _ => None,
            });
            let Some(raw) = raw else { continue };

            let raw_name = raw
                .name
                .first()
                .map(|n| {
                    let given = n.given.first().map(String::as_str).unwrap_or("");
                    let family = n.family.as_deref().unwrap_or("");
                    format!("{} {}", given, family).trim().to_string()
                })
                .unwrap_or_default();

            let _ = writeln!(out, "Patient {}:", record.patient_id);
            let _ = writeln!(
                out,
                "  Before: {} | {}",
                raw_name,
                raw.ssn.as_deref().unwrap_or("-")
            );
            let _ = writeln!(
                out,
                "  After:  {} | {}",
                record.name_masked,
                record.ssn_masked.as_deref().unwrap_or("-")
            );
        }

        let report = &self.batch.report;
        let total = self.batch.patients.len();
        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out, "Quality checks:");
        let _ = writeln!(out, "  Valid patient IDs: {}/{}", report.valid_count, total);
        let _ = writeln!(out, "  Masked SSNs:       {}/{}", report.masked_ssn_count, total);
        let _ = writeln!(out, "  Audit timestamps:  {}/{}", report.timestamped_count, total);
        let _ = writeln!(
            out,
            "  Compliance flags:  {}/{}",
            report.compliance_flagged_count, total
        );

        let summary = &self.batch.summary;
        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(
            out,
            "Silver layer: {} patients, {} observations, {} dropped",
            summary.patients_out,
            summary.observations_passed,
            summary.dropped() + summary.observations_dropped
        );
        out
    }
}

/// Run the pipeline over the built-in records
pub fn run_demo<C: Clock>(clock: &C, settings: &TransformSettings) -> Result<DemoRun> {
    let bronze = demo_resources()?;
    let ctx = PipelineContext::with_clock(clock, settings.clone());
    let batch = transform_to_silver(&ctx, &bronze)?;
    Ok(DemoRun { bronze, batch })
}

/// Keep the demo patients as a Silver document and record the run
pub fn save_demo(state: &AppState, run: &DemoRun) -> Result<()> {
    let context = RunContext::new(Stage::Demo, Some(DEMO_DOCUMENT.to_string()));

    match put_json(state.store.as_ref(), Layer::Silver, DEMO_DOCUMENT, &run.batch.patients) {
        Ok(()) => {
            let summary = &run.batch.summary;
            log_run_success(
                &context,
                RunCounts {
                    records_in: run.bronze.len(),
                    records_out: summary.patients_out + summary.observations_passed,
                    dropped: summary.dropped() + summary.observations_dropped,
                },
                &state.run_log,
            );
            Ok(())
        }
        Err(e) => {
            log_run_error(&context, &e.to_string(), &state.run_log);
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lakehouse_core::FixedClock;

    #[test]
    fn test_demo_masks_both_patients() {
        let clock = FixedClock::at_date(2024, 1, 31).unwrap();
        let run = run_demo(&clock, &TransformSettings::default()).unwrap();

        assert_eq!(run.bronze.len(), 3);
        assert_eq!(run.batch.patients.len(), 2);
        assert_eq!(run.batch.observations.len(), 1);
        assert!(run.batch.report.is_complete());

        let maria = &run.batch.patients[1];
        assert_eq!(maria.name_masked, "M. Johnson");
        assert_eq!(maria.zip_region, "021");
        assert_eq!(maria.mrn_masked, "***1002");
        assert_eq!(maria.ssn_masked.as_deref(), Some("***-**-4321"));
    }

    #[test]
    fn test_render_shows_before_and_after() {
        let clock = FixedClock::at_date(2024, 1, 31).unwrap();
        let text = run_demo(&clock, &TransformSettings::default())
            .unwrap()
            .render();

        assert!(text.contains("Before: Johnathan Smith | 123-45-6789"));
        assert!(text.contains("After:  J. Smith | ***-**-6789"));
        assert!(text.contains("Masked SSNs:       2/2"));
        assert!(text.contains("Silver layer: 2 patients, 1 observations, 0 dropped"));
    }
}
