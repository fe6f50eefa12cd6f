//! Silver transformation: one Bronze bundle in, masked patients out

use crate::audit::{log_run_error, log_run_success, RunContext};
use crate::error::Result;
use crate::AppState;
use lakehouse_core::{
    transform_to_silver, BronzeResource, Bundle, Clock, DropIssue, DropStage, LakehouseError,
    PipelineContext, PipelineSummary, QualityReport, SilverBatch, ValidationCounts,
};
use lakehouse_store::{put_json, Layer, RunCounts, Stage, StoreError};
use serde::{Deserialize, Serialize};

/// Quality sidecar written next to every Silver document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SilverReport {
    pub run_id: String,
    pub source: String,
    pub parse_failures: usize,
    pub report: QualityReport,
    pub summary: PipelineSummary,
    pub validation: ValidationCounts,
    pub issues: Vec<DropIssue>,
}

/// Result of one Silver run
#[derive(Debug, Clone)]
pub struct SilverRun {
    pub run_id: String,
    pub source: String,
    /// Entries that could not be decoded into a resource
    pub parse_failures: usize,
    /// Pipeline output; `issues` also carries the parse failures
    pub batch: SilverBatch,
}

impl SilverRun {
    /// Every record removed between the Bronze document and Silver
    pub fn dropped(&self) -> usize {
        self.parse_failures + self.batch.summary.dropped() + self.batch.summary.observations_dropped
    }
}

pub fn report_name(source: &str) -> String {
    format!("{}_report", source)
}

pub fn observations_name(source: &str) -> String {
    format!("{}_observations", source)
}

/// Transform one Bronze document (the newest when `source` is `None`) into Silver
pub fn run_silver<C: Clock>(
    state: &AppState,
    clock: &C,
    source: Option<&str>,
) -> Result<SilverRun> {
    let source = match source {
        Some(name) => name.to_string(),
        None => state
            .store
            .latest(Layer::Bronze)?
            .ok_or_else(|| StoreError::Other("no Bronze documents to transform".to_string()))?,
    };
    let context = RunContext::new(Stage::Silver, Some(source.clone()));

    match transform_document(state, clock, &context, &source) {
        Ok(run) => {
            log_run_success(
                &context,
                RunCounts {
                    records_in: run.batch.summary.patients_in
                        + run.batch.summary.observations_in
                        + run.batch.summary.skipped
                        + run.parse_failures,
                    records_out: run.batch.summary.patients_out
                        + run.batch.summary.observations_passed,
                    dropped: run.dropped(),
                },
                &state.run_log,
            );
            Ok(run)
        }
        Err(e) => {
            log_run_error(&context, &e.to_string(), &state.run_log);
            Err(e)
        }
    }
}

fn transform_document<C: Clock>(
    state: &AppState,
    clock: &C,
    context: &RunContext,
    source: &str,
) -> Result<SilverRun> {
    tracing::info!(document = source, "Loading Bronze layer data");

    let data = state
        .store
        .get(Layer::Bronze, source)?
        .ok_or_else(|| StoreError::NotFound {
            layer: Layer::Bronze.to_string(),
            name: source.to_string(),
        })?;
    let json = String::from_utf8(data).map_err(|e| LakehouseError::BatchIngest {
        message: format!("Bronze document is not UTF-8: {}", e),
    })?;
    let bundle = Bundle::from_json(&json)?;

    let (resources, parse_issues) = decode_bundle(&bundle)?;
    tracing::info!(
        entries = bundle.len(),
        decoded = resources.len(),
        "Loaded Bronze bundle"
    );

    let ctx = PipelineContext::with_clock(clock, state.config.transform.clone());
    let mut batch = transform_to_silver(&ctx, &resources)?;

    let parse_failures = parse_issues.len();
    let mut issues = parse_issues;
    issues.append(&mut batch.issues);
    batch.issues = issues;

    put_json(state.store.as_ref(), Layer::Silver, source, &batch.patients)?;
    if !batch.observations.is_empty() {
        // Stored as FHIR resources, resourceType included
        let observations: Vec<BronzeResource> = batch
            .observations
            .iter()
            .cloned()
            .map(BronzeResource::from)
            .collect();
        put_json(
            state.store.as_ref(),
            Layer::Silver,
            &observations_name(source),
            &observations,
        )?;
    }

    let report = SilverReport {
        run_id: context.run_id.clone(),
        source: source.to_string(),
        parse_failures,
        report: batch.report,
        summary: batch.summary,
        validation: batch.validation,
        issues: batch.issues.clone(),
    };
    put_json(state.store.as_ref(), Layer::Silver, &report_name(source), &report)?;

    let run = SilverRun {
        run_id: context.run_id.clone(),
        source: source.to_string(),
        parse_failures,
        batch,
    };

    tracing::info!(
        document = source,
        patients = run.batch.patients.len(),
        observations = run.batch.observations.len(),
        "Saved Silver layer"
    );
    if run.dropped() > 0 {
        tracing::warn!(
            document = source,
            dropped = run.dropped(),
            parse_failures,
            malformed = run.batch.summary.malformed,
            rejected = run.batch.summary.rejected,
            "Records were dropped on the way to Silver"
        );
    }

    Ok(run)
}

/// Decode bundle entries; undecodable ones become parse-stage issues
fn decode_bundle(bundle: &Bundle) -> Result<(Vec<BronzeResource>, Vec<DropIssue>)> {
    let mut resources = Vec::with_capacity(bundle.len());
    let mut issues = Vec::new();
    let mut failed_patients = 0;

    for (entry, decoded) in bundle.entry.iter().zip(bundle.decode_entries()) {
        match decoded {
            Ok(resource) => resources.push(resource),
            Err(e) => {
                let resource_type = entry
                    .resource
                    .get("resourceType")
                    .and_then(|v| v.as_str())
                    .unwrap_or("Resource");
                if resource_type == "Patient" {
                    failed_patients += 1;
                }
                tracing::warn!(resource_type, error = %e, "Dropping undecodable entry");
                issues.push(DropIssue::from_error(DropStage::Parse, resource_type, &e));
            }
        }
    }

    let decoded_patients = resources
        .iter()
        .filter(|r| matches!(r, BronzeResource::Patient(_)))
        .count();
    if failed_patients > 0 && decoded_patients == 0 {
        return Err(LakehouseError::BatchIngest {
            message: format!("all {} Patient entries failed to parse", failed_patients),
        }
        .into());
    }

    Ok((resources, issues))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bundle(entries: Vec<serde_json::Value>) -> Bundle {
        serde_json::from_value(json!({
            "resourceType": "Bundle",
            "type": "collection",
            "entry": entries.into_iter().map(|r| json!({"resource": r})).collect::<Vec<_>>()
        }))
        .unwrap()
    }

    #[test]
    fn test_decode_bundle_keeps_order_and_reports_failures() {
        let b = bundle(vec![
            json!({"resourceType": "Patient", "id": "1001", "gender": "male"}),
            json!({"resourceType": "Patient", "id": "1002", "name": "not-a-list"}),
            json!({"resourceType": "Observation", "id": "obs-1"}),
            json!({"id": "no-type"}),
        ]);

        let (resources, issues) = decode_bundle(&b).unwrap();
        assert_eq!(resources.len(), 2);
        assert_eq!(resources[0].id(), Some("1001"));
        assert_eq!(resources[1].id(), Some("obs-1"));

        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| i.stage == DropStage::Parse));
        assert_eq!(issues[0].resource_type, "Patient");
        assert_eq!(issues[0].record_id, "1002");
        assert_eq!(issues[1].resource_type, "Resource");
    }

    #[test]
    fn test_decode_bundle_all_patients_unparseable() {
        let b = bundle(vec![
            json!({"resourceType": "Patient", "id": "1", "address": 5}),
            json!({"resourceType": "Observation", "id": "obs-1"}),
        ]);

        assert!(matches!(
            decode_bundle(&b),
            Err(crate::error::EtlError::Pipeline(LakehouseError::BatchIngest { .. }))
        ));
    }

    #[test]
    fn test_document_names() {
        assert_eq!(report_name("fhir_raw_1"), "fhir_raw_1_report");
        assert_eq!(observations_name("fhir_raw_1"), "fhir_raw_1_observations");
    }
}
