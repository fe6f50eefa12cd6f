//! Bronze → Silver transformation
//!
//! `mask → validate → enrich`, strictly in that order. Records leave the
//! pipeline only by being dropped during masking or validation; survivors keep
//! their input order.

use crate::clock::{Clock, SystemClock};
use crate::enrich::{Enricher, MaskedPatientRecord, DEFAULT_COMPLIANCE_FLAG, DEFAULT_DATA_SOURCE};
use crate::error::{LakehouseError, Result};
use crate::masking::{mask_patient, MaskedPatient};
use crate::outcome::{DropIssue, DropStage};
use crate::resource::{BronzeResource, Observation, Patient};
use crate::validation::{ValidationCounts, Validator};
use serde::{Deserialize, Serialize};

/// What to do with Observations found in a Patient batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationPolicy {
    /// Keep them unchanged alongside the Silver patients
    #[default]
    PassThrough,
    /// Filter them out of the Silver output
    Drop,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformSettings {
    pub data_source: String,
    pub compliance_flag: String,
    pub observation_policy: ObservationPolicy,
}

impl Default for TransformSettings {
    fn default() -> Self {
        Self {
            data_source: DEFAULT_DATA_SOURCE.to_string(),
            compliance_flag: DEFAULT_COMPLIANCE_FLAG.to_string(),
            observation_policy: ObservationPolicy::default(),
        }
    }
}

/// Everything a run needs, built by the caller
pub struct PipelineContext<C = SystemClock> {
    pub clock: C,
    pub settings: TransformSettings,
}

impl<C: Clock> PipelineContext<C> {
    pub fn with_clock(clock: C, settings: TransformSettings) -> Self {
        Self { clock, settings }
    }
}

/// Silver data quality report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityReport {
    pub valid_count: usize,
    pub masked_ssn_count: usize,
    pub timestamped_count: usize,
    pub compliance_flagged_count: usize,
}

impl QualityReport {
    pub fn from_records(records: &[MaskedPatientRecord]) -> Self {
        Self {
            valid_count: records.iter().filter(|r| !r.patient_id.is_empty()).count(),
            masked_ssn_count: records.iter().filter(|r| r.ssn_masked.is_some()).count(),
            // ingestion_timestamp is not optional, so every record counts
            timestamped_count: records.len(),
            compliance_flagged_count: records
                .iter()
                .filter(|r| !r.compliance_flag.is_empty())
                .count(),
        }
    }

    /// Every valid record carries a masked SSN, a timestamp and a compliance flag
    pub fn is_complete(&self) -> bool {
        self.masked_ssn_count == self.valid_count
            && self.timestamped_count == self.valid_count
            && self.compliance_flagged_count == self.valid_count
    }
}

/// Record accounting for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSummary {
    pub patients_in: usize,
    pub malformed: usize,
    pub rejected: usize,
    pub patients_out: usize,
    pub observations_in: usize,
    pub observations_passed: usize,
    pub observations_dropped: usize,
    /// Resources of any other type
    pub skipped: usize,
}

impl PipelineSummary {
    pub fn dropped(&self) -> usize {
        self.malformed + self.rejected
    }

    /// `patients_in == patients_out + malformed + rejected`
    pub fn is_conserved(&self) -> bool {
        self.patients_in == self.patients_out + self.dropped()
            && self.observations_in == self.observations_passed + self.observations_dropped
    }
}

/// Output of one Bronze → Silver run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SilverBatch {
    pub patients: Vec<MaskedPatientRecord>,
    pub observations: Vec<Observation>,
    pub report: QualityReport,
    pub summary: PipelineSummary,
    pub validation: ValidationCounts,
    pub issues: Vec<DropIssue>,
}

/// Mask every patient; malformed ones become drop issues
pub fn mask_batch(patients: &[&Patient]) -> (Vec<MaskedPatient>, Vec<DropIssue>) {
    tracing::info!("Applying PII masking...");

    let mut masked = Vec::with_capacity(patients.len());
    let mut issues = Vec::new();

    for patient in patients {
        match mask_patient(patient) {
            Ok(m) => masked.push(m),
            Err(e) => {
                tracing::warn!(
                    record_id = patient.display_id(),
                    error = %e,
                    "Dropping malformed Patient"
                );
                issues.push(DropIssue::from_error(DropStage::Masking, "Patient", &e));
            }
        }
    }

    (masked, issues)
}

/// Run the full pipeline over one in-memory batch
pub fn transform_to_silver<C: Clock>(
    ctx: &PipelineContext<C>,
    batch: &[BronzeResource],
) -> Result<SilverBatch> {
    tracing::info!(resources = batch.len(), "Transforming Bronze to Silver layer...");

    let mut summary = PipelineSummary::default();
    let mut patients = Vec::new();
    let mut observations = Vec::new();
    let mut issues = Vec::new();

    for resource in batch {
        match resource {
            BronzeResource::Patient(p) => patients.push(p),
            BronzeResource::Observation(o) => {
                summary.observations_in += 1;
                match ctx.settings.observation_policy {
                    ObservationPolicy::PassThrough => observations.push(o.clone()),
                    ObservationPolicy::Drop => issues.push(DropIssue::filtered(
                        "Observation",
                        o.id.as_deref().unwrap_or(crate::resource::MISSING_ID),
                        "observation policy is drop",
                    )),
                }
            }
            BronzeResource::Other(r) => {
                tracing::debug!(resource_type = %r.resource_type, "Skipping unsupported resource");
                summary.skipped += 1;
            }
        }
    }
    summary.observations_passed = observations.len();
    summary.observations_dropped = summary.observations_in - summary.observations_passed;
    summary.patients_in = patients.len();

    // Step 1: PII masking
    let (masked, mask_issues) = mask_batch(&patients);
    summary.malformed = mask_issues.len();
    issues.extend(mask_issues);

    if summary.patients_in > 0 && masked.is_empty() {
        tracing::error!(
            patients = summary.patients_in,
            "Every Patient in the batch is malformed"
        );
        return Err(LakehouseError::BatchIngest {
            message: format!(
                "all {} Patient records failed masking",
                summary.patients_in
            ),
        });
    }

    // Step 2: data quality
    let outcome = Validator::from_clock(&ctx.clock).validate(masked);
    summary.rejected = outcome.counts.dropped;
    issues.extend(outcome.rejected.into_iter().map(|r| {
        DropIssue::from_error(DropStage::Validation, "Patient", &r.into_error())
    }));

    // Step 3: metadata, one timestamp for the whole run
    let enricher = Enricher::new(
        ctx.clock.now(),
        ctx.settings.data_source.clone(),
        ctx.settings.compliance_flag.clone(),
    );
    let records = enricher.enrich(outcome.records);
    summary.patients_out = records.len();

    let report = QualityReport::from_records(&records);

    tracing::info!(
        patients_in = summary.patients_in,
        patients_out = summary.patients_out,
        malformed = summary.malformed,
        rejected = summary.rejected,
        observations = summary.observations_passed,
        "Silver layer transformation complete"
    );

    Ok(SilverBatch {
        patients: records,
        observations,
        report,
        summary,
        validation: outcome.counts,
        issues,
    })
}
