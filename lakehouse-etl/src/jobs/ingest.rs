//! Bronze ingestion: synthetic bundles into the raw layer

use crate::audit::{log_run_error, log_run_success, RunContext};
use crate::error::Result;
use crate::AppState;
use lakehouse_core::{BronzeResource, Clock, FhirGenerator};
use lakehouse_store::{Layer, RunCounts, Stage};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// One Bronze document written by an ingest run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestedBatch {
    pub name: String,
    pub resources: usize,
}

/// Bronze document name for batch `n` of a run
pub fn bronze_name(prefix: &str, n: usize) -> String {
    // zero-padded so name order matches batch order
    format!("{}_{:03}", prefix, n)
}

/// Generate `ingest.batches` bundles of `ingest.batch_size` patients into Bronze
pub fn run_ingest<C: Clock>(
    state: &AppState,
    clock: &C,
    prefix: Option<&str>,
) -> Result<Vec<IngestedBatch>> {
    let settings = &state.config.ingest;
    let prefix = match prefix {
        Some(p) => p.to_string(),
        None => format!("fhir_raw_{}", clock.now().format("%Y%m%d_%H%M%S")),
    };

    let rng = match settings.seed {
        Some(seed) => ChaCha20Rng::seed_from_u64(seed),
        None => ChaCha20Rng::from_entropy(),
    };
    let mut generator = FhirGenerator::new(rng, clock).with_ssn(settings.include_ssn);

    tracing::info!(
        batches = settings.batches,
        batch_size = settings.batch_size,
        seeded = settings.seed.is_some(),
        "Starting Bronze ingestion"
    );

    let mut written = Vec::with_capacity(settings.batches);
    for n in 0..settings.batches {
        let name = bronze_name(&prefix, n);
        let context = RunContext::new(Stage::Ingest, Some(name.clone()));

        let batch = generator.generate_batch(settings.batch_size);
        match write_bundle(state, &generator, &batch, &name) {
            Ok(resources) => {
                tracing::info!(document = %name, resources, "Saved {} resources to Bronze", resources);
                log_run_success(
                    &context,
                    RunCounts {
                        records_in: 0,
                        records_out: resources,
                        dropped: 0,
                    },
                    &state.run_log,
                );
                written.push(IngestedBatch { name, resources });
            }
            Err(e) => {
                log_run_error(&context, &e.to_string(), &state.run_log);
                return Err(e);
            }
        }
    }

    Ok(written)
}

fn write_bundle<R: Rng, C: Clock>(
    state: &AppState,
    generator: &FhirGenerator<R, C>,
    batch: &[BronzeResource],
    name: &str,
) -> Result<usize> {
    let bundle = generator.to_bundle(batch)?;
    let json = bundle.to_json_pretty()?;
    state.store.put(Layer::Bronze, name, json.as_bytes())?;
    Ok(bundle.len())
}
