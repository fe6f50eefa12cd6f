pub mod bundle;
pub mod clock;
pub mod enrich;
pub mod error;
pub mod generator;
pub mod masking;
pub mod outcome;
pub mod pipeline;
pub mod resource;
pub mod validation;

pub use bundle::{Bundle, BundleEntry};
pub use clock::{Clock, FixedClock, SystemClock};
pub use enrich::{Enricher, MaskedPatientRecord};
pub use error::{LakehouseError, Result};
pub use generator::FhirGenerator;
pub use masking::{AgeGroup, MaskedPatient};
pub use outcome::{DropIssue, DropStage, IssueSeverity, IssueType};
pub use pipeline::{
    transform_to_silver, ObservationPolicy, PipelineContext, PipelineSummary, QualityReport,
    SilverBatch, TransformSettings,
};
pub use resource::{BronzeResource, Observation, Patient, Resource};
pub use validation::{Gender, Rejection, ValidationCounts, Validator};
