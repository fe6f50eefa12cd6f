use crate::error::LakehouseError;
use crate::validation::Rejection;
use serde::{Deserialize, Serialize};

/// Severity of a drop issue, OperationOutcome style
/// See: https://www.hl7.org/fhir/operationoutcome.html
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Error,
    Information,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum IssueType {
    Structure,
    Required,
    Value,
    BusinessRule,
    NotSupported,
}

/// Pipeline stage that dropped a record
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DropStage {
    Parse,
    Masking,
    Validation,
    Policy,
}

/// One record that did not make it into the Silver layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DropIssue {
    pub severity: IssueSeverity,
    pub code: IssueType,
    pub stage: DropStage,
    pub resource_type: String,
    pub record_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<Vec<String>>,
    pub diagnostics: String,
}

impl DropIssue {
    pub fn from_error(stage: DropStage, resource_type: &str, error: &LakehouseError) -> Self {
        let (code, record_id) = match error {
            LakehouseError::MalformedField {
                record_id, reason, ..
            } => {
                let code = if reason.starts_with("missing") {
                    IssueType::Required
                } else {
                    IssueType::Value
                };
                (code, record_id.clone())
            }
            LakehouseError::Rejected {
                record_id,
                rejection,
            } => (rejection_code(rejection), record_id.clone()),
            _ => (IssueType::Structure, crate::resource::MISSING_ID.to_string()),
        };

        Self {
            severity: IssueSeverity::Error,
            code,
            stage,
            resource_type: resource_type.to_string(),
            record_id,
            expression: error.expression().map(|e| vec![e]),
            diagnostics: error.to_string(),
        }
    }

    /// Record removed by configuration rather than by a failure
    pub fn filtered(resource_type: &str, record_id: &str, reason: impl Into<String>) -> Self {
        Self {
            severity: IssueSeverity::Information,
            code: IssueType::NotSupported,
            stage: DropStage::Policy,
            resource_type: resource_type.to_string(),
            record_id: record_id.to_string(),
            expression: None,
            diagnostics: reason.into(),
        }
    }
}

fn rejection_code(rejection: &Rejection) -> IssueType {
    match rejection {
        Rejection::MissingPatientId => IssueType::Required,
        _ => IssueType::BusinessRule,
    }
}
