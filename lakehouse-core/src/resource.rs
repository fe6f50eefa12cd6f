//! Bronze layer FHIR resources
//!
//! Only the elements the Silver transformation reads are modeled as fields.
//! Every struct, nested ones included, keeps the rest verbatim in `extra`, so
//! a Bronze record round-trips unchanged.

use crate::error::{LakehouseError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value};

/// Placeholder used in logs and drop issues when a record carries no id
pub const MISSING_ID: &str = "<missing>";

/// Generic FHIR resource, used for resource types the pipeline does not model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "resourceType")]
    pub resource_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// All other fields are stored here
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// FHIR resource metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Meta {
    #[serde(rename = "versionId", skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,

    #[serde(rename = "lastUpdated", skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct HumanName {
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub use_: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub given: Vec<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub use_: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Identifier {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Reference {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Quantity {
    /// Kept as the JSON number it arrived as, so `120` stays `120`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Number>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CodeableConcept {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub coding: Vec<Coding>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Coding {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Raw FHIR Patient as ingested into the Bronze layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identifier: Vec<Identifier>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub name: Vec<HumanName>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,

    /// `None` when the element is absent, which masks to "UNK"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Vec<Address>>,

    /// Non-standard extension carried by some upstream feeds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssn: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Patient {
    /// Id for logging; never empty
    pub fn display_id(&self) -> &str {
        match self.id.as_deref() {
            Some(id) if !id.is_empty() => id,
            _ => MISSING_ID,
        }
    }
}

/// Vital-sign Observation; passes through the Silver layer unmasked
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub category: Vec<CodeableConcept>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<CodeableConcept>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<Reference>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_date_time: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_quantity: Option<Quantity>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Observation {
    /// Patient id from a `Patient/{id}` subject reference
    pub fn subject_patient_id(&self) -> Option<&str> {
        self.subject
            .as_ref()?
            .reference
            .as_deref()?
            .strip_prefix("Patient/")
    }
}

/// A resource as found in a Bronze bundle
#[derive(Debug, Clone, PartialEq)]
pub enum BronzeResource {
    Patient(Patient),
    Observation(Observation),
    Other(Resource),
}

impl BronzeResource {
    pub fn resource_type(&self) -> &str {
        match self {
            Self::Patient(_) => "Patient",
            Self::Observation(_) => "Observation",
            Self::Other(r) => &r.resource_type,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Patient(p) => p.id.as_deref(),
            Self::Observation(o) => o.id.as_deref(),
            Self::Other(r) => r.id.as_deref(),
        }
    }

    /// Decode a resource from JSON, dispatching on `resourceType`
    pub fn from_value(mut value: Value) -> Result<Self> {
        let id = value
            .get("id")
            .and_then(|v| v.as_str())
            .unwrap_or(MISSING_ID)
            .to_string();

        let resource_type = match value.get("resourceType").and_then(|v| v.as_str()) {
            Some(rt) => rt.to_string(),
            None => {
                return Err(LakehouseError::malformed(
                    id,
                    "resourceType",
                    "missing or not a string",
                ));
            }
        };

        match resource_type.as_str() {
            "Patient" | "Observation" => {
                if let Some(obj) = value.as_object_mut() {
                    obj.remove("resourceType");
                }
                let decoded = if resource_type == "Patient" {
                    serde_json::from_value(value).map(Self::Patient)
                } else {
                    serde_json::from_value(value).map(Self::Observation)
                };
                decoded.map_err(|e| LakehouseError::malformed(id, resource_type, e.to_string()))
            }
            _ => Ok(Self::Other(serde_json::from_value(value)?)),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(json)?)
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

#[derive(Serialize)]
struct Tagged<'a, T> {
    #[serde(rename = "resourceType")]
    resource_type: &'a str,
    #[serde(flatten)]
    resource: &'a T,
}

impl Serialize for BronzeResource {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Patient(p) => Tagged {
                resource_type: "Patient",
                resource: p,
            }
            .serialize(serializer),
            Self::Observation(o) => Tagged {
                resource_type: "Observation",
                resource: o,
            }
            .serialize(serializer),
            Self::Other(r) => r.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for BronzeResource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(serde::de::Error::custom)
    }
}

impl From<Patient> for BronzeResource {
    fn from(p: Patient) -> Self {
        Self::Patient(p)
    }
}

impl From<Observation> for BronzeResource {
    fn from(o: Observation) -> Self {
        Self::Observation(o)
    }
}
