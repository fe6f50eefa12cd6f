//! Bronze collection bundles

use crate::error::{LakehouseError, Result};
use crate::resource::BronzeResource;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    #[serde(rename = "resourceType")]
    pub resource_type: String,

    #[serde(rename = "type")]
    pub bundle_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    #[serde(default)]
    pub entry: Vec<BundleEntry>,
}

/// Entries stay raw JSON so one bad resource does not poison the bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleEntry {
    pub resource: Value,
}

impl Bundle {
    /// Collection bundle stamped with `timestamp`
    pub fn collection(resources: &[BronzeResource], timestamp: DateTime<Utc>) -> Result<Self> {
        let entry = resources
            .iter()
            .map(|r| r.to_value().map(|resource| BundleEntry { resource }))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            resource_type: "Bundle".to_string(),
            bundle_type: "collection".to_string(),
            timestamp: Some(timestamp.to_rfc3339()),
            entry,
        })
    }

    /// Parse a Bronze document. Anything that is not a Bundle fails the whole batch.
    pub fn from_json(json: &str) -> Result<Self> {
        let bundle: Bundle = serde_json::from_str(json).map_err(|e| LakehouseError::BatchIngest {
            message: format!("not a valid Bundle document: {}", e),
        })?;

        if bundle.resource_type != "Bundle" {
            return Err(LakehouseError::BatchIngest {
                message: format!("expected resourceType Bundle, found {}", bundle.resource_type),
            });
        }
        Ok(bundle)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn len(&self) -> usize {
        self.entry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entry.is_empty()
    }

    /// Decode every entry, in order
    pub fn decode_entries(&self) -> Vec<Result<BronzeResource>> {
        self.entry
            .iter()
            .map(|e| BronzeResource::from_value(e.resource.clone()))
            .collect()
    }
}
