//! Medallion layers and the storage seam shared by every backend

use crate::error::{Result, StoreError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Bronze,
    Silver,
}

impl Layer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Layer::Bronze => "bronze",
            Layer::Silver => "silver",
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Layer {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "bronze" => Ok(Layer::Bronze),
            "silver" => Ok(Layer::Silver),
            other => Err(StoreError::Other(format!("Unknown layer: {}", other))),
        }
    }
}

/// Opaque named documents per layer
pub trait LayerStore {
    fn put(&self, layer: Layer, name: &str, data: &[u8]) -> Result<()>;

    fn get(&self, layer: Layer, name: &str) -> Result<Option<Vec<u8>>>;

    /// Document names in ascending order
    fn list(&self, layer: Layer) -> Result<Vec<String>>;

    /// Last document name in sort order; timestamped names make this the newest
    fn latest(&self, layer: Layer) -> Result<Option<String>> {
        Ok(self.list(layer)?.pop())
    }
}

/// Reject names that could escape the layer namespace
pub fn validate_name(name: &str) -> Result<()> {
    let bad = name.is_empty()
        || name == "."
        || name.contains("..")
        || name.contains(['/', '\\', '\0']);
    if bad {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Serialize `value` as pretty JSON and store it
pub fn put_json<S, T>(store: &S, layer: Layer, name: &str, value: &T) -> Result<()>
where
    S: LayerStore + ?Sized,
    T: Serialize + ?Sized,
{
    let data = serde_json::to_vec_pretty(value)?;
    store.put(layer, name, &data)
}

/// Load and deserialize a stored document
pub fn get_json<S, T>(store: &S, layer: Layer, name: &str) -> Result<T>
where
    S: LayerStore + ?Sized,
    T: DeserializeOwned,
{
    let data = store
        .get(layer, name)?
        .ok_or_else(|| StoreError::NotFound {
            layer: layer.to_string(),
            name: name.to_string(),
        })?;
    Ok(serde_json::from_slice(&data)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_names() {
        assert_eq!(Layer::Bronze.to_string(), "bronze");
        assert_eq!("silver".parse::<Layer>().unwrap(), Layer::Silver);
        assert!("gold".parse::<Layer>().is_err());
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("fhir_raw_20240131_100000_0").is_ok());
        assert!(validate_name("batch-1.v2").is_ok());
        for bad in ["", ".", "..", "../etc", "a/b", "a\\b"] {
            assert!(validate_name(bad).is_err(), "{bad:?} should be rejected");
        }
    }
}
