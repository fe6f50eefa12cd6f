//! JSON file layer storage
//!
//! Layout: `{root}/{layer}/{name}.json`

use crate::error::Result;
use crate::layer::{validate_name, Layer, LayerStore};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const EXTENSION: &str = "json";

pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open the store (create the root if not exists)
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Path a document is (or would be) stored at
    pub fn document_path(&self, layer: Layer, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self
            .root
            .join(layer.as_str())
            .join(format!("{}.{}", name, EXTENSION)))
    }
}

impl LayerStore for FileStore {
    fn put(&self, layer: Layer, name: &str, data: &[u8]) -> Result<()> {
        let path = self.document_path(layer, name)?;
        fs::create_dir_all(self.root.join(layer.as_str()))?;

        // Write then rename so readers never see a half-written document
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, data)?;
        fs::rename(&tmp, &path)?;

        tracing::debug!(path = %path.display(), bytes = data.len(), "Wrote document");
        Ok(())
    }

    fn get(&self, layer: Layer, name: &str) -> Result<Option<Vec<u8>>> {
        let path = self.document_path(layer, name)?;
        match fs::read(&path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self, layer: Layer) -> Result<Vec<String>> {
        let dir = self.root.join(layer.as_str());
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{get_json, put_json};
    use crate::StoreError;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    #[test]
    fn test_put_and_get() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        let data = br#"{"resourceType":"Bundle","type":"collection"}"#;
        store.put(Layer::Bronze, "batch_0", data).unwrap();

        assert_eq!(store.get(Layer::Bronze, "batch_0").unwrap(), Some(data.to_vec()));
        assert_eq!(store.get(Layer::Silver, "batch_0").unwrap(), None);
        assert!(dir.path().join("bronze/batch_0.json").is_file());
    }

    #[test]
    fn test_list_sorted_and_latest() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        assert!(store.list(Layer::Silver).unwrap().is_empty());
        assert_eq!(store.latest(Layer::Silver).unwrap(), None);

        for name in ["fhir_raw_2", "fhir_raw_0", "fhir_raw_1"] {
            store.put(Layer::Bronze, name, b"{}").unwrap();
        }
        std::fs::write(dir.path().join("bronze/notes.txt"), b"ignored").unwrap();

        assert_eq!(
            store.list(Layer::Bronze).unwrap(),
            ["fhir_raw_0", "fhir_raw_1", "fhir_raw_2"]
        );
        assert_eq!(store.latest(Layer::Bronze).unwrap().as_deref(), Some("fhir_raw_2"));
    }

    #[test]
    fn test_json_helpers() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        put_json(&store, Layer::Silver, "patients", &json!([{"patient_id": "1001"}])).unwrap();
        let value: Value = get_json(&store, Layer::Silver, "patients").unwrap();
        assert_eq!(value[0]["patient_id"], "1001");

        let missing: crate::Result<Value> = get_json(&store, Layer::Silver, "nope");
        assert!(matches!(missing, Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn test_rejects_path_escape() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.put(Layer::Bronze, "../outside", b"{}"),
            Err(StoreError::InvalidName(_))
        ));
    }
}
