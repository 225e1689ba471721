//! JSON sidecar describing how to feed and read an exported classifier.
//!
//! An ONNX graph carries weights and topology only. The class vocabulary and
//! the preprocessing the network was trained with live in the manifest:
//!
//! ```json
//! {
//!   "architecture": "resnet18",
//!   "vocab": ["biodegradable", "non_biodegradable"],
//!   "input_size": 224,
//!   "mean": [0.485, 0.456, 0.406],
//!   "std": [0.229, 0.224, 0.225],
//!   "output": "logits"
//! }
//! ```
//!
//! A vocabulary entry may also bind a name explicitly:
//! `{"name": "organic", "category": "biodegradable"}`.

use crate::error::{Error, Result};
use crate::label::{ClassLabel, Vocabulary, WasteCategory};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];
pub const DEFAULT_INPUT_SIZE: usize = 224;

/// What the first graph output holds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    /// Raw scores, softmax is applied after inference.
    #[default]
    Logits,
    /// Already normalized probabilities.
    Probabilities,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VocabEntry {
    Name(String),
    Explicit {
        name: String,
        category: WasteCategory,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelManifest {
    #[serde(default)]
    pub architecture: Option<String>,
    pub vocab: Vec<VocabEntry>,
    #[serde(default = "default_input_size")]
    pub input_size: usize,
    #[serde(default = "default_mean")]
    pub mean: [f32; 3],
    #[serde(default = "default_std")]
    pub std: [f32; 3],
    #[serde(default)]
    pub output: OutputKind,
}

fn default_input_size() -> usize {
    DEFAULT_INPUT_SIZE
}

fn default_mean() -> [f32; 3] {
    IMAGENET_MEAN
}

fn default_std() -> [f32; 3] {
    IMAGENET_STD
}

impl ModelManifest {
    /// Reads and validates a manifest file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::ManifestIo {
            path: path.to_path_buf(),
            source,
        })?;
        let manifest: Self =
            serde_json::from_str(&text).map_err(|source| Error::ManifestParse {
                path: path.to_path_buf(),
                source,
            })?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn validate(&self) -> Result<()> {
        if self.vocab.is_empty() {
            return Err(Error::InvalidManifest("vocabulary is empty".to_string()));
        }
        if self.input_size == 0 {
            return Err(Error::InvalidManifest(
                "input_size must be positive".to_string(),
            ));
        }
        if self.std.iter().any(|s| *s == 0.0 || !s.is_finite()) {
            return Err(Error::InvalidManifest(
                "std values must be finite and non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolves every vocabulary entry to a category.
    pub fn vocabulary(&self) -> Result<Vocabulary> {
        let classes = self
            .vocab
            .iter()
            .map(|entry| match entry {
                VocabEntry::Name(name) => ClassLabel::resolve(name),
                VocabEntry::Explicit { name, category } => Ok(ClassLabel {
                    name: name.clone(),
                    category: *category,
                }),
            })
            .collect::<Result<Vec<_>>>()?;
        Vocabulary::new(classes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn minimal_manifest_gets_defaults() {
        let manifest: ModelManifest =
            serde_json::from_str(r#"{"vocab": ["B", "N"]}"#).unwrap();
        assert_eq!(manifest.input_size, 224);
        assert_eq!(manifest.mean, IMAGENET_MEAN);
        assert_eq!(manifest.std, IMAGENET_STD);
        assert_eq!(manifest.output, OutputKind::Logits);
        assert!(manifest.architecture.is_none());
        manifest.validate().unwrap();
    }

    #[test]
    fn explicit_entries_bypass_the_table() {
        let manifest: ModelManifest = serde_json::from_str(
            r#"{
                "vocab": [
                    {"name": "organic", "category": "biodegradable"},
                    "non_biodegradable"
                ],
                "output": "probabilities"
            }"#,
        )
        .unwrap();
        let vocab = manifest.vocabulary().unwrap();
        assert_eq!(vocab.get(0).unwrap().name, "organic");
        assert_eq!(vocab.get(0).unwrap().category, WasteCategory::Biodegradable);
        assert_eq!(
            vocab.get(1).unwrap().category,
            WasteCategory::NonBiodegradable
        );
        assert_eq!(manifest.output, OutputKind::Probabilities);
    }

    #[test]
    fn unknown_bare_name_fails_resolution() {
        let manifest: ModelManifest =
            serde_json::from_str(r#"{"vocab": ["organic", "N"]}"#).unwrap();
        assert!(matches!(
            manifest.vocabulary(),
            Err(Error::UnknownClass(name)) if name == "organic"
        ));
    }

    #[test]
    fn validation_rejects_bad_values() {
        let empty: ModelManifest = serde_json::from_str(r#"{"vocab": []}"#).unwrap();
        assert!(matches!(empty.validate(), Err(Error::InvalidManifest(_))));

        let zero_size: ModelManifest =
            serde_json::from_str(r#"{"vocab": ["B"], "input_size": 0}"#).unwrap();
        assert!(zero_size.validate().is_err());

        let zero_std: ModelManifest =
            serde_json::from_str(r#"{"vocab": ["B"], "std": [0.2, 0.0, 0.2]}"#).unwrap();
        assert!(zero_std.validate().is_err());
    }

    #[test]
    fn load_reports_missing_and_malformed_files() {
        let dir = tempfile::tempdir().unwrap();

        let missing = dir.path().join("missing.json");
        assert!(matches!(
            ModelManifest::load(&missing),
            Err(Error::ManifestIo { .. })
        ));

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{ not json").unwrap();
        assert!(matches!(
            ModelManifest::load(&broken),
            Err(Error::ManifestParse { .. })
        ));
    }

    #[test]
    fn load_reads_a_valid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"architecture": "resnet18", "vocab": ["biodegradable", "non_biodegradable"], "input_size": 128}}"#
        )
        .unwrap();

        let manifest = ModelManifest::load(file.path()).unwrap();
        assert_eq!(manifest.architecture.as_deref(), Some("resnet18"));
        assert_eq!(manifest.input_size, 128);
        assert_eq!(manifest.vocabulary().unwrap().len(), 2);
    }
}
