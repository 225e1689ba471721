use std::path::{Path, PathBuf};

pub const DEFAULT_MODEL_PATH: &str = "model_on-4.onnx";
pub const DEFAULT_SAMPLES_DIR: &str = "example_images";
pub const DEFAULT_MAX_UPLOAD_MB: usize = 200;

/// Where to find the model artifact.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelConfig {
    pub model_path: PathBuf,
    /// Defaults to the model path with a `.json` extension.
    pub manifest_path: Option<PathBuf>,
}

impl ModelConfig {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            manifest_path: None,
        }
    }

    pub fn with_manifest(mut self, manifest_path: impl Into<PathBuf>) -> Self {
        self.manifest_path = Some(manifest_path.into());
        self
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.manifest_path
            .clone()
            .unwrap_or_else(|| self.model_path.with_extension("json"))
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL_PATH)
    }
}

/// Settings for the web server.
#[derive(Clone, Debug, PartialEq)]
pub struct ServerConfig {
    pub model: ModelConfig,
    pub samples_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            samples_dir: PathBuf::from(DEFAULT_SAMPLES_DIR),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_MB * 1024 * 1024,
        }
    }
}
