use std::path::PathBuf;

/// Result type used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while loading the classifier, decoding images or serving requests.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read model manifest {path}: {source}")]
    ManifestIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse model manifest {path}: {source}")]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid model manifest: {0}")]
    InvalidManifest(String),

    #[error("unknown class name '{0}', add an explicit category for it in the manifest")]
    UnknownClass(String),

    #[error("failed to load model {path}: {reason}")]
    ModelLoad { path: PathBuf, reason: String },

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("model produced {actual} scores but the vocabulary has {expected} classes")]
    OutputMismatch { expected: usize, actual: usize },

    #[error("failed to decode image: {0}")]
    ImageDecode(String),

    #[error("failed to read image {path}: {reason}")]
    ImageRead { path: PathBuf, reason: String },

    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("no image provided, upload a file or pick a sample")]
    MissingImage,

    #[error("invalid request: {0}")]
    BadRequest(String),

    #[error("upload too large: {0}")]
    UploadTooLarge(String),

    #[error("sample image {0} not found")]
    SampleNotFound(String),

    #[error("inference engine error: {0}")]
    Engine(String),
}

impl Error {
    /// Whether the error was caused by the caller's input rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::ImageDecode(_)
                | Error::UnsupportedFormat(_)
                | Error::MissingImage
                | Error::BadRequest(_)
                | Error::UploadTooLarge(_)
                | Error::SampleNotFound(_)
        )
    }
}
