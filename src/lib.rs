//! Binary waste classifier: decides whether an image shows biodegradable or
//! non-biodegradable waste using a pre-trained ONNX model, and serves a small
//! web page around it.

pub mod classifier;
pub mod config;
pub mod engine;
pub mod error;
pub mod imageio;
pub mod label;
pub mod manifest;
pub mod messages;
pub mod model;
pub mod page;
pub mod samples;
pub mod server;

pub use classifier::{ClassifyRequest, ImageSource, OnnxClassifier, Prediction};
pub use config::{ModelConfig, ServerConfig};
pub use engine::{EngineError, EngineResult, EngineState, InferenceEngine, PendingInference};
pub use error::{Error, Result};
pub use label::{WasteCategory, format_confidence};
pub use model::{InferenceModel, RequestMetadata};
pub use server::{AppState, Classifier, router, serve};
