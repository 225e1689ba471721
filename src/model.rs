/// Trait for inference models that can be driven by the [`crate::InferenceEngine`].
///
/// The engine moves the model onto its worker thread, so implementations only
/// need to be `Send`.
pub trait InferenceModel {
    /// The request type that the model accepts for inference.
    type Request;
    /// The response type that the model returns after inference.
    type Response;
    /// The error type that can be returned during inference.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Runs inference on the given request and returns a response or error.
    fn run(&mut self, request: Self::Request) -> Result<Self::Response, Self::Error>;
}

/// Trait for extracting lightweight metadata from inference requests.
///
/// The engine keeps the metadata for logging and hands it back with the
/// response, so it must not clone pixel data.
pub trait RequestMetadata {
    /// The lightweight metadata type that represents the request.
    type Metadata: Send + 'static;

    /// Extracts lightweight metadata from the request.
    fn metadata(&self) -> Self::Metadata;
}
