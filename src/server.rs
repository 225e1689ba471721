//! Web front end: the interactive page and a small JSON API.

use crate::classifier::{ClassifyRequest, ImageSource, Prediction};
use crate::config::ServerConfig;
use crate::engine::{EngineError, InferenceEngine};
use crate::error::{Error, Result};
use crate::imageio::{self, RgbImage8};
use crate::messages::{
    ClassificationResponse, ErrorResponse, HealthResponse, SampleInfo, SampleListResponse,
};
use crate::model::InferenceModel;
use crate::page::{self, Preview, THUMBNAIL_SIZE};
use crate::samples::{self, SampleImage};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State, multipart::MultipartError},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use std::{sync::Arc, time::Duration};
use tokio::sync::Mutex;

/// Any model the server can drive.
pub trait Classifier:
    InferenceModel<Request = ClassifyRequest, Response = Prediction, Error = Error> + Send + 'static
{
}

impl<T> Classifier for T where
    T: InferenceModel<Request = ClassifyRequest, Response = Prediction, Error = Error>
        + Send
        + 'static
{
}

/// Builds the model on first use.
pub type ModelLoader<M> = Arc<dyn Fn() -> Result<M> + Send + Sync>;

/// Shared server state.
///
/// The engine, and with it the model, is created on the first request that
/// needs it and then kept while its worker is alive. A failed load is not
/// cached, and an engine whose worker died is rebuilt on the next request.
pub struct AppState<M: Classifier> {
    config: ServerConfig,
    loader: ModelLoader<M>,
    engine: Mutex<Option<Arc<InferenceEngine<M>>>>,
}

impl<M: Classifier> AppState<M> {
    pub fn new(config: ServerConfig, loader: ModelLoader<M>) -> Self {
        Self {
            config,
            loader,
            engine: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The running engine, if the model has been loaded. Never triggers a load.
    pub async fn loaded_engine(&self) -> Option<Arc<InferenceEngine<M>>> {
        self.engine
            .lock()
            .await
            .as_ref()
            .filter(|engine| engine.is_running())
            .cloned()
    }

    /// Returns the engine, loading the model if none is running.
    pub async fn engine(&self) -> Result<Arc<InferenceEngine<M>>> {
        let mut slot = self.engine.lock().await;
        if let Some(engine) = slot.as_ref().filter(|engine| engine.is_running()) {
            return Ok(engine.clone());
        }
        if slot.take().is_some() {
            log::warn!("Inference worker is gone, reloading the model");
        }

        let loader = self.loader.clone();
        let model = run_blocking(move || loader()).await?;
        log::info!("Model loaded, inference engine started");

        let engine = Arc::new(InferenceEngine::new(model));
        *slot = Some(engine.clone());
        Ok(engine)
    }

    fn samples(&self) -> Vec<SampleImage> {
        samples::discover_samples(&self.config.samples_dir)
    }
}

pub fn router<M: Classifier>(state: Arc<AppState<M>>) -> Router {
    let max_upload_bytes = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(index_page::<M>))
        .route("/classify", post(classify_page::<M>))
        .route("/samples/{index}", get(sample_image::<M>))
        .route("/samples/{index}/thumbnail", get(sample_thumbnail::<M>))
        .route("/api/samples", get(list_samples::<M>))
        .route("/api/classify", post(classify_api::<M>))
        .route("/health", get(health::<M>))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

/// Serves the router until Ctrl+C.
pub async fn serve<M: Classifier>(
    listener: tokio::net::TcpListener,
    state: Arc<AppState<M>>,
) -> std::io::Result<()> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            log::info!("Shutting down");
        })
        .await
}

#[derive(Debug, Deserialize)]
struct IndexQuery {
    sample: Option<usize>,
}

async fn index_page<M: Classifier>(
    State(state): State<Arc<AppState<M>>>,
    Query(query): Query<IndexQuery>,
) -> std::result::Result<Html<String>, PageError> {
    let samples = state.samples();
    let selected = match query.sample {
        Some(index) => Some(
            samples
                .get(index)
                .ok_or_else(|| Error::SampleNotFound(index.to_string()))?,
        ),
        None => None,
    };
    Ok(Html(page::render_index(&samples, selected)))
}

async fn classify_page<M: Classifier>(
    State(state): State<Arc<AppState<M>>>,
    multipart: Multipart,
) -> std::result::Result<Html<String>, PageError> {
    let input = read_classify_input(&state.config, multipart).await?;
    let preview = input.preview.clone();
    let (prediction, _) = classify(&state, input).await?;
    Ok(Html(page::render_result(
        &state.samples(),
        &preview,
        &prediction,
    )))
}

async fn classify_api<M: Classifier>(
    State(state): State<Arc<AppState<M>>>,
    multipart: Multipart,
) -> std::result::Result<Json<ClassificationResponse>, ApiError> {
    let input = read_classify_input(&state.config, multipart).await?;
    let source = input.source.clone();
    let (prediction, duration) = classify(&state, input).await?;
    Ok(Json(ClassificationResponse::new(
        &prediction,
        &source,
        duration,
    )))
}

async fn sample_image<M: Classifier>(
    State(state): State<Arc<AppState<M>>>,
    Path(index): Path<usize>,
) -> std::result::Result<Response, PageError> {
    let sample = samples::find_sample(&state.config.samples_dir, index)?;
    let bytes = tokio::fs::read(&sample.path)
        .await
        .map_err(|e| Error::ImageRead {
            path: sample.path.clone(),
            reason: e.to_string(),
        })?;
    Ok((
        [(header::CONTENT_TYPE, imageio::content_type(&sample.name))],
        bytes,
    )
        .into_response())
}

async fn sample_thumbnail<M: Classifier>(
    State(state): State<Arc<AppState<M>>>,
    Path(index): Path<usize>,
) -> std::result::Result<Response, PageError> {
    let sample = samples::find_sample(&state.config.samples_dir, index)?;
    let png = run_blocking(move || {
        let image = imageio::read_image_from_path(&sample.path)?;
        imageio::thumbnail_png(&image, THUMBNAIL_SIZE)
    })
    .await?;
    Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
}

async fn list_samples<M: Classifier>(
    State(state): State<Arc<AppState<M>>>,
) -> Json<SampleListResponse> {
    Json(SampleListResponse {
        samples: state.samples().iter().map(SampleInfo::from).collect(),
    })
}

async fn health<M: Classifier>(State(state): State<Arc<AppState<M>>>) -> Json<HealthResponse> {
    let (status, model) = match state.loaded_engine().await {
        Some(engine) => (engine.state().as_str(), "loaded"),
        None => ("idle", "not_loaded"),
    };
    Json(HealthResponse {
        status: status.to_string(),
        model: model.to_string(),
    })
}

struct ClassifyInput {
    image: RgbImage8,
    source: ImageSource,
    preview: Preview,
}

/// Reads the `file` and `sample` form fields. An uploaded file wins over a
/// selected sample; an empty file part counts as no upload.
async fn read_classify_input(
    config: &ServerConfig,
    mut multipart: Multipart,
) -> Result<ClassifyInput> {
    let mut upload = None;
    let mut sample = None;

    while let Some(field) = multipart.next_field().await.map_err(from_multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await.map_err(from_multipart_error)?;
                if !data.is_empty() {
                    upload = Some((file_name, data));
                }
            }
            "sample" => {
                let value = field.text().await.map_err(from_multipart_error)?;
                if !value.trim().is_empty() {
                    sample = Some(value);
                }
            }
            other => log::debug!("Ignoring form field '{other}'"),
        }
    }

    if let Some((file_name, data)) = upload {
        if !imageio::has_supported_extension(&file_name) {
            return Err(Error::UnsupportedFormat(file_name));
        }
        let preview = Preview::inline(&data, imageio::content_type(&file_name));
        let image = run_blocking(move || imageio::decode_image_bytes(&data)).await?;
        return Ok(ClassifyInput {
            image,
            source: ImageSource::Upload { file_name },
            preview,
        });
    }

    if let Some(value) = sample {
        let index: usize = value
            .trim()
            .parse()
            .map_err(|_| Error::BadRequest(format!("invalid sample index '{value}'")))?;
        let sample = samples::find_sample(&config.samples_dir, index)?;
        let preview = Preview::sample(&sample);
        let path = sample.path.clone();
        let image = run_blocking(move || imageio::read_image_from_path(&path)).await?;
        return Ok(ClassifyInput {
            image,
            source: ImageSource::Sample { name: sample.name },
            preview,
        });
    }

    Err(Error::MissingImage)
}

async fn classify<M: Classifier>(
    state: &AppState<M>,
    input: ClassifyInput,
) -> Result<(Prediction, Duration)> {
    let engine = state.engine().await?;
    let pending = engine
        .submit(ClassifyRequest {
            image: input.image,
            source: input.source,
        })
        .map_err(from_engine_error)?;

    log::debug!("Submitted inference #{}", pending.id());

    let response = run_blocking(move || pending.wait().map_err(from_engine_error)).await?;
    Ok((response.response, response.duration))
}

fn from_multipart_error(e: MultipartError) -> Error {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Error::UploadTooLarge(e.body_text())
    } else {
        Error::BadRequest(e.body_text())
    }
}

fn from_engine_error(e: EngineError<Error>) -> Error {
    match e {
        EngineError::Model(e) => e,
        other => Error::Engine(other.to_string()),
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Engine(format!("blocking task failed: {e}")))?
}

fn status_for(error: &Error) -> StatusCode {
    match error {
        Error::SampleNotFound(_) => StatusCode::NOT_FOUND,
        Error::UploadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        e if e.is_client_error() => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Error rendered as an HTML page.
pub struct PageError(Error);

impl From<Error> for PageError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        log_error(status, &self.0);
        let reason = status.canonical_reason().unwrap_or("Error");
        (status, Html(page::render_error(reason, &self.0.to_string()))).into_response()
    }
}

/// Error rendered as `{"error": "..."}`.
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        log_error(status, &self.0);
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

fn log_error(status: StatusCode, error: &Error) {
    if status.is_server_error() {
        log::error!("{error}");
    } else {
        log::warn!("Rejected request: {error}");
    }
}
