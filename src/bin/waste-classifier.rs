use argh::FromArgs;
use std::{path::PathBuf, sync::Arc};
use waste_classifier::{
    AppState, ModelConfig, OnnxClassifier, ServerConfig, config, server::ModelLoader,
};

// defaults for the server
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8501;

#[derive(FromArgs)]
/// Waste classifier web app: upload or pick an image and see whether it is biodegradable.
struct ServerArgs {
    /// the host to run the server on
    #[argh(option, short = 'h', default = "DEFAULT_HOST.to_string()")]
    host: String,

    /// the port to run the server on
    #[argh(option, short = 'p', default = "DEFAULT_PORT")]
    port: u16,

    /// path to the ONNX model
    #[argh(
        option,
        short = 'm',
        default = "PathBuf::from(config::DEFAULT_MODEL_PATH)"
    )]
    model: PathBuf,

    /// path to the model manifest (defaults to the model path with a .json extension)
    #[argh(option)]
    manifest: Option<PathBuf>,

    /// directory holding the sample images
    #[argh(option, default = "PathBuf::from(config::DEFAULT_SAMPLES_DIR)")]
    samples: PathBuf,

    /// maximum upload size in megabytes
    #[argh(option, default = "config::DEFAULT_MAX_UPLOAD_MB")]
    max_upload_mb: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: ServerArgs = argh::from_env();

    // format the host and port
    let addr = format!("{}:{}", args.host, args.port);

    let mut model = ModelConfig::new(args.model);
    if let Some(manifest) = args.manifest {
        model = model.with_manifest(manifest);
    }

    let server_config = ServerConfig {
        model: model.clone(),
        samples_dir: args.samples,
        max_upload_bytes: args.max_upload_mb * 1024 * 1024,
    };

    let loader: ModelLoader<OnnxClassifier> = Arc::new(move || OnnxClassifier::load(&model));
    let state = Arc::new(AppState::new(server_config, loader));

    log::info!("🚀 Starting the server");
    log::info!("🔥 Listening on: http://{}", addr);
    log::info!("🔧 Press Ctrl+C to stop the server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    waste_classifier::serve(listener, state).await?;

    Ok(())
}
