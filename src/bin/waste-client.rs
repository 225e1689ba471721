use argh::FromArgs;
use std::path::PathBuf;
use waste_classifier::messages::{ClassificationResponse, SampleListResponse};

// defaults for the client
const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 8501;

#[derive(FromArgs)]
/// Waste classifier client for classifying images against a running server
struct ClientArgs {
    /// the host to connect to
    #[argh(option, short = 'h', default = "DEFAULT_HOST.to_string()")]
    host: String,

    /// the port to connect to
    #[argh(option, short = 'p', default = "DEFAULT_PORT")]
    port: u16,

    /// command to execute: "classify" or "samples"
    #[argh(subcommand)]
    command: ClientCommands,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum ClientCommands {
    Classify(ClassifyCommand),
    Samples(SamplesCommand),
}

#[derive(FromArgs)]
/// Classify a local image file
#[argh(subcommand, name = "classify")]
struct ClassifyCommand {
    /// the path to the image
    #[argh(option, short = 'i')]
    image_path: PathBuf,
}

#[derive(FromArgs)]
/// List the sample images offered by the server
#[argh(subcommand, name = "samples")]
struct SamplesCommand {}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: ClientArgs = argh::from_env();

    let client = reqwest::Client::new();

    // format the host and port
    let addr = format!("{}:{}", args.host, args.port);

    match args.command {
        ClientCommands::Classify(classify_command) => {
            let path = classify_command.image_path;
            let file_name = path
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("upload")
                .to_string();
            let bytes = tokio::fs::read(&path).await?;
            log::debug!("Uploading {} ({} bytes)", path.display(), bytes.len());

            let form = reqwest::multipart::Form::new().part(
                "file",
                reqwest::multipart::Part::bytes(bytes).file_name(file_name),
            );

            let response = client
                .post(format!("http://{}/api/classify", addr))
                .multipart(form)
                .send()
                .await?;

            if !response.status().is_success() {
                let result = response.json::<serde_json::Value>().await?;
                println!("Error: {}", serde_json::to_string_pretty(&result)?);
                std::process::exit(1);
            }

            let result = response.json::<ClassificationResponse>().await?;
            println!("{} (confidence: {})", result.display_label, result.confidence_display);
            println!("Result: {}", serde_json::to_string_pretty(&result)?);
        }
        ClientCommands::Samples(_) => {
            let response = client
                .get(format!("http://{}/api/samples", addr))
                .send()
                .await?;

            let result = response.json::<SampleListResponse>().await?;
            println!("Result: {}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}
