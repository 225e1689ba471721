use argh::FromArgs;
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::path::PathBuf;
use waste_classifier::{ModelConfig, OnnxClassifier, config, imageio};

const SYNTHETIC_SIZE: u32 = 224;

#[derive(FromArgs)]
/// Loads the waste classifier and runs one prediction on a random image.
struct SmokeTestArgs {
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

    /// seed for the random test image
    #[argh(option)]
    seed: Option<u64>,
}

fn run(args: SmokeTestArgs) -> waste_classifier::Result<()> {
    let mut model_config = ModelConfig::new(args.model);
    if let Some(manifest) = args.manifest {
        model_config = model_config.with_manifest(manifest);
    }

    let classifier = OnnxClassifier::load(&model_config)?;
    println!("\nMODEL LOADED SUCCESSFULLY 🔥🔥🔥\n");
    println!("{classifier}");

    println!("\nRunning test prediction...\n");

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let noise = image::RgbImage::from_fn(SYNTHETIC_SIZE, SYNTHETIC_SIZE, |_, _| {
        image::Rgb(rng.r#gen::<[u8; 3]>())
    });
    let image = imageio::from_rgb_buffer(noise)?;

    let prediction = classifier.predict(&image)?;

    println!("Prediction Test:");
    println!("Class: {}", prediction.label);
    println!("Confidence: {} %", prediction.confidence_percent());

    Ok(())
}

fn main() {
    env_logger::init();
    let args: SmokeTestArgs = argh::from_env();

    println!("loading model...");

    if let Err(e) = run(args) {
        println!("\n❌ ERROR OCCURRED ❌\n");
        println!("{e}");
        std::process::exit(1);
    }
}
