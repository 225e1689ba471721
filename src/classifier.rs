use crate::config::ModelConfig;
use crate::error::{Error, Result};
use crate::imageio::{self, RgbImage8};
use crate::label::{Vocabulary, WasteCategory, format_confidence};
use crate::manifest::{ModelManifest, OutputKind};
use crate::model::{InferenceModel, RequestMetadata};
use serde::Serialize;
use std::{fmt, path::PathBuf};
use tract_onnx::prelude::*;

type Plan = TypedRunnableModel<TypedModel>;

/// Where the image being classified came from.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImageSource {
    Upload { file_name: String },
    Sample { name: String },
    Synthetic,
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSource::Upload { file_name } => write!(f, "upload '{file_name}'"),
            ImageSource::Sample { name } => write!(f, "sample '{name}'"),
            ImageSource::Synthetic => f.write_str("synthetic image"),
        }
    }
}

pub struct ClassifyRequest {
    pub image: RgbImage8,
    pub source: ImageSource,
}

#[derive(Clone, Debug)]
pub struct ClassifyMetadata {
    pub source: ImageSource,
    pub width: usize,
    pub height: usize,
}

impl RequestMetadata for ClassifyRequest {
    type Metadata = ClassifyMetadata;

    fn metadata(&self) -> Self::Metadata {
        ClassifyMetadata {
            source: self.source.clone(),
            width: self.image.width(),
            height: self.image.height(),
        }
    }
}

/// Outcome of classifying one image.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Prediction {
    /// Predicted class name from the vocabulary.
    pub label: String,
    /// Index of the predicted class.
    pub index: usize,
    /// Probability of every class, in vocabulary order.
    pub probabilities: Vec<f32>,
    pub category: WasteCategory,
}

impl Prediction {
    /// Probability of the predicted class.
    pub fn probability(&self) -> f32 {
        self.probabilities.get(self.index).copied().unwrap_or(0.0)
    }

    pub fn confidence_percent(&self) -> f64 {
        f64::from(self.probability()) * 100.0
    }

    /// Confidence formatted for display, e.g. `87.34%`.
    pub fn confidence_display(&self) -> String {
        format_confidence(self.probability())
    }
}

/// Pre-trained binary waste classifier backed by an ONNX graph.
///
/// The plan is built once at load time and never mutated afterwards.
pub struct OnnxClassifier {
    plan: Plan,
    manifest: ModelManifest,
    vocabulary: Vocabulary,
    model_path: PathBuf,
}

impl OnnxClassifier {
    /// Loads the manifest and the ONNX graph named by `config`.
    pub fn load(config: &ModelConfig) -> Result<Self> {
        let manifest = ModelManifest::load(&config.manifest_path())?;
        let vocabulary = manifest.vocabulary()?;
        let model_path = config.model_path.clone();
        let size = manifest.input_size;

        log::info!("Loading model from {}", model_path.display());

        let plan = tract_onnx::onnx()
            .model_for_path(&model_path)
            .and_then(|model| model.with_input_fact(0, f32::fact([1, 3, size, size]).into()))
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| Error::ModelLoad {
                path: model_path.clone(),
                reason: format!("{e:#}"),
            })?;

        log::info!(
            "Model ready: {} classes, input {size}x{size}",
            vocabulary.len()
        );

        Ok(Self {
            plan,
            manifest,
            vocabulary,
            model_path,
        })
    }

    pub fn manifest(&self) -> &ModelManifest {
        &self.manifest
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Classifies a single image.
    pub fn predict(&self, image: &RgbImage8) -> Result<Prediction> {
        let input = preprocess(image, &self.manifest)?;

        let outputs = self
            .plan
            .run(tvec!(input.into()))
            .map_err(|e| Error::Inference(format!("{e:#}")))?;

        let scores: Vec<f32> = outputs
            .first()
            .ok_or_else(|| Error::Inference("model produced no outputs".to_string()))?
            .to_array_view::<f32>()
            .map_err(|e| Error::Inference(format!("{e:#}")))?
            .iter()
            .copied()
            .collect();

        prediction_from_scores(&self.vocabulary, self.manifest.output, &scores)
    }
}

impl InferenceModel for OnnxClassifier {
    type Request = ClassifyRequest;
    type Response = Prediction;
    type Error = Error;

    fn run(&mut self, request: Self::Request) -> Result<Self::Response> {
        let prediction = self.predict(&request.image)?;
        log::info!(
            "Classified {} as '{}' ({})",
            request.source,
            prediction.label,
            prediction.confidence_display()
        );
        Ok(prediction)
    }
}

impl fmt::Display for OnnxClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let size = self.manifest.input_size;
        writeln!(f, "OnnxClassifier")?;
        writeln!(f, "  model: {}", self.model_path.display())?;
        if let Some(architecture) = &self.manifest.architecture {
            writeln!(f, "  architecture: {architecture}")?;
        }
        writeln!(f, "  input: 1x3x{size}x{size}")?;
        writeln!(
            f,
            "  normalize: mean {:?}, std {:?}",
            self.manifest.mean, self.manifest.std
        )?;
        writeln!(f, "  output: {:?}", self.manifest.output)?;
        write!(f, "  classes:")?;
        for (index, class) in self.vocabulary.iter().enumerate() {
            write!(f, "\n    {index}: {} -> {}", class.name, class.category.as_str())?;
        }
        Ok(())
    }
}

/// Resizes, scales and normalizes an image into an NCHW `f32` tensor.
pub fn preprocess(image: &RgbImage8, manifest: &ModelManifest) -> Result<Tensor> {
    let resized = imageio::resize_exact(image, manifest.input_size as u32)?;
    Ok(normalize_nchw(&resized, &manifest.mean, &manifest.std).into())
}

pub fn normalize_nchw(
    rgb: &image::RgbImage,
    mean: &[f32; 3],
    std: &[f32; 3],
) -> tract_ndarray::Array4<f32> {
    let (width, height) = rgb.dimensions();
    tract_ndarray::Array4::from_shape_fn(
        (1, 3, height as usize, width as usize),
        |(_, c, y, x)| {
            let value = f32::from(rgb.get_pixel(x as u32, y as u32)[c]) / 255.0;
            (value - mean[c]) / std[c]
        },
    )
}

/// Numerically stable softmax.
pub fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Index of the largest value; the first one wins on ties.
pub fn argmax(values: &[f32]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, &v)| match best {
            Some((_, b)) if v <= b => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

/// Turns raw graph output into a prediction over `vocabulary`.
pub fn prediction_from_scores(
    vocabulary: &Vocabulary,
    output: OutputKind,
    scores: &[f32],
) -> Result<Prediction> {
    if scores.len() != vocabulary.len() {
        return Err(Error::OutputMismatch {
            expected: vocabulary.len(),
            actual: scores.len(),
        });
    }

    let probabilities = match output {
        OutputKind::Logits => softmax(scores),
        OutputKind::Probabilities => scores.to_vec(),
    };

    let index = argmax(&probabilities)
        .ok_or_else(|| Error::Inference("model produced no scores".to_string()))?;
    let class = vocabulary
        .get(index)
        .ok_or_else(|| Error::Inference(format!("class index {index} out of range")))?;

    Ok(Prediction {
        label: class.name.clone(),
        index,
        probabilities,
        category: class.category,
    })
}
