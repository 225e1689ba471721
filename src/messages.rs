use crate::classifier::{ImageSource, Prediction};
use crate::label::WasteCategory;
use crate::samples::SampleImage;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClassificationResponse {
    pub label: String,
    pub index: usize,
    pub probabilities: Vec<f32>,
    pub category: WasteCategory,
    pub display_label: String,
    pub color: String,
    pub confidence: f64,
    pub confidence_display: String,
    pub source: String,
    pub duration: Duration,
}

impl ClassificationResponse {
    pub fn new(prediction: &Prediction, source: &ImageSource, duration: Duration) -> Self {
        Self {
            label: prediction.label.clone(),
            index: prediction.index,
            probabilities: prediction.probabilities.clone(),
            category: prediction.category,
            display_label: prediction.category.display_label().to_string(),
            color: prediction.category.color().to_string(),
            confidence: prediction.confidence_percent(),
            confidence_display: prediction.confidence_display(),
            source: source.to_string(),
            duration,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SampleInfo {
    pub index: usize,
    pub name: String,
    pub image_url: String,
    pub thumbnail_url: String,
}

impl From<&SampleImage> for SampleInfo {
    fn from(sample: &SampleImage) -> Self {
        Self {
            index: sample.index,
            name: sample.name.clone(),
            image_url: format!("/samples/{}", sample.index),
            thumbnail_url: format!("/samples/{}/thumbnail", sample.index),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SampleListResponse {
    pub samples: Vec<SampleInfo>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub model: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
