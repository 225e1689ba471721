//! Mapping from model class names to what the page shows.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The two outcomes the classifier distinguishes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WasteCategory {
    Biodegradable,
    NonBiodegradable,
}

// (class name, category); names are compared lower-cased and trimmed
const KNOWN_CLASSES: &[(&str, WasteCategory)] = &[
    ("b", WasteCategory::Biodegradable),
    ("bio", WasteCategory::Biodegradable),
    ("biodegradable", WasteCategory::Biodegradable),
    ("n", WasteCategory::NonBiodegradable),
    ("nb", WasteCategory::NonBiodegradable),
    ("non-biodegradable", WasteCategory::NonBiodegradable),
    ("non_biodegradable", WasteCategory::NonBiodegradable),
    ("non biodegradable", WasteCategory::NonBiodegradable),
    ("nonbiodegradable", WasteCategory::NonBiodegradable),
];

impl WasteCategory {
    /// Looks up a class name in the table of known names.
    pub fn from_class_name(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        KNOWN_CLASSES
            .iter()
            .find(|(known, _)| *known == name)
            .map(|(_, category)| *category)
    }

    pub fn display_label(&self) -> &'static str {
        match self {
            WasteCategory::Biodegradable => "Biodegradable 🌱",
            WasteCategory::NonBiodegradable => "Non-Biodegradable ♻️",
        }
    }

    /// CSS color of the result label.
    pub fn color(&self) -> &'static str {
        match self {
            WasteCategory::Biodegradable => "#4CAF50",
            WasteCategory::NonBiodegradable => "#E53935",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WasteCategory::Biodegradable => "biodegradable",
            WasteCategory::NonBiodegradable => "non_biodegradable",
        }
    }
}

impl fmt::Display for WasteCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_label())
    }
}

/// A model class together with the category it belongs to.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassLabel {
    pub name: String,
    pub category: WasteCategory,
}

impl ClassLabel {
    /// Resolves a bare class name through the known-name table.
    pub fn resolve(name: &str) -> Result<Self> {
        WasteCategory::from_class_name(name)
            .map(|category| ClassLabel {
                name: name.to_string(),
                category,
            })
            .ok_or_else(|| Error::UnknownClass(name.to_string()))
    }
}

/// The model's classes in output order.
#[derive(Clone, Debug, PartialEq)]
pub struct Vocabulary {
    classes: Vec<ClassLabel>,
}

impl Vocabulary {
    pub fn new(classes: Vec<ClassLabel>) -> Result<Self> {
        if classes.is_empty() {
            return Err(Error::InvalidManifest("vocabulary is empty".to_string()));
        }
        Ok(Self { classes })
    }

    /// Builds a vocabulary from bare class names using the known-name table.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let classes = names
            .iter()
            .map(|name| ClassLabel::resolve(name.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Self::new(classes)
    }

    pub fn get(&self, index: usize) -> Option<&ClassLabel> {
        self.classes.get(index)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassLabel> {
        self.classes.iter()
    }
}

/// Formats a probability as a percentage with two decimals, e.g. `0.8734` → `87.34%`.
pub fn format_confidence(probability: f32) -> String {
    format!("{:.2}%", f64::from(probability) * 100.0)
}
