use crate::error::{Error, Result};
use crate::imageio::has_supported_extension;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Upper bound on the number of bundled samples shown on the page.
pub const MAX_SAMPLES: usize = 4;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SampleImage {
    /// Position in the sample grid, used in URLs.
    pub index: usize,
    pub name: String,
    #[serde(skip)]
    pub path: PathBuf,
}

/// Lists the bundled sample images.
///
/// The first [`MAX_SAMPLES`] entry names in sorted order are considered and
/// those without a `.jpg`, `.jpeg` or `.png` extension are dropped, so fewer
/// than four samples may come back. A missing directory yields nothing.
pub fn discover_samples(dir: &Path) -> Vec<SampleImage> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::debug!("No sample images in {}: {e}", dir.display());
            return Vec::new();
        }
    };

    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();
    names.sort();

    names
        .into_iter()
        .take(MAX_SAMPLES)
        .filter(|name| has_supported_extension(name))
        .enumerate()
        .map(|(index, name)| SampleImage {
            index,
            path: dir.join(&name),
            name,
        })
        .collect()
}

/// Looks up a sample by its grid index.
pub fn find_sample(dir: &Path, index: usize) -> Result<SampleImage> {
    discover_samples(dir)
        .into_iter()
        .nth(index)
        .ok_or_else(|| Error::SampleNotFound(index.to_string()))
}
