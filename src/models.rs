use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

pub const MAX_COLORS: usize = 3;
pub const FALLBACK_COLORS: [&str; 3] = ["electric blue", "hot pink", "golden yellow"];

/// Resolved colors for one advertisement. `count` always equals `colors.len()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorSpec {
    colors: Vec<String>,
}

impl ColorSpec {
    /// Returns `None` unless there are between 1 and 3 colors.
    pub fn new(colors: Vec<String>) -> Option<Self> {
        (1..=MAX_COLORS).contains(&colors.len()).then_some(Self { colors })
    }

    /// Fixed triple used when the vision model cannot be reached.
    pub fn fallback() -> Self {
        Self { colors: FALLBACK_COLORS.iter().map(|c| c.to_string()).collect() }
    }

    pub fn colors(&self) -> &[String] { &self.colors }
    pub fn count(&self) -> usize { self.colors.len() }
    pub fn joined(&self) -> String { self.colors.join(", ") }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    Manual,
    Smart,
    Random,
}

/// Where the colors of a finished ad came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorSource {
    Manual,
    Smart,
    Fallback,
    Random,
}

#[derive(Debug, Clone)]
pub struct UploadedAsset {
    pub file_id: String,
    pub filename: String,
    pub extension: String,
    pub local_path: PathBuf,
    pub object_key: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub product_name: String,
    pub brand_name: String,
    pub file_id: String,
    pub image_path: PathBuf,
    pub mode: ColorMode,
    pub number_of_colors: Option<usize>,
    pub manual_colors: Option<ColorSpec>,
}

#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub image: Vec<u8>,
    pub output_filename: String,
    pub output_path: PathBuf,
    pub colors: ColorSpec,
    pub color_source: ColorSource,
    pub storage_url: Option<String>,
    pub storage_object: Option<String>,
}

// --- HTTP payloads ---

#[skip_serializing_none]
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    pub file_id: String,
    pub filename: String,
    pub filepath: String,
    pub storage_url: Option<String>,
    pub uploaded_at: DateTime<Utc>,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendResponse {
    pub success: bool,
    pub product_name: String,
    pub recommended_colors: Vec<String>,
    pub fallback: bool,
    pub message: String,
}

#[skip_serializing_none]
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub success: bool,
    pub product_name: String,
    pub brand_name: String,
    pub output_file: String,
    pub download_url: String,
    pub colors_used: Vec<String>,
    pub number_of_colors: usize,
    pub color_source: ColorSource,
    pub storage_url: Option<String>,
    pub storage_object: Option<String>,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CancelResponse {
    pub success: bool,
    pub cancelled: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CleanupResponse {
    pub success: bool,
    pub removed_local: usize,
    pub removed_remote: usize,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListImagesResponse {
    pub success: bool,
    pub image_type: String,
    pub images: Vec<String>,
}
