use std::{path::Path, sync::Arc};

use tracing::{error, info, warn};

use crate::{
    error::AppError,
    models::{ColorSpec, MAX_COLORS},
    openai::VisionModel,
};

const PAD_COLORS: [&str; 3] = ["electric blue", "sunset orange", "deep purple"];

/// Outcome of asking the vision model for colors. Both variants carry exactly three colors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recommendation {
    Advised(Vec<String>),
    Fallback(Vec<String>),
}

impl Recommendation {
    pub fn colors(&self) -> &[String] {
        match self {
            Recommendation::Advised(c) | Recommendation::Fallback(c) => c,
        }
    }

    pub fn is_fallback(&self) -> bool { matches!(self, Recommendation::Fallback(_)) }

    pub fn into_colors(self) -> Vec<String> {
        match self {
            Recommendation::Advised(c) | Recommendation::Fallback(c) => c,
        }
    }
}

fn vision_prompt(product: &str) -> String {
    format!(
        "Analyze this image of a {product} and recommend exactly 3 colors that would work best for creating an eye-catching advertisement.\n\n\
Consider:\n\
1. The product's existing colors and design\n\
2. Colors that complement the product\n\
3. Colors that would make the product stand out in an advertisement\n\
4. Modern, vibrant colors that attract attention\n\n\
Please respond with exactly 3 color names separated by commas, for example:\n\
electric blue, sunset orange, deep purple\n\n\
Focus on bold, vibrant colors that would work well for advertising purposes."
    )
}

/// Splits a comma separated answer and pads or truncates it to exactly three colors.
pub fn normalize_colors(raw: &str) -> Vec<String> {
    let mut colors: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(String::from)
        .collect();
    if colors.len() < MAX_COLORS {
        warn!("Only received {} colors, padding with defaults", colors.len());
        let have = colors.len();
        colors.extend(PAD_COLORS[have..].iter().map(|c| c.to_string()));
    } else if colors.len() > MAX_COLORS {
        info!("Received {} colors, taking first {}", colors.len(), MAX_COLORS);
        colors.truncate(MAX_COLORS);
    }
    colors
}

pub fn mime_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/jpeg",
    }
}

pub struct ColorAdvisor {
    vision: Arc<dyn VisionModel>,
}

impl ColorAdvisor {
    pub fn new(vision: Arc<dyn VisionModel>) -> Self { Self { vision } }

    /// Fails only when the image is missing or empty; provider trouble becomes `Fallback`.
    pub async fn recommend(&self, product: &str, image_path: &Path) -> Result<Recommendation, AppError> {
        let image = read_image(image_path).await?;
        info!("🎨 Analyzing image to recommend colors for {} ({} bytes)", product, image.len());

        match self.vision.ask_about_image(&vision_prompt(product), &image, mime_for(image_path)).await {
            Ok(text) => {
                info!("🎨 Raw color recommendations: {}", text);
                let colors = normalize_colors(&text);
                info!("✅ Final recommended colors for {}: {}", product, colors.join(", "));
                Ok(Recommendation::Advised(colors))
            }
            Err(e) => {
                error!("❌ Failed to get color recommendations: {}", e);
                info!("🔄 Falling back to default color recommendations");
                Ok(Recommendation::Fallback(ColorSpec::fallback().colors().to_vec()))
            }
        }
    }

    /// Three colors to render, or `None` when the caller should pick at random instead.
    pub async fn smart_color_plan(&self, product: &str, image_path: &Path) -> Option<(ColorSpec, bool)> {
        match self.recommend(product, image_path).await {
            Ok(rec) => {
                let fallback = rec.is_fallback();
                info!(fallback, "🧠 Smart colors: {}", rec.colors().join(", "));
                ColorSpec::new(rec.into_colors()).map(|spec| (spec, fallback))
            }
            Err(e) => {
                error!("❌ Smart color recommendation failed: {}", e);
                info!("🔄 Falling back to random color selection");
                None
            }
        }
    }
}

async fn read_image(path: &Path) -> Result<Vec<u8>, AppError> {
    let missing = || AppError::AssetNotFound(format!("image file not found: {}", path.display()));
    let bytes = tokio::fs::read(path).await.map_err(|_| missing())?;
    if bytes.is_empty() {
        return Err(missing());
    }
    Ok(bytes)
}
