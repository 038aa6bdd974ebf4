use std::sync::Arc;

use image::ImageFormat;
use tracing::{info, warn};

use crate::{
    assets::AssetStore,
    colors::ColorAdvisor,
    error::AppError,
    models::{ColorMode, ColorSource, ColorSpec, GenerationRequest, GenerationResult},
    openai::ImageEditor,
    prompt::{build_prompt, ColorPicker},
    storage::{StorageGateway, OUTPUTS_PREFIX},
};

/// Resolves colors, calls the edit model and stores the advertisement.
pub struct AdGenerator {
    advisor: Arc<ColorAdvisor>,
    picker: Arc<ColorPicker>,
    editor: Arc<dyn ImageEditor>,
    assets: Arc<AssetStore>,
    storage: Arc<StorageGateway>,
}

impl AdGenerator {
    pub fn new(
        advisor: Arc<ColorAdvisor>,
        picker: Arc<ColorPicker>,
        editor: Arc<dyn ImageEditor>,
        assets: Arc<AssetStore>,
        storage: Arc<StorageGateway>,
    ) -> Self {
        Self { advisor, picker, editor, assets, storage }
    }

    async fn resolve_colors(&self, request: &GenerationRequest) -> (ColorSpec, ColorSource) {
        match (request.mode, &request.manual_colors) {
            (ColorMode::Manual, Some(spec)) => (spec.clone(), ColorSource::Manual),
            (ColorMode::Smart, _) => {
                info!("🧠 Using smart color recommendations based on product image...");
                match self.advisor.smart_color_plan(&request.product_name, &request.image_path).await {
                    Some((spec, false)) => (spec, ColorSource::Smart),
                    Some((spec, true)) => (spec, ColorSource::Fallback),
                    None => (self.picker.pick(request.number_of_colors), ColorSource::Random),
                }
            }
            _ => (self.picker.pick(request.number_of_colors), ColorSource::Random),
        }
    }

    pub async fn generate(&self, request: GenerationRequest) -> Result<GenerationResult, AppError> {
        info!(file_id = %request.file_id, "🚀 Generating ad for {} by {}", request.product_name, request.brand_name);

        let source = tokio::fs::read(&request.image_path)
            .await
            .ok()
            .filter(|bytes| !bytes.is_empty())
            .ok_or_else(|| AppError::AssetNotFound(format!("image file not found: {}", request.image_path.display())))?;

        let (colors, color_source) = self.resolve_colors(&request).await;
        let prompt = build_prompt(&request.product_name, &request.brand_name, &colors);

        let image = self.editor.edit(&source, &prompt).await?;
        if image.is_empty() {
            return Err(AppError::Upstream(crate::openai::UpstreamError::MissingPayload));
        }

        let format = image::guess_format(&image).unwrap_or(ImageFormat::Png);
        let ext = format.extensions_str().first().copied().unwrap_or("png");
        let (output_filename, output_path) = self.assets.output_target(&request.product_name, &request.brand_name, ext);
        self.assets.save_output(&output_path, &image).await?;

        let object_key = format!("{OUTPUTS_PREFIX}{output_filename}");
        let (storage_url, storage_object) = match self.storage.put_file(&object_key, &output_path, format.to_mime_type()).await {
            Some(direct) => {
                let url = self.storage.presigned_url(&object_key).await.unwrap_or(direct);
                (Some(url), Some(object_key))
            }
            None => {
                warn!("⚠️ Storage upload failed; returning result without a remote URL");
                (None, None)
            }
        };

        info!("✅ AD image generation completed: {} with {}", output_filename, colors.joined());
        Ok(GenerationResult {
            image,
            output_filename,
            output_path,
            colors,
            color_source,
            storage_url,
            storage_object,
        })
    }
}
