use std::{io::Cursor, time::Instant};

use async_trait::async_trait;
use base64::Engine;
use image::{ImageFormat, Rgb, RgbImage};
use reqwest::{multipart, Client};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{error, info};

use crate::config::{ProviderConfig, DEMO_KEY};

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("HTTP error: {0}")] Http(String),
    #[error("API error: status={status} body={message}")] Api { status: u16, message: String },
    #[error("response carried no usable payload")] MissingPayload,
    #[error("decode error: {0}")] Decode(String),
    #[error("provider unavailable: {0}")] Unavailable(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self { UpstreamError::Http(e.to_string()) }
}

/// Free-text answers about an image.
#[async_trait]
pub trait VisionModel: Send + Sync {
    async fn ask_about_image(&self, prompt: &str, image: &[u8], mime: &str) -> Result<String, UpstreamError>;
}

/// Edits a source image according to a prompt and returns the raw output bytes.
#[async_trait]
pub trait ImageEditor: Send + Sync {
    async fn edit(&self, image: &[u8], prompt: &str) -> Result<Vec<u8>, UpstreamError>;
}

// Shortens base64 payloads in JSON bodies before they hit the logs
fn truncate_base64_in_json(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                if key == "b64_json" || key == "url" {
                    if let serde_json::Value::String(s) = val {
                        let len = s.chars().count();
                        if len > 100 {
                            let head: String = s.chars().take(50).collect();
                            *val = serde_json::Value::String(format!("{head}...[truncated {} chars]", len - 50));
                        }
                    }
                } else {
                    truncate_base64_in_json(val);
                }
            }
        }
        serde_json::Value::Array(arr) => arr.iter_mut().for_each(truncate_base64_in_json),
        _ => {}
    }
}

fn preview(body: &str) -> String {
    let shown = match serde_json::from_str::<serde_json::Value>(body) {
        Ok(mut v) => {
            truncate_base64_in_json(&mut v);
            v.to_string()
        }
        Err(_) => body.to_string(),
    };
    if shown.chars().count() > 1000 { format!("{}...", shown.chars().take(1000).collect::<String>()) } else { shown }
}

pub struct OpenAiClient {
    client: Client,
    config: ProviderConfig,
}

impl OpenAiClient {
    pub fn new(config: ProviderConfig) -> Result<Self, UpstreamError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn demo(&self) -> bool { self.config.api_key == DEMO_KEY }

    async fn perform_api_call(&self, request: reqwest::RequestBuilder, label: &str) -> Result<String, UpstreamError> {
        let started = Instant::now();
        let response = request.bearer_auth(&self.config.api_key).send().await?;
        let status = response.status();
        info!("📥 {} response status: {} after {:.2}s", label, status, started.elapsed().as_secs_f32());

        let body = response.text().await?;
        if !status.is_success() {
            error!("❌ {} API error response: {}", label, preview(&body));
            return Err(UpstreamError::Api { status: status.as_u16(), message: body });
        }
        info!("📥 Raw {} response: {}", label, preview(&body));
        Ok(body)
    }

    /// Solid gradient tinted by the prompt, so demo runs still produce a viewable ad.
    fn generate_placeholder_image(&self, prompt: &str) -> Result<Vec<u8>, UpstreamError> {
        let tint = prompt.bytes().fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));
        let [r, g, b, _] = tint.to_le_bytes();
        let img = RgbImage::from_fn(512, 512, |x, y| {
            let shade = ((x + y) / 4) as u8;
            Rgb([r.saturating_add(shade / 2), g.saturating_add(shade / 3), b.saturating_add(shade)])
        });
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).map_err(|e| UpstreamError::Decode(e.to_string()))?;
        Ok(buf.into_inner())
    }
}

#[async_trait]
impl VisionModel for OpenAiClient {
    async fn ask_about_image(&self, prompt: &str, image: &[u8], mime: &str) -> Result<String, UpstreamError> {
        if self.demo() {
            info!("Using demo mode - vision model not called");
            return Err(UpstreamError::Unavailable("demo mode".into()));
        }
        let data = base64::engine::general_purpose::STANDARD.encode(image);
        let body = json!({
            "model": self.config.vision_model,
            "messages": [{
                "role": "user",
                "content": [
                    {"type": "text", "text": prompt},
                    {"type": "image_url", "image_url": {"url": format!("data:{mime};base64,{data}")}}
                ]
            }],
            "max_tokens": 100,
            "temperature": 0.7
        });
        let url = format!("{}/chat/completions", self.config.base_url);
        info!("🔗 Calling vision model {} at {}", self.config.vision_model, url);

        let text = self.perform_api_call(self.client.post(&url).json(&body), "vision").await?;
        let parsed: ChatResponse = serde_json::from_str(&text).map_err(|e| UpstreamError::Decode(e.to_string()))?;
        parsed.first_text().ok_or(UpstreamError::MissingPayload)
    }
}

#[async_trait]
impl ImageEditor for OpenAiClient {
    async fn edit(&self, image: &[u8], prompt: &str) -> Result<Vec<u8>, UpstreamError> {
        if self.demo() {
            info!("Using demo mode - rendering placeholder instead of calling the edit model");
            return self.generate_placeholder_image(prompt);
        }
        let format = image::guess_format(image).unwrap_or(ImageFormat::Png);
        let ext = format.extensions_str().first().copied().unwrap_or("png");
        let part = multipart::Part::bytes(image.to_vec())
            .file_name(format!("product.{ext}"))
            .mime_str(format.to_mime_type())?;
        let form = multipart::Form::new()
            .text("model", self.config.image_model.clone())
            .text("prompt", prompt.to_string())
            .part("image", part);
        let url = format!("{}/images/edits", self.config.base_url);
        info!("🔗 Calling image edit model {} at {} ({} byte source)", self.config.image_model, url, image.len());

        let text = self.perform_api_call(self.client.post(&url).multipart(form), "image edit").await?;
        let parsed: EditResponse = serde_json::from_str(&text).map_err(|e| UpstreamError::Decode(e.to_string()))?;
        decode_first_image(&parsed)
    }
}

// --- Response Parsing Helpers ---

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice { message: ChatMessage }

#[derive(Debug, Deserialize)]
struct ChatMessage { #[serde(default)] content: Option<String> }

impl ChatResponse {
    fn first_text(&self) -> Option<String> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
    }
}

#[derive(Debug, Deserialize)]
struct EditResponse {
    #[serde(default)]
    data: Vec<EditData>,
}

#[derive(Debug, Deserialize)]
struct EditData { #[serde(default)] b64_json: Option<String> }

fn decode_first_image(resp: &EditResponse) -> Result<Vec<u8>, UpstreamError> {
    let b64 = resp
        .data
        .first()
        .and_then(|d| d.b64_json.as_deref())
        .ok_or(UpstreamError::MissingPayload)?;
    info!("🖼️ Received base64 image data, length: {} characters", b64.len());
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(b64)
        .map_err(|e| UpstreamError::Decode(e.to_string()))?;
    info!("🖼️ Decoded image size: {} bytes", bytes.len());
    Ok(bytes)
}
