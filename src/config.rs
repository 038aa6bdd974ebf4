use std::{path::PathBuf, str::FromStr, time::Duration};

pub const DEMO_KEY: &str = "DEMO_KEY";

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: String,
    pub base_url: String,
    pub vision_model: String,
    pub image_model: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub secure: bool,
    pub bucket: String,
    pub region: String,
    pub presign_expiry_secs: u32,
}

impl StorageConfig {
    pub fn endpoint_url(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{scheme}://{}", self.endpoint)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub provider: ProviderConfig,
    pub storage: StorageConfig,
    pub upload_dir: PathBuf,
    pub output_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub generation_timeout: Option<Duration>,
    pub color_seed: Option<u64>,
    pub port: u16,
}

impl Config {
    /// Reads the process environment. Every setting has a local-development default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let text = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let provider = ProviderConfig {
            api_key: text("OPENAI_API_KEY", DEMO_KEY),
            base_url: text("OPENAI_API_BASE", "https://api.openai.com/v1").trim_end_matches('/').to_string(),
            vision_model: text("VISION_MODEL", "gpt-4o"),
            image_model: text("IMAGE_MODEL", "gpt-image-1"),
            timeout: Duration::from_secs(parsed(&lookup, "HTTP_TIMEOUT_SECS", 120)),
        };
        let storage = StorageConfig {
            endpoint: text("MINIO_ENDPOINT", "localhost:9000"),
            access_key: text("MINIO_ACCESS_KEY", "minio"),
            secret_key: text("MINIO_SECRET_KEY", "minio123"),
            secure: parse_flag(&lookup, "MINIO_SECURE", false),
            bucket: text("MINIO_BUCKET", "ad-images"),
            region: text("MINIO_REGION", "us-east-1"),
            presign_expiry_secs: parsed(&lookup, "PRESIGN_EXPIRY_SECS", 3600),
        };
        Self {
            provider,
            storage,
            upload_dir: PathBuf::from(text("UPLOAD_DIR", "temp_uploads")),
            output_dir: PathBuf::from(text("OUTPUT_DIR", "generated_ads")),
            max_upload_bytes: parsed(&lookup, "MAX_UPLOAD_BYTES", 20 * 1024 * 1024),
            generation_timeout: optional(&lookup, "GENERATION_TIMEOUT_SECS").map(Duration::from_secs),
            color_seed: optional(&lookup, "COLOR_SEED"),
            port: parsed(&lookup, "PORT", 8000),
        }
    }

    pub fn demo_mode(&self) -> bool { self.provider.api_key == DEMO_KEY }
}

fn optional<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("Ignoring unparseable {}={:?}", key, raw);
            None
        }
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    optional(lookup, key).unwrap_or(default)
}

fn parse_flag(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> bool {
    match lookup(key) {
        Some(raw) => parse_bool(&raw).unwrap_or_else(|| {
            tracing::warn!("Ignoring unparseable {}={:?}", key, raw);
            default
        }),
        None => default,
    }
}

/// Accepts the spellings browsers and shells send for booleans.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
