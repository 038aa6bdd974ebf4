use std::{collections::HashMap, path::Path as FsPath, sync::Arc, time::Duration};

use axum::{
    async_trait,
    extract::{DefaultBodyLimit, Form, FromRequest, Multipart, Path, Request, State},
    http::header,
    response::{IntoResponse, Redirect, Response},
    routing::{delete, get, post},
    Json, Router,
};
use image::ImageFormat;
use serde_json::json;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, info_span, warn, Instrument};

use crate::{
    assets::{validate_file_id, AssetStore},
    colors::ColorAdvisor,
    config::parse_bool,
    error::AppError,
    generator::AdGenerator,
    jobs::JobRegistry,
    models::{
        CancelResponse, CleanupResponse, ColorMode, ColorSpec, GenerateResponse, GenerationRequest,
        ListImagesResponse, RecommendResponse, UploadResponse, MAX_COLORS,
    },
    storage::{StorageGateway, INPUTS_PREFIX, OUTPUTS_PREFIX},
};

#[derive(Clone)]
pub struct AppState {
    pub assets: Arc<AssetStore>,
    pub advisor: Arc<ColorAdvisor>,
    pub generator: Arc<AdGenerator>,
    pub storage: Arc<StorageGateway>,
    pub jobs: Arc<JobRegistry>,
    pub generation_timeout: Option<Duration>,
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/upload-image", post(upload_image))
        .route("/recommend-colors", post(recommend_colors))
        .route("/generate-ad", post(generate_ad))
        .route("/download/:filename", get(download_file))
        .route("/cleanup/:file_id", delete(cleanup_files))
        .route("/cancel-generation/:file_id", post(cancel_generation))
        .route("/list-images/:image_type", get(list_images))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}

/// Text form fields from either `multipart/form-data` or urlencoded bodies.
pub struct FormFields(HashMap<String, String>);

#[async_trait]
impl<S> FromRequest<S> for FormFields
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        if !is_multipart {
            let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(|e| AppError::InvalidInput(e.body_text()))?;
            return Ok(Self(fields));
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| AppError::InvalidInput(e.body_text()))?;
        let mut fields = HashMap::new();
        while let Some(field) = multipart.next_field().await.map_err(|e| AppError::InvalidInput(e.to_string()))? {
            let Some(name) = field.name().map(str::to_string) else { continue };
            let value = field.text().await.map_err(|e| AppError::InvalidInput(e.to_string()))?;
            fields.insert(name, value);
        }
        Ok(Self(fields))
    }
}

impl FormFields {
    fn optional(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(|v| v.trim()).filter(|v| !v.is_empty())
    }

    fn required(&self, name: &str) -> Result<String, AppError> {
        self.optional(name)
            .map(String::from)
            .ok_or_else(|| AppError::InvalidInput(format!("missing required field `{name}`")))
    }
}

/// Color options of a generate call: mode, requested count and manual colors.
fn parse_color_options(form: &FormFields) -> Result<(ColorMode, Option<usize>, Option<ColorSpec>), AppError> {
    let smart = match form.optional("use_smart_colors") {
        Some(raw) => parse_bool(raw)
            .ok_or_else(|| AppError::InvalidInput(format!("use_smart_colors must be a boolean, got {raw:?}")))?,
        None => false,
    };

    let count = form
        .optional("number_of_colors")
        .map(|raw| {
            raw.parse::<usize>()
                .ok()
                .filter(|n| (1..=MAX_COLORS).contains(n))
                .ok_or_else(|| AppError::InvalidInput(format!("number_of_colors must be 1-{MAX_COLORS}, got {raw:?}")))
        })
        .transpose()?;

    if smart {
        return Ok((ColorMode::Smart, count, None));
    }

    let mut colors: Vec<String> = form
        .optional("colors")
        .map(|raw| raw.split(',').map(str::trim).filter(|c| !c.is_empty()).map(String::from).collect())
        .unwrap_or_default();
    if colors.len() > MAX_COLORS {
        return Err(AppError::InvalidInput(format!("at most {MAX_COLORS} colors allowed, got {}", colors.len())));
    }
    if let Some(n) = count {
        colors.truncate(n);
    }
    match ColorSpec::new(colors) {
        Some(spec) => Ok((ColorMode::Manual, Some(spec.count()), Some(spec))),
        None => Ok((ColorMode::Random, count, None)),
    }
}

pub async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": "AD-AI API is running" }))
}

pub async fn upload_image(State(state): State<AppState>, mut multipart: Multipart) -> Result<Json<UploadResponse>, AppError> {
    while let Some(field) = multipart.next_field().await.map_err(|e| AppError::InvalidInput(e.to_string()))? {
        if field.name() != Some("file") && field.file_name().is_none() {
            continue;
        }
        let content_type = field.content_type().unwrap_or_default().to_string();
        if !content_type.starts_with("image/") {
            return Err(AppError::InvalidInput("File must be an image".into()));
        }
        let original = field.file_name().unwrap_or("upload").to_string();
        let data = field.bytes().await.map_err(|e| AppError::InvalidInput(e.to_string()))?;
        if data.is_empty() {
            return Err(AppError::InvalidInput("Uploaded file is empty".into()));
        }

        let mut asset = state.assets.save_upload(&original, &data).await?;
        let key = format!("{INPUTS_PREFIX}{}", asset.filename);
        let storage_url = state.storage.put(&key, data, &content_type).await;
        if storage_url.is_some() {
            asset.object_key = Some(key);
        }
        info!(file_id = %asset.file_id, ext = %asset.extension, remote = ?asset.object_key, "📤 Upload stored");

        return Ok(Json(UploadResponse {
            success: true,
            file_id: asset.file_id,
            filename: asset.filename,
            filepath: asset.local_path.display().to_string(),
            storage_url,
            uploaded_at: asset.uploaded_at,
            message: "Image uploaded successfully".into(),
        }));
    }
    Err(AppError::InvalidInput("missing required file field `file`".into()))
}

pub async fn recommend_colors(State(state): State<AppState>, form: FormFields) -> Result<Json<RecommendResponse>, AppError> {
    let product_name = form.required("product_name")?;
    let file_id = form.required("file_id")?;
    let span = info_span!("recommend", file_id = %file_id);
    async move {
        let image_path = state.assets.find_upload(&file_id).await?;
        info!("Getting color recommendations for {}", product_name);
        let rec = state.advisor.recommend(&product_name, &image_path).await?;
        Ok(Json(RecommendResponse {
            success: true,
            message: format!("AI recommends these colors for {product_name}"),
            product_name,
            fallback: rec.is_fallback(),
            recommended_colors: rec.into_colors(),
        }))
    }
    .instrument(span)
    .await
}

pub async fn generate_ad(State(state): State<AppState>, form: FormFields) -> Result<Json<GenerateResponse>, AppError> {
    let product_name = form.required("product_name")?;
    let brand_name = form.required("brand_name")?;
    let file_id = form.required("file_id")?;
    let (mode, number_of_colors, manual_colors) = parse_color_options(&form)?;

    let span = info_span!("generate", file_id = %file_id);
    async move {
        let image_path = state.assets.find_upload(&file_id).await?;
        info!("Generating ad for {} by {} ({:?} colors)", product_name, brand_name, mode);

        let request = GenerationRequest {
            product_name: product_name.clone(),
            brand_name: brand_name.clone(),
            file_id: file_id.clone(),
            image_path,
            mode,
            number_of_colors,
            manual_colors,
        };
        let generator = state.generator.clone();
        let work = async move { generator.generate(request).await }.in_current_span();
        let result = state.jobs.run(&file_id, work, state.generation_timeout).await.into_result()?;

        info!("📦 Returning {} ({} bytes)", result.output_filename, result.image.len());
        Ok(Json(GenerateResponse {
            success: true,
            product_name,
            brand_name,
            output_file: result.output_path.display().to_string(),
            download_url: format!("/download/{}", result.output_filename),
            colors_used: result.colors.colors().to_vec(),
            number_of_colors: result.colors.count(),
            color_source: result.color_source,
            storage_url: result.storage_url,
            storage_object: result.storage_object,
            message: "Advertisement generated successfully".into(),
        }))
    }
    .instrument(span)
    .await
}

pub async fn download_file(Path(filename): Path<String>, State(state): State<AppState>) -> Result<Response, AppError> {
    let path = state.assets.output_path(&filename)?;
    if let Ok(bytes) = tokio::fs::read(&path).await {
        let mime = image::guess_format(&bytes).unwrap_or(ImageFormat::Jpeg).to_mime_type();
        let headers = [
            (header::CONTENT_TYPE, mime.to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
        ];
        return Ok((headers, bytes).into_response());
    }

    let key = format!("{OUTPUTS_PREFIX}{filename}");
    if state.storage.list(&key).await.iter().any(|k| k == &key) {
        if let Some(url) = state.storage.presigned_url(&key).await {
            info!("↪️ {} not on disk, redirecting to object storage", filename);
            return Ok(Redirect::temporary(&url).into_response());
        }
    }
    Err(AppError::AssetNotFound("File not found".into()))
}

pub async fn cleanup_files(Path(file_id): Path<String>, State(state): State<AppState>) -> Json<CleanupResponse> {
    if validate_file_id(&file_id).is_err() {
        warn!("Cleanup requested for malformed id {:?}; nothing to do", file_id);
        return Json(CleanupResponse {
            success: true,
            removed_local: 0,
            removed_remote: 0,
            message: format!("Cleaned up files for {file_id}"),
        });
    }

    let removed_local = state.assets.cleanup(&file_id).await;
    let mut removed_remote = 0;
    for key in state.storage.list(&format!("{INPUTS_PREFIX}{file_id}")).await {
        let stem = FsPath::new(&key).file_stem().and_then(|s| s.to_str());
        if stem == Some(file_id.as_str()) && state.storage.delete(&key).await {
            removed_remote += 1;
        }
    }

    Json(CleanupResponse {
        success: true,
        removed_local,
        removed_remote,
        message: format!("Cleaned up files for {file_id}"),
    })
}

pub async fn cancel_generation(Path(file_id): Path<String>, State(state): State<AppState>) -> Json<CancelResponse> {
    let cancelled = state.jobs.cancel(&file_id);
    let message = if cancelled {
        format!("Generation for {file_id} cancelled")
    } else {
        format!("No active generation found for {file_id}")
    };
    Json(CancelResponse { success: true, cancelled, message })
}

pub async fn list_images(Path(image_type): Path<String>, State(state): State<AppState>) -> Result<Json<ListImagesResponse>, AppError> {
    let prefix = match image_type.as_str() {
        "inputs" => INPUTS_PREFIX,
        "outputs" => OUTPUTS_PREFIX,
        other => return Err(AppError::InvalidInput(format!("image_type must be `inputs` or `outputs`, got {other:?}"))),
    };
    let images = state.storage.list(prefix).await;
    Ok(Json(ListImagesResponse { success: true, image_type, images }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        colors::tests::ScriptedVision,
        generator::tests::{fixture, FakeEditor, Fixture, PNG_MAGIC},
        openai::{ImageEditor, UpstreamError},
        storage::memory::MemoryBlobStore,
    };
    use axum::{body::Body, http::{Request as HttpRequest, StatusCode}};
    use pretty_assertions::assert_eq;
    use tower::ServiceExt;

    const BOUNDARY: &str = "adcraft-test-boundary";

    struct StallingEditor;

    #[async_trait]
    impl ImageEditor for StallingEditor {
        async fn edit(&self, _image: &[u8], _prompt: &str) -> Result<Vec<u8>, UpstreamError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(PNG_MAGIC.to_vec())
        }
    }

    struct Harness {
        fx: Fixture,
        jobs: Arc<JobRegistry>,
        app: Router,
    }

    async fn harness_with(vision: Arc<ScriptedVision>, editor: Arc<dyn ImageEditor>, store: MemoryBlobStore) -> Harness {
        let fx = fixture(vision, editor, store).await;
        let jobs = Arc::new(JobRegistry::new());
        let state = AppState {
            assets: fx.assets.clone(),
            advisor: fx.advisor.clone(),
            generator: fx.generator.clone(),
            storage: fx.storage.clone(),
            jobs: jobs.clone(),
            generation_timeout: None,
        };
        Harness { app: router(state, 1024 * 1024), fx, jobs }
    }

    async fn harness() -> Harness {
        harness_with(
            ScriptedVision::answering("navy, gold, ivory"),
            FakeEditor::returning(PNG_MAGIC),
            MemoryBlobStore::default(),
        )
        .await
    }

    fn multipart_upload(filename: &str, content_type: &str, data: &[u8]) -> HttpRequest<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        HttpRequest::post("/upload-image")
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap()
    }

    fn multipart_fields(uri: &str, fields: &[(&str, &str)]) -> HttpRequest<Body> {
        let mut body = String::new();
        for (name, value) in fields {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            ));
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));
        HttpRequest::post(uri)
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap()
    }

    fn urlencoded(uri: &str, body: &str) -> HttpRequest<Body> {
        HttpRequest::post(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty(method: &str, uri: &str) -> HttpRequest<Body> {
        HttpRequest::builder().method(method).uri(uri).body(Body::empty()).unwrap()
    }

    async fn send(app: &Router, req: HttpRequest<Body>) -> (StatusCode, serde_json::Value) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    async fn upload(h: &Harness) -> String {
        let (status, body) = send(&h.app, multipart_upload("bottle.png", "image/png", PNG_MAGIC)).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["file_id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health_endpoint() {
        let h = harness().await;
        let (status, body) = send(&h.app, empty("GET", "/")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "AD-AI API is running");
    }

    #[tokio::test]
    async fn upload_stores_locally_and_mirrors_to_inputs() {
        let h = harness().await;
        let (status, body) = send(&h.app, multipart_upload("bottle.png", "image/png", PNG_MAGIC)).await;
        assert_eq!(status, StatusCode::OK);
        let file_id = body["file_id"].as_str().unwrap();
        assert_eq!(body["filename"], format!("{file_id}.png"));
        assert!(body["storage_url"].as_str().unwrap().contains("inputs/"));
        assert!(h.fx.store.object("ad-images", &format!("inputs/{file_id}.png")).is_some());
    }

    #[tokio::test]
    async fn upload_rejects_non_images() {
        let h = harness().await;
        let (status, body) = send(&h.app, multipart_upload("notes.txt", "text/plain", b"hello")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_input");
    }

    #[tokio::test]
    async fn recommend_returns_three_colors() {
        let h = harness().await;
        let file_id = upload(&h).await;
        let req = multipart_fields("/recommend-colors", &[("product_name", "perfume"), ("file_id", &file_id)]);
        let (status, body) = send(&h.app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["recommended_colors"], json!(["navy", "gold", "ivory"]));
        assert_eq!(body["fallback"], false);
    }

    #[tokio::test]
    async fn recommend_for_unknown_upload_is_404() {
        let h = harness().await;
        let id = uuid::Uuid::new_v4().to_string();
        let (status, _) = send(&h.app, urlencoded("/recommend-colors", &format!("product_name=mug&file_id={id}"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn missing_field_is_invalid_input() {
        let h = harness().await;
        let (status, body) = send(&h.app, urlencoded("/generate-ad", "product_name=mug")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().unwrap().contains("brand_name"));
    }

    #[tokio::test]
    async fn generate_with_manual_colors() {
        let h = harness().await;
        let file_id = upload(&h).await;
        let body = format!("product_name=perfume&brand_name=Acme&file_id={file_id}&use_smart_colors=false&number_of_colors=2&colors=teal%2C%20amber");
        let (status, json) = send(&h.app, urlencoded("/generate-ad", &body)).await;
        assert_eq!(status, StatusCode::OK, "{json}");
        assert_eq!(json["colors_used"], json!(["teal", "amber"]));
        assert_eq!(json["number_of_colors"], 2);
        assert_eq!(json["color_source"], "manual");
        assert!(json["download_url"].as_str().unwrap().starts_with("/download/perfume_Acme_"));
        assert!(json["storage_object"].as_str().unwrap().starts_with("outputs/"));
        assert_eq!(h.jobs.len(), 0);
    }

    #[tokio::test]
    async fn generate_with_storage_down_still_succeeds() {
        let h = harness_with(
            ScriptedVision::answering("x"),
            FakeEditor::returning(PNG_MAGIC),
            MemoryBlobStore::default(),
        )
        .await;
        let file_id = upload(&h).await;
        h.fx.store.set_offline(true);

        let body = format!("product_name=mug&brand_name=Acme&file_id={file_id}&use_smart_colors=true");
        let (status, json) = send(&h.app, urlencoded("/generate-ad", &body)).await;
        assert_eq!(status, StatusCode::OK, "{json}");
        assert!(json.get("storage_url").is_none());
        assert!(json.get("storage_object").is_none());
        assert_eq!(json["number_of_colors"], 3);
    }

    #[tokio::test]
    async fn generate_rejects_bad_color_options() {
        let h = harness().await;
        let file_id = upload(&h).await;
        for extra in ["number_of_colors=5", "colors=a,b,c,d", "use_smart_colors=perhaps"] {
            let body = format!("product_name=mug&brand_name=Acme&file_id={file_id}&{extra}");
            let (status, _) = send(&h.app, urlencoded("/generate-ad", &body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{extra}");
        }
    }

    #[tokio::test]
    async fn editor_failure_is_bad_gateway_and_releases_job() {
        let h = harness_with(ScriptedVision::answering("x"), FakeEditor::failing(), MemoryBlobStore::default()).await;
        let file_id = upload(&h).await;
        let body = format!("product_name=mug&brand_name=Acme&file_id={file_id}");
        let (status, json) = send(&h.app, urlencoded("/generate-ad", &body)).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(json["error"], "upstream_error");
        assert_eq!(h.jobs.len(), 0);
    }

    #[tokio::test]
    async fn cancel_in_flight_generation() {
        let h = harness_with(ScriptedVision::answering("x"), Arc::new(StallingEditor), MemoryBlobStore::default()).await;
        let file_id = upload(&h).await;

        let app = h.app.clone();
        let body = format!("product_name=mug&brand_name=Acme&file_id={file_id}");
        let pending = tokio::spawn(async move { send(&app, urlencoded("/generate-ad", &body)).await });

        for _ in 0..200 {
            if h.jobs.contains(&file_id) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(h.jobs.contains(&file_id));

        let (status, json) = send(&h.app, empty("POST", &format!("/cancel-generation/{file_id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["cancelled"], true);
        assert!(!h.jobs.contains(&file_id));

        let (status, json) = pending.await.unwrap();
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["error"], "cancelled");
        assert_eq!(h.jobs.len(), 0);
    }

    #[tokio::test]
    async fn client_disconnect_releases_job_slot() {
        let h = harness_with(ScriptedVision::answering("x"), Arc::new(StallingEditor), MemoryBlobStore::default()).await;
        let file_id = upload(&h).await;

        let app = h.app.clone();
        let body = format!("product_name=mug&brand_name=Acme&file_id={file_id}");
        let pending = tokio::spawn(async move { send(&app, urlencoded("/generate-ad", &body)).await });
        for _ in 0..200 {
            if h.jobs.contains(&file_id) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(h.jobs.contains(&file_id));

        pending.abort();
        let _ = pending.await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(h.jobs.len(), 0);
        assert!(!h.jobs.contains(&file_id));
    }

    #[tokio::test]
    async fn cancel_without_job_reports_nothing_to_cancel() {
        let h = harness().await;
        let (status, json) = send(&h.app, empty("POST", "/cancel-generation/unknown")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["cancelled"], false);
    }

    #[tokio::test]
    async fn download_serves_generated_file() {
        let h = harness().await;
        let file_id = upload(&h).await;
        let body = format!("product_name=mug&brand_name=Acme&file_id={file_id}");
        let (_, json) = send(&h.app, urlencoded("/generate-ad", &body)).await;
        let url = json["download_url"].as_str().unwrap().to_string();

        let resp = h.app.clone().oneshot(empty("GET", &url)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "image/png");
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(bytes.as_ref(), PNG_MAGIC);
    }

    #[tokio::test]
    async fn download_falls_back_to_storage_redirect() {
        let h = harness().await;
        let file_id = upload(&h).await;
        let body = format!("product_name=mug&brand_name=Acme&file_id={file_id}");
        let (_, json) = send(&h.app, urlencoded("/generate-ad", &body)).await;
        let filename = json["download_url"].as_str().unwrap().trim_start_matches("/download/").to_string();
        std::fs::remove_file(h.fx.dir.path().join("outputs").join(&filename)).unwrap();

        let resp = h.app.clone().oneshot(empty("GET", &format!("/download/{filename}"))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
        assert!(resp.headers()[header::LOCATION].to_str().unwrap().contains(&filename));
    }

    #[tokio::test]
    async fn download_missing_or_traversal() {
        let h = harness().await;
        let (status, _) = send(&h.app, empty("GET", "/download/nothing.png")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&h.app, empty("GET", "/download/..%2Fsecret")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn cleanup_removes_local_and_remote_inputs() {
        let h = harness().await;
        let file_id = upload(&h).await;
        let (status, json) = send(&h.app, empty("DELETE", &format!("/cleanup/{file_id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["removed_local"], 1);
        assert_eq!(json["removed_remote"], 1);

        let (status, json) = send(&h.app, empty("DELETE", "/cleanup/not-a-uuid")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
    }

    #[tokio::test]
    async fn list_images_by_type() {
        let h = harness().await;
        let file_id = upload(&h).await;
        let (status, json) = send(&h.app, empty("GET", "/list-images/inputs")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["images"], json!([format!("inputs/{file_id}.png")]));

        let (status, json) = send(&h.app, empty("GET", "/list-images/outputs")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["images"], json!([]));

        let (status, _) = send(&h.app, empty("GET", "/list-images/secrets")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
