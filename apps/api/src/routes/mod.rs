pub mod health;
pub mod uploads;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};

use crate::editor::handlers as editor;
use crate::export::handlers as export;
use crate::gallery::handlers as gallery;
use crate::session::handlers as session;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/", get(session::handle_index))
        // Document and fields
        .route(
            "/api/v1/document",
            get(editor::handle_get_document).put(editor::handle_put_document),
        )
        .route("/api/v1/fields/:field", patch(editor::handle_set_field))
        .route("/api/v1/experience", post(editor::handle_add_experience))
        .route(
            "/api/v1/experience/:id",
            patch(editor::handle_update_experience).delete(editor::handle_remove_experience),
        )
        .route("/api/v1/education", post(editor::handle_add_education))
        .route(
            "/api/v1/education/:id",
            patch(editor::handle_update_education).delete(editor::handle_remove_education),
        )
        .route(
            "/api/v1/photo",
            post(editor::handle_upload_photo)
                .delete(editor::handle_delete_photo)
                .layer(DefaultBodyLimit::max(uploads::MAX_UPLOAD_BODY_BYTES)),
        )
        .route("/api/v1/photo/open", post(editor::handle_open_photo))
        // Gallery
        .route(
            "/api/v1/certificates",
            get(gallery::handle_get_certificates)
                .post(gallery::handle_upload_certificates)
                .layer(DefaultBodyLimit::max(uploads::MAX_UPLOAD_BODY_BYTES)),
        )
        .route("/api/v1/certificates/next", post(gallery::handle_next_page))
        .route("/api/v1/certificates/prev", post(gallery::handle_previous_page))
        .route(
            "/api/v1/certificates/:id",
            axum::routing::delete(gallery::handle_remove_certificate),
        )
        .route(
            "/api/v1/certificates/:id/open",
            post(gallery::handle_open_certificate),
        )
        // Modal
        .route("/api/v1/modal", get(session::handle_get_modal))
        .route("/api/v1/modal/input", post(session::handle_modal_input))
        // Session
        .route("/api/v1/keys", post(session::handle_key))
        .route("/api/v1/save", post(session::handle_save))
        .route("/api/v1/data", axum::routing::delete(session::handle_clear))
        .route("/api/v1/stats", get(session::handle_stats))
        .route("/api/v1/notices", get(session::handle_notices))
        // Export
        .route("/api/v1/export", post(export::handle_export))
        .layer(DefaultBodyLimit::max(uploads::MAX_BODY_BYTES))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use image::Rgb;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::editor::Page;
    use crate::export::raster::{CaptureRegion, Raster, RasterError, RasterOptions, Rasterizer};
    use crate::export::{ExportSettings, Exporter, LopdfAssembler};
    use crate::session::notices::Notices;
    use crate::session::{Session, SessionSettings};
    use crate::store::{MemoryStore, PersistenceStore, DEFAULT_STORAGE_KEY};

    struct BlankRasterizer;

    #[async_trait]
    impl Rasterizer for BlankRasterizer {
        async fn rasterize(
            &self,
            _region: &CaptureRegion,
            _options: &RasterOptions,
        ) -> Result<Raster, RasterError> {
            Ok(Raster::filled(420, 1782, Rgb([255, 255, 255])))
        }
    }

    fn app_with(rasterizer: Option<Arc<dyn Rasterizer>>) -> Router {
        let store = Arc::new(PersistenceStore::new(
            Arc::new(MemoryStore::new()),
            DEFAULT_STORAGE_KEY,
            Duration::from_millis(1000),
        ));
        let exporter = Exporter::new(
            rasterizer,
            Some(Arc::new(LopdfAssembler)),
            ExportSettings {
                settle_delay: Duration::ZERO,
                region_width_px: Some(794),
            },
        );
        let session = Session::new(
            Page::new().shared(),
            store,
            exporter,
            Notices::new(),
            SessionSettings::default(),
        );
        let config = Config::from_lookup(|key| (key == "STORE_BACKEND").then(|| "memory".to_string()))
            .unwrap();
        build_router(AppState {
            session: Arc::new(session),
            config,
        })
    }

    fn app() -> Router {
        app_with(None)
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> Response {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();
        app.clone().oneshot(request).await.unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn multipart(files: &[(&str, &str, &[u8])]) -> (String, Vec<u8>) {
        let boundary = "edufolio-test-boundary";
        let mut body = Vec::new();
        for (name, mime, data) in files {
            body.extend_from_slice(
                format!(
                    "--{boundary}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{name}\"\r\nContent-Type: {mime}\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
        (format!("multipart/form-data; boundary={boundary}"), body)
    }

    async fn upload(app: &Router, uri: &str, files: &[(&str, &str, &[u8])]) -> Response {
        let (content_type, body) = multipart(files);
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap();
        app.clone().oneshot(request).await.unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = send(&app(), "GET", "/health", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["store"], "memory");
    }

    #[tokio::test]
    async fn test_index_renders_region() {
        let app = app();
        send(&app, "PATCH", "/api/v1/fields/fullName", Some(json!({"text": "Ada"}))).await;
        let response = send(&app, "GET", "/", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("id=\"cvContainer\""));
        assert!(html.contains(">Ada</div>"));
    }

    #[tokio::test]
    async fn test_field_edit_shows_in_document() {
        let app = app();
        let response = send(
            &app,
            "PATCH",
            "/api/v1/fields/profession",
            Some(json!({"text": "  Engineer "})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let doc = json_body(send(&app, "GET", "/api/v1/document", None).await).await;
        assert_eq!(doc["profession"], "Engineer");
    }

    #[tokio::test]
    async fn test_unknown_field_is_404() {
        let response = send(&app(), "PATCH", "/api/v1/fields/photo", Some(json!({"text": "x"}))).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_experience_lifecycle() {
        let app = app();
        let created = send(&app, "POST", "/api/v1/experience", None).await;
        assert_eq!(created.status(), StatusCode::CREATED);
        let id = json_body(created).await["id"].as_str().unwrap().to_string();

        let response = send(
            &app,
            "PATCH",
            &format!("/api/v1/experience/{id}"),
            Some(json!({"field": "jobTitle", "text": "Analyst"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let doc = json_body(send(&app, "GET", "/api/v1/document", None).await).await;
        assert_eq!(doc["experience"][0]["jobTitle"], "Analyst");
        assert_eq!(doc["experience"][0]["jobDescription"], "<li>New responsibility</li>");

        let response = send(&app, "DELETE", &format!("/api/v1/experience/{id}"), None).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let response = send(&app, "DELETE", &format!("/api/v1/experience/{id}"), None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_put_document_applies() {
        let app = app();
        let response = send(
            &app,
            "PUT",
            "/api/v1/document",
            Some(json!({
                "fullName": "Grace Hopper",
                "education": [{"degreeTitle": "PhD", "educationPeriod": "1934", "institutionName": "Yale"}]
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let doc = json_body(response).await;
        assert_eq!(doc["fullName"], "Grace Hopper");
        assert_eq!(doc["education"][0]["institutionName"], "Yale");

        let stats = json_body(send(&app, "GET", "/api/v1/stats", None).await).await;
        assert_eq!(stats["educationItems"], 1);
        assert_eq!(stats["hasProfilePhoto"], false);
    }

    #[tokio::test]
    async fn test_certificate_upload_and_delete() {
        let app = app();
        let response = upload(
            &app,
            "/api/v1/certificates",
            &[("a.png", "image/png", &b"png"[..]), ("notes.txt", "text/plain", &b"hi"[..])],
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let outcome = json_body(response).await;
        assert_eq!(outcome["added"].as_array().unwrap().len(), 1);
        assert_eq!(outcome["rejected"].as_array().unwrap().len(), 1);
        let id = outcome["added"][0].as_str().unwrap().to_string();

        let view = json_body(send(&app, "GET", "/api/v1/certificates", None).await).await;
        assert_eq!(view["state"], "has_items");
        assert_eq!(view["counter"], "1 of 1 (1 certificates)");

        let response = send(&app, "DELETE", &format!("/api/v1/certificates/{id}"), None).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(json_body(response).await["error"]["code"], "CONFIRMATION_REQUIRED");

        let response = send(
            &app,
            "DELETE",
            &format!("/api/v1/certificates/{id}?confirm=true"),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let notices = json_body(send(&app, "GET", "/api/v1/notices", None).await).await;
        assert!(notices[0]["message"].as_str().unwrap().contains("notes.txt"));
    }

    #[tokio::test]
    async fn test_oversized_certificate_does_not_block_batch() {
        let app = app();
        let huge = vec![0u8; 33 * 1024 * 1024];
        let response = upload(
            &app,
            "/api/v1/certificates",
            &[("a.png", "image/png", &b"png"[..]), ("huge.png", "image/png", huge.as_slice())],
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let outcome = json_body(response).await;
        assert_eq!(outcome["added"].as_array().unwrap().len(), 1);
        let rejected = outcome["rejected"][0].as_str().unwrap();
        assert!(rejected.contains("huge.png"));
        assert!(rejected.contains("Maximum 5MB"));

        let view = json_body(send(&app, "GET", "/api/v1/certificates", None).await).await;
        assert_eq!(view["state"], "has_items");
        assert_eq!(view["items"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_certificate_opens_modal_and_escape_closes() {
        let app = app();
        let outcome =
            json_body(upload(&app, "/api/v1/certificates", &[("a.png", "image/png", &b"png"[..])]).await)
                .await;
        let id = outcome["added"][0].as_str().unwrap().to_string();

        let modal = json_body(
            send(&app, "POST", &format!("/api/v1/certificates/{id}/open"), None).await,
        )
        .await;
        assert_eq!(modal["status"], "open");

        let response = send(&app, "POST", "/api/v1/keys", Some(json!({"key": "Escape"}))).await;
        let body = json_body(response).await;
        assert_eq!(body["action"], "modal_closed");
        assert_eq!(body["closed"], true);

        let modal = json_body(send(&app, "GET", "/api/v1/modal", None).await).await;
        assert_eq!(modal["state"]["status"], "closed");
        assert_eq!(modal["scroll_locked"], false);
    }

    #[tokio::test]
    async fn test_photo_too_large_is_rejected() {
        let app = app();
        let big = vec![0u8; 2 * 1024 * 1024 + 1];
        let response = upload(&app, "/api/v1/photo", &[("me.png", "image/png", big.as_slice())]).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(&app, "POST", "/api/v1/photo/open", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_export_without_rasterizer() {
        let response = send(&app(), "POST", "/api/v1/export", None).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json_body(response).await["error"]["code"], "DEPENDENCY_MISSING");
    }

    #[tokio::test]
    async fn test_export_downloads_pdf() {
        let app = app_with(Some(Arc::new(BlankRasterizer)));
        send(&app, "PATCH", "/api/v1/fields/fullName", Some(json!({"text": "Ada Lovelace"}))).await;

        let response = send(&app, "POST", "/api/v1/export", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(response.headers()["x-page-count"], "3");
        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.starts_with("attachment; filename=\"Ada_Lovelace_"));

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn test_clear_requires_confirmation() {
        let app = app();
        let response = send(&app, "DELETE", "/api/v1/data", None).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = send(&app, "DELETE", "/api/v1/data?confirm=true", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["cleared"], true);
    }

    #[tokio::test]
    async fn test_save_now() {
        let body = json_body(send(&app(), "POST", "/api/v1/save", None).await).await;
        assert_eq!(body["saved"], true);
    }
}
