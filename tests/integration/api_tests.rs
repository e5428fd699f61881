//! API integration tests for the service surface.
//!
//! Tests verify:
//! - Banner and health endpoints
//! - `/remove-bg` output, headers and on-disk artifacts
//! - Alpha in transparent uploads survives removal
//! - CORS behavior and method routing

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use image::{ColorType, Rgba, RgbaImage};

use super::test_utils::{
    assert_download_name, attachment_name, body_bytes, body_text, decode_png, encode, files_in,
    png, subject_image, FailingRemover, MultipartBody, TestApp, SUBJECT,
};

// =============================================================================
// Banner & Health
// =============================================================================

#[tokio::test]
async fn test_index_banner() {
    let app = TestApp::new().await;

    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let text = body_text(response).await;
    assert!(text.contains("/remove-bg"));
    assert!(text.contains("/custom-bg"));
    assert!(text.contains("/blur-bg"));
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = TestApp::new().await;

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

// =============================================================================
// Background Removal
// =============================================================================

#[tokio::test]
async fn test_remove_bg_success() {
    let app = TestApp::new().await;
    let source = subject_image(64, 48);

    let request = MultipartBody::new()
        .file("file", "photo.png", &png(&source))
        .into_request("/remove-bg");
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/png"
    );
    let download = attachment_name(&response);
    assert_download_name(&download, "no_bg");

    let out = decode_png(&body_bytes(response).await);
    assert_eq!(out.dimensions(), (64, 48));
    assert_eq!(out.get_pixel(0, 0)[3], 0);
    assert_eq!(out.get_pixel(63, 47)[3], 0);
    assert_eq!(out.get_pixel(32, 24), &SUBJECT);
}

#[tokio::test]
async fn test_remove_bg_preserves_transparency() {
    let app = TestApp::new().await;
    let subject = Rgba([200, 30, 30, 128]);
    let source = RgbaImage::from_fn(24, 24, |x, y| {
        if (8..16).contains(&x) && (8..16).contains(&y) {
            subject
        } else {
            Rgba([0, 0, 0, 0])
        }
    });

    let request = MultipartBody::new()
        .file("file", "cutout.png", &png(&source))
        .into_request("/remove-bg");
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_bytes(response).await;
    let decoded = image::load_from_memory(&body).unwrap();
    assert_eq!(decoded.color(), ColorType::Rgba8);

    let out = decoded.to_rgba8();
    assert_eq!(out.dimensions(), (24, 24));
    assert_eq!(out.get_pixel(0, 0)[3], 0);
    assert_eq!(out.get_pixel(23, 23)[3], 0);
    assert_eq!(out.get_pixel(12, 12), &subject);
}

#[tokio::test]
async fn test_remove_bg_persists_upload_and_output() {
    let app = TestApp::new().await;

    let request = MultipartBody::new()
        .file("file", "My Holiday Photo.png", &png(&subject_image(16, 16)))
        .into_request("/remove-bg");
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let download = attachment_name(&response);
    let timestamp = &download[..14];

    let uploads = files_in(&app.upload_dir());
    assert_eq!(uploads.len(), 1);
    assert!(uploads[0].starts_with(timestamp));
    assert!(uploads[0].ends_with("_My_Holiday_Photo.png"));

    let outputs = files_in(&app.output_dir());
    assert_eq!(outputs.len(), 1);
    assert!(outputs[0].starts_with(timestamp));
    assert!(outputs[0].ends_with("_no_bg.png"));

    // The served body is the stored artifact
    let stored = std::fs::read(app.output_dir().join(&outputs[0])).unwrap();
    assert_eq!(body_bytes(response).await.as_ref(), stored.as_slice());
}

#[tokio::test]
async fn test_remove_bg_accepts_jpeg_and_webp() {
    let app = TestApp::new().await;
    let source = subject_image(40, 40);

    for (filename, format) in [
        ("photo.jpg", image::ImageFormat::Jpeg),
        ("photo.webp", image::ImageFormat::WebP),
    ] {
        let request = MultipartBody::new()
            .file("file", filename, &encode(&source, format))
            .into_request("/remove-bg");
        let response = app.send(request).await;

        assert_eq!(response.status(), StatusCode::OK, "{filename}");
        let out = decode_png(&body_bytes(response).await);
        assert_eq!(out.dimensions(), (40, 40), "{filename}");
        assert_eq!(out.get_pixel(0, 0)[3], 0, "{filename}");
        assert!(out.get_pixel(20, 20)[3] > 0, "{filename}");
    }
}

#[tokio::test]
async fn test_identical_requests_produce_distinct_artifacts() {
    let app = TestApp::new().await;
    let data = png(&subject_image(16, 16));

    for _ in 0..2 {
        let request = MultipartBody::new()
            .file("file", "same.png", &data)
            .into_request("/remove-bg");
        assert_eq!(app.send(request).await.status(), StatusCode::OK);
    }

    assert_eq!(files_in(&app.upload_dir()).len(), 2);
    assert_eq!(files_in(&app.output_dir()).len(), 2);
}

#[tokio::test]
async fn test_processing_failure_is_internal_error() {
    let app = TestApp::with_remover(Arc::new(FailingRemover)).await;

    let request = MultipartBody::new()
        .file("file", "photo.png", &png(&subject_image(16, 16)))
        .into_request("/remove-bg");
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_text(response).await,
        "Internal Server Error: Inference failed: segmentation backend unavailable"
    );
    assert!(files_in(&app.output_dir()).is_empty());
}

#[tokio::test]
async fn test_undecodable_upload_is_internal_error() {
    let app = TestApp::new().await;

    let request = MultipartBody::new()
        .file("file", "photo.png", b"definitely not a png")
        .into_request("/remove-bg");
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_text(response)
        .await
        .starts_with("Internal Server Error: "));
}

// =============================================================================
// Headers & Routing
// =============================================================================

#[tokio::test]
async fn test_content_disposition_is_exposed() {
    let app = TestApp::new().await;

    let mut request = MultipartBody::new()
        .file("file", "photo.png", &png(&subject_image(16, 16)))
        .into_request("/remove-bg");
    request
        .headers_mut()
        .insert(header::ORIGIN, "https://app.example.com".parse().unwrap());
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "*"
    );
    let exposed = response
        .headers()
        .get_all(header::ACCESS_CONTROL_EXPOSE_HEADERS)
        .iter()
        .any(|v| {
            v.to_str()
                .unwrap()
                .to_ascii_lowercase()
                .contains("content-disposition")
        });
    assert!(exposed);
}

#[tokio::test]
async fn test_cors_preflight() {
    let app = TestApp::new().await;

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/custom-bg")
        .header(header::ORIGIN, "https://app.example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let methods = response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_METHODS)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(methods.contains("POST"));
}

#[tokio::test]
async fn test_get_on_image_endpoint_not_allowed() {
    let app = TestApp::new().await;

    let request = Request::builder()
        .uri("/remove-bg")
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_unknown_route() {
    let app = TestApp::new().await;

    let request = Request::builder()
        .uri("/static/output/anything.png")
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
