//! Upload validation tests.
//!
//! Every rejected request must answer 400 (or 413) with the documented plain
//! text body and leave both working directories untouched.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};

use super::test_utils::{
    body_text, files_in, png, subject_image, test_router_config, MultipartBody, TestApp,
};

async fn assert_rejected(app: &TestApp, request: Request<Body>, expected: &str) {
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, expected);

    assert!(files_in(&app.upload_dir()).is_empty());
    assert!(files_in(&app.output_dir()).is_empty());
}

// =============================================================================
// Single-file Endpoints
// =============================================================================

#[tokio::test]
async fn test_missing_file_part() {
    let app = TestApp::new().await;

    for uri in ["/remove-bg", "/blur-bg"] {
        let request = MultipartBody::new()
            .text("note", "no image here")
            .into_request(uri);
        assert_rejected(&app, request, "No file uploaded").await;
    }
}

#[tokio::test]
async fn test_file_field_without_filename_is_missing() {
    let app = TestApp::new().await;

    let request = MultipartBody::new()
        .text("file", "just text")
        .into_request("/remove-bg");
    assert_rejected(&app, request, "No file uploaded").await;
}

#[tokio::test]
async fn test_wrong_field_name_is_missing() {
    let app = TestApp::new().await;

    let request = MultipartBody::new()
        .file("image", "photo.png", &png(&subject_image(8, 8)))
        .into_request("/blur-bg");
    assert_rejected(&app, request, "No file uploaded").await;
}

#[tokio::test]
async fn test_non_multipart_body_is_missing_file() {
    let app = TestApp::new().await;

    let request = Request::builder()
        .method("POST")
        .uri("/remove-bg")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"file":"photo.png"}"#))
        .unwrap();
    assert_rejected(&app, request, "No file uploaded").await;
}

#[tokio::test]
async fn test_disallowed_extensions() {
    let app = TestApp::new().await;
    let data = png(&subject_image(8, 8));

    for filename in ["photo.gif", "photo.png.exe", "photo", "archive.tar.gz"] {
        let request = MultipartBody::new()
            .file("file", filename, &data)
            .into_request("/remove-bg");
        assert_rejected(&app, request, "Invalid file type").await;
    }
}

#[tokio::test]
async fn test_empty_filename_is_invalid_type() {
    let app = TestApp::new().await;
    let data = png(&subject_image(8, 8));

    for uri in ["/remove-bg", "/blur-bg"] {
        let request = MultipartBody::new()
            .file("file", "", &data)
            .into_request(uri);
        assert_rejected(&app, request, "Invalid file type").await;
    }
}

#[tokio::test]
async fn test_extension_check_is_case_insensitive() {
    let app = TestApp::new().await;

    let request = MultipartBody::new()
        .file("file", "PHOTO.PNG", &png(&subject_image(8, 8)))
        .into_request("/blur-bg");
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::OK);
}

// =============================================================================
// Pair Endpoint
// =============================================================================

#[tokio::test]
async fn test_custom_bg_requires_both_parts() {
    let app = TestApp::new().await;
    let data = png(&subject_image(8, 8));

    let only_file = MultipartBody::new()
        .file("file", "fg.png", &data)
        .into_request("/custom-bg");
    assert_rejected(
        &app,
        only_file,
        "Both foreground and background images are required.",
    )
    .await;

    let only_background = MultipartBody::new()
        .file("background", "bg.png", &data)
        .into_request("/custom-bg");
    assert_rejected(
        &app,
        only_background,
        "Both foreground and background images are required.",
    )
    .await;
}

#[tokio::test]
async fn test_custom_bg_empty_filename() {
    let app = TestApp::new().await;
    let data = png(&subject_image(8, 8));

    let empty_file = MultipartBody::new()
        .file("file", "", &data)
        .file("background", "bg.png", &data)
        .into_request("/custom-bg");
    assert_rejected(&app, empty_file, "Please select both images.").await;

    let empty_background = MultipartBody::new()
        .file("file", "fg.png", &data)
        .file("background", "", &data)
        .into_request("/custom-bg");
    assert_rejected(&app, empty_background, "Please select both images.").await;
}

#[tokio::test]
async fn test_custom_bg_rejects_disallowed_type() {
    let app = TestApp::new().await;
    let data = png(&subject_image(8, 8));

    let request = MultipartBody::new()
        .file("file", "fg.png", &data)
        .file("background", "bg.bmp", &data)
        .into_request("/custom-bg");
    assert_rejected(
        &app,
        request,
        "Invalid file type. Allowed types: png, jpg, jpeg, webp.",
    )
    .await;
}

// =============================================================================
// Body Limit
// =============================================================================

#[tokio::test]
async fn test_oversized_body_rejected() {
    let app = TestApp::with_config(test_router_config().with_max_body_bytes(1024)).await;

    let request = MultipartBody::new()
        .file("file", "big.png", &vec![0u8; 4096])
        .into_request("/remove-bg");
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(files_in(&app.upload_dir()).is_empty());
    assert!(files_in(&app.output_dir()).is_empty());
}

#[tokio::test]
async fn test_body_under_limit_accepted() {
    let app = TestApp::with_config(test_router_config().with_max_body_bytes(64 * 1024)).await;

    let request = MultipartBody::new()
        .file("file", "small.png", &png(&subject_image(8, 8)))
        .into_request("/remove-bg");
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::OK);
}
