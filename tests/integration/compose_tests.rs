//! Compositing tests for `/custom-bg` and `/blur-bg`.

use axum::http::StatusCode;
use image::{ImageFormat, Rgba};

use super::test_utils::{
    assert_download_name, attachment_name, body_bytes, close_to, decode_png, encode, files_in,
    png, solid_image, subject_image, MultipartBody, TestApp, BACKDROP, SUBJECT,
};

const SKY: Rgba<u8> = Rgba([40, 90, 230, 255]);

// =============================================================================
// Custom Background
// =============================================================================

#[tokio::test]
async fn test_custom_bg_output_matches_foreground_size() {
    let app = TestApp::new().await;

    let request = MultipartBody::new()
        .file("file", "portrait.png", &png(&subject_image(500, 500)))
        .file("background", "beach.png", &png(&solid_image(1920, 1080, SKY)))
        .into_request("/custom-bg");
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_download_name(&attachment_name(&response), "custom_bg");

    let out = decode_png(&body_bytes(response).await);
    assert_eq!(out.dimensions(), (500, 500));
    assert_eq!(out.get_pixel(0, 0), &SKY);
    assert_eq!(out.get_pixel(499, 499), &SKY);
    assert_eq!(out.get_pixel(250, 250), &SUBJECT);
}

#[tokio::test]
async fn test_custom_bg_mixed_formats() {
    let app = TestApp::new().await;

    let request = MultipartBody::new()
        .file(
            "file",
            "portrait.webp",
            &encode(&subject_image(60, 40), ImageFormat::WebP),
        )
        .file(
            "background",
            "wall.JPEG",
            &encode(&solid_image(30, 30, SKY), ImageFormat::Jpeg),
        )
        .into_request("/custom-bg");
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let out = decode_png(&body_bytes(response).await);
    assert_eq!(out.dimensions(), (60, 40));
    assert!(close_to(out.get_pixel(0, 0), &SKY, 8));
    assert_eq!(out.get_pixel(30, 20), &SUBJECT);

    // Both uploads are kept
    assert_eq!(files_in(&app.upload_dir()).len(), 2);
}

#[tokio::test]
async fn test_custom_bg_first_part_wins() {
    let app = TestApp::new().await;

    let request = MultipartBody::new()
        .file("file", "fg.png", &png(&subject_image(20, 20)))
        .file("background", "first.png", &png(&solid_image(20, 20, SKY)))
        .file(
            "background",
            "second.png",
            &png(&solid_image(20, 20, Rgba([255, 255, 0, 255]))),
        )
        .into_request("/custom-bg");
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let out = decode_png(&body_bytes(response).await);
    assert_eq!(out.get_pixel(0, 0), &SKY);
}

// =============================================================================
// Blurred Background
// =============================================================================

#[tokio::test]
async fn test_blur_bg_keeps_subject_and_dimensions() {
    let app = TestApp::new().await;
    let source = subject_image(80, 60);

    let request = MultipartBody::new()
        .file("file", "street.png", &png(&source))
        .into_request("/blur-bg");
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_download_name(&attachment_name(&response), "blur_bg");

    let out = decode_png(&body_bytes(response).await);
    assert_eq!(out.dimensions(), (80, 60));
    assert_eq!(out.get_pixel(40, 30), &SUBJECT);

    // A flat backdrop stays (nearly) the same color under blur
    let corner = out.get_pixel(0, 0);
    assert!(corner[3] >= 250);
    assert!(close_to(corner, &BACKDROP, 40));
}

#[tokio::test]
async fn test_blur_bg_output_is_stored() {
    let app = TestApp::new().await;

    let request = MultipartBody::new()
        .file("file", "street.jpg", &encode(&subject_image(32, 32), ImageFormat::Jpeg))
        .into_request("/blur-bg");
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let outputs = files_in(&app.output_dir());
    assert_eq!(outputs.len(), 1);
    assert!(outputs[0].ends_with("_blur_bg.png"));
}
