//! End-to-end tests for the `/match` endpoint.
//!
//! The CLIP session is replaced with a stub provider that maps solid-color
//! images to fixed unit vectors, so scores are exact and no model file is
//! needed. Candidate images are served from a local HTTP server.

use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use base64::Engine;
use image::{DynamicImage, Rgb, RgbImage};
use ndarray::Array2;
use serde_json::{json, Value};

use snapmatch::config::Config;
use snapmatch::server::build_router;
use snapmatch::state::{AppState, ImageEncoder};
use snapmatch_vision::Embedding;

const RED: [u8; 3] = [255, 0, 0];
const GREEN: [u8; 3] = [0, 255, 0];
const BLUE: [u8; 3] = [0, 0, 255];
const YELLOW: [u8; 3] = [255, 255, 0];

/// Unit vector in the x/y plane whose dot product with [1, 0, 0] is `x`
fn unit(x: f32) -> Vec<f32> {
    vec![x, (1.0 - x * x).sqrt(), 0.0]
}

/// Stub provider: the top-left pixel color selects a fixed unit vector.
///
/// Scores against a red upload: green 0.60, blue 0.82, yellow exactly 0.75.
struct ColorEncoder;

impl ImageEncoder for ColorEncoder {
    fn encode(&self, img: &DynamicImage) -> anyhow::Result<Embedding> {
        let Rgb([r, g, b]) = *img.to_rgb8().get_pixel(0, 0);
        let vector = match [r, g, b] {
            RED => unit(1.0),
            GREEN => unit(0.60),
            BLUE => unit(0.82),
            YELLOW => unit(0.75),
            _ => vec![0.0, 0.0, 1.0],
        };
        Ok(Embedding {
            vector: Array2::from_shape_vec((1, 3), vector)?,
        })
    }
}

fn png_bytes(color: [u8; 3]) -> Vec<u8> {
    let img = RgbImage::from_pixel(8, 8, Rgb(color));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, image::ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

fn base64_png(color: [u8; 3]) -> String {
    base64::engine::general_purpose::STANDARD.encode(png_bytes(color))
}

async fn spawn(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// Image server with one route per color; anything else is a 404
async fn spawn_image_server() -> SocketAddr {
    let router = Router::new()
        .route("/green.png", get(|| async { png_bytes(GREEN) }))
        .route("/blue.png", get(|| async { png_bytes(BLUE) }))
        .route("/yellow.png", get(|| async { png_bytes(YELLOW) }));
    spawn(router).await
}

async fn spawn_app() -> SocketAddr {
    let state = AppState::with_encoder(Config::default(), Arc::new(ColorEncoder));
    spawn(build_router(Arc::new(state))).await
}

async fn post_match(app: SocketAddr, body: &Value) -> (reqwest::StatusCode, Value) {
    let response = reqwest::Client::new()
        .post(format!("http://{app}/match"))
        .json(body)
        .send()
        .await
        .unwrap();
    let status = response.status();
    let body = response.json().await.unwrap();
    (status, body)
}

#[tokio::test]
async fn picks_best_scoring_candidate() {
    let images = spawn_image_server().await;
    let app = spawn_app().await;

    let (status, body) = post_match(
        app,
        &json!({
            "image": base64_png(RED),
            "items": [
                { "_id": "A", "imageUrl": format!("http://{images}/green.png") },
                { "_id": "B", "imageUrl": format!("http://{images}/blue.png") },
            ],
        }),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["matchId"], "B");
    assert!((body["confidence"].as_f64().unwrap() - 0.82).abs() < 1e-6);
}

#[tokio::test]
async fn all_below_threshold_reports_null() {
    let images = spawn_image_server().await;
    let app = spawn_app().await;

    let (status, body) = post_match(
        app,
        &json!({
            "image": base64_png(RED),
            "items": [
                { "_id": "A", "imageUrl": format!("http://{images}/green.png") },
            ],
        }),
    )
    .await;

    assert_eq!(status, 200);
    // The confidence key is omitted entirely in the null case
    assert_eq!(body, json!({ "matchId": null }));
}

#[tokio::test]
async fn empty_items_reports_null() {
    let app = spawn_app().await;

    let (status, body) = post_match(
        app,
        &json!({ "image": base64_png(RED), "items": [] }),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body, json!({ "matchId": null }));
}

#[tokio::test]
async fn candidates_without_urls_are_skipped_without_fetching() {
    // No image server is running: any fetch attempt would fail the request
    let app = spawn_app().await;

    let (status, body) = post_match(
        app,
        &json!({
            "image": base64_png(RED),
            "items": [
                { "_id": "A", "imageUrl": "" },
                { "_id": "B" },
            ],
        }),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body, json!({ "matchId": null }));
}

#[tokio::test]
async fn fetch_failure_aborts_the_whole_request() {
    let images = spawn_image_server().await;
    let app = spawn_app().await;

    // The first candidate would clear the threshold, but the scan is
    // fail-fast: the 404 on the second aborts everything.
    let (status, body) = post_match(
        app,
        &json!({
            "image": base64_png(RED),
            "items": [
                { "_id": "A", "imageUrl": format!("http://{images}/blue.png") },
                { "_id": "B", "imageUrl": format!("http://{images}/missing.png") },
            ],
        }),
    )
    .await;

    assert_eq!(status, 500);
    assert_eq!(body["error"]["code"], "FETCH_ERROR");
}

#[tokio::test]
async fn score_exactly_at_threshold_is_a_match() {
    let images = spawn_image_server().await;
    let app = spawn_app().await;

    let (status, body) = post_match(
        app,
        &json!({
            "image": base64_png(RED),
            "items": [
                { "_id": "edge", "imageUrl": format!("http://{images}/yellow.png") },
            ],
        }),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["matchId"], "edge");
    assert!((body["confidence"].as_f64().unwrap() - 0.75).abs() < 1e-6);
}

#[tokio::test]
async fn data_url_prefixed_upload_is_accepted() {
    let images = spawn_image_server().await;
    let app = spawn_app().await;

    let (status, body) = post_match(
        app,
        &json!({
            "image": format!("data:image/png;base64,{}", base64_png(RED)),
            "items": [
                { "_id": "A", "imageUrl": format!("http://{images}/blue.png") },
            ],
        }),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["matchId"], "A");
}

#[tokio::test]
async fn undecodable_upload_is_a_server_error() {
    let app = spawn_app().await;

    let (status, body) = post_match(
        app,
        &json!({ "image": "!!not-base64!!", "items": [] }),
    )
    .await;

    assert_eq!(status, 500);
    assert_eq!(body["error"]["code"], "DECODE_ERROR");
}
