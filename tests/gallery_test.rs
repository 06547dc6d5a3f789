//! End-to-end gallery tests against an in-memory bucket.
//!
//! Run with: `cargo test --test gallery_test`

use axum_test::{
    TestServer,
    multipart::{MultipartForm, Part},
};
use image::{ImageFormat, Rgba, RgbaImage};
use object_store::{ObjectStore, PutPayload, memory::InMemory, path::Path};
use photo_gate::{
    metrics::Metrics,
    routes::routes::{private_routes, public_routes},
    services::{
        media_gate::MediaGate,
        naming::SequenceNames,
        readiness::ReadinessSignal,
        storage_service::StorageService,
    },
    state::AppState,
};
use std::{io::Cursor, sync::Arc};
use tokio_util::sync::CancellationToken;

fn test_state() -> AppState {
    state_with_store(Arc::new(InMemory::new()))
}

fn state_with_store(store: Arc<InMemory>) -> AppState {
    AppState::new(
        MediaGate::default(),
        StorageService::new(
            store,
            "gallery-test",
            Arc::new(SequenceNames::new("photo")),
        ),
        ReadinessSignal::default(),
        Metrics::new().unwrap(),
        CancellationToken::new(),
    )
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x * 25) as u8, (y * 25) as u8, 200, 255])
    });
    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .unwrap();
    buffer
}

fn photo_form(data: Vec<u8>, file_name: &str, mime: &str) -> MultipartForm {
    let part = Part::bytes(bytes::Bytes::from(data))
        .file_name(file_name)
        .mime_type(mime);
    MultipartForm::new().add_part("photo", part)
}

async fn stored_names(state: &AppState) -> Vec<String> {
    state
        .storage
        .list(&CancellationToken::new())
        .await
        .unwrap()
        .into_iter()
        .map(|name| name.to_string())
        .collect()
}

#[tokio::test]
async fn test_upload_list_and_fetch_png() {
    let state = test_state();
    let server = TestServer::new(public_routes(state.clone())).unwrap();

    let upload = server
        .post("/")
        .multipart(photo_form(png(10, 10), "cat.png", "image/png"))
        .await;
    assert_eq!(upload.status_code().as_u16(), 200);
    let page = upload.text();
    assert!(page.contains("File photo-000001.jpg uploaded"), "{page}");

    let listing = server.get("/").await;
    assert_eq!(listing.status_code().as_u16(), 200);
    assert!(listing.text().contains("photo-000001.jpg"));

    let fetched = server
        .get("/show")
        .add_query_param("name", "photo-000001.jpg")
        .await;
    assert_eq!(fetched.status_code().as_u16(), 200);
    assert_eq!(
        fetched.header("content-type").to_str().unwrap(),
        "image/jpeg"
    );
    let decoded = image::load_from_memory(fetched.as_bytes()).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (10, 10));
}

#[tokio::test]
async fn test_text_upload_is_rejected_without_storing() {
    let state = test_state();
    let server = TestServer::new(public_routes(state.clone())).unwrap();

    server
        .post("/")
        .multipart(photo_form(png(4, 4), "first.png", "image/png"))
        .await;
    let before = stored_names(&state).await;

    let upload = server
        .post("/")
        .multipart(photo_form(
            b"remember to buy milk\n".to_vec(),
            "notes.txt",
            "text/plain",
        ))
        .await;
    assert_eq!(upload.status_code().as_u16(), 200);
    let page = upload.text();
    assert!(page.contains("invalid image"), "{page}");
    assert!(!page.contains("uploaded"));
    // The listing still renders next to the upload error.
    assert!(page.contains("photo-000001.jpg"));

    assert_eq!(stored_names(&state).await, before);
}

#[tokio::test]
async fn test_form_without_photo_field_reports_error() {
    let state = test_state();
    let server = TestServer::new(public_routes(state.clone())).unwrap();

    let form = MultipartForm::new().add_text("caption", "no file here");
    let upload = server.post("/").multipart(form).await;
    assert_eq!(upload.status_code().as_u16(), 200);
    assert!(upload.text().contains("no `photo` file in upload form"));
    assert!(stored_names(&state).await.is_empty());
}

#[tokio::test]
async fn test_fetch_unknown_name_is_server_error() {
    let server = TestServer::new(public_routes(test_state())).unwrap();

    let missing = server
        .get("/show")
        .add_query_param("name", "never-uploaded.jpg")
        .await;
    assert_eq!(missing.status_code().as_u16(), 500);
    assert_eq!(missing.text(), "object `never-uploaded.jpg` not found");

    let unnamed = server.get("/show").await;
    assert_eq!(unnamed.status_code().as_u16(), 500);
    assert!(unnamed.text().contains("invalid object name"));
}

#[tokio::test]
async fn test_listed_keys_from_other_writers_can_be_fetched() {
    let store = Arc::new(InMemory::new());
    let key = "2024-10-16 12:00:00.123 +0000 UTC.jpg";
    let jpeg = image::DynamicImage::ImageRgba8(RgbaImage::new(3, 2)).to_rgb8();
    let mut data = Vec::new();
    jpeg.write_to(&mut Cursor::new(&mut data), ImageFormat::Jpeg)
        .unwrap();
    store
        .put(&Path::from(key), PutPayload::from(data.clone()))
        .await
        .unwrap();
    let server = TestServer::new(public_routes(state_with_store(store))).unwrap();

    let listing = server.get("/").await;
    let encoded = urlencoding::encode(key).into_owned();
    assert!(listing.text().contains(&encoded), "{}", listing.text());

    let fetched = server.get("/show").add_query_param("name", key).await;
    assert_eq!(fetched.status_code().as_u16(), 200, "{}", fetched.text());
    assert_eq!(
        fetched.header("content-type").to_str().unwrap(),
        "image/jpeg"
    );
    assert_eq!(fetched.as_bytes().as_ref(), data.as_slice());
}

#[tokio::test]
async fn test_ping_follows_readiness() {
    let state = test_state();
    let server = TestServer::new(public_routes(state.clone())).unwrap();

    assert_eq!(server.get("/ping").await.status_code().as_u16(), 200);

    state.readiness.set(false);
    assert_eq!(server.get("/ping").await.status_code().as_u16(), 418);

    state.readiness.set(true);
    assert_eq!(server.get("/ping").await.status_code().as_u16(), 200);
}

#[tokio::test]
async fn test_metrics_count_responses_and_readiness() {
    let state = test_state();
    let public = TestServer::new(public_routes(state.clone())).unwrap();
    let private = TestServer::new(private_routes(state.clone())).unwrap();

    public.get("/").await;
    public.get("/show").add_query_param("name", "nope.jpg").await;
    public.get("/ping").await;
    state.readiness.set(false);

    let scrape = private.get("/metrics").await;
    assert_eq!(scrape.status_code().as_u16(), 200);
    let text = scrape.text();

    let counted: Vec<&str> = text
        .lines()
        .filter(|l| l.starts_with("http_response_count{"))
        .collect();
    assert_eq!(counted.len(), 2, "{text}");
    assert!(counted.iter().any(|l| l.contains(r#"handler="/""#) && l.contains(r#"code="200""#)));
    assert!(counted.iter().any(|l| l.contains(r#"handler="/show""#) && l.contains(r#"code="500""#)));
    assert!(text.contains("service_ready 0"));
}

#[tokio::test]
async fn test_metrics_are_not_on_public_listener() {
    let server = TestServer::new(public_routes(test_state())).unwrap();
    assert_eq!(server.get("/metrics").await.status_code().as_u16(), 404);
}
