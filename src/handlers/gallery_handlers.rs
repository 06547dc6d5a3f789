//! HTTP handlers for the public gallery.
//! Uploads go through the media gate before anything touches the bucket;
//! fetched objects are streamed back without buffering.

use crate::{
    errors::{AppError, MediaError, MediaResult},
    handlers::page::GalleryPage,
    models::object_name::ObjectName,
    services::media_gate::OUTPUT_CONTENT_TYPE,
    state::AppState,
};
use axum::{
    body::Body,
    extract::{Multipart, Query, State, multipart::MultipartRejection},
    http::{HeaderValue, StatusCode, header},
    response::{Html, Response},
};
use futures::StreamExt;
use serde::Deserialize;
use std::io;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Multipart field carrying the uploaded file.
pub const UPLOAD_FIELD: &str = "photo";

#[derive(Debug, Deserialize)]
pub struct ShowQuery {
    pub name: Option<String>,
}

/// `GET /` — render the gallery.
pub async fn index(State(state): State<AppState>) -> Html<String> {
    let scope = state.request_scope();
    let mut page = GalleryPage::default();
    list_photos(&state, &mut page, scope.token()).await;
    Html(page.render())
}

/// `POST /` — accept an upload, then render the gallery.
///
/// Upload failures are reported inside the page; the listing still runs.
pub async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Html<String> {
    let scope = state.request_scope();
    let mut page = GalleryPage::default();

    match store_upload(&state, multipart, scope.token()).await {
        Ok(name) => page.upload_status = Some(format!("File {name} uploaded")),
        Err(err) => {
            log_upload_failure(&err);
            page.upload_error = Some(err.to_string());
        }
    }

    list_photos(&state, &mut page, scope.token()).await;
    Html(page.render())
}

/// `GET /show?name=` — stream a stored object back.
///
/// Any failure, including an unknown name, is a 500 with the error text.
/// Objects stored without a content type are served as JPEG.
pub async fn show(
    State(state): State<AppState>,
    Query(q): Query<ShowQuery>,
) -> Result<Response, AppError> {
    let raw = q.name.unwrap_or_default();
    let name = ObjectName::parse(&raw).map_err(|err| AppError::internal(err.to_string()))?;

    let scope = state.request_scope();
    let object = state.storage.get(&name, scope.token()).await?;

    let content_type = object
        .content_type
        .as_deref()
        .and_then(|value| HeaderValue::from_str(value).ok())
        .unwrap_or_else(|| HeaderValue::from_static(OUTPUT_CONTENT_TYPE));

    let mut response = Response::new(Body::from_stream(object.body));
    *response.status_mut() = StatusCode::OK;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, content_type);
    Ok(response)
}

async fn store_upload(
    state: &AppState,
    multipart: Result<Multipart, MultipartRejection>,
    cancel: &CancellationToken,
) -> MediaResult<ObjectName> {
    let mut multipart =
        multipart.map_err(|err| MediaError::InvalidImage(format!("bad upload form: {err}")))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| MediaError::InvalidImage(format!("bad upload form: {err}")))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        debug!(filename = %filename, "upload received");

        let body = field.map(|chunk| chunk.map_err(io::Error::other));
        let decoded = state.gate.ensure_is_image(body).await?;
        let enhanced = state.gate.enhance(decoded).await?;

        let name = state.storage.next_name();
        let content_type = enhanced.content_type;
        state
            .storage
            .put(&name, content_type, enhanced.into_stream(), cancel)
            .await?;
        return Ok(name);
    }

    Err(MediaError::InvalidImage(format!(
        "no `{UPLOAD_FIELD}` file in upload form"
    )))
}

async fn list_photos(state: &AppState, page: &mut GalleryPage, cancel: &CancellationToken) {
    match state.storage.list(cancel).await {
        Ok(photos) => page.photos = photos,
        Err(err) => page.error = Some(err.to_string()),
    }
}

fn log_upload_failure(err: &MediaError) {
    match err {
        MediaError::InvalidImage(_) | MediaError::Cancelled => {
            debug!(error = %err, "upload rejected")
        }
        MediaError::EncodingFailed(_) => error!(error = %err, "upload could not be encoded"),
        MediaError::NotFound(_) | MediaError::StorageUnavailable(_) => {
            error!(error = %err, "upload could not be stored")
        }
    }
}
