//! In-flight image values passed between the media gate and storage.

use bytes::Bytes;
use futures::{Stream, stream};
use image::{DynamicImage, ImageFormat};
use std::io;

/// An upload that decoded successfully.
///
/// Only `MediaGate::ensure_is_image` constructs this, so holding one proves
/// the bytes were validated.
#[derive(Debug)]
pub struct DecodedImage {
    pub(crate) image: DynamicImage,
    pub(crate) format: ImageFormat,
}

impl DecodedImage {
    /// Format the decoder recognised from the magic bytes.
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }
}

/// Enhanced image bytes ready for storage.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub bytes: Bytes,
    pub content_type: &'static str,
}

impl EncodedImage {
    /// Single-chunk stream, the shape `StorageService::put` consumes.
    pub fn into_stream(self) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static {
        stream::once(async move { Ok(self.bytes) })
    }
}
