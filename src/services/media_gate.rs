//! src/services/media_gate.rs
//!
//! MediaGate turns an uploaded byte stream into a validated image and then
//! into enhanced JPEG bytes. Validation always comes first: `enhance` only
//! accepts a `DecodedImage`, which only `ensure_is_image` can build.

use crate::{
    errors::{MediaError, MediaResult},
    models::media::{DecodedImage, EncodedImage},
};
use bytes::Bytes;
use futures::{Stream, StreamExt, pin_mut};
use image::{DynamicImage, ImageReader, codecs::jpeg::JpegEncoder};
use std::{
    io::{self, Cursor},
    sync::Arc,
    time::Instant,
};
use tracing::debug;

pub const OUTPUT_CONTENT_TYPE: &str = "image/jpeg";
pub const OUTPUT_EXTENSION: &str = "jpg";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Replaceable enhancement policy.
///
/// Implementations must return a new image and leave `image` untouched.
pub trait Enhancer: Send + Sync {
    fn enhance(&self, image: &DynamicImage) -> DynamicImage;
}

/// Contrast boost followed by an unsharp mask.
#[derive(Debug, Clone, Copy)]
pub struct ContrastSharpen {
    /// Percentage passed to `adjust_contrast`; positive values increase contrast.
    pub contrast: f32,
    pub sigma: f32,
    pub threshold: i32,
}

impl Default for ContrastSharpen {
    fn default() -> Self {
        Self {
            contrast: 12.0,
            sigma: 1.0,
            threshold: 2,
        }
    }
}

impl Enhancer for ContrastSharpen {
    fn enhance(&self, image: &DynamicImage) -> DynamicImage {
        image
            .adjust_contrast(self.contrast)
            .unsharpen(self.sigma, self.threshold)
    }
}

/// Passes pixels through unchanged; the output is still re-encoded as JPEG.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Enhancer for Identity {
    fn enhance(&self, image: &DynamicImage) -> DynamicImage {
        image.clone()
    }
}

#[derive(Clone)]
pub struct MediaGate {
    enhancer: Arc<dyn Enhancer>,
    max_upload_bytes: usize,
    jpeg_quality: u8,
}

impl Default for MediaGate {
    fn default() -> Self {
        Self::new(
            Arc::new(ContrastSharpen::default()),
            DEFAULT_MAX_UPLOAD_BYTES,
            DEFAULT_JPEG_QUALITY,
        )
    }
}

impl MediaGate {
    pub fn new(enhancer: Arc<dyn Enhancer>, max_upload_bytes: usize, jpeg_quality: u8) -> Self {
        Self {
            enhancer,
            max_upload_bytes,
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Read the whole stream and decode it.
    ///
    /// The stream is always consumed, up to the point of failure. Read
    /// errors, oversized or empty uploads and unrecognised bytes all map to
    /// `InvalidImage`.
    pub async fn ensure_is_image<S>(&self, stream: S) -> MediaResult<DecodedImage>
    where
        S: Stream<Item = io::Result<Bytes>> + Send,
    {
        let mut data = Vec::new();
        pin_mut!(stream);
        while let Some(chunk_res) = stream.next().await {
            let chunk = chunk_res
                .map_err(|err| MediaError::InvalidImage(format!("failed to read upload: {err}")))?;
            if data.len() + chunk.len() > self.max_upload_bytes {
                return Err(MediaError::InvalidImage(format!(
                    "upload exceeds {} bytes",
                    self.max_upload_bytes
                )));
            }
            data.extend_from_slice(&chunk);
        }

        if data.is_empty() {
            return Err(MediaError::InvalidImage("upload is empty".into()));
        }

        let size_bytes = data.len();
        let decoded = tokio::task::spawn_blocking(move || decode(&data))
            .await
            .map_err(|err| MediaError::InvalidImage(format!("decoder task failed: {err}")))??;

        let (width, height) = decoded.dimensions();
        debug!(
            format = ?decoded.format(),
            width,
            height,
            size_bytes,
            "upload decoded"
        );
        Ok(decoded)
    }

    /// Apply the enhancement policy and encode the result as JPEG.
    pub async fn enhance(&self, decoded: DecodedImage) -> MediaResult<EncodedImage> {
        let enhancer = Arc::clone(&self.enhancer);
        let quality = self.jpeg_quality;
        let start = Instant::now();

        let bytes = tokio::task::spawn_blocking(move || {
            let enhanced = enhancer.enhance(&decoded.image);
            encode_jpeg(&enhanced, quality)
        })
        .await
        .map_err(|err| MediaError::EncodingFailed(format!("encoder task failed: {err}")))??;

        debug!(
            size_bytes = bytes.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "image enhanced"
        );
        Ok(EncodedImage {
            bytes,
            content_type: OUTPUT_CONTENT_TYPE,
        })
    }
}

fn decode(data: &[u8]) -> MediaResult<DecodedImage> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|err| MediaError::InvalidImage(err.to_string()))?;
    let format = reader
        .format()
        .ok_or_else(|| MediaError::InvalidImage("unrecognised image format".into()))?;
    let image = reader
        .decode()
        .map_err(|err| MediaError::InvalidImage(err.to_string()))?;
    Ok(DecodedImage { image, format })
}

/// JPEG has no alpha channel, so every image is flattened to RGB8 first.
fn encode_jpeg(image: &DynamicImage, quality: u8) -> MediaResult<Bytes> {
    let mut buf = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    image
        .to_rgb8()
        .write_with_encoder(encoder)
        .map_err(|err| MediaError::EncodingFailed(format!("JPEG encode failed: {err}")))?;

    let data = buf.into_inner();
    if data.is_empty() {
        return Err(MediaError::EncodingFailed("encoder produced no output".into()));
    }
    Ok(Bytes::from(data))
}
