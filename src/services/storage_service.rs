//! src/services/storage_service.rs
//!
//! StorageService — the only reader and writer of the gallery bucket. It
//! wraps a bucket-scoped `ObjectStore` (S3 in production, in-memory in tests)
//! and exposes put/get/list with typed errors. Consistency between concurrent
//! callers is whatever the backend provides; nothing is cached here.

use crate::{
    errors::{MediaError, MediaResult},
    models::object_name::ObjectName,
    services::naming::NameGenerator,
};
use anyhow::Context as _;
use bytes::Bytes;
use futures::{Stream, StreamExt, pin_mut, stream::BoxStream};
use object_store::{
    Attribute, Attributes, ObjectStore, PutOptions, PutPayload, aws::AmazonS3Builder, path::Path,
};
use std::{future::Future, io, sync::Arc, time::Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Body of a fetched object. Dropping it releases the backend connection.
pub type ObjectStream = BoxStream<'static, MediaResult<Bytes>>;

/// An opened object: its recorded content type, if any, and its body.
pub struct StoredObject {
    pub content_type: Option<String>,
    pub body: ObjectStream,
}

/// Where and how to reach the S3-compatible bucket.
#[derive(Debug, Clone)]
pub struct S3Settings {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
}

#[derive(Clone)]
pub struct StorageService {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    names: Arc<dyn NameGenerator>,
}

impl StorageService {
    /// Wrap an already bucket-scoped store.
    pub fn new(
        store: Arc<dyn ObjectStore>,
        bucket: impl Into<String>,
        names: Arc<dyn NameGenerator>,
    ) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            names,
        }
    }

    /// Build an S3 store. Credentials come from the standard AWS environment
    /// variables; `endpoint` targets S3-compatible providers.
    pub fn s3(settings: &S3Settings, names: Arc<dyn NameGenerator>) -> anyhow::Result<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_region(settings.region.clone())
            .with_bucket_name(settings.bucket.clone());

        if let Some(endpoint) = &settings.endpoint {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .with_context(|| format!("building S3 client for bucket `{}`", settings.bucket))?;

        Ok(Self::new(Arc::new(store), settings.bucket.clone(), names))
    }

    /// Derive the name for the next upload. Call once per attempt, before `put`.
    pub fn next_name(&self) -> ObjectName {
        self.names.generate()
    }

    /// Store the full contents of `body` under `name`, replacing any object
    /// already stored there. `content_type` is recorded with the object.
    pub async fn put<S>(
        &self,
        name: &ObjectName,
        content_type: &str,
        body: S,
        cancel: &CancellationToken,
    ) -> MediaResult<()>
    where
        S: Stream<Item = io::Result<Bytes>> + Send,
    {
        let start = Instant::now();
        let location = location(name);
        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.to_string().into());
        let opts = PutOptions {
            attributes,
            ..Default::default()
        };

        let upload = async {
            let mut data = Vec::new();
            pin_mut!(body);
            while let Some(chunk_res) = body.next().await {
                let chunk = chunk_res.map_err(|err| {
                    MediaError::StorageUnavailable(format!("failed to read object body: {err}"))
                })?;
                data.extend_from_slice(&chunk);
            }

            let size_bytes = data.len();
            self.store
                .put_opts(&location, PutPayload::from(Bytes::from(data)), opts)
                .await
                .map_err(|err| self.classify("put", name, err))?;
            Ok(size_bytes)
        };

        let size_bytes = cancellable(cancel, upload).await?;
        info!(
            bucket = %self.bucket,
            key = %name,
            size_bytes,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "object stored"
        );
        Ok(())
    }

    /// Open `name` for reading.
    pub async fn get(
        &self,
        name: &ObjectName,
        cancel: &CancellationToken,
    ) -> MediaResult<StoredObject> {
        let start = Instant::now();
        let location = location(name);

        let result = cancellable(cancel, async {
            self.store
                .get(&location)
                .await
                .map_err(|err| self.classify("get", name, err))
        })
        .await?;

        info!(
            bucket = %self.bucket,
            key = %name,
            size_bytes = result.meta.size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "object opened"
        );

        let content_type = result
            .attributes
            .get(&Attribute::ContentType)
            .map(|value| value.to_string());
        let bucket = self.bucket.clone();
        let key = name.clone();
        let body = result.into_stream().map(move |chunk| {
            chunk.map_err(|err| {
                error!(bucket = %bucket, key = %key, error = %err, "object read failed");
                MediaError::StorageUnavailable(err.to_string())
            })
        });
        Ok(StoredObject {
            content_type,
            body: body.boxed(),
        })
    }

    /// Every object name in the bucket, in the order the backend reports
    /// them. Backend pagination is exhausted before returning.
    pub async fn list(&self, cancel: &CancellationToken) -> MediaResult<Vec<ObjectName>> {
        let start = Instant::now();

        let listing = async {
            let mut names = Vec::new();
            let mut entries = self.store.list(None);
            while let Some(entry) = entries.next().await {
                let meta = entry.map_err(|err| self.classify_list(err))?;
                names.push(ObjectName::from_trusted(meta.location.to_string()));
            }
            Ok(names)
        };

        let names = cancellable(cancel, listing).await?;
        info!(
            bucket = %self.bucket,
            count = names.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "objects listed"
        );
        Ok(names)
    }

    fn classify(&self, op: &'static str, name: &ObjectName, err: object_store::Error) -> MediaError {
        match err {
            object_store::Error::NotFound { .. } => MediaError::NotFound(name.clone()),
            other => {
                error!(bucket = %self.bucket, key = %name, op, error = %other, "storage backend failed");
                MediaError::StorageUnavailable(other.to_string())
            }
        }
    }

    fn classify_list(&self, err: object_store::Error) -> MediaError {
        error!(bucket = %self.bucket, op = "list", error = %err, "storage backend failed");
        MediaError::StorageUnavailable(err.to_string())
    }
}

/// Backend path for `name`. Listed keys are used verbatim so a listing
/// always round-trips; keys `Path::parse` refuses are percent-encoded.
fn location(name: &ObjectName) -> Path {
    Path::parse(name.as_str()).unwrap_or_else(|_| Path::from(name.as_str()))
}

/// Race `fut` against `cancel`; cancellation wins ties.
async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> MediaResult<T>
where
    F: Future<Output = MediaResult<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(MediaError::Cancelled),
        res = fut => res,
    }
}
