use anyhow::{Context, Result, bail};
use clap::Parser;
use std::{env, str::FromStr, time::Duration};

use crate::services::{
    media_gate::{DEFAULT_JPEG_QUALITY, DEFAULT_MAX_UPLOAD_BYTES},
    readiness::{DEFAULT_MAX_READY, DEFAULT_NOT_READY},
    storage_service::S3Settings,
};

/// Region that needs an explicit S3 endpoint.
const YANDEX_REGION: &str = "ru-central1";
const YANDEX_ENDPOINT: &str = "https://storage.yandexcloud.net";
const DEFAULT_REGION: &str = "us-east-1";

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bucket: String,
    pub listen_public: String,
    /// Metrics listener; must not be reachable from the internet.
    pub listen_private: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub max_upload_bytes: usize,
    pub jpeg_quality: u8,
    pub max_ready: Duration,
    pub not_ready: Duration,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Photo gallery backed by an S3 bucket")]
pub struct Args {
    /// Bucket holding the photos (overrides PHOTO_GATE_BUCKET)
    #[arg(long)]
    pub bucket: Option<String>,

    /// Public listen address (overrides PHOTO_GATE_LISTEN_PUBLIC)
    #[arg(long)]
    pub listen_public: Option<String>,

    /// Metrics listen address (overrides PHOTO_GATE_LISTEN_PRIVATE)
    #[arg(long)]
    pub listen_private: Option<String>,

    /// Bucket region (overrides AWS_REGION)
    #[arg(long)]
    pub region: Option<String>,

    /// S3-compatible endpoint URL (overrides PHOTO_GATE_S3_ENDPOINT)
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Largest accepted upload in bytes (overrides PHOTO_GATE_MAX_UPLOAD_BYTES)
    #[arg(long)]
    pub max_upload_bytes: Option<usize>,

    /// Quality of stored JPEGs, 1-100 (overrides PHOTO_GATE_JPEG_QUALITY)
    #[arg(long)]
    pub jpeg_quality: Option<u8>,

    /// Upper bound of a READY period in seconds (overrides PHOTO_GATE_MAX_READY_SECS)
    #[arg(long)]
    pub max_ready_secs: Option<u64>,

    /// Length of a NOT_READY period in seconds (overrides PHOTO_GATE_NOT_READY_SECS)
    #[arg(long)]
    pub not_ready_secs: Option<u64>,
}

impl AppConfig {
    /// Parse CLI args and the process environment into an AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        Self::resolve(Args::parse(), |key| env::var(key).ok())
    }

    /// Merge `args` over `lookup`ed environment values over defaults.
    /// Fails when no bucket is configured or a numeric value does not parse.
    pub fn resolve(args: Args, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env_str = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bucket = match args.bucket.or_else(|| env_str("PHOTO_GATE_BUCKET")) {
            Some(bucket) if !bucket.trim().is_empty() => bucket,
            _ => bail!("you must supply a bucket name (--bucket or PHOTO_GATE_BUCKET)"),
        };

        let region = args
            .region
            .or_else(|| env_str("AWS_REGION"))
            .or_else(|| env_str("AWS_DEFAULT_REGION"))
            .unwrap_or_else(|| DEFAULT_REGION.into());

        let endpoint = args
            .endpoint
            .or_else(|| env_str("PHOTO_GATE_S3_ENDPOINT"))
            .or_else(|| (region == YANDEX_REGION).then(|| YANDEX_ENDPOINT.to_string()));

        let max_upload_bytes = match args.max_upload_bytes {
            Some(v) => v,
            None => parse_env(&env_str, "PHOTO_GATE_MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
        };
        let jpeg_quality = match args.jpeg_quality {
            Some(v) => v,
            None => parse_env(&env_str, "PHOTO_GATE_JPEG_QUALITY", DEFAULT_JPEG_QUALITY)?,
        };
        if !(1..=100).contains(&jpeg_quality) {
            bail!("jpeg quality must be between 1 and 100, got {}", jpeg_quality);
        }
        let max_ready_secs = match args.max_ready_secs {
            Some(v) => v,
            None => parse_env(&env_str, "PHOTO_GATE_MAX_READY_SECS", DEFAULT_MAX_READY.as_secs())?,
        };
        let not_ready_secs = match args.not_ready_secs {
            Some(v) => v,
            None => parse_env(&env_str, "PHOTO_GATE_NOT_READY_SECS", DEFAULT_NOT_READY.as_secs())?,
        };

        Ok(Self {
            bucket,
            listen_public: args
                .listen_public
                .or_else(|| env_str("PHOTO_GATE_LISTEN_PUBLIC"))
                .unwrap_or_else(|| "0.0.0.0:8080".into()),
            listen_private: args
                .listen_private
                .or_else(|| env_str("PHOTO_GATE_LISTEN_PRIVATE"))
                .unwrap_or_else(|| "0.0.0.0:9090".into()),
            region,
            endpoint,
            max_upload_bytes,
            jpeg_quality,
            max_ready: Duration::from_secs(max_ready_secs),
            not_ready: Duration::from_secs(not_ready_secs),
        })
    }

    pub fn s3_settings(&self) -> S3Settings {
        S3Settings {
            bucket: self.bucket.clone(),
            region: self.region.clone(),
            endpoint: self.endpoint.clone(),
        }
    }
}

fn parse_env<T>(env_str: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env_str(key) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", key, value)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn resolve(args: &[&str], vars: &[(&str, &str)]) -> Result<AppConfig> {
        let mut argv = vec!["photo-gate"];
        argv.extend_from_slice(args);
        let args = Args::try_parse_from(argv).unwrap();
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::resolve(args, |key| vars.get(key).cloned())
    }

    #[test]
    fn missing_bucket_is_fatal() {
        let err = resolve(&[], &[]).unwrap_err();
        assert!(err.to_string().contains("bucket"));
        assert!(resolve(&[], &[("PHOTO_GATE_BUCKET", "  ")]).is_err());
    }

    #[test]
    fn defaults_apply() {
        let cfg = resolve(&[], &[("PHOTO_GATE_BUCKET", "photos")]).unwrap();
        assert_eq!(cfg.bucket, "photos");
        assert_eq!(cfg.listen_public, "0.0.0.0:8080");
        assert_eq!(cfg.listen_private, "0.0.0.0:9090");
        assert_eq!(cfg.region, "us-east-1");
        assert_eq!(cfg.endpoint, None);
        assert_eq!(cfg.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert_eq!(cfg.jpeg_quality, DEFAULT_JPEG_QUALITY);
        assert_eq!(cfg.max_ready, Duration::from_secs(60));
        assert_eq!(cfg.not_ready, Duration::from_secs(10));
    }

    #[test]
    fn args_override_env() {
        let cfg = resolve(
            &["--bucket", "cli", "--listen-public", "127.0.0.1:1", "--not-ready-secs", "3"],
            &[
                ("PHOTO_GATE_BUCKET", "env"),
                ("PHOTO_GATE_LISTEN_PUBLIC", "127.0.0.1:2"),
                ("PHOTO_GATE_LISTEN_PRIVATE", "127.0.0.1:3"),
                ("PHOTO_GATE_NOT_READY_SECS", "4"),
            ],
        )
        .unwrap();
        assert_eq!(cfg.bucket, "cli");
        assert_eq!(cfg.listen_public, "127.0.0.1:1");
        assert_eq!(cfg.listen_private, "127.0.0.1:3");
        assert_eq!(cfg.not_ready, Duration::from_secs(3));
    }

    #[test]
    fn yandex_region_gets_its_endpoint() {
        let cfg = resolve(&["--bucket", "b"], &[("AWS_REGION", "ru-central1")]).unwrap();
        assert_eq!(cfg.endpoint.as_deref(), Some("https://storage.yandexcloud.net"));

        let cfg = resolve(
            &["--bucket", "b", "--endpoint", "http://localhost:9000"],
            &[("AWS_REGION", "ru-central1")],
        )
        .unwrap();
        assert_eq!(cfg.endpoint.as_deref(), Some("http://localhost:9000"));
        assert_eq!(cfg.s3_settings().endpoint.as_deref(), Some("http://localhost:9000"));
    }

    #[test]
    fn bad_numbers_are_reported() {
        let err = resolve(
            &["--bucket", "b"],
            &[("PHOTO_GATE_MAX_UPLOAD_BYTES", "lots")],
        )
        .unwrap_err();
        assert!(err.to_string().contains("PHOTO_GATE_MAX_UPLOAD_BYTES"));

        assert!(resolve(&["--bucket", "b", "--jpeg-quality", "0"], &[]).is_err());
    }
}
