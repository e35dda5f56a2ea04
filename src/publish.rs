//! Uploads the artifacts of an output directory to S3.

use anyhow::{Context, Result};
use aws_sdk_s3::primitives::ByteStream;
use chrono::{DateTime, Utc};
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::forecast::batch::FORECAST_RESULTS_FILE;
use crate::pipeline::runner::{AGGREGATED_FILE, METRICS_FILE, PASSED_CONNECTIONS_FILE, REPORT_FILE};

pub const MANIFEST_FILE: &str = "manifest.json";

/// Files a run may leave in its output directory.
pub const ARTIFACT_FILES: [&str; 5] = [
    PASSED_CONNECTIONS_FILE,
    AGGREGATED_FILE,
    METRICS_FILE,
    REPORT_FILE,
    FORECAST_RESULTS_FILE,
];

/// One file scheduled for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedUpload {
    pub path: PathBuf,
    pub key: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublishManifest {
    pub generated_at: DateTime<Utc>,
    pub bucket: String,
    pub gzip: bool,
    pub artifacts: Vec<String>,
}

fn object_key(prefix: &str, file_name: &str, gzip: bool) -> String {
    let prefix = prefix.trim_matches('/');
    let name = if gzip {
        format!("{file_name}.gz")
    } else {
        file_name.to_string()
    };
    if prefix.is_empty() {
        name
    } else {
        format!("{prefix}/{name}")
    }
}

/// The artifacts present in `output_dir` and their object keys. Missing
/// artifacts are skipped.
pub fn plan_uploads(output_dir: &Path, prefix: &str, gzip: bool) -> Vec<PlannedUpload> {
    ARTIFACT_FILES
        .iter()
        .filter_map(|name| {
            let path = output_dir.join(name);
            if path.is_file() {
                Some(PlannedUpload {
                    key: object_key(prefix, name, gzip),
                    path,
                })
            } else {
                warn!(artifact = name, "Artifact missing, not uploading");
                None
            }
        })
        .collect()
}

pub fn gzip_bytes(contents: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(contents)?;
    Ok(encoder.finish()?)
}

/// Serializes a value to JSON and uploads it to an S3 bucket with `application/json` content type.
pub async fn write_json_to_s3(
    client: &aws_sdk_s3::Client,
    bucket: &str,
    key: &str,
    value: &impl Serialize,
) -> Result<()> {
    let body = serde_json::to_vec(value)?;

    client
        .put_object()
        .bucket(bucket)
        .key(key)
        .body(body.into())
        .content_type("application/json")
        .send()
        .await?;

    Ok(())
}

/// Uploads every artifact in `output_dir`, then a manifest listing them.
pub async fn publish(
    client: &aws_sdk_s3::Client,
    bucket: &str,
    prefix: &str,
    output_dir: &Path,
    gzip: bool,
) -> Result<PublishManifest> {
    let uploads = plan_uploads(output_dir, prefix, gzip);
    let mut artifacts = Vec::with_capacity(uploads.len());

    for upload in uploads {
        let contents = tokio::fs::read(&upload.path)
            .await
            .with_context(|| format!("reading {}", upload.path.display()))?;
        let body = if gzip { gzip_bytes(&contents)? } else { contents };

        client
            .put_object()
            .bucket(bucket)
            .key(&upload.key)
            .body(ByteStream::from(body))
            .send()
            .await
            .with_context(|| format!("uploading s3://{bucket}/{}", upload.key))?;

        info!(key = %upload.key, "Artifact uploaded");
        artifacts.push(upload.key);
    }

    let manifest = PublishManifest {
        generated_at: Utc::now(),
        bucket: bucket.to_string(),
        gzip,
        artifacts,
    };
    write_json_to_s3(client, bucket, &object_key(prefix, MANIFEST_FILE, false), &manifest).await?;
    info!(upload_count = manifest.artifacts.len(), bucket, "S3 upload complete");

    Ok(manifest)
}
