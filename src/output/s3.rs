use std::fmt;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use log::{debug, warn};
use rusoto_core::ByteStream;
use rusoto_s3::PutObjectRequest;
use tokio::fs::File;
use tokio_util::io::ReaderStream;

use crate::config::{Configuration, S3Config};
use crate::constants::{DEFAULT_S3_REGION, S3_CONNECTION_SEPARATOR, S3_KIND_TAG};
use crate::models::{DestinationStatistics, S3Statistics, UploadStatus};
use crate::output::client::{create_s3_client, resolve_region, CredentialProfile, ObjectStore};
use crate::output::DestinationBehavior;

/// Uploads each bundle as a single S3 object.
///
/// The object key is the bundle's base name, optionally under the configured
/// prefix. Server-side encryption and the ACL policy from configuration are
/// attached to every put.
#[derive(Default)]
pub struct S3Behavior {
    bucket_name: String,
    region: String,
    out: Option<Arc<dyn ObjectStore>>,
    config: S3Config,
}

/// Split an S3 connection string into `(region, bucket)`.
///
/// `bucket` alone uses the default region; `region:bucket` names both.
pub fn parse_connection_string(connection: &str) -> Result<(String, String)> {
    let parts: Vec<&str> = connection.split(S3_CONNECTION_SEPARATOR).collect();

    let (region, bucket) = match parts.as_slice() {
        [bucket] => (DEFAULT_S3_REGION, *bucket),
        [region, bucket] => (*region, *bucket),
        _ => bail!(
            "Invalid connection string: '{}' should look like bucket-name or region:bucket-name",
            connection
        ),
    };

    if region.is_empty() || bucket.is_empty() {
        bail!(
            "Invalid connection string: '{}' should look like bucket-name or region:bucket-name",
            connection
        );
    }

    Ok((region.to_string(), bucket.to_string()))
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

impl S3Behavior {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an existing store instead of building an S3 client at
    /// initialization.
    pub fn with_store(store: Arc<dyn ObjectStore>) -> Self {
        S3Behavior {
            out: Some(store),
            ..Default::default()
        }
    }

    pub fn bucket_name(&self) -> &str {
        &self.bucket_name
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Object key for a bundle: `prefix/basename`, or `basename` without a
    /// prefix.
    pub fn object_key(&self, file_name: &str) -> String {
        let base_name = Path::new(file_name)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_name.to_string());

        match self.config.object_prefix.as_deref().filter(|p| !p.is_empty()) {
            Some(prefix) => format!("{}/{}", prefix, base_name),
            None => base_name,
        }
    }
}

#[async_trait]
impl DestinationBehavior for S3Behavior {
    async fn initialize(&mut self, connection: &str, config: &Configuration) -> Result<()> {
        let (region, bucket_name) = parse_connection_string(connection)?;

        let profile = match config.s3.credential_profile.as_deref() {
            Some(spec) => Some(CredentialProfile::parse(spec)?),
            None => None,
        };

        let store = match &self.out {
            Some(store) => Arc::clone(store),
            None => create_s3_client(
                resolve_region(&region, config.s3.endpoint.as_deref()),
                profile.as_ref(),
            )?,
        };

        self.region = region;
        self.bucket_name = bucket_name;
        self.config = config.s3.clone();
        self.out = Some(Arc::clone(&store));

        // A writer may hold PutObject rights without ListBucket, so a failed
        // probe is not fatal.
        if let Err(e) = store.head_bucket(&self.bucket_name).await {
            warn!("Could not open bucket {}: {:#}", self.bucket_name, e);
        }

        Ok(())
    }

    async fn upload(&self, file_name: &str, file: File) -> UploadStatus {
        let store = match &self.out {
            Some(store) => store,
            None => {
                return UploadStatus::failure(
                    file_name,
                    anyhow!("S3 destination used before initialization"),
                    0,
                );
            },
        };

        let key = self.object_key(file_name);

        let body = match file.metadata().await {
            Ok(metadata) => ByteStream::new_with_size(ReaderStream::new(file), metadata.len() as usize),
            Err(e) => {
                debug!("Could not determine size of {}: {}", file_name, e);
                ByteStream::new(ReaderStream::new(file))
            },
        };

        let request = PutObjectRequest {
            bucket: self.bucket_name.clone(),
            key: key.clone(),
            body: Some(body),
            server_side_encryption: non_empty(&self.config.server_side_encryption),
            acl: non_empty(&self.config.acl_policy),
            ..Default::default()
        };

        debug!("Uploading {} to s3://{}/{}", file_name, self.bucket_name, key);

        // The file handle lives in the request body and is closed when the
        // put finishes.
        match store.put_object(request).await {
            Ok(()) => UploadStatus::success(file_name, 0),
            Err(e) => {
                warn!("Failed to upload {} to s3://{}/{}: {:#}", file_name, self.bucket_name, key, e);
                UploadStatus::failure(file_name, e, 0)
            },
        }
    }

    fn key(&self) -> String {
        format!("{}:{}", self.region, self.bucket_name)
    }

    fn statistics(&self) -> DestinationStatistics {
        DestinationStatistics::S3(S3Statistics {
            bucket_name: self.bucket_name.clone(),
            region: self.region.clone(),
            encryption_enabled: non_empty(&self.config.server_side_encryption).is_some(),
        })
    }
}

impl fmt::Display for S3Behavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", S3_KIND_TAG, self.key())
    }
}
