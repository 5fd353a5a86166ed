use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use log::debug;
use rusoto_core::{HttpClient, Region};
use rusoto_credential::ProfileProvider;
use rusoto_s3::{HeadBucketRequest, PutObjectRequest, S3Client, S3};

#[cfg(test)]
use mockall::automock;

/// The two object-store calls the S3 destination makes.
///
/// Implemented for `S3Client`; tests substitute their own store.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_object(&self, request: PutObjectRequest) -> Result<()>;

    async fn head_bucket(&self, bucket: &str) -> Result<()>;
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn put_object(&self, request: PutObjectRequest) -> Result<()> {
        let key = request.key.clone();
        S3::put_object(self, request)
            .await
            .context(format!("PutObject failed for {}", key))?;
        Ok(())
    }

    async fn head_bucket(&self, bucket: &str) -> Result<()> {
        S3::head_bucket(self, HeadBucketRequest {
            bucket: bucket.to_string(),
            ..Default::default()
        })
        .await
        .context(format!("HeadBucket failed for {}", bucket))?;
        Ok(())
    }
}

/// Shared-credentials profile selection: `profile` or `path:profile`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialProfile {
    pub file_path: Option<PathBuf>,
    pub profile: String,
}

impl CredentialProfile {
    pub fn parse(spec: &str) -> Result<Self> {
        let spec = spec.trim();
        if spec.is_empty() {
            bail!("Empty credential profile");
        }

        // Split on the last separator so drive letters stay in the path.
        let (file_path, profile) = match spec.rsplit_once(':') {
            Some((path, profile)) => {
                if path.is_empty() {
                    bail!("Invalid credential profile '{}': missing credentials file path", spec);
                }
                (Some(PathBuf::from(path)), profile)
            },
            None => (None, spec),
        };

        if profile.is_empty() {
            bail!("Invalid credential profile '{}': missing profile name", spec);
        }

        Ok(CredentialProfile { file_path, profile: profile.to_string() })
    }

    pub fn provider(&self) -> Result<ProfileProvider> {
        match &self.file_path {
            Some(path) => Ok(ProfileProvider::with_configuration(path, &self.profile)),
            None => {
                let mut provider = ProfileProvider::new()
                    .context("Failed to create AWS profile provider")?;
                provider.set_profile(self.profile.as_str());
                Ok(provider)
            },
        }
    }
}

/// Map a region name to a rusoto region, honoring a custom endpoint for
/// S3-compatible storage.
///
/// Names rusoto does not know yet get the standard regional S3 endpoint.
pub fn resolve_region(name: &str, endpoint: Option<&str>) -> Region {
    match endpoint.filter(|e| !e.is_empty()) {
        Some(endpoint) => Region::Custom {
            name: name.to_string(),
            endpoint: endpoint.to_string(),
        },
        None => name.parse::<Region>().unwrap_or_else(|_| {
            debug!("Region {} not known to the SDK, using its regional S3 endpoint", name);
            Region::Custom {
                name: name.to_string(),
                endpoint: format!("https://s3.{}.amazonaws.com", name),
            }
        }),
    }
}

/// Create an S3 client for the region, with a profile if one is given
pub fn create_s3_client(region: Region, profile: Option<&CredentialProfile>) -> Result<Arc<dyn ObjectStore>> {
    let client = match profile {
        Some(profile) => {
            debug!("Using AWS credential profile {}", profile.profile);
            let http_client = HttpClient::new()
                .context("Failed to create HTTP client for S3")?;
            S3Client::new_with(http_client, profile.provider()?, region)
        },
        None => S3Client::new(region),
    };

    Ok(Arc::new(client))
}
