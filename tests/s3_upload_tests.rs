//! Integration tests for the S3 destination.
//!
//! A recording object store replaces the S3 client so puts can be inspected
//! without network access.

use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use rusoto_s3::PutObjectRequest;
use tempfile::TempDir;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use bundle_forwarder::config::{Configuration, OutputKind};
use bundle_forwarder::models::DestinationStatistics;
use bundle_forwarder::output::client::ObjectStore;
use bundle_forwarder::output::{DestinationBehavior, S3Behavior};

#[derive(Debug, Clone)]
struct RecordedPut {
    bucket: String,
    key: String,
    server_side_encryption: Option<String>,
    acl: Option<String>,
    body: Vec<u8>,
}

#[derive(Default)]
struct RecordingStore {
    puts: Mutex<Vec<RecordedPut>>,
    probes: Mutex<Vec<String>>,
    deny_probe: bool,
    fail_puts: bool,
}

#[async_trait]
impl ObjectStore for RecordingStore {
    async fn put_object(&self, request: PutObjectRequest) -> Result<()> {
        let mut body = Vec::new();
        if let Some(stream) = request.body {
            stream.into_async_read().read_to_end(&mut body).await?;
        }

        self.puts.lock().unwrap().push(RecordedPut {
            bucket: request.bucket,
            key: request.key,
            server_side_encryption: request.server_side_encryption,
            acl: request.acl,
            body,
        });

        if self.fail_puts {
            return Err(anyhow!("service unavailable"));
        }
        Ok(())
    }

    async fn head_bucket(&self, bucket: &str) -> Result<()> {
        self.probes.lock().unwrap().push(bucket.to_string());
        if self.deny_probe {
            return Err(anyhow!("Access Denied"));
        }
        Ok(())
    }
}

fn s3_config(destination: &str) -> Configuration {
    let mut config = Configuration::default();
    config.output.kind = OutputKind::S3;
    config.output.destination = destination.to_string();
    config
}

async fn initialized(store: Arc<RecordingStore>, config: &Configuration) -> Result<S3Behavior> {
    let mut behavior = S3Behavior::with_store(store);
    behavior.initialize(&config.output.destination, config).await?;
    Ok(behavior)
}

/// Test the whole bundle lands under the prefixed key
#[tokio::test]
async fn test_upload_with_prefix() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let bundle_path = temp_dir.path().join("event-forwarder.1700000000");
    let content = "{\"id\":1}\n{\"id\":2}\n";
    std::fs::write(&bundle_path, content)?;

    let store = Arc::new(RecordingStore::default());
    let mut config = s3_config("us-west-2:forwarder-events");
    config.s3.object_prefix = Some("carbonblack".to_string());
    config.s3.server_side_encryption = Some("AES256".to_string());
    config.s3.acl_policy = Some("bucket-owner-full-control".to_string());

    let behavior = initialized(Arc::clone(&store), &config).await?;
    let name = bundle_path.to_string_lossy().into_owned();
    let status = behavior.upload(&name, File::open(&bundle_path).await?).await;

    assert!(status.is_success(), "{:?}", status.result);
    assert_eq!(status.status, 0);
    assert_eq!(status.file_name, name);

    let puts = store.puts.lock().unwrap().clone();
    assert_eq!(puts.len(), 1);
    assert_eq!(puts[0].bucket, "forwarder-events");
    assert_eq!(puts[0].key, "carbonblack/event-forwarder.1700000000");
    assert_eq!(puts[0].server_side_encryption.as_deref(), Some("AES256"));
    assert_eq!(puts[0].acl.as_deref(), Some("bucket-owner-full-control"));
    assert_eq!(puts[0].body, content.as_bytes());

    // The source bundle is left in place for the caller.
    assert!(bundle_path.exists());
    Ok(())
}

/// Test the key is the bare file name without a prefix
#[tokio::test]
async fn test_upload_without_prefix() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let bundle_path = temp_dir.path().join("bundle.7");
    std::fs::write(&bundle_path, "{}\n")?;

    let store = Arc::new(RecordingStore::default());
    let behavior = initialized(Arc::clone(&store), &s3_config("mybucket")).await?;
    let status = behavior.upload(&bundle_path.to_string_lossy(), File::open(&bundle_path).await?).await;

    assert!(status.is_success());
    let puts = store.puts.lock().unwrap().clone();
    assert_eq!(puts[0].key, "bundle.7");
    assert_eq!(puts[0].bucket, "mybucket");
    assert!(puts[0].server_side_encryption.is_none());
    Ok(())
}

/// Test a denied bucket probe is tolerated
#[tokio::test]
async fn test_probe_denied_still_initializes() -> Result<()> {
    let store = Arc::new(RecordingStore { deny_probe: true, ..Default::default() });
    let behavior = initialized(Arc::clone(&store), &s3_config("eu-central-1:write-only")).await?;

    assert_eq!(store.probes.lock().unwrap().as_slice(), ["write-only".to_string()]);
    assert_eq!(behavior.key(), "eu-central-1:write-only");
    Ok(())
}

/// Test a failed put is returned without a status code
#[tokio::test]
async fn test_put_failure_reported() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let bundle_path = temp_dir.path().join("bundle.8");
    std::fs::write(&bundle_path, "{}\n")?;

    let store = Arc::new(RecordingStore { fail_puts: true, ..Default::default() });
    let behavior = initialized(store, &s3_config("mybucket")).await?;
    let status = behavior.upload("bundle.8", File::open(&bundle_path).await?).await;

    assert!(!status.is_success());
    assert_eq!(status.status, 0);
    assert!(status.result.unwrap_err().to_string().contains("service unavailable"));
    Ok(())
}

/// Test malformed connection strings fail initialization
#[tokio::test]
async fn test_malformed_connection_string() {
    let store = Arc::new(RecordingStore::default());
    let config = s3_config("tmp:us-east-1:mybucket");
    assert!(initialized(Arc::clone(&store), &config).await.is_err());
    assert!(store.probes.lock().unwrap().is_empty());
}

/// Test identity and statistics
#[tokio::test]
async fn test_identity_and_statistics() -> Result<()> {
    let store = Arc::new(RecordingStore::default());
    let mut config = s3_config("ap-southeast-2:archive");
    config.s3.server_side_encryption = Some("aws:kms".to_string());
    let behavior = initialized(store, &config).await?;

    assert_eq!(behavior.key(), "ap-southeast-2:archive");
    assert_eq!(behavior.to_string(), "AWS S3 ap-southeast-2:archive");

    match behavior.statistics() {
        DestinationStatistics::S3(stats) => {
            assert_eq!(stats.bucket_name, "archive");
            assert_eq!(stats.region, "ap-southeast-2");
            assert!(stats.encryption_enabled);
        },
        other => panic!("unexpected statistics {:?}", other),
    }

    let json = serde_json::to_value(behavior.statistics())?;
    assert_eq!(json["bucket_name"], "archive");
    assert_eq!(json["encryption_enabled"], true);
    Ok(())
}
