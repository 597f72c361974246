//! S3 (and S3-compatible) object store.
//!
//! S3 `DeleteObject` succeeds on missing keys, so two processes that copy the
//! same key before either deletes it can both believe they own the claim.
//! The window is one round trip wide.

use std::path::Path;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::Client;
use tokio::io::AsyncWriteExt;

use super::object_store::ObjectStore;
use super::SourceError;
use crate::config::S3Settings;

#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    #[tracing::instrument(level = "debug", skip(cfg), fields(bucket = %cfg.bucket))]
    pub async fn new(cfg: &S3Settings) -> Self {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(cfg.region.clone()));

        // Static keys when configured, the default provider chain otherwise.
        if let (Some(key), Some(secret)) = (&cfg.access_key, &cfg.secret_key) {
            let creds = Credentials::new(key.clone(), secret.clone(), None, None, "jlingest_static");
            loader = loader.credentials_provider(creds);
        }
        if let Some(endpoint) = &cfg.endpoint {
            loader = loader.endpoint_url(endpoint);
        }

        let shared = loader.load().await;
        let mut s3_cfg = aws_sdk_s3::config::Builder::from(&shared);
        if cfg.endpoint.is_some() {
            // Custom endpoints are addressed path-style.
            s3_cfg = s3_cfg.force_path_style(true);
        }

        Self {
            client: Client::from_conf(s3_cfg.build()),
            bucket: cfg.bucket.clone(),
        }
    }

    /// `bucket/key` with each key segment percent-encoded, as `CopySource`
    /// expects.
    fn copy_source(&self, key: &str) -> String {
        let encoded: Vec<String> = key
            .split('/')
            .map(|seg| urlencoding::encode(seg).into_owned())
            .collect();
        format!("{}/{}", self.bucket, encoded.join("/"))
    }
}

fn is_not_found(message: &str) -> bool {
    message.contains("NoSuchKey") || message.contains("NotFound")
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn describe(&self) -> String {
        format!("s3://{}", self.bucket)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, SourceError> {
        let mut keys = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let mut req = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix);
            if let Some(t) = token.take() {
                req = req.continuation_token(t);
            }
            let resp = req
                .send()
                .await
                .map_err(|e| {
                    SourceError::object_store("s3 list_objects_v2", DisplayErrorContext(e))
                })?;

            if let Some(contents) = resp.contents {
                keys.extend(contents.into_iter().filter_map(|obj| obj.key));
            }

            if resp.is_truncated.unwrap_or(false) {
                token = resp.next_continuation_token;
                if token.is_none() {
                    break;
                }
            } else {
                break;
            }
        }

        Ok(keys)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn copy(&self, from: &str, to: &str) -> Result<(), SourceError> {
        self.client
            .copy_object()
            .bucket(&self.bucket)
            .copy_source(self.copy_source(from))
            .key(to)
            .send()
            .await
            .map_err(|e| {
                let message = format!("{e:?}");
                if is_not_found(&message) {
                    SourceError::NotFound(from.to_string())
                } else {
                    SourceError::object_store("s3 copy_object", DisplayErrorContext(e))
                }
            })?;
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn delete(&self, key: &str) -> Result<(), SourceError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                SourceError::object_store("s3 delete_object", DisplayErrorContext(e))
            })?;
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn download_to(&self, key: &str, dest: &Path) -> Result<(), SourceError> {
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let message = format!("{e:?}");
                if is_not_found(&message) {
                    SourceError::NotFound(key.to_string())
                } else {
                    SourceError::object_store("s3 get_object", DisplayErrorContext(e))
                }
            })?;

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| SourceError::io(dest.display(), e))?;
        let mut body = resp.body.into_async_read();
        tokio::io::copy(&mut body, &mut file)
            .await
            .map_err(|e| SourceError::io(dest.display(), e))?;
        file.flush()
            .await
            .map_err(|e| SourceError::io(dest.display(), e))?;
        Ok(())
    }
}
