// ai
//! 🪣📡🏗️ S3 Remote — paging through a bucket, one continuation token at a time.
//!
//! COLD OPEN — EXT. DATA CENTER — 3:47 AM
//!
//! "We need every object under `logs/2024/`," they whispered. "In one file. By morning."
//! The cursor blinked. The S3Remote blinked back. "Page one coming up," it said.
//!
//! 🧠 Knowledge graph:
//! - `S3SourceConfig`: bucket, prefix, region, endpoint override, path style, page size
//! - `S3Remote`: one shared `aws_sdk_s3::Client`. Cheap to share, pricey to build, so build once.
//! - `list_objects`: `ListObjectsV2` with the caller's cursor. Keys come back in the store's order,
//!   directory markers included (an empty `foo/` object is still an object, just a sad one).
//! - `fetch_object`: `GetObject`, body collected fully into memory. One object at a time per worker.

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use serde::Deserialize;
use tracing::{debug, trace};

use crate::backends::RemoteStore;
use crate::common::ListPage;

// ============================================================
//  🔧 S3SourceConfig — knobs, dials, and one bucket name
// ============================================================

/// 🔧 Configuration for the S3 remote.
///
/// KNOWLEDGE GRAPH: config lives co-located with the backend that uses it.
/// No scavenger hunts at 2am wondering "where is that config struct defined?" It's RIGHT HERE.
///
/// 📐 `bucket` is required. Everything else has a default that works for plain AWS.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct S3SourceConfig {
    /// 🪣 The bucket — where the data lives, sleeps, and waits for us
    pub bucket: String,
    /// 🏷️ Key prefix filter. Empty string = the whole bucket. Brave.
    #[serde(default)]
    pub prefix: String,
    /// 🌎 AWS region — defaults to "us-east-1" because that's where data goes to retire
    #[serde(default = "default_s3_region")]
    pub region: String,
    /// 🔀 Custom endpoint for S3-compatible stores (MinIO, LocalStack, a wiremock in a trench coat)
    #[serde(default)]
    pub endpoint_url: Option<String>,
    /// 🛣️ Path-style addressing (`host/bucket/key`) instead of virtual-hosted (`bucket.host/key`)
    #[serde(default)]
    pub force_path_style: bool,
    /// 📄 `max-keys` per listing page. `None` lets S3 pick (1000, it always picks 1000)
    #[serde(default)]
    pub page_size: Option<i32>,
}

/// 🌎 Default region — us-east-1. The Florida of AWS regions. Everyone ends up there eventually.
fn default_s3_region() -> String {
    "us-east-1".to_string()
}

// ============================================================
//  🪣 S3Remote — the lister and the fetcher
// ============================================================

/// 🪣 Lists and fetches objects in S3 (or anything that speaks its dialect).
#[derive(Debug, Clone)]
pub struct S3Remote {
    client: aws_sdk_s3::Client,
    page_size: Option<i32>,
}

impl S3Remote {
    /// 🚀 Builds an S3 client from the environment (env vars → ~/.aws/config → IAM role → hope),
    /// then layers the config's region, endpoint and addressing style on top.
    ///
    /// No network call happens here. The first sign of bad credentials is the first listing.
    pub async fn connect(source_config: &S3SourceConfig) -> Result<Self> {
        let the_sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new(source_config.region.clone()))
            .load()
            .await;

        let mut the_builder = aws_sdk_s3::config::Builder::from(&the_sdk_config)
            .force_path_style(source_config.force_path_style);
        if let Some(endpoint) = &source_config.endpoint_url {
            // -- 🔀 not AWS? no judgement. well, a little judgement.
            the_builder = the_builder.endpoint_url(endpoint);
        }

        debug!(
            "🪣 S3 client ready: region={}, endpoint={:?}, path_style={}",
            source_config.region, source_config.endpoint_url, source_config.force_path_style
        );

        Ok(Self::from_client(
            aws_sdk_s3::Client::from_conf(the_builder.build()),
            source_config.page_size,
        ))
    }

    /// 🔧 Wrap an already-built client. Tests use this to point at a fake endpoint.
    pub fn from_client(client: aws_sdk_s3::Client, page_size: Option<i32>) -> Self {
        Self { client, page_size }
    }
}

#[async_trait]
impl RemoteStore for S3Remote {
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<&str>,
    ) -> Result<ListPage> {
        let the_response = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .set_continuation_token(continuation.map(str::to_owned))
            .set_max_keys(self.page_size)
            .send()
            .await
            .with_context(|| {
                format!(
                    "💀 ListObjectsV2 on s3://{bucket}/{prefix} failed (cursor: {continuation:?}). \
                     The bucket ghosted us. Check: bucket name, region, credentials, and whether \
                     the bucket still exists in this timeline."
                )
            })?;

        let the_keys: Vec<String> = the_response
            .contents()
            .iter()
            .filter_map(|object| object.key().map(str::to_owned))
            .collect();

        trace!(
            "📄 s3://{}/{} page brought {} keys (truncated: {:?})",
            bucket,
            prefix,
            the_keys.len(),
            the_response.is_truncated()
        );

        Ok(ListPage {
            keys: the_keys,
            next_token: the_response.next_continuation_token().map(str::to_owned),
            truncated: the_response.is_truncated().unwrap_or(false),
        })
    }

    async fn fetch_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let the_response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .with_context(|| {
                format!(
                    "💀 GetObject failed for s3://{bucket}/{key}. The key was in the listing, \
                     but S3 won't hand it over. Check: IAM permissions, bucket policy, KMS key \
                     access, or whether someone deleted it mid-run."
                )
            })?;

        // -- 📦 whole body into memory. one object per worker at a time, so the
        // -- worst case is `workers × biggest object`. choose your worker count accordingly.
        let the_body = the_response.body.collect().await.with_context(|| {
            format!("💀 The body of s3://{bucket}/{key} stopped streaming halfway. Rude.")
        })?;

        Ok(the_body.into_bytes().to_vec())
    }
}

// ============================================================
//  🧪 Tests — "trust but verify" is for diplomats.
//  Engineers say "trust nothing, test everything, blame DNS."
// ============================================================
