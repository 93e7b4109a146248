use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;

use crate::backends::RemoteStore;
use crate::common::ListPage;

/// 📦 A bucket that lives in a HashMap and has never heard of IAM.
///
/// Pages are served in the order they were added, with cursors spelled
/// `page-1`, `page-2`, ... (opaque to everyone but us). Keys that don't start
/// with the requested prefix are filtered out, like a real store would. The
/// bucket name is ignored: there is only one bucket in RAM, and this is it.
///
/// 🎯 Designed for tests. Can be told to fail a listing page, fail an object,
/// or take its sweet time on either.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRemote {
    pages: Vec<Vec<String>>,
    objects: HashMap<String, Vec<u8>>,
    broken_pages: HashSet<usize>,
    broken_objects: HashSet<String>,
    page_delays: HashMap<usize, Duration>,
    object_delays: HashMap<String, Duration>,
    /// 🔒 every fetch attempt, in the order it happened. Shared so clones see the same log.
    fetch_log: Arc<tokio::sync::Mutex<Vec<String>>>,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// 📄 Append a listing page.
    pub fn page<I, K>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.pages.push(keys.into_iter().map(Into::into).collect());
        self
    }

    /// 📦 Put an object in the bucket.
    pub fn object(mut self, key: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.objects.insert(key.into(), body.into());
        self
    }

    /// 💀 Listing page `index` (0-based) fails.
    pub fn failing_page(mut self, index: usize) -> Self {
        self.broken_pages.insert(index);
        self
    }

    /// 💀 Fetching `key` fails.
    pub fn failing_object(mut self, key: impl Into<String>) -> Self {
        self.broken_objects.insert(key.into());
        self
    }

    /// 🐌 Listing page `index` takes `delay` before answering.
    pub fn slow_page(mut self, index: usize, delay: Duration) -> Self {
        self.page_delays.insert(index, delay);
        self
    }

    /// 🐌 Fetching `key` takes `delay` before answering.
    pub fn slow_object(mut self, key: impl Into<String>, delay: Duration) -> Self {
        self.object_delays.insert(key.into(), delay);
        self
    }

    /// 📜 Every key anyone tried to fetch, in order.
    pub async fn fetched(&self) -> Vec<String> {
        self.fetch_log.lock().await.clone()
    }

    fn page_index(continuation: Option<&str>) -> Result<usize> {
        match continuation {
            None => Ok(0),
            Some(token) => token
                .strip_prefix("page-")
                .and_then(|n| n.parse().ok())
                .ok_or_else(|| anyhow!("💀 '{token}' is not a cursor this bucket ever handed out")),
        }
    }
}

#[async_trait]
impl RemoteStore for InMemoryRemote {
    async fn list_objects(
        &self,
        _bucket: &str,
        prefix: &str,
        continuation: Option<&str>,
    ) -> Result<ListPage> {
        let the_index = Self::page_index(continuation)?;
        if let Some(delay) = self.page_delays.get(&the_index) {
            tokio::time::sleep(*delay).await;
        }
        if self.broken_pages.contains(&the_index) {
            bail!("💀 listing page {the_index} fell over (on purpose, it's a test)");
        }
        if self.pages.is_empty() && the_index == 0 {
            // -- 🕳️ an empty bucket still answers the first call. with nothing.
            return Ok(ListPage::default());
        }
        let the_keys = self
            .pages
            .get(the_index)
            .ok_or_else(|| anyhow!("💀 cursor points at page {the_index}, which does not exist"))?;

        let truncated = the_index + 1 < self.pages.len();
        Ok(ListPage {
            keys: the_keys
                .iter()
                .filter(|k| k.starts_with(prefix))
                .cloned()
                .collect(),
            next_token: truncated.then(|| format!("page-{}", the_index + 1)),
            truncated,
        })
    }

    async fn fetch_object(&self, _bucket: &str, key: &str) -> Result<Vec<u8>> {
        self.fetch_log.lock().await.push(key.to_string());
        if let Some(delay) = self.object_delays.get(key) {
            tokio::time::sleep(*delay).await;
        }
        if self.broken_objects.contains(key) {
            bail!("💀 object '{key}' refused to be fetched (on purpose, it's a test)");
        }
        self.objects
            .get(key)
            .cloned()
            .ok_or_else(|| anyhow!("💀 NoSuchKey: '{key}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn the_one_where_cursors_walk_the_pages_in_order() {
        let the_remote = InMemoryRemote::new().page(["a", "b"]).page(["c"]);

        let the_first = the_remote.list_objects("b", "", None).await.expect("💀 page 0");
        assert_eq!(the_first.keys, vec!["a", "b"]);
        assert!(the_first.truncated);
        assert_eq!(the_first.next_token.as_deref(), Some("page-1"));

        let the_second = the_remote
            .list_objects("b", "", the_first.next_token.as_deref())
            .await
            .expect("💀 page 1");
        assert_eq!(the_second.keys, vec!["c"]);
        assert!(!the_second.truncated);
        assert!(the_second.next_token.is_none());
    }

    #[tokio::test]
    async fn the_one_where_the_prefix_actually_filters() {
        let the_remote = InMemoryRemote::new().page(["logs/a", "other/b", "logs/c"]);
        let the_page = the_remote.list_objects("b", "logs/", None).await.expect("💀 page 0");
        assert_eq!(the_page.keys, vec!["logs/a", "logs/c"]);
    }

    #[tokio::test]
    async fn the_one_where_broken_things_break_on_cue() {
        let the_remote = InMemoryRemote::new()
            .page(["a"])
            .page(["b"])
            .failing_page(1)
            .object("a", "x\n")
            .failing_object("a");

        assert!(the_remote.list_objects("b", "", Some("page-1")).await.is_err());
        assert!(the_remote.list_objects("b", "", Some("bogus")).await.is_err());
        assert!(the_remote.fetch_object("b", "a").await.is_err());
        assert!(the_remote.fetch_object("b", "nope").await.is_err());
        assert_eq!(the_remote.fetched().await, vec!["a", "nope"]);
    }

    #[tokio::test]
    async fn the_one_where_an_empty_bucket_is_one_empty_page() {
        let the_page = InMemoryRemote::new()
            .list_objects("b", "", None)
            .await
            .expect("💀 empty buckets still answer");
        assert_eq!(the_page, ListPage::default());
    }
}
