// Copyright (c) 2025 ADBC Drivers Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Local content cache for shared data files.
//!
//! Data files referenced by a table version are immutable, so once a file has
//! been downloaded it can be served from local storage. Entries are keyed by
//! the URL without its query string (see [`CacheKey`]), which lets a fresh
//! presigned URL for the same object hit the entry written for an older one.
//!
//! Concurrent fetches of the same key are single-flighted: one caller
//! downloads while the others wait on a per-key lock and then read the entry.

pub mod key;
pub mod store;

pub use key::CacheKey;
pub use store::{CacheStore, DirectoryStore, MemoryStore};

use crate::client::SharingHttpClient;
use crate::error::{Error, Result};
use bytes::Bytes;
use dashmap::DashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Download-through cache over a [`CacheStore`].
#[derive(Debug)]
pub struct FileCache {
    store: Arc<dyn CacheStore>,
    http_client: Arc<SharingHttpClient>,
    locks: DashMap<CacheKey, Arc<Mutex<()>>>,
}

impl FileCache {
    pub fn new(store: Arc<dyn CacheStore>, http_client: Arc<SharingHttpClient>) -> Self {
        Self {
            store,
            http_client,
            locks: DashMap::new(),
        }
    }

    /// Cache backed by files under `root`.
    pub fn open_dir(root: impl Into<PathBuf>, http_client: Arc<SharingHttpClient>) -> Self {
        Self::new(Arc::new(DirectoryStore::new(root)), http_client)
    }

    /// Cache that lives only as long as this value.
    pub fn in_memory(http_client: Arc<SharingHttpClient>) -> Self {
        Self::new(Arc::new(MemoryStore::new()), http_client)
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Bytes of the file at `url`, downloading on a miss.
    pub async fn fetch(&self, url: &str) -> Result<Bytes> {
        self.fetch_cancellable(url, &CancellationToken::new()).await
    }

    /// [`fetch`](FileCache::fetch) that aborts with `Cancelled` when `cancel`
    /// fires while waiting for another fetch of the same key or during the
    /// download.
    pub async fn fetch_cancellable(&self, url: &str, cancel: &CancellationToken) -> Result<Bytes> {
        const OP: &str = "cache_fetch";
        let key = CacheKey::from_url(url)?;

        let _release = self.release_on_drop(&key);
        let lock = self.lock_for(&key);
        let _guard = tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                debug!("{} cancelled waiting for {}", OP, key);
                return Err(Error::Cancelled {
                    op: OP,
                    path: key.to_string(),
                });
            }
            guard = lock.lock() => guard,
        };
        self.fetch_locked(OP, &key, url, cancel).await
    }

    /// Check, download and persist while holding the key's lock.
    async fn fetch_locked(
        &self,
        op: &'static str,
        key: &CacheKey,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Bytes> {
        match self.store.read(key).await.map_err(|e| cache_io(op, key, e))? {
            Some(data) if !data.is_empty() => {
                trace!("cache hit: {} ({} bytes)", key, data.len());
                return Ok(data);
            }
            Some(_) => {
                warn!("cache entry {} is empty, downloading again", key);
                self.store
                    .remove(key)
                    .await
                    .map_err(|e| cache_io(op, key, e))?;
            }
            None => debug!("cache miss: {}", key),
        }

        let data = self.http_client.download(op, url, cancel).await?;
        self.store
            .write(key, &data)
            .await
            .map_err(|e| cache_io(op, key, e))?;
        debug!("cached {} ({} bytes)", key, data.len());
        Ok(data)
    }

    /// Remove the entry for `url`. Returns whether one existed.
    pub async fn evict(&self, url: &str) -> Result<bool> {
        const OP: &str = "cache_evict";
        let key = CacheKey::from_url(url)?;

        let _release = self.release_on_drop(&key);
        let lock = self.lock_for(&key);
        let _guard = lock.lock().await;
        self.store.remove(&key).await.map_err(|e| cache_io(OP, &key, e))
    }

    /// Whether a usable (non-empty) entry exists for `url`.
    pub async fn contains(&self, url: &str) -> Result<bool> {
        const OP: &str = "cache_contains";
        let key = CacheKey::from_url(url)?;
        let entry = self
            .store
            .read(&key)
            .await
            .map_err(|e| cache_io(OP, &key, e))?;
        Ok(entry.is_some_and(|data| !data.is_empty()))
    }

    fn lock_for(&self, key: &CacheKey) -> Arc<Mutex<()>> {
        Arc::clone(
            self.locks
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        )
    }

    fn release_on_drop<'a>(&'a self, key: &'a CacheKey) -> LockRelease<'a> {
        LockRelease {
            locks: &self.locks,
            key,
        }
    }

    #[cfg(test)]
    fn lock_count(&self) -> usize {
        self.locks.len()
    }
}

/// Removes a key's lock from the map on drop, once no handle to it is left.
/// Declared before the handle it guards so that handle is dropped first,
/// including when the owning future is dropped mid-wait.
struct LockRelease<'a> {
    locks: &'a DashMap<CacheKey, Arc<Mutex<()>>>,
    key: &'a CacheKey,
}

impl Drop for LockRelease<'_> {
    fn drop(&mut self) {
        self.locks
            .remove_if(self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

fn cache_io(op: &'static str, key: &CacheKey, source: std::io::Error) -> Error {
    Error::CacheIo {
        op,
        key: key.to_string(),
        source,
    }
}
