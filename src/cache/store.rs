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

//! Storage backends for the file cache.

use crate::cache::key::CacheKey;
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Byte storage addressed by [`CacheKey`].
///
/// Writes must be atomic with respect to readers: a reader sees either no
/// entry or the complete bytes of a finished write.
#[async_trait]
pub trait CacheStore: Send + Sync + std::fmt::Debug {
    /// `Ok(None)` when there is no entry.
    async fn read(&self, key: &CacheKey) -> io::Result<Option<Bytes>>;

    async fn write(&self, key: &CacheKey, data: &Bytes) -> io::Result<()>;

    /// Returns whether an entry existed.
    async fn remove(&self, key: &CacheKey) -> io::Result<bool>;
}

/// Cache entries as files under a root directory:
/// `<root>/<host[_port]>/<path segments...>`.
#[derive(Debug)]
pub struct DirectoryStore {
    root: PathBuf,
    temp_counter: AtomicU64,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            temp_counter: AtomicU64::new(0),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.to_relative_path())
    }

    /// Sibling of `path` unique to this process and write.
    fn temp_path_for(&self, path: &Path) -> PathBuf {
        let n = self.temp_counter.fetch_add(1, Ordering::Relaxed);
        let mut name = path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(format!(".{}.{}.tmp", std::process::id(), n));
        path.with_file_name(name)
    }
}

#[async_trait]
impl CacheStore for DirectoryStore {
    async fn read(&self, key: &CacheKey) -> io::Result<Option<Bytes>> {
        match tokio::fs::read(self.path_for(key)).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn write(&self, key: &CacheKey, data: &Bytes) -> io::Result<()> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write aside, then rename into place.
        let temp = self.temp_path_for(&path);
        if let Err(e) = tokio::fs::write(&temp, data).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e);
        }
        if let Err(e) = tokio::fs::rename(&temp, &path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e);
        }
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> io::Result<bool> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Process-local store, mostly useful for tests and short-lived readers.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<CacheKey, Bytes>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn read(&self, key: &CacheKey) -> io::Result<Option<Bytes>> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn write(&self, key: &CacheKey, data: &Bytes) -> io::Result<()> {
        self.entries.insert(key.clone(), data.clone());
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> io::Result<bool> {
        Ok(self.entries.remove(key).is_some())
    }
}
