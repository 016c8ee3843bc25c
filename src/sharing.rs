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

//! Top-level client: the protocol client plus an optional file cache.

use crate::auth::BearerToken;
use crate::cache::FileCache;
use crate::client::{HttpClientConfig, RestClient, SharingClient, SharingHttpClient};
use crate::error::{Error, Result};
use crate::profile::{Profile, TableUrl};
use crate::types::sharing::{
    CdfOptions, DataFile, Page, PageRequest, QueryTableRequest, Schema, Share, Table,
    TableChangesResult, TableMetadata, TableQueryResult,
};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Delta Sharing recipient client.
///
/// Implements [`SharingClient`] by delegating to a [`RestClient`], and adds
/// file reads that go through the cache when one is configured.
#[derive(Debug, Clone)]
pub struct DeltaSharingClient {
    rest_client: RestClient,
    cache: Option<Arc<FileCache>>,
}

impl DeltaSharingClient {
    /// Client for `profile`'s endpoint, without a cache.
    pub fn new(profile: &Profile, config: HttpClientConfig) -> Result<Self> {
        if profile.is_expired() {
            warn!(
                "Sharing profile for {} expired at {:?}",
                profile.base_url(),
                profile.expiration_time
            );
        }
        let auth = Arc::new(BearerToken::from_profile(profile));
        let http_client = Arc::new(SharingHttpClient::new(config, profile, auth)?);
        Ok(Self {
            rest_client: RestClient::new(http_client),
            cache: None,
        })
    }

    /// Load the profile named by a `<profile>#<share>.<schema>.<table>` URL and
    /// return a client for it together with the table.
    pub fn for_table_url(url: &str, config: HttpClientConfig) -> Result<(Self, Table)> {
        let table_url = TableUrl::parse(url)?;
        let profile = Profile::from_file(&table_url.profile_path)?;
        Ok((Self::new(&profile, config)?, table_url.table()))
    }

    /// Cache downloaded files under `dir`.
    pub fn with_cache_dir(self, dir: impl Into<PathBuf>) -> Self {
        let cache = FileCache::open_dir(dir, Arc::clone(self.rest_client.http_client()));
        self.with_cache(Arc::new(cache))
    }

    pub fn with_cache(mut self, cache: Arc<FileCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// A client whose requests and downloads abort once `token` is cancelled.
    /// The cache is shared with `self`.
    pub fn with_cancel_token(&self, token: CancellationToken) -> Self {
        Self {
            rest_client: self.rest_client.with_cancel_token(token),
            cache: self.cache.clone(),
        }
    }

    pub fn rest_client(&self) -> &RestClient {
        &self.rest_client
    }

    pub fn cache(&self) -> Option<&Arc<FileCache>> {
        self.cache.as_ref()
    }

    /// Contents of a data file, from the cache when possible.
    pub async fn read_file(&self, file: &DataFile) -> Result<Bytes> {
        const OP: &str = "read_file";
        if file.is_expired() {
            // A cached copy is still fine; a download will likely be refused.
            warn!(
                "URL for file {} expired at {:?}",
                file.id,
                file.expires_at()
            );
        }

        let cancel = self.rest_client.cancel_token();
        let data = match self.cache {
            Some(ref cache) => cache.fetch_cancellable(&file.url, cancel).await?,
            None => {
                self.rest_client
                    .http_client()
                    .download(OP, &file.url, cancel)
                    .await?
            }
        };

        if file.size >= 0 && data.len() as u64 != file.size as u64 {
            warn!(
                "File {} is {} bytes, server reported {}",
                file.id,
                data.len(),
                file.size
            );
        }
        Ok(data)
    }

    /// Contents of the `index`-th file of the table's current version.
    pub async fn read_table_file(&self, table: &Table, index: usize) -> Result<Bytes> {
        let listing = self.list_files_in_table(table).await?;
        let file = listing.files.get(index).ok_or_else(|| {
            Error::invalid_argument(
                "read_table_file",
                format!(
                    "file index {} out of range: {}.{}.{} has {} file(s)",
                    index,
                    table.share,
                    table.schema,
                    table.name,
                    listing.files.len()
                ),
            )
        })?;
        debug!("Reading file {} of {}.{}.{}", file.id, table.share, table.schema, table.name);
        self.read_file(file).await
    }
}

#[async_trait]
impl SharingClient for DeltaSharingClient {
    async fn list_shares(&self, page: &PageRequest) -> Result<Page<Share>> {
        self.rest_client.list_shares(page).await
    }

    async fn list_schemas(&self, share: &Share, page: &PageRequest) -> Result<Page<Schema>> {
        self.rest_client.list_schemas(share, page).await
    }

    async fn list_tables(&self, schema: &Schema, page: &PageRequest) -> Result<Page<Table>> {
        self.rest_client.list_tables(schema, page).await
    }

    async fn list_all_tables_in_share(
        &self,
        share: &Share,
        page: &PageRequest,
    ) -> Result<Page<Table>> {
        self.rest_client.list_all_tables_in_share(share, page).await
    }

    async fn get_table_version(&self, table: &Table) -> Result<i64> {
        self.rest_client.get_table_version(table).await
    }

    async fn get_table_metadata(&self, table: &Table) -> Result<TableMetadata> {
        self.rest_client.get_table_metadata(table).await
    }

    async fn query_table(
        &self,
        table: &Table,
        request: &QueryTableRequest,
    ) -> Result<TableQueryResult> {
        self.rest_client.query_table(table, request).await
    }

    async fn query_table_changes(
        &self,
        table: &Table,
        options: &CdfOptions,
    ) -> Result<TableChangesResult> {
        self.rest_client.query_table_changes(table, options).await
    }
}
