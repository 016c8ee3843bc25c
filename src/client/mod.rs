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

//! Client implementations for communicating with Delta Sharing servers.
//!
//! This module provides:
//! - `SharingClient` trait: Abstract interface for the sharing protocol
//! - `SharingHttpClient`: Low-level HTTP client with retry logic
//! - `RestClient`: Implementation over the REST endpoints
//! - `RetryPolicy`: The retry loop shared by all retried requests

pub mod http;
pub mod rest;
pub mod retry;

use crate::error::{Error, Result};
use crate::types::sharing::{
    CdfOptions, Page, PageRequest, QueryTableRequest, Schema, Share, Table, TableChangesResult,
    TableMetadata, TableQueryResult,
};
use async_trait::async_trait;

pub use http::{HttpClientConfig, SharingHttpClient};
pub use rest::RestClient;
pub use retry::RetryPolicy;

/// Abstract interface for a Delta Sharing server.
///
/// Implementations handle one request per method. The provided methods
/// (`list_all_tables`, `list_files_in_table`) are built on top of the
/// required ones and work for any implementation.
#[async_trait]
pub trait SharingClient: Send + Sync + std::fmt::Debug {
    // --- Listing ---

    /// One page of shares.
    async fn list_shares(&self, page: &PageRequest) -> Result<Page<Share>>;

    /// One page of schemas in a share.
    async fn list_schemas(&self, share: &Share, page: &PageRequest) -> Result<Page<Schema>>;

    /// One page of tables in a schema.
    async fn list_tables(&self, schema: &Schema, page: &PageRequest) -> Result<Page<Table>>;

    /// One page of tables across all schemas of a share.
    async fn list_all_tables_in_share(
        &self,
        share: &Share,
        page: &PageRequest,
    ) -> Result<Page<Table>>;

    // --- Table reads ---

    /// Current version of a table, from the `Delta-Table-Version` header.
    async fn get_table_version(&self, table: &Table) -> Result<i64>;

    /// Protocol and metadata of a table.
    async fn get_table_metadata(&self, table: &Table) -> Result<TableMetadata>;

    /// Files of a table, as selected by `request`.
    async fn query_table(
        &self,
        table: &Table,
        request: &QueryTableRequest,
    ) -> Result<TableQueryResult>;

    /// Change data feed of a table.
    async fn query_table_changes(
        &self,
        table: &Table,
        options: &CdfOptions,
    ) -> Result<TableChangesResult>;

    // --- Composed operations ---

    /// Every file of the current table version, unfiltered.
    async fn list_files_in_table(&self, table: &Table) -> Result<TableQueryResult> {
        self.query_table(table, &QueryTableRequest::full_listing())
            .await
    }

    /// Every table of every share, in share-list order.
    ///
    /// All pages are followed. Any failure aborts the whole listing.
    async fn list_all_tables(&self) -> Result<Vec<Table>> {
        let mut tables = Vec::new();
        let shares = collect_pages("list_shares", |page| async move {
            self.list_shares(&page).await
        })
        .await?;
        for share in &shares {
            let mut share_tables = collect_pages("list_all_tables", |page| async move {
                self.list_all_tables_in_share(share, &page).await
            })
            .await?;
            tables.append(&mut share_tables);
        }
        Ok(tables)
    }
}

/// Follow `next_page_token` until the server stops returning one.
///
/// A token the server already returned means the listing would never end, so
/// it is reported as a protocol violation.
pub(crate) async fn collect_pages<T, F, Fut>(op: &'static str, mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(PageRequest) -> Fut,
    Fut: std::future::Future<Output = Result<Page<T>>>,
{
    let mut items = Vec::new();
    let mut request = PageRequest::default();
    let mut seen_tokens = std::collections::HashSet::new();

    loop {
        let page = fetch(request.clone()).await?;
        items.extend(page.items);

        match page.next_page_token {
            Some(token) => {
                if !seen_tokens.insert(token.clone()) {
                    return Err(Error::protocol_violation(
                        op,
                        "",
                        format!("server repeated page token {:?}", token),
                    ));
                }
                request = request.next(token);
            }
            None => return Ok(items),
        }
    }
}
