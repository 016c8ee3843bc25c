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

//! REST client implementation.
//!
//! This module implements the `SharingClient` trait over the Delta Sharing
//! REST endpoints:
//!
//! | Operation | Request |
//! |---|---|
//! | `list_shares` | `GET /shares` |
//! | `list_schemas` | `GET /shares/{share}/schemas` |
//! | `list_tables` | `GET /shares/{share}/schemas/{schema}/tables` |
//! | `list_all_tables_in_share` | `GET /shares/{share}/all-tables` |
//! | `get_table_version` | `HEAD /shares/{share}/schemas/{schema}/tables/{table}` |
//! | `get_table_metadata` | `GET .../tables/{table}/metadata` |
//! | `query_table` | `POST .../tables/{table}/query` |
//! | `query_table_changes` | `GET .../tables/{table}/changes` |

use crate::client::{SharingClient, SharingHttpClient};
use crate::error::{Error, Result};
use crate::reader::decoder::{
    decode_changes_response, decode_page, decode_query_response, decode_table_metadata,
};
use crate::types::sharing::{
    CdfOptions, Page, PageRequest, Protocol, QueryTableRequest, Schema, Share, Table,
    TableChangesResult, TableMetadata, TableQueryResult, SUPPORTED_READER_VERSION,
};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Response header carrying the table version.
pub const TABLE_VERSION_HEADER: &str = "delta-table-version";

/// Sharing protocol client over HTTP.
///
/// Immutable and cheap to clone. Each clone can carry its own cancellation
/// token via [`with_cancel_token`](RestClient::with_cancel_token), so
/// concurrent callers sharing one connection pool can cancel independently.
#[derive(Debug, Clone)]
pub struct RestClient {
    http_client: Arc<SharingHttpClient>,
    cancel_token: CancellationToken,
}

impl RestClient {
    pub fn new(http_client: Arc<SharingHttpClient>) -> Self {
        Self {
            http_client,
            cancel_token: CancellationToken::new(),
        }
    }

    /// A client whose requests abort with `Cancelled` once `token` is cancelled.
    pub fn with_cancel_token(&self, token: CancellationToken) -> Self {
        Self {
            http_client: Arc::clone(&self.http_client),
            cancel_token: token,
        }
    }

    pub fn http_client(&self) -> &Arc<SharingHttpClient> {
        &self.http_client
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel_token
    }

    /// Trim an identifier for use as a path segment; empty is an error.
    fn segment<'a>(op: &'static str, what: &str, value: &'a str) -> Result<&'a str> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(Error::invalid_argument(
                op,
                format!("{} name is empty", what),
            ));
        }
        Ok(trimmed)
    }

    fn share_path(op: &'static str, share: &str) -> Result<String> {
        Ok(format!("/shares/{}", Self::segment(op, "share", share)?))
    }

    fn schema_path(op: &'static str, share: &str, schema: &str) -> Result<String> {
        Ok(format!(
            "{}/schemas/{}",
            Self::share_path(op, share)?,
            Self::segment(op, "schema", schema)?
        ))
    }

    fn table_path(op: &'static str, table: &Table) -> Result<String> {
        Ok(format!(
            "{}/tables/{}",
            Self::schema_path(op, &table.share, &table.schema)?,
            Self::segment(op, "table", &table.name)?
        ))
    }

    async fn get_page<T: serde::de::DeserializeOwned>(
        &self,
        op: &'static str,
        path: &str,
        page: &PageRequest,
    ) -> Result<Page<T>> {
        let records = self
            .http_client
            .get_with_retry(op, path, page, &self.cancel_token)
            .await?;
        let page: Page<T> =
            decode_page(&records).map_err(|e| Error::from_decode(op, path, e))?;
        debug!(
            "{} {}: {} item(s), more={}",
            op,
            path,
            page.items.len(),
            page.has_more()
        );
        Ok(page)
    }

    /// Reject tables that need a newer reader.
    fn check_protocol(op: &'static str, path: &str, protocol: &Protocol) -> Result<()> {
        if protocol.is_supported() {
            return Ok(());
        }
        Err(Error::UnsupportedReaderVersion {
            op,
            path: path.to_string(),
            required: protocol.min_reader_version,
            supported: SUPPORTED_READER_VERSION,
        })
    }

    fn parse_table_version(op: &'static str, path: &str, headers: &HeaderMap) -> Result<i64> {
        let value = headers.get(TABLE_VERSION_HEADER).ok_or_else(|| {
            Error::protocol_violation(op, path, "missing Delta-Table-Version header")
        })?;
        let value = value.to_str().map_err(|_| {
            Error::protocol_violation(op, path, "Delta-Table-Version header is not valid text")
        })?;
        let version: i64 = value.trim().parse().map_err(|_| {
            Error::protocol_violation(
                op,
                path,
                format!("Delta-Table-Version header is not an integer: {:?}", value),
            )
        })?;
        if version < 0 {
            return Err(Error::protocol_violation(
                op,
                path,
                format!("Delta-Table-Version header is negative: {}", version),
            ));
        }
        Ok(version)
    }
}

#[async_trait]
impl SharingClient for RestClient {
    async fn list_shares(&self, page: &PageRequest) -> Result<Page<Share>> {
        self.get_page("list_shares", "/shares", page).await
    }

    async fn list_schemas(&self, share: &Share, page: &PageRequest) -> Result<Page<Schema>> {
        const OP: &str = "list_schemas";
        let path = format!("{}/schemas", Self::share_path(OP, &share.name)?);
        self.get_page(OP, &path, page).await
    }

    async fn list_tables(&self, schema: &Schema, page: &PageRequest) -> Result<Page<Table>> {
        const OP: &str = "list_tables";
        let path = format!("{}/tables", Self::schema_path(OP, &schema.share, &schema.name)?);
        self.get_page(OP, &path, page).await
    }

    async fn list_all_tables_in_share(
        &self,
        share: &Share,
        page: &PageRequest,
    ) -> Result<Page<Table>> {
        const OP: &str = "list_all_tables";
        let path = format!("{}/all-tables", Self::share_path(OP, &share.name)?);
        self.get_page(OP, &path, page).await
    }

    async fn get_table_version(&self, table: &Table) -> Result<i64> {
        const OP: &str = "get_table_version";
        let path = Self::table_path(OP, table)?;
        let headers = self
            .http_client
            .head(OP, &path, &self.cancel_token)
            .await?;
        let version = Self::parse_table_version(OP, &path, &headers)?;
        debug!("{} {}: version {}", OP, path, version);
        Ok(version)
    }

    async fn get_table_metadata(&self, table: &Table) -> Result<TableMetadata> {
        const OP: &str = "get_table_metadata";
        let path = format!("{}/metadata", Self::table_path(OP, table)?);
        let records = self
            .http_client
            .get(OP, &path, &self.cancel_token)
            .await?;
        let result = decode_table_metadata(&records).map_err(|e| Error::from_decode(OP, &path, e))?;
        Self::check_protocol(OP, &path, &result.protocol)?;
        Ok(result)
    }

    async fn query_table(
        &self,
        table: &Table,
        request: &QueryTableRequest,
    ) -> Result<TableQueryResult> {
        const OP: &str = "query_table";
        let path = format!("{}/query", Self::table_path(OP, table)?);
        let records = self
            .http_client
            .post_query(OP, &path, request, &self.cancel_token)
            .await?;
        let result = decode_query_response(&records).map_err(|e| Error::from_decode(OP, &path, e))?;
        Self::check_protocol(OP, &path, &result.protocol)?;
        debug!("{} {}: {} file(s)", OP, path, result.files.len());
        Ok(result)
    }

    async fn query_table_changes(
        &self,
        table: &Table,
        options: &CdfOptions,
    ) -> Result<TableChangesResult> {
        const OP: &str = "query_table_changes";
        if options.starting_version.is_none() && options.starting_timestamp.is_none() {
            return Err(Error::invalid_argument(
                OP,
                "either starting_version or starting_timestamp is required",
            ));
        }
        let path = format!("{}/changes", Self::table_path(OP, table)?);
        let records = self
            .http_client
            .get_with_query(OP, &path, &options.query_pairs(), &self.cancel_token)
            .await?;
        let result =
            decode_changes_response(&records).map_err(|e| Error::from_decode(OP, &path, e))?;
        Self::check_protocol(OP, &path, &result.protocol)?;
        debug!(
            "{} {}: {} add, {} cdf, {} remove",
            OP,
            path,
            result.adds.len(),
            result.cdcs.len(),
            result.removes.len()
        );
        Ok(result)
    }
}
