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

//! Delta Sharing protocol request/response types.
//!
//! These types map directly to the JSON structures exchanged with a Delta
//! Sharing server. Unknown fields are ignored so newer servers stay readable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Highest `minReaderVersion` this client can read.
pub const SUPPORTED_READER_VERSION: i32 = 1;

/// Files are considered expired this many seconds before their actual
/// expiration time so a download does not race the deadline.
pub const FILE_EXPIRY_BUFFER_SECS: i64 = 30;

/// A named collection of schemas exposed to the recipient.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Share {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Share {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
        }
    }
}

/// A namespace of tables within a share.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Schema {
    pub name: String,
    pub share: String,
}

impl Schema {
    pub fn new(share: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            share: share.into(),
        }
    }
}

/// A named, versioned table within a schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub name: String,
    pub schema: String,
    pub share: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Table {
    pub fn new(
        share: impl Into<String>,
        schema: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            schema: schema.into(),
            share: share.into(),
            share_id: None,
            id: None,
        }
    }
}

/// One page of a list endpoint response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// Servers omit `items` entirely for an empty page.
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default, deserialize_with = "deserialize_page_token")]
    pub next_page_token: Option<String>,
}

impl<T> Page<T> {
    pub fn has_more(&self) -> bool {
        self.next_page_token.is_some()
    }
}

/// An empty token is the same as no token.
fn deserialize_page_token<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.filter(|s| !s.is_empty()))
}

/// Pagination parameters for list endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub max_results: Option<u32>,
    pub page_token: Option<String>,
}

impl PageRequest {
    pub fn with_max_results(max_results: u32) -> Self {
        Self {
            max_results: Some(max_results),
            page_token: None,
        }
    }

    /// Continue from `token` with the same page size.
    pub fn next(&self, token: impl Into<String>) -> Self {
        Self {
            max_results: self.max_results,
            page_token: Some(token.into()),
        }
    }

    /// Query parameters for this request; unset fields are omitted.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(2);
        if let Some(max) = self.max_results {
            pairs.push(("maxResults", max.to_string()));
        }
        if let Some(ref token) = self.page_token {
            pairs.push(("pageToken", token.clone()));
        }
        pairs
    }
}

/// Reader compatibility floor of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Protocol {
    pub min_reader_version: i32,
}

impl Protocol {
    pub fn is_supported(&self) -> bool {
        self.min_reader_version <= SUPPORTED_READER_VERSION
    }
}

/// File format of a table. Servers send `{"provider":"parquet"}`; older
/// clients used `type`, which is accepted as an alias.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Format {
    #[serde(default, alias = "type")]
    pub provider: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub options: HashMap<String, String>,
}

/// Table metadata. `schema_string` is a serialized logical schema that this
/// crate passes through untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub format: Format,
    #[serde(default)]
    pub schema_string: String,
    #[serde(default)]
    pub partition_columns: Vec<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub configuration: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
}

/// A physical data file. Also the payload of `add`, `cdf`, and `remove`
/// actions in a change data feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataFile {
    /// Presigned, short-lived URL. Fresh per query.
    pub url: String,
    pub id: String,
    #[serde(default)]
    pub partition_values: HashMap<String, String>,
    /// Size in bytes.
    pub size: i64,
    /// Column statistics as a JSON string, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    /// Epoch milliseconds after which `url` stops working.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_timestamp: Option<i64>,
}

impl DataFile {
    /// When the presigned URL expires, if the server said.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expiration_timestamp
            .and_then(DateTime::<Utc>::from_timestamp_millis)
    }

    /// Check if the URL is expired (with safety buffer). Files without an
    /// expiration timestamp never report expiry.
    pub fn is_expired(&self) -> bool {
        match self.expires_at() {
            Some(expiration) => {
                Utc::now() + chrono::Duration::seconds(FILE_EXPIRY_BUFFER_SECS) >= expiration
            }
            None => false,
        }
    }
}

/// Body of `POST .../query`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryTableRequest {
    pub predicate_hints: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_hint: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
}

impl QueryTableRequest {
    /// Unfiltered listing: no predicate hints, zero limit hint.
    pub fn full_listing() -> Self {
        Self {
            predicate_hints: Vec::new(),
            limit_hint: Some(0),
            version: None,
        }
    }
}

/// Bounds for a change data feed query. At least one starting bound is required.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CdfOptions {
    pub starting_version: Option<i64>,
    pub ending_version: Option<i64>,
    pub starting_timestamp: Option<String>,
    pub ending_timestamp: Option<String>,
}

impl CdfOptions {
    pub fn from_version(starting_version: i64) -> Self {
        Self {
            starting_version: Some(starting_version),
            ..Default::default()
        }
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(v) = self.starting_version {
            pairs.push(("startingVersion", v.to_string()));
        }
        if let Some(v) = self.ending_version {
            pairs.push(("endingVersion", v.to_string()));
        }
        if let Some(ref ts) = self.starting_timestamp {
            pairs.push(("startingTimestamp", ts.clone()));
        }
        if let Some(ref ts) = self.ending_timestamp {
            pairs.push(("endingTimestamp", ts.clone()));
        }
        pairs
    }
}

/// Result of `GET .../metadata`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMetadata {
    pub protocol: Protocol,
    pub metadata: Metadata,
}

/// Result of `POST .../query`. Files are in server order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableQueryResult {
    pub protocol: Protocol,
    pub metadata: Metadata,
    pub files: Vec<DataFile>,
}

/// Result of `GET .../changes`. Each group is in server order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableChangesResult {
    pub protocol: Protocol,
    pub metadata: Metadata,
    pub adds: Vec<DataFile>,
    pub cdcs: Vec<DataFile>,
    pub removes: Vec<DataFile>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_file() -> DataFile {
        DataFile {
            url: "https://store.example.com/sales/part-0.parquet?sig=abc".to_string(),
            id: "f1".to_string(),
            partition_values: HashMap::from([("date".to_string(), "2021-04-28".to_string())]),
            size: 1024,
            stats: Some(r#"{"numRecords":1}"#.to_string()),
            version: Some(3),
            timestamp: Some(1_651_000_000_000),
            expiration_timestamp: None,
        }
    }

    #[test]
    fn test_data_file_round_trip() {
        let file = sample_file();
        let json = serde_json::to_string(&file).unwrap();
        assert!(json.contains(r#""partitionValues""#));
        let decoded: DataFile = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, file);
    }

    #[test]
    fn test_data_file_minimal() {
        let json = r#"{"url":"https://store/f1.parquet","id":"f1","size":1024}"#;
        let file: DataFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.id, "f1");
        assert_eq!(file.size, 1024);
        assert!(file.partition_values.is_empty());
        assert!(file.stats.is_none());
        assert!(!file.is_expired());
    }

    #[test]
    fn test_data_file_expiry() {
        let mut file = sample_file();
        file.expiration_timestamp = Some((Utc::now() - chrono::Duration::minutes(1)).timestamp_millis());
        assert!(file.is_expired());

        // Inside the safety buffer counts as expired.
        file.expiration_timestamp = Some((Utc::now() + chrono::Duration::seconds(5)).timestamp_millis());
        assert!(file.is_expired());

        file.expiration_timestamp = Some((Utc::now() + chrono::Duration::hours(1)).timestamp_millis());
        assert!(!file.is_expired());
        assert!(file.expires_at().is_some());
    }

    #[test]
    fn test_page_defaults() {
        let page: Page<Share> = serde_json::from_str("{}").unwrap();
        assert!(page.items.is_empty());
        assert!(!page.has_more());

        let page: Page<Share> =
            serde_json::from_str(r#"{"items":[{"name":"sales","id":"s1"}],"nextPageToken":""}"#)
                .unwrap();
        assert_eq!(page.items, vec![Share { name: "sales".into(), id: Some("s1".into()) }]);
        assert_eq!(page.next_page_token, None);

        let page: Page<Schema> = serde_json::from_str(
            r#"{"items":[{"name":"default","share":"sales"}],"nextPageToken":"t2"}"#,
        )
        .unwrap();
        assert_eq!(page.next_page_token.as_deref(), Some("t2"));
    }

    #[test]
    fn test_table_deserialization() {
        let json = r#"{"name":"orders","schema":"default","share":"sales","shareId":"s1","id":"t1"}"#;
        let table: Table = serde_json::from_str(json).unwrap();
        assert_eq!(table.name, "orders");
        assert_eq!(table.share_id.as_deref(), Some("s1"));
    }

    #[test]
    fn test_metadata_format_alias() {
        let json = r#"{"id":"t1","format":{"type":"parquet"},"schemaString":"{}","partitionColumns":["date"]}"#;
        let metadata: Metadata = serde_json::from_str(json).unwrap();
        assert_eq!(metadata.format.provider, "parquet");
        assert_eq!(metadata.partition_columns, vec!["date".to_string()]);
        assert!(metadata.name.is_none());
    }

    #[test]
    fn test_query_request_serialization() {
        let body = serde_json::to_value(QueryTableRequest::full_listing()).unwrap();
        assert_eq!(body, serde_json::json!({"predicateHints": [], "limitHint": 0}));

        let req = QueryTableRequest {
            predicate_hints: vec!["date = '2021-04-28'".to_string()],
            limit_hint: None,
            version: Some(5),
        };
        let body = serde_json::to_value(req).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"predicateHints": ["date = '2021-04-28'"], "version": 5})
        );
    }

    #[test]
    fn test_page_request_query_pairs() {
        assert!(PageRequest::default().query_pairs().is_empty());
        let next = PageRequest::with_max_results(10).next("tok");
        assert_eq!(
            next.query_pairs(),
            vec![("maxResults", "10".to_string()), ("pageToken", "tok".to_string())]
        );
    }

    #[test]
    fn test_cdf_query_pairs() {
        let opts = CdfOptions {
            ending_version: Some(7),
            ..CdfOptions::from_version(2)
        };
        assert_eq!(
            opts.query_pairs(),
            vec![("startingVersion", "2".to_string()), ("endingVersion", "7".to_string())]
        );
    }

    #[test]
    fn test_protocol_supported() {
        assert!(Protocol { min_reader_version: 1 }.is_supported());
        assert!(!Protocol { min_reader_version: 2 }.is_supported());
    }
}
