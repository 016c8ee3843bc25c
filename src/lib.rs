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

//! Delta Sharing client for Rust
//!
//! This crate implements the recipient side of the Delta Sharing REST
//! protocol: listing shares, schemas and tables, reading table versions and
//! metadata, listing a table's data files, and downloading those files
//! through an optional local cache.
//!
//! ## Overview
//!
//! - [`DeltaSharingClient`] - Entry point; protocol calls plus cached file reads
//! - [`ClientConfig`] - String-keyed options that build a client
//! - [`SharingClient`] - The protocol operations, implemented by [`RestClient`]
//! - [`FileCache`] - Download-through cache keyed by URL host and path
//!
//! ## Example
//!
//! ```ignore
//! use delta_sharing::{DeltaSharingClient, HttpClientConfig, SharingClient};
//!
//! let (client, table) = DeltaSharingClient::for_table_url(
//!     "/etc/sharing/open-datasets.share#delta_sharing.default.COVID_19_NYT",
//!     HttpClientConfig::default(),
//! )?;
//! let client = client.with_cache_dir("/var/cache/delta-sharing");
//!
//! let version = client.get_table_version(&table).await?;
//! let listing = client.list_files_in_table(&table).await?;
//! let first = client.read_file(&listing.files[0]).await?;
//! ```
//!
//! ## Configuration Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `delta_sharing.profile` | | Profile file path |
//! | `delta_sharing.max_retries` | 5 | Retries after the first attempt |
//! | `delta_sharing.retry_delay_ms` | 500 | Base retry delay in ms |
//! | `delta_sharing.max_retry_delay_ms` | 10000 | Retry delay cap in ms |
//! | `delta_sharing.connect_timeout_ms` | 30000 | Connect timeout in ms |
//! | `delta_sharing.request_timeout_ms` | 120000 | Per-request deadline in ms |
//! | `delta_sharing.user_agent` | `delta-sharing-rs/<version>` | User agent |
//! | `delta_sharing.cache.dir` | | Cache directory (no cache when unset) |
//! | `delta_sharing.log_level` | | `off`, `error`, `warn`, `info`, `debug`, `trace` |
//! | `delta_sharing.log_file` | | Log file (stderr when unset) |

pub mod auth;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod profile;
pub mod reader;
pub mod sharing;
pub mod types;

// Re-export main types
pub use config::ClientConfig;
pub use error::{Error, ErrorKind, Result};
pub use profile::{Profile, TableUrl};
pub use sharing::DeltaSharingClient;

// Re-export client types for advanced users
pub use cache::{CacheKey, CacheStore, DirectoryStore, FileCache, MemoryStore};
pub use client::{HttpClientConfig, RestClient, RetryPolicy, SharingClient, SharingHttpClient};

pub use types::sharing::{
    CdfOptions, DataFile, Metadata, Page, PageRequest, Protocol, QueryTableRequest, Schema,
    Share, Table, TableChangesResult, TableMetadata, TableQueryResult,
};
