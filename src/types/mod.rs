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

//! Type definitions for the Delta Sharing client.
//!
//! - `sharing`: protocol request/response types and query results

pub mod sharing;

// Re-export commonly used types
pub use sharing::{
    CdfOptions, DataFile, Format, Metadata, Page, PageRequest, Protocol, QueryTableRequest,
    Schema, Share, Table, TableChangesResult, TableMetadata, TableQueryResult,
    SUPPORTED_READER_VERSION,
};
