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

//! Decoder for newline-delimited action logs.
//!
//! Every line of a metadata, query, or changes response is a JSON object with
//! exactly one top-level key naming the action:
//!
//! ```text
//! {"protocol":{"minReaderVersion":1}}
//! {"metaData":{"id":"t1","format":{"provider":"parquet"},...}}
//! {"file":{"url":"https://...","id":"f1","size":1024,...}}
//! ```
//!
//! The first two lines are always `protocol` then `metaData`. A response with
//! too few lines yields [`DecodeError::TooFewRecords`], which callers can tell
//! apart from a line that does not parse ([`DecodeError::Malformed`]).
//!
//! Decoding is pure: no I/O, no retries, no logging.

use crate::types::sharing::{
    DataFile, Metadata, Page, Protocol, TableChangesResult, TableMetadata, TableQueryResult,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// One record of the action log. The variant is selected by the record's
/// single top-level key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    #[serde(rename = "protocol")]
    Protocol(Protocol),
    #[serde(rename = "metaData", alias = "metadata")]
    Metadata(Metadata),
    #[serde(rename = "file")]
    File(DataFile),
    #[serde(rename = "add")]
    Add(DataFile),
    #[serde(rename = "cdf", alias = "cdc")]
    Cdc(DataFile),
    #[serde(rename = "remove")]
    Remove(DataFile),
}

impl Action {
    /// Wire key of this action.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Protocol(_) => "protocol",
            Action::Metadata(_) => "metaData",
            Action::File(_) => "file",
            Action::Add(_) => "add",
            Action::Cdc(_) => "cdf",
            Action::Remove(_) => "remove",
        }
    }
}

/// Errors produced while decoding a response. Line numbers are 1-based
/// positions in the response body.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("expected at least {expected} record(s), got {actual}")]
    TooFewRecords { expected: usize, actual: usize },

    #[error("line {line}: {source}")]
    Malformed {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("line {line}: expected {expected} action, found {found}")]
    UnexpectedAction {
        line: usize,
        expected: &'static str,
        found: &'static str,
    },
}

/// Decode a single record into an [`Action`].
pub fn decode_action(record: &[u8]) -> Result<Action, serde_json::Error> {
    serde_json::from_slice(record)
}

/// Drop blank records, remembering the 1-based line number of the rest.
fn numbered<B: AsRef<[u8]>>(records: &[B]) -> Vec<(usize, &[u8])> {
    records
        .iter()
        .enumerate()
        .map(|(i, r)| (i + 1, r.as_ref()))
        .filter(|(_, r)| !r.iter().all(u8::is_ascii_whitespace))
        .collect()
}

fn decode_numbered(line: usize, record: &[u8]) -> Result<Action, DecodeError> {
    decode_action(record).map_err(|source| DecodeError::Malformed { line, source })
}

/// Decode the mandatory protocol + metadata prefix.
fn decode_header(records: &[(usize, &[u8])]) -> Result<(Protocol, Metadata), DecodeError> {
    if records.len() < 2 {
        return Err(DecodeError::TooFewRecords {
            expected: 2,
            actual: records.len(),
        });
    }

    let (line, record) = records[0];
    let protocol = match decode_numbered(line, record)? {
        Action::Protocol(p) => p,
        other => {
            return Err(DecodeError::UnexpectedAction {
                line,
                expected: "protocol",
                found: other.kind(),
            })
        }
    };

    let (line, record) = records[1];
    let metadata = match decode_numbered(line, record)? {
        Action::Metadata(m) => m,
        other => {
            return Err(DecodeError::UnexpectedAction {
                line,
                expected: "metaData",
                found: other.kind(),
            })
        }
    };

    Ok((protocol, metadata))
}

/// Decode the first record of a list endpoint response as a page.
pub fn decode_page<T: DeserializeOwned, B: AsRef<[u8]>>(
    records: &[B],
) -> Result<Page<T>, DecodeError> {
    let records = numbered(records);
    let Some(&(line, record)) = records.first() else {
        return Err(DecodeError::TooFewRecords {
            expected: 1,
            actual: 0,
        });
    };
    serde_json::from_slice(record).map_err(|source| DecodeError::Malformed { line, source })
}

/// Decode a `GET .../metadata` response. Records after the metadata are ignored.
pub fn decode_table_metadata<B: AsRef<[u8]>>(records: &[B]) -> Result<TableMetadata, DecodeError> {
    let records = numbered(records);
    let (protocol, metadata) = decode_header(&records)?;
    Ok(TableMetadata { protocol, metadata })
}

/// Decode a `POST .../query` response. Every record after the header must be
/// a `file` action; order is preserved.
pub fn decode_query_response<B: AsRef<[u8]>>(
    records: &[B],
) -> Result<TableQueryResult, DecodeError> {
    let records = numbered(records);
    let (protocol, metadata) = decode_header(&records)?;

    let mut files = Vec::with_capacity(records.len() - 2);
    for &(line, record) in &records[2..] {
        match decode_numbered(line, record)? {
            Action::File(f) => files.push(f),
            other => {
                return Err(DecodeError::UnexpectedAction {
                    line,
                    expected: "file",
                    found: other.kind(),
                })
            }
        }
    }

    Ok(TableQueryResult {
        protocol,
        metadata,
        files,
    })
}

/// Decode a `GET .../changes` response into add/cdf/remove groups.
pub fn decode_changes_response<B: AsRef<[u8]>>(
    records: &[B],
) -> Result<TableChangesResult, DecodeError> {
    let records = numbered(records);
    let (protocol, metadata) = decode_header(&records)?;

    let mut result = TableChangesResult {
        protocol,
        metadata,
        adds: Vec::new(),
        cdcs: Vec::new(),
        removes: Vec::new(),
    };

    for &(line, record) in &records[2..] {
        match decode_numbered(line, record)? {
            Action::Add(f) => result.adds.push(f),
            Action::Cdc(f) => result.cdcs.push(f),
            Action::Remove(f) => result.removes.push(f),
            other => {
                return Err(DecodeError::UnexpectedAction {
                    line,
                    expected: "add, cdf or remove",
                    found: other.kind(),
                })
            }
        }
    }

    Ok(result)
}
