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

//! Error types for the Delta Sharing client.
//!
//! Every variant records the operation that failed (`op`, e.g. `list_shares`)
//! and, where a request was involved, the endpoint path or URL. Callers that
//! only care about the category can match on [`Error::kind`].

use crate::reader::decoder::DecodeError;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the Delta Sharing client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Connection, DNS, timeout, or body read failure.
    #[error("{op} {path}: transport failure: {source}")]
    Transport {
        op: &'static str,
        path: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-2xx status after retries were exhausted (or on a non-retryable status).
    #[error("{op} {path}: HTTP {status} after {attempts} attempt(s): {body}")]
    HttpStatus {
        op: &'static str,
        path: String,
        status: u16,
        attempts: u32,
        body: String,
    },

    /// The response could not be parsed or had the wrong envelope shape.
    #[error("{op} {path}: malformed response: {reason}")]
    MalformedResponse {
        op: &'static str,
        path: String,
        reason: String,
    },

    /// The response was structurally insufficient (too few records, missing header).
    #[error("{op} {path}: protocol violation: {reason}")]
    ProtocolViolation {
        op: &'static str,
        path: String,
        reason: String,
    },

    /// The table requires a newer reader than this client implements.
    #[error("{op} {path}: table requires reader version {required}, client supports {supported}")]
    UnsupportedReaderVersion {
        op: &'static str,
        path: String,
        required: i32,
        supported: i32,
    },

    /// Local cache storage read or write failure.
    #[error("{op} {key}: cache I/O failure: {source}")]
    CacheIo {
        op: &'static str,
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// Malformed caller input.
    #[error("{op}: invalid argument: {reason}")]
    InvalidArgument { op: &'static str, reason: String },

    /// The caller cancelled the operation.
    #[error("{op} {path}: cancelled")]
    Cancelled { op: &'static str, path: String },
}

/// Fieldless error category, for matching without destructuring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    HttpStatus,
    MalformedResponse,
    ProtocolViolation,
    UnsupportedReaderVersion,
    CacheIo,
    InvalidArgument,
    Cancelled,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Transport { .. } => ErrorKind::Transport,
            Error::HttpStatus { .. } => ErrorKind::HttpStatus,
            Error::MalformedResponse { .. } => ErrorKind::MalformedResponse,
            Error::ProtocolViolation { .. } => ErrorKind::ProtocolViolation,
            Error::UnsupportedReaderVersion { .. } => ErrorKind::UnsupportedReaderVersion,
            Error::CacheIo { .. } => ErrorKind::CacheIo,
            Error::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Error::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }

    /// Name of the operation that produced this error.
    pub fn op(&self) -> &'static str {
        match self {
            Error::Transport { op, .. }
            | Error::HttpStatus { op, .. }
            | Error::MalformedResponse { op, .. }
            | Error::ProtocolViolation { op, .. }
            | Error::UnsupportedReaderVersion { op, .. }
            | Error::CacheIo { op, .. }
            | Error::InvalidArgument { op, .. }
            | Error::Cancelled { op, .. } => *op,
        }
    }

    /// HTTP status code, for `HttpStatus` errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether a fresh attempt of the same request could succeed.
    ///
    /// Mirrors the retry classification: no response received, 429, or 5xx.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport { .. } => true,
            Error::HttpStatus { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }

    pub(crate) fn invalid_argument(op: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidArgument {
            op,
            reason: reason.into(),
        }
    }

    pub(crate) fn protocol_violation(
        op: &'static str,
        path: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Error::ProtocolViolation {
            op,
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(
        op: &'static str,
        path: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Error::MalformedResponse {
            op,
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Attach request context to a decoder failure.
    ///
    /// Too few records is a protocol violation ("server sent nothing"); every
    /// other decode failure is a malformed response ("server sent garbage").
    pub(crate) fn from_decode(op: &'static str, path: impl Into<String>, err: DecodeError) -> Self {
        match err {
            DecodeError::TooFewRecords { .. } => Error::protocol_violation(op, path, err.to_string()),
            _ => Error::malformed(op, path, err.to_string()),
        }
    }
}

/// 429 and every 5xx are transient.
pub(crate) fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}
