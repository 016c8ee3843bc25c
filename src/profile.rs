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

//! Sharing profiles and table URLs.
//!
//! A profile is the JSON credential file a provider hands to a recipient:
//!
//! ```json
//! {
//!   "shareCredentialsVersion": 1,
//!   "endpoint": "https://sharing.example.com/delta-sharing/",
//!   "bearerToken": "<token>",
//!   "expirationTime": "2021-11-12T00:12:29.0Z"
//! }
//! ```
//!
//! A table URL names a profile file plus a table: `<profile>#<share>.<schema>.<table>`.

use crate::error::{Error, Result};
use crate::types::sharing::Table;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::Path;

/// Highest `shareCredentialsVersion` this client understands.
pub const SUPPORTED_CREDENTIALS_VERSION: i32 = 1;

/// Credentials and endpoint for a sharing server.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub share_credentials_version: i32,
    pub endpoint: String,
    pub bearer_token: String,
    #[serde(default)]
    pub expiration_time: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Profile")
            .field("share_credentials_version", &self.share_credentials_version)
            .field("endpoint", &self.endpoint)
            .field("bearer_token", &"<redacted>")
            .field("expiration_time", &self.expiration_time)
            .finish()
    }
}

impl Profile {
    pub fn new(endpoint: impl Into<String>, bearer_token: impl Into<String>) -> Self {
        Self {
            share_credentials_version: SUPPORTED_CREDENTIALS_VERSION,
            endpoint: endpoint.into(),
            bearer_token: bearer_token.into(),
            expiration_time: None,
        }
    }

    /// Parse and validate a profile from its JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        let profile: Profile = serde_json::from_str(json).map_err(|e| {
            Error::invalid_argument("load_profile", format!("invalid profile JSON: {}", e))
        })?;
        profile.validate()?;
        Ok(profile)
    }

    /// Read, parse and validate a profile file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            Error::invalid_argument(
                "load_profile",
                format!("failed to read profile {}: {}", path.display(), e),
            )
        })?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.share_credentials_version > SUPPORTED_CREDENTIALS_VERSION {
            return Err(Error::invalid_argument(
                "load_profile",
                format!(
                    "shareCredentialsVersion {} is not supported (max {})",
                    self.share_credentials_version, SUPPORTED_CREDENTIALS_VERSION
                ),
            ));
        }
        if self.endpoint.trim().is_empty() {
            return Err(Error::invalid_argument("load_profile", "endpoint is empty"));
        }
        url::Url::parse(self.endpoint.trim()).map_err(|e| {
            Error::invalid_argument("load_profile", format!("invalid endpoint: {}", e))
        })?;
        if self.bearer_token.is_empty() {
            return Err(Error::invalid_argument("load_profile", "bearerToken is empty"));
        }
        Ok(())
    }

    /// Endpoint without trailing slashes, ready for path concatenation.
    pub fn base_url(&self) -> &str {
        self.endpoint.trim().trim_end_matches('/')
    }

    pub fn is_expired(&self) -> bool {
        self.expiration_time
            .map(|expiration| Utc::now() >= expiration)
            .unwrap_or(false)
    }
}

/// `<profile-path>#<share>.<schema>.<table>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableUrl {
    pub profile_path: String,
    pub share: String,
    pub schema: String,
    pub table: String,
}

impl TableUrl {
    pub fn parse(url: &str) -> Result<Self> {
        let invalid = |reason: &str| {
            Error::invalid_argument("parse_table_url", format!("{}: {}", reason, url))
        };

        let (profile_path, fragment) = url
            .rsplit_once('#')
            .ok_or_else(|| invalid("missing '#' separator"))?;
        if profile_path.is_empty() {
            return Err(invalid("missing profile path"));
        }

        let parts: Vec<&str> = fragment.split('.').map(str::trim).collect();
        let [share, schema, table] = parts.as_slice() else {
            return Err(invalid("expected <share>.<schema>.<table>"));
        };
        if share.is_empty() || schema.is_empty() || table.is_empty() {
            return Err(invalid("empty share, schema or table name"));
        }

        Ok(Self {
            profile_path: profile_path.to_string(),
            share: share.to_string(),
            schema: schema.to_string(),
            table: table.to_string(),
        })
    }

    pub fn table(&self) -> Table {
        Table::new(&self.share, &self.schema, &self.table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::Write;

    const PROFILE: &str = r#"{
        "shareCredentialsVersion": 1,
        "endpoint": "https://sharing.example.com/delta-sharing/",
        "bearerToken": "faaie590d541265bcab1f2de9813274bf233"
    }"#;

    #[test]
    fn test_profile_from_json() {
        let profile = Profile::from_json(PROFILE).unwrap();
        assert_eq!(profile.share_credentials_version, 1);
        assert_eq!(profile.base_url(), "https://sharing.example.com/delta-sharing");
        assert!(profile.expiration_time.is_none());
        assert!(!profile.is_expired());
        assert!(!format!("{:?}", profile).contains("faaie590"));
    }

    #[test]
    fn test_profile_expiration() {
        let json = r#"{"shareCredentialsVersion":1,"endpoint":"https://x/","bearerToken":"t","expirationTime":"2021-11-12T00:12:29.0Z"}"#;
        let profile = Profile::from_json(json).unwrap();
        assert!(profile.is_expired());
    }

    #[test]
    fn test_profile_validation() {
        let json = r#"{"shareCredentialsVersion":2,"endpoint":"https://x/","bearerToken":"t"}"#;
        assert_eq!(
            Profile::from_json(json).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );

        let json = r#"{"shareCredentialsVersion":1,"endpoint":"","bearerToken":"t"}"#;
        assert!(Profile::from_json(json).is_err());

        let json = r#"{"shareCredentialsVersion":1,"endpoint":"not a url","bearerToken":"t"}"#;
        assert!(Profile::from_json(json).is_err());

        assert!(Profile::from_json("{").is_err());
    }

    #[test]
    fn test_profile_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(PROFILE.as_bytes()).unwrap();
        let profile = Profile::from_file(file.path()).unwrap();
        assert_eq!(profile.bearer_token, "faaie590d541265bcab1f2de9813274bf233");

        let err = Profile::from_file("/nonexistent/profile.share").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_table_url_parse() {
        let url = TableUrl::parse("/tmp/open-datasets.share#delta_sharing. default .COVID_19_NYT").unwrap();
        assert_eq!(url.profile_path, "/tmp/open-datasets.share");
        assert_eq!(url.share, "delta_sharing");
        assert_eq!(url.schema, "default");
        assert_eq!(url.table, "COVID_19_NYT");
        assert_eq!(url.table(), Table::new("delta_sharing", "default", "COVID_19_NYT"));
    }

    #[test]
    fn test_table_url_uses_last_hash() {
        let url = TableUrl::parse("/tmp/a#b/profile.share#s.d.t").unwrap();
        assert_eq!(url.profile_path, "/tmp/a#b/profile.share");
        assert_eq!(url.table, "t");
    }

    #[test]
    fn test_table_url_invalid() {
        for bad in [
            "profile.share",
            "#s.d.t",
            "profile.share#s.d",
            "profile.share#s.d.t.x",
            "profile.share#s. .t",
        ] {
            let err = TableUrl::parse(bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument, "{}", bad);
        }
    }
}
