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

//! String-keyed client configuration.
//!
//! Options are set one at a time, typically from a config file or command
//! line, and then turned into a [`DeltaSharingClient`]:
//!
//! ```ignore
//! let mut config = ClientConfig::new();
//! config.set_option("delta_sharing.profile", "/etc/sharing/open-datasets.share")?;
//! config.set_option("delta_sharing.cache.dir", "/var/cache/delta-sharing")?;
//! config.set_option("delta_sharing.log_level", "debug")?;
//! let client = config.build()?;
//! ```

use crate::client::HttpClientConfig;
use crate::error::{Error, Result};
use crate::logging::{init_logging, LogConfig};
use crate::profile::Profile;
use crate::sharing::DeltaSharingClient;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

pub const OPTION_PROFILE: &str = "delta_sharing.profile";
pub const OPTION_MAX_RETRIES: &str = "delta_sharing.max_retries";
pub const OPTION_RETRY_DELAY_MS: &str = "delta_sharing.retry_delay_ms";
pub const OPTION_MAX_RETRY_DELAY_MS: &str = "delta_sharing.max_retry_delay_ms";
pub const OPTION_CONNECT_TIMEOUT_MS: &str = "delta_sharing.connect_timeout_ms";
pub const OPTION_REQUEST_TIMEOUT_MS: &str = "delta_sharing.request_timeout_ms";
pub const OPTION_USER_AGENT: &str = "delta_sharing.user_agent";
pub const OPTION_CACHE_DIR: &str = "delta_sharing.cache.dir";
pub const OPTION_LOG_LEVEL: &str = "delta_sharing.log_level";
pub const OPTION_LOG_FILE: &str = "delta_sharing.log_file";

/// Accumulated options for building a [`DeltaSharingClient`].
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    profile_path: Option<String>,
    profile: Option<Profile>,
    http_config: HttpClientConfig,
    cache_dir: Option<PathBuf>,
    log_config: LogConfig,
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `profile` directly instead of loading `delta_sharing.profile`.
    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = Some(profile);
        self
    }

    pub fn http_config(&self) -> &HttpClientConfig {
        &self.http_config
    }

    pub fn cache_dir(&self) -> Option<&PathBuf> {
        self.cache_dir.as_ref()
    }

    pub fn log_config(&self) -> &LogConfig {
        &self.log_config
    }

    /// Parse an unsigned integer option value.
    fn parse_u64_option(key: &str, value: &str) -> Result<u64> {
        value.trim().parse().map_err(|_| {
            Error::invalid_argument(
                "set_option",
                format!("option '{}' expects a non-negative integer, got {:?}", key, value),
            )
        })
    }

    fn parse_millis_option(key: &str, value: &str) -> Result<Duration> {
        Self::parse_u64_option(key, value).map(Duration::from_millis)
    }

    fn parse_string_option(key: &str, value: &str) -> Result<String> {
        if value.trim().is_empty() {
            return Err(Error::invalid_argument(
                "set_option",
                format!("option '{}' must not be empty", key),
            ));
        }
        Ok(value.to_string())
    }

    pub fn set_option(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            OPTION_PROFILE => {
                self.profile_path = Some(Self::parse_string_option(key, value)?);
            }
            OPTION_MAX_RETRIES => {
                let retries = Self::parse_u64_option(key, value)?;
                self.http_config.max_retries = u32::try_from(retries).map_err(|_| {
                    Error::invalid_argument(
                        "set_option",
                        format!("option '{}' is out of range: {}", key, retries),
                    )
                })?;
            }
            OPTION_RETRY_DELAY_MS => {
                self.http_config.retry_delay = Self::parse_millis_option(key, value)?;
            }
            OPTION_MAX_RETRY_DELAY_MS => {
                self.http_config.max_retry_delay = Self::parse_millis_option(key, value)?;
            }
            OPTION_CONNECT_TIMEOUT_MS => {
                self.http_config.connect_timeout = Self::parse_millis_option(key, value)?;
            }
            OPTION_REQUEST_TIMEOUT_MS => {
                self.http_config.request_timeout = Self::parse_millis_option(key, value)?;
            }
            OPTION_USER_AGENT => {
                self.http_config.user_agent = Self::parse_string_option(key, value)?;
            }
            OPTION_CACHE_DIR => {
                self.cache_dir = Some(PathBuf::from(Self::parse_string_option(key, value)?));
            }
            OPTION_LOG_LEVEL => {
                let level = value.trim().to_lowercase();
                match level.as_str() {
                    "off" | "error" | "warn" | "info" | "debug" | "trace" => {
                        self.log_config.level = Some(level);
                    }
                    _ => {
                        return Err(Error::invalid_argument(
                            "set_option",
                            format!("option '{}' has unknown log level {:?}", key, value),
                        ))
                    }
                }
            }
            OPTION_LOG_FILE => {
                self.log_config.file = Some(Self::parse_string_option(key, value)?);
            }
            _ => {
                return Err(Error::invalid_argument(
                    "set_option",
                    format!("unknown option '{}'", key),
                ))
            }
        }
        Ok(())
    }

    /// Current value of an option, or `None` when it is unset.
    pub fn get_option(&self, key: &str) -> Result<Option<String>> {
        let value = match key {
            OPTION_PROFILE => self.profile_path.clone(),
            OPTION_MAX_RETRIES => Some(self.http_config.max_retries.to_string()),
            OPTION_RETRY_DELAY_MS => Some(self.http_config.retry_delay.as_millis().to_string()),
            OPTION_MAX_RETRY_DELAY_MS => {
                Some(self.http_config.max_retry_delay.as_millis().to_string())
            }
            OPTION_CONNECT_TIMEOUT_MS => {
                Some(self.http_config.connect_timeout.as_millis().to_string())
            }
            OPTION_REQUEST_TIMEOUT_MS => {
                Some(self.http_config.request_timeout.as_millis().to_string())
            }
            OPTION_USER_AGENT => Some(self.http_config.user_agent.clone()),
            OPTION_CACHE_DIR => self
                .cache_dir
                .as_ref()
                .map(|dir| dir.display().to_string()),
            OPTION_LOG_LEVEL => self.log_config.level.clone(),
            OPTION_LOG_FILE => self.log_config.file.clone(),
            _ => {
                return Err(Error::invalid_argument(
                    "get_option",
                    format!("unknown option '{}'", key),
                ))
            }
        };
        Ok(value)
    }

    /// Initialize logging, load the profile and create the client.
    pub fn build(&self) -> Result<DeltaSharingClient> {
        init_logging(&self.log_config);

        let profile = match (&self.profile, &self.profile_path) {
            (Some(profile), _) => profile.clone(),
            (None, Some(path)) => Profile::from_file(path)?,
            (None, None) => {
                return Err(Error::invalid_argument(
                    "build_client",
                    format!("no profile: set '{}' or use with_profile", OPTION_PROFILE),
                ))
            }
        };

        debug!(
            "Creating sharing client for {} (cache: {:?})",
            profile.base_url(),
            self.cache_dir
        );

        let client = DeltaSharingClient::new(&profile, self.http_config.clone())?;
        Ok(match self.cache_dir {
            Some(ref dir) => client.with_cache_dir(dir),
            None => client,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new();
        assert_eq!(config.get_option(OPTION_MAX_RETRIES).unwrap().as_deref(), Some("5"));
        assert_eq!(
            config.get_option(OPTION_RETRY_DELAY_MS).unwrap().as_deref(),
            Some("500")
        );
        assert_eq!(
            config.get_option(OPTION_MAX_RETRY_DELAY_MS).unwrap().as_deref(),
            Some("10000")
        );
        assert_eq!(
            config.get_option(OPTION_REQUEST_TIMEOUT_MS).unwrap().as_deref(),
            Some("120000")
        );
        assert_eq!(config.get_option(OPTION_PROFILE).unwrap(), None);
        assert_eq!(config.get_option(OPTION_CACHE_DIR).unwrap(), None);
    }

    #[test]
    fn test_set_http_options() {
        let mut config = ClientConfig::new();
        config.set_option(OPTION_MAX_RETRIES, "2").unwrap();
        config.set_option(OPTION_RETRY_DELAY_MS, "10").unwrap();
        config.set_option(OPTION_MAX_RETRY_DELAY_MS, "40").unwrap();
        config.set_option(OPTION_CONNECT_TIMEOUT_MS, "1500").unwrap();
        config.set_option(OPTION_REQUEST_TIMEOUT_MS, " 3000 ").unwrap();
        config.set_option(OPTION_USER_AGENT, "my-reader/1.0").unwrap();

        let http = config.http_config();
        assert_eq!(http.max_retries, 2);
        assert_eq!(http.retry_delay, Duration::from_millis(10));
        assert_eq!(http.max_retry_delay, Duration::from_millis(40));
        assert_eq!(http.connect_timeout, Duration::from_millis(1500));
        assert_eq!(http.request_timeout, Duration::from_millis(3000));
        assert_eq!(http.user_agent, "my-reader/1.0");
    }

    #[test]
    fn test_invalid_options() {
        let mut config = ClientConfig::new();
        for (key, value) in [
            (OPTION_MAX_RETRIES, "-1"),
            (OPTION_MAX_RETRIES, "many"),
            (OPTION_MAX_RETRIES, "99999999999"),
            (OPTION_RETRY_DELAY_MS, "1.5"),
            (OPTION_LOG_LEVEL, "verbose"),
            (OPTION_CACHE_DIR, "  "),
            ("delta_sharing.unknown", "x"),
        ] {
            let err = config.set_option(key, value).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument, "{}={}", key, value);
        }
        assert!(config.get_option("delta_sharing.unknown").is_err());
    }

    #[test]
    fn test_log_options() {
        let mut config = ClientConfig::new();
        config.set_option(OPTION_LOG_LEVEL, "DEBUG").unwrap();
        config.set_option(OPTION_LOG_FILE, "/tmp/delta-sharing.log").unwrap();
        assert_eq!(config.log_config().level.as_deref(), Some("debug"));
        assert_eq!(
            config.log_config().file.as_deref(),
            Some("/tmp/delta-sharing.log")
        );
    }

    #[test]
    fn test_build_requires_profile() {
        let config = ClientConfig::new();
        let err = config.build().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn test_build_from_profile_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            br#"{"shareCredentialsVersion":1,"endpoint":"https://sharing.example.com/delta-sharing/","bearerToken":"t"}"#,
        )
        .unwrap();
        let cache_dir = tempfile::tempdir().unwrap();

        let mut config = ClientConfig::new();
        config
            .set_option(OPTION_PROFILE, &file.path().display().to_string())
            .unwrap();
        config
            .set_option(OPTION_CACHE_DIR, &cache_dir.path().display().to_string())
            .unwrap();
        config.set_option(OPTION_LOG_LEVEL, "off").unwrap();

        let client = config.build().unwrap();
        assert_eq!(
            client.rest_client().http_client().base_url(),
            "https://sharing.example.com/delta-sharing"
        );
        assert!(client.cache().is_some());
    }
}
