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

//! Authentication for sharing server requests.

use crate::error::{Error, Result};
use crate::profile::Profile;

/// Produces the `Authorization` header value for sharing server requests.
pub trait AuthProvider: Send + Sync + std::fmt::Debug {
    fn get_auth_header(&self) -> Result<String>;
}

/// Static bearer token issued in a sharing profile.
pub struct BearerToken {
    token: String,
}

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn from_profile(profile: &Profile) -> Self {
        Self::new(profile.bearer_token.clone())
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerToken")
            .field("token", &"<redacted>")
            .finish()
    }
}

impl AuthProvider for BearerToken {
    fn get_auth_header(&self) -> Result<String> {
        if self.token.is_empty() {
            return Err(Error::invalid_argument(
                "get_auth_header",
                "bearer token is empty",
            ));
        }
        Ok(format!("Bearer {}", self.token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_header() {
        let auth = BearerToken::new("dapi123");
        assert_eq!(auth.get_auth_header().unwrap(), "Bearer dapi123");
    }

    #[test]
    fn test_debug_redacts_token() {
        let auth = BearerToken::new("secret-token");
        assert!(!format!("{:?}", auth).contains("secret-token"));
    }

    #[test]
    fn test_empty_token_rejected() {
        assert!(BearerToken::new("").get_auth_header().is_err());
    }
}
