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

//! Cache keys derived from data-file URLs.

use crate::error::{Error, Result};
use std::fmt;
use std::path::PathBuf;
use url::Url;

/// Appended to the file name of every entry. Parsed URL path segments never
/// contain a raw `#`, so no directory can carry this suffix.
pub const ENTRY_SUFFIX: &str = "#";

/// Location of a cached file, as relative path segments.
///
/// The key is the URL host (with `_<port>` appended when the URL names a
/// port) followed by the URL path segments. The query string and fragment are
/// not part of the key: presigned URLs for the same object differ only in
/// their signature parameters, and they must share one cache entry.
///
/// The flip side is that two objects distinguished only by query parameters
/// would collide. Sharing servers address files by path, so this does not
/// happen with conforming servers.
///
/// On disk the last segment carries [`ENTRY_SUFFIX`], so one object's path
/// may be a prefix of another's (`t/f` and `t/f/g`) without a file standing
/// where a directory is needed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    segments: Vec<String>,
}

impl CacheKey {
    pub fn from_url(url: &str) -> Result<Self> {
        const OP: &str = "cache_key";
        let parsed = Url::parse(url)
            .map_err(|e| Error::invalid_argument(OP, format!("invalid URL {:?}: {}", url, e)))?;

        let host = parsed
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| Error::invalid_argument(OP, format!("URL has no host: {:?}", url)))?;
        let host = match parsed.port() {
            Some(port) => format!("{}_{}", host, port),
            None => host.to_string(),
        };

        let mut segments = vec![host];
        if let Some(path) = parsed.path_segments() {
            for segment in path.filter(|s| !s.is_empty()) {
                if segment == "." || segment == ".." || segment.contains('\\') {
                    return Err(Error::invalid_argument(
                        OP,
                        format!("unsafe path segment {:?} in {:?}", segment, url),
                    ));
                }
                segments.push(segment.to_string());
            }
        }
        if segments.len() < 2 {
            return Err(Error::invalid_argument(
                OP,
                format!("URL has no file path: {:?}", url),
            ));
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Relative filesystem path for this key.
    pub fn to_relative_path(&self) -> PathBuf {
        let (last, dirs) = match self.segments.split_last() {
            Some(parts) => parts,
            None => return PathBuf::new(),
        };
        let mut path: PathBuf = dirs.iter().collect();
        path.push(format!("{}{}", last, ENTRY_SUFFIX));
        path
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_key_ignores_query_and_fragment() {
        let a = CacheKey::from_url("https://bucket.s3.amazonaws.com/t/part-0.parquet?X-Sig=aaa")
            .unwrap();
        let b = CacheKey::from_url(
            "https://bucket.s3.amazonaws.com/t/part-0.parquet?X-Sig=bbb&X-Expires=60#frag",
        )
        .unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "bucket.s3.amazonaws.com/t/part-0.parquet");
    }

    #[test]
    fn test_key_includes_port() {
        let key = CacheKey::from_url("http://127.0.0.1:8080/data/f.parquet").unwrap();
        assert_eq!(key.segments(), &["127.0.0.1_8080", "data", "f.parquet"]);
        assert_eq!(
            key.to_relative_path(),
            PathBuf::from("127.0.0.1_8080").join("data").join("f.parquet#")
        );
    }

    #[test]
    fn test_nested_key_does_not_collide_with_prefix() {
        let file = CacheKey::from_url("https://h/t/f").unwrap();
        let nested = CacheKey::from_url("https://h/t/f/g").unwrap();
        assert_eq!(file.to_relative_path(), PathBuf::from("h/t/f#"));
        assert_eq!(nested.to_relative_path(), PathBuf::from("h/t/f/g#"));
        assert!(!nested.to_relative_path().starts_with(file.to_relative_path()));
    }

    #[test]
    fn test_hash_in_url_is_fragment_not_segment() {
        let key = CacheKey::from_url("https://h/t/f#/g").unwrap();
        assert_eq!(key.segments(), &["h", "t", "f"]);
    }

    #[test]
    fn test_key_distinguishes_paths() {
        let a = CacheKey::from_url("https://h/t/a.parquet").unwrap();
        let b = CacheKey::from_url("https://h/t/b.parquet").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_key_rejects_bad_urls() {
        for bad in ["not a url", "file:///etc/passwd", "https://h/", "https://h"] {
            let err = CacheKey::from_url(bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument, "{}", bad);
        }
    }
}
