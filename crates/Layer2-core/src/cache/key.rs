//! Cache key derivation
//!
//! `DefaultHasher` is not stable across Rust releases, so persisted keys
//! use SHA-256 of `project_id + ":" + query`.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Exact-tier slot identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn derive(project_id: &str, query: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(project_id.as_bytes());
        hasher.update(b":");
        hasher.update(query.as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Wrap an already-derived key
    pub fn from_raw(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 문자 단위로 자르기 (UTF-8 경계 안전)
pub fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_deterministic() {
        let a = CacheKey::derive("proj", "def f(): pass");
        let b = CacheKey::derive("proj", "def f(): pass");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn test_projects_do_not_collide() {
        let a = CacheKey::derive("alpha", "query");
        let b = CacheKey::derive("beta", "query");
        assert_ne!(a, b);
    }

    #[test]
    fn test_known_digest() {
        // sha256("p:q")
        let key = CacheKey::derive("p", "q");
        assert_eq!(
            key.as_str(),
            "20d33f41ccfb21d4e36e00025c43f5d3499dc272713cbee94eee5b52364e3883"
        );
    }

    #[test]
    fn test_preview_respects_char_boundaries() {
        assert_eq!(preview("héllo wörld", 4), "héll");
        assert_eq!(preview("short", 100), "short");
    }
}
