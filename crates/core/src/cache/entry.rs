//! Request keys and response snapshots stored in a cache generation.

use super::hash::compute_entry_key;
use serde::{Deserialize, Serialize};

/// Identity of a cached request: method plus canonical URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
pub struct RequestKey {
    pub method: String,
    pub url: String,
}

impl RequestKey {
    pub fn new(method: &str, url: impl Into<String>) -> Self {
        Self { method: method.to_ascii_uppercase(), url: url.into() }
    }

    /// A GET request for `url`.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }

    /// Storage key within a generation.
    pub fn hash(&self) -> String {
        compute_entry_key(&self.method, &self.url)
    }
}

impl std::fmt::Display for RequestKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// Immutable copy of a successful response at capture time.
///
/// A snapshot is replaced wholesale when the same key is stored again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ResponseSnapshot {
    /// URL the response was served from (after redirects).
    pub url: String,
    pub status_code: u16,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// RFC 3339 capture timestamp.
    pub fetched_at: String,
}

impl ResponseSnapshot {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(status_code: u16) -> ResponseSnapshot {
        ResponseSnapshot {
            url: "https://example.com/".into(),
            status_code,
            content_type: Some("text/html".into()),
            headers: vec![("ETag".into(), "\"abc\"".into())],
            body: b"<html></html>".to_vec(),
            fetched_at: "2024-05-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn test_request_key_uppercases_method() {
        let key = RequestKey::new("get", "https://example.com/");
        assert_eq!(key.method, "GET");
        assert!(key.is_get());
        assert_eq!(key, RequestKey::get("https://example.com/"));
    }

    #[test]
    fn test_request_key_display() {
        let key = RequestKey::new("POST", "https://example.com/api");
        assert_eq!(key.to_string(), "POST https://example.com/api");
        assert!(!key.is_get());
    }

    #[test]
    fn test_snapshot_success_range() {
        assert!(snapshot(200).is_success());
        assert!(snapshot(204).is_success());
        assert!(!snapshot(304).is_success());
        assert!(!snapshot(503).is_success());
    }

    #[test]
    fn test_snapshot_header_lookup_case_insensitive() {
        let snap = snapshot(200);
        assert_eq!(snap.header("etag"), Some("\"abc\""));
        assert_eq!(snap.header("last-modified"), None);
        assert_eq!(snap.text(), "<html></html>");
    }
}
