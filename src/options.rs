//! Transport configuration for the HTTP fetcher.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// How byte chunks from a streaming body are turned into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Utf8Chunking {
    /// Decode every chunk on its own, lossily. A multi-byte character split
    /// across two chunks comes out as replacement characters.
    PerChunk,

    /// Keep an incomplete trailing sequence and prepend it to the next chunk.
    #[default]
    Carry,
}

/// Options applied to every request issued by an [`HttpFetcher`](crate::fetch::HttpFetcher).
///
/// # Example
/// ```rust
/// use reason_stream::options::{TransportOptions, Utf8Chunking};
/// use std::time::Duration;
///
/// let options = TransportOptions::new()
///     .with_timeout(Duration::from_secs(30))
///     .with_header("x-client".to_string(), "demo".to_string())
///     .with_utf8(Utf8Chunking::PerChunk);
///
/// assert_eq!(options.timeout, Some(Duration::from_secs(30)));
/// ```
#[derive(Debug, Clone, Default)]
pub struct TransportOptions {
    /// Request timeout, covering connect through the end of the body
    pub timeout: Option<Duration>,

    /// HTTP proxy URL
    pub proxy: Option<String>,

    /// Headers sent with every request, before the caller's own headers
    pub extra_headers: Option<HashMap<String, String>>,

    /// Text decoding policy for streamed bodies
    pub utf8: Utf8Chunking,
}

impl TransportOptions {
    /// Create transport options with every setting at its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the proxy URL.
    pub fn with_proxy(mut self, proxy: String) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Set extra headers.
    pub fn with_extra_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.extra_headers = Some(headers);
        self
    }

    /// Add a single extra header.
    pub fn with_header(mut self, key: String, value: String) -> Self {
        self.extra_headers
            .get_or_insert_with(HashMap::new)
            .insert(key, value);
        self
    }

    /// Set the text decoding policy for streamed bodies.
    pub fn with_utf8(mut self, utf8: Utf8Chunking) -> Self {
        self.utf8 = utf8;
        self
    }
}
