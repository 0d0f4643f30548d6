//! HTTP implementation of [`Fetcher`].
//!
//! The response `Content-Type` decides, once, how the body is consumed:
//! JSON and HTML bodies are buffered into a single terminal envelope, any
//! other body is streamed chunk by chunk as text fragments.

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::client::{EnvelopeStream, Fetcher, ReasonError};
use crate::http::{build_http_client, build_request};
use crate::model::{Payload, RequestSpec, ResponseEnvelope, ResponseKind};
use crate::options::TransportOptions;
use crate::stream::text_fragments;

/// Fetcher backed by a `reqwest` client.
pub struct HttpFetcher {
    client: reqwest::Client,
    options: TransportOptions,
}

impl HttpFetcher {
    /// Create a fetcher from transport options.
    pub fn new(options: TransportOptions) -> Result<Self, ReasonError> {
        let client = build_http_client(&options)?;
        Ok(Self { client, options })
    }

    /// Create a fetcher around an existing client. Timeout and proxy settings
    /// in `options` are ignored; they belong to the client.
    pub fn with_client(client: reqwest::Client, options: TransportOptions) -> Self {
        Self { client, options }
    }

    /// Transport options in use.
    pub fn options(&self) -> &TransportOptions {
        &self.options
    }

    /// Turn a received response into envelopes.
    async fn envelopes_from(
        &self,
        response: reqwest::Response,
    ) -> Result<EnvelopeStream, ReasonError> {
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let kind = ResponseKind::from_content_type(content_type.as_deref());
        debug!(?kind, content_type = ?content_type, "classified response");

        match kind {
            ResponseKind::Json => {
                let body = response.bytes().await?;
                let value = serde_json::from_slice(&body)?;
                Ok(Self::not_stream(Payload::Json(value)))
            }
            ResponseKind::Html => {
                // Always UTF-8, whatever charset the header declares
                let body = response.bytes().await?;
                let text = String::from_utf8_lossy(&body).into_owned();
                Ok(Self::not_stream(Payload::Text(text)))
            }
            ResponseKind::Stream => {
                let status = response.status();
                if !has_body(status) {
                    return Err(ReasonError::NoStream {
                        status: status.as_u16(),
                    });
                }

                let fragments = text_fragments(response.bytes_stream(), self.options.utf8)
                    .map_ok(|text| ResponseEnvelope::Fragment { text });
                Ok(fragments.boxed())
            }
        }
    }

    fn not_stream(payload: Payload) -> EnvelopeStream {
        stream::once(async move { Ok(ResponseEnvelope::NotStream { payload }) }).boxed()
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn open(&self, spec: RequestSpec) -> Result<EnvelopeStream, ReasonError> {
        let request = build_request(&self.client, &spec, &self.options.extra_headers)?;

        debug!(method = ?spec.method, url = %spec.url, "sending reasoning request");
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, url = %spec.url, "reasoning endpoint returned non-success status");
        }

        self.envelopes_from(response).await
    }
}

/// Statuses whose responses never carry a body.
fn has_body(status: StatusCode) -> bool {
    !matches!(status.as_u16(), 101 | 103 | 204 | 205 | 304)
}

/// Issue a single request with a default client and return its envelopes.
///
/// # Example
/// ```no_run
/// use futures::StreamExt;
/// use reason_stream::fetch::fetch_reason;
/// use reason_stream::model::{RequestSpec, ResponseEnvelope};
///
/// # async fn run() -> Result<(), reason_stream::ReasonError> {
/// let mut envelopes = fetch_reason(RequestSpec::new("http://localhost:8080/reason")).await?;
/// while let Some(envelope) = envelopes.next().await {
///     match envelope? {
///         ResponseEnvelope::Fragment { text } => print!("{}", text),
///         ResponseEnvelope::NotStream { payload } => println!("{:?}", payload),
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub async fn fetch_reason(spec: RequestSpec) -> Result<EnvelopeStream, ReasonError> {
    HttpFetcher::new(TransportOptions::default())?.open(spec).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Method, ReasonOverrides};
    use crate::options::Utf8Chunking;
    use serde_json::json;
    use std::io::Write;

    async fn collect(stream: EnvelopeStream) -> Vec<ResponseEnvelope> {
        stream.map(|r| r.unwrap()).collect().await
    }

    #[test]
    fn test_has_body() {
        assert!(has_body(StatusCode::OK));
        assert!(has_body(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(!has_body(StatusCode::NO_CONTENT));
        assert!(!has_body(StatusCode::NOT_MODIFIED));
    }

    #[tokio::test]
    async fn test_json_response_is_buffered() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/reason")
            .match_header("content-type", "application/json")
            .match_body(mockito::Matcher::Json(json!({"prompt": "hi"})))
            .with_header("content-type", "application/json")
            .with_body(r#"{"answer": 42}"#)
            .create_async()
            .await;

        let spec = RequestSpec::from_overrides(
            format!("{}/reason", server.url()),
            ReasonOverrides::new().with_field("prompt", "hi"),
        );
        let envelopes = collect(fetch_reason(spec).await.unwrap()).await;

        mock.assert_async().await;
        assert_eq!(
            envelopes,
            vec![ResponseEnvelope::NotStream {
                payload: Payload::Json(json!({"answer": 42}))
            }]
        );
    }

    #[tokio::test]
    async fn test_html_response_is_buffered_text() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/reason")
            .with_header("content-type", "text/html; charset=utf-8")
            .with_body("<h1>maintenance</h1>")
            .create_async()
            .await;

        let spec = RequestSpec::new(format!("{}/reason", server.url()));
        let envelopes = collect(fetch_reason(spec).await.unwrap()).await;

        assert_eq!(
            envelopes,
            vec![ResponseEnvelope::NotStream {
                payload: Payload::Text("<h1>maintenance</h1>".to_string())
            }]
        );
    }

    #[tokio::test]
    async fn test_html_is_decoded_as_utf8_regardless_of_charset() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/reason")
            .with_header("content-type", "text/html; charset=iso-8859-1")
            .with_body("<p>caf\u{e9}</p>".as_bytes())
            .create_async()
            .await;

        let spec = RequestSpec::new(format!("{}/reason", server.url()));
        let envelopes = collect(fetch_reason(spec).await.unwrap()).await;

        assert_eq!(
            envelopes,
            vec![ResponseEnvelope::NotStream {
                payload: Payload::Text("<p>caf\u{e9}</p>".to_string())
            }]
        );
    }

    #[tokio::test]
    async fn test_other_content_type_is_streamed() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/reason")
            .with_header("content-type", "text/plain")
            .with_body("thinking...")
            .create_async()
            .await;

        let spec = RequestSpec::new(format!("{}/reason", server.url()));
        let envelopes = collect(fetch_reason(spec).await.unwrap()).await;

        assert!(!envelopes.is_empty());
        let mut text = String::new();
        for envelope in envelopes {
            match envelope {
                ResponseEnvelope::Fragment { text: part } => text.push_str(&part),
                ResponseEnvelope::NotStream { .. } => panic!("stream path yielded a terminal"),
            }
        }
        assert_eq!(text, "thinking...");
    }

    #[tokio::test]
    async fn test_chunked_stream_yields_fragments() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/reason")
            .with_header("content-type", "application/octet-stream")
            .with_chunked_body(|w| {
                w.write_all(b"{\"step\":")?;
                w.write_all(b"1}")
            })
            .create_async()
            .await;

        let fetcher = HttpFetcher::new(TransportOptions::new().with_utf8(Utf8Chunking::PerChunk)).unwrap();
        let spec = RequestSpec::new(format!("{}/reason", server.url()));
        let envelopes = collect(fetcher.open(spec).await.unwrap()).await;

        let text: String = envelopes
            .into_iter()
            .map(|e| match e {
                ResponseEnvelope::Fragment { text } => text,
                other => panic!("unexpected envelope {:?}", other),
            })
            .collect();
        assert_eq!(text, "{\"step\":1}");
    }

    #[tokio::test]
    async fn test_get_sends_no_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/reason")
            .match_body(mockito::Matcher::Exact(String::new()))
            .with_header("content-type", "application/json")
            .with_body("{}")
            .create_async()
            .await;

        let spec = RequestSpec::from_overrides(
            format!("{}/reason", server.url()),
            ReasonOverrides::new()
                .with_field("prompt", "dropped")
                .with_method(Method::Get),
        );
        collect(fetch_reason(spec).await.unwrap()).await;

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_content_type_header_is_forced() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/reason")
            .match_header("content-type", "application/json")
            .with_header("content-type", "application/json")
            .with_body("{}")
            .create_async()
            .await;

        let spec = RequestSpec::from_overrides(
            format!("{}/reason", server.url()),
            ReasonOverrides::new().with_header("Content-Type", "text/plain"),
        );
        collect(fetch_reason(spec).await.unwrap()).await;

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_no_content_is_no_stream_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/reason")
            .with_status(204)
            .create_async()
            .await;

        let spec = RequestSpec::new(format!("{}/reason", server.url()));
        let result = fetch_reason(spec).await;

        assert!(matches!(result, Err(ReasonError::NoStream { status: 204 })));
    }

    #[tokio::test]
    async fn test_malformed_json_is_parse_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/reason")
            .with_header("content-type", "application/json")
            .with_body("not json")
            .create_async()
            .await;

        let spec = RequestSpec::new(format!("{}/reason", server.url()));
        let result = fetch_reason(spec).await;

        assert!(matches!(result, Err(ReasonError::Parse(_))));
    }

    #[tokio::test]
    async fn test_non_success_status_is_not_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/reason")
            .with_status(500)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": "boom"}"#)
            .create_async()
            .await;

        let spec = RequestSpec::new(format!("{}/reason", server.url()));
        let envelopes = collect(fetch_reason(spec).await.unwrap()).await;

        assert_eq!(
            envelopes,
            vec![ResponseEnvelope::NotStream {
                payload: Payload::Json(json!({"error": "boom"}))
            }]
        );
    }
}
