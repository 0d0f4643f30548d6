//! HTTP client construction and request building.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder};
use std::collections::HashMap;

use crate::client::ReasonError;
use crate::model::{Method, RequestSpec};
use crate::options::TransportOptions;

/// Build a configured HTTP client from transport options.
///
/// This applies timeouts and proxies. An unparsable proxy URL is ignored.
pub fn build_http_client(options: &TransportOptions) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder();

    if let Some(timeout) = options.timeout {
        builder = builder.timeout(timeout);
    }

    if let Some(proxy_url) = &options.proxy {
        if let Ok(proxy) = reqwest::Proxy::all(proxy_url) {
            builder = builder.proxy(proxy);
        }
    }

    builder.build()
}

/// Merge transport headers, then caller headers, then force
/// `Content-Type: application/json`.
///
/// Later entries replace earlier ones with the same (case-insensitive) name,
/// so the content type is never duplicated.
pub fn merge_headers(
    extra_headers: &Option<HashMap<String, String>>,
    headers: &HashMap<String, String>,
) -> Result<HeaderMap, ReasonError> {
    let mut merged = HeaderMap::new();

    for (key, value) in extra_headers.iter().flatten().chain(headers) {
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|e| ReasonError::InvalidHeader(format!("{}: {}", key, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ReasonError::InvalidHeader(format!("{}: {}", key, e)))?;
        merged.insert(name, value);
    }

    merged.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(merged)
}

/// Build the request for `spec`. The body is omitted entirely for `GET`.
pub fn build_request(
    client: &Client,
    spec: &RequestSpec,
    extra_headers: &Option<HashMap<String, String>>,
) -> Result<RequestBuilder, ReasonError> {
    let headers = merge_headers(extra_headers, &spec.headers)?;
    let mut request = client
        .request(spec.method.into(), &spec.url)
        .headers(headers);

    if spec.method != Method::Get {
        request = request.body(serde_json::to_string(&spec.body)?);
    }

    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ReasonOverrides;
    use serde_json::json;
    use std::time::Duration;

    fn built(spec: &RequestSpec, extra: &Option<HashMap<String, String>>) -> reqwest::Request {
        let client = Client::new();
        build_request(&client, spec, extra).unwrap().build().unwrap()
    }

    #[test]
    fn test_build_http_client() {
        let options = TransportOptions::new().with_timeout(Duration::from_secs(30));
        assert!(build_http_client(&options).is_ok());
    }

    #[test]
    fn test_build_http_client_with_proxy() {
        let options = TransportOptions::new().with_proxy("http://proxy.example.com:8080".to_string());
        assert!(build_http_client(&options).is_ok());
    }

    #[test]
    fn test_get_omits_body() {
        let overrides = ReasonOverrides::new()
            .with_field("prompt", "ignored")
            .with_method(Method::Get);
        let spec = RequestSpec::from_overrides("http://localhost/reason", overrides);

        let request = built(&spec, &None);
        assert_eq!(request.method(), &reqwest::Method::GET);
        assert!(request.body().is_none());
    }

    #[test]
    fn test_post_serializes_body() {
        let overrides = ReasonOverrides::new().with_field("prompt", "hi");
        let spec = RequestSpec::from_overrides("http://localhost/reason", overrides);

        let request = built(&spec, &None);
        let body = request.body().and_then(|b| b.as_bytes()).unwrap();
        let sent: serde_json::Value = serde_json::from_slice(body).unwrap();
        assert_eq!(sent, json!({"prompt": "hi"}));
    }

    #[test]
    fn test_default_body_is_empty_object() {
        let spec = RequestSpec::new("http://localhost/reason");
        let request = built(&spec, &None);
        assert_eq!(request.body().and_then(|b| b.as_bytes()), Some(&b"{}"[..]));
    }

    #[test]
    fn test_caller_content_type_is_overridden() {
        let overrides = ReasonOverrides::new().with_header("Content-Type", "text/plain");
        let spec = RequestSpec::from_overrides("http://localhost/reason", overrides);

        let request = built(&spec, &None);
        let values: Vec<_> = request.headers().get_all(CONTENT_TYPE).iter().collect();
        assert_eq!(values, vec!["application/json"]);
    }

    #[test]
    fn test_caller_headers_win_over_transport_headers() {
        let mut extra = HashMap::new();
        extra.insert("x-client".to_string(), "transport".to_string());
        extra.insert("x-static".to_string(), "kept".to_string());

        let overrides = ReasonOverrides::new().with_header("X-Client", "caller");
        let spec = RequestSpec::from_overrides("http://localhost/reason", overrides);

        let request = built(&spec, &Some(extra));
        assert_eq!(request.headers()["x-client"], "caller");
        assert_eq!(request.headers()["x-static"], "kept");
    }

    #[test]
    fn test_invalid_header_is_rejected() {
        let overrides = ReasonOverrides::new().with_header("bad header", "v");
        let spec = RequestSpec::from_overrides("http://localhost/reason", overrides);

        let result = build_request(&Client::new(), &spec, &None);
        assert!(matches!(result, Err(ReasonError::InvalidHeader(_))));
    }
}
