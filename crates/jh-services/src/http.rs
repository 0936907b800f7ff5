//! Minimal JSON-over-HTTP helper shared by the service clients.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Method};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, trace, warn};

use crate::error::{Result, ServiceError};

const CLIENT_USER_AGENT: &str = concat!("jhutils/", env!("CARGO_PKG_VERSION"));

/// JSON API client bound to a base URL and a set of default headers.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    http: Client,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

fn build_http_client(headers: HeaderMap) -> Client {
    Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .build()
        .expect("failed to build HTTP client")
}

/// Header value from an arbitrary string. Invalid bytes are logged and the
/// header is left out.
pub fn header_value(name: &HeaderName, value: &str) -> Option<HeaderValue> {
    match HeaderValue::from_str(value) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(header = %name, error = %e, "ignoring header with invalid characters");
            None
        }
    }
}

/// `Authorization` and `Accept` headers for a service client.
pub fn auth_headers(authorization: &str, accept: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Some(mut value) = header_value(&AUTHORIZATION, authorization) {
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }
    if let Some(value) = header_value(&ACCEPT, accept) {
        headers.insert(ACCEPT, value);
    }
    headers
}

impl ApiClient {
    /// Create a client; JSON content-type and a user agent are added unless
    /// `headers` already sets them.
    pub fn new(base_url: &str, mut headers: HeaderMap) -> Self {
        headers
            .entry(CONTENT_TYPE)
            .or_insert(HeaderValue::from_static("application/json"));
        headers
            .entry(USER_AGENT)
            .or_insert(HeaderValue::from_static(CLIENT_USER_AGENT));
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: build_http_client(headers),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL for an endpoint relative to the base URL.
    pub fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    /// Send a request and decode the JSON response.
    ///
    /// Top-level JSON arrays are wrapped as `{"content": [...]}` so callers
    /// always receive an object. An empty body decodes as `null`.
    pub async fn request<Q, B>(
        &self,
        method: Method,
        endpoint: &str,
        query: Option<&Q>,
        body: Option<&B>,
    ) -> Result<Value>
    where
        Q: Serialize + ?Sized,
        B: Serialize + ?Sized,
    {
        let url = self.url(endpoint);
        let mut builder = self.http.request(method.clone(), &url);
        if let Some(query) = query {
            builder = builder.query(query);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        debug!(%method, url = %url, status = status.as_u16(), "service request");

        let text = response.text().await?;
        if !status.is_success() {
            return Err(ServiceError::Status {
                status: status.as_u16(),
                url,
                body: text,
            });
        }
        trace!(body = %text, "service response");

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(normalize(serde_json::from_str(&text)?))
    }

    /// GET without query parameters.
    pub async fn fetch(&self, endpoint: &str) -> Result<Value> {
        self.request::<(), ()>(Method::GET, endpoint, None, None).await
    }

    pub async fn get<Q: Serialize + ?Sized>(&self, endpoint: &str, query: &Q) -> Result<Value> {
        self.request::<Q, ()>(Method::GET, endpoint, Some(query), None).await
    }

    pub async fn post<B: Serialize + ?Sized>(&self, endpoint: &str, body: &B) -> Result<Value> {
        self.request::<(), B>(Method::POST, endpoint, None, Some(body)).await
    }

    pub async fn put<B: Serialize + ?Sized>(&self, endpoint: &str, body: &B) -> Result<Value> {
        self.request::<(), B>(Method::PUT, endpoint, None, Some(body)).await
    }

    pub async fn delete<Q, B>(&self, endpoint: &str, query: Option<&Q>, body: Option<&B>) -> Result<Value>
    where
        Q: Serialize + ?Sized,
        B: Serialize + ?Sized,
    {
        self.request(Method::DELETE, endpoint, query, body).await
    }
}

/// Wrap a top-level array as `{"content": [...]}`.
pub fn normalize(value: Value) -> Value {
    match value {
        Value::Array(items) => json!({ "content": items }),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_without_double_slashes() {
        let client = ApiClient::new(
            "https://mealie.local/",
            auth_headers("Bearer k", "application/json"),
        );
        assert_eq!(client.base_url(), "https://mealie.local");
        assert_eq!(client.url("/api/foods"), "https://mealie.local/api/foods");
        assert_eq!(client.url("api/foods"), "https://mealie.local/api/foods");
    }

    #[test]
    fn normalize_wraps_arrays() {
        let wrapped = normalize(json!([{"a": 1}]));
        assert_eq!(wrapped, json!({"content": [{"a": 1}]}));

        let object = json!({"items": []});
        assert_eq!(normalize(object.clone()), object);
    }

    #[test]
    fn invalid_token_is_left_out() {
        let headers = auth_headers("Bearer \n bad", "application/json");
        assert!(headers.get(AUTHORIZATION).is_none());
        assert_eq!(headers.get(ACCEPT).unwrap(), "application/json");
        let _client = ApiClient::new("http://x", headers);
    }

    #[test]
    fn valid_token_is_sensitive() {
        let headers = auth_headers("Bearer secret", "application/json");
        let value = headers.get(AUTHORIZATION).unwrap();
        assert_eq!(value, "Bearer secret");
        assert!(value.is_sensitive());
    }

    #[test]
    fn debug_hides_headers() {
        let client = ApiClient::new("http://x", auth_headers("Bearer secret", "application/json"));
        assert!(!format!("{client:?}").contains("secret"));
    }
}
