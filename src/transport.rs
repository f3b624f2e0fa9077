//! Pluggable HTTP transport.
//!
//! The client speaks to the API through the [`Transport`] trait so tests
//! can substitute a scripted double. [`ReqwestTransport`] is the production
//! implementation.

use crate::error::TransportError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// HTTP methods used by the API surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
        }
    }
}

/// A fully prepared request: auth headers attached, body already
/// form-encoded. Transports only move bytes.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    /// `application/x-www-form-urlencoded` payload for PUT/POST.
    pub body: Option<String>,
}

/// Decoded response. Header names are lowercased; the body is `Value::Null`
/// when empty or not JSON.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Value,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// HTTP transport abstraction for dependency injection and testing.
///
/// Implementations return a response for every completed HTTP exchange,
/// whatever its status; only network-level failures (DNS, connection,
/// timeout) are errors.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;
}

/// Production transport backed by reqwest.
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .expect("reqwest client");
        Self { http }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let mut req = match request.method {
            Method::Get => self.http.get(request.url.clone()),
            Method::Put => self.http.put(request.url.clone()),
            Method::Post => self.http.post(request.url.clone()),
        };
        for (name, value) in &request.headers {
            req = req.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            req = req
                .header(
                    reqwest::header::CONTENT_TYPE,
                    "application/x-www-form-urlencoded",
                )
                .body(body);
        }
        let res = req
            .send()
            .await
            .map_err(|e| TransportError::new(e.to_string()))?;
        let status = res.status().as_u16();
        let headers = res
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let text = res
            .text()
            .await
            .map_err(|e| TransportError::new(e.to_string()))?;
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(status: u16) -> ApiResponse {
        let mut headers = HashMap::new();
        headers.insert("req-limit-short".to_string(), "x".to_string());
        ApiResponse {
            status,
            headers,
            body: json!({}),
        }
    }

    #[test]
    fn success_covers_the_2xx_range() {
        assert!(response(200).is_success());
        assert!(response(204).is_success());
        assert!(!response(301).is_success());
        assert!(!response(500).is_success());
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let res = response(200);
        assert_eq!(res.header("Req-Limit-Short"), Some("x"));
        assert_eq!(res.header("req-limit-long"), None);
    }
}
