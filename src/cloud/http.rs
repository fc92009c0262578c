//! HTTP utilities for REST API calls

use super::auth::AUTH_HEADER;
use crate::error::{Error, Result};
use reqwest::{Client, Method, RequestBuilder};
use serde_json::Value;
use std::time::Duration;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Pull the vendor error message out of an error body, if it has one
fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return String::new();
    };
    ["error_msg", "message", "error.message", "NeutronError.message"]
        .iter()
        .find_map(|path| crate::pipeline::path::lookup(&value, path)?.as_str())
        .map(sanitize_for_log)
        .unwrap_or_default()
}

/// HTTP client wrapper for API calls
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Create a new HTTP client with the given request timeout
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("hcso/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self { client })
    }

    fn request(&self, method: Method, url: &str, token: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header(AUTH_HEADER, token)
            .header(reqwest::header::ACCEPT, "application/json")
    }

    /// Make a GET request with query parameters
    pub async fn get(&self, url: &str, token: &str, query: &[(String, String)]) -> Result<Value> {
        tracing::debug!("GET {} {:?}", url, query);
        let request = self.request(Method::GET, url, token).query(query);
        Self::send(request, url).await
    }

    /// Make a POST request with an optional JSON body
    pub async fn post(&self, url: &str, token: &str, body: Option<&Value>) -> Result<Value> {
        tracing::debug!("POST {}", url);
        let mut request = self.request(Method::POST, url, token);
        if let Some(body) = body {
            request = request.json(body);
        }
        Self::send(request, url).await
    }

    /// Make a PUT request with a JSON body
    pub async fn put(&self, url: &str, token: &str, body: &Value) -> Result<Value> {
        tracing::debug!("PUT {}", url);
        let request = self.request(Method::PUT, url, token).json(body);
        Self::send(request, url).await
    }

    /// Make a DELETE request
    pub async fn delete(&self, url: &str, token: &str) -> Result<Value> {
        tracing::debug!("DELETE {}", url);
        let request = self.request(Method::DELETE, url, token);
        Self::send(request, url).await
    }

    async fn send(request: RequestBuilder, url: &str) -> Result<Value> {
        let response = request.send().await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            // Security: Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
            return Err(Error::Api {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        // Handle empty response
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body).map_err(|e| Error::parse(format!("response of {}", url), e))
    }
}
