use std::time::Duration;

use reqwest::{Client, Method};
use serde_json::{json, Value};
use url::Url;

use crate::{
    config::AppConfig,
    error::{AppError, AppResult},
};

const USER_AGENT: &str = "otc-report/1.0";

/// Request shape for [`LodgifyClient::call`].
#[derive(Debug, Clone)]
pub struct CallOptions {
    pub method: Method,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }
}

impl CallOptions {
    pub fn get(query: Vec<(String, String)>) -> Self {
        Self {
            query,
            ..Self::default()
        }
    }
}

/// Authenticated client for the Lodgify reservation API.
#[derive(Debug, Clone)]
pub struct LodgifyClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl LodgifyClient {
    pub fn new(config: &AppConfig) -> AppResult<Self> {
        let mut builder = Client::builder().user_agent(USER_AGENT);
        if config.upstream_timeout_seconds > 0 {
            builder = builder.timeout(Duration::from_secs(config.upstream_timeout_seconds));
        }
        let http = builder.build().map_err(|e| {
            AppError::Configuration(format!("Could not build upstream HTTP client: {e}"))
        })?;

        Ok(Self {
            http,
            base_url: config.lodgify_base_url.trim_end_matches('/').to_string(),
            api_key: config.lodgify_api_key.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue one request against `path` (relative to the base URL).
    ///
    /// Non-JSON success bodies come back as `{ "raw": "<text>" }` and an empty
    /// body as `null`, so nothing the upstream sends is dropped.
    pub async fn call(&self, path: &str, options: CallOptions) -> AppResult<Value> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| AppError::Configuration("Missing LODGIFY_API_KEY env var".to_string()))?;

        let url = self.endpoint(path)?;
        let mut request = self
            .http
            .request(options.method.clone(), url)
            .header("Accept", "application/json")
            .header("X-ApiKey", api_key);
        if !options.query.is_empty() {
            request = request.query(&options.query);
        }
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &options.body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!(error = %e, path = %path, "Lodgify request failed");
            let message = if e.is_timeout() {
                format!("Lodgify request to {path} timed out.")
            } else {
                format!("Lodgify request to {path} failed: {e}")
            };
            AppError::Upstream {
                status: 502,
                message,
            }
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            tracing::error!(error = %e, path = %path, "Lodgify body read failed");
            AppError::Upstream {
                status: 502,
                message: format!("Lodgify response from {path} could not be read: {e}"),
            }
        })?;

        if !status.is_success() {
            let detail = error_message(&text);
            tracing::warn!(status = %status, path = %path, "Lodgify returned non-success status");
            return Err(AppError::Upstream {
                status: status.as_u16(),
                message: format!("Lodgify {}: {}", status.as_u16(), detail)
                    .trim()
                    .to_string(),
            });
        }

        Ok(parse_body(&text))
    }

    pub async fn get(&self, path: &str, query: Vec<(String, String)>) -> AppResult<Value> {
        self.call(path, CallOptions::get(query)).await
    }

    fn endpoint(&self, path: &str) -> AppResult<Url> {
        let joined = if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        };
        Url::parse(&joined).map_err(|e| {
            AppError::Configuration(format!("Invalid Lodgify URL {joined}: {e}"))
        })
    }
}

fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str::<Value>(text).unwrap_or_else(|_| json!({ "raw": text }))
}

/// Pull a human readable message out of an error body.
fn error_message(text: &str) -> String {
    if let Ok(body) = serde_json::from_str::<Value>(text) {
        if let Some(message) = body.get("message").and_then(Value::as_str) {
            return message.trim().to_string();
        }
        match body.get("error") {
            Some(Value::String(message)) => return message.trim().to_string(),
            Some(Value::Object(inner)) => {
                if let Some(message) = inner.get("message").and_then(Value::as_str) {
                    return message.trim().to_string();
                }
            }
            _ => {}
        }
    }
    text.trim().to_string()
}
