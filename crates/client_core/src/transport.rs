//! HTTP transport that folds every outcome into an [`Envelope`].

use reqwest::{
    header::{ACCEPT, CONTENT_TYPE},
    Client, RequestBuilder, StatusCode,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use shared::{error::ApiError, protocol::Envelope};
use tracing::{debug, warn};
use url::Url;

use crate::config::{ClientSettings, ConfigError};

const JSON: &str = "application/json";

/// Stateless JSON client bound to one backend base URL.
///
/// Cloning is cheap and clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(settings: &ClientSettings) -> Result<Self, ConfigError> {
        let http = Client::builder()
            .timeout(settings.request_timeout)
            .build()?;
        Ok(Self::with_http(http, settings.api_base_url.clone()))
    }

    pub fn with_http(http: Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// `GET {base}{path}`; query pairs whose value is `None` are not sent.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, Option<&str>)],
    ) -> Envelope<T> {
        let pairs: Vec<(&str, &str)> = query
            .iter()
            .filter_map(|(key, value)| value.map(|value| (*key, value)))
            .collect();
        let mut request = self.http.get(self.endpoint(path));
        if !pairs.is_empty() {
            request = request.query(&pairs);
        }
        self.dispatch("GET", path, request).await
    }

    /// `POST {base}{path}` with `body` as the JSON payload.
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Envelope<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let payload = match serde_json::to_vec(body) {
            Ok(payload) => payload,
            Err(err) => {
                return Envelope::Error(ApiError::validation(format!(
                    "request body could not be encoded: {err}"
                )))
            }
        };
        let request = self
            .http
            .post(self.endpoint(path))
            .header(CONTENT_TYPE, JSON)
            .body(payload);
        self.dispatch("POST", path, request).await
    }

    async fn dispatch<T: DeserializeOwned>(
        &self,
        method: &'static str,
        path: &str,
        request: RequestBuilder,
    ) -> Envelope<T> {
        debug!(method, path, "api: sending request");

        let response = match request.header(ACCEPT, JSON).send().await {
            Ok(response) => response,
            Err(err) => {
                warn!(method, path, error = %err, "api: no response received");
                return Envelope::Error(network_error(&err));
            }
        };

        let status = response.status();
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(err) => {
                warn!(method, path, status = status.as_u16(), error = %err, "api: failed reading body");
                return Envelope::Error(network_error(&err));
            }
        };

        if !status.is_success() {
            let err = error_from_body(status, &body);
            warn!(
                method,
                path,
                status = status.as_u16(),
                code = err.code().unwrap_or("-"),
                "api: request rejected: {}",
                err.message
            );
            return Envelope::Error(err);
        }

        decode_body(&body).into()
    }
}

fn network_error(err: &reqwest::Error) -> ApiError {
    let message = if err.is_timeout() {
        "Request timed out. Check your connection and try again."
    } else {
        "Network error: unable to reach the server. Check your connection and try again."
    };
    ApiError::network(message).details(Value::String(err.to_string()))
}

fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    let body = if body.is_empty() { b"null".as_slice() } else { body };
    serde_json::from_slice(body).map_err(|err| {
        ApiError::invalid_response(format!("Unexpected response from server: {err}"))
    })
}

/// Builds the error for a non-success response, keeping whatever message,
/// code and details the server supplied.
pub(crate) fn error_from_body(status: StatusCode, body: &[u8]) -> ApiError {
    let fallback = match status.canonical_reason() {
        Some(reason) => format!("Request failed with status {} ({reason})", status.as_u16()),
        None => format!("Request failed with status {}", status.as_u16()),
    };

    let err = match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => error_from_object(map, fallback),
        Ok(Value::String(text)) if !text.trim().is_empty() => ApiError::new(text),
        _ => ApiError::new(fallback),
    };
    err.status(status.as_u16())
}

fn error_from_object(mut map: Map<String, Value>, fallback: String) -> ApiError {
    match map.remove("error") {
        Some(Value::Object(inner)) => {
            return ApiError {
                message: text(inner.get("message")).unwrap_or(fallback),
                code: text(inner.get("code")),
                details: inner.get("details").cloned(),
                status: None,
            }
        }
        Some(Value::String(message)) if !message.trim().is_empty() => {
            return ApiError {
                message,
                code: text(map.get("code")),
                details: map.get("details").cloned(),
                status: None,
            }
        }
        _ => {}
    }

    match map.remove("detail") {
        Some(Value::String(message)) => ApiError {
            message,
            code: text(map.get("code")),
            details: None,
            status: None,
        },
        Some(Value::Object(detail)) => ApiError {
            message: text(detail.get("message")).unwrap_or(fallback),
            code: text(detail.get("code")),
            details: Some(Value::Object(detail)),
            status: None,
        },
        Some(Value::Array(items)) => ApiError {
            message: items
                .first()
                .and_then(|item| text(item.get("msg")))
                .unwrap_or(fallback),
            code: None,
            details: Some(Value::Array(items)),
            status: None,
        },
        _ => ApiError {
            message: text(map.get("message")).unwrap_or(fallback),
            code: text(map.get("code")),
            details: map.get("details").cloned(),
            status: None,
        },
    }
}

fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
