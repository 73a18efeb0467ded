//! HTTP gateway to the FanZone REST API.
//!
//! Every outbound request goes through [`Gateway`]. It attaches the bearer
//! token from the current session snapshot, applies the configured timeout,
//! and reduces each response to a typed outcome exactly once: success payload,
//! status with an extracted server message, or transport failure. There is no
//! retry and no token refresh.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::session::SessionHandle;

/// Low-level outcome of one API call, before per-operation translation into
/// [`crate::error::ClientError`].
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Non-2xx response. `detail` is the message extracted from the JSON
    /// body, if the server sent one.
    #[error("API error {status}: {}", .detail.as_deref().unwrap_or("no detail"))]
    Status { status: u16, detail: Option<String> },

    /// The request never completed: connection, DNS, or timeout failure.
    #[error("Request failed: {0}")]
    Transport(String),

    /// A success response carried a body this client could not parse.
    #[error("Unexpected response body: {0}")]
    Decode(String),
}

/// Shared outbound channel, cheap to clone.
#[derive(Clone)]
pub struct Gateway {
    http: reqwest::Client,
    base_url: String,
    session: SessionHandle,
}

impl Gateway {
    /// Build the client. `base_url` is the API origin without a trailing
    /// slash; paths passed to the verb methods start with `/`.
    pub fn new(base_url: &str, timeout: Duration, session: SessionHandle) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("fanzone/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET a JSON resource.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, GatewayError> {
        let response = self.send(Method::GET, path, None::<&()>).await?;
        read_json(response).await
    }

    /// POST a JSON body, expecting a JSON response.
    pub async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, GatewayError> {
        let response = self.send(Method::POST, path, Some(body)).await?;
        read_json(response).await
    }

    /// PATCH a JSON body. `Ok(None)` means the server answered
    /// `204 No Content`.
    pub async fn patch<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Option<T>, GatewayError> {
        let response = self.send(Method::PATCH, path, Some(body)).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        read_json(response).await.map(Some)
    }

    async fn send<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<reqwest::Response, GatewayError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.request(method.clone(), &url);
        if let Some(token) = self.session.access_token() {
            request = request.header("Authorization", format!("Bearer {}", token));
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        match request.send().await {
            Ok(response) => {
                debug!(%method, path, status = response.status().as_u16(), "API request");
                Ok(response)
            }
            Err(e) => {
                debug!(%method, path, error = %e, "API request failed");
                Err(GatewayError::Transport(e.to_string()))
            }
        }
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, GatewayError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| GatewayError::Transport(e.to_string()))?;

    if !status.is_success() {
        let detail = serde_json::from_str::<Value>(&body)
            .ok()
            .as_ref()
            .and_then(extract_detail);
        return Err(GatewayError::Status {
            status: status.as_u16(),
            detail,
        });
    }

    serde_json::from_str(&body).map_err(|e| GatewayError::Decode(e.to_string()))
}

/// Pull a human-readable message out of an API error body.
///
/// Django REST Framework answers either `{"detail": "..."}`, or a map of
/// field names to message lists (with `non_field_errors` for whole-object
/// complaints). The map form is joined into one line, field by field.
fn extract_detail(body: &Value) -> Option<String> {
    let obj = body.as_object()?;

    if let Some(detail) = obj.get("detail").and_then(Value::as_str) {
        return Some(detail.to_string());
    }
    if let Some(message) = obj.get("message").and_then(Value::as_str) {
        return Some(message.to_string());
    }

    let mut parts = Vec::new();
    for (field, errors) in obj {
        let messages: Vec<&str> = match errors {
            Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
            Value::String(s) => vec![s.as_str()],
            _ => continue,
        };
        if messages.is_empty() {
            continue;
        }
        if field == "non_field_errors" {
            parts.push(messages.join(", "));
        } else {
            parts.push(format!("{}: {}", field, messages.join(", ")));
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::claims::encode_unsigned;
    use crate::session::{Session, TokenPair};
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn signed_in_handle(username: &str) -> (SessionHandle, String) {
        let access = encode_unsigned(&json!({ "user_id": 7, "username": username }));
        let handle = SessionHandle::new();
        let session = Session::from_pair(TokenPair {
            access: access.clone(),
            refresh: "refresh".to_string(),
        })
        .unwrap();
        handle.install(session);
        (handle, access)
    }

    fn gateway(base_url: &str, session: SessionHandle) -> Gateway {
        Gateway::new(base_url, Duration::from_secs(5), session).unwrap()
    }

    #[tokio::test]
    async fn attaches_bearer_token_when_signed_in() {
        let server = MockServer::start().await;
        let (handle, access) = signed_in_handle("amina");

        Mock::given(method("GET"))
            .and(path("/api/bookings/"))
            .and(header("Authorization", format!("Bearer {}", access).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let result: Vec<Value> = gateway(&server.uri(), handle)
            .get("/api/bookings/")
            .await
            .unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn sends_no_auth_header_when_signed_out() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/hotels/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let _: Vec<Value> = gateway(&server.uri(), SessionHandle::new())
            .get("/api/hotels/")
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].headers.get("Authorization").is_none());
    }

    #[tokio::test]
    async fn non_success_becomes_status_with_detail() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/bookings/9/"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(json!({ "detail": "No Booking matches the given query." })),
            )
            .mount(&server)
            .await;

        let err = gateway(&server.uri(), SessionHandle::new())
            .get::<Value>("/api/bookings/9/")
            .await
            .unwrap_err();
        match err {
            GatewayError::Status { status, detail } => {
                assert_eq!(status, 404);
                assert_eq!(detail.as_deref(), Some("No Booking matches the given query."));
            }
            other => panic!("expected Status, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn patch_reads_204_as_none() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/api/bookings/3/"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let updated: Option<Value> = gateway(&server.uri(), SessionHandle::new())
            .patch("/api/bookings/3/", &json!({ "status": "cancelled" }))
            .await
            .unwrap();
        assert!(updated.is_none());
    }

    #[tokio::test]
    async fn malformed_success_body_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/hotels/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = gateway(&server.uri(), SessionHandle::new())
            .get::<Vec<Value>>("/api/hotels/")
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Decode(_)));
    }

    #[tokio::test]
    async fn unreachable_server_is_a_transport_error() {
        // Port 9 (discard) is never bound in the test environment.
        let err = gateway("http://127.0.0.1:9", SessionHandle::new())
            .get::<Value>("/token/")
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Transport(_)));
    }

    #[test]
    fn detail_extraction_prefers_detail_then_message() {
        assert_eq!(
            extract_detail(&json!({ "detail": "Not found." })).as_deref(),
            Some("Not found.")
        );
        assert_eq!(
            extract_detail(&json!({ "message": "Invalid username or password" })).as_deref(),
            Some("Invalid username or password")
        );
    }

    #[test]
    fn detail_extraction_joins_field_errors() {
        let body = json!({
            "username": ["A user with that username already exists."],
            "password": ["This field is required.", "Too short."]
        });
        let detail = extract_detail(&body).unwrap();
        assert!(detail.contains("username: A user with that username already exists."));
        assert!(detail.contains("password: This field is required., Too short."));
    }

    #[test]
    fn detail_extraction_unwraps_non_field_errors() {
        let body = json!({ "non_field_errors": ["Total price mismatch"] });
        assert_eq!(extract_detail(&body).as_deref(), Some("Total price mismatch"));
    }

    #[test]
    fn detail_extraction_gives_up_on_unknown_shapes() {
        assert!(extract_detail(&json!("just a string")).is_none());
        assert!(extract_detail(&json!({ "code": 500 })).is_none());
    }
}
