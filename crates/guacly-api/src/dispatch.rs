// Request dispatcher.
//
// Every authenticated call funnels through `Session::send`: it attaches the
// session token as the `token` query parameter, logs the outcome, and maps
// non-2xx statuses onto `Error`. 404 is logged at debug since callers often
// probe for absence; every other failure is logged at error.

use reqwest::{Method, StatusCode};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, error};
use url::Url;

use crate::error::Error;
use crate::patch::PatchOperation;
use crate::session::Session;

/// Login field Guacamole asks for when TOTP is enabled.
const TOTP_FIELD: &str = "guac-totp";

/// How [`Session::request`] should hand back a successful response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    /// Decode the body as JSON.
    #[default]
    Json,
    /// Return the response untouched (status, headers, body).
    Raw,
}

/// A successful response from [`Session::request`].
#[derive(Debug)]
pub enum Reply {
    Json(Value),
    Raw(reqwest::Response),
}

impl Reply {
    /// The decoded JSON, if this is a `Json` reply.
    pub fn into_json(self) -> Option<Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Raw(_) => None,
        }
    }

    /// The raw response, if this is a `Raw` reply.
    pub fn into_raw(self) -> Option<reqwest::Response> {
        match self {
            Self::Json(_) => None,
            Self::Raw(resp) => Some(resp),
        }
    }
}

/// Error body returned by the Guacamole REST API.
#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    expected: Option<Vec<ExpectedField>>,
}

#[derive(Debug, Deserialize)]
struct ExpectedField {
    name: String,
}

impl Session {
    /// Send an authenticated request.
    ///
    /// `params` become query parameters; a caller-supplied `token` is
    /// replaced by the session token. `body`, when given, is sent as JSON.
    /// Fails with [`Error::TokenRevoked`] after [`logout`](Session::logout).
    pub async fn request(
        &self,
        method: Method,
        url: Url,
        params: &[(&str, String)],
        body: Option<&Value>,
        format: ResponseFormat,
    ) -> Result<Reply, Error> {
        let resp = self.send(method, url, params, body).await?;
        match format {
            ResponseFormat::Json => decode_json(resp).await.map(Reply::Json),
            ResponseFormat::Raw => Ok(Reply::Raw(resp)),
        }
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        params: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<reqwest::Response, Error> {
        let token = self.token()?.expose_secret();

        let mut query: Vec<(&str, &str)> = params
            .iter()
            .filter(|(key, _)| *key != "token")
            .map(|(key, value)| (*key, value.as_str()))
            .collect();
        let target = format!("{method} {}", redact(url.path(), token));
        debug!(%target, params = ?query, has_body = body.is_some(), "sending request");
        query.push(("token", token));

        let mut builder = self.http().request(method, url).query(&query);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        if status.is_success() {
            debug!(%target, %status, "request succeeded");
            return Ok(resp);
        }

        let raw = error_body(resp.text().await, &target);
        if status == StatusCode::NOT_FOUND {
            debug!(%target, %status, body = %raw, "request failed");
        } else {
            error!(%target, %status, body = %raw, "request failed");
        }
        Err(status_error(status, raw))
    }

    // ── Typed helpers ────────────────────────────────────────────────

    pub(crate) async fn get_json(&self, url: Url) -> Result<Value, Error> {
        self.get_json_with_params(url, &[]).await
    }

    pub(crate) async fn get_json_with_params(
        &self,
        url: Url,
        params: &[(&str, String)],
    ) -> Result<Value, Error> {
        decode_json(self.send(Method::GET, url, params, None).await?).await
    }

    pub(crate) async fn post_json(&self, url: Url, body: &Value) -> Result<Value, Error> {
        decode_json(self.send(Method::POST, url, &[], Some(body)).await?).await
    }

    pub(crate) async fn put(&self, url: Url, body: &Value) -> Result<StatusCode, Error> {
        Ok(self.send(Method::PUT, url, &[], Some(body)).await?.status())
    }

    pub(crate) async fn patch(
        &self,
        url: Url,
        operations: &[PatchOperation],
    ) -> Result<StatusCode, Error> {
        let body = json!(operations);
        Ok(self.send(Method::PATCH, url, &[], Some(&body)).await?.status())
    }

    pub(crate) async fn delete(&self, url: Url) -> Result<StatusCode, Error> {
        Ok(self.send(Method::DELETE, url, &[], None).await?.status())
    }
}

/// Mask the token where it appears in a path (`DELETE /tokens/{token}`).
fn redact(path: &str, token: &str) -> String {
    if token.is_empty() {
        path.to_owned()
    } else {
        path.replace(token, "<token>")
    }
}

/// Body of a failed response. A body that cannot be read is logged and
/// treated as empty so the status still maps onto an [`Error`].
fn error_body(read: Result<String, reqwest::Error>, target: &str) -> String {
    read.unwrap_or_else(|e| {
        debug!(%target, error = %e, "failed to read error body");
        String::new()
    })
}

/// Decode a successful response as JSON. An empty body is a decode error.
async fn decode_json(resp: reqwest::Response) -> Result<Value, Error> {
    let body = resp.text().await?;
    serde_json::from_str(&body).map_err(|e| {
        let preview: String = body.chars().take(200).collect();
        error!(error = %e, "response is not valid JSON");
        Error::Deserialization {
            message: format!("{e} (body preview: {preview:?})"),
            body,
        }
    })
}

/// Map a non-success status and its body onto an [`Error`].
///
/// The message comes from the API's `{"message": ...}` field when present,
/// else the raw body, else the status text.
pub(crate) fn status_error(status: StatusCode, body: String) -> Error {
    let message = serde_json::from_str::<ApiError>(&body)
        .ok()
        .and_then(|e| e.message)
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status.to_string()
            } else {
                body.clone()
            }
        });

    match status.as_u16() {
        400 => Error::Conflict { message, body },
        401 => Error::Unauthorized { message, body },
        403 => Error::Forbidden { message, body },
        404 => Error::NotFound { message, body },
        code @ 500..=599 => Error::Server {
            status: code,
            message,
            body,
        },
        code => Error::Http {
            status: code,
            message,
            body,
        },
    }
}

/// Whether a failed login is asking for a TOTP code.
///
/// Guacamole answers with `INSUFFICIENT_CREDENTIALS` and lists the
/// `guac-totp` field among the expected ones.
pub(crate) fn requires_totp(status: StatusCode, body: &str) -> bool {
    if status != StatusCode::FORBIDDEN {
        return false;
    }
    serde_json::from_str::<ApiError>(body).is_ok_and(|e| {
        e.kind.as_deref() == Some("INSUFFICIENT_CREDENTIALS")
            && e.expected
                .unwrap_or_default()
                .iter()
                .any(|field| field.name == TOTP_FIELD)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_is_taken_from_api_error() {
        let err = status_error(
            StatusCode::UNAUTHORIZED,
            r#"{"message":"Invalid password","type":"INVALID_CREDENTIALS"}"#.into(),
        );
        match err {
            Error::Unauthorized { message, body } => {
                assert_eq!(message, "Invalid password");
                assert!(body.contains("INVALID_CREDENTIALS"));
            }
            other => panic!("expected Unauthorized, got {other:?}"),
        }
    }

    #[test]
    fn plain_text_body_becomes_message() {
        let err = status_error(StatusCode::BAD_GATEWAY, "upstream down".into());
        assert_eq!(err.status(), Some(502));
        assert!(err.is_transient());
        assert_eq!(err.to_string(), "Server error (HTTP 502): upstream down");
    }

    #[test]
    fn empty_body_falls_back_to_status_text() {
        let err = status_error(StatusCode::NOT_FOUND, String::new());
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Not found (HTTP 404): 404 Not Found");
    }

    #[test]
    fn statuses_map_to_variants() {
        assert!(matches!(
            status_error(StatusCode::BAD_REQUEST, String::new()),
            Error::Conflict { .. }
        ));
        assert!(matches!(
            status_error(StatusCode::FORBIDDEN, String::new()),
            Error::Forbidden { .. }
        ));
        assert!(matches!(
            status_error(StatusCode::IM_A_TEAPOT, String::new()),
            Error::Http { status: 418, .. }
        ));
    }

    #[test]
    fn token_is_masked_in_logged_paths() {
        assert_eq!(redact("/api/tokens/ABC123", "ABC123"), "/api/tokens/<token>");
        assert_eq!(redact("/api/session/data/mysql/users", "ABC123"), "/api/session/data/mysql/users");
    }

    #[test]
    fn unreadable_error_body_is_empty() {
        let read_err = reqwest::Client::new()
            .get("not a url")
            .build()
            .map(|_| String::new());
        assert!(read_err.is_err());
        assert_eq!(error_body(read_err, "GET /api/tokens"), "");
        assert_eq!(error_body(Ok("gone".into()), "GET /api/tokens"), "gone");
    }

    #[test]
    fn detects_totp_challenge() {
        let body = r#"{
            "message": "Verification code required",
            "type": "INSUFFICIENT_CREDENTIALS",
            "expected": [{ "name": "guac-totp", "type": "GUAC_TOTP_CODE" }]
        }"#;
        assert!(requires_totp(StatusCode::FORBIDDEN, body));
        assert!(!requires_totp(StatusCode::UNAUTHORIZED, body));
    }

    #[test]
    fn other_insufficient_credentials_are_not_totp() {
        let body = r#"{
            "type": "INSUFFICIENT_CREDENTIALS",
            "expected": [{ "name": "duo-response" }]
        }"#;
        assert!(!requires_totp(StatusCode::FORBIDDEN, body));
        assert!(!requires_totp(StatusCode::FORBIDDEN, "not json"));
    }
}
