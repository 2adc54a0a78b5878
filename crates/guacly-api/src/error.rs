use thiserror::Error;

/// Top-level error type for the `guacly-api` crate.
///
/// Covers every failure mode of the client: authentication, HTTP status
/// failures reported by the dispatcher, client-side payload validation,
/// transport, and decoding. Status variants carry the server's message and
/// the raw response body.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login failed (wrong credentials, malformed token response, etc.)
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The server demands a TOTP code but no secret was configured.
    #[error("Two-factor authentication token required")]
    TwoFactorRequired,

    /// The session token was revoked by `logout` and cannot be reused.
    #[error("Session token revoked -- log in again")]
    TokenRevoked,

    /// Requested datasource is not offered by the server.
    #[error("Datasource '{requested}' does not exist (available: {available:?})")]
    UnknownDatasource {
        requested: String,
        available: Vec<String>,
    },

    /// TOTP secret is not valid base32.
    #[error("Invalid TOTP secret: {0}")]
    InvalidSecret(String),

    // ── HTTP status ─────────────────────────────────────────────────
    /// HTTP 400. Guacamole answers this on create when the identifier
    /// already exists.
    #[error("Request rejected (HTTP 400): {message}")]
    Conflict { message: String, body: String },

    /// HTTP 401. Bad credentials or an expired token.
    #[error("Unauthorized (HTTP 401): {message}")]
    Unauthorized { message: String, body: String },

    /// HTTP 403.
    #[error("Forbidden (HTTP 403): {message}")]
    Forbidden { message: String, body: String },

    /// HTTP 404.
    #[error("Not found (HTTP 404): {message}")]
    NotFound { message: String, body: String },

    /// HTTP 5xx.
    #[error("Server error (HTTP {status}): {message}")]
    Server {
        status: u16,
        message: String,
        body: String,
    },

    /// Any other non-success status.
    #[error("HTTP {status}: {message}")]
    Http {
        status: u16,
        message: String,
        body: String,
    },

    // ── Client-side ─────────────────────────────────────────────────
    /// Payload failed the template check; no request was sent.
    #[error("Invalid payload: field '{field}' {reason}")]
    Validation { field: String, reason: String },

    /// Name pattern for a regex tree search did not compile.
    #[error("Invalid name pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Connection settings are unusable.
    #[error("Invalid {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// The HTTP status this error was raised for, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Conflict { .. } => Some(400),
            Self::Unauthorized { .. } => Some(401),
            Self::Forbidden { .. } => Some(403),
            Self::NotFound { .. } => Some(404),
            Self::Server { status, .. } | Self::Http { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns `true` if re-authenticating might resolve this error.
    pub fn is_auth_expired(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized { .. } | Self::TokenRevoked | Self::Authentication { .. }
        )
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if the failure is transient. Nothing retries on the
    /// caller's behalf; this only informs the caller's own policy.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Server { status, .. } => matches!(status, 502..=504),
            _ => false,
        }
    }

    /// Raw response body for status errors.
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Conflict { body, .. }
            | Self::Unauthorized { body, .. }
            | Self::Forbidden { body, .. }
            | Self::NotFound { body, .. }
            | Self::Server { body, .. }
            | Self::Http { body, .. }
            | Self::Deserialization { body, .. } => Some(body),
            _ => None,
        }
    }
}
