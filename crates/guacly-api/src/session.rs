// Session state and the token exchange.
//
// `Session::login` posts form-encoded credentials to `/api/tokens` and keeps
// the returned auth token plus datasource selection. Every other request
// goes through the dispatcher in `dispatch.rs`, which attaches the token as
// a query parameter.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};
use strum::{Display, EnumString};
use tracing::{debug, warn};
use url::Url;

use crate::dispatch::{requires_totp, status_error};
use crate::error::Error;
use crate::totp::{self, Clock, SystemClock};
use crate::transport::{TlsMode, TransportConfig};

// ── Connection settings ─────────────────────────────────────────────

/// URL scheme for the Guacamole server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Protocol {
    Http,
    #[default]
    Https,
}

impl Protocol {
    pub fn default_port(self) -> u16 {
        match self {
            Self::Http => 80,
            Self::Https => 443,
        }
    }
}

/// How to reach a Guacamole server.
///
/// Never touches disk; `guacly-config` builds one from a profile.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Server hostname or IP address. Default: `localhost`.
    pub hostname: String,
    /// URL scheme. Default: HTTPS.
    pub protocol: Protocol,
    /// TCP port. Default: 443.
    pub port: u16,
    /// Path the web application is mounted under (e.g. `/guacamole/`).
    /// Default: `/`.
    pub base_path: String,
    /// TLS verification. Default: accept invalid certificates, matching
    /// the usual self-signed deployment.
    pub tls: TlsMode,
    /// Datasource to scope managers to. Default: the server's primary
    /// datasource from the login response.
    pub default_datasource: Option<String>,
    /// Keep cookies set by the server across requests. Default: off.
    pub use_cookies: bool,
    /// Per-request timeout. Default: 30 seconds.
    pub timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            hostname: "localhost".into(),
            protocol: Protocol::Https,
            port: 443,
            base_path: "/".into(),
            tls: TlsMode::default(),
            default_datasource: None,
            use_cookies: false,
            timeout: Duration::from_secs(30),
        }
    }
}

impl SessionConfig {
    /// Derive settings from a full server URL such as
    /// `https://guac.example.com:8443/guacamole/`.
    ///
    /// A trailing `/api` segment is dropped since it is appended again by
    /// [`base_url`](Self::base_url).
    pub fn from_url(raw: &str) -> Result<Self, Error> {
        let url = Url::parse(raw)?;
        let protocol: Protocol = url.scheme().parse().map_err(|_| Error::InvalidConfig {
            field: "protocol".into(),
            reason: format!("expected 'http' or 'https', got '{}'", url.scheme()),
        })?;
        let hostname = url
            .host_str()
            .ok_or_else(|| Error::InvalidConfig {
                field: "hostname".into(),
                reason: format!("no host in {raw}"),
            })?
            .to_owned();
        let path = url.path().trim_end_matches('/');
        let path = path.strip_suffix("/api").unwrap_or(path);

        Ok(Self {
            hostname,
            protocol,
            port: url.port().unwrap_or_else(|| protocol.default_port()),
            base_path: format!("{path}/"),
            ..Self::default()
        })
    }

    /// `{protocol}://{hostname}:{port}{base_path}api`
    pub fn base_url(&self) -> Result<Url, Error> {
        let host = self.hostname.trim();
        if host.is_empty() {
            return Err(Error::InvalidConfig {
                field: "hostname".into(),
                reason: "must not be empty".into(),
            });
        }
        let host = if host.contains(':') && !host.starts_with('[') {
            format!("[{host}]")
        } else {
            host.to_owned()
        };

        let trimmed = self.base_path.trim_matches('/');
        let path = if trimmed.is_empty() {
            "/".to_owned()
        } else {
            format!("/{trimmed}/")
        };

        Ok(Url::parse(&format!(
            "{}://{host}:{}{path}api",
            self.protocol, self.port
        ))?)
    }

    /// Transport settings derived from this config.
    pub fn transport(&self) -> TransportConfig {
        let transport = TransportConfig {
            tls: self.tls.clone(),
            timeout: self.timeout,
            cookie_jar: None,
        };
        if self.use_cookies {
            transport.with_cookie_jar()
        } else {
            transport
        }
    }
}

/// Login credentials.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
    /// Base32 TOTP secret. When set, a `guac-totp` code is sent on login.
    pub totp_secret: Option<SecretString>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
            totp_secret: None,
        }
    }

    pub fn with_totp_secret(mut self, secret: impl Into<String>) -> Self {
        self.totp_secret = Some(SecretString::from(secret.into()));
        self
    }
}

// ── Token response ──────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    auth_token: String,
    #[serde(default)]
    username: Option<String>,
    data_source: String,
    available_data_sources: Vec<String>,
}

// ── Session ─────────────────────────────────────────────────────────

/// An authenticated Guacamole session.
///
/// Owns the auth token, base URL and datasource selection. Managers borrow
/// the session; operations that change the token or datasource take
/// `&mut self`, so they cannot overlap with outstanding managers.
#[derive(Debug)]
pub struct Session {
    http: reqwest::Client,
    base_url: Url,
    token: Option<SecretString>,
    username: Option<String>,
    primary_datasource: String,
    available_datasources: BTreeSet<String>,
    tls: TlsMode,
    cookie_jar: Option<Arc<Jar>>,
}

impl Session {
    /// Authenticate and open a session.
    ///
    /// `POST {base}/tokens` with form fields `username`, `password`, and
    /// `guac-totp` when the credentials carry a TOTP secret.
    pub async fn login(config: &SessionConfig, credentials: &Credentials) -> Result<Self, Error> {
        Self::login_with_clock(config, credentials, &SystemClock).await
    }

    /// [`login`](Self::login) with an explicit clock for the TOTP code.
    pub async fn login_with_clock(
        config: &SessionConfig,
        credentials: &Credentials,
        clock: &dyn Clock,
    ) -> Result<Self, Error> {
        let base_url = config.base_url()?;
        let transport = config.transport();
        let cookie_jar = transport.cookie_jar.clone();
        let http = transport.build_client()?;

        let mut form = vec![
            ("username", credentials.username.clone()),
            ("password", credentials.password.expose_secret().to_owned()),
        ];
        if let Some(ref secret) = credentials.totp_secret {
            form.push(("guac-totp", totp::totp_with(secret.expose_secret(), clock)?));
        }

        let url = join_segments(&base_url, ["tokens"])?;
        debug!(
            %url,
            username = %credentials.username,
            totp = credentials.totp_secret.is_some(),
            "logging in"
        );

        let resp = http.post(url).form(&form).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::Authentication {
                message: "invalid username or password".into(),
            });
        }
        if !status.is_success() {
            if requires_totp(status, &body) {
                return Err(Error::TwoFactorRequired);
            }
            return Err(status_error(status, body));
        }

        let tokens: TokenResponse =
            serde_json::from_str(&body).map_err(|e| Error::Authentication {
                message: format!("missing required fields in token response: {e}"),
            })?;

        let available_datasources: BTreeSet<String> =
            tokens.available_data_sources.into_iter().collect();
        let primary_datasource = match config.default_datasource {
            Some(ref wanted) if available_datasources.contains(wanted) => wanted.clone(),
            Some(ref wanted) => {
                return Err(Error::UnknownDatasource {
                    requested: wanted.clone(),
                    available: available_datasources.into_iter().collect(),
                });
            }
            None => tokens.data_source,
        };

        debug!(datasource = %primary_datasource, "login successful");

        Ok(Self {
            http,
            base_url,
            token: Some(SecretString::from(tokens.auth_token)),
            username: tokens.username.or_else(|| Some(credentials.username.clone())),
            primary_datasource,
            available_datasources,
            tls: config.tls.clone(),
            cookie_jar,
        })
    }

    /// Resume a session from a token obtained elsewhere (a previous login,
    /// or the JSON auth extension).
    ///
    /// The HTTP client is built from `transport`, so the session reports
    /// the TLS mode and cookie jar it actually uses.
    pub fn with_token(
        transport: &TransportConfig,
        base_url: Url,
        token: SecretString,
        datasource: impl Into<String>,
    ) -> Result<Self, Error> {
        let datasource = datasource.into();
        Ok(Self {
            http: transport.build_client()?,
            base_url,
            token: Some(token),
            username: None,
            available_datasources: BTreeSet::from([datasource.clone()]),
            primary_datasource: datasource,
            tls: transport.tls.clone(),
            cookie_jar: transport.cookie_jar.clone(),
        })
    }

    /// Revoke the token: `DELETE {base}/tokens/{token}`.
    ///
    /// The token is dropped even if the server call fails; it must not be
    /// reused either way.
    pub async fn logout(&mut self) -> Result<(), Error> {
        let token = self.token()?.expose_secret().to_owned();
        let url = self.url(["tokens", token.as_str()])?;
        debug!("logging out");

        let result = self.delete(url).await;
        self.token = None;
        result.map(|status| debug!(%status, "logout complete"))
    }

    /// Exchange a signed/encrypted payload with the `guacamole-auth-json`
    /// extension for a token.
    ///
    /// `POST {base}/tokens` with body `{"data": payload}`.
    pub async fn json_token(&self, payload: &Value) -> Result<SecretString, Error> {
        let url = self.url(["tokens"])?;
        let reply = self.post_json(url, &json!({ "data": payload })).await?;
        reply
            .get("authToken")
            .and_then(Value::as_str)
            .map(|t| SecretString::from(t.to_owned()))
            .ok_or_else(|| Error::Authentication {
                message: "token response has no authToken".into(),
            })
    }

    // ── Accessors ────────────────────────────────────────────────────

    /// The API root, e.g. `https://host:443/api`.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The underlying HTTP client.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Datasource managers use when none is given explicitly.
    pub fn primary_datasource(&self) -> &str {
        &self.primary_datasource
    }

    pub fn available_datasources(&self) -> &BTreeSet<String> {
        &self.available_datasources
    }

    /// Switch the default datasource to another one the server offered.
    pub fn set_primary_datasource(&mut self, datasource: &str) -> Result<(), Error> {
        if !self.available_datasources.contains(datasource) {
            warn!(datasource, "refusing unknown datasource");
            return Err(Error::UnknownDatasource {
                requested: datasource.to_owned(),
                available: self.available_datasources.iter().cloned().collect(),
            });
        }
        datasource.clone_into(&mut self.primary_datasource);
        Ok(())
    }

    pub fn tls(&self) -> &TlsMode {
        &self.tls
    }

    /// Whether server certificates are verified.
    pub fn ssl_verify(&self) -> bool {
        self.tls.verifies()
    }

    pub fn cookie_jar(&self) -> Option<&Arc<Jar>> {
        self.cookie_jar.as_ref()
    }

    /// Whether the session still holds a token.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// The auth token, or `TokenRevoked` after logout.
    pub fn token(&self) -> Result<&SecretString, Error> {
        self.token.as_ref().ok_or(Error::TokenRevoked)
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// `{base}/{segments...}` with each segment percent-encoded.
    pub fn url<I, S>(&self, segments: I) -> Result<Url, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        join_segments(&self.base_url, segments)
    }

    /// `{base}/session/data/{datasource}/{segments...}`
    pub fn data_url<I, S>(&self, datasource: &str, segments: I) -> Result<Url, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut url = join_segments(&self.base_url, ["session", "data", datasource])?;
        url.path_segments_mut()
            .map_err(|()| cannot_be_base(&self.base_url))?
            .extend(segments);
        Ok(url)
    }
}

fn join_segments<I, S>(base: &Url, segments: I) -> Result<Url, Error>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| cannot_be_base(base))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn cannot_be_base(base: &Url) -> Error {
    Error::InvalidConfig {
        field: "base_url".into(),
        reason: format!("{base} cannot carry path segments"),
    }
}
