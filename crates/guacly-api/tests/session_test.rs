#![allow(clippy::unwrap_used)]
// Login, logout and dispatcher tests for `Session` using wiremock.

use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use guacly_api::{
    Credentials, Error, FixedClock, Reply, ResponseFormat, Session, SessionConfig, TransportConfig,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn config_for(server: &MockServer) -> SessionConfig {
    SessionConfig::from_url(&server.uri()).unwrap()
}

fn token_body() -> serde_json::Value {
    json!({
        "authToken": "T",
        "username": "admin",
        "dataSource": "mysql",
        "availableDataSources": ["mysql", "mysql-shared"]
    })
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/tokens"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body()))
        .mount(server)
        .await;
}

fn token_session(server: &MockServer) -> Session {
    let base_url = Url::parse(&format!("{}/api", server.uri())).unwrap();
    Session::with_token(
        &TransportConfig::default(),
        base_url,
        SecretString::from("T".to_owned()),
        "mysql",
    )
    .unwrap()
}

// ── Login ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_login_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/tokens"))
        .and(body_string_contains("username=admin"))
        .and(body_string_contains("password=secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body()))
        .expect(1)
        .mount(&server)
        .await;

    let session = Session::login(&config_for(&server), &Credentials::new("admin", "secret"))
        .await
        .unwrap();

    assert_eq!(session.token().unwrap().expose_secret(), "T");
    assert_eq!(session.primary_datasource(), "mysql");
    assert_eq!(session.username(), Some("admin"));
    assert!(session.available_datasources().contains("mysql-shared"));
    assert!(!session.ssl_verify());
}

#[tokio::test]
async fn test_login_sends_totp_code() {
    let server = MockServer::start().await;

    // RFC 6238 SHA-1 secret at T = 59 s.
    Mock::given(method("POST"))
        .and(path("/api/tokens"))
        .and(body_string_contains("guac-totp=287082"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body()))
        .expect(1)
        .mount(&server)
        .await;

    let credentials = Credentials::new("admin", "secret")
        .with_totp_secret("GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ");
    let session = Session::login_with_clock(&config_for(&server), &credentials, &FixedClock(59))
        .await
        .unwrap();

    assert!(session.is_authenticated());
}

#[tokio::test]
async fn test_login_bad_credentials() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/tokens"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "message": "Invalid login.",
            "type": "INVALID_CREDENTIALS"
        })))
        .mount(&server)
        .await;

    let result = Session::login(&config_for(&server), &Credentials::new("admin", "nope")).await;

    match result {
        Err(Error::Authentication { message }) => {
            assert_eq!(message, "invalid username or password");
        }
        other => panic!("expected Authentication error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_login_two_factor_required() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/tokens"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "message": "Verification code required",
            "type": "INSUFFICIENT_CREDENTIALS",
            "expected": [{ "name": "guac-totp", "type": "GUAC_TOTP_CODE" }]
        })))
        .mount(&server)
        .await;

    let result = Session::login(&config_for(&server), &Credentials::new("admin", "secret")).await;

    assert!(
        matches!(result, Err(Error::TwoFactorRequired)),
        "expected TwoFactorRequired, got: {result:?}"
    );
}

#[tokio::test]
async fn test_login_incomplete_token_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/tokens"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "authToken": "T" })))
        .mount(&server)
        .await;

    let result = Session::login(&config_for(&server), &Credentials::new("admin", "secret")).await;

    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_login_default_datasource() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    let config = SessionConfig {
        default_datasource: Some("mysql-shared".into()),
        ..config_for(&server)
    };
    let session = Session::login(&config, &Credentials::new("admin", "secret"))
        .await
        .unwrap();
    assert_eq!(session.primary_datasource(), "mysql-shared");

    let config = SessionConfig {
        default_datasource: Some("ldap".into()),
        ..config_for(&server)
    };
    let result = Session::login(&config, &Credentials::new("admin", "secret")).await;
    match result {
        Err(Error::UnknownDatasource { requested, available }) => {
            assert_eq!(requested, "ldap");
            assert_eq!(available, vec!["mysql", "mysql-shared"]);
        }
        other => panic!("expected UnknownDatasource, got: {other:?}"),
    }
}

// ── Logout ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_logout_revokes_token() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    Mock::given(method("DELETE"))
        .and(path("/api/tokens/T"))
        .and(query_param("token", "T"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/session/data/mysql/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let mut session = Session::login(&config_for(&server), &Credentials::new("admin", "secret"))
        .await
        .unwrap();
    session.logout().await.unwrap();

    assert!(!session.is_authenticated());
    let result = session.users().list().await;
    assert!(
        matches!(result, Err(Error::TokenRevoked)),
        "expected TokenRevoked, got: {result:?}"
    );
}

// ── JSON auth extension ─────────────────────────────────────────────

#[tokio::test]
async fn test_json_token_exchange() {
    let server = MockServer::start().await;
    let session = token_session(&server);

    Mock::given(method("POST"))
        .and(path("/api/tokens"))
        .and(body_json(json!({ "data": "c2lnbmVkLWJsb2I=" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "authToken": "JSON-TOKEN",
            "dataSource": "json"
        })))
        .mount(&server)
        .await;

    let token = session.json_token(&json!("c2lnbmVkLWJsb2I=")).await.unwrap();
    assert_eq!(token.expose_secret(), "JSON-TOKEN");
}

// ── Dispatcher ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_request_unauthorized_carries_message() {
    let server = MockServer::start().await;
    let session = token_session(&server);

    Mock::given(method("GET"))
        .and(path("/api/session/data/mysql/users"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "Invalid password" })),
        )
        .mount(&server)
        .await;

    let url = session.data_url("mysql", ["users"]).unwrap();
    let err = session
        .request(Method::GET, url, &[], None, ResponseFormat::Json)
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(401));
    assert!(err.is_auth_expired());
    match err {
        Error::Unauthorized { message, .. } => assert_eq!(message, "Invalid password"),
        other => panic!("expected Unauthorized, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_request_raw_returns_response() {
    let server = MockServer::start().await;
    let session = token_session(&server);

    Mock::given(method("DELETE"))
        .and(path("/api/session/data/mysql/connections/7"))
        .and(query_param("token", "T"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let url = session.data_url("mysql", ["connections", "7"]).unwrap();
    let reply = session
        .request(Method::DELETE, url, &[], None, ResponseFormat::Raw)
        .await
        .unwrap();

    let Reply::Raw(resp) = reply else {
        panic!("expected a raw reply");
    };
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_request_non_json_body() {
    let server = MockServer::start().await;
    let session = token_session(&server);

    Mock::given(method("GET"))
        .and(path("/api/session/data/mysql/connections"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy login</html>"))
        .mount(&server)
        .await;

    let url = session.data_url("mysql", ["connections"]).unwrap();
    let result = session
        .request(Method::GET, url, &[], None, ResponseFormat::Json)
        .await;

    match result {
        Err(Error::Deserialization { body, .. }) => assert!(body.contains("proxy login")),
        other => panic!("expected Deserialization error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_list_body_is_a_decode_error() {
    let server = MockServer::start().await;
    let session = token_session(&server);

    Mock::given(method("GET"))
        .and(path("/api/session/data/mysql/connections"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let result = session.connections().list().await;
    assert!(
        matches!(result, Err(Error::Deserialization { ref body, .. }) if body.is_empty()),
        "expected Deserialization error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_request_replaces_caller_token() {
    let server = MockServer::start().await;
    let session = token_session(&server);

    Mock::given(method("GET"))
        .and(path("/api/session/data/mysql/connections/1/history"))
        .and(query_param("token", "T"))
        .and(query_param("order", "-startDate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let url = session
        .data_url("mysql", ["connections", "1", "history"])
        .unwrap();
    let params = [("token", "forged".to_owned()), ("order", "-startDate".to_owned())];
    let reply = session
        .request(Method::GET, url, &params, None, ResponseFormat::Json)
        .await
        .unwrap();

    assert_eq!(reply.into_json(), Some(json!([])));
}

#[tokio::test]
async fn test_request_server_error() {
    let server = MockServer::start().await;
    let session = token_session(&server);

    Mock::given(method("GET"))
        .and(path("/api/session/data/mysql/users"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let url = session.data_url("mysql", ["users"]).unwrap();
    let err = session
        .request(Method::GET, url, &[], None, ResponseFormat::Json)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Server { status: 503, .. }));
    assert!(err.is_transient());
    assert_eq!(err.body(), Some("maintenance"));
}
