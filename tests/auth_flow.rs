//! End-to-end resolution tests against mock backends.

use chrono::{TimeDelta, Utc};
use delinea_secrets_client::{
    AuthenticationResolver, ClientConfig, ClientError, SecretServerClient,
};
use secrecy::ExposeSecret;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn token_body(token: &str) -> serde_json::Value {
    serde_json::json!({
        "access_token": token,
        "expires_in": 600,
        "token_type": "Bearer"
    })
}

async fn mount_healthy_secret_server(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/v1/healthcheck"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"healthy": true, "databaseHealthy": true})),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn direct_secret_server_uses_password_grant() {
    let server = MockServer::start().await;
    mount_healthy_secret_server(&server).await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_string_contains("grant_type=password"))
        .and(body_string_contains("username=alice"))
        .and(body_string_contains("password=pw"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("T")))
        .expect(1)
        .mount(&server)
        .await;

    let resolver =
        AuthenticationResolver::new(ClientConfig::password(server.uri(), "alice", "pw")).unwrap();
    let before = Utc::now();
    let session = resolver.resolve().await.unwrap();
    let after = Utc::now();

    assert_eq!(session.effective_base_url(), server.uri());
    assert_eq!(session.bearer_token().expose_secret(), "T");
    assert!(session.expires_at() >= before + TimeDelta::seconds(600));
    assert!(session.expires_at() <= after + TimeDelta::seconds(600));
    assert!(!session.is_expired());
}

#[tokio::test]
async fn plain_text_health_body_classifies_as_direct() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/healthcheck"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Healthy"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("T")))
        .mount(&server)
        .await;

    let resolver =
        AuthenticationResolver::new(ClientConfig::password(server.uri(), "alice", "pw")).unwrap();
    let session = resolver.resolve().await.unwrap();
    assert_eq!(session.effective_base_url(), server.uri());
}

#[tokio::test]
async fn platform_fronted_resolves_vault_url() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/healthcheck"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"healthy": false})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"healthy": true})))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/identity/api/oauth2/token/xpmplatform"))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("client_id=alice"))
        .and(body_string_contains("scope=xpmheadless"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("PT")))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/vaultbroker/api/vaults"))
        .and(header("Authorization", "Bearer PT"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "vaults": [
                {
                    "vaultId": "v-1",
                    "name": "Retired",
                    "type": "SecretServer",
                    "isDefault": true,
                    "isActive": false,
                    "connection": {"url": "https://retired.example.com"}
                },
                {
                    "vaultId": "v-2",
                    "name": "Default Vault",
                    "type": "SecretServer",
                    "isDefault": true,
                    "isActive": true,
                    "connection": {"url": "https://tenant.secretservercloud.com/"}
                }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let resolver =
        AuthenticationResolver::new(ClientConfig::password(server.uri(), "alice", "pw")).unwrap();
    let session = resolver.resolve().await.unwrap();

    assert_eq!(
        session.effective_base_url(),
        "https://tenant.secretservercloud.com"
    );
    assert_eq!(session.bearer_token().expose_secret(), "PT");
}

#[tokio::test]
async fn missing_default_vault_fails_resolution() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/healthcheck"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"healthy": true})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/identity/api/oauth2/token/xpmplatform"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("PT")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/vaultbroker/api/vaults"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "vaults": [
                {"vaultId": "v-1", "name": "A", "isDefault": true, "isActive": false},
                {"vaultId": "v-2", "name": "B", "isDefault": false, "isActive": true}
            ]
        })))
        .mount(&server)
        .await;

    let resolver =
        AuthenticationResolver::new(ClientConfig::password(server.uri(), "alice", "pw")).unwrap();
    let err = resolver.resolve().await.unwrap_err();
    assert!(matches!(err, ClientError::NoDefaultVault));
}

#[tokio::test]
async fn unreachable_backend_fails_before_any_token_call() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/healthcheck"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    // No grant flow may start once classification dead-ends.
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let resolver =
        AuthenticationResolver::new(ClientConfig::password(server.uri(), "alice", "pw")).unwrap();
    let err = resolver.resolve().await.unwrap_err();
    assert!(matches!(err, ClientError::Unreachable(_)));
}

#[tokio::test]
async fn rejected_grant_surfaces_response_body() {
    let server = MockServer::start().await;
    mount_healthy_secret_server(&server).await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid username or password"))
        .mount(&server)
        .await;

    let resolver =
        AuthenticationResolver::new(ClientConfig::password(server.uri(), "alice", "wrong")).unwrap();
    match resolver.resolve().await.unwrap_err() {
        ClientError::GrantRejected { status, body } => {
            assert_eq!(status, 401);
            assert!(body.contains("invalid username or password"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn sdk_client_mode_registers_then_exchanges_credentials() {
    let server = MockServer::start().await;

    // Mode 1 skips classification entirely.
    Mock::given(method("GET"))
        .and(path("/api/v1/healthcheck"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/sdk-client-accounts"))
        .and(body_partial_json(serde_json::json!({
            "RuleName": "machines",
            "OnboardingKey": "onboard-key"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "clientId": "abc123",
            "clientSecret": "minted-secret"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("client_id=sdk-client-abc123"))
        .and(body_string_contains("client_secret=minted-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("ST")))
        .expect(1)
        .mount(&server)
        .await;

    let resolver = AuthenticationResolver::new(ClientConfig::sdk_client(
        server.uri(),
        "machines",
        "onboard-key",
    ))
    .unwrap();
    let session = resolver.resolve().await.unwrap();

    assert_eq!(session.effective_base_url(), server.uri());
    assert_eq!(session.bearer_token().expose_secret(), "ST");
}

#[tokio::test]
async fn invalid_configuration_fails_without_network() {
    let err = AuthenticationResolver::new(ClientConfig::password("", "u", "p")).unwrap_err();
    assert!(matches!(err, ClientError::InvalidConfiguration(_)));

    let err =
        AuthenticationResolver::new(ClientConfig::sdk_client("https://x.example.com", "", ""))
            .unwrap_err();
    assert!(matches!(err, ClientError::InvalidConfiguration(_)));
}

#[tokio::test]
async fn failed_resolution_never_constructs_a_client() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = SecretServerClient::connect(ClientConfig::password(server.uri(), "u", "p")).await;
    assert!(matches!(result, Err(ClientError::Unreachable(_))));
}
