//! Secret Manager REST client end-to-end tests

use std::sync::Arc;

use hyper::StatusCode;
use seckrit::{ErrorPolicy, FetchError, Fetcher};
use seckrit_e2e::{init_test, MockSecretManager, TestWorkspace};
use seckrit_secrets::{
    GcpSecretManager, SecretError, SecretStore, SecretVersion, StaticToken,
};

const TOKEN: &str = "ya29.test-token";

fn client_for(service: &MockSecretManager, token: &str) -> GcpSecretManager {
    GcpSecretManager::with_endpoint(service.endpoint(), Arc::new(StaticToken::new(token)))
}

#[tokio::test]
async fn test_access_latest_version() {
    init_test();

    let service = MockSecretManager::start(TOKEN).await;
    service.insert("my-project", "api-key", "s3cr3t-value");

    let client = client_for(&service, TOKEN);
    let payload = client
        .access(&SecretVersion::latest("my-project", "api-key"))
        .await
        .expect("Access failed");

    assert_eq!(payload, b"s3cr3t-value");

    let requests = service.get_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "GET");
    assert_eq!(
        requests[0].uri,
        "/v1/projects/my-project/secrets/api-key/versions/latest:access"
    );
    assert_eq!(
        requests[0].authorization.as_deref(),
        Some("Bearer ya29.test-token")
    );
}

#[tokio::test]
async fn test_binary_payload_survives_transport() {
    init_test();

    let service = MockSecretManager::start(TOKEN).await;
    let payload: Vec<u8> = (0..=255).collect();
    service.insert("p", "blob", payload.clone());

    let fetched = client_for(&service, TOKEN)
        .access(&SecretVersion::latest("p", "blob"))
        .await
        .unwrap();
    assert_eq!(fetched, payload);
}

#[tokio::test]
async fn test_project_id_is_escaped_in_request_path() {
    init_test();

    let service = MockSecretManager::start(TOKEN).await;

    let result = client_for(&service, TOKEN)
        .access(&SecretVersion::latest("prod#x", "api-key"))
        .await;
    assert!(matches!(result, Err(SecretError::NotFound(_))));

    let requests = service.get_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].uri,
        "/v1/projects/prod%23x/secrets/api-key/versions/latest:access"
    );
}

#[tokio::test]
async fn test_missing_secret_is_not_found() {
    init_test();

    let service = MockSecretManager::start(TOKEN).await;

    let result = client_for(&service, TOKEN)
        .access(&SecretVersion::latest("p", "ghost"))
        .await;

    match result {
        Err(SecretError::NotFound(msg)) => assert!(msg.contains("ghost")),
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn test_bad_token_is_access_denied() {
    init_test();

    let service = MockSecretManager::start(TOKEN).await;
    service.insert("p", "s", "v");

    let result = client_for(&service, "expired")
        .access(&SecretVersion::latest("p", "s"))
        .await;
    assert!(matches!(result, Err(SecretError::AccessDenied(_))));
}

#[tokio::test]
async fn test_server_error_is_backend_error() {
    init_test();

    let service = MockSecretManager::start(TOKEN).await;
    service.insert("p", "s", "v");
    service.set_forced_status(Some(StatusCode::SERVICE_UNAVAILABLE));

    let result = client_for(&service, TOKEN)
        .access(&SecretVersion::latest("p", "s"))
        .await;
    assert!(matches!(result, Err(SecretError::BackendError { .. })));
}

#[tokio::test]
async fn test_full_run_against_rest_api() {
    init_test();

    let service = MockSecretManager::start(TOKEN).await;
    service.insert("prod-project", "database-url", "postgres://db/app\n");
    service.insert("prod-project", "service-account", r#"{"type":"service_account"}"#);

    let workspace = TestWorkspace::new();
    let manifest = workspace
        .load_manifest(
            r#"
gcp_project_id: prod-project
environment_file: "{dir}/env/app.env"
secrets:
  - name: database-url
    type: environment_variable
    destination: DATABASE_URL
  - name: service-account
    type: file
    destination: "{dir}/keys/sa.json"
"#,
        )
        .unwrap();

    let store = Arc::new(client_for(&service, TOKEN));
    let report = Fetcher::new(store, ErrorPolicy::Abort)
        .run(&manifest)
        .await
        .expect("Fetch failed");

    assert_eq!(report.environment_variables, 1);
    assert_eq!(report.files, 1);
    assert_eq!(
        workspace.read_lines("env/app.env"),
        vec!["DATABASE_URL=postgres://db/app"]
    );
    assert_eq!(
        workspace.read_bytes("keys/sa.json"),
        br#"{"type":"service_account"}"#
    );
}

#[tokio::test]
async fn test_full_run_stops_on_remote_error() {
    init_test();

    let service = MockSecretManager::start(TOKEN).await;
    service.insert("edge-project", "present", "yes");

    let workspace = TestWorkspace::new();
    let manifest = workspace
        .load_manifest(
            r#"
gcp_project_id: edge-project
environment_file: "{dir}/app.env"
secrets:
  - name: absent
    type: environment_variable
    destination: ABSENT
  - name: present
    type: environment_variable
    destination: PRESENT
"#,
        )
        .unwrap();

    let result = Fetcher::new(Arc::new(client_for(&service, TOKEN)), ErrorPolicy::Continue)
        .run(&manifest)
        .await;

    match result {
        Err(FetchError::Remote { name, source }) => {
            assert_eq!(name, "absent");
            assert!(matches!(source, SecretError::NotFound(_)));
        }
        other => panic!("expected remote error, got {other:?}"),
    }
    assert_eq!(service.get_requests().len(), 1);
}
