use super::*;

use serde::Deserialize;

use crate::net::mock_transport::{MockTransport, Scripted, ok, status};
use crate::state::credential::{CredentialRecord, Role};
use crate::state::guard::RouteGuard;
use crate::state::storage::MemoryStorage;

// =============================================================
// Helpers
// =============================================================

fn client(responses: Vec<Scripted>) -> AuthorizedClient<MockTransport> {
    let session = SessionStore::new(MemoryStorage::shared());
    AuthorizedClient::new(MockTransport::with(responses), session)
}

fn signed_in(responses: Vec<Scripted>, token: &str) -> AuthorizedClient<MockTransport> {
    let client = client(responses);
    client.session().save(CredentialRecord::new(token, "USER")).unwrap();
    client
}

// =============================================================
// Authorization header
// =============================================================

#[tokio::test]
async fn attaches_bearer_token_when_signed_in() {
    let client = signed_in(vec![ok("[]")], "abc");
    client.request(Method::GET, "/cuentas/miscuentas", None).await.unwrap();

    let sent = client.transport().requests();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].authorization().as_deref(), Some("Bearer abc"));
    assert_eq!(sent[0].method, Method::GET);
    assert_eq!(sent[0].path, "/cuentas/miscuentas");
}

#[tokio::test]
async fn omits_header_without_session() {
    let client = client(vec![ok("[]")]);
    client.request(Method::GET, "/categorias", None).await.unwrap();
    assert_eq!(client.transport().requests()[0].authorization(), None);
}

#[tokio::test]
async fn uses_token_current_at_call_time() {
    let client = signed_in(vec![ok("{}"), ok("{}")], "old");
    client.request(Method::GET, "/a", None).await.unwrap();
    client.session().save(CredentialRecord::new("new", "ADMIN")).unwrap();
    client.request(Method::GET, "/b", None).await.unwrap();

    let sent = client.transport().requests();
    assert_eq!(sent[0].bearer.as_deref(), Some("old"));
    assert_eq!(sent[1].bearer.as_deref(), Some("new"));
}

#[tokio::test]
async fn forwards_json_body() {
    let client = signed_in(vec![ok(r#"{"id":1}"#)], "abc");
    let body = serde_json::json!({"nombre": "Ahorros"});
    let value = client.request(Method::POST, "/cuentas", Some(body.clone())).await.unwrap();
    assert_eq!(value, serde_json::json!({"id": 1}));
    assert_eq!(client.transport().requests()[0].body, Some(body));
}

// =============================================================
// Success decoding
// =============================================================

#[tokio::test]
async fn empty_success_body_is_null() {
    let client = signed_in(vec![status(204, "")], "abc");
    let value = client.request(Method::DELETE, "/cuentas/1", None).await.unwrap();
    assert_eq!(value, Value::Null);
}

#[tokio::test]
async fn malformed_success_body_is_network_error() {
    let client = signed_in(vec![ok("<html>oops")], "abc");
    let err = client.request(Method::GET, "/cuentas/miscuentas", None).await.unwrap_err();
    assert!(matches!(err, ApiError::NetworkError(_)));
    assert!(client.session().is_authenticated());
}

#[tokio::test]
async fn request_json_decodes_typed_payload() {
    #[derive(Deserialize)]
    struct Named {
        nombre: String,
    }
    let client = signed_in(vec![ok(r#"[{"nombre":"a"},{"nombre":"b"}]"#)], "abc");
    let items: Vec<Named> = client.request_json::<(), _>(Method::GET, "/x", None).await.unwrap();
    assert_eq!(items.iter().map(|n| n.nombre.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
}

#[tokio::test]
async fn request_json_shape_mismatch_is_network_error() {
    let client = signed_in(vec![ok(r#"{"unexpected":true}"#)], "abc");
    let err = client.request_json::<(), Vec<i64>>(Method::GET, "/x", None).await.unwrap_err();
    assert!(matches!(err, ApiError::NetworkError(_)));
}

// =============================================================
// 401 handling
// =============================================================

#[tokio::test]
async fn unauthorized_clears_session() {
    let client = signed_in(vec![status(401, "")], "abc");
    let err = client.request(Method::GET, "/cuentas/miscuentas", None).await.unwrap_err();
    assert_eq!(err, ApiError::Unauthorized);
    assert_eq!(client.session().read(), None);
}

#[tokio::test]
async fn unauthorized_publishes_failure_event() {
    let client = signed_in(vec![status(401, "")], "abc");
    let mut failures = client.subscribe_failures();
    let _ = client.request(Method::GET, "/x", None).await;
    assert_eq!(failures.try_recv().unwrap(), AuthorizationFailure);
}

#[tokio::test]
async fn unauthorized_without_session_still_reports() {
    let client = client(vec![status(401, "")]);
    let err = client.request(Method::GET, "/x", None).await.unwrap_err();
    assert_eq!(err, ApiError::Unauthorized);
}

#[tokio::test]
async fn concurrent_unauthorized_responses_are_tolerated() {
    let client = signed_in(vec![status(401, ""), status(401, "")], "abc");
    let mut failures = client.subscribe_failures();

    let (a, b) = tokio::join!(
        client.request(Method::GET, "/a", None),
        client.request(Method::GET, "/b", None),
    );

    assert_eq!(a.unwrap_err(), ApiError::Unauthorized);
    assert_eq!(b.unwrap_err(), ApiError::Unauthorized);
    assert_eq!(client.session().read(), None);
    assert!(failures.try_recv().is_ok());
    assert!(failures.try_recv().is_ok());
}

// =============================================================
// Other failures preserve the session
// =============================================================

#[tokio::test]
async fn client_error_keeps_session() {
    let client = signed_in(vec![status(400, r#"{"message":"monto invalido"}"#)], "abc");
    let before = client.session().read();
    let err = client.request(Method::POST, "/transacciones", None).await.unwrap_err();
    assert_eq!(err, ApiError::ClientError { status: 400, message: "monto invalido".to_owned() });
    assert_eq!(client.session().read(), before);
}

#[tokio::test]
async fn server_error_keeps_session() {
    let client = signed_in(vec![status(500, "boom")], "abc");
    let before = client.session().read();
    let err = client.request(Method::GET, "/reportes/misreportes", None).await.unwrap_err();
    assert_eq!(err, ApiError::ServerError { status: 500, message: "boom".to_owned() });
    assert_eq!(client.session().read(), before);
}

#[tokio::test]
async fn timeout_keeps_session() {
    let client = signed_in(vec![Err(TransportError::Timeout)], "abc");
    let mut failures = client.subscribe_failures();
    let before = client.session().read();
    let err = client.request(Method::GET, "/items", None).await.unwrap_err();
    assert!(matches!(err, ApiError::NetworkError(_)));
    assert_eq!(client.session().read(), before);
    assert!(failures.try_recv().is_err());
}

#[tokio::test]
async fn forbidden_is_client_error_not_unauthorized() {
    let client = signed_in(vec![status(403, "")], "abc");
    let err = client.request(Method::DELETE, "/categorias/1", None).await.unwrap_err();
    assert!(matches!(err, ApiError::ClientError { status: 403, .. }));
    assert!(client.session().is_authenticated());
}

// =============================================================
// Public requests
// =============================================================

#[tokio::test]
async fn public_request_never_attaches_token() {
    let client = signed_in(vec![ok(r#"{"token":"t","role":"USER"}"#)], "abc");
    client.request_public(Method::POST, "/auth/login", None).await.unwrap();
    assert_eq!(client.transport().requests()[0].bearer, None);
}

#[tokio::test]
async fn public_401_is_bad_credentials_and_keeps_session() {
    let client = signed_in(vec![status(401, r#"{"message":"Bad credentials"}"#)], "abc");
    let err = client.request_public(Method::POST, "/auth/login", None).await.unwrap_err();
    assert_eq!(err, ApiError::ClientError { status: 401, message: "Bad credentials".to_owned() });
    assert!(client.session().is_authenticated());
}

// =============================================================
// End-to-end scenario
// =============================================================

#[tokio::test]
async fn login_then_expiry_scenario() {
    let client = client(vec![status(401, "")]);
    let guard = RouteGuard::new(client.session().clone());

    client.session().save(CredentialRecord::new("xyz", "USER")).unwrap();
    assert!(!guard.can_access(Some(Role::Admin)));
    assert!(guard.can_access(None));

    let err = client.request(Method::GET, "/cuentas/miscuentas", None).await.unwrap_err();
    assert_eq!(err, ApiError::Unauthorized);
    assert_eq!(client.session().read(), None);
    assert!(!guard.can_access(None));
}
