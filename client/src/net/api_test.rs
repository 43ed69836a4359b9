use super::*;

use serde_json::json;

use crate::net::mock_transport::{MockTransport, Scripted, ok, status};
use crate::net::types::{EntryKind, ReportFormat, ReportKind};
use crate::state::credential::Role;
use crate::state::storage::MemoryStorage;

fn api(responses: Vec<Scripted>) -> FinanceApi<MockTransport> {
    let session = SessionStore::new(MemoryStorage::shared());
    FinanceApi::new(AuthorizedClient::new(MockTransport::with(responses), session))
}

fn signed_in(responses: Vec<Scripted>) -> FinanceApi<MockTransport> {
    let api = api(responses);
    api.session().save(CredentialRecord::new("abc", "USER")).unwrap();
    api
}

fn sent(api: &FinanceApi<MockTransport>) -> Vec<crate::net::transport::ApiRequest> {
    api.client().transport().requests()
}

fn category(name: &str, description: &str) -> Category {
    Category { id: Some(4), name: name.to_owned(), description: description.to_owned(), kind: EntryKind::Income }
}

fn report(start: &str, end: &str) -> Report {
    Report {
        id: None,
        generated_at: None,
        kind: ReportKind::Financial,
        start_date: start.to_owned(),
        end_date: end.to_owned(),
        format: ReportFormat::Pdf,
    }
}

fn assert_rejected_locally<T: std::fmt::Debug>(api: &FinanceApi<MockTransport>, result: Result<T, ApiError>) {
    let err = result.unwrap_err();
    assert!(matches!(err, ApiError::ClientError { status: 400, .. }), "unexpected error: {err:?}");
    assert!(sent(api).is_empty());
}

// =============================================================
// Endpoint formatting
// =============================================================

#[test]
fn resource_endpoint_appends_id() {
    assert_eq!(resource_endpoint(ACCOUNTS_ENDPOINT, 7), "/cuentas/7");
}

#[test]
fn transactions_page_endpoint_formats_query() {
    assert_eq!(transactions_page_endpoint(3), "/transacciones/mistransacciones?page=3");
}

#[test]
fn items_endpoint_filters_by_transaction() {
    assert_eq!(items_for_transaction_endpoint(12), "/items?transaccionId=12");
}

// =============================================================
// Auth flows
// =============================================================

#[tokio::test]
async fn login_saves_returned_credential() {
    let api = api(vec![ok(r#"{"token":"t-1","role":"ADMIN"}"#)]);
    let credential = api.login("ana@example.com", "pw").await.unwrap();

    assert_eq!(credential.token(), "t-1");
    assert_eq!(api.session().role(), Some(Role::Admin));

    let requests = sent(&api);
    assert_eq!(requests[0].method, Method::POST);
    assert_eq!(requests[0].path, LOGIN_ENDPOINT);
    assert_eq!(requests[0].bearer, None);
    assert_eq!(requests[0].body, Some(json!({"email": "ana@example.com", "password": "pw"})));
}

#[tokio::test]
async fn login_with_blank_fields_sends_nothing() {
    let api = api(vec![]);
    let err = api.login("  ", "pw").await.unwrap_err();
    assert!(matches!(err, AuthFlowError::Api(ApiError::ClientError { status: 400, .. })));
    assert!(sent(&api).is_empty());
}

#[tokio::test]
async fn wrong_password_keeps_existing_session() {
    let api = signed_in(vec![status(401, r#"{"message":"Bad credentials"}"#)]);
    let err = api.login("ana@example.com", "nope").await.unwrap_err();
    assert_eq!(err.user_message(), "invalid email or password");
    assert!(api.session().is_authenticated());
}

#[tokio::test]
async fn login_with_unusable_grant_is_invalid_grant() {
    let api = api(vec![ok(r#"{"token":"","role":"USER"}"#)]);
    let err = api.login("ana@example.com", "pw").await.unwrap_err();
    assert_eq!(err, AuthFlowError::InvalidGrant(InvalidCredentialError::MissingToken));
    assert!(!api.session().is_authenticated());
}

#[tokio::test]
async fn register_posts_user_and_signs_in() {
    let api = api(vec![ok(r#"{"token":"t-2","role":"USER"}"#)]);
    let user = RegisterRequest::user("Ana", "Diaz", "ana@example.com", "s3cret-pw");
    api.register(&user).await.unwrap();

    assert_eq!(api.session().token().as_deref(), Some("t-2"));
    let requests = sent(&api);
    assert_eq!(requests[0].path, REGISTER_ENDPOINT);
    assert_eq!(requests[0].body.as_ref().unwrap()["role"], "USER");
}

#[tokio::test]
async fn logout_clears_without_request() {
    let api = signed_in(vec![]);
    api.logout();
    assert!(!api.session().is_authenticated());
    assert!(sent(&api).is_empty());
}

// =============================================================
// Domain calls
// =============================================================

#[tokio::test]
async fn list_accounts_decodes_and_sends_bearer() {
    let api = signed_in(vec![ok(
        r#"[{"id":1,"nombre":"Ahorros","saldo":10.0,"tipoCuenta":"AHORRO","moneda":"USD"}]"#,
    )]);
    let accounts = api.list_accounts().await.unwrap();
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0].name, "Ahorros");

    let requests = sent(&api);
    assert_eq!(requests[0].path, MY_ACCOUNTS_ENDPOINT);
    assert_eq!(requests[0].authorization().as_deref(), Some("Bearer abc"));
}

#[tokio::test]
async fn update_category_puts_to_resource_path() {
    let api = signed_in(vec![ok(r#"{"id":4,"nombre":"Sueldo","descripcion":"Mensual","tipo":"Ingreso"}"#)]);
    let category = category("Sueldo", "Mensual");
    let updated = api.update_category(4, &category).await.unwrap();

    assert_eq!(updated.kind, EntryKind::Income);
    let requests = sent(&api);
    assert_eq!(requests[0].method, Method::PUT);
    assert_eq!(requests[0].path, "/categorias/4");
    assert_eq!(requests[0].body.as_ref().unwrap()["tipo"], "INGRESO");
}

#[tokio::test]
async fn delete_with_zero_id_is_rejected_locally() {
    let api = signed_in(vec![]);
    let err = api.delete_category(0).await.unwrap_err();
    assert!(matches!(err, ApiError::ClientError { status: 400, .. }));
    assert!(sent(&api).is_empty());
    assert!(api.session().is_authenticated());
}

#[tokio::test]
async fn delete_accepts_empty_body() {
    let api = signed_in(vec![status(204, "")]);
    api.delete_item(9).await.unwrap();
    assert_eq!(sent(&api)[0].path, "/items/9");
    assert_eq!(sent(&api)[0].method, Method::DELETE);
}

#[tokio::test]
async fn list_transactions_requests_page() {
    let api = signed_in(vec![ok(r#"{"totalItems":0,"transacciones":[],"totalPages":0,"currentPage":2}"#)]);
    let page = api.list_transactions(2).await.unwrap();
    assert_eq!(page.current_page, 2);
    assert!(!page.has_next());
    assert_eq!(sent(&api)[0].path, "/transacciones/mistransacciones?page=2");
}

#[tokio::test]
async fn create_report_sends_upper_case_enums() {
    let api = signed_in(vec![ok(
        r#"{"id":5,"tipoReporte":"FINANCIERO","fechaInicio":"2024-01-01","fechaFin":"2024-12-31","formato":"PDF"}"#,
    )]);
    let report = report("2024-01-01", "2024-12-31");
    let created = api.create_report(&report).await.unwrap();
    assert_eq!(created.id, Some(5));

    let body = sent(&api)[0].body.clone().unwrap();
    assert_eq!(body["tipoReporte"], "FINANCIERO");
    assert_eq!(body["formato"], "PDF");
}

#[tokio::test]
async fn expired_session_on_domain_call_signs_out() {
    let api = signed_in(vec![status(401, "")]);
    let err = api.list_budgets().await.unwrap_err();
    assert_eq!(err, ApiError::Unauthorized);
    assert!(!api.session().is_authenticated());
}

// =============================================================
// Local validation
// =============================================================

#[tokio::test]
async fn register_requires_every_field() {
    let api = api(vec![]);
    for user in [
        RegisterRequest::user("", "Diaz", "ana@example.com", "s3cret-pw"),
        RegisterRequest::user("Ana", " ", "ana@example.com", "s3cret-pw"),
        RegisterRequest::user("Ana", "Diaz", "", "s3cret-pw"),
        RegisterRequest::user("Ana", "Diaz", "ana@example.com", ""),
    ] {
        let err = api.register(&user).await.unwrap_err();
        assert!(matches!(err, AuthFlowError::Api(ApiError::ClientError { status: 400, .. })), "{user:?}");
    }
    assert!(sent(&api).is_empty());
    assert!(!api.session().is_authenticated());
}

#[tokio::test]
async fn register_rejects_short_password() {
    let api = api(vec![]);
    let user = RegisterRequest::user("Ana", "Diaz", "ana@example.com", "1234567");
    let err = api.register(&user).await.unwrap_err();
    assert_eq!(err, AuthFlowError::Api(ApiError::invalid_input("password must be at least 8 characters")));
    assert!(sent(&api).is_empty());
}

#[tokio::test]
async fn register_rejects_malformed_email() {
    let api = api(vec![]);
    for email in ["ana", "ana@example", "@example.com", "ana@.com", "ana@example.", "ana @example.com"] {
        let user = RegisterRequest::user("Ana", "Diaz", email, "s3cret-pw");
        let err = api.register(&user).await.unwrap_err();
        assert_eq!(err, AuthFlowError::Api(ApiError::invalid_input("email address is not valid")), "{email}");
    }
    assert!(sent(&api).is_empty());
}

#[test]
fn email_shape_accepts_ordinary_addresses() {
    assert!(looks_like_email("ana@example.com"));
    assert!(looks_like_email("ana.diaz+fin@mail.example.co"));
    assert!(looks_like_email("a@b.c"));
}

#[tokio::test]
async fn report_period_must_not_run_backwards() {
    let api = signed_in(vec![]);
    assert_rejected_locally(&api, api.create_report(&report("2024-12-31", "2024-01-01")).await);
    assert_rejected_locally(&api, api.update_report(5, &report("2024-02-01", "2024-01-31")).await);
}

#[tokio::test]
async fn single_day_report_is_sent() {
    let api = signed_in(vec![ok(
        r#"{"id":6,"tipoReporte":"FINANCIERO","fechaInicio":"2024-03-01","fechaFin":"2024-03-01","formato":"PDF"}"#,
    )]);
    api.create_report(&report("2024-03-01", "2024-03-01")).await.unwrap();
    assert_eq!(sent(&api).len(), 1);
}

#[tokio::test]
async fn category_requires_name_and_description() {
    let api = signed_in(vec![]);
    assert_rejected_locally(&api, api.create_category(&category("", "Mensual")).await);
    assert_rejected_locally(&api, api.create_category(&category("Sueldo", "  ")).await);
    assert_rejected_locally(&api, api.update_category(4, &category("", "")).await);
    assert!(api.session().is_authenticated());
}
