//! Typed REST wrappers for the finance API.
//!
//! SYSTEM CONTEXT
//! ==============
//! `FinanceApi` is the surface the composing application calls. Every domain
//! endpoint goes through `AuthorizedClient::request_json`, so bearer attach
//! and 401 handling apply uniformly. Sign-in and sign-up use the public path
//! and save the returned credential into the session store on success.
//!
//! ERROR HANDLING
//! ==============
//! Domain calls return `ApiError`. The auth flows return `AuthFlowError`,
//! which also covers a server answering 2xx with an unusable credential.
//! A few inputs are rejected locally before any request is sent.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use reqwest::Method;
use tracing::debug;

use super::authorized::AuthorizedClient;
use super::error::ApiError;
use super::transport::{HttpTransport, Transport, TransportError};
use super::types::{
    Account, AccountInput, Budget, Category, Item, LoginRequest, RegisterRequest, Report, Subcategory, Transaction,
    TransactionPage,
};
use crate::config::ClientConfig;
use crate::state::credential::{Credential, CredentialRecord, InvalidCredentialError};
use crate::state::session::SessionStore;

/// Failure of a sign-in or sign-up flow.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthFlowError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("server returned an unusable credential: {0}")]
    InvalidGrant(#[from] InvalidCredentialError),
}

impl AuthFlowError {
    /// Text suitable for showing on the sign-in form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(ApiError::ClientError { status: 401 | 403, .. }) => "invalid email or password".to_owned(),
            Self::Api(e) => e.user_message(),
            Self::InvalidGrant(_) => "sign-in failed, please try again".to_owned(),
        }
    }
}

// =============================================================================
// ENDPOINTS
// =============================================================================

const LOGIN_ENDPOINT: &str = "/auth/login";
const REGISTER_ENDPOINT: &str = "/auth/register";
const ACCOUNTS_ENDPOINT: &str = "/cuentas";
const MY_ACCOUNTS_ENDPOINT: &str = "/cuentas/miscuentas";
const CATEGORIES_ENDPOINT: &str = "/categorias";
const SUBCATEGORIES_ENDPOINT: &str = "/subcategorias";
const BUDGETS_ENDPOINT: &str = "/presupuestos";
const MY_BUDGETS_ENDPOINT: &str = "/presupuestos/mispresupuestos";
const TRANSACTIONS_ENDPOINT: &str = "/transacciones";
const ITEMS_ENDPOINT: &str = "/items";
const REPORTS_ENDPOINT: &str = "/reportes";
const MY_REPORTS_ENDPOINT: &str = "/reportes/misreportes";

fn resource_endpoint(collection: &str, id: i64) -> String {
    format!("{collection}/{id}")
}

fn transactions_page_endpoint(page: u32) -> String {
    format!("{TRANSACTIONS_ENDPOINT}/mistransacciones?page={page}")
}

fn items_for_transaction_endpoint(transaction_id: i64) -> String {
    format!("{ITEMS_ENDPOINT}?transaccionId={transaction_id}")
}

fn require_id(id: i64) -> Result<i64, ApiError> {
    if id <= 0 {
        return Err(ApiError::invalid_input("a saved record id is required"));
    }
    Ok(id)
}

const MIN_PASSWORD_CHARS: usize = 8;

fn validate_registration(user: &RegisterRequest) -> Result<(), ApiError> {
    let missing = [&user.first_name, &user.last_name, &user.email].iter().any(|field| field.trim().is_empty());
    if missing || user.password.is_empty() {
        return Err(ApiError::invalid_input("first name, last name, email and password are required"));
    }
    if user.password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(ApiError::invalid_input("password must be at least 8 characters"));
    }
    if !looks_like_email(&user.email) {
        return Err(ApiError::invalid_input("email address is not valid"));
    }
    Ok(())
}

/// Loose shape check: some `local@domain.tld` run without whitespace.
fn looks_like_email(email: &str) -> bool {
    email.split_whitespace().any(|word| {
        word.char_indices().filter(|&(at, c)| c == '@' && at > 0).any(|(at, _)| {
            let domain = &word[at + 1..];
            domain.char_indices().any(|(dot, c)| c == '.' && dot > 0 && dot + 1 < domain.len())
        })
    })
}

/// Report periods are `YYYY-MM-DD`, so string order is date order.
fn validate_report(report: &Report) -> Result<(), ApiError> {
    if report.start_date > report.end_date {
        return Err(ApiError::invalid_input("report start date must not be after its end date"));
    }
    Ok(())
}

fn validate_category(category: &Category) -> Result<(), ApiError> {
    if category.name.trim().is_empty() || category.description.trim().is_empty() {
        return Err(ApiError::invalid_input("category name and description are required"));
    }
    Ok(())
}

// =============================================================================
// CLIENT
// =============================================================================

pub struct FinanceApi<T = HttpTransport> {
    client: AuthorizedClient<T>,
}

impl FinanceApi<HttpTransport> {
    /// Build the production client over reqwest.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the HTTP client cannot be constructed.
    pub fn connect(config: &ClientConfig, session: SessionStore) -> Result<Self, TransportError> {
        let transport = HttpTransport::new(config)?;
        Ok(Self::new(AuthorizedClient::new(transport, session)))
    }
}

impl<T: Transport> FinanceApi<T> {
    pub fn new(client: AuthorizedClient<T>) -> Self {
        Self { client }
    }

    #[must_use]
    pub fn client(&self) -> &AuthorizedClient<T> {
        &self.client
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore {
        self.client.session()
    }

    // -------------------------------------------------------------------------
    // Auth
    // -------------------------------------------------------------------------

    /// Sign in and save the returned credential.
    ///
    /// # Errors
    ///
    /// [`AuthFlowError::Api`] for an empty email/password or a failed request
    /// (wrong credentials arrive as `ClientError { status: 401 }`), and
    /// [`AuthFlowError::InvalidGrant`] when the answer lacks a token or role.
    pub async fn login(&self, email: &str, password: &str) -> Result<Credential, AuthFlowError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(ApiError::invalid_input("email and password are required").into());
        }
        let body = LoginRequest { email: email.trim().to_owned(), password: password.to_owned() };
        let record: CredentialRecord = self.client.public_json(Method::POST, LOGIN_ENDPOINT, Some(&body)).await?;
        self.establish(record)
    }

    /// Create an account and sign in with it.
    ///
    /// # Errors
    ///
    /// Same as [`Self::login`]. Missing names, a password shorter than eight
    /// characters or a malformed email are rejected before any request.
    pub async fn register(&self, user: &RegisterRequest) -> Result<Credential, AuthFlowError> {
        validate_registration(user)?;
        let record: CredentialRecord = self.client.public_json(Method::POST, REGISTER_ENDPOINT, Some(user)).await?;
        self.establish(record)
    }

    /// Sign out locally. The API keeps no server-side session.
    pub fn logout(&self) {
        self.session().clear();
    }

    fn establish(&self, record: CredentialRecord) -> Result<Credential, AuthFlowError> {
        let credential = self.session().save(record)?;
        debug!(role = %credential.role(), "signed in");
        Ok(credential)
    }

    // -------------------------------------------------------------------------
    // Accounts
    // -------------------------------------------------------------------------

    /// # Errors
    ///
    /// Any [`ApiError`] from the request.
    pub async fn list_accounts(&self) -> Result<Vec<Account>, ApiError> {
        self.client.request_json::<(), _>(Method::GET, MY_ACCOUNTS_ENDPOINT, None).await
    }

    /// # Errors
    ///
    /// Any [`ApiError`] from the request.
    pub async fn create_account(&self, input: &AccountInput) -> Result<Account, ApiError> {
        self.client.request_json(Method::POST, ACCOUNTS_ENDPOINT, Some(input)).await
    }

    /// # Errors
    ///
    /// `ClientError` for a non-positive id; otherwise any [`ApiError`].
    pub async fn update_account(&self, id: i64, input: &AccountInput) -> Result<Account, ApiError> {
        let path = resource_endpoint(ACCOUNTS_ENDPOINT, require_id(id)?);
        self.client.request_json(Method::PUT, &path, Some(input)).await
    }

    /// # Errors
    ///
    /// `ClientError` for a non-positive id; otherwise any [`ApiError`].
    pub async fn delete_account(&self, id: i64) -> Result<(), ApiError> {
        self.delete(ACCOUNTS_ENDPOINT, id).await
    }

    // -------------------------------------------------------------------------
    // Categories
    // -------------------------------------------------------------------------

    /// # Errors
    ///
    /// Any [`ApiError`] from the request.
    pub async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        self.client.request_json::<(), _>(Method::GET, CATEGORIES_ENDPOINT, None).await
    }

    /// # Errors
    ///
    /// `ClientError` for an empty name or description; otherwise any [`ApiError`].
    pub async fn create_category(&self, category: &Category) -> Result<Category, ApiError> {
        validate_category(category)?;
        self.client.request_json(Method::POST, CATEGORIES_ENDPOINT, Some(category)).await
    }

    /// # Errors
    ///
    /// `ClientError` for a non-positive id or an empty name or description;
    /// otherwise any [`ApiError`].
    pub async fn update_category(&self, id: i64, category: &Category) -> Result<Category, ApiError> {
        validate_category(category)?;
        let path = resource_endpoint(CATEGORIES_ENDPOINT, require_id(id)?);
        self.client.request_json(Method::PUT, &path, Some(category)).await
    }

    /// # Errors
    ///
    /// `ClientError` for a non-positive id; otherwise any [`ApiError`].
    pub async fn delete_category(&self, id: i64) -> Result<(), ApiError> {
        self.delete(CATEGORIES_ENDPOINT, id).await
    }

    // -------------------------------------------------------------------------
    // Subcategories
    // -------------------------------------------------------------------------

    /// # Errors
    ///
    /// Any [`ApiError`] from the request.
    pub async fn list_subcategories(&self) -> Result<Vec<Subcategory>, ApiError> {
        self.client.request_json::<(), _>(Method::GET, SUBCATEGORIES_ENDPOINT, None).await
    }

    /// # Errors
    ///
    /// Any [`ApiError`] from the request.
    pub async fn create_subcategory(&self, subcategory: &Subcategory) -> Result<Subcategory, ApiError> {
        self.client.request_json(Method::POST, SUBCATEGORIES_ENDPOINT, Some(subcategory)).await
    }

    /// # Errors
    ///
    /// `ClientError` for a non-positive id; otherwise any [`ApiError`].
    pub async fn update_subcategory(&self, id: i64, subcategory: &Subcategory) -> Result<Subcategory, ApiError> {
        let path = resource_endpoint(SUBCATEGORIES_ENDPOINT, require_id(id)?);
        self.client.request_json(Method::PUT, &path, Some(subcategory)).await
    }

    /// # Errors
    ///
    /// `ClientError` for a non-positive id; otherwise any [`ApiError`].
    pub async fn delete_subcategory(&self, id: i64) -> Result<(), ApiError> {
        self.delete(SUBCATEGORIES_ENDPOINT, id).await
    }

    // -------------------------------------------------------------------------
    // Budgets
    // -------------------------------------------------------------------------

    /// # Errors
    ///
    /// Any [`ApiError`] from the request.
    pub async fn list_budgets(&self) -> Result<Vec<Budget>, ApiError> {
        self.client.request_json::<(), _>(Method::GET, MY_BUDGETS_ENDPOINT, None).await
    }

    /// # Errors
    ///
    /// Any [`ApiError`] from the request.
    pub async fn create_budget(&self, budget: &Budget) -> Result<Budget, ApiError> {
        self.client.request_json(Method::POST, BUDGETS_ENDPOINT, Some(budget)).await
    }

    /// # Errors
    ///
    /// `ClientError` for a non-positive id; otherwise any [`ApiError`].
    pub async fn update_budget(&self, id: i64, budget: &Budget) -> Result<Budget, ApiError> {
        let path = resource_endpoint(BUDGETS_ENDPOINT, require_id(id)?);
        self.client.request_json(Method::PUT, &path, Some(budget)).await
    }

    /// # Errors
    ///
    /// `ClientError` for a non-positive id; otherwise any [`ApiError`].
    pub async fn delete_budget(&self, id: i64) -> Result<(), ApiError> {
        self.delete(BUDGETS_ENDPOINT, id).await
    }

    // -------------------------------------------------------------------------
    // Transactions
    // -------------------------------------------------------------------------

    /// Fetch one zero-based page of the signed-in user's transactions.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`] from the request.
    pub async fn list_transactions(&self, page: u32) -> Result<TransactionPage, ApiError> {
        self.client.request_json::<(), _>(Method::GET, &transactions_page_endpoint(page), None).await
    }

    /// # Errors
    ///
    /// `ClientError` for a non-positive id; otherwise any [`ApiError`].
    pub async fn get_transaction(&self, id: i64) -> Result<Transaction, ApiError> {
        let path = resource_endpoint(TRANSACTIONS_ENDPOINT, require_id(id)?);
        self.client.request_json::<(), _>(Method::GET, &path, None).await
    }

    /// # Errors
    ///
    /// Any [`ApiError`] from the request.
    pub async fn create_transaction(&self, transaction: &Transaction) -> Result<Transaction, ApiError> {
        self.client.request_json(Method::POST, TRANSACTIONS_ENDPOINT, Some(transaction)).await
    }

    /// # Errors
    ///
    /// `ClientError` for a non-positive id; otherwise any [`ApiError`].
    pub async fn update_transaction(&self, id: i64, transaction: &Transaction) -> Result<Transaction, ApiError> {
        let path = resource_endpoint(TRANSACTIONS_ENDPOINT, require_id(id)?);
        self.client.request_json(Method::PUT, &path, Some(transaction)).await
    }

    /// # Errors
    ///
    /// `ClientError` for a non-positive id; otherwise any [`ApiError`].
    pub async fn delete_transaction(&self, id: i64) -> Result<(), ApiError> {
        self.delete(TRANSACTIONS_ENDPOINT, id).await
    }

    // -------------------------------------------------------------------------
    // Items
    // -------------------------------------------------------------------------

    /// # Errors
    ///
    /// `ClientError` for a non-positive transaction id; otherwise any [`ApiError`].
    pub async fn list_items(&self, transaction_id: i64) -> Result<Vec<Item>, ApiError> {
        let path = items_for_transaction_endpoint(require_id(transaction_id)?);
        self.client.request_json::<(), _>(Method::GET, &path, None).await
    }

    /// # Errors
    ///
    /// Any [`ApiError`] from the request.
    pub async fn create_item(&self, item: &Item) -> Result<Item, ApiError> {
        self.client.request_json(Method::POST, ITEMS_ENDPOINT, Some(item)).await
    }

    /// # Errors
    ///
    /// `ClientError` for a non-positive id; otherwise any [`ApiError`].
    pub async fn update_item(&self, id: i64, item: &Item) -> Result<Item, ApiError> {
        let path = resource_endpoint(ITEMS_ENDPOINT, require_id(id)?);
        self.client.request_json(Method::PUT, &path, Some(item)).await
    }

    /// # Errors
    ///
    /// `ClientError` for a non-positive id; otherwise any [`ApiError`].
    pub async fn delete_item(&self, id: i64) -> Result<(), ApiError> {
        self.delete(ITEMS_ENDPOINT, id).await
    }

    // -------------------------------------------------------------------------
    // Reports
    // -------------------------------------------------------------------------

    /// # Errors
    ///
    /// Any [`ApiError`] from the request.
    pub async fn list_reports(&self) -> Result<Vec<Report>, ApiError> {
        self.client.request_json::<(), _>(Method::GET, MY_REPORTS_ENDPOINT, None).await
    }

    /// # Errors
    ///
    /// `ClientError` when the period starts after it ends; otherwise any [`ApiError`].
    pub async fn create_report(&self, report: &Report) -> Result<Report, ApiError> {
        validate_report(report)?;
        self.client.request_json(Method::POST, REPORTS_ENDPOINT, Some(report)).await
    }

    /// # Errors
    ///
    /// `ClientError` for a non-positive id or a period that starts after it
    /// ends; otherwise any [`ApiError`].
    pub async fn update_report(&self, id: i64, report: &Report) -> Result<Report, ApiError> {
        validate_report(report)?;
        let path = resource_endpoint(REPORTS_ENDPOINT, require_id(id)?);
        self.client.request_json(Method::PUT, &path, Some(report)).await
    }

    async fn delete(&self, collection: &str, id: i64) -> Result<(), ApiError> {
        let path = resource_endpoint(collection, require_id(id)?);
        self.client.request(Method::DELETE, &path, None).await.map(|_| ())
    }
}
