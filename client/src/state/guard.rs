//! Route gating derived from the current session.
//!
//! SYSTEM CONTEXT
//! ==============
//! Pure predicates over `SessionStore::read()`. Nothing here navigates or
//! fetches; the composing application acts on a `false` / `Redirect` answer.

#[cfg(test)]
#[path = "guard_test.rs"]
mod guard_test;

use super::credential::{Credential, Role};
use super::session::SessionStore;

pub const HOME_ROUTE: &str = "/";
pub const LOGIN_ROUTE: &str = "/login";

/// Who may open a route.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Public,
    Authenticated,
    Role(Role),
}

/// Screens of the finance client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    Home,
    Login,
    Signup,
    Dashboard,
    AdminDashboard,
    EditAccount(i64),
    Categories,
    Subcategories,
    Budgets,
    Transactions,
    Items(i64),
    Reports,
    Profile,
}

impl Route {
    #[must_use]
    pub fn access(self) -> Access {
        match self {
            Self::Home | Self::Login | Self::Signup => Access::Public,
            Self::AdminDashboard => Access::Role(Role::Admin),
            Self::Dashboard
            | Self::EditAccount(_)
            | Self::Categories
            | Self::Subcategories
            | Self::Budgets
            | Self::Transactions
            | Self::Items(_)
            | Self::Reports
            | Self::Profile => Access::Authenticated,
        }
    }

    #[must_use]
    pub fn path(self) -> String {
        match self {
            Self::Home => HOME_ROUTE.to_owned(),
            Self::Login => LOGIN_ROUTE.to_owned(),
            Self::Signup => "/signup".to_owned(),
            Self::Dashboard => "/dashboard".to_owned(),
            Self::AdminDashboard => "/admin-dashboard".to_owned(),
            Self::EditAccount(id) => format!("/edit-account/{id}"),
            Self::Categories => "/categories".to_owned(),
            Self::Subcategories => "/subcategories".to_owned(),
            Self::Budgets => "/budgets".to_owned(),
            Self::Transactions => "/manage-transactions".to_owned(),
            Self::Items(transaction_id) => format!("/manage-items/{transaction_id}"),
            Self::Reports => "/manage-reports".to_owned(),
            Self::Profile => "/profile".to_owned(),
        }
    }
}

/// Outcome of gating a route.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteDecision {
    Render,
    Redirect(&'static str),
}

/// Where a freshly signed-in user lands.
#[must_use]
pub fn landing_route(role: Role) -> Route {
    match role {
        Role::Admin => Route::AdminDashboard,
        Role::User => Route::Dashboard,
    }
}

/// Pure access check: absent credential never passes; a required role must
/// match exactly.
#[must_use]
pub fn can_access(credential: Option<&Credential>, required: Option<Role>) -> bool {
    match (credential, required) {
        (None, _) => false,
        (Some(_), None) => true,
        (Some(credential), Some(role)) => credential.role() == role,
    }
}

/// Route guard bound to a session store.
#[derive(Clone)]
pub struct RouteGuard {
    session: SessionStore,
}

impl RouteGuard {
    #[must_use]
    pub fn new(session: SessionStore) -> Self {
        Self { session }
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Whether the current session may open a view requiring `required`.
    #[must_use]
    pub fn can_access(&self, required: Option<Role>) -> bool {
        can_access(self.session.read().as_ref(), required)
    }

    /// Decide whether `route` renders, or where to send the user instead.
    ///
    /// Signed-out users go to the login screen; signed-in users without the
    /// required role go home.
    #[must_use]
    pub fn decide(&self, route: Route) -> RouteDecision {
        let credential = self.session.read();
        match route.access() {
            Access::Public => RouteDecision::Render,
            _ if credential.is_none() => RouteDecision::Redirect(LOGIN_ROUTE),
            Access::Authenticated => RouteDecision::Render,
            Access::Role(role) if can_access(credential.as_ref(), Some(role)) => RouteDecision::Render,
            Access::Role(_) => RouteDecision::Redirect(HOME_ROUTE),
        }
    }
}
