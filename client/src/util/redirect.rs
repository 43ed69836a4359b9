//! Shared sign-out redirect glue.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every protected view should react the same way when the session
//! disappears, whether a request came back 401, the user logged out, or
//! another context cleared the shared record. The view layer supplies the
//! navigator; this module decides when to call it.

#[cfg(test)]
#[path = "redirect_test.rs"]
mod redirect_test;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::state::credential::Credential;
use crate::state::guard::LOGIN_ROUTE;
use crate::state::session::SessionStore;

/// Whether a view holding `credential` must send the user to the login route.
#[must_use]
pub fn should_redirect_unauth(credential: Option<&Credential>) -> bool {
    credential.is_none()
}

/// Call `navigate(LOGIN_ROUTE)` every time the session goes from present to
/// absent. The observer lives as long as the session store or until the
/// returned handle is aborted.
///
/// Rapid changes may be coalesced, so a sign-in immediately followed by a
/// sign-out can go unnoticed. `navigate` must tolerate repeated calls.
///
/// # Panics
///
/// Panics if called outside a Tokio runtime.
pub fn install_unauth_redirect<F>(session: &SessionStore, navigate: F) -> JoinHandle<()>
where
    F: Fn(&str) + Send + 'static,
{
    let mut projection = session.subscribe();
    let mut signed_in = !should_redirect_unauth((*projection.borrow_and_update()).as_ref());
    tokio::spawn(async move {
        while projection.changed().await.is_ok() {
            let redirect = should_redirect_unauth((*projection.borrow_and_update()).as_ref());
            if signed_in && redirect {
                debug!(route = LOGIN_ROUTE, "session ended; redirecting");
                navigate(LOGIN_ROUTE);
            }
            signed_in = !redirect;
        }
    })
}
