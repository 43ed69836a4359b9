//! Session and authorized-request core for the personal finance client.
//!
//! This crate owns "who is logged in" (`state::session`), attaches that
//! identity to every API call and reacts to 401s (`net::authorized`), and
//! gates views by role (`state::guard`). Composing applications supply the
//! durable storage backend and the navigator.

pub mod config;
pub mod net;
pub mod state;
pub mod util;

pub use config::{ClientConfig, ConfigError};
pub use net::api::{AuthFlowError, FinanceApi};
pub use net::authorized::{AuthorizationFailure, AuthorizedClient};
pub use net::error::ApiError;
pub use net::transport::{HttpTransport, Transport, TransportError};
pub use state::credential::{Credential, CredentialRecord, InvalidCredentialError, Role};
pub use state::guard::{Route, RouteDecision, RouteGuard};
pub use state::session::SessionStore;
pub use state::storage::{DirectoryWatcher, DurableStorage, FileStorage, MemoryStorage, StorageError, StorageEvent};
