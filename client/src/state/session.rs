//! Session store: the single source of truth for "who is logged in".
//!
//! SYSTEM CONTEXT
//! ==============
//! Views read the current credential from here to gate rendering, the
//! authorized client reads it to attach a bearer token, and login/registration
//! flows write into it. Durable storage is the cross-context backing copy; the
//! in-memory projection lives in a `watch` channel so in-context observers see
//! every change and `read()` never touches storage.
//!
//! CONSISTENCY
//! ===========
//! `save` followed by `read` in the same context is sequentially consistent.
//! Other contexts sharing the storage converge through `spawn_sync`, which
//! re-hydrates from storage on every change notification. There is no bound on
//! how quickly that happens.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::credential::{Credential, CredentialRecord, InvalidCredentialError, Role};
use super::storage::DurableStorage;

/// Name of the durable record holding the serialized `{token, role}` pair.
pub const DEFAULT_SESSION_KEY: &str = "token";

/// Process-wide holder of the current credential. Cheap to clone; clones share
/// the same projection.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

struct Inner {
    storage: Arc<dyn DurableStorage>,
    key: String,
    projection: watch::Sender<Option<Credential>>,
    // Held across each storage access and the projection update that follows it.
    update: Mutex<()>,
}

impl SessionStore {
    /// Create a store over `storage` using the default record name and hydrate
    /// it once from storage.
    pub fn new(storage: Arc<dyn DurableStorage>) -> Self {
        Self::with_key(storage, DEFAULT_SESSION_KEY)
    }

    /// Create a store over `storage` using a custom record name.
    pub fn with_key(storage: Arc<dyn DurableStorage>, key: impl Into<String>) -> Self {
        let key = key.into();
        let initial = decode_record(&key, storage.get(&key).as_deref());
        let (projection, _) = watch::channel(initial);
        Self { inner: Arc::new(Inner { storage, key, projection, update: Mutex::new(()) }) }
    }

    /// Current in-memory credential, if any. No side effects.
    #[must_use]
    pub fn read(&self) -> Option<Credential> {
        self.inner.projection.borrow().clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.projection.borrow().is_some()
    }

    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.inner.projection.borrow().as_ref().map(Credential::role)
    }

    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.inner.projection.borrow().as_ref().map(|c| c.token().to_owned())
    }

    /// Validate and persist a new credential, then publish it.
    ///
    /// A durable write failure is logged and the in-memory projection is still
    /// updated, so the current context stays logged in.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidCredentialError`] when the token or role is missing or
    /// the role is unknown. Nothing is written in that case.
    pub fn save(&self, record: CredentialRecord) -> Result<Credential, InvalidCredentialError> {
        let credential = Credential::try_from(record)?;
        let stored = CredentialRecord::from(&credential);
        let _update = self.lock_update();
        match serde_json::to_string(&stored) {
            Ok(raw) => {
                if let Err(e) = self.inner.storage.set(&self.inner.key, &raw) {
                    warn!(error = %e, key = %self.inner.key, "session write to durable storage failed");
                }
            }
            Err(e) => warn!(error = %e, "session record serialization failed"),
        }
        self.inner.projection.send_replace(Some(credential.clone()));
        info!(role = %credential.role(), "session saved");
        Ok(credential)
    }

    /// Remove the credential from storage and memory. Idempotent.
    pub fn clear(&self) {
        let _update = self.lock_update();
        if let Err(e) = self.inner.storage.remove(&self.inner.key) {
            warn!(error = %e, key = %self.inner.key, "session removal from durable storage failed");
        }
        let changed = self.inner.projection.send_if_modified(|current| current.take().is_some());
        if changed {
            info!("session cleared");
        }
    }

    /// Re-read durable storage into the projection. Observers are notified
    /// only when the projection actually changes.
    pub fn rehydrate(&self) {
        let _update = self.lock_update();
        let fresh = decode_record(&self.inner.key, self.inner.storage.get(&self.inner.key).as_deref());
        let changed = self.inner.projection.send_if_modified(|current| {
            if *current == fresh {
                false
            } else {
                *current = fresh;
                true
            }
        });
        if changed {
            debug!(authenticated = self.is_authenticated(), "session rehydrated from storage");
        }
    }

    fn lock_update(&self) -> MutexGuard<'_, ()> {
        self.inner.update.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Observe projection changes in this context.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Credential>> {
        self.inner.projection.subscribe()
    }

    /// Spawn the cross-context change handler: every storage notification for
    /// this store's key re-hydrates the projection.
    ///
    /// Runs until aborted or until the storage's notification channel closes.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn spawn_sync(&self) -> JoinHandle<()> {
        let mut events = self.inner.storage.subscribe();
        let store = self.clone();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) if event.key == store.inner.key => store.rehydrate(),
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "session sync lagged; rehydrating");
                        store.rehydrate();
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

/// Decode a raw durable record. Anything malformed counts as "no session".
fn decode_record(key: &str, raw: Option<&str>) -> Option<Credential> {
    let raw = raw?;
    let record = match serde_json::from_str::<CredentialRecord>(raw) {
        Ok(record) => record,
        Err(e) => {
            warn!(error = %e, %key, "ignoring malformed session record");
            return None;
        }
    };
    match Credential::try_from(record) {
        Ok(credential) => Some(credential),
        Err(e) => {
            warn!(error = %e, %key, "ignoring invalid session record");
            None
        }
    }
}
