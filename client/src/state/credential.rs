//! Authenticated identity snapshot held by the session store.
//!
//! DESIGN
//! ======
//! `CredentialRecord` is the loose wire/storage shape (`{token, role}` as
//! plain strings, exactly what login responses and the durable record carry).
//! `Credential` is the validated form: a non-empty token paired with a known
//! `Role`. Converting one into the other is the only place the token/role
//! pairing invariant is checked, so nothing downstream can observe a token
//! without a role or the reverse.

#[cfg(test)]
#[path = "credential_test.rs"]
mod credential_test;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// =============================================================================
// ERROR
// =============================================================================

/// Caller attempted to build a credential from an incomplete grant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidCredentialError {
    #[error("credential token is empty")]
    MissingToken,
    #[error("credential role is empty")]
    MissingRole,
    #[error("unknown credential role: {0}")]
    UnknownRole(String),
}

// =============================================================================
// ROLE
// =============================================================================

/// Authorization role issued by the API alongside the token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    /// Wire spelling of the role.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = InvalidCredentialError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(InvalidCredentialError::MissingRole);
        }
        if trimmed.eq_ignore_ascii_case("USER") {
            Ok(Self::User)
        } else if trimmed.eq_ignore_ascii_case("ADMIN") {
            Ok(Self::Admin)
        } else {
            Err(InvalidCredentialError::UnknownRole(trimmed.to_owned()))
        }
    }
}

// =============================================================================
// CREDENTIAL
// =============================================================================

/// Unvalidated `{token, role}` pair as returned by `/auth/login` and
/// `/auth/register`, and as persisted in durable storage.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub token: String,
    pub role: String,
}

impl CredentialRecord {
    #[must_use]
    pub fn new(token: impl Into<String>, role: impl Into<String>) -> Self {
        Self { token: token.into(), role: role.into() }
    }
}

/// A validated session identity. Token and role always travel together.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
    role: Role,
}

impl Credential {
    /// Build a credential, rejecting an empty token.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidCredentialError::MissingToken`] when `token` is blank.
    pub fn new(token: impl Into<String>, role: Role) -> Result<Self, InvalidCredentialError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(InvalidCredentialError::MissingToken);
        }
        Ok(Self { token, role })
    }

    /// Opaque bearer token issued by the server.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

// Tokens never end up in logs through `{:?}`.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("role", &self.role)
            .finish()
    }
}

impl TryFrom<CredentialRecord> for Credential {
    type Error = InvalidCredentialError;

    fn try_from(record: CredentialRecord) -> Result<Self, Self::Error> {
        if record.token.trim().is_empty() {
            return Err(InvalidCredentialError::MissingToken);
        }
        let role = record.role.parse::<Role>()?;
        Ok(Self { token: record.token, role })
    }
}

impl From<&Credential> for CredentialRecord {
    fn from(credential: &Credential) -> Self {
        Self { token: credential.token.clone(), role: credential.role.as_str().to_owned() }
    }
}

impl From<Credential> for CredentialRecord {
    fn from(credential: Credential) -> Self {
        Self { token: credential.token, role: credential.role.as_str().to_owned() }
    }
}
