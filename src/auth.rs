use anyhow::Result;
use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::db::LocalStore;

pub const TOKEN_KEY: &str = "token";
pub const ROLE_KEY: &str = "role";
pub const ADMIN_ROLE: &str = "admin";

/// Source of the bearer token attached to API calls. Read on every request,
/// so a token refreshed mid-session is picked up by the next call.
pub trait CredentialProvider: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

impl CredentialProvider for LocalStore {
    fn bearer_token(&self) -> Option<String> {
        match self.get(TOKEN_KEY) {
            Ok(token) => token.filter(|value| !value.trim().is_empty()),
            Err(err) => {
                warn!("Failed to read credential from store: {err:#}");
                None
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum AccessDecision {
    Granted,
    RedirectToLogin,
    Forbidden,
}

/// Gate in front of the admin console.
pub struct AdminGuard<'a> {
    store: &'a LocalStore,
}

impl<'a> AdminGuard<'a> {
    pub fn new(store: &'a LocalStore) -> Self {
        Self { store }
    }

    pub fn check(&self) -> Result<AccessDecision> {
        let token = self
            .store
            .get(TOKEN_KEY)?
            .filter(|value| !value.trim().is_empty());
        if token.is_none() {
            return Ok(AccessDecision::RedirectToLogin);
        }

        let role = self.store.get(ROLE_KEY)?;
        match role.as_deref() {
            Some(ADMIN_ROLE) => Ok(AccessDecision::Granted),
            _ => Ok(AccessDecision::Forbidden),
        }
    }

    pub fn sign_in(&self, token: &str, role: &str) -> Result<()> {
        self.store.set(TOKEN_KEY, token)?;
        self.store.set(ROLE_KEY, role)
    }

    pub fn sign_out(&self) -> Result<()> {
        self.store.remove(TOKEN_KEY)?;
        self.store.remove(ROLE_KEY)?;
        Ok(())
    }

    pub fn role(&self) -> Result<Option<String>> {
        self.store.get(ROLE_KEY)
    }

    /// When the current token was stored, if any.
    pub fn signed_in_at(&self) -> Result<Option<DateTime<Utc>>> {
        self.store.updated_at(TOKEN_KEY)
    }
}
