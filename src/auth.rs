//! Authentication Module
//!
//! Owns the session credential and user identity, and keeps them in
//! lock-step with the durable `token` / `userInfo` storage slots.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::storage::{KeyValueStore, StorageError};

/// Storage slot holding the bearer credential
pub const TOKEN_SLOT: &str = "token";
/// Storage slot holding the JSON-serialized [`UserInfo`]
pub const USER_SLOT: &str = "userInfo";

/// Display name used when nobody is logged in
pub const ANONYMOUS_DISPLAY_NAME: &str = "Not logged in";

const ADMIN_ROLE: &str = "admin";

/// Identity of the logged-in user, as returned by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: i64,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub role: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<NaiveDateTime>,
}

impl UserInfo {
    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }
}

/// Partial update merged into the current [`UserInfo`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub updated_at: Option<NaiveDateTime>,
    pub last_login: Option<NaiveDateTime>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn apply(&self, user: &mut UserInfo) {
        if let Some(username) = &self.username {
            user.username = username.clone();
        }
        if let Some(email) = &self.email {
            user.email = Some(email.clone());
        }
        if let Some(role) = &self.role {
            user.role = role.clone();
        }
        if let Some(updated_at) = self.updated_at {
            user.updated_at = updated_at;
        }
        if let Some(last_login) = self.last_login {
            user.last_login = Some(last_login);
        }
    }
}

/// An authenticated session. The credential is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub user: UserInfo,
}

/// What [`SessionStore::restore`] found in storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// Both slots were present and valid
    Restored,
    /// Nothing was stored
    Empty,
    /// The record was partial or unreadable and has been cleared
    Healed,
}

/// Single source of truth for the session.
///
/// Every transition writes storage before returning, so memory and the
/// durable record always agree.
pub struct SessionStore {
    state: Mutex<Option<Session>>,
    storage: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    /// Create an empty, logged-out store over the given storage
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            state: Mutex::new(None),
            storage,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Session>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Rebuild the session from storage.
    ///
    /// Never fails: anything short of a complete, parseable record leaves the
    /// store logged out, and a partial record is wiped.
    pub fn restore(&self) -> RestoreOutcome {
        let mut state = self.lock();

        let token = self.storage.get(TOKEN_SLOT);
        let user = self.storage.get(USER_SLOT);

        let outcome = match (token, user) {
            (Ok(None), Ok(None)) => {
                debug!("No stored session found");
                RestoreOutcome::Empty
            }
            (Ok(Some(token)), Ok(Some(user_json))) if !token.is_empty() => {
                match serde_json::from_str::<UserInfo>(&user_json) {
                    Ok(user) => {
                        info!("Session restored for user: {} ({})", user.username, user.id);
                        *state = Some(Session {
                            access_token: token,
                            user,
                        });
                        return RestoreOutcome::Restored;
                    }
                    Err(e) => {
                        warn!("Stored user record is unreadable: {}", e);
                        RestoreOutcome::Healed
                    }
                }
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!("Failed to read stored session: {}", e);
                RestoreOutcome::Healed
            }
            _ => {
                warn!("Stored session is incomplete");
                RestoreOutcome::Healed
            }
        };

        *state = None;
        if outcome == RestoreOutcome::Healed {
            self.clear_slots();
        }
        outcome
    }

    /// Replace the session unconditionally and persist it
    pub fn login(&self, access_token: impl Into<String>, user: UserInfo) -> Result<(), SessionError> {
        let access_token = access_token.into();
        if access_token.is_empty() {
            return Err(SessionError::EmptyCredential);
        }

        let user_json = serde_json::to_string(&user)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        let mut state = self.lock();

        let written = self
            .storage
            .set(TOKEN_SLOT, &access_token)
            .and_then(|_| self.storage.set(USER_SLOT, &user_json));

        if let Err(e) = written {
            warn!("Failed to persist session, staying logged out: {}", e);
            *state = None;
            self.clear_slots();
            return Err(e.into());
        }

        info!("Session set for user: {} ({})", user.username, user.id);
        *state = Some(Session { access_token, user });
        Ok(())
    }

    /// Clear the session and its storage. Calling it while logged out is a no-op.
    pub fn logout(&self) {
        let mut state = self.lock();

        if state.take().is_some() {
            info!("Session cleared");
        } else {
            debug!("Logout requested with no active session");
        }
        self.clear_slots();
    }

    /// Tear the session down after the backend rejected `attached`.
    ///
    /// Only clears the session while `attached` is still the current
    /// credential, so it returns `true` once per session: concurrent
    /// rejections of the same credential, and late rejections of one that
    /// was already logged out or replaced, leave the store untouched.
    pub fn expire(&self, attached: &str) -> bool {
        let mut state = self.lock();

        match state.as_ref() {
            Some(session) if session.access_token == attached => {
                warn!("Session expired for user: {}", session.user.username);
            }
            _ => {
                debug!("Rejected credential is no longer current");
                return false;
            }
        }

        *state = None;
        self.clear_slots();
        true
    }

    /// Merge `patch` into the current user and rewrite the user slot.
    ///
    /// No-op when logged out or when the patch is empty.
    pub fn update_user(&self, patch: &UserPatch) -> Result<(), SessionError> {
        let mut state = self.lock();

        let Some(session) = state.as_mut() else {
            debug!("User update ignored, no active session");
            return Ok(());
        };
        if patch.is_empty() {
            return Ok(());
        }

        let mut user = session.user.clone();
        patch.apply(&mut user);

        let user_json = serde_json::to_string(&user)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.storage.set(USER_SLOT, &user_json)?;

        debug!("User info updated: {}", user.username);
        session.user = user;
        Ok(())
    }

    /// Replace the current user wholesale and rewrite the user slot.
    ///
    /// Fields absent from `user` are cleared. No-op when logged out.
    pub fn replace_user(&self, user: UserInfo) -> Result<(), SessionError> {
        let mut state = self.lock();

        let Some(session) = state.as_mut() else {
            debug!("User replacement ignored, no active session");
            return Ok(());
        };

        let user_json = serde_json::to_string(&user)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.storage.set(USER_SLOT, &user_json)?;

        debug!("User info replaced: {}", user.username);
        session.user = user;
        Ok(())
    }

    /// Current credential, or `None` when logged out or the store is unavailable
    pub fn access_token(&self) -> Option<String> {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.as_ref().map(|s| s.access_token.clone()))
    }

    pub fn is_authenticated(&self) -> bool {
        self.lock().is_some()
    }

    pub fn session(&self) -> Option<Session> {
        self.lock().as_ref().cloned()
    }

    pub fn user(&self) -> Option<UserInfo> {
        self.lock().as_ref().map(|s| s.user.clone())
    }

    pub fn is_admin(&self) -> bool {
        self.lock()
            .as_ref()
            .is_some_and(|s| s.user.is_admin())
    }

    pub fn display_name(&self) -> String {
        self.lock()
            .as_ref()
            .map(|s| s.user.username.clone())
            .unwrap_or_else(|| ANONYMOUS_DISPLAY_NAME.to_string())
    }

    fn clear_slots(&self) {
        for slot in [TOKEN_SLOT, USER_SLOT] {
            if let Err(e) = self.storage.remove(slot) {
                warn!("Failed to remove storage slot {}: {}", slot, e);
            }
        }
    }
}

/// Session errors
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Credential must not be empty")]
    EmptyCredential,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}
