use std::fmt;

use tracing::{debug, info, warn};

use crate::api::{AuthClient, AuthResult, RevokeResult};
use crate::store::{ActiveProfile, ProfileStore, StorageError};

use super::scrub_password;

const CREDENTIALS_REQUIRED_MESSAGE: &str = "Username and password required";
const NOT_LOGGED_IN_MESSAGE: &str = "You are not logged in";
const TOKEN_VALID_MESSAGE: &str = "Authentication token is valid.";
const RELOGIN_HINT: &str = "you probably want to log out and log in again.";

/// In-memory handle of the current identity.
///
/// Empty strings mean logged out.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ActiveSession {
    pub unique_id: String,
    pub token: String,
}

impl ActiveSession {
    pub fn is_logged_in(&self) -> bool {
        !self.unique_id.is_empty()
    }

    fn clear(&mut self) {
        self.unique_id.clear();
        self.token.clear();
    }
}

impl From<&ActiveProfile> for ActiveSession {
    fn from(profile: &ActiveProfile) -> Self {
        Self {
            unique_id: profile.user_id.clone(),
            token: profile.token.clone(),
        }
    }
}

impl fmt::Debug for ActiveSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveSession")
            .field("unique_id", &self.unique_id)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// What the host should show after a session operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success { message: Option<String> },
    Failure { error_message: String },
}

impl Outcome {
    fn success() -> Self {
        Outcome::Success { message: None }
    }

    fn failure(error_message: impl Into<String>) -> Self {
        Outcome::Failure {
            error_message: error_message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Outcome::Success { message } => message.as_deref(),
            Outcome::Failure { error_message } => Some(error_message),
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Outcome::Success { .. } => None,
            Outcome::Failure { error_message } => Some(error_message),
        }
    }
}

/// Drives login, logout and validation for a single caller.
///
/// Two states: logged out (`unique_id` empty) and logged in. Only
/// [`StorageError`] is returned as an error; everything the service can
/// answer comes back as an [`Outcome`].
pub struct SessionController<C> {
    client: C,
    store: ProfileStore,
    session: ActiveSession,
    username: String,
}

impl<C: AuthClient> SessionController<C> {
    /// Restore the session from the store's active profile.
    ///
    /// Hosts call this once at startup.
    pub fn init(client: C, store: ProfileStore) -> Result<Self, StorageError> {
        let (session, username) = match store.get_active_profile()? {
            Some(profile) => {
                debug!(user_id = %profile.user_id, "Restored active profile");
                (ActiveSession::from(&profile), profile.username)
            }
            None => {
                debug!("No active profile");
                (ActiveSession::default(), String::new())
            }
        };

        Ok(Self {
            client,
            store,
            session,
            username,
        })
    }

    pub fn session(&self) -> &ActiveSession {
        &self.session
    }

    pub fn store(&self) -> &ProfileStore {
        &self.store
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.is_logged_in()
    }

    /// Username of the logged-in profile
    pub fn current_username(&self) -> Option<&str> {
        if self.is_logged_in() {
            Some(&self.username)
        } else {
            None
        }
    }

    /// Authenticate and, on success, persist and activate the profile.
    ///
    /// `password` is overwritten and emptied on every path, so the caller
    /// never holds it after this returns. On failure the store and the
    /// session are left as they were.
    pub fn login(&mut self, username: &str, password: &mut String) -> Result<Outcome, StorageError> {
        if username.is_empty() || password.is_empty() {
            scrub_password(password);
            return Ok(Outcome::failure(CREDENTIALS_REQUIRED_MESSAGE));
        }

        let result = self.client.authenticate(username, password);
        scrub_password(password);

        let (user_id, token) = match result {
            AuthResult::Success { user_id, token } => (user_id, token),
            AuthResult::Fail { error_message } => {
                info!(%error_message, "Login failed");
                return Ok(Outcome::failure(error_message));
            }
        };

        self.store.save_as_active(&user_id, &token, username)?;

        self.session = ActiveSession {
            unique_id: user_id,
            token,
        };
        self.username = username.to_string();

        info!(user_id = %self.session.unique_id, "Logged in");
        Ok(Outcome::success())
    }

    /// Revoke the token remotely, then forget it locally.
    ///
    /// The session always ends up logged out, even when revocation fails or
    /// the store cannot be written; a store failure is still returned.
    pub fn logout(&mut self) -> Result<(), StorageError> {
        if !self.is_logged_in() {
            debug!("Logout requested while logged out");
            return Ok(());
        }

        let user_id = self.session.unique_id.clone();

        if let RevokeResult::Fail { error_message } = self.client.revoke(&user_id, &self.session.token) {
            warn!(%user_id, %error_message, "Could not revoke token, logging out locally anyway");
        }

        let stored = self.store.logout(&user_id);

        self.session.clear();
        self.username.clear();

        info!(%user_id, "Logged out");
        stored
    }

    /// Ask the service whether the current token is still accepted
    pub fn validate(&self) -> Outcome {
        if !self.is_logged_in() {
            return Outcome::failure(NOT_LOGGED_IN_MESSAGE);
        }

        match self.client.validate(&self.session.token) {
            None => Outcome::Success {
                message: Some(TOKEN_VALID_MESSAGE.to_string()),
            },
            Some(reason) => Outcome::failure(format!("{}; {}", reason, RELOGIN_HINT)),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
