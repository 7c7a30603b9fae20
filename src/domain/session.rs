//! Session-state record and the authentication stage derived from it.
//!
//! The record is created on successful password authentication and is fixed
//! to one user for its lifetime; the only transition after that is the
//! second-factor completion. Logout destroys the whole session.

use serde::{Deserialize, Serialize};

/// Key under which [`SessionAuth`] is stored in the tower-session.
pub const SESSION_KEY: &str = "auth";

/// Authentication state carried by a live session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionAuth {
    pub user_id: i32,
    pub username: String,
    pub is_admin: bool,
    /// The user has a TOTP secret on record.
    pub second_factor_available: bool,
    /// The session has passed second-factor verification.
    pub second_factor_done: bool,
}

/// The three stages of the session state machine. A missing session record
/// is `Anonymous`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStage {
    Anonymous,
    PasswordAuthenticated,
    FullyAuthenticated,
}

impl SessionAuth {
    #[must_use]
    pub fn stage(&self) -> AuthStage {
        if self.second_factor_done {
            AuthStage::FullyAuthenticated
        } else {
            AuthStage::PasswordAuthenticated
        }
    }

    /// Elevated privilege exists only in the fully-authenticated stage.
    #[must_use]
    pub fn elevated(&self) -> bool {
        self.stage() == AuthStage::FullyAuthenticated
    }

    /// Whether the second-factor transition is open to this session. A user
    /// without admin rights or without a secret stays password-authenticated
    /// permanently; the endpoint rejects rather than silently no-ops.
    #[must_use]
    pub fn can_attempt_second_factor(&self) -> bool {
        self.is_admin && self.second_factor_available
    }
}
