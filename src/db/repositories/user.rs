use anyhow::{Context, Result};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordVerifier},
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use tokio::task;

use crate::entities::users;

/// User data as seen by the rest of the service (no password hash).
#[derive(Debug, Clone)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub totp_secret: Option<String>,
    pub is_admin: bool,
    pub created_at: String,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            totp_secret: model.totp_secret,
            is_admin: model.is_admin,
            created_at: model.created_at,
        }
    }
}

/// Argon2id hash of an unguessable filler password. Verified against when a
/// login names an unknown user, so the time spent on a failed login does not
/// reveal whether the username exists.
const DUMMY_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$gZiV/M1gPc22ElAH/Jh1Hw$CWOrkoo7oJBQ/iyh7uJ0LO2aLEfrHwTWllSAxT0zRno";

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<User>> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?;

        Ok(user.map(User::from))
    }

    /// Verify a username/password pair. Unknown users and wrong passwords
    /// both come back as `None`; the caller never learns which it was.
    ///
    /// Argon2 verification is CPU-heavy, so it runs in `spawn_blocking`. It
    /// runs even when the user lookup misses (against [`DUMMY_HASH`]) to keep
    /// failure timing independent of where the mismatch occurred.
    pub async fn verify_credentials(&self, username: &str, password: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user for credential verification")?;

        let stored_hash = user
            .as_ref()
            .map_or_else(|| DUMMY_HASH.to_string(), |u| u.password_hash.clone());
        let password = password.to_string();

        let matches = task::spawn_blocking(move || {
            let parsed_hash = PasswordHash::new(&stored_hash)
                .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

            let argon2 = Argon2::default();
            Ok::<bool, anyhow::Error>(
                argon2
                    .verify_password(password.as_bytes(), &parsed_hash)
                    .is_ok(),
            )
        })
        .await
        .context("Credential verification task panicked")??;

        if matches {
            Ok(user.map(User::from))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dummy_hash_parses() {
        assert!(PasswordHash::new(DUMMY_HASH).is_ok());
    }

    #[test]
    fn dummy_hash_rejects_common_passwords() {
        let parsed = PasswordHash::new(DUMMY_HASH).unwrap();
        let argon2 = Argon2::default();
        for pw in ["", "pwd", "password", "admin"] {
            assert!(argon2.verify_password(pw.as_bytes(), &parsed).is_err());
        }
    }
}
