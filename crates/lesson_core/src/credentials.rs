//! crates/lesson_core/src/credentials.rs
//!
//! Registered users and the active session, kept in a `KeyValueStore`.
//!
//! Users live under the `users` key as a JSON array, the signed-in user under
//! `currentUser`. Passwords are stored as argon2 PHC strings.

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::{User, UserCredentials};
use crate::ports::{KeyValueStore, PortError};

pub const USERS_KEY: &str = "users";
pub const SESSION_KEY: &str = "currentUser";
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("All fields must be filled in")]
    IncompleteFields,
    #[error("A user with this email is already registered")]
    DuplicateEmail,
    #[error("Password must be at least 6 characters")]
    WeakPassword,
    #[error("No user is registered with this email")]
    UserNotFound,
    #[error("Wrong password")]
    WrongPassword,
    #[error("Storage error: {0}")]
    Storage(#[from] PortError),
    #[error("Password hashing failed: {0}")]
    Hashing(String),
}

/// Reads and writes the registered users and the persisted session.
#[derive(Clone)]
pub struct CredentialStore {
    store: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Creates a new user. Emails are unique ignoring case.
    pub fn register(&self, full_name: &str, email: &str, password: &str) -> Result<User, AuthError> {
        let full_name = full_name.trim();
        let email = email.trim();
        if full_name.is_empty() || email.is_empty() || password.is_empty() {
            return Err(AuthError::IncompleteFields);
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }

        let mut users = self.load_users()?;
        if users.iter().any(|u| same_email(&u.email, email)) {
            return Err(AuthError::DuplicateEmail);
        }

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::Hashing(e.to_string()))?
            .to_string();

        let credentials = UserCredentials {
            id: Uuid::new_v4().to_string(),
            full_name: full_name.to_string(),
            email: email.to_string(),
            password_hash,
        };
        let user = credentials.to_user();
        users.push(credentials);
        self.save_users(&users)?;

        info!(user_id = %user.id, "Registered new user");
        Ok(user)
    }

    /// Looks the user up by email (ignoring case) and checks the password.
    pub fn authenticate(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = email.trim();
        let users = self.load_users()?;
        let found = users
            .iter()
            .find(|u| same_email(&u.email, email))
            .ok_or(AuthError::UserNotFound)?;

        let parsed_hash = PasswordHash::new(&found.password_hash)
            .map_err(|e| AuthError::Hashing(e.to_string()))?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| AuthError::WrongPassword)?;

        Ok(found.to_user())
    }

    pub fn save_session(&self, user: &User) -> Result<(), AuthError> {
        let json = serde_json::to_string(user).map_err(|e| PortError::Unexpected(e.to_string()))?;
        self.store.set(SESSION_KEY, &json)?;
        Ok(())
    }

    /// Returns the persisted session, discarding it silently if it is unreadable.
    pub fn restore_session(&self) -> Option<User> {
        let raw = match self.store.get(SESSION_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Could not read stored session: {}", e);
                return None;
            }
        };

        match serde_json::from_str::<User>(&raw) {
            Ok(user) if !user.id.is_empty() => Some(user),
            _ => {
                warn!("Discarding invalid stored session");
                if let Err(e) = self.store.remove(SESSION_KEY) {
                    warn!("Could not remove invalid session: {}", e);
                }
                None
            }
        }
    }

    pub fn clear_session(&self) -> Result<(), AuthError> {
        self.store.remove(SESSION_KEY)?;
        Ok(())
    }

    fn load_users(&self) -> Result<Vec<UserCredentials>, AuthError> {
        let Some(raw) = self.store.get(USERS_KEY)? else {
            return Ok(Vec::new());
        };
        // Unlike history, an unreadable account list is never replaced:
        // saving over it would drop every existing account.
        serde_json::from_str(&raw).map_err(|e| {
            error!("Stored user list is unreadable: {}", e);
            AuthError::Storage(PortError::Unexpected(format!("unreadable user list: {}", e)))
        })
    }

    fn save_users(&self, users: &[UserCredentials]) -> Result<(), AuthError> {
        let json = serde_json::to_string(users).map_err(|e| PortError::Unexpected(e.to_string()))?;
        self.store.set(USERS_KEY, &json)?;
        Ok(())
    }
}

fn same_email(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}
