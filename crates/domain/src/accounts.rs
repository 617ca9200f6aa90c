//! Account registration and credential checks.
//!
//! Passwords are stored as Argon2id PHC strings. Issuing session tokens is
//! left to whatever sits in front of the API; `login` only answers whether
//! the credentials match and for which user.

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use entity_store::{EntityStore, NewUser, StoreError, User, constraints};

use crate::error::LendingError;

const CREDENTIALS_REQUIRED: &str = "Username and password are required.";
const USERNAME_TAKEN: &str = "Username already exists.";

/// Registers users and checks their credentials.
pub struct AccountService<S: EntityStore> {
    store: S,
    hasher: Argon2<'static>,
}

impl<S: EntityStore> AccountService<S> {
    /// Creates a service hashing with the default Argon2id parameters.
    pub fn new(store: S) -> Self {
        Self::with_hasher(store, Argon2::default())
    }

    /// Creates a service with explicit hashing parameters.
    pub fn with_hasher(store: S, hasher: Argon2<'static>) -> Self {
        Self { store, hasher }
    }

    /// Creates a user with a freshly salted password hash.
    #[tracing::instrument(skip(self, password))]
    pub async fn register(&self, username: &str, password: &str) -> Result<User, LendingError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(LendingError::validation(CREDENTIALS_REQUIRED));
        }

        let password_hash = self.hash(password.to_string()).await?;

        let mut tx = self.store.begin().await?;
        let user = tx
            .insert_user(NewUser::new(username, password_hash))
            .await
            .map_err(registration_error)?;
        tx.commit().await?;

        metrics::counter!("users_registered").increment(1);
        tracing::info!(user_id = %user.user_id, "user registered");
        Ok(user)
    }

    /// Checks a username and password.
    ///
    /// Returns the user on a match and `None` otherwise. An unknown username
    /// and a wrong password give the same answer.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<Option<User>, LendingError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(LendingError::validation(CREDENTIALS_REQUIRED));
        }

        let Some(user) = self.store.find_user_by_username(username).await? else {
            tracing::info!("login rejected");
            return Ok(None);
        };

        if self
            .verify(password.to_string(), user.password_hash.clone())
            .await?
        {
            tracing::info!(user_id = %user.user_id, "login accepted");
            Ok(Some(user))
        } else {
            tracing::info!("login rejected");
            Ok(None)
        }
    }

    async fn hash(&self, password: String) -> Result<String, LendingError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            hasher
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
        })
        .await
        .map_err(|_| LendingError::persistence("Failed to hash password."))?
        .map_err(|e| {
            tracing::error!(error = %e, "password hashing failed");
            LendingError::persistence("Failed to hash password.")
        })
    }

    async fn verify(&self, password: String, stored: String) -> Result<bool, LendingError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || match PasswordHash::new(&stored) {
            Ok(parsed) => hasher.verify_password(password.as_bytes(), &parsed).is_ok(),
            Err(e) => {
                tracing::warn!(error = %e, "stored password hash is unreadable");
                false
            }
        })
        .await
        .map_err(|_| LendingError::persistence("Failed to verify password."))
    }
}

fn registration_error(err: StoreError) -> LendingError {
    if err.is_unique_violation_of(constraints::UNIQUE_USERNAME) {
        LendingError::conflict(USERNAME_TAKEN)
    } else {
        err.into()
    }
}
