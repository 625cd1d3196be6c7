//! Email/password accounts.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::{read_document, write_document};
use crate::error::{CalorieError, CalorieResult};

const MIN_PASSWORD_LEN: usize = 6;
const DIGEST_CONTEXT: &str = "calorie-lens 2025 account password v1";
const REJECTED: &str = "Invalid email or password.";

/// A signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSession {
    pub email: String,
    pub signed_in_at: SystemTime,
}

/// Checks credentials and registers new accounts.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// # Errors
    ///
    /// [`CalorieError::Auth`] for unknown accounts or wrong passwords.
    async fn sign_in(&self, email: &str, password: &str) -> CalorieResult<UserSession>;

    /// Creates an account and signs it in.
    ///
    /// # Errors
    ///
    /// [`CalorieError::Auth`] for malformed emails, short passwords and
    /// already registered emails.
    async fn sign_up(&self, email: &str, password: &str) -> CalorieResult<UserSession>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct AccountBook {
    accounts: Vec<Account>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Account {
    email: String,
    digest: String,
}

/// Accounts kept in a JSON file, passwords stored as blake3 digests.
pub struct LocalAuthProvider {
    path: PathBuf,
    lock: Mutex<()>,
}

impl LocalAuthProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> CalorieResult<AccountBook> {
        read_document(&self.path)
            .await
            .map(Option::unwrap_or_default)
            .map_err(|reason| CalorieError::storage("account store", reason))
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn password_digest(email: &str, password: &str) -> String {
    let mut hasher = blake3::Hasher::new_derive_key(DIGEST_CONTEXT);
    hasher.update(email.as_bytes());
    hasher.update(&[0]);
    hasher.update(password.as_bytes());
    hasher.finalize().to_hex().to_string()
}

fn validate_new_account(email: &str, password: &str) -> CalorieResult<()> {
    let well_formed = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty());
    if !well_formed {
        return Err(CalorieError::auth(
            "sign_up",
            format!("'{}' is not a valid email address.", email),
        ));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(CalorieError::auth(
            "sign_up",
            format!("Password must be at least {} characters.", MIN_PASSWORD_LEN),
        ));
    }
    Ok(())
}

#[async_trait]
impl AuthProvider for LocalAuthProvider {
    async fn sign_in(&self, email: &str, password: &str) -> CalorieResult<UserSession> {
        let email = normalize_email(email);
        let book = self.load().await?;

        let digest = password_digest(&email, password);
        let matched = book
            .accounts
            .iter()
            .any(|account| account.email == email && account.digest == digest);

        if !matched {
            warn!(email = %email, "sign-in rejected");
            return Err(CalorieError::auth("sign_in", REJECTED));
        }

        info!(email = %email, "signed in");
        Ok(UserSession {
            email,
            signed_in_at: SystemTime::now(),
        })
    }

    async fn sign_up(&self, email: &str, password: &str) -> CalorieResult<UserSession> {
        let email = normalize_email(email);
        validate_new_account(&email, password)?;

        let _guard = self.lock.lock().await;
        let mut book = self.load().await?;
        if book.accounts.iter().any(|account| account.email == email) {
            return Err(CalorieError::auth(
                "sign_up",
                format!("An account for {} already exists.", email),
            ));
        }

        book.accounts.push(Account {
            digest: password_digest(&email, password),
            email: email.clone(),
        });
        write_document(&self.path, &book)
            .await
            .map_err(|reason| CalorieError::storage("account store", reason))?;

        info!(email = %email, "account created");
        Ok(UserSession {
            email,
            signed_in_at: SystemTime::now(),
        })
    }
}
