//! # Access Layer
//!
//! Sign-in wall and page-view counter around the analyzer.
//!
//! - [`AuthProvider`] checks credentials and creates accounts.
//! - [`ViewCounter`] is a shared counter that tolerates being unavailable.
//! - [`AccessGate`] applies the configured [`AccessPolicy`] before a session
//!   is handed out.
//!
//! The local implementations keep small JSON documents under the configured
//! data directory and replace them atomically on every write.

pub mod auth;
pub mod counter;

use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::info;

use crate::config::AccessPolicy;
use crate::error::{CalorieError, CalorieResult};

pub use auth::{AuthProvider, LocalAuthProvider, UserSession};
pub use counter::{FileViewCounter, ViewCount, ViewCounter, record_view};

/// Email and password as typed by the user.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Applies an [`AccessPolicy`] using an [`AuthProvider`].
pub struct AccessGate<P: AuthProvider> {
    policy: AccessPolicy,
    provider: P,
}

impl<P: AuthProvider> AccessGate<P> {
    pub fn new(policy: AccessPolicy, provider: P) -> Self {
        Self { policy, provider }
    }

    pub fn policy(&self) -> AccessPolicy {
        self.policy
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Decides whether the caller may analyze images.
    ///
    /// Returns the signed-in user when credentials were checked, `None` when
    /// the policy is [`AccessPolicy::Public`].
    ///
    /// # Errors
    ///
    /// [`CalorieError::Auth`] when sign-in is required and the credentials
    /// are missing or rejected.
    pub async fn admit(
        &self,
        credentials: Option<&Credentials>,
    ) -> CalorieResult<Option<UserSession>> {
        match (self.policy, credentials) {
            (AccessPolicy::Public, _) => Ok(None),
            (AccessPolicy::LoginRequired, None) => Err(CalorieError::auth(
                "sign_in",
                "Sign in required. Provide an email and password.",
            )),
            (AccessPolicy::LoginRequired, Some(credentials)) => {
                let session = self
                    .provider
                    .sign_in(&credentials.email, &credentials.password)
                    .await?;
                info!(email = %session.email, "user admitted");
                Ok(Some(session))
            }
        }
    }
}

/// Reads a JSON document, `None` if the file does not exist.
pub(crate) async fn read_document<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, String> {
    match tokio::fs::read(path).await {
        Ok(bytes) => serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| format!("{} is corrupt: {}", path.display(), e)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(format!("cannot read {}: {}", path.display(), e)),
    }
}

/// Replaces `path` with `value` serialized as JSON, via a temporary file in
/// the same directory.
pub(crate) async fn write_document<T: Serialize>(path: &Path, value: &T) -> Result<(), String> {
    let contents = serde_json::to_vec_pretty(value).map_err(|e| e.to_string())?;
    let target = path.to_path_buf();

    tokio::task::spawn_blocking(move || -> io::Result<()> {
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => Path::new(".").to_path_buf(),
        };
        std::fs::create_dir_all(&dir)?;

        let mut file = tempfile::NamedTempFile::new_in(&dir)?;
        file.write_all(&contents)?;
        file.as_file().sync_all()?;
        file.persist(&target).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(|e| e.to_string())?
    .map_err(|e| format!("cannot write {}: {}", path.display(), e))
}
