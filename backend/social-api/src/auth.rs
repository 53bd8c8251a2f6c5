/// Bearer credential verification and issuance
use crypto_core::JwtKeys;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::User;

/// Verifies bearer credentials and mints new ones
pub trait Authenticator: Send + Sync {
    /// Resolve a credential to the user it was issued for
    fn verify(&self, credential: &str) -> Result<Uuid>;

    /// Mint an access credential for `user`
    fn issue(&self, user: &User) -> Result<String>;
}

/// RS256 access tokens
pub struct JwtAuthenticator {
    keys: JwtKeys,
}

impl JwtAuthenticator {
    pub fn new(keys: JwtKeys) -> Self {
        Self { keys }
    }
}

impl Authenticator for JwtAuthenticator {
    fn verify(&self, credential: &str) -> Result<Uuid> {
        self.keys.user_id_from_token(credential).map_err(|e| {
            tracing::debug!(error = %e, "rejected bearer token");
            AppError::InvalidCredential("Invalid or expired token".into())
        })
    }

    fn issue(&self, user: &User) -> Result<String> {
        if !self.keys.can_issue() {
            return Err(AppError::Internal(
                "token issuance is disabled: no JWT private key configured".into(),
            ));
        }

        self.keys
            .generate_access_token(user.id, &user.email, &user.username)
            .map_err(|e| AppError::Internal(e.to_string()))
    }
}
