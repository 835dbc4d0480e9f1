//! Login strategies.
//!
//! A [`Verifier`] checks request credentials for one named policy. The gate
//! does not care how: it only sees success or failure.

use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::auth::Credentials;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LoginError {
    #[error("missing credentials")]
    MissingCredentials,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("no login strategy named '{0}'")]
    UnknownStrategy(String),

    #[error("login configuration error: {0}")]
    Internal(String),
}

pub trait Verifier: Send + Sync {
    fn verify(&self, credentials: &Credentials) -> Result<(), LoginError>;
}

/// A fixed username/password pair, checked against basic auth
#[derive(Debug, Clone)]
pub struct PasswordVerifier {
    user: String,
    password: String,
}

impl PasswordVerifier {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        PasswordVerifier {
            user: user.into(),
            password: password.into(),
        }
    }
}

impl Verifier for PasswordVerifier {
    fn verify(&self, credentials: &Credentials) -> Result<(), LoginError> {
        let (Some(user), Some(password)) = (&credentials.user, &credentials.password) else {
            return Err(LoginError::MissingCredentials);
        };

        // Both comparisons run regardless of the first outcome
        let matches = secret_eq(user, &self.user) & secret_eq(password, &self.password);
        if matches {
            Ok(())
        } else {
            Err(LoginError::InvalidCredentials)
        }
    }
}

/// A shared secret passed as the `pw` query parameter
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    token: Option<String>,
}

impl TokenVerifier {
    pub fn new(token: impl Into<String>) -> Self {
        TokenVerifier {
            token: Some(token.into()),
        }
    }

    /// A token strategy with no secret configured; every login fails.
    pub fn unconfigured() -> Self {
        TokenVerifier { token: None }
    }
}

impl Verifier for TokenVerifier {
    fn verify(&self, credentials: &Credentials) -> Result<(), LoginError> {
        let expected = self
            .token
            .as_deref()
            .ok_or_else(|| LoginError::Internal("no token configured".into()))?;
        let supplied = credentials
            .token
            .as_deref()
            .ok_or(LoginError::MissingCredentials)?;

        if secret_eq(supplied, expected) {
            Ok(())
        } else {
            Err(LoginError::InvalidCredentials)
        }
    }
}

fn secret_eq(supplied: &str, expected: &str) -> bool {
    bool::from(supplied.as_bytes().ct_eq(expected.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic(user: &str, password: &str) -> Credentials {
        Credentials {
            user: Some(user.into()),
            password: Some(password.into()),
            token: None,
        }
    }

    #[test]
    fn test_password_verifier() {
        let verifier = PasswordVerifier::new("admin", "secret");

        assert_eq!(verifier.verify(&basic("admin", "secret")), Ok(()));
        assert_eq!(
            verifier.verify(&basic("admin", "wrong")),
            Err(LoginError::InvalidCredentials)
        );
        assert_eq!(
            verifier.verify(&basic("root", "secret")),
            Err(LoginError::InvalidCredentials)
        );
        assert_eq!(
            verifier.verify(&Credentials::default()),
            Err(LoginError::MissingCredentials)
        );
    }

    #[test]
    fn test_token_verifier() {
        let verifier = TokenVerifier::new("s3cret");

        assert_eq!(verifier.verify(&Credentials::token("s3cret")), Ok(()));
        assert_eq!(
            verifier.verify(&Credentials::token("s3cre")),
            Err(LoginError::InvalidCredentials)
        );
        assert_eq!(
            verifier.verify(&basic("admin", "s3cret")),
            Err(LoginError::MissingCredentials)
        );
    }

    #[test]
    fn test_unconfigured_token_verifier_rejects_everything() {
        let verifier = TokenVerifier::unconfigured();
        assert!(matches!(
            verifier.verify(&Credentials::token("")),
            Err(LoginError::Internal(_))
        ));
    }
}
