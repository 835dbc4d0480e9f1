//! Per-calendar, per-action authentication.
//!
//! Every calendar names one policy for reading and one for writing. A policy
//! is either `never`, `open`, or the name of a login strategy registered with
//! the [`Gate`]. Evaluation is total: any failure to log in is a denial, and
//! the caller never learns why.

mod verifier;

pub use verifier::{LoginError, PasswordVerifier, TokenVerifier, Verifier};

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::calendar::ConfiguredCalendar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Read,
    Write,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Action::Read => write!(f, "read"),
            Action::Write => write!(f, "write"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Policy {
    Never,
    Open,
    /// Name of a registered login strategy (case-sensitive)
    Named(String),
}

impl Policy {
    pub const NEVER: &'static str = "never";
    pub const OPEN: &'static str = "open";

    pub fn parse(name: &str) -> Self {
        if name.eq_ignore_ascii_case(Self::NEVER) {
            Policy::Never
        } else if name.eq_ignore_ascii_case(Self::OPEN) {
            Policy::Open
        } else {
            Policy::Named(name.to_string())
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Policy::Never => write!(f, "{}", Self::NEVER),
            Policy::Open => write!(f, "{}", Self::OPEN),
            Policy::Named(name) => write!(f, "{}", name),
        }
    }
}

/// Credentials extracted from a request. Each part may be absent.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub user: Option<String>,
    pub password: Option<String>,
    pub token: Option<String>,
}

impl Credentials {
    pub fn basic(user: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials {
            user: Some(user.into()),
            password: Some(password.into()),
            token: None,
        }
    }

    pub fn token(token: impl Into<String>) -> Self {
        Credentials {
            token: Some(token.into()),
            ..Default::default()
        }
    }
}

// Secrets stay out of logs
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("token", &self.token.as_ref().map(|_| "***"))
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        self == Decision::Allow
    }
}

/// Decides whether a request may act on a calendar.
#[derive(Clone, Default)]
pub struct Gate {
    verifiers: HashMap<String, Arc<dyn Verifier>>,
}

impl Gate {
    pub fn builder() -> GateBuilder {
        GateBuilder::default()
    }

    pub fn evaluate(
        &self,
        calendar: &ConfiguredCalendar,
        action: Action,
        credentials: &Credentials,
    ) -> Decision {
        let policy = calendar.policy(action);
        let outcome = match policy {
            Policy::Never => Err(LoginError::Internal("calendar does not allow login".into())),
            Policy::Open => Ok(()),
            Policy::Named(name) => self.login(name, credentials),
        };

        match outcome {
            Ok(()) => Decision::Allow,
            Err(reason) => {
                tracing::debug!(
                    calendar = %calendar.id,
                    %action,
                    %policy,
                    %reason,
                    "login denied"
                );
                Decision::Deny
            }
        }
    }

    fn login(&self, strategy: &str, credentials: &Credentials) -> Result<(), LoginError> {
        let verifier = self
            .verifiers
            .get(strategy)
            .ok_or_else(|| LoginError::UnknownStrategy(strategy.to_string()))?;
        verifier.verify(credentials)
    }

    /// Names of all registered login strategies, sorted
    pub fn strategies(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.verifiers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gate")
            .field("strategies", &self.strategies())
            .finish()
    }
}

#[derive(Default)]
pub struct GateBuilder {
    verifiers: HashMap<String, Arc<dyn Verifier>>,
}

impl GateBuilder {
    /// Register a login strategy under a policy name. A later registration
    /// under the same name replaces the earlier one.
    pub fn register(mut self, name: impl Into<String>, verifier: Arc<dyn Verifier>) -> Self {
        self.verifiers.insert(name.into(), verifier);
        self
    }

    pub fn build(self) -> Gate {
        Gate {
            verifiers: self.verifiers,
        }
    }
}
