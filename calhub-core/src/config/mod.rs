//! Server configuration.
//!
//! The TOML file is read into [`Settings`], which mirrors the file layout.
//! [`Settings::resolve`] then validates it and builds the runtime pieces:
//! the calendar registry, the authentication gate and database parameters.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use config::{Config, File, FileFormat};
use serde::Deserialize;

use crate::auth::{Action, Gate, PasswordVerifier, Policy, TokenVerifier, Verifier};
use crate::calendar::{CalendarRegistry, ConfiguredCalendar, DEFAULT_TIMEZONE};
use crate::error::{CalHubError, CalHubResult};

const DEFAULT_PORT: u16 = 80;

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

/// Raw configuration file contents
#[derive(Deserialize, Debug, Clone)]
pub struct Settings {
    #[serde(default = "default_port")]
    pub port: u16,

    /// Where `GET /` sends visitors
    pub redirect: Option<String>,

    pub database: Option<DatabaseConfig>,

    #[serde(default)]
    pub login: BTreeMap<String, LoginSettings>,

    #[serde(default)]
    pub calendar: BTreeMap<String, CalendarSettings>,

    #[serde(default, rename = "virtual")]
    pub virtual_calendar: BTreeMap<String, VirtualSettings>,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// SQLite database file, or `:memory:`
    pub path: PathBuf,
}

impl DatabaseConfig {
    pub fn is_in_memory(&self) -> bool {
        self.path == Path::new(":memory:")
    }
}

/// One `[login.<name>]` table
#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LoginSettings {
    Password { user: String, password: String },
    Token { token: Option<String> },
}

/// One `[calendar.<id>]` table
#[derive(Deserialize, Debug, Clone)]
pub struct CalendarSettings {
    #[serde(default = "default_timezone")]
    pub timezone: String,
    pub login_read: Option<String>,
    pub login_write: Option<String>,
}

/// One `[virtual.<id>]` table
#[derive(Deserialize, Debug, Clone)]
pub struct VirtualSettings {
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub from: Vec<String>,
    pub login_read: Option<String>,
}

/// Everything the server needs, validated
#[derive(Debug)]
pub struct AppConfig {
    pub port: u16,
    pub redirect: Option<String>,
    pub database: DatabaseConfig,
    pub registry: CalendarRegistry,
    pub gate: Gate,
}

impl Settings {
    /// Read a TOML configuration file.
    pub fn load(path: &Path) -> CalHubResult<Self> {
        Self::from_source(File::from(path).format(FileFormat::Toml))
    }

    pub fn from_toml(contents: &str) -> CalHubResult<Self> {
        Self::from_source(File::from_str(contents, FileFormat::Toml))
    }

    fn from_source<S>(source: S) -> CalHubResult<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        Config::builder()
            .add_source(source)
            .build()
            .map_err(|e| CalHubError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| CalHubError::Config(e.to_string()))
    }

    /// Validate the settings and build the registry and gate.
    pub fn resolve(self) -> CalHubResult<AppConfig> {
        let database = self
            .database
            .ok_or_else(|| CalHubError::Config("missing [database] table".into()))?;

        if let Some(ref redirect) = self.redirect {
            validate_redirect(redirect)?;
        }

        for id in self.virtual_calendar.keys() {
            if self.calendar.contains_key(id) {
                return Err(CalHubError::DuplicateCalendar(id.clone()));
            }
        }

        let mut calendars = Vec::with_capacity(self.calendar.len() + self.virtual_calendar.len());
        for (id, settings) in &self.calendar {
            calendars.push(ConfiguredCalendar::stored(
                id,
                &settings.timezone,
                settings.login_read.as_deref(),
                settings.login_write.as_deref(),
            )?);
        }
        for (id, settings) in &self.virtual_calendar {
            calendars.push(ConfiguredCalendar::virtual_of(
                id,
                &settings.timezone,
                settings.from.iter().cloned(),
                settings.login_read.as_deref(),
            )?);
        }
        let registry = CalendarRegistry::build(calendars)?;
        let gate = build_gate(self.login);
        warn_unknown_strategies(&registry, &gate);

        Ok(AppConfig {
            port: self.port,
            redirect: self.redirect,
            database,
            registry,
            gate,
        })
    }
}

fn build_gate(logins: BTreeMap<String, LoginSettings>) -> Gate {
    logins
        .into_iter()
        .fold(Gate::builder(), |builder, (name, login)| {
            let verifier: Arc<dyn Verifier> = match login {
                LoginSettings::Password { user, password } => {
                    Arc::new(PasswordVerifier::new(user, password))
                }
                LoginSettings::Token { token: Some(token) } => Arc::new(TokenVerifier::new(token)),
                LoginSettings::Token { token: None } => {
                    tracing::warn!(
                        login = %name,
                        "token login has no token; it will deny everyone"
                    );
                    Arc::new(TokenVerifier::unconfigured())
                }
            };
            builder.register(name, verifier)
        })
        .build()
}

/// Policies naming an undefined login deny at runtime; say so at startup.
fn warn_unknown_strategies(registry: &CalendarRegistry, gate: &Gate) {
    let strategies = gate.strategies();
    for calendar in registry.calendars() {
        for action in [Action::Read, Action::Write] {
            let Policy::Named(name) = calendar.policy(action) else {
                continue;
            };
            if !strategies.contains(&name.as_str()) {
                tracing::warn!(
                    calendar = %calendar,
                    %action,
                    login = %name,
                    "policy names an undefined login; access will be denied"
                );
            }
        }
    }
}

/// Absolute URLs and references relative to this server are both accepted.
fn validate_redirect(redirect: &str) -> CalHubResult<()> {
    let invalid = |reason: String| CalHubError::Config(format!("redirect '{redirect}': {reason}"));

    if redirect.is_empty() || redirect.chars().any(|c| c.is_control() || c.is_whitespace()) {
        return Err(invalid("must be a URL or path without whitespace".into()));
    }
    match url::Url::parse(redirect) {
        Ok(_) | Err(url::ParseError::RelativeUrlWithoutBase) => Ok(()),
        Err(e) => Err(invalid(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Credentials, Decision};
    use crate::calendar::CalendarKind;

    const FULL: &str = r#"
port = 8080
redirect = "https://example.org"

[database]
path = "/var/lib/calhub/events.sqlite3"

[login.admins]
kind = "password"
user = "admin"
password = "secret"

[login.feed]
kind = "token"
token = "s3cret"

[calendar.personal]
timezone = "Europe/Berlin"
login_read = "feed"
login_write = "admins"

[calendar.work]
login_write = "admins"

[virtual.everything]
timezone = "Europe/Berlin"
from = ["work", "personal", "work"]
login_read = "open"
"#;

    #[test]
    fn test_full_config_resolves() {
        let app = Settings::from_toml(FULL).unwrap().resolve().unwrap();

        assert_eq!(app.port, 8080);
        assert_eq!(app.redirect.as_deref(), Some("https://example.org"));
        assert_eq!(
            app.database.path,
            PathBuf::from("/var/lib/calhub/events.sqlite3")
        );
        assert_eq!(app.registry.len(), 3);
        assert_eq!(app.gate.strategies(), vec!["admins", "feed"]);

        let personal = app.registry.resolve("personal").unwrap();
        assert_eq!(personal.timezone, chrono_tz::Europe::Berlin);
        assert_eq!(personal.policy(Action::Read), &Policy::Named("feed".into()));
        assert_eq!(personal.policy(Action::Write), &Policy::Named("admins".into()));

        let everything = app.registry.resolve("everything").unwrap();
        assert_eq!(
            everything.kind,
            CalendarKind::Virtual {
                sources: vec!["personal".into(), "work".into()]
            }
        );
        assert_eq!(everything.policy(Action::Read), &Policy::Open);
    }

    #[test]
    fn test_defaults() {
        let app = Settings::from_toml(
            r#"
[database]
path = ":memory:"

[calendar.work]
login_read = "never"

[virtual.team]
from = ["work"]
"#,
        )
        .unwrap()
        .resolve()
        .unwrap();

        assert_eq!(app.port, 80);
        assert_eq!(app.redirect, None);
        assert!(app.database.is_in_memory());

        let work = app.registry.resolve("work").unwrap();
        assert_eq!(work.timezone, chrono_tz::UTC);
        assert_eq!(work.policy(Action::Write), &Policy::Never);
        assert_eq!(work.policy(Action::Read), &Policy::Never);

        let team = app.registry.resolve("team").unwrap();
        assert_eq!(team.policy(Action::Read), &Policy::Never);
    }

    #[test]
    fn test_read_policy_follows_write_policy() {
        let app = Settings::from_toml(
            r#"
[database]
path = ":memory:"

[calendar.shared]
login_write = "open"
"#,
        )
        .unwrap()
        .resolve()
        .unwrap();

        let shared = app.registry.resolve("shared").unwrap();
        assert_eq!(shared.policy(Action::Read), &Policy::Open);
    }

    #[test]
    fn test_logins_become_verifiers() {
        let app = Settings::from_toml(FULL).unwrap().resolve().unwrap();
        let personal = app.registry.resolve("personal").unwrap();

        assert_eq!(
            app.gate.evaluate(personal, Action::Write, &Credentials::basic("admin", "secret")),
            Decision::Allow
        );
        assert_eq!(
            app.gate.evaluate(personal, Action::Read, &Credentials::token("s3cret")),
            Decision::Allow
        );
        assert_eq!(
            app.gate.evaluate(personal, Action::Read, &Credentials::token("wrong")),
            Decision::Deny
        );
    }

    #[test]
    fn test_token_login_without_token_denies() {
        let app = Settings::from_toml(
            r#"
[database]
path = ":memory:"

[login.feed]
kind = "token"

[calendar.work]
login_read = "feed"
"#,
        )
        .unwrap()
        .resolve()
        .unwrap();

        let work = app.registry.resolve("work").unwrap();
        assert_eq!(
            app.gate.evaluate(work, Action::Read, &Credentials::token("")),
            Decision::Deny
        );
    }

    #[test]
    fn test_missing_database_is_config_error() {
        let err = Settings::from_toml("[calendar.work]\ntimezone = \"UTC\"\n")
            .unwrap()
            .resolve()
            .unwrap_err();
        assert!(matches!(err, CalHubError::Config(_)));
    }

    #[test]
    fn test_same_id_in_both_tables_is_duplicate() {
        let err = Settings::from_toml(
            r#"
[database]
path = ":memory:"

[calendar.work]
timezone = "UTC"

[virtual.work]
from = []
"#,
        )
        .unwrap()
        .resolve()
        .unwrap_err();
        assert!(matches!(err, CalHubError::DuplicateCalendar(id) if id == "work"));
    }

    #[test]
    fn test_virtual_with_unknown_source_fails() {
        let err = Settings::from_toml(
            r#"
[database]
path = ":memory:"

[calendar.work]
timezone = "UTC"

[virtual.team]
from = ["work", "ghost"]
"#,
        )
        .unwrap()
        .resolve()
        .unwrap_err();
        assert!(matches!(err, CalHubError::UnknownCalendarReference(id) if id == "ghost"));
    }

    #[test]
    fn test_unknown_timezone_fails() {
        let err = Settings::from_toml(
            r#"
[database]
path = ":memory:"

[calendar.work]
timezone = "Mars/Olympus"
"#,
        )
        .unwrap()
        .resolve()
        .unwrap_err();
        assert!(matches!(err, CalHubError::UnknownTimezone(tz) if tz == "Mars/Olympus"));
    }

    #[test]
    fn test_relative_redirect_is_accepted() {
        let app = Settings::from_toml(
            r#"
redirect = "/about"

[database]
path = ":memory:"
"#,
        )
        .unwrap()
        .resolve()
        .unwrap();
        assert_eq!(app.redirect.as_deref(), Some("/about"));
    }

    #[test]
    fn test_redirect_validation() {
        assert!(validate_redirect("https://example.org/welcome").is_ok());
        assert!(validate_redirect("/about").is_ok());
        assert!(validate_redirect("about.html").is_ok());

        assert!(validate_redirect("").is_err());
        assert!(validate_redirect("/about\r\nSet-Cookie: x=1").is_err());
        assert!(validate_redirect("https://").is_err());
    }

    #[test]
    fn test_invalid_redirect_fails() {
        let err = Settings::from_toml(
            r#"
redirect = "not a url"

[database]
path = ":memory:"
"#,
        )
        .unwrap()
        .resolve()
        .unwrap_err();
        assert!(matches!(err, CalHubError::Config(_)));
    }

    #[test]
    fn test_unknown_login_kind_is_rejected() {
        let result = Settings::from_toml(
            r#"
[database]
path = ":memory:"

[login.sso]
kind = "oauth"
"#,
        );
        assert!(matches!(result, Err(CalHubError::Config(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calhub.conf");
        std::fs::write(&path, FULL).unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.calendar.len(), 2);
        assert_eq!(settings.virtual_calendar.len(), 1);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = Settings::load(&dir.path().join("nope.toml"));
        assert!(matches!(result, Err(CalHubError::Config(_))));
    }
}
