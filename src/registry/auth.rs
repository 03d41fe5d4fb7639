//! Registry credentials and authorization headers
//!
//! Credentials are matched against each request URL. The first credential
//! whose `registry` equals the request host, or occurs in the request's
//! host and path, supplies the `Authorization` header.

use crate::config::{ConfigWarning, WarningKind};
use crate::error::ConfigError;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Credential entry as written in configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RegistryCredential {
    /// Host, or host with path prefix (scheme optional)
    ///
    /// Besides an exact host match, the value also matches any request whose
    /// `host/path` contains it as a substring: `example.com` applies to
    /// `notexample.com` too. Include the port or a path prefix to narrow it.
    pub registry: String,
    /// "basic" (default) or "bearer"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Read the password from this environment variable instead
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,
}

impl RegistryCredential {
    pub fn basic(registry: impl Into<String>, username: &str, password: &str) -> Self {
        Self {
            registry: registry.into(),
            auth_type: None,
            username: Some(username.to_string()),
            password: Some(password.to_string()),
            password_env: None,
        }
    }

    pub fn bearer(registry: impl Into<String>, token: &str) -> Self {
        Self {
            registry: registry.into(),
            auth_type: Some("bearer".to_string()),
            username: None,
            password: Some(token.to_string()),
            password_env: None,
        }
    }
}

/// Authorization resolved for a request
#[derive(Clone, PartialEq, Eq)]
pub enum ResolvedAuth {
    Basic { username: String, password: String },
    Bearer { token: String },
}

impl ResolvedAuth {
    /// Value for the `Authorization` header
    pub fn header_value(&self) -> String {
        match self {
            ResolvedAuth::Basic { username, password } => {
                let encoded = base64::engine::general_purpose::STANDARD
                    .encode(format!("{}:{}", username, password));
                format!("Basic {}", encoded)
            }
            ResolvedAuth::Bearer { token } => format!("Bearer {}", token),
        }
    }
}

// Secrets stay out of logs
impl fmt::Debug for ResolvedAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedAuth::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            ResolvedAuth::Bearer { .. } => f
                .debug_struct("Bearer")
                .field("token", &"<redacted>")
                .finish(),
        }
    }
}

#[derive(Debug, Clone)]
struct CredentialEntry {
    /// Lowercased, scheme and trailing slash removed
    registry: String,
    auth: ResolvedAuth,
}

/// Resolves authorization for request URLs
#[derive(Debug, Clone, Default)]
pub struct AuthResolver {
    entries: Vec<CredentialEntry>,
}

impl AuthResolver {
    /// Build a resolver, reading `password-env` variables from the process environment
    pub fn new(credentials: &[RegistryCredential]) -> (Self, Vec<ConfigWarning>) {
        Self::with_env(credentials, |var| std::env::var(var).ok())
    }

    /// Build a resolver with a custom environment lookup
    pub fn with_env<F>(credentials: &[RegistryCredential], env: F) -> (Self, Vec<ConfigWarning>)
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut warnings = Vec::new();
        let mut entries = Vec::with_capacity(credentials.len());

        for (index, credential) in credentials.iter().enumerate() {
            let password = match (&credential.password, &credential.password_env) {
                (Some(password), _) => password.clone(),
                (None, Some(var)) => match env(var) {
                    Some(value) => value,
                    None => {
                        let err = ConfigError::MissingEnvVar {
                            registry: credential.registry.clone(),
                            var: var.clone(),
                        };
                        warnings.push(ConfigWarning::new(
                            WarningKind::MissingCredentialEnv,
                            format!("registries[{}].password-env", index),
                            var,
                            format!("{}; requests to this registry are unauthenticated", err),
                        ));
                        continue;
                    }
                },
                (None, None) => String::new(),
            };

            let auth_type = credential
                .auth_type
                .as_deref()
                .map(|t| t.trim().to_ascii_lowercase());
            let auth = match auth_type.as_deref() {
                None | Some("basic") => ResolvedAuth::Basic {
                    username: credential.username.clone().unwrap_or_default(),
                    password,
                },
                Some("bearer") => ResolvedAuth::Bearer { token: password },
                Some(other) => {
                    warnings.push(ConfigWarning::new(
                        WarningKind::UnknownAuthType,
                        format!("registries[{}].auth-type", index),
                        other,
                        format!(
                            "unknown auth type '{}' for registry '{}'; using basic",
                            other, credential.registry
                        ),
                    ));
                    ResolvedAuth::Basic {
                        username: credential.username.clone().unwrap_or_default(),
                        password,
                    }
                }
            };

            entries.push(CredentialEntry {
                registry: normalize_registry(&credential.registry),
                auth,
            });
        }

        (Self { entries }, warnings)
    }

    /// Returns true if no credentials are configured
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Select the credential for a request URL
    pub fn resolve(&self, url: &str) -> Option<&ResolvedAuth> {
        let parsed = Url::parse(url).ok()?;
        let host = parsed.host_str()?.to_ascii_lowercase();
        let host = match parsed.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host,
        };
        let host_path = format!("{}{}", host, parsed.path());

        self.entries
            .iter()
            .find(|entry| {
                !entry.registry.is_empty()
                    && (entry.registry == host || host_path.contains(&entry.registry))
            })
            .map(|entry| &entry.auth)
    }

    /// `Authorization` header value for a request URL, if a credential matches
    pub fn header_for(&self, url: &str) -> Option<String> {
        self.resolve(url).map(ResolvedAuth::header_value)
    }
}

fn normalize_registry(registry: &str) -> String {
    let trimmed = registry.trim();
    let without_scheme = trimmed
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(trimmed);
    without_scheme.trim_end_matches('/').to_ascii_lowercase()
}
