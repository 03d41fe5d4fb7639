//! Application error types using thiserror
//!
//! Error hierarchy:
//! - SourceError: Issues fetching versions from a chart repository or OCI registry
//! - ConfigError: Issues with the engine configuration file or values
//! - InputError: Issues with the chart reference input file

use reqwest::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

/// Errors related to fetching chart versions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The source location uses a scheme the engine cannot fetch from
    #[error("unsupported chart source '{location}': {message}")]
    UnsupportedSource { location: String, message: String },

    /// Connection, DNS or TLS failure
    #[error("failed to reach {url}: {message}")]
    Transport { url: String, message: String },

    /// Request exceeded the transport timeout
    #[error("timeout while fetching {url}")]
    Timeout { url: String },

    /// 401/403 from the source
    #[error(
        "authentication failed for {url} (HTTP {status}); check the credentials configured under `registries`"
    )]
    Unauthorized { url: String, status: u16 },

    /// 404 from the source
    #[error("not found: {url}")]
    NotFound { url: String },

    /// 5xx from the source
    #[error("server error from {url} (HTTP {status}), will be checked again on the next run")]
    ServerError { url: String, status: u16 },

    /// Any other non-success status
    #[error("unexpected HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    /// Body did not match the expected schema
    #[error("invalid response from {url}: {message}")]
    InvalidResponse { url: String, message: String },

    /// HTTP client could not be constructed
    #[error("failed to create HTTP client: {message}")]
    Client { message: String },
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the configuration file
    #[error("failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    /// Config file extension is not yaml, yml, toml or json
    #[error("unsupported config format: {path} (expected .yaml, .yml, .toml or .json)")]
    UnsupportedFormat { path: PathBuf },

    /// Unknown update strategy literal
    #[error("invalid update strategy '{value}': expected 'patch', 'minor', 'major' or 'all'")]
    InvalidStrategy { value: String },

    /// Unknown update class literal
    #[error("invalid update type '{value}': expected 'major', 'minor' or 'patch'")]
    InvalidUpdateClass { value: String },

    /// A version or name pattern could not be compiled
    #[error("invalid pattern '{pattern}' in {field}: {message}")]
    InvalidPattern {
        field: String,
        pattern: String,
        message: String,
    },

    /// Credential refers to an unset environment variable
    #[error("environment variable {var} for registry '{registry}' is not set")]
    MissingEnvVar { registry: String, var: String },
}

/// Errors related to the chart reference input file
#[derive(Error, Debug)]
pub enum InputError {
    /// Failed to read the input file
    #[error("failed to read chart references {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the input file
    #[error("failed to parse chart references {path}: {message}")]
    ParseError { path: PathBuf, message: String },
}

impl SourceError {
    /// Creates a new UnsupportedSource error
    pub fn unsupported(location: impl Into<String>, message: impl Into<String>) -> Self {
        SourceError::UnsupportedSource {
            location: location.into(),
            message: message.into(),
        }
    }

    /// Creates a new InvalidResponse error
    pub fn invalid_response(url: impl Into<String>, message: impl Into<String>) -> Self {
        SourceError::InvalidResponse {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Classifies a transport-level reqwest failure
    pub fn from_transport(url: impl Into<String>, err: &reqwest::Error) -> Self {
        let url = url.into();
        if err.is_timeout() {
            SourceError::Timeout { url }
        } else {
            SourceError::Transport {
                url,
                message: err.to_string(),
            }
        }
    }

    /// Classifies a non-success HTTP status
    pub fn from_status(url: impl Into<String>, status: StatusCode) -> Self {
        let url = url.into();
        let code = status.as_u16();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                SourceError::Unauthorized { url, status: code }
            }
            StatusCode::NOT_FOUND => SourceError::NotFound { url },
            s if s.is_server_error() => SourceError::ServerError { url, status: code },
            _ => SourceError::HttpStatus { url, status: code },
        }
    }

    /// Returns true for failures that are likely to go away on a later run
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SourceError::Transport { .. } | SourceError::Timeout { .. } | SourceError::ServerError { .. }
        )
    }
}

impl ConfigError {
    /// Creates a new ParseError
    pub fn parse_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        ConfigError::ParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new InvalidPattern error
    pub fn invalid_pattern(
        field: impl Into<String>,
        pattern: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ConfigError::InvalidPattern {
            field: field.into(),
            pattern: pattern.into(),
            message: message.into(),
        }
    }
}

impl InputError {
    /// Creates a new ParseError
    pub fn parse_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        InputError::ParseError {
            path: path.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_unauthorized() {
        let err = SourceError::from_status("https://ghcr.io/v2/a/tags/list", StatusCode::UNAUTHORIZED);
        assert!(matches!(err, SourceError::Unauthorized { status: 401, .. }));
        assert!(err.to_string().contains("check the credentials"));
    }

    #[test]
    fn test_from_status_forbidden() {
        let err = SourceError::from_status("https://example.com", StatusCode::FORBIDDEN);
        assert!(matches!(err, SourceError::Unauthorized { status: 403, .. }));
    }

    #[test]
    fn test_from_status_not_found() {
        let err = SourceError::from_status("https://example.com/index.yaml", StatusCode::NOT_FOUND);
        assert_eq!(
            err,
            SourceError::NotFound {
                url: "https://example.com/index.yaml".to_string()
            }
        );
        assert!(!err.is_transient());
    }

    #[test]
    fn test_from_status_server_error() {
        let err = SourceError::from_status("https://example.com", StatusCode::BAD_GATEWAY);
        assert!(matches!(err, SourceError::ServerError { status: 502, .. }));
        assert!(err.is_transient());
    }

    #[test]
    fn test_from_status_other() {
        let err = SourceError::from_status("https://example.com", StatusCode::IM_A_TEAPOT);
        assert!(matches!(err, SourceError::HttpStatus { status: 418, .. }));
    }

    #[test]
    fn test_source_error_messages_include_url() {
        let err = SourceError::invalid_response("https://charts.example.com/index.yaml", "no entries");
        let msg = err.to_string();
        assert!(msg.contains("https://charts.example.com/index.yaml"));
        assert!(msg.contains("no entries"));
    }

    #[test]
    fn test_unsupported_source() {
        let err = SourceError::unsupported("file:///charts", "unknown scheme");
        assert!(err.to_string().contains("file:///charts"));
    }

    #[test]
    fn test_config_error_invalid_strategy() {
        let err = ConfigError::InvalidStrategy {
            value: "newest".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("invalid update strategy"));
        assert!(msg.contains("newest"));
    }

    #[test]
    fn test_config_error_invalid_pattern() {
        let err = ConfigError::invalid_pattern("ignore[0].versions", ">>1", "unexpected character");
        let msg = err.to_string();
        assert!(msg.contains("ignore[0].versions"));
        assert!(msg.contains(">>1"));
    }
}
