//! Error types for the cluster lifecycle
//!
//! This module defines all error types used throughout the crate.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for lifecycle operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the cluster lifecycle
#[derive(Error, Debug)]
pub enum Error {
    /// No hosted zone carries the requested name
    #[error("Hosted zone not found: {0}")]
    ZoneNotFound(String),

    /// More than one hosted zone carries the requested name
    #[error("Ambiguous hosted zone {name}: {count} zones share this name")]
    AmbiguousZone {
        /// Zone name that was queried
        name: String,
        /// Number of zones returned
        count: usize,
    },

    /// A configuration file or a file referenced by a profile is missing
    #[error("Configuration missing: {0}")]
    ConfigMissing(String),

    /// The install template for a profile does not exist
    #[error("Template missing: {}", .0.display())]
    TemplateMissing(PathBuf),

    /// A `{{identifier}}` placeholder has no value
    #[error("Cannot replace {{{{{0}}}}} variable")]
    UnresolvedPlaceholder(String),

    /// A live install already occupies the install directory
    #[error("{} exists already", .0.display())]
    AlreadyExists(PathBuf),

    /// An external command exited unsuccessfully
    #[error("{step} failed with status {}: {output}", status_label(.status))]
    ExternalCommandFailed {
        /// Human-readable step name
        step: String,
        /// Exit status, `None` when killed by a signal or never started
        status: Option<i32>,
        /// Captured output, or the command line when output was streamed
        output: String,
    },

    /// A requested profile is not in the configuration
    #[error("Profile: {0} is not in config")]
    UnknownProfile(String),

    /// Floating address allocation failed
    #[error("Address allocation failed: {0}")]
    AllocationFailed(String),

    /// Floating address release failed
    #[error("Address release failed: {0}")]
    ReleaseFailed(String),

    /// DNS backend errors
    #[error("DNS provider error ({provider}): {message}")]
    DnsProvider {
        /// Backend name
        provider: String,
        /// Error message
        message: String,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// Filesystem and process spawning errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML deserialization errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Create a "zone not found" error
    pub fn zone_not_found(name: impl Into<String>) -> Self {
        Self::ZoneNotFound(name.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a "configuration missing" error
    pub fn config_missing(msg: impl Into<String>) -> Self {
        Self::ConfigMissing(msg.into())
    }

    /// Create a DNS backend error
    pub fn dns(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DnsProvider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create an allocation error
    pub fn allocation(msg: impl Into<String>) -> Self {
        Self::AllocationFailed(msg.into())
    }

    /// Create a release error
    pub fn release(msg: impl Into<String>) -> Self {
        Self::ReleaseFailed(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an external command failure
    pub fn command_failed(step: impl Into<String>, status: Option<i32>, output: impl Into<String>) -> Self {
        Self::ExternalCommandFailed {
            step: step.into(),
            status,
            output: output.into(),
        }
    }

    /// Whether this error is raised before any cloud-side mutation
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            Self::ConfigMissing(_)
                | Self::TemplateMissing(_)
                | Self::UnresolvedPlaceholder(_)
                | Self::UnknownProfile(_)
                | Self::Config(_)
        )
    }

    /// Whether this error reports an absent hosted zone
    pub fn is_zone_not_found(&self) -> bool {
        matches!(self, Self::ZoneNotFound(_))
    }

    /// Process exit code for this error
    ///
    /// External command failures propagate the command's own status.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::ExternalCommandFailed {
                status: Some(code), ..
            } if (1..=255).contains(code) => *code as u8,
            _ => 1,
        }
    }
}

fn status_label(status: &Option<i32>) -> String {
    match status {
        Some(code) => code.to_string(),
        None => "unknown".to_string(),
    }
}
