//! Error types for the Keycloak admin client.
//!
//! # Design
//! Callers must be able to tell "server unreachable" (`Fetch`) from "server
//! rejected us" (`HttpStatus`) from "server answered with something we cannot
//! use" (`Validation`). Setup defects such as a malformed endpoint URL or a
//! token without an `exp` claim are `Config`; they are not expected at runtime
//! and callers usually bail out on them.

use thiserror::Error;

/// Errors returned by every fallible client operation.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The transport failed before a response was received.
    #[error("{message}")]
    Fetch { message: String },

    /// The server returned a non-2xx status (404 excluded when the caller
    /// allowed it).
    #[error("{message}")]
    HttpStatus {
        message: String,
        status: u16,
        url: String,
    },

    /// The response was not JSON, did not match the expected shape, or carried
    /// a body where none was expected.
    #[error("{message}")]
    Validation { message: String },

    /// The request payload could not be serialized to JSON.
    #[error("{message}")]
    Serialization { message: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ApiError {
    /// HTTP status of an `HttpStatus` error.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_config(&self) -> bool {
        matches!(self, ApiError::Config(_))
    }
}

/// Misconfiguration detected while resolving the endpoint or checking a token.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid KeyCloak url: {input} ({reason})")]
    InvalidEndpoint { input: String, reason: String },

    #[error("Token does not have exp field")]
    MissingExpiry,

    #[error("Malformed access token: {0}")]
    MalformedToken(String),
}

impl ConfigError {
    pub(crate) fn invalid_endpoint(input: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidEndpoint {
            input: input.into(),
            reason: reason.into(),
        }
    }
}
