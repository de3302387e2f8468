//! Typed async client for the Keycloak admin REST API.
//!
//! # Overview
//! `CliAuth` turns an endpoint URL with embedded admin credentials into a
//! cached, self-renewing bearer token. `KeyCloakManagement` uses that token to
//! manage users, groups and roles in one realm at a time.
//!
//! # Design
//! - The pipeline is endpoint resolution → token → request building →
//!   dispatch through a `Transport` → classification → shape validation.
//! - Transport and logger are traits injected through `ClientOptions`; the
//!   defaults are a ureq agent and `tracing`.
//! - Every fallible operation returns `Result<_, ApiError>`, whose variants keep
//!   transport failures, HTTP status failures and malformed responses apart.
//! - Response DTOs are the validation shapes (serde).

pub mod auth;
pub mod client;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod logger;
pub mod request;
pub mod response;
pub mod transport;
pub mod types;

#[cfg(test)]
mod test_support;

pub use auth::{default_token_validation, AccessTokenSource, CliAuth, TokenState, TokenValidation};
pub use client::KeyCloakManagement;
pub use config::ClientOptions;
pub use endpoint::{BoxError, CredentialResolver, Endpoint, ResolvedCredentials};
pub use error::{ApiError, ConfigError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, TransportError};
pub use logger::{Logger, TracingLogger};
pub use response::{Dispatcher, RequestOptions};
pub use transport::UreqTransport;
pub use types::{
    CreateGroup, CreateRole, CreateUser, CredentialType, GetRole, GetUser, Group, GroupCount,
    QueryGroups, QueryRole, QueryUser, Role, RoleList, TokenResponse, TokenType, UpdateUser,
    UserCredentials,
};
