//! Request and response DTOs for the Keycloak admin API.
//!
//! # Design
//! Response types double as the validation shapes: a body is accepted only if
//! it deserializes into the expected type. Fields are camelCase on the wire.
//! Unknown fields are ignored so newer server versions keep working. Request
//! types skip absent optional fields so partial updates stay partial.

pub mod group;
pub mod role;
pub mod token;
pub mod user;

pub use group::{CreateGroup, Group, GroupCount, QueryGroups};
pub use role::{CreateRole, GetRole, QueryRole, Role, RoleList};
pub use token::{TokenResponse, TokenType};
pub use user::{CreateUser, CredentialType, GetUser, QueryUser, UpdateUser, UserCredentials};
