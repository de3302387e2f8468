use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Payload for `POST /admin/realms/{realm}/roles`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRole {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<HashMap<String, Vec<String>>>,
    /// Client targeted role.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_role: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub name: String,
    /// Role requires scope on request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope_param_required: Option<bool>,
}

impl CreateRole {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// A role as listed by `GET /admin/realms/{realm}/roles`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub client_role: bool,
    pub composite: bool,
    pub container_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub id: String,
    pub name: String,
}

pub type RoleList = Vec<Role>;

/// A single role looked up by name; carries its attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetRole {
    pub attributes: HashMap<String, Vec<String>>,
    pub client_role: bool,
    pub composite: bool,
    pub container_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub id: String,
    pub name: String,
}

/// Search parameters for `GET /admin/realms/{realm}/roles`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRole {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brief_representation: Option<bool>,
    /// Pagination offset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first: Option<u32>,
    /// Maximum result size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<u32>,
}
