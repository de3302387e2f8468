//! Keycloak admin REST façade.
//!
//! # Design
//! `KeyCloakManagement` holds the credential resolver (for the base URL), a
//! token source and the dispatcher. The resolver is shared with `CliAuth` so
//! the endpoint is resolved once per client. Every operation copies the current realm once, builds a
//! fresh authenticated request and hands it to the dispatcher variant that
//! matches its result shape: JSON, optional JSON (404 → `None`) or void. The
//! `Result` from the dispatcher is returned unchanged.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use crate::auth::{AccessTokenSource, CliAuth};
use crate::config::ClientOptions;
use crate::endpoint::CredentialResolver;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest};
use crate::request::{build_json_request, build_request, encode_query, segment, with_query};
use crate::response::Dispatcher;
use crate::types::{
    CreateGroup, CreateRole, CreateUser, GetRole, GetUser, Group, GroupCount, QueryGroups,
    QueryRole, QueryUser, Role, UpdateUser,
};

const DEFAULT_REALM: &str = "master";

/// Users, groups and roles of one realm at a time.
pub struct KeyCloakManagement {
    resolver: Arc<CredentialResolver>,
    auth: Arc<dyn AccessTokenSource>,
    dispatcher: Dispatcher,
    realm: RwLock<String>,
}

impl KeyCloakManagement {
    pub fn new(
        resolver: Arc<CredentialResolver>,
        auth: Arc<dyn AccessTokenSource>,
        options: ClientOptions,
    ) -> Self {
        Self {
            resolver,
            auth,
            dispatcher: Dispatcher::new(options),
            realm: RwLock::new(DEFAULT_REALM.to_string()),
        }
    }

    /// Façade over `auth`, reusing its resolver.
    pub fn with_cli_auth(auth: Arc<CliAuth>, options: ClientOptions) -> Self {
        Self::new(auth.resolver(), auth, options)
    }

    /// Scope all following operations to `realm`.
    pub fn set_realm(&self, realm: impl Into<String>) {
        *self.realm.write() = realm.into();
    }

    pub fn realm(&self) -> String {
        self.realm.read().clone()
    }

    // --- groups ---

    /// `GET /admin/realms/{realm}/groups/count`
    pub async fn group_count(&self) -> Result<GroupCount, ApiError> {
        let realm = self.realm();
        let url = self.realm_url(&realm, "groups/count").await?;
        let req = self.request(HttpMethod::Get, url).await?;
        self.dispatcher.fetch_json(req, "get group count", &realm).await
    }

    /// `POST /admin/realms/{realm}/groups`
    pub async fn create_group(&self, group: &CreateGroup) -> Result<(), ApiError> {
        let realm = self.realm();
        let url = self.realm_url(&realm, "groups").await?;
        let req = self.json_request(HttpMethod::Post, url, group).await?;
        let label = format!("create group {}", group.name);
        self.dispatcher.fetch_void(req, &label, &realm).await
    }

    /// `POST /admin/realms/{realm}/groups/{parent_id}/children`
    pub async fn create_child_group(&self, parent_id: &str, group: &CreateGroup) -> Result<(), ApiError> {
        let realm = self.realm();
        let path = format!("groups/{}/children", segment(parent_id));
        let url = self.realm_url(&realm, &path).await?;
        let req = self.json_request(HttpMethod::Post, url, group).await?;
        let label = format!("create child group {} for {parent_id}", group.name);
        self.dispatcher.fetch_void(req, &label, &realm).await
    }

    /// `GET /admin/realms/{realm}/groups?{query}`
    pub async fn query_groups(&self, query: &QueryGroups) -> Result<Vec<Group>, ApiError> {
        let realm = self.realm();
        let search = encode_query(query)?;
        let url = with_query(self.realm_url(&realm, "groups").await?, &search);
        let req = self.request(HttpMethod::Get, url).await?;
        let label = format!("query groups {search}");
        self.dispatcher.fetch_json(req, label.trim_end(), &realm).await
    }

    /// `DELETE /admin/realms/{realm}/groups/{id}`
    pub async fn delete_group(&self, id: &str) -> Result<(), ApiError> {
        let realm = self.realm();
        let url = self.realm_url(&realm, &format!("groups/{}", segment(id))).await?;
        let req = self.request(HttpMethod::Delete, url).await?;
        self.dispatcher
            .fetch_void(req, &format!("delete group {id}"), &realm)
            .await
    }

    // --- roles ---

    /// `GET /admin/realms/{realm}/roles?{query}`
    pub async fn query_roles(&self, query: &QueryRole) -> Result<Vec<Role>, ApiError> {
        let realm = self.realm();
        let search = encode_query(query)?;
        let url = with_query(self.realm_url(&realm, "roles").await?, &search);
        let req = self.request(HttpMethod::Get, url).await?;
        self.dispatcher.fetch_json(req, "query roles", &realm).await
    }

    /// `POST /admin/realms/{realm}/roles`
    pub async fn create_role(&self, role: &CreateRole) -> Result<(), ApiError> {
        let realm = self.realm();
        let url = self.realm_url(&realm, "roles").await?;
        let req = self.json_request(HttpMethod::Post, url, role).await?;
        self.dispatcher
            .fetch_void(req, &format!("create role {}", role.name), &realm)
            .await
    }

    /// `GET /admin/realms/{realm}/roles/{name}`; `None` if the role does not exist.
    pub async fn get_role(&self, name: &str) -> Result<Option<GetRole>, ApiError> {
        let realm = self.realm();
        let url = self.realm_url(&realm, &format!("roles/{}", segment(name))).await?;
        let req = self.request(HttpMethod::Get, url).await?;
        self.dispatcher
            .fetch_optional_json(req, &format!("get role {name}"), &realm)
            .await
    }

    /// `DELETE /admin/realms/{realm}/roles/{name}`
    pub async fn delete_role(&self, name: &str) -> Result<(), ApiError> {
        let realm = self.realm();
        let url = self.realm_url(&realm, &format!("roles/{}", segment(name))).await?;
        let req = self.request(HttpMethod::Delete, url).await?;
        self.dispatcher
            .fetch_void(req, &format!("delete role {name}"), &realm)
            .await
    }

    // --- users ---

    /// `POST /admin/realms/{realm}/users`
    pub async fn create_user(&self, user: &CreateUser) -> Result<(), ApiError> {
        let realm = self.realm();
        let url = self.realm_url(&realm, "users").await?;
        let req = self.json_request(HttpMethod::Post, url, user).await?;
        self.dispatcher
            .fetch_void(req, &format!("create user {}", user.username), &realm)
            .await
    }

    /// `PUT /admin/realms/{realm}/users/{id}`
    pub async fn update_user(&self, id: &str, user: &UpdateUser) -> Result<(), ApiError> {
        let realm = self.realm();
        let url = self.realm_url(&realm, &format!("users/{}", segment(id))).await?;
        let req = self.json_request(HttpMethod::Put, url, user).await?;
        self.dispatcher
            .fetch_void(req, &format!("update user {id}"), &realm)
            .await
    }

    /// `GET /admin/realms/{realm}/users?{query}`
    pub async fn query_user(&self, query: &QueryUser) -> Result<Vec<GetUser>, ApiError> {
        let realm = self.realm();
        let search = encode_query(query)?;
        let url = with_query(self.realm_url(&realm, "users").await?, &search);
        let req = self.request(HttpMethod::Get, url).await?;
        let label = format!("query user {search}");
        self.dispatcher.fetch_json(req, label.trim_end(), &realm).await
    }

    /// `GET /admin/realms/{realm}/users/{id}`; `None` if the user does not exist.
    pub async fn get_user(&self, id: &str) -> Result<Option<GetUser>, ApiError> {
        let realm = self.realm();
        let url = self.realm_url(&realm, &format!("users/{}", segment(id))).await?;
        let req = self.request(HttpMethod::Get, url).await?;
        self.dispatcher
            .fetch_optional_json(req, &format!("get user {id}"), &realm)
            .await
    }

    /// `DELETE /admin/realms/{realm}/users/{id}`
    pub async fn delete_user(&self, id: &str) -> Result<(), ApiError> {
        let realm = self.realm();
        let url = self.realm_url(&realm, &format!("users/{}", segment(id))).await?;
        let req = self.request(HttpMethod::Delete, url).await?;
        self.dispatcher
            .fetch_void(req, &format!("delete user {id}"), &realm)
            .await
    }

    async fn realm_url(&self, realm: &str, path: &str) -> Result<String, ApiError> {
        let creds = self.resolver.resolve().await?;
        Ok(format!("{}/admin/realms/{}/{path}", creds.base, segment(realm)))
    }

    async fn request(&self, method: HttpMethod, url: String) -> Result<HttpRequest, ApiError> {
        let token = self.auth.access_token().await?;
        Ok(build_request(method, url, &token))
    }

    async fn json_request<T: Serialize + Sync>(
        &self,
        method: HttpMethod,
        url: String,
        payload: &T,
    ) -> Result<HttpRequest, ApiError> {
        let token = self.auth.access_token().await?;
        build_json_request(method, url, &token, payload)
    }
}

impl fmt::Debug for KeyCloakManagement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyCloakManagement")
            .field("resolver", &self.resolver)
            .field("realm", &*self.realm.read())
            .finish()
    }
}
