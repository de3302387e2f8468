use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Form, Json, Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

/// Admin account accepted by the token endpoint and token lifetime.
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub username: String,
    pub password: String,
    pub token_ttl_secs: i64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: "admin".to_string(),
            token_ttl_secs: 60,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    pub enabled: bool,
    pub email_verified: bool,
    pub created_timestamp: i64,
    pub totp: bool,
    pub not_before: i64,
    pub disableable_credential_types: Vec<String>,
    pub required_actions: Vec<String>,
    pub access: HashMap<String, bool>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub enabled: Option<bool>,
    #[serde(default)]
    pub credentials: Vec<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub enabled: Option<bool>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    pub name: String,
    pub path: String,
    pub sub_groups: Vec<Group>,
}

#[derive(Deserialize)]
pub struct NewGroup {
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub composite: bool,
    pub client_role: bool,
    pub container_id: String,
    pub attributes: HashMap<String, Vec<String>>,
}

#[derive(Deserialize)]
pub struct NewRole {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub attributes: HashMap<String, Vec<String>>,
}

#[derive(Deserialize)]
pub struct TokenForm {
    pub grant_type: String,
    pub client_id: String,
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct UserQuery {
    pub id: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub exact: Option<bool>,
    pub first: Option<usize>,
    pub max: Option<usize>,
}

#[derive(Deserialize)]
pub struct GroupQuery {
    pub search: Option<String>,
    pub exact: Option<bool>,
    pub first: Option<usize>,
    pub max: Option<usize>,
}

#[derive(Deserialize)]
pub struct RoleQuery {
    pub search: Option<String>,
    pub first: Option<usize>,
    pub max: Option<usize>,
}

#[derive(Default)]
pub struct RealmData {
    pub users: Vec<User>,
    pub groups: Vec<Group>,
    pub roles: Vec<Role>,
}

pub struct Keycloak {
    config: MockConfig,
    realms: HashMap<String, RealmData>,
    /// Issued access tokens and their expiry (unix seconds).
    tokens: HashMap<String, i64>,
}

impl Keycloak {
    fn new(config: MockConfig) -> Self {
        let mut realms = HashMap::new();
        realms.insert("master".to_string(), RealmData::default());
        Self {
            config,
            realms,
            tokens: HashMap::new(),
        }
    }

    /// Record a freshly issued token and forget the expired ones.
    fn remember_token(&mut self, token: String, expires_at: i64, now: i64) {
        self.tokens.retain(|_, exp| *exp > now);
        self.tokens.insert(token, expires_at);
    }
}

pub type Db = Arc<RwLock<Keycloak>>;

pub fn app() -> Router {
    app_with_config(MockConfig::default())
}

pub fn app_with_config(config: MockConfig) -> Router {
    let db: Db = Arc::new(RwLock::new(Keycloak::new(config)));
    Router::new()
        .route("/realms/{realm}/protocol/openid-connect/token", post(issue_token))
        .route("/admin/realms/{realm}/users", get(list_users).post(create_user))
        .route(
            "/admin/realms/{realm}/users/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/admin/realms/{realm}/groups", get(list_groups).post(create_group))
        .route("/admin/realms/{realm}/groups/count", get(count_groups))
        .route("/admin/realms/{realm}/groups/{id}", delete(delete_group))
        .route("/admin/realms/{realm}/groups/{id}/children", post(create_child_group))
        .route("/admin/realms/{realm}/roles", get(list_roles).post(create_role))
        .route("/admin/realms/{realm}/roles/{name}", get(get_role).delete(delete_role))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// Unsigned JWT carrying `exp`, `iat` and a unique `jti`.
pub fn mint_token(username: &str, issued_at: i64, expires_at: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
    let claims = json!({
        "exp": expires_at,
        "iat": issued_at,
        "jti": Uuid::new_v4(),
        "azp": "admin-cli",
        "preferred_username": username,
    });
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.unsigned")
}

fn authorize(kc: &Keycloak, headers: &HeaderMap) -> Result<(), StatusCode> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(StatusCode::UNAUTHORIZED)?;
    match kc.tokens.get(token) {
        Some(exp) if *exp > Utc::now().timestamp() => Ok(()),
        _ => {
            debug!("rejected admin request with unknown or expired token");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

fn realm_data<'a>(kc: &'a Keycloak, realm: &str) -> Result<&'a RealmData, StatusCode> {
    kc.realms.get(realm).ok_or(StatusCode::NOT_FOUND)
}

fn realm_data_mut<'a>(kc: &'a mut Keycloak, realm: &str) -> Result<&'a mut RealmData, StatusCode> {
    kc.realms.get_mut(realm).ok_or(StatusCode::NOT_FOUND)
}

fn name_matches(name: &str, search: &str, exact: bool) -> bool {
    if exact {
        name == search
    } else {
        name.to_lowercase().contains(&search.to_lowercase())
    }
}

/// Keep `group` if it matches, or a copy holding only its matching branches.
pub fn filter_group(group: &Group, search: &str, exact: bool) -> Option<Group> {
    if name_matches(&group.name, search, exact) {
        return Some(group.clone());
    }
    let sub_groups: Vec<Group> = group
        .sub_groups
        .iter()
        .filter_map(|child| filter_group(child, search, exact))
        .collect();
    if sub_groups.is_empty() {
        None
    } else {
        Some(Group {
            sub_groups,
            ..group.clone()
        })
    }
}

fn find_group_mut<'a>(groups: &'a mut [Group], id: &str) -> Option<&'a mut Group> {
    for group in groups.iter_mut() {
        if group.id == id {
            return Some(group);
        }
        if let Some(found) = find_group_mut(&mut group.sub_groups, id) {
            return Some(found);
        }
    }
    None
}

fn remove_group(groups: &mut Vec<Group>, id: &str) -> bool {
    if let Some(pos) = groups.iter().position(|g| g.id == id) {
        groups.remove(pos);
        return true;
    }
    groups.iter_mut().any(|g| remove_group(&mut g.sub_groups, id))
}

fn created(location: String) -> impl IntoResponse {
    (StatusCode::CREATED, [(header::LOCATION, location)])
}

fn page<T>(items: impl Iterator<Item = T>, first: Option<usize>, max: Option<usize>) -> Vec<T> {
    items.skip(first.unwrap_or(0)).take(max.unwrap_or(100)).collect()
}

// --- token ---

async fn issue_token(
    State(db): State<Db>,
    Path(realm): Path<String>,
    Form(form): Form<TokenForm>,
) -> Result<Json<Value>, StatusCode> {
    let mut kc = db.write().await;
    if !kc.realms.contains_key(&realm) {
        warn!(%realm, "token request for unknown realm");
        return Err(StatusCode::NOT_FOUND);
    }
    if form.client_id != "admin-cli" || form.grant_type != "password" {
        return Err(StatusCode::BAD_REQUEST);
    }
    if form.username != kc.config.username || form.password != kc.config.password {
        warn!(%realm, username = %form.username, "invalid admin credentials");
        return Err(StatusCode::UNAUTHORIZED);
    }

    let now = Utc::now().timestamp();
    let ttl = kc.config.token_ttl_secs;
    let token = mint_token(&form.username, now, now + ttl);
    kc.remember_token(token.clone(), now + ttl, now);
    Ok(Json(json!({
        "access_token": token,
        "expires_in": ttl,
        "refresh_expires_in": 1800,
        "refresh_token": Uuid::new_v4().to_string(),
        "token_type": "Bearer",
        "not-before-policy": 0,
        "session_state": Uuid::new_v4().to_string(),
        "scope": "profile email",
    })))
}

// --- users ---

async fn list_users(
    State(db): State<Db>,
    Path(realm): Path<String>,
    headers: HeaderMap,
    Query(query): Query<UserQuery>,
) -> Result<Json<Vec<User>>, StatusCode> {
    let kc = db.read().await;
    authorize(&kc, &headers)?;
    let data = realm_data(&kc, &realm)?;
    let exact = query.exact.unwrap_or(false);
    let users = data.users.iter().filter(|u| {
        query.id.as_ref().is_none_or(|id| u.id.to_string() == *id)
            && query
                .username
                .as_ref()
                .is_none_or(|name| name_matches(&u.username, &name.to_lowercase(), exact))
            && query.email.as_ref().is_none_or(|email| {
                u.email
                    .as_ref()
                    .is_some_and(|e| name_matches(e, &email.to_lowercase(), exact))
            })
    });
    Ok(Json(page(users.cloned(), query.first, query.max)))
}

async fn create_user(
    State(db): State<Db>,
    Path(realm): Path<String>,
    headers: HeaderMap,
    Json(input): Json<NewUser>,
) -> Result<impl IntoResponse, StatusCode> {
    let mut kc = db.write().await;
    authorize(&kc, &headers)?;
    let data = realm_data_mut(&mut kc, &realm)?;
    let username = input.username.to_lowercase();
    if data.users.iter().any(|u| u.username == username) {
        return Err(StatusCode::CONFLICT);
    }
    let user = User {
        id: Uuid::new_v4(),
        username,
        email: input.email,
        first_name: input.first_name,
        last_name: input.last_name,
        enabled: input.enabled.unwrap_or(false),
        email_verified: false,
        created_timestamp: Utc::now().timestamp_millis(),
        totp: false,
        not_before: 0,
        disableable_credential_types: Vec::new(),
        required_actions: Vec::new(),
        access: HashMap::from([
            ("manageGroupMembership".to_string(), true),
            ("view".to_string(), true),
            ("mapRoles".to_string(), true),
            ("impersonate".to_string(), true),
            ("manage".to_string(), true),
        ]),
    };
    debug!(%realm, username = %user.username, credentials = input.credentials.len(), "user created");
    let location = format!("/admin/realms/{realm}/users/{}", user.id);
    data.users.push(user);
    Ok(created(location))
}

async fn get_user(
    State(db): State<Db>,
    Path((realm, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Json<User>, StatusCode> {
    let kc = db.read().await;
    authorize(&kc, &headers)?;
    let data = realm_data(&kc, &realm)?;
    data.users
        .iter()
        .find(|u| u.id.to_string() == id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn update_user(
    State(db): State<Db>,
    Path((realm, id)): Path<(String, String)>,
    headers: HeaderMap,
    Json(input): Json<UserPatch>,
) -> Result<StatusCode, StatusCode> {
    let mut kc = db.write().await;
    authorize(&kc, &headers)?;
    let data = realm_data_mut(&mut kc, &realm)?;
    let user = data
        .users
        .iter_mut()
        .find(|u| u.id.to_string() == id)
        .ok_or(StatusCode::NOT_FOUND)?;
    if let Some(username) = input.username {
        user.username = username.to_lowercase();
    }
    if let Some(email) = input.email {
        user.email = Some(email);
    }
    if let Some(first_name) = input.first_name {
        user.first_name = Some(first_name);
    }
    if let Some(last_name) = input.last_name {
        user.last_name = Some(last_name);
    }
    if let Some(enabled) = input.enabled {
        user.enabled = enabled;
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_user(
    State(db): State<Db>,
    Path((realm, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<StatusCode, StatusCode> {
    let mut kc = db.write().await;
    authorize(&kc, &headers)?;
    let data = realm_data_mut(&mut kc, &realm)?;
    let pos = data
        .users
        .iter()
        .position(|u| u.id.to_string() == id)
        .ok_or(StatusCode::NOT_FOUND)?;
    data.users.remove(pos);
    Ok(StatusCode::NO_CONTENT)
}

// --- groups ---

async fn list_groups(
    State(db): State<Db>,
    Path(realm): Path<String>,
    headers: HeaderMap,
    Query(query): Query<GroupQuery>,
) -> Result<Json<Vec<Group>>, StatusCode> {
    let kc = db.read().await;
    authorize(&kc, &headers)?;
    let data = realm_data(&kc, &realm)?;
    let exact = query.exact.unwrap_or(false);
    let groups: Vec<Group> = match &query.search {
        Some(search) => data
            .groups
            .iter()
            .filter_map(|g| filter_group(g, search, exact))
            .collect(),
        None => data.groups.clone(),
    };
    Ok(Json(page(groups.into_iter(), query.first, query.max)))
}

async fn count_groups(
    State(db): State<Db>,
    Path(realm): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    let kc = db.read().await;
    authorize(&kc, &headers)?;
    let data = realm_data(&kc, &realm)?;
    Ok(Json(json!({ "count": data.groups.len() })))
}

async fn create_group(
    State(db): State<Db>,
    Path(realm): Path<String>,
    headers: HeaderMap,
    Json(input): Json<NewGroup>,
) -> Result<impl IntoResponse, StatusCode> {
    let mut kc = db.write().await;
    authorize(&kc, &headers)?;
    let data = realm_data_mut(&mut kc, &realm)?;
    if data.groups.iter().any(|g| g.name == input.name) {
        return Err(StatusCode::CONFLICT);
    }
    let group = Group {
        id: Uuid::new_v4().to_string(),
        path: format!("/{}", input.name),
        name: input.name,
        sub_groups: Vec::new(),
    };
    let location = format!("/admin/realms/{realm}/groups/{}", group.id);
    data.groups.push(group);
    Ok(created(location))
}

async fn create_child_group(
    State(db): State<Db>,
    Path((realm, id)): Path<(String, String)>,
    headers: HeaderMap,
    Json(input): Json<NewGroup>,
) -> Result<impl IntoResponse, StatusCode> {
    let mut kc = db.write().await;
    authorize(&kc, &headers)?;
    let data = realm_data_mut(&mut kc, &realm)?;
    let parent = find_group_mut(&mut data.groups, &id).ok_or(StatusCode::NOT_FOUND)?;
    if parent.sub_groups.iter().any(|g| g.name == input.name) {
        return Err(StatusCode::CONFLICT);
    }
    let child = Group {
        id: Uuid::new_v4().to_string(),
        path: format!("{}/{}", parent.path, input.name),
        name: input.name,
        sub_groups: Vec::new(),
    };
    let location = format!("/admin/realms/{realm}/groups/{}", child.id);
    parent.sub_groups.push(child);
    Ok(created(location))
}

async fn delete_group(
    State(db): State<Db>,
    Path((realm, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<StatusCode, StatusCode> {
    let mut kc = db.write().await;
    authorize(&kc, &headers)?;
    let data = realm_data_mut(&mut kc, &realm)?;
    if remove_group(&mut data.groups, &id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}

// --- roles ---

async fn list_roles(
    State(db): State<Db>,
    Path(realm): Path<String>,
    headers: HeaderMap,
    Query(query): Query<RoleQuery>,
) -> Result<Json<Vec<Role>>, StatusCode> {
    let kc = db.read().await;
    authorize(&kc, &headers)?;
    let data = realm_data(&kc, &realm)?;
    let roles = data.roles.iter().filter(|r| {
        query
            .search
            .as_ref()
            .is_none_or(|search| name_matches(&r.name, search, false))
    });
    Ok(Json(page(roles.cloned(), query.first, query.max)))
}

async fn create_role(
    State(db): State<Db>,
    Path(realm): Path<String>,
    headers: HeaderMap,
    Json(input): Json<NewRole>,
) -> Result<impl IntoResponse, StatusCode> {
    let mut kc = db.write().await;
    authorize(&kc, &headers)?;
    let data = realm_data_mut(&mut kc, &realm)?;
    if data.roles.iter().any(|r| r.name == input.name) {
        return Err(StatusCode::CONFLICT);
    }
    let location = format!("/admin/realms/{realm}/roles/{}", input.name);
    data.roles.push(Role {
        id: Uuid::new_v4().to_string(),
        name: input.name,
        description: input.description,
        composite: false,
        client_role: false,
        container_id: realm,
        attributes: input.attributes,
    });
    Ok(created(location))
}

async fn get_role(
    State(db): State<Db>,
    Path((realm, name)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Json<Role>, StatusCode> {
    let kc = db.read().await;
    authorize(&kc, &headers)?;
    let data = realm_data(&kc, &realm)?;
    data.roles
        .iter()
        .find(|r| r.name == name)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn delete_role(
    State(db): State<Db>,
    Path((realm, name)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<StatusCode, StatusCode> {
    let mut kc = db.write().await;
    authorize(&kc, &headers)?;
    let data = realm_data_mut(&mut kc, &realm)?;
    let pos = data
        .roles
        .iter()
        .position(|r| r.name == name)
        .ok_or(StatusCode::NOT_FOUND)?;
    data.roles.remove(pos);
    Ok(StatusCode::NO_CONTENT)
}
