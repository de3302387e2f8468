use axum::http::{self, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mock_server::{app, app_with_config, Group, MockConfig, Role, User};
use serde_json::Value;
use tower::ServiceExt;

const TOKEN_URI: &str = "/realms/master/protocol/openid-connect/token";

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn form_request(uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(body.to_string())
        .unwrap()
}

fn authed(method: &str, uri: &str, token: &str, body: Option<&str>) -> Request<String> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::AUTHORIZATION, format!("Bearer {token}"));
    match body {
        Some(body) => builder
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(body.to_string())
            .unwrap(),
        None => builder.body(String::new()).unwrap(),
    }
}

async fn login(app: &Router) -> String {
    let resp = app
        .clone()
        .oneshot(form_request(
            TOKEN_URI,
            "grant_type=password&username=admin&password=admin&client_id=admin-cli",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    body["access_token"].as_str().unwrap().to_string()
}

async fn send(app: &Router, request: Request<String>) -> axum::response::Response {
    app.clone().oneshot(request).await.unwrap()
}

// --- token ---

#[tokio::test]
async fn token_endpoint_issues_bearer_token() {
    let app = app();
    let resp = send(
        &app,
        form_request(
            TOKEN_URI,
            "grant_type=password&username=admin&password=admin&client_id=admin-cli",
        ),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], 60);
    assert_eq!(body["access_token"].as_str().unwrap().split('.').count(), 3);
}

#[tokio::test]
async fn token_endpoint_rejects_bad_password() {
    let resp = send(
        &app(),
        form_request(
            TOKEN_URI,
            "grant_type=password&username=admin&password=nope&client_id=admin-cli",
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_endpoint_unknown_realm_returns_404() {
    let resp = send(
        &app(),
        form_request(
            "/realms/broken/protocol/openid-connect/token",
            "grant_type=password&username=admin&password=admin&client_id=admin-cli",
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn custom_credentials_are_honoured() {
    let app = app_with_config(MockConfig {
        username: "root".to_string(),
        password: "s3cret".to_string(),
        token_ttl_secs: 5,
    });
    let resp = send(
        &app,
        form_request(
            TOKEN_URI,
            "grant_type=password&username=root&password=s3cret&client_id=admin-cli",
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["expires_in"], 5);
}

// --- auth ---

#[tokio::test]
async fn admin_routes_require_token() {
    let app = app();
    let resp = send(
        &app,
        Request::builder()
            .uri("/admin/realms/master/users")
            .body(String::new())
            .unwrap(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = send(&app, authed("GET", "/admin/realms/master/users", "forged", None)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_realm_returns_404() {
    let app = app();
    let token = login(&app).await;
    let resp = send(&app, authed("GET", "/admin/realms/nowhere/groups", &token, None)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- users ---

#[tokio::test]
async fn user_lifecycle() {
    let app = app();
    let token = login(&app).await;

    let resp = send(
        &app,
        authed(
            "POST",
            "/admin/realms/master/users",
            &token,
            Some(r#"{"username":"Test01","email":"test01@example.com","enabled":true,"credentials":[{"type":"password","value":"pw","temporary":false}]}"#),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert!(resp.headers().get(http::header::CONTENT_TYPE).is_none());
    assert!(body_bytes(resp).await.is_empty());

    let resp = send(
        &app,
        authed(
            "POST",
            "/admin/realms/master/users",
            &token,
            Some(r#"{"username":"test01"}"#),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = send(
        &app,
        authed("GET", "/admin/realms/master/users?username=test01&exact=true", &token, None),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let users: Vec<User> = body_json(resp).await;
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].username, "test01");
    let id = users[0].id;

    let resp = send(
        &app,
        authed(
            "PUT",
            &format!("/admin/realms/master/users/{id}"),
            &token,
            Some(r#"{"firstName":"Demo"}"#),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = send(&app, authed("GET", &format!("/admin/realms/master/users/{id}"), &token, None)).await;
    let user: User = body_json(resp).await;
    assert_eq!(user.first_name.as_deref(), Some("Demo"));

    let resp = send(&app, authed("DELETE", &format!("/admin/realms/master/users/{id}"), &token, None)).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = send(&app, authed("GET", &format!("/admin/realms/master/users/{id}"), &token, None)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn user_list_honours_paging() {
    let app = app();
    let token = login(&app).await;
    for name in ["alpha", "beta", "gamma"] {
        let body = format!(r#"{{"username":"{name}"}}"#);
        let resp = send(&app, authed("POST", "/admin/realms/master/users", &token, Some(&body))).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let resp = send(&app, authed("GET", "/admin/realms/master/users?first=1&max=1", &token, None)).await;
    let users: Vec<User> = body_json(resp).await;
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].username, "beta");
}

// --- groups ---

#[tokio::test]
async fn group_tree_search_and_delete() {
    let app = app();
    let token = login(&app).await;

    for name in ["UnitTest01", "UnitTest02"] {
        let body = format!(r#"{{"name":"{name}"}}"#);
        let resp = send(&app, authed("POST", "/admin/realms/master/groups", &token, Some(&body))).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let resp = send(
        &app,
        authed("POST", "/admin/realms/master/groups", &token, Some(r#"{"name":"UnitTest01"}"#)),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = send(
        &app,
        authed("GET", "/admin/realms/master/groups?search=UnitTest02&exact=true", &token, None),
    )
    .await;
    let groups: Vec<Group> = body_json(resp).await;
    let parent_id = groups[0].id.clone();

    let resp = send(
        &app,
        authed(
            "POST",
            &format!("/admin/realms/master/groups/{parent_id}/children"),
            &token,
            Some(r#"{"name":"UnitTest03"}"#),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = send(&app, authed("GET", "/admin/realms/master/groups/count", &token, None)).await;
    let count: Value = body_json(resp).await;
    assert_eq!(count["count"], 2);

    let resp = send(
        &app,
        authed("GET", "/admin/realms/master/groups?search=UnitTest03&exact=true", &token, None),
    )
    .await;
    let groups: Vec<Group> = body_json(resp).await;
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].id, parent_id);
    assert_eq!(groups[0].sub_groups[0].path, "/UnitTest02/UnitTest03");

    let resp = send(
        &app,
        authed("GET", "/admin/realms/master/groups?search=UnitTest&exact=true", &token, None),
    )
    .await;
    let groups: Vec<Group> = body_json(resp).await;
    assert!(groups.is_empty());

    let resp = send(
        &app,
        authed("DELETE", &format!("/admin/realms/master/groups/{parent_id}"), &token, None),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = send(
        &app,
        authed("DELETE", &format!("/admin/realms/master/groups/{parent_id}"), &token, None),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- roles ---

#[tokio::test]
async fn role_lifecycle() {
    let app = app();
    let token = login(&app).await;

    let resp = send(
        &app,
        authed(
            "POST",
            "/admin/realms/master/roles",
            &token,
            Some(r#"{"name":"UnitTest01","description":"unit","attributes":{"team":["core"]}}"#),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = send(
        &app,
        authed("POST", "/admin/realms/master/roles", &token, Some(r#"{"name":"UnitTest01"}"#)),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = send(&app, authed("GET", "/admin/realms/master/roles?search=unittest", &token, None)).await;
    let roles: Vec<Role> = body_json(resp).await;
    assert_eq!(roles.len(), 1);

    let resp = send(&app, authed("GET", "/admin/realms/master/roles/UnitTest01", &token, None)).await;
    let role: Role = body_json(resp).await;
    assert_eq!(role.container_id, "master");
    assert_eq!(role.attributes["team"], vec!["core".to_string()]);

    let resp = send(&app, authed("DELETE", "/admin/realms/master/roles/UnitTest01", &token, None)).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = send(&app, authed("GET", "/admin/realms/master/roles/UnitTest01", &token, None)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
