use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{json, Value};

use tenantgate_api::config::ApiConfig;
use tenantgate_auth::AccessClaims;
use tenantgate_core::PrincipalId;

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Build app (same router as prod), but bind to an ephemeral port.
        let app = tenantgate_api::app::build_app(&ApiConfig::new(JWT_SECRET))
            .expect("failed to build app");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(sub: PrincipalId) -> String {
    let now = Utc::now();
    let claims = AccessClaims {
        sub,
        issued_at: now,
        expires_at: now + ChronoDuration::minutes(10),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

/// A caller with its own principal id and token.
struct Caller {
    id: PrincipalId,
    token: String,
}

impl Caller {
    fn new() -> Self {
        let id = PrincipalId::new();
        Self {
            id,
            token: mint_jwt(id),
        }
    }
}

async fn create_tenant(client: &reqwest::Client, srv: &TestServer, who: &Caller, name: &str, email: &str) -> Value {
    let res = client
        .post(srv.url("/tenants"))
        .bearer_auth(&who.token)
        .json(&json!({ "name": name, "email": email, "display_name": "Owner" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    res.json().await.unwrap()
}

async fn invite(client: &reqwest::Client, srv: &TestServer, who: &Caller, tenant_id: &str, body: Value) -> reqwest::Response {
    client
        .post(srv.url(&format!("/tenants/{tenant_id}/invitations")))
        .bearer_auth(&who.token)
        .json(&body)
        .send()
        .await
        .unwrap()
}

async fn accept(client: &reqwest::Client, srv: &TestServer, who: &Caller, token: &str, email: &str) -> reqwest::Response {
    client
        .post(srv.url("/accept-invite"))
        .bearer_auth(&who.token)
        .json(&json!({ "token": token, "email": email, "display_name": "Member" }))
        .send()
        .await
        .unwrap()
}

async fn allowed(client: &reqwest::Client, srv: &TestServer, who: &Caller, module: &str, action: &str) -> bool {
    let res = client
        .get(srv.url(&format!("/authz/check?module={module}&action={action}")))
        .bearer_auth(&who.token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    body["allowed"].as_bool().unwrap()
}

fn token_from_link(link: &str) -> String {
    link.split("token=").nth(1).expect("link carries a token").to_string()
}

#[tokio::test]
async fn health_and_screens_are_public() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client.get(srv.url("/screens")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    let modes: Vec<&str> = body["modes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["mode"].as_str().unwrap())
        .collect();
    assert_eq!(modes, vec!["workspace", "studio"]);
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/authz/roles")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .get(srv.url("/authz/roles"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn signup_is_idempotent_and_owner_bypasses() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let alice = Caller::new();

    let created = create_tenant(&client, &srv, &alice, "Acme", "alice@acme.com").await;
    assert_eq!(created["tenant"]["slug"], "acme");

    let res = client
        .post(srv.url("/tenants"))
        .bearer_auth(&alice.token)
        .json(&json!({ "name": "Acme", "email": "alice@acme.com", "display_name": "Alice" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let again: Value = res.json().await.unwrap();
    assert_eq!(again["tenant"]["id"], created["tenant"]["id"]);

    assert!(allowed(&client, &srv, &alice, "finance", "edit").await);
    assert!(allowed(&client, &srv, &alice, "anything", "at_all").await);

    let res = client
        .get(srv.url("/authz/roles"))
        .bearer_auth(&alice.token)
        .send()
        .await
        .unwrap();
    let roles: Value = res.json().await.unwrap();
    assert_eq!(roles["is_owner"], true);
    assert!(roles["roles"].as_array().unwrap().iter().any(|r| r == "owner"));
}

#[tokio::test]
async fn invite_redeem_and_edit_access() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let alice = Caller::new();
    let bob = Caller::new();

    let created = create_tenant(&client, &srv, &alice, "Acme", "alice@acme.com").await;
    let tenant_id = created["tenant"]["id"].as_str().unwrap().to_string();

    let res = invite(
        &client,
        &srv,
        &alice,
        &tenant_id,
        json!({ "email": "bob@x.com", "access": { "kind": "custom_access", "screens": ["calendar-view"] } }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let issued: Value = res.json().await.unwrap();
    let link = issued["link"].as_str().unwrap();
    assert!(link.starts_with("http://localhost:8080/accept-invite?token="));
    let token = token_from_link(link);

    let res = accept(&client, &srv, &bob, &token, "bob@x.com").await;
    assert_eq!(res.status(), StatusCode::OK);
    let redeemed: Value = res.json().await.unwrap();
    assert_eq!(redeemed["tenant_id"].as_str().unwrap(), tenant_id);
    let role_id = redeemed["role_id"].clone();

    assert!(allowed(&client, &srv, &bob, "calendar", "view").await);
    assert!(!allowed(&client, &srv, &bob, "finance", "edit").await);

    // Second redemption of the same link.
    let carol = Caller::new();
    let res = accept(&client, &srv, &carol, &token, "bob@x.com").await;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = client
        .put(srv.url(&format!("/members/{}/access", bob.id)))
        .bearer_auth(&alice.token)
        .json(&json!({ "access": { "kind": "custom_access", "screens": ["calendar-view", "calendar-manage"] } }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let change: Value = res.json().await.unwrap();
    assert_eq!(change["role_id"], role_id);
    assert_eq!(change["in_place"], true);
    assert_eq!(change["permissions"].as_array().unwrap().len(), 2);
    assert!(allowed(&client, &srv, &bob, "calendar", "manage").await);

    // Bob lacks team.manage: indistinguishable from a missing tenant.
    let res = invite(
        &client,
        &srv,
        &bob,
        &tenant_id,
        json!({ "email": "eve@x.com", "access": { "kind": "full_access" } }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn empty_selection_is_a_validation_error() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let alice = Caller::new();

    let created = create_tenant(&client, &srv, &alice, "Acme", "alice@acme.com").await;
    let tenant_id = created["tenant"]["id"].as_str().unwrap().to_string();

    let res = invite(
        &client,
        &srv,
        &alice,
        &tenant_id,
        json!({ "email": "bob@x.com", "access": { "kind": "custom_access", "screens": [] } }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn tenant_isolation_hides_other_tenants() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let alice = Caller::new();
    let zed = Caller::new();

    let acme = create_tenant(&client, &srv, &alice, "Acme", "alice@acme.com").await;
    create_tenant(&client, &srv, &zed, "Globex", "zed@globex.com").await;
    let acme_id = acme["tenant"]["id"].as_str().unwrap().to_string();

    let res = client
        .get(srv.url(&format!("/tenants/{acme_id}/config")))
        .bearer_auth(&alice.token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(srv.url(&format!("/tenants/{acme_id}/config")))
        .bearer_auth(&zed.token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .patch(srv.url(&format!("/tenants/{acme_id}/config")))
        .bearer_auth(&zed.token)
        .json(&json!({ "feature_flags": { "chat": true } }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .get(srv.url("/tenants/not-a-uuid/config"))
        .bearer_auth(&zed.token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cancelled_invitations_cannot_be_redeemed() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let alice = Caller::new();
    let bob = Caller::new();

    let created = create_tenant(&client, &srv, &alice, "Acme", "alice@acme.com").await;
    let tenant_id = created["tenant"]["id"].as_str().unwrap().to_string();

    let res = invite(
        &client,
        &srv,
        &alice,
        &tenant_id,
        json!({ "email": "bob@x.com", "access": { "kind": "full_access" } }),
    )
    .await;
    let issued: Value = res.json().await.unwrap();
    let invitation_id = issued["invitation_id"].as_str().unwrap();

    let res = client
        .delete(srv.url(&format!("/invitations/{invitation_id}")))
        .bearer_auth(&alice.token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let token = token_from_link(issued["link"].as_str().unwrap());
    let res = accept(&client, &srv, &bob, &token, "bob@x.com").await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
}
