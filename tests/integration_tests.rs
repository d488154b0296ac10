//! Integration tests for the Family Moments HTTP API
//!
//! These tests drive the complete router, envelope included, against a
//! temporary SQLite database and image directory.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use family_moments_server::{create_pool, db::users, router, run_migrations, AppState, Config};

const BOUNDARY: &str = "family-moments-test-boundary";
const CALLER_HEADER: &str = "x-user-id";

// =============================================================================
// Test Helpers
// =============================================================================

struct TestApp {
    app: Router,
    state: AppState,
    _temp_dir: TempDir,
}

/// Create a test configuration rooted in `temp_dir`
fn test_config(temp_dir: &TempDir) -> Config {
    Config {
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        database_url: format!("sqlite://{}", temp_dir.path().join("test.db").display()),
        allowed_origins: vec!["http://localhost:5173".to_string()],
        environment: "test".to_string(),
        upload_dir: temp_dir.path().join("images").display().to_string(),
        image_base_url: "http://localhost:8080/images".to_string(),
        max_image_bytes: 1024,
    }
}

async fn setup() -> TestApp {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&temp_dir);
    let pool = create_pool(&config.database_url).await.unwrap();
    run_migrations(&pool).await.unwrap();

    let state = AppState::new(pool, config);
    TestApp {
        app: router(state.clone()),
        state,
        _temp_dir: temp_dir,
    }
}

impl TestApp {
    async fn user(&self, nickname: &str) -> i64 {
        let mut conn = self.state.pool.acquire().await.unwrap();
        users::insert(&mut conn, nickname, None, Utc::now())
            .await
            .unwrap()
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        (status, body_to_json(response.into_body()).await)
    }

    /// Send a request whose response body is not JSON
    async fn send_raw(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, bytes.to_vec())
    }

    /// Create a family through the multipart endpoint and return its id
    async fn create_family(&self, owner: i64, name: &str) -> i64 {
        let form = multipart_body(
            "postFamilyReq",
            &json!({ "familyName": name, "uploadCycle": 7 }),
            Some(("image/png", &b"fake-png-bytes"[..])),
        );
        let (status, body) = self
            .send(make_multipart_request("POST", "/families/family", owner, form))
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body["result"]["familyId"].as_i64().unwrap()
    }
}

/// Parse response body as JSON
async fn body_to_json(body: Body) -> Value {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Build a multipart body with a JSON part and an optional `representImg` file
fn multipart_body(json_part: &str, json: &Value, image: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{json_part}\"\r\n\
             Content-Type: application/json\r\n\r\n{json}\r\n"
        )
        .as_bytes(),
    );
    if let Some((content_type, bytes)) = image {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"representImg\"; \
                 filename=\"family.png\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn make_multipart_request(method: &str, uri: &str, caller: i64, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(CALLER_HEADER, caller.to_string())
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn make_json_request(method: &str, uri: &str, caller: i64, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(CALLER_HEADER, caller.to_string())
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn make_request(method: &str, uri: &str, caller: i64) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(CALLER_HEADER, caller.to_string())
        .body(Body::empty())
        .unwrap()
}

// =============================================================================
// Health Check Tests
// =============================================================================

#[tokio::test]
async fn test_health_check_returns_healthy() {
    let app = setup().await;

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
}

// =============================================================================
// Envelope and identity
// =============================================================================

#[tokio::test]
async fn test_missing_caller_is_unauthorized() {
    let app = setup().await;

    let request = Request::builder()
        .uri("/families/myfamilies")
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["isSuccess"], false);
    assert_eq!(body["code"], 401);
}

#[tokio::test]
async fn test_unknown_family_uses_error_envelope() {
    let app = setup().await;

    let (status, body) = app.send(make_request("GET", "/families/999", 1)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["isSuccess"], false);
    assert_eq!(body["code"], 404);
    assert!(body.get("result").is_none());
}

#[tokio::test]
async fn test_non_numeric_family_id_is_bad_request() {
    let app = setup().await;

    let (status, body) = app.send(make_request("GET", "/families/abc", 1)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
}

// =============================================================================
// Family lifecycle
// =============================================================================

#[tokio::test]
async fn test_create_and_fetch_family() {
    let app = setup().await;
    let owner = app.user("molly").await;

    let form = multipart_body(
        "postFamilyReq",
        &json!({ "familyName": "Kims", "uploadCycle": 7 }),
        Some(("image/png", &b"fake-png-bytes"[..])),
    );
    let (status, body) = app
        .send(make_multipart_request("POST", "/families/family", owner, form))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isSuccess"], true);
    assert_eq!(body["code"], 200);
    assert_eq!(body["message"], "Request succeeded");
    assert_eq!(body["result"]["nickname"], "molly");
    let represent_img = body["result"]["representImg"].as_str().unwrap();
    assert!(represent_img.starts_with("http://localhost:8080/images/"));
    assert!(represent_img.ends_with(".png"));

    let family_id = body["result"]["familyId"].as_i64().unwrap();
    let invite_code = body["result"]["inviteCode"].as_str().unwrap().to_string();

    let (status, body) = app
        .send(make_request("GET", &format!("/families/{}", family_id), owner))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["familyName"], "Kims");
    assert_eq!(body["result"]["uploadCycle"], 7);
    assert_eq!(body["result"]["owner"], "molly");

    let (status, body) = app
        .send(make_json_request(
            "POST",
            "/families/inviteCode",
            owner,
            json!({ "inviteCode": invite_code }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["familyId"], family_id);
}

#[tokio::test]
async fn test_create_family_requires_image() {
    let app = setup().await;
    let owner = app.user("molly").await;

    let form = multipart_body(
        "postFamilyReq",
        &json!({ "familyName": "Kims", "uploadCycle": 7 }),
        None,
    );
    let (status, body) = app
        .send(make_multipart_request("POST", "/families/family", owner, form))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["isSuccess"], false);
}

#[tokio::test]
async fn test_create_family_rejects_oversized_image() {
    let app = setup().await;
    let owner = app.user("molly").await;

    let form = multipart_body(
        "postFamilyReq",
        &json!({ "familyName": "Kims", "uploadCycle": 7 }),
        Some(("image/png", &[0u8; 2048][..])),
    );
    let (status, _) = app
        .send(make_multipart_request("POST", "/families/family", owner, form))
        .await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_update_family_and_upload_cycle() {
    let app = setup().await;
    let owner = app.user("molly").await;
    let family_id = app.create_family(owner, "Kims").await;

    let form = multipart_body("familyUpdateReq", &json!({ "familyName": "Lees" }), None);
    let (status, body) = app
        .send(make_multipart_request(
            "PATCH",
            &format!("/families/{}/update", family_id),
            owner,
            form,
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["familyName"], "Lees");

    let (status, _) = app
        .send(make_request(
            "PATCH",
            &format!("/families/{}?uploadCycle=3", family_id),
            owner,
        ))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app
        .send(make_request(
            "GET",
            &format!("/families/{}/famillyName", family_id),
            owner,
        ))
        .await;
    assert_eq!(body["result"], "Lees");
}

#[tokio::test]
async fn test_delete_family() {
    let app = setup().await;
    let owner = app.user("molly").await;
    let family_id = app.create_family(owner, "Kims").await;

    let (status, _) = app
        .send(make_request("DELETE", &format!("/families/{}", family_id), owner))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .send(make_request("GET", &format!("/families/{}", family_id), owner))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Membership workflow
// =============================================================================

#[tokio::test]
async fn test_invite_accept_flow() {
    let app = setup().await;
    let owner = app.user("molly").await;
    let invitee = app.user("dan").await;
    let family_id = app.create_family(owner, "Kims").await;

    let (status, body) = app
        .send(make_request(
            "POST",
            &format!("/families/{}/invitations?userIds={}", family_id, invitee),
            owner,
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    // Inviting again while pending is refused
    let (status, _) = app
        .send(make_request(
            "POST",
            &format!("/families/{}/invitations?userIds={}", family_id, invitee),
            owner,
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(make_request(
            "PATCH",
            &format!("/families/{}/invitations/accept", family_id),
            invitee,
        ))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .send(make_request(
            "GET",
            &format!("/families/{}/users?includeSelf=false", family_id),
            invitee,
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    let members = body["result"].as_array().unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0]["userId"], owner);
    assert_eq!(members[0]["nickname"], "molly");

    let (_, body) = app
        .send(make_request("GET", "/families/myfamilies", invitee))
        .await;
    assert_eq!(body["result"]["count"], 1);
    assert_eq!(body["result"]["list"][0]["familyName"], "Kims");

    let (_, body) = app
        .send(make_request(
            "GET",
            &format!("/families/{}/created", family_id),
            invitee,
        ))
        .await;
    assert_eq!(body["result"]["nickname"], "dan");
}

#[tokio::test]
async fn test_invite_with_malformed_ids_is_bad_request() {
    let app = setup().await;
    let owner = app.user("molly").await;
    let family_id = app.create_family(owner, "Kims").await;

    let (status, _) = app
        .send(make_request(
            "POST",
            &format!("/families/{}/invitations?userIds=a,b", family_id),
            owner,
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(make_request(
            "POST",
            &format!("/families/{}/invitations", family_id),
            owner,
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_join_withdraw_and_emission() {
    let app = setup().await;
    let owner = app.user("molly").await;
    let m1 = app.user("dan").await;
    let m2 = app.user("eve").await;
    let family_id = app.create_family(owner, "Kims").await;

    for member in [m1, m2] {
        let (status, _) = app
            .send(make_request(
                "POST",
                &format!("/families/{}/join", family_id),
                member,
            ))
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, _) = app
        .send(make_request(
            "DELETE",
            &format!("/families/{}/withdraw", family_id),
            m1,
        ))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .send(make_request(
            "DELETE",
            &format!("/families/{}/withdraw", family_id),
            owner,
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(make_request(
            "DELETE",
            &format!("/families/{}/users?userIds={}", family_id, m2),
            owner,
        ))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app
        .send(make_request(
            "GET",
            &format!("/families/{}/users", family_id),
            owner,
        ))
        .await;
    assert_eq!(body["result"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_authority_transfer() {
    let app = setup().await;
    let owner = app.user("molly").await;
    let member = app.user("dan").await;
    let family_id = app.create_family(owner, "Kims").await;

    app.send(make_request(
        "POST",
        &format!("/families/{}/join", family_id),
        member,
    ))
    .await;

    let (_, body) = app
        .send(make_request(
            "GET",
            &format!("/families/{}/authority", family_id),
            member,
        ))
        .await;
    assert_eq!(body["result"]["isOwner"], false);

    let (status, _) = app
        .send(make_json_request(
            "PATCH",
            &format!("/families/{}/authority", family_id),
            owner,
            json!({ "userId": member }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app
        .send(make_request(
            "GET",
            &format!("/families/{}/authority", family_id),
            member,
        ))
        .await;
    assert_eq!(body["result"]["isOwner"], true);
}

#[tokio::test]
async fn test_stored_image_is_served() {
    let app = setup().await;
    let owner = app.user("molly").await;

    let form = multipart_body(
        "postFamilyReq",
        &json!({ "familyName": "Kims", "uploadCycle": 7 }),
        Some(("image/png", &b"fake-png-bytes"[..])),
    );
    let (status, body) = app
        .send(make_multipart_request("POST", "/families/family", owner, form))
        .await;
    assert_eq!(status, StatusCode::OK);

    let url = body["result"]["representImg"].as_str().unwrap();
    let path = url.strip_prefix("http://localhost:8080").unwrap();
    assert!(path.starts_with("/images/"));

    let request = Request::builder().uri(path).body(Body::empty()).unwrap();
    let (status, bytes) = app.send_raw(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bytes, b"fake-png-bytes");

    let request = Request::builder()
        .uri("/images/missing.png")
        .body(Body::empty())
        .unwrap();
    let (status, _) = app.send_raw(request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reject_invitation_route() {
    let app = setup().await;
    let owner = app.user("molly").await;
    let invitee = app.user("dan").await;
    let family_id = app.create_family(owner, "Kims").await;

    let (status, _) = app
        .send(make_request(
            "POST",
            &format!("/families/{}/invitations?userIds={}", family_id, invitee),
            owner,
        ))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .send(make_request(
            "PATCH",
            &format!("/families/{}/invitations/reject", family_id),
            invitee,
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isSuccess"], true);

    // Nothing pending any more
    let (status, body) = app
        .send(make_request(
            "PATCH",
            &format!("/families/{}/invitations/reject", family_id),
            invitee,
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 404);

    let (status, _) = app
        .send(make_request(
            "PATCH",
            &format!("/families/{}/invitations/accept", family_id),
            invitee,
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invite_code_lookup_errors() {
    let app = setup().await;
    let owner = app.user("molly").await;
    app.create_family(owner, "Kims").await;

    let (status, body) = app
        .send(make_json_request(
            "POST",
            "/families/inviteCode",
            owner,
            json!({ "inviteCode": "   " }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["isSuccess"], false);

    let (status, body) = app
        .send(make_json_request(
            "POST",
            "/families/inviteCode",
            owner,
            json!({ "inviteCode": "NOSUCHCODE" }),
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 404);
}

#[tokio::test]
async fn test_invite_with_repeated_user_ids_parameter() {
    let app = setup().await;
    let owner = app.user("molly").await;
    let u1 = app.user("dan").await;
    let u2 = app.user("eve").await;
    let family_id = app.create_family(owner, "Kims").await;

    let (status, body) = app
        .send(make_request(
            "POST",
            &format!(
                "/families/{}/invitations?userIds={}&userIds={}",
                family_id, u1, u2
            ),
            owner,
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    for invitee in [u1, u2] {
        let (status, _) = app
            .send(make_request(
                "PATCH",
                &format!("/families/{}/invitations/accept", family_id),
                invitee,
            ))
            .await;
        assert_eq!(status, StatusCode::OK);
    }
}

#[tokio::test]
async fn test_batch_limit_counts_distinct_users() {
    let app = setup().await;
    let owner = app.user("molly").await;
    let invitee = app.user("dan").await;
    let family_id = app.create_family(owner, "Kims").await;

    let repeated = vec![invitee.to_string(); 51].join(",");
    let (status, body) = app
        .send(make_request(
            "POST",
            &format!("/families/{}/invitations?userIds={}", family_id, repeated),
            owner,
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
}
