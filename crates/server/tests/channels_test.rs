mod common;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::json;

use common::auth_header;
use huddle_shared::constants::MAX_CHANNEL_DEPTH;

async fn setup() -> (TestServer, sqlx::SqlitePool) {
    let pool = common::setup_test_db().await;
    let app = common::create_test_app(pool.clone());
    let server = TestServer::new(app).unwrap();
    (server, pool)
}

async fn channel_exists(pool: &sqlx::SqlitePool, id: &str) -> bool {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM channels WHERE id = ?")
        .bind(id)
        .fetch_one(pool)
        .await
        .unwrap()
        > 0
}

async fn channel_row(pool: &sqlx::SqlitePool, id: &str) -> (String, Option<String>) {
    sqlx::query_as::<_, (String, Option<String>)>("SELECT name, parent_id FROM channels WHERE id = ?")
        .bind(id)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn create_channel_returns_created() {
    let (server, pool) = setup().await;
    let (alice_id, alice_token) = common::create_test_user(&pool, "alice@test.com", "alice").await;
    let ws = common::create_workspace(&pool, &alice_id, "Acme").await;

    let (h, v) = auth_header(&alice_token);
    let res = server
        .post("/api/channels")
        .add_header(h, v)
        .json(&json!({ "workspaceId": ws, "name": "general", "description": "Chatter" }))
        .await;

    res.assert_status(StatusCode::CREATED);
    let body: serde_json::Value = res.json();
    assert_eq!(body["name"], "general");
    assert_eq!(body["creatorId"], alice_id.as_str());
    assert_eq!(body["parentId"], serde_json::Value::Null);

    // Creator is recorded as a member
    let members = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM channel_members WHERE channel_id = ? AND user_id = ?",
    )
    .bind(body["id"].as_str().unwrap())
    .bind(&alice_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(members, 1);
}

#[tokio::test]
async fn create_channel_requires_name_and_workspace() {
    let (server, pool) = setup().await;
    let (alice_id, alice_token) = common::create_test_user(&pool, "alice@test.com", "alice").await;
    let ws = common::create_workspace(&pool, &alice_id, "Acme").await;

    let (h, v) = auth_header(&alice_token);
    server
        .post("/api/channels")
        .add_header(h, v)
        .json(&json!({ "workspaceId": ws }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let (h, v) = auth_header(&alice_token);
    server
        .post("/api/channels")
        .add_header(h, v)
        .json(&json!({ "name": "general" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let (h, v) = auth_header(&alice_token);
    server
        .post("/api/channels")
        .add_header(h, v)
        .json(&json!({ "workspaceId": ws, "name": "Bad Name!" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_channel_requires_membership() {
    let (server, pool) = setup().await;
    let (alice_id, _) = common::create_test_user(&pool, "alice@test.com", "alice").await;
    let (_, mallory_token) = common::create_test_user(&pool, "mallory@test.com", "mallory").await;
    let ws = common::create_workspace(&pool, &alice_id, "Acme").await;

    let (h, v) = auth_header(&mallory_token);
    server
        .post("/api/channels")
        .add_header(h, v)
        .json(&json!({ "workspaceId": ws, "name": "general" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unauthenticated_requests_are_rejected() {
    let (server, _pool) = setup().await;
    server
        .get("/api/workspaces/anything/channels")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn parent_must_be_in_same_workspace() {
    let (server, pool) = setup().await;
    let (alice_id, alice_token) = common::create_test_user(&pool, "alice@test.com", "alice").await;
    let ws1 = common::create_workspace(&pool, &alice_id, "One").await;
    let ws2 = common::create_workspace(&pool, &alice_id, "Two").await;
    let foreign = common::create_channel(&pool, &ws2, &alice_id, "elsewhere", None, 0).await;

    let (h, v) = auth_header(&alice_token);
    let res = server
        .post("/api/channels")
        .add_header(h, v)
        .json(&json!({ "workspaceId": ws1, "name": "child", "parentId": foreign }))
        .await;
    res.assert_status(StatusCode::BAD_REQUEST);

    let (h, v) = auth_header(&alice_token);
    server
        .post("/api/channels")
        .add_header(h, v)
        .json(&json!({ "workspaceId": ws1, "name": "child", "parentId": "no-such-channel" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_channels_in_creation_order() {
    let (server, pool) = setup().await;
    let (alice_id, alice_token) = common::create_test_user(&pool, "alice@test.com", "alice").await;
    let ws = common::create_workspace(&pool, &alice_id, "Acme").await;
    common::create_channel(&pool, &ws, &alice_id, "general", None, 0).await;
    common::create_channel(&pool, &ws, &alice_id, "random", None, 1).await;

    let (h, v) = auth_header(&alice_token);
    let res = server
        .get(&format!("/api/workspaces/{}/channels", ws))
        .add_header(h, v)
        .await;

    res.assert_status_ok();
    let body: Vec<serde_json::Value> = res.json();
    let names: Vec<&str> = body.iter().map(|c| c["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["general", "random"]);
}

#[tokio::test]
async fn tree_nests_children_and_promotes_hidden_parents() {
    let (server, pool) = setup().await;
    let (alice_id, alice_token) = common::create_test_user(&pool, "alice@test.com", "alice").await;
    let (bob_id, bob_token) = common::create_test_user(&pool, "bob@test.com", "bob").await;
    let ws = common::create_workspace(&pool, &alice_id, "Acme").await;
    common::add_workspace_member(&pool, &ws, &bob_id, "member").await;

    let eng = common::create_channel(&pool, &ws, &alice_id, "eng", None, 0).await;
    let backend = common::create_channel(&pool, &ws, &alice_id, "backend", Some(eng.as_str()), 1).await;
    common::create_channel(&pool, &ws, &alice_id, "db", Some(backend.as_str()), 2).await;
    common::create_channel(&pool, &ws, &alice_id, "random", None, 3).await;

    let (h, v) = auth_header(&alice_token);
    let res = server
        .get(&format!("/api/workspaces/{}/channels/tree", ws))
        .add_header(h, v)
        .await;
    res.assert_status_ok();
    let tree: Vec<serde_json::Value> = res.json();
    assert_eq!(tree.len(), 2);
    assert_eq!(tree[0]["channel"]["name"], "eng");
    assert_eq!(tree[0]["level"], 0);
    assert_eq!(tree[0]["children"][0]["channel"]["name"], "backend");
    assert_eq!(tree[0]["children"][0]["level"], 1);
    assert_eq!(tree[0]["children"][0]["children"][0]["channel"]["name"], "db");
    assert_eq!(tree[0]["children"][0]["children"][0]["level"], 2);
    assert_eq!(tree[1]["channel"]["name"], "random");

    // A private parent Bob cannot see leaves its child as a root for him
    sqlx::query("UPDATE channels SET is_private = 1 WHERE id = ?")
        .bind(&eng)
        .execute(&pool)
        .await
        .unwrap();

    let (h, v) = auth_header(&bob_token);
    let res = server
        .get(&format!("/api/workspaces/{}/channels/tree", ws))
        .add_header(h, v)
        .await;
    res.assert_status_ok();
    let tree: Vec<serde_json::Value> = res.json();
    let roots: Vec<&str> = tree
        .iter()
        .map(|n| n["channel"]["name"].as_str().unwrap())
        .collect();
    assert_eq!(roots, vec!["backend", "random"]);
    assert_eq!(tree[0]["children"][0]["channel"]["name"], "db");
}

#[tokio::test]
async fn rename_and_move_to_root() {
    let (server, pool) = setup().await;
    let (alice_id, alice_token) = common::create_test_user(&pool, "alice@test.com", "alice").await;
    let ws = common::create_workspace(&pool, &alice_id, "Acme").await;
    let parent = common::create_channel(&pool, &ws, &alice_id, "parent", None, 0).await;
    let child = common::create_channel(&pool, &ws, &alice_id, "child", Some(parent.as_str()), 1).await;

    let (h, v) = auth_header(&alice_token);
    let res = server
        .patch(&format!("/api/channels/{}", child))
        .add_header(h, v)
        .json(&json!({ "name": "renamed", "parentId": null }))
        .await;

    res.assert_status_ok();
    let body: serde_json::Value = res.json();
    assert_eq!(body["name"], "renamed");
    assert_eq!(body["parentId"], serde_json::Value::Null);

    let (h, v) = auth_header(&alice_token);
    let tree: Vec<serde_json::Value> = server
        .get(&format!("/api/workspaces/{}/channels/tree", ws))
        .add_header(h, v)
        .await
        .json();
    assert_eq!(tree.len(), 2);
    assert!(tree[0]["children"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn empty_update_is_rejected() {
    let (server, pool) = setup().await;
    let (alice_id, alice_token) = common::create_test_user(&pool, "alice@test.com", "alice").await;
    let ws = common::create_workspace(&pool, &alice_id, "Acme").await;
    let channel = common::create_channel(&pool, &ws, &alice_id, "general", None, 0).await;

    let (h, v) = auth_header(&alice_token);
    server
        .patch(&format!("/api/channels/{}", channel))
        .add_header(h, v)
        .json(&json!({}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reparent_under_descendant_is_rejected() {
    let (server, pool) = setup().await;
    let (alice_id, alice_token) = common::create_test_user(&pool, "alice@test.com", "alice").await;
    let ws = common::create_workspace(&pool, &alice_id, "Acme").await;
    let a = common::create_channel(&pool, &ws, &alice_id, "a", None, 0).await;
    let b = common::create_channel(&pool, &ws, &alice_id, "b", Some(a.as_str()), 1).await;
    let c = common::create_channel(&pool, &ws, &alice_id, "c", Some(b.as_str()), 2).await;

    let (h, v) = auth_header(&alice_token);
    server
        .patch(&format!("/api/channels/{}", a))
        .add_header(h, v)
        .json(&json!({ "parentId": c }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let (h, v) = auth_header(&alice_token);
    server
        .patch(&format!("/api/channels/{}", a))
        .add_header(h, v)
        .json(&json!({ "parentId": a }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let parent = sqlx::query_scalar::<_, Option<String>>("SELECT parent_id FROM channels WHERE id = ?")
        .bind(&a)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(parent, None);
}

#[tokio::test]
async fn rejected_move_leaves_name_untouched() {
    let (server, pool) = setup().await;
    let (alice_id, alice_token) = common::create_test_user(&pool, "alice@test.com", "alice").await;
    let ws = common::create_workspace(&pool, &alice_id, "Acme").await;
    let other_ws = common::create_workspace(&pool, &alice_id, "Other").await;
    let a = common::create_channel(&pool, &ws, &alice_id, "a", None, 0).await;
    let b = common::create_channel(&pool, &ws, &alice_id, "b", Some(a.as_str()), 1).await;
    let foreign = common::create_channel(&pool, &other_ws, &alice_id, "foreign", None, 2).await;

    for parent in [b.as_str(), foreign.as_str(), "no-such-channel"] {
        let (h, v) = auth_header(&alice_token);
        server
            .patch(&format!("/api/channels/{}", a))
            .add_header(h, v)
            .json(&json!({ "name": "renamed", "parentId": parent }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    assert_eq!(channel_row(&pool, &a).await, ("a".to_string(), None));
}

#[tokio::test]
async fn rename_and_move_apply_together() {
    let (server, pool) = setup().await;
    let (alice_id, alice_token) = common::create_test_user(&pool, "alice@test.com", "alice").await;
    let ws = common::create_workspace(&pool, &alice_id, "Acme").await;
    let parent = common::create_channel(&pool, &ws, &alice_id, "parent", None, 0).await;
    let loose = common::create_channel(&pool, &ws, &alice_id, "loose", None, 1).await;

    let (h, v) = auth_header(&alice_token);
    let res = server
        .patch(&format!("/api/channels/{}", loose))
        .add_header(h, v)
        .json(&json!({ "name": "nested", "parentId": parent }))
        .await;
    res.assert_status_ok();
    let body: serde_json::Value = res.json();
    assert_eq!(body["name"], "nested");
    assert_eq!(body["parentId"], parent.as_str());
}

/// Chain of `levels` channels, root first.
async fn channel_chain(pool: &sqlx::SqlitePool, ws: &str, owner: &str, levels: usize) -> Vec<String> {
    let mut chain: Vec<String> = Vec::new();
    for i in 0..levels {
        let parent = chain.last().map(String::as_str);
        let id = common::create_channel(pool, ws, owner, &format!("level-{}", i), parent, i as i64).await;
        chain.push(id);
    }
    chain
}

#[tokio::test]
async fn create_beyond_max_depth_is_rejected() {
    let (server, pool) = setup().await;
    let (alice_id, alice_token) = common::create_test_user(&pool, "alice@test.com", "alice").await;
    let ws = common::create_workspace(&pool, &alice_id, "Acme").await;
    let chain = channel_chain(&pool, &ws, &alice_id, MAX_CHANNEL_DEPTH).await;

    let (h, v) = auth_header(&alice_token);
    let res = server
        .post("/api/channels")
        .add_header(h, v)
        .json(&json!({ "workspaceId": ws, "name": "too-deep", "parentId": chain[MAX_CHANNEL_DEPTH - 1] }))
        .await;
    res.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json();
    assert!(body["error"].as_str().unwrap().contains("nested"));

    let (h, v) = auth_header(&alice_token);
    server
        .post("/api/channels")
        .add_header(h, v)
        .json(&json!({ "workspaceId": ws, "name": "deepest", "parentId": chain[MAX_CHANNEL_DEPTH - 2] }))
        .await
        .assert_status(StatusCode::CREATED);
}

#[tokio::test]
async fn move_counts_the_moved_subtree_against_max_depth() {
    let (server, pool) = setup().await;
    let (alice_id, alice_token) = common::create_test_user(&pool, "alice@test.com", "alice").await;
    let ws = common::create_workspace(&pool, &alice_id, "Acme").await;
    let chain = channel_chain(&pool, &ws, &alice_id, MAX_CHANNEL_DEPTH - 1).await;
    let deepest = &chain[MAX_CHANNEL_DEPTH - 2];

    let branch = common::create_channel(&pool, &ws, &alice_id, "branch", None, 100).await;
    common::create_channel(&pool, &ws, &alice_id, "leaf", Some(branch.as_str()), 101).await;
    let single = common::create_channel(&pool, &ws, &alice_id, "single", None, 102).await;

    let (h, v) = auth_header(&alice_token);
    server
        .patch(&format!("/api/channels/{}", branch))
        .add_header(h, v)
        .json(&json!({ "parentId": deepest }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(channel_row(&pool, &branch).await.1, None);

    let (h, v) = auth_header(&alice_token);
    server
        .patch(&format!("/api/channels/{}", single))
        .add_header(h, v)
        .json(&json!({ "parentId": deepest }))
        .await
        .assert_status_ok();
    assert_eq!(channel_row(&pool, &single).await.1.as_deref(), Some(deepest.as_str()));
}

#[tokio::test]
async fn non_owner_move_is_forbidden_before_parent_checks() {
    let (server, pool) = setup().await;
    let (alice_id, _) = common::create_test_user(&pool, "alice@test.com", "alice").await;
    let (bob_id, bob_token) = common::create_test_user(&pool, "bob@test.com", "bob").await;
    let ws = common::create_workspace(&pool, &alice_id, "Acme").await;
    common::add_workspace_member(&pool, &ws, &bob_id, "member").await;
    let a = common::create_channel(&pool, &ws, &alice_id, "a", None, 0).await;
    let b = common::create_channel(&pool, &ws, &alice_id, "b", Some(a.as_str()), 1).await;

    for parent in [b.as_str(), a.as_str(), "no-such-channel"] {
        let (h, v) = auth_header(&bob_token);
        server
            .patch(&format!("/api/channels/{}", a))
            .add_header(h, v)
            .json(&json!({ "parentId": parent }))
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }
}

#[tokio::test]
async fn non_owner_cannot_modify_or_delete() {
    let (server, pool) = setup().await;
    let (alice_id, _) = common::create_test_user(&pool, "alice@test.com", "alice").await;
    let (bob_id, bob_token) = common::create_test_user(&pool, "bob@test.com", "bob").await;
    let ws = common::create_workspace(&pool, &alice_id, "Acme").await;
    common::add_workspace_member(&pool, &ws, &bob_id, "member").await;
    let channel = common::create_channel(&pool, &ws, &alice_id, "general", None, 0).await;

    let (h, v) = auth_header(&bob_token);
    let res = server
        .delete(&format!("/api/channels/{}", channel))
        .add_header(h, v)
        .await;
    res.assert_status(StatusCode::FORBIDDEN);
    let body: serde_json::Value = res.json();
    assert!(body["error"].as_str().unwrap().contains("owner"));
    assert!(channel_exists(&pool, &channel).await);

    let (h, v) = auth_header(&bob_token);
    server
        .patch(&format!("/api/channels/{}", channel))
        .add_header(h, v)
        .json(&json!({ "name": "hijacked" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn delete_unknown_channel_is_not_found() {
    let (server, pool) = setup().await;
    let (_, alice_token) = common::create_test_user(&pool, "alice@test.com", "alice").await;

    let (h, v) = auth_header(&alice_token);
    server
        .delete("/api/channels/does-not-exist")
        .add_header(h, v)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn owner_delete_cascades_to_descendants() {
    let (server, pool) = setup().await;
    let (alice_id, alice_token) = common::create_test_user(&pool, "alice@test.com", "alice").await;
    let ws = common::create_workspace(&pool, &alice_id, "Acme").await;
    let parent = common::create_channel(&pool, &ws, &alice_id, "parent", None, 0).await;
    let child = common::create_channel(&pool, &ws, &alice_id, "child", Some(parent.as_str()), 1).await;
    let grandchild = common::create_channel(&pool, &ws, &alice_id, "grandchild", Some(child.as_str()), 2).await;
    let sibling = common::create_channel(&pool, &ws, &alice_id, "sibling", None, 3).await;
    common::create_message(&pool, &child, &alice_id, "hello", &chrono::Utc::now().to_rfc3339()).await;

    let (h, v) = auth_header(&alice_token);
    server
        .delete(&format!("/api/channels/{}", parent))
        .add_header(h, v)
        .await
        .assert_status(StatusCode::NO_CONTENT);

    assert!(!channel_exists(&pool, &parent).await);
    assert!(!channel_exists(&pool, &child).await);
    assert!(!channel_exists(&pool, &grandchild).await);
    assert!(channel_exists(&pool, &sibling).await);

    let messages = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM messages")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(messages, 0);
}
