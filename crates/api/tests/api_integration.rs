//! API integration tests.
//!
//! These tests drive the router end-to-end against a mock database.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header::CONTENT_TYPE},
};
use chrono::Utc;
use futo_api::{AppState, router as api_router};
use futo_common::NoopMediaStorage;
use futo_core::{CommentService, LikeService, PostService};
use futo_db::entities::{comment, like, post};
use futo_db::repositories::{CommentRepository, LikeRepository, PostRepository};
use maplit::btreemap;
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult, Value};
use tower::ServiceExt;
use url::Url;

fn create_test_post(id: i64, slug: &str, image: Option<&str>) -> post::Model {
    post::Model {
        id,
        author_id: None,
        title: "Hello World".to_string(),
        subtitle: Some("A subtitle".to_string()),
        content: "Body text".to_string(),
        image: image.map(ToString::to_string),
        slug: slug.to_string(),
        created_at: Utc::now().into(),
        updated_at: Utc::now().into(),
    }
}

fn create_test_comment(id: i64, post_id: i64, parent_id: Option<i64>) -> comment::Model {
    comment::Model {
        id,
        post_id,
        parent_id,
        name: format!("visitor-{id}"),
        email: None,
        content: "Nice post".to_string(),
        created_at: Utc::now().into(),
        is_active: true,
    }
}

fn create_test_like(id: i64, post_id: i64, visitor_id: &str) -> like::Model {
    like::Model {
        id,
        post_id,
        visitor_id: visitor_id.to_string(),
        created_at: Utc::now().into(),
    }
}

/// Build the app router over a mock database connection.
fn test_app(db: DatabaseConnection) -> Router {
    let db = Arc::new(db);
    let post_repo = PostRepository::new(Arc::clone(&db));
    let comment_repo = CommentRepository::new(Arc::clone(&db));
    let like_repo = LikeRepository::new(Arc::clone(&db));

    let post_service = PostService::new(
        post_repo.clone(),
        comment_repo.clone(),
        like_repo.clone(),
        Arc::new(NoopMediaStorage),
        "futo_media/posts".to_string(),
    );
    let comment_service = CommentService::new(comment_repo, post_repo.clone());
    let like_service = LikeService::new(like_repo, post_repo);

    let state = AppState {
        post_service,
        comment_service,
        like_service,
        base_url: Url::parse("https://blog.example.com").unwrap(),
        cdn_host: "res.cloudinary.com".to_string(),
    };

    Router::new().nest("/api", api_router()).with_state(state)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_list_posts_with_counts_and_normalized_image() {
    let stored = "/media/https%3A//res.cloudinary.com/demo/image/upload/x.jpg";
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![create_test_post(1, "hello-world", Some(stored))]])
        // batched like counts
        .append_query_results([vec![btreemap! {
            "post_id" => Value::BigInt(Some(1)),
            "count" => Value::BigInt(Some(2)),
        }]])
        // batched active comment counts
        .append_query_results([vec![btreemap! {
            "post_id" => Value::BigInt(Some(1)),
            "count" => Value::BigInt(Some(1)),
        }]])
        .into_connection();

    let app = test_app(db);
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/posts")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let posts = json["data"].as_array().unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["slug"], "hello-world");
    assert_eq!(posts[0]["likes_count"], 2);
    assert_eq!(posts[0]["comments_count"], 1);
    assert_eq!(
        posts[0]["image_url"],
        "https://res.cloudinary.com/demo/image/upload/x.jpg"
    );
}

#[tokio::test]
async fn test_show_post_nests_comment_threads() {
    let post = create_test_post(1, "hello-world", None);
    let top = create_test_comment(1, 1, None);
    let reply = create_test_comment(2, 1, Some(1));

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![post.clone()]])
        // live like count
        .append_query_results([vec![btreemap! {
            "num_items" => Value::BigInt(Some(0)),
        }]])
        // live active comment count
        .append_query_results([vec![btreemap! {
            "num_items" => Value::BigInt(Some(2)),
        }]])
        // comment listing re-resolves the post by slug
        .append_query_results([vec![post]])
        .append_query_results([vec![top, reply]])
        .into_connection();

    let app = test_app(db);
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/posts/hello-world")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let data = &json["data"];
    assert_eq!(data["comments_count"], 2);
    assert_eq!(data["image_url"], serde_json::Value::Null);
    let top_level = data["top_level_comments"].as_array().unwrap();
    assert_eq!(top_level.len(), 1);
    assert_eq!(top_level[0]["replies"][0]["id"], 2);
}

#[tokio::test]
async fn test_show_post_not_found() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<post::Model>::new()])
        .into_connection();

    let app = test_app(db);
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/posts/missing")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "POST_NOT_FOUND");
}

#[tokio::test]
async fn test_create_post_json() {
    let created = create_test_post(1, "hello-world", None);
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        // slug uniqueness probe
        .append_query_results([vec![btreemap! {
            "num_items" => Value::BigInt(Some(0)),
        }]])
        .append_query_results([vec![created]])
        .into_connection();

    let app = test_app(db);
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/posts")
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::json!({
                        "title": "Hello World",
                        "content": "Body text",
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["slug"], "hello-world");
    assert_eq!(json["data"]["likes_count"], 0);
}

#[tokio::test]
async fn test_create_post_requires_title() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

    let app = test_app(db);
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/posts")
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::json!({ "content": "Body text" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(json["error"]["field"], "title");
}

#[tokio::test]
async fn test_create_post_rejected_when_upload_hint_fails() {
    // NoopMediaStorage fails every upload; nothing must be persisted.
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

    let app = test_app(db);
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/posts")
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::json!({
                        "title": "Hello",
                        "content": "Body",
                        "image_url": "https://example.com/pic.jpg",
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["field"], "image_url");
}

#[tokio::test]
async fn test_create_reply_in_wrong_post_rejected() {
    let post = create_test_post(1, "hello-world", None);
    let foreign_parent = create_test_comment(5, 2, None);

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![post]])
        .append_query_results([vec![foreign_parent]])
        .into_connection();

    let app = test_app(db);
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/posts/hello-world/comments")
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::json!({
                        "name": "Visitor",
                        "content": "A reply",
                        "parent": 5,
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(json["error"]["field"], "parent");
}

#[tokio::test]
async fn test_create_comment() {
    let post = create_test_post(1, "hello-world", None);
    let created = create_test_comment(7, 1, None);

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![post]])
        .append_query_results([vec![created]])
        .into_connection();

    let app = test_app(db);
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/posts/hello-world/comments")
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::json!({
                        "name": "visitor-7",
                        "content": "Nice post",
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["id"], 7);
    assert_eq!(json["data"]["post"], 1);
}

#[tokio::test]
async fn test_toggle_like_creates() {
    let post = create_test_post(1, "hello-world", None);
    let created = create_test_like(1, 1, "visitor-a");

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![post]])
        .append_query_results([Vec::<like::Model>::new()])
        .append_query_results([vec![created]])
        .append_query_results([vec![btreemap! {
            "num_items" => Value::BigInt(Some(1)),
        }]])
        .into_connection();

    let app = test_app(db);
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/posts/hello-world/like")
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::json!({ "visitor_id": "visitor-a" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["liked"], true);
    assert_eq!(json["data"]["likes_count"], 1);
}

#[tokio::test]
async fn test_delete_post() {
    let post = create_test_post(1, "hello-world", None);

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![post]])
        .append_exec_results([MockExecResult {
            last_insert_id: 0,
            rows_affected: 1,
        }])
        .into_connection();

    let app = test_app(db);
    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/posts/hello-world")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
