mod common;

use std::io::Cursor;

use axum::body::Body;
use axum::http::{Request, header};
use serde_json::json;

use common::{bearer, spawn_app, split};

#[tokio::test]
async fn health_and_public_listing() {
    let t = spawn_app(None);

    let (status, body) = t.get("/api/health", None).await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({ "status": "ok" }));

    let (status, body) = t.get("/api/categories", None).await;
    assert_eq!(status, 200);
    assert_eq!(body.as_array().unwrap().len(), 8);

    let (status, body) = t.get("/api/items", None).await;
    assert_eq!(status, 200);
    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 20);
    assert!(items.iter().all(|i| i["status"] == "active"));
    assert!(items[0]["seller"]["nickname"].is_string());
    assert!(items[0]["_count"]["likes"].is_number());

    let (_, body) = t.get("/api/items?limit=5&page=2", None).await;
    assert_eq!(body.as_array().unwrap().len(), 5);

    let (_, body) = t.get("/api/items?regionCode=%EB%9A%9D%EC%84%AC%EB%8F%99", None).await;
    let items = body.as_array().unwrap();
    assert!(!items.is_empty());
    assert!(items.iter().all(|i| i["regionCode"] == "뚝섬동"));
}

#[tokio::test]
async fn blank_listing_filters_are_ignored() {
    let t = spawn_app(None);

    let (status, body) = t.get("/api/items?categoryId=&page=&limit=&regionCode=", None).await;
    assert_eq!(status, 200);
    assert_eq!(body.as_array().unwrap().len(), 20);

    let (status, body) = t.get("/api/items?categoryId=&search=%EB%A7%A5%EB%B6%81", None).await;
    assert_eq!(status, 200);
    assert!(!body.as_array().unwrap().is_empty());

    let (status, body) = t.get("/api/items?categoryId=abc", None).await;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "Invalid query");
    assert_eq!(body["errors"][0]["field"], "categoryId");
}

#[tokio::test]
async fn malformed_requests_get_json_errors() {
    let t = spawn_app(None);

    let resp = t
        .send(Request::get("/api/items/abc").body(Body::empty()).unwrap())
        .await;
    assert_eq!(resp.status(), 400);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/json");
    let (_, body) = split(resp).await;
    assert!(body["message"].as_str().unwrap().contains("abc"));

    let (status, body) = t.post_json("/api/chats", Some("user2"), json!({ "itemId": 1 })).await;
    assert_eq!(status, 400);
    assert!(body["message"].as_str().unwrap().contains("sellerId"));

    let (status, body) = t.post_json("/api/likes/abc", Some("user2"), json!({})).await;
    assert_eq!(status, 400);
    assert!(body["message"].is_string());

    let req = Request::post("/api/chats/1/messages")
        .header(header::AUTHORIZATION, bearer("user2"))
        .body(Body::from("content=hi"))
        .unwrap();
    let (status, body) = split(t.send(req).await).await;
    assert_eq!(status, 400);
    assert!(body["message"].is_string());

    let req = Request::post("/api/items")
        .header(header::AUTHORIZATION, bearer("user1"))
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("title=x"))
        .unwrap();
    let (status, body) = split(t.send(req).await).await;
    assert_eq!(status, 400);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn protected_routes_need_credentials() {
    let t = spawn_app(None);

    let (status, body) = t.get("/api/likes", None).await;
    assert_eq!(status, 401);
    assert_eq!(body["message"], "Unauthorized");

    let req = Request::get("/api/chats")
        .header(header::AUTHORIZATION, "Bearer not-a-jwt")
        .body(Body::empty())
        .unwrap();
    let (status, _) = split(t.send(req).await).await;
    assert_eq!(status, 401);

    let (status, body) = t.get("/api/auth/user", Some("user1")).await;
    assert_eq!(status, 200);
    assert_eq!(body["id"], "user1");
    assert_eq!(body["nickname"], "김성수");
}

#[tokio::test]
async fn issued_token_authenticates() {
    let t = spawn_app(None);

    let (status, body) = t.post_json("/api/auth/token", Some("user2"), json!({})).await;
    assert_eq!(status, 200);
    let token = body["token"].as_str().unwrap();
    assert!(body["expiresAt"].is_string());

    let req = Request::get("/api/auth/user")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let (status, body) = split(t.send(req).await).await;
    assert_eq!(status, 200);
    assert_eq!(body["id"], "user2");
}

#[tokio::test]
async fn item_detail_counts_views_and_likes() {
    let t = spawn_app(None);

    let (status, body) = t.get("/api/items/1", None).await;
    assert_eq!(status, 200);
    assert_eq!(body["views"], 0);
    assert_eq!(body["isLiked"], false);

    let (_, body) = t.get("/api/items/1", None).await;
    assert_eq!(body["views"], 1);

    let (status, body) = t.post_json("/api/likes/1", Some("user2"), json!({})).await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({ "isLiked": true }));

    let (_, body) = t.get("/api/items/1", Some("user2")).await;
    assert_eq!(body["isLiked"], true);
    assert_eq!(body["_count"]["likes"], 1);

    let (_, body) = t.get("/api/likes", Some("user2")).await;
    let liked = body.as_array().unwrap();
    assert_eq!(liked.len(), 1);
    assert_eq!(liked[0]["id"], 1);

    let (_, body) = t.post_json("/api/likes/1", Some("user2"), json!({})).await;
    assert_eq!(body, json!({ "isLiked": false }));
    let (_, body) = t.get("/api/likes", Some("user2")).await;
    assert!(body.as_array().unwrap().is_empty());

    let (status, body) = t.get("/api/items/9999", None).await;
    assert_eq!(status, 404);
    assert_eq!(body["message"], "Item not found");

    let (status, _) = t.post_json("/api/likes/9999", Some("user2"), json!({})).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn categories_validate_and_reject_duplicates() {
    let t = spawn_app(None);

    let (status, body) = t
        .post_json("/api/categories", Some("user1"), json!({ "name": " ", "slug": "" }))
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "Invalid category data");
    assert_eq!(body["errors"].as_array().unwrap().len(), 2);

    let new = json!({ "name": "반려동물", "slug": "Pets" });
    let (status, body) = t.post_json("/api/categories", Some("user1"), new.clone()).await;
    assert_eq!(status, 201);
    assert_eq!(body["slug"], "pets");

    let (status, _) = t.post_json("/api/categories", Some("user1"), new).await;
    assert_eq!(status, 409);

    let (status, _) = t
        .post_json("/api/categories", None, json!({ "name": "x", "slug": "x" }))
        .await;
    assert_eq!(status, 401);
}

#[tokio::test]
async fn chat_lifecycle() {
    let t = spawn_app(None);
    let open = json!({ "itemId": 1, "sellerId": "user1" });

    let (status, chat) = t.post_json("/api/chats", Some("user2"), open.clone()).await;
    assert_eq!(status, 200);
    assert_eq!(chat["buyerId"], "user2");
    let chat_id = chat["id"].as_i64().unwrap();

    let (_, again) = t.post_json("/api/chats", Some("user2"), open.clone()).await;
    assert_eq!(again["id"], chat_id);

    let (status, _) = t.post_json("/api/chats", Some("user1"), open).await;
    assert_eq!(status, 400);

    let (status, _) = t
        .post_json("/api/chats", Some("user2"), json!({ "itemId": 1, "sellerId": "user3" }))
        .await;
    assert_eq!(status, 404);
    let (status, _) = t
        .post_json("/api/chats", Some("user2"), json!({ "itemId": 9999, "sellerId": "user1" }))
        .await;
    assert_eq!(status, 404);

    let uri = format!("/api/chats/{chat_id}/messages");
    let (status, message) = t
        .post_json(&uri, Some("user2"), json!({ "content": "아직 판매 중인가요?" }))
        .await;
    assert_eq!(status, 201);
    assert_eq!(message["senderId"], "user2");
    assert_eq!(message["messageType"], "text");

    let (status, body) = t.post_json(&uri, Some("user2"), json!({ "content": "   " })).await;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "Invalid message data");
    assert_eq!(body["errors"][0]["field"], "content");

    let long = "가".repeat(1001);
    let (status, _) = t.post_json(&uri, Some("user2"), json!({ "content": long })).await;
    assert_eq!(status, 400);

    let (status, _) = t.post_json(&uri, Some("user3"), json!({ "content": "hi" })).await;
    assert_eq!(status, 403);

    let (status, _) = t.get(&format!("/api/chats/{chat_id}"), Some("user3")).await;
    assert_eq!(status, 403);

    let (status, detail) = t.get(&format!("/api/chats/{chat_id}"), Some("user1")).await;
    assert_eq!(status, 200);
    assert_eq!(detail["messages"].as_array().unwrap().len(), 1);
    assert_eq!(detail["item"]["id"], 1);
    assert_eq!(detail["buyer"]["id"], "user2");

    let (_, list) = t.get("/api/chats", Some("user1")).await;
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["lastMessage"]["content"], "아직 판매 중인가요?");

    let (_, list) = t.get("/api/chats", Some("user3")).await;
    assert!(list.as_array().unwrap().is_empty());

    let (status, body) = t.get("/api/chats/9999", Some("user1")).await;
    assert_eq!(status, 404);
    assert_eq!(body["message"], "Chat not found");
}

const BOUNDARY: &str = "dongne-test-boundary";

enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, Vec<u8>),
}

fn multipart(parts: &[Part]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                        .as_bytes(),
                );
            }
            Part::File(filename, bytes) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"images\"; filename=\"{filename}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn png() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(64, 32, image::Rgb([200, 80, 20]));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
    buf.into_inner()
}

fn upload(user: Option<&str>, parts: &[Part]) -> Request<Body> {
    let mut req = Request::post("/api/items").header(
        header::CONTENT_TYPE,
        format!("multipart/form-data; boundary={BOUNDARY}"),
    );
    if let Some(user) = user {
        req = req.header(header::AUTHORIZATION, bearer(user));
    }
    req.body(Body::from(multipart(parts))).unwrap()
}

#[tokio::test]
async fn multipart_listing_is_thumbnailed() {
    let t = spawn_app(None);

    let req = upload(
        Some("user3"),
        &[
            Part::Text("title", "캠핑 의자 2개"),
            Part::Text("description", "두 번 사용했어요"),
            Part::Text("price", "25000"),
            Part::Text("categoryId", "5"),
            Part::Text("isNegotiable", "true"),
            Part::File("chair.png", png()),
        ],
    );
    let (status, item) = split(t.send(req).await).await;
    assert_eq!(status, 201);
    assert_eq!(item["sellerId"], "user3");
    assert_eq!(item["regionCode"], "성수동");
    assert_eq!(item["isNegotiable"], true);
    let images = item["images"].as_array().unwrap();
    assert_eq!(images.len(), 1);
    assert!(images[0].as_str().unwrap().starts_with("data:image/jpeg;base64,"));

    let (_, body) = t.get("/api/items?search=%EC%BA%A0%ED%95%91", None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn multipart_listing_reports_field_errors() {
    let t = spawn_app(None);

    let req = upload(Some("user1"), &[Part::Text("price", "-3"), Part::Text("categoryId", "1")]);
    let (status, body) = split(t.send(req).await).await;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "Invalid item data");
    let fields: Vec<_> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(fields, ["title", "price"]);

    let req = upload(
        Some("user1"),
        &[Part::Text("title", "책상"), Part::Text("price", "1000"), Part::Text("categoryId", "999")],
    );
    let (status, body) = split(t.send(req).await).await;
    assert_eq!(status, 400);
    assert_eq!(body["errors"][0]["field"], "categoryId");

    let req = upload(
        Some("user1"),
        &[
            Part::Text("title", "책상"),
            Part::Text("price", "1000"),
            Part::Text("categoryId", "1"),
            Part::File("broken.png", b"not an image".to_vec()),
        ],
    );
    let (status, body) = split(t.send(req).await).await;
    assert_eq!(status, 400);
    assert_eq!(body["errors"][0]["field"], "images");

    let req = upload(None, &[Part::Text("title", "책상")]);
    let (status, _) = split(t.send(req).await).await;
    assert_eq!(status, 401);
}

#[tokio::test]
async fn seed_route_is_idempotent_in_development() {
    let t = spawn_app(None);

    let (status, body) = t.post_json("/api/seed", None, json!({})).await;
    assert_eq!(status, 200);
    assert_eq!(body["message"], "Seed data created successfully");

    let (_, body) = t.get("/api/items?limit=100", None).await;
    assert_eq!(body.as_array().unwrap().len(), 20);
}

#[tokio::test]
async fn seed_route_is_absent_in_production() {
    let dir = tempfile::tempdir().unwrap();
    let db = dongne_db::Database::open(&dir.path().join("prod.db")).unwrap();
    let config = dongne_api::Config::from_lookup(|key| match key {
        "DONGNE_SESSION_SECRET" => Some(common::SECRET.into()),
        _ => None,
    })
    .unwrap();
    let app = dongne_api::router(dongne_api::AppStateInner::new(db, config));

    use tower::ServiceExt;
    let resp = app
        .oneshot(Request::post("/api/seed").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}
