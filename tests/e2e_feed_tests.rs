//! End-to-end tests for the friends feed
//!
//! Within the last day alice and bob each finished one play; a stranger and a
//! user with a pending request also played, and must not show up.

mod common;

use chrono::{DateTime, Duration, Utc};
use common::*;
use reqwest::StatusCode;
use serde_json::Value;

fn listen_handles(body: &Value) -> Vec<String> {
    body["listens"]
        .as_array()
        .unwrap()
        .iter()
        .map(|listen| listen["user_handle"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_feed_requires_session() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.get_feed(&[]).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_feed_shows_viewer_and_friends_newest_first() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone(), &server.token(TEST_USER));

    let response = client.get_feed(&[]).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();

    assert_eq!(listen_handles(&body), vec![FRIEND_USER, TEST_USER]);
    assert!(body["next_offset"].is_null());

    let newest = &body["listens"][0];
    assert_eq!(newest["track_id"], TRACK_3_ID);
    assert_eq!(newest["track_name"], TRACK_3_TITLE);
    assert_eq!(newest["artist_name"], ARTIST_2_NAME);
    assert!(newest["album_image_url"].is_null());

    let own = &body["listens"][1];
    assert_eq!(own["track_id"], TRACK_2_ID);
    assert_eq!(own["album_image_url"], "/img/album-1.jpg");
    let played_at = own["played_at"].as_i64().unwrap();
    let expected = (server.users.seeded_at - Duration::hours(1)).timestamp_millis();
    assert_eq!(played_at, expected);
}

#[tokio::test]
async fn test_feed_since_is_one_day_back() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone(), &server.token(TEST_USER));

    let response = client.get_feed(&[]).await;
    let body: Value = response.json().await.unwrap();

    let since: DateTime<Utc> = body["since"].as_str().unwrap().parse().unwrap();
    let lag = Utc::now() - since;
    assert!(lag >= Duration::hours(24), "lag = {}", lag);
    assert!(lag < Duration::hours(25), "lag = {}", lag);
}

#[tokio::test]
async fn test_feed_pages_with_offset() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone(), &server.token(TEST_USER));

    let response = client.get_feed(&[("limit", "1".to_string())]).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(listen_handles(&body), vec![FRIEND_USER]);
    assert_eq!(body["next_offset"], 1);

    let response = client
        .get_feed(&[("limit", "1".to_string()), ("offset", "1".to_string())])
        .await;
    let body: Value = response.json().await.unwrap();
    assert_eq!(listen_handles(&body), vec![TEST_USER]);
    assert!(body["next_offset"].is_null());
}

#[tokio::test]
async fn test_feed_of_user_without_friends() {
    let server = TestServer::spawn().await;
    let client =
        TestClient::authenticated(server.base_url.clone(), &server.token(STRANGER_USER));

    let response = client.get_feed(&[]).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(listen_handles(&body), vec![STRANGER_USER]);
}

#[tokio::test]
async fn test_home_is_public() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.get_home().await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert!(body["uptime"].is_string());
}
