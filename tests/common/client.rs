//! HTTP client for end-to-end tests
//!
//! This module provides a high-level HTTP client that wraps reqwest
//! and provides methods for all stats endpoints.
//!
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::cookie::Jar;
use reqwest::Response;
use std::sync::Arc;
use std::time::Duration;

/// HTTP test client, optionally carrying a session cookie
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    /// Creates a new unauthenticated client
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    /// Creates a client whose requests carry `token` in the session cookie
    ///
    /// This is the most common way to create a test client.
    pub fn authenticated(base_url: String, token: &str) -> Self {
        let url = base_url
            .parse::<reqwest::Url>()
            .expect("Invalid base url");
        let jar = Jar::default();
        jar.add_cookie_str(&format!("session_token={}", token), &url);

        let client = reqwest::Client::builder()
            .cookie_provider(Arc::new(jar))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    // ========================================================================
    // Server Endpoints
    // ========================================================================

    /// GET /
    pub async fn get_home(&self) -> Response {
        self.client
            .get(format!("{}/", self.base_url))
            .send()
            .await
            .expect("Home request failed")
    }

    // ========================================================================
    // Stats Endpoints
    // ========================================================================

    /// GET /v1/stats/dashboard
    pub async fn get_dashboard(&self, query: &[(&str, String)]) -> Response {
        self.client
            .get(format!("{}/v1/stats/dashboard", self.base_url))
            .query(query)
            .send()
            .await
            .expect("Dashboard request failed")
    }

    /// GET /v1/stats/leaderboard
    pub async fn get_leaderboard(&self, query: &[(&str, String)]) -> Response {
        self.client
            .get(format!("{}/v1/stats/leaderboard", self.base_url))
            .query(query)
            .send()
            .await
            .expect("Leaderboard request failed")
    }

    /// GET /v1/feed
    pub async fn get_feed(&self, query: &[(&str, String)]) -> Response {
        self.client
            .get(format!("{}/v1/feed", self.base_url))
            .query(query)
            .send()
            .await
            .expect("Feed request failed")
    }
}
