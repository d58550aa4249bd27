//! Shared fixtures for Grafana API tests

#![allow(dead_code)]

use legend_core::GrafanaEndpoint;
use legend_grafana::{DashboardPublisher, GrafanaClient};
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::MockServer;

pub const API_KEY: &str = "test-api-key";

pub fn client_for(server: &MockServer) -> GrafanaClient {
    let endpoint = GrafanaEndpoint {
        base_url: server.uri(),
        api_key: API_KEY.to_string(),
    };
    GrafanaClient::new(&endpoint, Duration::from_secs(5)).unwrap()
}

pub fn publisher_for(server: &MockServer) -> DashboardPublisher {
    DashboardPublisher::new(client_for(server))
}

/// A compiled dashboard as jsonnet would emit it
pub fn dashboard() -> Value {
    json!({
        "title": "payments",
        "uid": "payments",
        "panels": [],
        "schemaVersion": 14
    })
}
