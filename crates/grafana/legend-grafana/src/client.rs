//! Grafana HTTP API client

use crate::{GrafanaError, Result};
use legend_core::GrafanaEndpoint;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, instrument};

/// Dashboard folder
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Folder {
    pub id: i64,
    #[serde(default)]
    pub uid: String,
    pub title: String,
}

/// Legacy alert notification channel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlertNotification {
    #[serde(default)]
    pub id: i64,
    pub uid: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub channel_type: String,
}

/// Answer to a dashboard create or update
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DashboardResponse {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub version: Option<i64>,
}

/// Answer to a dashboard delete
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeleteResponse {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Authenticated client for one Grafana instance
#[derive(Debug, Clone)]
pub struct GrafanaClient {
    base_url: String,
    client: reqwest::Client,
}

impl GrafanaClient {
    /// Create a client sending `Authorization: Bearer <api_key>` on every call.
    pub fn new(endpoint: &GrafanaEndpoint, timeout: Duration) -> Result<Self> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", endpoint.api_key))
            .map_err(|e| GrafanaError::InvalidApiKey(e.to_string()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| GrafanaError::network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: endpoint.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "Grafana request");

        let mut request = self.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| GrafanaError::network(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GrafanaError::Api {
                status: status.as_u16(),
                path: path.to_string(),
                body,
            });
        }

        response.json().await.map_err(|e| GrafanaError::Serialization {
            message: format!("{}: {}", path, e),
        })
    }

    /// `GET /api/alert-notifications`
    pub async fn alert_notifications(&self) -> Result<Vec<AlertNotification>> {
        self.request(Method::GET, "/api/alert-notifications", None).await
    }

    /// `GET /api/folders`
    pub async fn folders(&self) -> Result<Vec<Folder>> {
        self.request(Method::GET, "/api/folders", None).await
    }

    /// Id of the folder titled `title`, if any
    pub async fn folder_id(&self, title: &str) -> Result<Option<i64>> {
        let folders = self.folders().await?;
        Ok(folders.into_iter().find(|f| f.title == title).map(|f| f.id))
    }

    /// `POST /api/folders`
    #[instrument(skip(self))]
    pub async fn create_folder(&self, title: &str) -> Result<Folder> {
        self.request(Method::POST, "/api/folders", Some(&json!({ "title": title })))
            .await
    }

    /// `POST /api/dashboards/db`
    pub async fn update_dashboard(
        &self,
        dashboard: &Value,
        folder_id: i64,
        overwrite: bool,
    ) -> Result<DashboardResponse> {
        let body = json!({
            "dashboard": dashboard,
            "folderId": folder_id,
            "overwrite": overwrite,
        });
        self.request(Method::POST, "/api/dashboards/db", Some(&body)).await
    }

    /// `DELETE /api/dashboards/uid/<uid>`
    #[instrument(skip(self))]
    pub async fn delete_dashboard(&self, uid: &str) -> Result<DeleteResponse> {
        let path = format!("/api/dashboards/uid/{}", uid);
        self.request(Method::DELETE, &path, None).await
    }
}
