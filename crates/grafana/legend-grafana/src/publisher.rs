//! Dashboard publishing flow.
//!
//! Resolves notification channels before generation and, once the
//! dashboard JSON exists, files it into a folder and creates or updates it.

use crate::client::{DashboardResponse, DeleteResponse, GrafanaClient};
use crate::Result;
use legend_core::{AlertChannel, NotificationRef};
use serde_json::Value;
use std::fmt;
use tracing::{info, warn};

/// Folder a dashboard is filed under
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderTarget {
    /// Folder title, created when missing
    Named(String),
    /// Existing folder id, `0` is the General folder
    Id(i64),
}

impl FolderTarget {
    pub fn general() -> Self {
        FolderTarget::Id(0)
    }
}

impl fmt::Display for FolderTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FolderTarget::Named(name) => write!(f, "folder '{}'", name),
            FolderTarget::Id(id) => write!(f, "folder #{}", id),
        }
    }
}

/// Publishes generated dashboards through a [`GrafanaClient`]
#[derive(Debug, Clone)]
pub struct DashboardPublisher {
    client: GrafanaClient,
}

impl DashboardPublisher {
    pub fn new(client: GrafanaClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &GrafanaClient {
        &self.client
    }

    /// Notification references for the requested channels.
    ///
    /// A channel matches the first notification with the same name and,
    /// when the channel names one, the same type. Unmatched channels are
    /// skipped with a warning.
    pub async fn resolve_alert_ids(&self, channels: &[AlertChannel]) -> Result<Vec<NotificationRef>> {
        if channels.is_empty() {
            return Ok(Vec::new());
        }

        let notifications = self.client.alert_notifications().await?;
        let mut ids = Vec::with_capacity(channels.len());
        for channel in channels {
            let found = notifications.iter().find(|n| {
                n.name == channel.name
                    && channel
                        .channel_type
                        .as_deref()
                        .map_or(true, |t| n.channel_type.eq_ignore_ascii_case(t))
            });
            match found {
                Some(notification) => ids.push(NotificationRef {
                    uid: notification.uid.clone(),
                }),
                None => warn!(
                    channel = %channel.name,
                    channel_type = ?channel.channel_type,
                    "Alert channel not found in Grafana, skipping"
                ),
            }
        }
        Ok(ids)
    }

    /// Folder id for `target`, creating a named folder when it does not exist.
    pub async fn resolve_folder(&self, target: &FolderTarget) -> Result<i64> {
        match target {
            FolderTarget::Id(id) => Ok(*id),
            FolderTarget::Named(name) => match self.client.folder_id(name).await? {
                Some(id) => Ok(id),
                None => {
                    let folder = self.client.create_folder(name).await?;
                    info!(folder = %folder.title, id = folder.id, "Created Grafana folder");
                    Ok(folder.id)
                }
            },
        }
    }

    /// Create or overwrite `dashboard` in the folder named by `target`.
    pub async fn create_or_update_dashboard(
        &self,
        dashboard: &Value,
        target: &FolderTarget,
    ) -> Result<DashboardResponse> {
        let folder_id = self.resolve_folder(target).await?;
        let response = self.client.update_dashboard(dashboard, folder_id, true).await?;
        info!(
            uid = ?response.uid,
            url = ?response.url,
            version = ?response.version,
            %target,
            "Published dashboard"
        );
        Ok(response)
    }

    pub async fn delete_dashboard(&self, uid: &str) -> Result<DeleteResponse> {
        let response = self.client.delete_dashboard(uid).await?;
        info!(uid, message = ?response.message, "Deleted dashboard");
        Ok(response)
    }
}
