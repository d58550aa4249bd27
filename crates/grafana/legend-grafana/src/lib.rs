//! # Legend Grafana
//!
//! Thin client for the parts of the Grafana HTTP API Legend needs
//! (folders, dashboards, legacy alert notification channels) and the
//! publishing flow built on top of it.

pub mod client;
pub mod error;
pub mod publisher;

pub use client::{AlertNotification, DashboardResponse, DeleteResponse, Folder, GrafanaClient};
pub use error::{GrafanaError, Result};
pub use publisher::{DashboardPublisher, FolderTarget};
