//! Subcommand implementations

use crate::grafonnet::{self, InstallOutcome};
use anyhow::{bail, Context, Result};
use legend_core::{
    DashboardGenerator, InputSpec, JsonnetCompiler, NotificationRef, Settings, TemplateLibrary,
};
use legend_grafana::{DashboardPublisher, FolderTarget, GrafanaClient};
use legend_kube::{push_service_level, render_service_level, SloOutcome};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Options shared by `build` and `apply`
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    pub spec: PathBuf,
    pub keep_jsonnet: bool,
    pub offline: bool,
}

pub struct Legend {
    settings: Settings,
    generator: DashboardGenerator,
}

impl Legend {
    pub fn new(settings: Settings) -> Self {
        let library = match &settings.library_dir {
            Some(dir) => TemplateLibrary::with_override_dir(dir),
            None => TemplateLibrary::builtin(),
        };
        Self {
            settings,
            generator: DashboardGenerator::new(library),
        }
    }

    fn publisher(&self) -> Result<DashboardPublisher> {
        let endpoint = self.settings.grafana_endpoint()?;
        let timeout = Duration::from_secs(self.settings.grafana.timeout_secs);
        Ok(DashboardPublisher::new(GrafanaClient::new(&endpoint, timeout)?))
    }

    pub async fn install(&self) -> Result<InstallOutcome> {
        let url = self.settings.grafonnet_repo_url.clone();
        let branch = self.settings.grafonnet_branch.clone();
        let path = self.settings.grafonnet_path();
        let outcome =
            tokio::task::spawn_blocking(move || grafonnet::install(&url, &branch, &path)).await??;
        info!(?outcome, path = %self.settings.grafonnet_path().display(), "grafonnet ready");
        Ok(outcome)
    }

    /// Make sure the grafonnet checkout exists, cloning it unless offline.
    pub async fn ensure_grafonnet(&self, offline: bool) -> Result<()> {
        let path = self.settings.grafonnet_path();
        if path.exists() {
            return Ok(());
        }
        if offline {
            bail!(
                "grafonnet library not found at {}, run `legend install` first",
                path.display()
            );
        }
        info!(path = %path.display(), "grafonnet library missing, installing");
        self.install().await?;
        Ok(())
    }

    async fn alert_ids(&self, spec: &InputSpec, offline: bool) -> Result<Vec<NotificationRef>> {
        if !spec.has_alert_channels() {
            return Ok(Vec::new());
        }
        if offline {
            warn!("Offline build, alerts will not notify any channel");
            return Ok(Vec::new());
        }
        Ok(self.publisher()?.resolve_alert_ids(&spec.alert_channels).await?)
    }

    /// Generate and compile the dashboard for `spec`.
    pub async fn build_dashboard(&self, spec: &InputSpec, options: &BuildOptions) -> Result<Value> {
        self.ensure_grafonnet(options.offline).await?;
        let notifications = self.alert_ids(spec, options.offline).await?;
        let document = self.generator.generate(spec, &notifications)?;
        let path = document.write_temp_jsonnet()?;

        let compiler = JsonnetCompiler::new(
            self.settings.jsonnet_bin.clone(),
            vec![self.settings.grafonnet_path()],
        );
        let compiled = compiler.compile(&path).await;

        if options.keep_jsonnet {
            info!(path = %path.display(), "Kept generated jsonnet");
        } else if let Err(err) = std::fs::remove_file(&path) {
            warn!(path = %path.display(), error = %err, "Failed to remove generated jsonnet");
        }

        Ok(compiled?)
    }

    pub async fn build(&self, options: &BuildOptions, output: Option<&Path>) -> Result<Value> {
        let spec = InputSpec::from_file(&options.spec)?;
        let dashboard = self.build_dashboard(&spec, options).await?;
        let json = serde_json::to_string_pretty(&dashboard)?;
        match output {
            Some(path) => {
                std::fs::write(path, json)
                    .with_context(|| format!("cannot write {}", path.display()))?;
                info!(path = %path.display(), "Wrote dashboard");
            }
            None => println!("{}", json),
        }
        Ok(dashboard)
    }

    /// Build, publish, then push the spec's ServiceLevel if it has one.
    pub async fn apply(&self, options: &BuildOptions, folder: Option<FolderTarget>) -> Result<()> {
        let spec = InputSpec::from_file(&options.spec)?;
        let dashboard = self.build_dashboard(&spec, options).await?;

        let target = folder_target(folder, &spec);
        let response = self
            .publisher()?
            .create_or_update_dashboard(&dashboard, &target)
            .await?;
        if let Some(url) = &response.url {
            println!("{}", url);
        }

        if let Some(manifest) = render_service_level(&spec, self.generator.library())? {
            match push_service_level(&manifest).await {
                SloOutcome::Applied { name, namespace } => {
                    info!(%name, %namespace, "ServiceLevel applied")
                }
                SloOutcome::Skipped { reason } => warn!(%reason, "ServiceLevel skipped"),
            }
        }
        Ok(())
    }

    pub async fn delete(&self, uid: &str) -> Result<()> {
        self.publisher()?.delete_dashboard(uid).await?;
        Ok(())
    }

    pub fn components(&self) -> Vec<String> {
        self.generator.library().component_templates()
    }
}

/// Folder from the command line, else the spec's `grafana_folder`, else General.
pub fn folder_target(flag: Option<FolderTarget>, spec: &InputSpec) -> FolderTarget {
    flag.or_else(|| {
        spec.grafana_folder
            .as_ref()
            .filter(|name| !name.is_empty())
            .map(|name| FolderTarget::Named(name.clone()))
    })
    .unwrap_or_else(FolderTarget::general)
}
