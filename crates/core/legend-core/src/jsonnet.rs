//! Jsonnet compiler invocation.

use crate::{LegendError, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::{debug, info_span, Instrument};
use which::which;

const DEFAULT_TIMEOUT_MS: u64 = 60_000;

/// Runs `jsonnet -J <lib>... <file>` and parses the JSON it prints
#[derive(Debug, Clone)]
pub struct JsonnetCompiler {
    binary: String,
    library_paths: Vec<PathBuf>,
    timeout_ms: u64,
}

impl JsonnetCompiler {
    pub fn new(binary: impl Into<String>, library_paths: Vec<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            library_paths,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Absolute path of the compiler, if it can be found
    pub fn locate(&self) -> Result<PathBuf> {
        which(&self.binary).map_err(|_| LegendError::CompilerNotFound(self.binary.clone()))
    }

    /// Compile `path` and parse stdout as JSON.
    pub async fn compile(&self, path: &Path) -> Result<Value> {
        let span = info_span!("jsonnet", file = %path.display());
        self.run(path).instrument(span).await
    }

    async fn run(&self, path: &Path) -> Result<Value> {
        let program = self.locate()?;

        let mut command = Command::new(&program);
        for library in &self.library_paths {
            command.arg("-J").arg(library);
        }
        command
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(program = %program.display(), libraries = self.library_paths.len(), "Running jsonnet");
        let output = timeout(Duration::from_millis(self.timeout_ms), command.output())
            .await
            .map_err(|_| LegendError::Timeout(format!("jsonnet did not finish within {}ms", self.timeout_ms)))??;

        if !output.status.success() {
            return Err(LegendError::CompilerFailed {
                path: path.to_path_buf(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let dashboard = serde_json::from_slice(&output.stdout)?;
        debug!(bytes = output.stdout.len(), "Compiled dashboard json");
        Ok(dashboard)
    }
}
