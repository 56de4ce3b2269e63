use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::PluginError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

struct Captured {
    stdout: Vec<u8>,
    stderr: String,
}

/// One plugin executable and how long a single call may take.
#[derive(Debug, Clone)]
pub struct PluginRunner {
    path: PathBuf,
    name: String,
    timeout: Duration,
}

impl PluginRunner {
    /// Resolve `spec` to an executable. Bare names are looked up on `PATH`,
    /// anything with a path separator is used as given.
    pub fn locate(spec: &str) -> Result<Self, PluginError> {
        let candidate = Path::new(spec);
        let path = if candidate.components().count() > 1 {
            candidate.to_path_buf()
        } else {
            which::which(spec).map_err(|source| PluginError::NotFound {
                name: spec.to_string(),
                source,
            })?
        };
        Ok(Self::new(path))
    }

    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        PluginRunner {
            path,
            name,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run the plugin once, feed `input` to its stdin and return its stdout.
    ///
    /// The child is killed when the timeout expires.
    pub fn call(&self, args: &[&str], input: &[u8]) -> Result<Vec<u8>, PluginError> {
        self.exchange(args, input).map(|captured| captured.stdout)
    }

    /// Call the plugin and deserialize its stdout.
    pub fn call_json<T: serde::de::DeserializeOwned>(
        &self,
        args: &[&str],
        input: &[u8],
    ) -> Result<T, PluginError> {
        let captured = self.exchange(args, input)?;
        serde_json::from_slice(&captured.stdout).map_err(|source| PluginError::Malformed {
            plugin: self.name.clone(),
            stderr: captured.stderr,
            source,
        })
    }

    fn exchange(&self, args: &[&str], input: &[u8]) -> Result<Captured, PluginError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|source| self.io_error(source))?;
        runtime.block_on(self.exchange_async(args, input))
    }

    async fn exchange_async(&self, args: &[&str], input: &[u8]) -> Result<Captured, PluginError> {
        info!(plugin = %self.name, args = ?args, "calling plugin");
        let mut child = Command::new(&self.path)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| PluginError::Spawn {
                path: self.path.clone(),
                source,
            })?;

        let mut stdin = child.stdin.take();
        let input = input.to_vec();
        let feed = async move {
            if let Some(stdin) = stdin.as_mut() {
                // A plugin may exit without reading its input.
                let _ = stdin.write_all(&input).await;
                let _ = stdin.shutdown().await;
            }
            drop(stdin);
        };

        let finished = async {
            let ((), output) = tokio::join!(feed, child.wait_with_output());
            output
        };
        let output = tokio::time::timeout(self.timeout, finished)
            .await
            .map_err(|_| PluginError::Timeout {
                plugin: self.name.clone(),
                timeout: self.timeout,
            })?
            .map_err(|source| self.io_error(source))?;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            return Err(PluginError::Failed {
                plugin: self.name.clone(),
                status: output.status.to_string(),
                stderr,
            });
        }
        if !stderr.is_empty() {
            debug!(plugin = %self.name, stderr = %stderr, "plugin wrote to stderr");
        }
        Ok(Captured {
            stdout: output.stdout,
            stderr,
        })
    }

    fn io_error(&self, source: std::io::Error) -> PluginError {
        PluginError::Io {
            plugin: self.name.clone(),
            source,
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    fn script(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn echoes_stdin_back() {
        let dir = tempfile::tempdir().unwrap();
        let runner = PluginRunner::new(script(&dir, "echo-plugin", "cat"));
        let output = runner.call(&[], b"{\"ok\":true}").unwrap();
        assert_eq!(output, b"{\"ok\":true}");
    }

    #[test]
    fn non_zero_exit_carries_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let runner = PluginRunner::new(script(&dir, "broken", "echo 'no model' >&2; exit 3"));
        let err = runner.call(&["--generate-risks"], b"").unwrap_err();
        match err {
            PluginError::Failed { plugin, stderr, .. } => {
                assert_eq!(plugin, "broken");
                assert_eq!(stderr, "no model");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn slow_plugin_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let runner = PluginRunner::new(script(&dir, "sleepy", "sleep 5"))
            .with_timeout(Duration::from_millis(200));
        let err = runner.call(&[], b"").unwrap_err();
        assert!(matches!(err, PluginError::Timeout { .. }));
    }

    #[test]
    fn malformed_json_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let runner = PluginRunner::new(script(&dir, "chatty", "echo hello; echo 'debug output' >&2"));
        let err = runner.call_json::<Vec<String>>(&[], b"").unwrap_err();
        assert!(matches!(
            err,
            PluginError::Malformed { ref plugin, ref stderr, .. } if plugin == "chatty" && stderr == "debug output"
        ));
    }

    #[test]
    fn bare_name_is_resolved_on_path() {
        assert!(matches!(
            PluginRunner::locate("threatscry-no-such-plugin-4711"),
            Err(PluginError::NotFound { .. })
        ));
        let runner = PluginRunner::locate("./plugins/raa").unwrap();
        assert_eq!(runner.name(), "raa");
    }
}
