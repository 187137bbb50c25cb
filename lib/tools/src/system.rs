//! Host-side tools: service control and screen snapshots.

use crate::error::ToolError;
use crate::registry::{result_payload, ToolHandler};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::path::Path;
use std::sync::Arc;
use tokio::process::Command;
use wicara_ai::{FileStore, FunctionDeclaration};

/// Restarts or stops a process-manager service (`cctv_tool`).
pub struct ServiceControlTool {
    service: String,
}

impl ServiceControlTool {
    /// Creates the tool for the given pm2 service name.
    #[must_use]
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }
}

#[async_trait]
impl ToolHandler for ServiceControlTool {
    fn declaration(&self) -> FunctionDeclaration {
        FunctionDeclaration {
            name: "cctv_tool".to_string(),
            description: "Mengendalikan layanan CCTV. command harus 'restart' atau 'stop'."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "command": {
                        "type": "string",
                        "enum": ["restart", "stop"],
                        "description": "Aksi yang dijalankan pada layanan"
                    }
                },
                "required": ["command"]
            }),
        }
    }

    async fn handle(&self, args: &Map<String, Value>) -> Result<Map<String, Value>, ToolError> {
        let command = args
            .get("command")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments {
                reason: "command must be a string".to_string(),
            })?;
        if command != "restart" && command != "stop" {
            return Err(ToolError::InvalidArguments {
                reason: format!("command must be 'restart' or 'stop', got '{command}'"),
            });
        }

        let output = Command::new("pm2")
            .arg(command)
            .arg(&self.service)
            .output()
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                reason: format!("failed to spawn pm2: {e}"),
            })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ToolError::ExecutionFailed {
                reason: format!("pm2 {command} exited with {}: {}", output.status, stderr.trim()),
            });
        }
        tracing::info!(service = %self.service, command, "service control executed");
        Ok(result_payload(json!(format!(
            "Layanan {} berhasil di-{command}.",
            self.service
        ))))
    }
}

/// Produces a screen capture at the requested path.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Writes one capture to `output`.
    async fn capture(&self, output: &Path) -> Result<(), ToolError>;
}

/// [`SnapshotSource`] that shells out to a capture program.
///
/// The output path is appended as the final argument, the convention both
/// scrot and grim follow.
pub struct CommandSnapshotSource {
    program: String,
    args: Vec<String>,
}

impl CommandSnapshotSource {
    /// Creates a source for the given program and fixed arguments.
    #[must_use]
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

#[async_trait]
impl SnapshotSource for CommandSnapshotSource {
    async fn capture(&self, output: &Path) -> Result<(), ToolError> {
        let result = Command::new(&self.program)
            .args(&self.args)
            .arg(output)
            .output()
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                reason: format!("failed to spawn {}: {e}", self.program),
            })?;
        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(ToolError::ExecutionFailed {
                reason: format!(
                    "{} exited with {}: {}",
                    self.program,
                    result.status,
                    stderr.trim()
                ),
            });
        }
        Ok(())
    }
}

/// Captures the screen and uploads it for model consumption (`ss_tool`).
///
/// The capture is spooled through a temporary file that is removed when the
/// handler returns, on both the success and the failure path.
pub struct SnapshotTool {
    source: Arc<dyn SnapshotSource>,
    files: Arc<dyn FileStore>,
}

impl SnapshotTool {
    /// Creates the tool over a capture source and a file store.
    #[must_use]
    pub fn new(source: Arc<dyn SnapshotSource>, files: Arc<dyn FileStore>) -> Self {
        Self { source, files }
    }
}

#[async_trait]
impl ToolHandler for SnapshotTool {
    fn declaration(&self) -> FunctionDeclaration {
        FunctionDeclaration {
            name: "ss_tool".to_string(),
            description: "Mengambil tangkapan layar monitor dan mengunggahnya agar bisa \
                          dibaca model."
                .to_string(),
            parameters: json!({"type": "object", "properties": {}}),
        }
    }

    async fn handle(&self, _args: &Map<String, Value>) -> Result<Map<String, Value>, ToolError> {
        let spool = tempfile::NamedTempFile::new().map_err(|e| ToolError::ExecutionFailed {
            reason: format!("failed to create temp file: {e}"),
        })?;
        self.source.capture(spool.path()).await?;
        let bytes =
            tokio::fs::read(spool.path())
                .await
                .map_err(|e| ToolError::ExecutionFailed {
                    reason: format!("failed to read capture: {e}"),
                })?;
        let uri = self
            .files
            .upload(&bytes, "image/png")
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                reason: e.to_string(),
            })?;
        Ok(result_payload(json!(uri)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wicara_ai::GenerationError;

    struct FixedSource {
        bytes: Vec<u8>,
    }

    #[async_trait]
    impl SnapshotSource for FixedSource {
        async fn capture(&self, output: &Path) -> Result<(), ToolError> {
            tokio::fs::write(output, &self.bytes)
                .await
                .map_err(|e| ToolError::ExecutionFailed {
                    reason: e.to_string(),
                })
        }
    }

    struct FailingSource;

    #[async_trait]
    impl SnapshotSource for FailingSource {
        async fn capture(&self, _output: &Path) -> Result<(), ToolError> {
            Err(ToolError::ExecutionFailed {
                reason: "no display".to_string(),
            })
        }
    }

    struct FakeStore;

    #[async_trait]
    impl FileStore for FakeStore {
        async fn upload(&self, bytes: &[u8], mime_type: &str) -> Result<String, GenerationError> {
            assert_eq!(mime_type, "image/png");
            Ok(format!("files/fake-{}", bytes.len()))
        }
    }

    #[tokio::test]
    async fn snapshot_uploads_captured_bytes() {
        let tool = SnapshotTool::new(
            Arc::new(FixedSource {
                bytes: vec![1, 2, 3],
            }),
            Arc::new(FakeStore),
        );
        let response = tool.handle(&Map::new()).await.unwrap();
        assert_eq!(response["result"], json!("files/fake-3"));
    }

    #[tokio::test]
    async fn snapshot_propagates_capture_failure() {
        let tool = SnapshotTool::new(Arc::new(FailingSource), Arc::new(FakeStore));
        let result = tool.handle(&Map::new()).await;
        assert!(matches!(result, Err(ToolError::ExecutionFailed { .. })));
    }

    #[tokio::test]
    async fn service_control_rejects_unknown_command() {
        let tool = ServiceControlTool::new("cctv");
        let mut args = Map::new();
        args.insert("command".to_string(), json!("status"));
        let result = tool.handle(&args).await;
        assert!(matches!(result, Err(ToolError::InvalidArguments { .. })));
    }
}
