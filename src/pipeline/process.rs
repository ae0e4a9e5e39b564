//! External process invocation with piped stdin/stdout.
//!
//! Both pipeline strategies and the preview path talk to external tools
//! through the [`ProcessRunner`] trait: one call, whole-buffer input, whole
//! captured stdout back. The seam exists so tests can substitute a scripted
//! runner and assert the exact argument lists without any tool installed.
//!
//! [`SystemRunner`] is the production implementation over
//! `tokio::process::Command`. Each invocation is bounded by the
//! submission's `command_timeout_secs`; `kill_on_drop` ensures a timed-out
//! child does not outlive its request.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::{BinderError, PipelineStage};

/// Document-conversion tool (ImageMagick).
pub const CONVERT_TOOL: &str = "convert";
/// PDF merge tool (poppler).
pub const MERGE_TOOL: &str = "pdfunite";
/// Single-page extraction tool (poppler).
pub const SEPARATE_TOOL: &str = "pdfseparate";

/// Keep only the tail of a tool's stderr so errors stay readable.
const STDERR_TAIL_BYTES: usize = 2048;

/// One external tool invocation: args in, optional stdin bytes in, captured
/// stdout bytes out. Non-zero exit (or failure to spawn, or timeout) is an
/// error; no partial output is ever returned.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(
        &self,
        stage: PipelineStage,
        tool: &str,
        args: &[String],
        input: Option<&[u8]>,
        timeout_secs: u64,
    ) -> Result<Vec<u8>, BinderError>;
}

/// Production runner: spawns the tool as a child process, pipes the input
/// buffer to its stdin, and captures stdout/stderr in full.
#[derive(Debug, Default, Clone)]
pub struct SystemRunner;

#[async_trait]
impl ProcessRunner for SystemRunner {
    async fn run(
        &self,
        stage: PipelineStage,
        tool: &str,
        args: &[String],
        input: Option<&[u8]>,
        timeout_secs: u64,
    ) -> Result<Vec<u8>, BinderError> {
        debug!(%stage, tool, ?args, stdin_bytes = input.map(<[u8]>::len), "invoking tool");

        let mut command = Command::new(tool);
        command
            .args(args)
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|source| BinderError::SpawnFailed {
            tool: tool.to_string(),
            source,
        })?;

        let stdin_handle = match input {
            Some(_) => Some(child.stdin.take().ok_or_else(|| {
                BinderError::Internal(format!("no stdin handle for `{tool}`"))
            })?),
            None => None,
        };
        let payload = input.map(<[u8]>::to_vec);

        // The stdin write must run concurrently with the output read: a
        // child that streams output while its input is still being written
        // can fill both pipes. The handle drops at the end of the block,
        // closing the pipe so the tool sees EOF.
        let feed = async {
            if let (Some(mut stdin), Some(bytes)) = (stdin_handle, payload) {
                match stdin.write_all(&bytes).await {
                    // The child may exit without draining its stdin.
                    Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => return Err(e),
                    _ => {}
                }
            }
            Ok(())
        };

        // One deadline over the whole interaction, stdin write included.
        let (fed, waited) = tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            async { tokio::join!(feed, child.wait_with_output()) },
        )
        .await
        .map_err(|_| BinderError::CommandTimeout {
            tool: tool.to_string(),
            secs: timeout_secs,
        })?;

        fed.map_err(|e| BinderError::Internal(format!("writing stdin of `{tool}`: {e}")))?;
        let output =
            waited.map_err(|e| BinderError::Internal(format!("waiting on `{tool}`: {e}")))?;

        if !output.status.success() {
            // Tail on the raw bytes; a cut mid-character decodes to a
            // replacement char instead of slicing out of bounds.
            let tail_start = output.stderr.len().saturating_sub(STDERR_TAIL_BYTES);
            let stderr = String::from_utf8_lossy(&output.stderr[tail_start..]);
            return Err(BinderError::StageFailed {
                stage,
                tool: tool.to_string(),
                status: output.status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }

        debug!(%stage, tool, stdout_bytes = output.stdout.len(), "tool finished");
        Ok(output.stdout)
    }
}
