//! Office documents → PDF through a headless office renderer subprocess.
//!
//! The renderer is invoked as
//! `<exe> --headless --convert-to pdf --outdir <dir> <input>` and writes
//! `<dir>/<input stem>.pdf`. Its stdout is not parsed: the output is found
//! by that naming convention, and a clean exit without the file is reported
//! as [`ConvertError::ToolOutputMissing`].
//!
//! The launcher usually hands the work to a child of its own (`soffice.bin`),
//! so killing the direct child is not enough. On Unix the renderer runs in
//! its own process group, and the whole group is killed if the wait is
//! abandoned: on timeout, or when the job itself is cancelled.
//!
//! Each run also writes into a private directory next to the final output.
//! The directory is removed when the run ends, so a straggler that escaped
//! the group kill cannot drop a file into the scratch directory afterwards.

use crate::config::BotConfig;
use crate::error::ConvertError;
use crate::pipeline::tool::ToolAdapter;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Subprocess adapter for the office renderer.
#[derive(Debug, Clone)]
pub struct OfficeRenderer {
    executable: String,
    timeout: Duration,
    permits: Arc<Semaphore>,
}

impl OfficeRenderer {
    pub fn new(executable: impl Into<String>, timeout: Duration, max_concurrent: usize) -> Self {
        Self {
            executable: executable.into(),
            timeout,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    pub fn from_config(config: &BotConfig) -> Self {
        Self::new(
            config.office_executable.clone(),
            config.office_timeout(),
            config.max_concurrent_renders,
        )
    }

    /// Where the renderer will put the PDF for `input`.
    pub fn expected_output(input: &Path, output_dir: &Path) -> Result<PathBuf, ConvertError> {
        let stem = input.file_stem().ok_or_else(|| {
            ConvertError::Internal(format!("input '{}' has no file name", input.display()))
        })?;
        let mut name = stem.to_os_string();
        name.push(".pdf");
        Ok(output_dir.join(name))
    }

    /// Render `input` to PDF inside `output_dir` and return the PDF's path.
    pub async fn render_office_to_pdf(
        &self,
        input: &Path,
        output_dir: &Path,
    ) -> Result<PathBuf, ConvertError> {
        let expected = Self::expected_output(input, output_dir)?;

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| ConvertError::Internal(format!("renderer semaphore closed: {e}")))?;

        debug!(
            "Running {} --headless --convert-to pdf --outdir {} {}",
            self.executable,
            output_dir.display(),
            input.display()
        );

        let mut command = Command::new(&self.executable);
        command
            .arg("--headless")
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(output_dir)
            .arg(input)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let child = command.spawn().map_err(|e| {
            ConvertError::tool(&self.executable, format!("failed to spawn: {e}"))
        })?;
        let group = GroupKill::new(child.id());

        let started = Instant::now();
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| {
                ConvertError::tool(&self.executable, format!("failed to wait for renderer: {e}"))
            })?,
            Err(_) => {
                warn!(
                    "{} timed out after {}s on {}",
                    self.executable,
                    self.timeout.as_secs(),
                    input.display()
                );
                return Err(ConvertError::tool(
                    &self.executable,
                    format!("timed out after {}s", self.timeout.as_secs()),
                ));
            }
        };

        group.disarm();

        let diagnostics = diagnostics(&output.stdout, &output.stderr);

        if !output.status.success() {
            return Err(ConvertError::tool(
                &self.executable,
                format!("exited with {}: {}", output.status, diagnostics),
            ));
        }

        if !tokio::fs::try_exists(&expected).await.unwrap_or(false) {
            return Err(ConvertError::ToolOutputMissing {
                tool: self.executable.clone(),
                path: expected,
                diagnostics,
            });
        }

        info!(
            "{} rendered {} in {}ms",
            self.executable,
            input.display(),
            started.elapsed().as_millis()
        );
        Ok(expected)
    }
}

#[async_trait]
impl ToolAdapter for OfficeRenderer {
    fn name(&self) -> &str {
        &self.executable
    }

    async fn convert(&self, input: &Path, output: &Path) -> Result<(), ConvertError> {
        let parent = output.parent().ok_or_else(|| {
            ConvertError::Internal(format!("output '{}' has no parent", output.display()))
        })?;
        let render_dir = tempfile::Builder::new()
            .prefix(RENDER_DIR_PREFIX)
            .tempdir_in(parent)
            .map_err(|e| ConvertError::storage(parent, e))?;

        let produced = self.render_office_to_pdf(input, render_dir.path()).await?;
        tokio::fs::rename(&produced, output)
            .await
            .map_err(|e| ConvertError::storage(output, e))?;
        Ok(())
    }
}

/// Name prefix of the per-run output directories.
pub const RENDER_DIR_PREFIX: &str = "docbot-render-";

/// Kills the renderer's process group on drop unless disarmed.
struct GroupKill {
    pgid: Option<u32>,
}

impl GroupKill {
    fn new(pgid: Option<u32>) -> Self {
        Self { pgid }
    }

    /// The renderer was reaped normally; leave its group alone.
    fn disarm(mut self) {
        self.pgid = None;
    }
}

impl Drop for GroupKill {
    fn drop(&mut self) {
        let Some(pgid) = self.pgid.take() else {
            return;
        };
        #[cfg(unix)]
        {
            use nix::errno::Errno;
            use nix::sys::signal::{killpg, Signal};
            use nix::unistd::Pid;

            let Ok(raw) = i32::try_from(pgid) else {
                return;
            };
            match killpg(Pid::from_raw(raw), Signal::SIGKILL) {
                Ok(()) => debug!("Killed renderer process group {}", pgid),
                Err(Errno::ESRCH) => {}
                Err(e) => warn!("Failed to kill renderer process group {}: {}", pgid, e),
            }
        }
        #[cfg(not(unix))]
        debug!("Renderer {} abandoned", pgid);
    }
}

/// Collapse captured stdout/stderr into one trimmed diagnostic string.
fn diagnostics(stdout: &[u8], stderr: &[u8]) -> String {
    let stderr = String::from_utf8_lossy(stderr);
    let stdout = String::from_utf8_lossy(stdout);
    match (stderr.trim(), stdout.trim()) {
        ("", "") => "no output from renderer".to_string(),
        (err, "") => err.to_string(),
        ("", out) => out.to_string(),
        (err, out) => format!("{err}\n{out}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_output_swaps_extension_into_outdir() {
        let p = OfficeRenderer::expected_output(
            Path::new("/tmp/in/docbot-abc.docx"),
            Path::new("/tmp/out"),
        )
        .unwrap();
        assert_eq!(p, PathBuf::from("/tmp/out/docbot-abc.pdf"));
    }

    #[test]
    fn diagnostics_prefers_stderr() {
        assert_eq!(diagnostics(b"", b"  boom \n"), "boom");
        assert_eq!(diagnostics(b"out", b""), "out");
        assert_eq!(diagnostics(b"", b""), "no output from renderer");
        assert_eq!(diagnostics(b"o", b"e"), "e\no");
    }

    #[tokio::test]
    async fn missing_executable_is_tool_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("x.docx");
        std::fs::write(&input, b"").unwrap();

        let renderer = OfficeRenderer::new(
            "docbot-no-such-renderer-binary",
            Duration::from_secs(5),
            1,
        );
        let err = renderer
            .render_office_to_pdf(&input, dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, ConvertError::ToolExecution { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn failed_run_removes_its_render_dir() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("docbot-abc.docx");
        std::fs::write(&input, b"").unwrap();

        let renderer = OfficeRenderer::new(
            "docbot-no-such-renderer-binary",
            Duration::from_secs(5),
            1,
        );
        let err = renderer
            .convert(&input, &dir.path().join("docbot-abc.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConvertError::ToolExecution { .. }), "got {err:?}");

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("docbot-abc.docx")]);
    }
}
