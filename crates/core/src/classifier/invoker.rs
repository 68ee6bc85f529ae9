//! Running the external classification process.

use std::future::Future;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use super::error::InvocationFailure;
use super::verdict::{ResolvedVerdict, interpret};
use mycoguard_shared::config::ClassifierConfig;

/// Classifies a local image file.
pub trait Classifier: Send + Sync {
    /// Classifies the image at `image_path`.
    fn classify(
        &self,
        image_path: &Path,
    ) -> impl Future<Output = Result<ResolvedVerdict, InvocationFailure>> + Send;
}

/// Bytes kept from each of stdout and stderr. Earlier output is dropped.
pub const MAX_CAPTURED_BYTES: usize = 1024 * 1024;

/// Spawns the configured classifier executable once per image.
///
/// The image path is passed as the last argument. stdout and stderr are
/// drained in full but only their last [`MAX_CAPTURED_BYTES`] are kept;
/// stdin is closed.
#[derive(Debug, Clone)]
pub struct ClassifierInvoker {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

/// Output of a finished run.
struct Captured {
    status: std::process::ExitStatus,
    stdout: String,
    stderr: String,
}

impl ClassifierInvoker {
    /// Creates an invoker.
    #[must_use]
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    /// Creates an invoker from configuration.
    #[must_use]
    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self::new(
            config.program.clone(),
            config.args.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    async fn run(&self, image_path: &Path) -> Result<Captured, InvocationFailure> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(image_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| InvocationFailure::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let mut stdout_pipe = child
            .stdout
            .take()
            .ok_or_else(|| InvocationFailure::Io("stdout was not captured".to_string()))?;
        let mut stderr_pipe = child
            .stderr
            .take()
            .ok_or_else(|| InvocationFailure::Io("stderr was not captured".to_string()))?;

        // Drain both pipes while waiting so a chatty child cannot block on a full pipe.
        let finished = tokio::time::timeout(self.timeout, async {
            tokio::try_join!(
                child.wait(),
                read_tail(&mut stdout_pipe, MAX_CAPTURED_BYTES),
                read_tail(&mut stderr_pipe, MAX_CAPTURED_BYTES),
            )
        })
        .await;

        let (status, stdout, stderr) = match finished {
            Ok(Ok(captured)) => captured,
            Ok(Err(e)) => return Err(InvocationFailure::Io(e.to_string())),
            Err(_) => {
                if let Err(e) = child.kill().await {
                    tracing::warn!(error = %e, program = %self.program, "failed to kill timed out classifier");
                }
                return Err(InvocationFailure::TimedOut {
                    after_secs: self.timeout.as_secs(),
                });
            }
        };

        Ok(Captured {
            status,
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        })
    }
}

/// Reads `reader` to the end, keeping only its last `cap` bytes.
async fn read_tail<R>(reader: &mut R, cap: usize) -> std::io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut kept = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        kept.extend_from_slice(&chunk[..n]);
        if kept.len() > cap.saturating_mul(2) {
            kept.drain(..kept.len() - cap);
        }
    }
    if kept.len() > cap {
        kept.drain(..kept.len() - cap);
    }
    Ok(kept)
}

impl Classifier for ClassifierInvoker {
    async fn classify(&self, image_path: &Path) -> Result<ResolvedVerdict, InvocationFailure> {
        tracing::debug!(program = %self.program, path = %image_path.display(), "running classifier");

        let captured = self.run(image_path).await?;

        if !captured.status.success() {
            tracing::warn!(
                program = %self.program,
                code = ?captured.status.code(),
                "classifier exited unsuccessfully"
            );
            return Err(InvocationFailure::NonZeroExit {
                code: captured.status.code(),
                stderr: captured.stderr,
            });
        }

        let resolved = interpret(&captured.stdout)?;
        tracing::info!(
            label = %resolved.label,
            confidence = %resolved.confidence,
            "classifier verdict"
        );
        Ok(resolved)
    }
}
