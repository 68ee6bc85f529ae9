//! Scratch files for images under analysis.

use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::fs::{File, OpenOptions};

const CREATE_ATTEMPTS: usize = 4;

/// A uniquely named local file that is removed when the analysis ends.
///
/// Call [`ScratchFile::remove`] on every path; `Drop` removes the file
/// synchronously if that did not happen (panic, cancelled future).
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
    removed: bool,
}

impl ScratchFile {
    /// Creates an empty file named `<unix-millis>-<random hex><ext>` in `dir`.
    ///
    /// The directory is created if missing and resolved against the working
    /// directory, so [`ScratchFile::path`] is always absolute. The file is
    /// opened with `create_new`, so two analyses never share a file.
    pub async fn create(dir: &Path, extension: Option<&str>) -> io::Result<(Self, File)> {
        let dir = std::path::absolute(dir)?;
        tokio::fs::create_dir_all(&dir).await?;

        let mut last_err = None;
        for _ in 0..CREATE_ATTEMPTS {
            let path = dir.join(unique_name(extension));
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => {
                    tracing::debug!(path = %path.display(), "scratch file created");
                    return Ok((
                        Self {
                            path,
                            removed: false,
                        },
                        file,
                    ));
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => last_err = Some(e),
                Err(e) => return Err(e),
            }
        }

        Err(last_err.unwrap_or_else(|| io::Error::other("could not create scratch file")))
    }

    /// Path of the file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the file. Failures are logged, never returned.
    pub async fn remove(mut self) {
        self.removed = true;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => tracing::debug!(path = %self.path.display(), "scratch file removed"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to remove scratch file");
            }
        }
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to remove scratch file on drop");
            }
        }
    }
}

fn unique_name(extension: Option<&str>) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis());
    let suffix: u64 = rand::random();
    let ext = extension
        .filter(|e| !e.is_empty() && e.len() <= 8 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default();
    format!("{millis}-{suffix:016x}{ext}")
}

/// Extension of `file_name`, if it has one.
#[must_use]
pub(crate) fn extension_of(file_name: &str) -> Option<&str> {
    Path::new(file_name).extension().and_then(|e| e.to_str())
}
