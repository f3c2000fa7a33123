use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::encode::ffmpeg::ensure_parent_dir;
use crate::foundation::error::{BrandframeError, BrandframeResult};

/// Name used when no department is selected.
pub const FALLBACK_NAME: &str = "post";

/// Where an artifact's bytes live.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArtifactPayload {
    Bytes(Vec<u8>),
    /// Already written to disk (video exports stream straight to a file).
    File(PathBuf),
}

/// A named, typed export result ready for delivery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact {
    pub file_name: String,
    pub mime: String,
    pub payload: ArtifactPayload,
}

impl Artifact {
    pub fn from_bytes(file_name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime: mime.into(),
            payload: ArtifactPayload::Bytes(bytes),
        }
    }

    pub fn from_file(file_name: impl Into<String>, mime: impl Into<String>, path: PathBuf) -> Self {
        Self {
            file_name: file_name.into(),
            mime: mime.into(),
            payload: ArtifactPayload::File(path),
        }
    }

    pub fn file_path(&self) -> Option<&Path> {
        match &self.payload {
            ArtifactPayload::File(p) => Some(p),
            ArtifactPayload::Bytes(_) => None,
        }
    }
}

/// `{department}-{ts_millis}.{ext}`; `post` stands in for a missing department.
pub fn artifact_file_name(department: Option<&str>, ts_millis: u64, ext: &str) -> String {
    let name = department
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(FALLBACK_NAME);
    format!("{name}-{ts_millis}.{}", ext.trim_start_matches('.'))
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ShareError {
    /// The user dismissed the share action.
    #[error("share cancelled")]
    Cancelled,
    #[error("share failed: {0}")]
    Failed(String),
}

/// Platform share action.
pub trait ShareTarget {
    fn can_share(&self, artifact: &Artifact) -> bool;
    fn share(&self, artifact: &Artifact) -> Result<(), ShareError>;
}

/// Shares by handing the artifact's file path to an external program.
///
/// Exit status 0 is success, 130 (interrupted) counts as a cancel, anything else is a failure.
#[derive(Clone, Debug)]
pub struct CommandShareTarget {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandShareTarget {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

impl ShareTarget for CommandShareTarget {
    fn can_share(&self, artifact: &Artifact) -> bool {
        !self.program.is_empty() && artifact.file_path().is_some_and(Path::exists)
    }

    fn share(&self, artifact: &Artifact) -> Result<(), ShareError> {
        let path = artifact
            .file_path()
            .ok_or_else(|| ShareError::Failed("artifact is not on disk".to_owned()))?;
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .stdin(Stdio::null())
            .status()
            .map_err(|e| ShareError::Failed(format!("failed to run '{}': {e}", self.program)))?;
        match status.code() {
            Some(0) => Ok(()),
            Some(130) => Err(ShareError::Cancelled),
            _ => Err(ShareError::Failed(format!(
                "'{}' exited with status {status}",
                self.program
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    #[default]
    Download,
    Share,
}

/// How an artifact ended up being delivered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Delivered {
    Downloaded(PathBuf),
    Shared,
    /// The user cancelled the share action; nothing else happens.
    ShareCancelled,
}

/// Deliver `artifact` via share or download.
///
/// A failed or unavailable share degrades to a download into `dir`. A cancelled share does not.
#[tracing::instrument(level = "debug", skip(artifact, share), fields(file = %artifact.file_name))]
pub fn deliver(
    artifact: &Artifact,
    mode: DeliveryMode,
    share: Option<&dyn ShareTarget>,
    dir: &Path,
) -> BrandframeResult<Delivered> {
    if mode == DeliveryMode::Share {
        match share.filter(|s| s.can_share(artifact)) {
            Some(target) => match target.share(artifact) {
                Ok(()) => {
                    tracing::info!(file = %artifact.file_name, "artifact shared");
                    return Ok(Delivered::Shared);
                }
                Err(ShareError::Cancelled) => {
                    tracing::info!(file = %artifact.file_name, "share cancelled by user");
                    return Ok(Delivered::ShareCancelled);
                }
                Err(ShareError::Failed(msg)) => {
                    let err = BrandframeError::delivery(msg);
                    tracing::warn!(error = %err, "share failed, falling back to download");
                }
            },
            None => {
                tracing::warn!(
                    file = %artifact.file_name,
                    "no share target for artifact, falling back to download"
                );
            }
        }
    }
    download(artifact, dir).map(Delivered::Downloaded)
}

/// Write the artifact into `dir` under its file name.
pub fn download(artifact: &Artifact, dir: &Path) -> BrandframeResult<PathBuf> {
    let dest = dir.join(&artifact.file_name);
    ensure_parent_dir(&dest)?;
    match &artifact.payload {
        ArtifactPayload::Bytes(bytes) => std::fs::write(&dest, bytes).map_err(|e| {
            BrandframeError::evaluation(format!("failed to write '{}': {e}", dest.display()))
        })?,
        ArtifactPayload::File(src) => {
            if !same_file(src, &dest) {
                std::fs::copy(src, &dest).map_err(|e| {
                    BrandframeError::evaluation(format!(
                        "failed to copy '{}' to '{}': {e}",
                        src.display(),
                        dest.display()
                    ))
                })?;
            }
        }
    }
    tracing::info!(path = %dest.display(), "artifact downloaded");
    Ok(dest)
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/delivery.rs"]
mod tests;
