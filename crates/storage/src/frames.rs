//! Directory-backed frame persistence.

use std::path::{Path, PathBuf};

use formcheck_analysis_core::event_log::FrameStore;
use formcheck_common::error::{FormcheckError, FormcheckResult};
use formcheck_pose_model::frame::{FrameHandle, FrameSource};

/// Saves evidence frames as files inside one directory.
#[derive(Debug, Clone)]
pub struct DirectoryFrameStore {
    dir: PathBuf,
}

impl DirectoryFrameStore {
    /// Store rooted at `dir`. The directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where a frame saved under `name` ends up.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

impl FrameStore for DirectoryFrameStore {
    fn save(&self, frame: &FrameHandle, name: &str) -> FormcheckResult<()> {
        if name.contains('/') || name.contains('\\') || name.is_empty() {
            return Err(FormcheckError::persistence(format!(
                "invalid frame name '{name}'"
            )));
        }

        std::fs::create_dir_all(&self.dir).map_err(|e| {
            FormcheckError::persistence(format!("cannot create {}: {e}", self.dir.display()))
        })?;
        let dest = self.path_for(name);

        match &frame.source {
            FrameSource::Encoded(bytes) => std::fs::write(&dest, bytes).map_err(|e| {
                FormcheckError::persistence(format!("cannot write {}: {e}", dest.display()))
            })?,
            FrameSource::File(src) => {
                std::fs::copy(src, &dest).map_err(|e| {
                    FormcheckError::persistence(format!(
                        "cannot copy {} to {}: {e}",
                        src.display(),
                        dest.display()
                    ))
                })?;
            }
            FrameSource::Absent => {
                return Err(FormcheckError::persistence(format!(
                    "frame {} has no image data",
                    frame.index
                )))
            }
        }

        tracing::debug!(frame = frame.index, path = %dest.display(), "Saved event frame");
        Ok(())
    }
}
