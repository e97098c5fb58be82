use std::path::{Path, PathBuf};

use taskvisor::{TaskError, TaskFn, TaskRef};
use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Empties a build directory, creating it when it does not exist yet.
#[derive(Debug, Clone)]
pub struct CleanTask {
    name: String,
    root: PathBuf,
}

impl CleanTask {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
        }
    }

    pub fn into_task(self) -> TaskRef {
        let root = self.root;
        TaskFn::arc(self.name, move |ctx: CancellationToken| {
            let root = root.clone();
            async move {
                if ctx.is_cancelled() {
                    return Err(TaskError::Canceled);
                }
                let removed = empty_dir(&root).await.map_err(|e| TaskError::Fail {
                    reason: format!("failed to clean '{}': {e}", root.display()),
                })?;
                debug!(root = %root.display(), removed, "build root emptied");
                Ok(())
            }
        })
    }
}

async fn empty_dir(root: &Path) -> std::io::Result<usize> {
    if fs::symlink_metadata(root).await.is_err() {
        fs::create_dir_all(root).await?;
        return Ok(0);
    }

    let mut removed = 0usize;
    let mut dir = fs::read_dir(root).await?;
    while let Some(entry) = dir.next_entry().await? {
        let path = entry.path();
        if entry.file_type().await?.is_dir() {
            fs::remove_dir_all(&path).await?;
        } else {
            fs::remove_file(&path).await?;
        }
        removed += 1;
    }
    Ok(removed)
}
