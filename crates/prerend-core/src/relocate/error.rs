use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelocationError {
    #[error("failed to read build root {}: {source}", path.display())]
    ReadRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create assets directory {}: {source}", path.display())]
    CreateAssets {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("refusing to overwrite existing entry {}", path.display())]
    Collision { path: PathBuf },

    #[error("failed to move {} to {} after moving {moved} entries: {source}", from.display(), to.display())]
    Move {
        from: PathBuf,
        to: PathBuf,
        moved: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("no snapshot captured for route '{route}'")]
    MissingSnapshot { route: String },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RelocationError {
    /// `true` for failures of the snapshot-writing half of the relocator.
    pub fn is_write(&self) -> bool {
        matches!(self, Self::MissingSnapshot { .. } | Self::Write { .. })
    }
}
