//! Build-output reorganisation for static hosting.
//!
//! The original build output is moved into an assets subdirectory, then each
//! rendered page is written at the build root under its configured name.
mod error;
pub use error::RelocationError;

mod clean;
pub use clean::CleanTask;

use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
};

use prerend_model::RouteMap;
use tokio::fs;
use tracing::{debug, info, instrument};

use crate::snapshot::SnapshotResult;

/// Default name of the assets subdirectory.
pub const DEFAULT_ASSETS_DIR: &str = "assets";

/// Proof that the build root has been relocated.
///
/// Only [`ArtifactRelocator::relocate`] creates one, and
/// [`ArtifactRelocator::write_snapshots`] requires it, so pages cannot be
/// written before the original output has been moved out of the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relocation {
    build_root: PathBuf,
    assets_dir: PathBuf,
    moved: Vec<PathBuf>,
}

impl Relocation {
    pub fn build_root(&self) -> &Path {
        &self.build_root
    }

    pub fn assets_dir(&self) -> &Path {
        &self.assets_dir
    }

    /// Entry names moved into the assets directory, sorted.
    pub fn moved(&self) -> &[PathBuf] {
        &self.moved
    }
}

#[derive(Debug, Clone)]
pub struct ArtifactRelocator {
    assets_dir: String,
}

impl Default for ArtifactRelocator {
    fn default() -> Self {
        Self::new(DEFAULT_ASSETS_DIR)
    }
}

impl ArtifactRelocator {
    pub fn new(assets_dir: impl Into<String>) -> Self {
        Self {
            assets_dir: assets_dir.into(),
        }
    }

    pub fn assets_dir_name(&self) -> &str {
        &self.assets_dir
    }

    /// Move every entry of `build_root` into its assets subdirectory.
    ///
    /// All targets are checked before the first move, so a name collision
    /// leaves the build root untouched. A failing move stops the operation
    /// and reports how many entries were already moved; nothing is retried.
    #[instrument(level = "debug", skip(self), fields(assets = %self.assets_dir))]
    pub async fn relocate(&self, build_root: &Path) -> Result<Relocation, RelocationError> {
        let assets = build_root.join(&self.assets_dir);

        let mut names = Vec::new();
        let mut dir = fs::read_dir(build_root)
            .await
            .map_err(|source| RelocationError::ReadRoot {
                path: build_root.to_path_buf(),
                source,
            })?;
        while let Some(entry) =
            dir.next_entry()
                .await
                .map_err(|source| RelocationError::ReadRoot {
                    path: build_root.to_path_buf(),
                    source,
                })?
        {
            let name = entry.file_name();
            if name.as_os_str() != OsStr::new(&self.assets_dir) {
                names.push(name);
            }
        }
        names.sort();

        fs::create_dir_all(&assets)
            .await
            .map_err(|source| RelocationError::CreateAssets {
                path: assets.clone(),
                source,
            })?;

        for name in &names {
            let target = assets.join(name);
            if fs::symlink_metadata(&target).await.is_ok() {
                return Err(RelocationError::Collision { path: target });
            }
        }

        let mut moved = Vec::with_capacity(names.len());
        for name in names {
            let from = build_root.join(&name);
            let to = assets.join(&name);
            if let Err(source) = fs::rename(&from, &to).await {
                return Err(RelocationError::Move {
                    from,
                    to,
                    moved: moved.len(),
                    source,
                });
            }
            debug!(entry = ?name, "moved into assets");
            moved.push(PathBuf::from(name));
        }

        info!(
            moved = moved.len(),
            assets = %assets.display(),
            "build output relocated"
        );
        Ok(Relocation {
            build_root: build_root.to_path_buf(),
            assets_dir: assets,
            moved,
        })
    }

    /// Write each route's body to its output file under the relocated build root.
    ///
    /// Every route must have a snapshot; this is checked before anything is
    /// written. Existing files are overwritten.
    #[instrument(level = "debug", skip_all, fields(root = %relocation.build_root.display()))]
    pub async fn write_snapshots(
        &self,
        relocation: &Relocation,
        snapshots: &SnapshotResult,
        routes: &RouteMap,
    ) -> Result<Vec<PathBuf>, RelocationError> {
        let mut pages = Vec::with_capacity(routes.len());
        for (route, output) in routes.iter() {
            let body = snapshots
                .get(route)
                .ok_or_else(|| RelocationError::MissingSnapshot {
                    route: route.to_string(),
                })?;
            pages.push((route, relocation.build_root.join(output), body));
        }

        let mut written = Vec::with_capacity(pages.len());
        for (route, path, body) in pages {
            if let Some(parent) = path.parent() {
                if let Err(source) = fs::create_dir_all(parent).await {
                    return Err(RelocationError::Write { path, source });
                }
            }
            if let Err(source) = fs::write(&path, body).await {
                return Err(RelocationError::Write { path, source });
            }
            debug!(route, path = %path.display(), bytes = body.len(), "page written");
            written.push(path);
        }

        info!(pages = written.len(), "rendered pages written");
        Ok(written)
    }
}
