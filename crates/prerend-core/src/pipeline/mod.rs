//! Prerender orchestration: steps, server lifecycle, snapshots, relocation.
//!
//! A run executes the configured steps fail-fast, starts the server, waits
//! for readiness, captures every route while the build output is moved into
//! the assets directory, writes the captured pages, and stops the server.
//! Once the server has been started it is stopped on every exit path.
mod error;
pub use error::PipelineError;

mod event;
pub use event::{PipelineEvent, PipelineObserver};
use event::StateTracker;

mod state;
pub use state::PipelineState;

use std::{
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};

use prerend_model::{CommandSpec, Env, ModelError, RouteMap, Stage};
use taskvisor::TaskRef;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::{
    relocate::{ArtifactRelocator, Relocation},
    server::{MarkerProbe, ReadinessProbe, ServerError, ServerGuard, ServerLauncher},
    snapshot::{RouteSnapshotFetcher, SnapshotSource},
    task::TaskSequencer,
};

/// Default time allowed between spawning the server and its readiness line.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(60);

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub assets_dir: PathBuf,
    /// Number of build-output entries moved into `assets_dir`.
    pub relocated: usize,
    /// Rendered pages, in route order.
    pub written: Vec<PathBuf>,
    pub elapsed: Duration,
}

/// One configured prerender run. Build with [`Pipeline::builder`].
pub struct Pipeline {
    steps: Vec<(Stage, TaskRef)>,
    sequencer: TaskSequencer,
    launcher: Arc<dyn ServerLauncher>,
    server: CommandSpec,
    server_env: Env,
    probe: Arc<dyn ReadinessProbe>,
    ready_timeout: Duration,
    fetcher: RouteSnapshotFetcher,
    base_url: String,
    relocator: ArtifactRelocator,
    build_root: PathBuf,
    routes: RouteMap,
    observers: Vec<Arc<dyn PipelineObserver>>,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn routes(&self) -> &RouteMap {
        &self.routes
    }

    /// Execute the run. The returned outcome is also the single terminal
    /// event delivered to observers.
    #[instrument(level = "info", skip(self), fields(root = %self.build_root.display()))]
    pub async fn run(&self) -> Result<PipelineReport, PipelineError> {
        let started = Instant::now();
        let mut tracker = StateTracker::new(&self.observers);

        let result = self.drive(&mut tracker, started).await;
        tracker.complete(&result);

        match &result {
            Ok(report) => info!(
                pages = report.written.len(),
                elapsed_ms = report.elapsed.as_millis() as u64,
                "prerender finished"
            ),
            Err(e) => warn!(stage = %e.stage(), kind = e.kind(), error = %e, "prerender failed"),
        }
        result
    }

    async fn drive(
        &self,
        tracker: &mut StateTracker<'_>,
        started: Instant,
    ) -> Result<PipelineReport, PipelineError> {
        let tasks: Vec<TaskRef> = self.steps.iter().map(|(_, t)| Arc::clone(t)).collect();
        let stages: Vec<Stage> = self.steps.iter().map(|(s, _)| *s).collect();

        self.sequencer
            .run_with(&tasks, |idx, _| tracker.enter(stages[idx].into()))
            .await
            .map_err(|failure| PipelineError::Task {
                stage: tracker.current(),
                failure,
            })?;

        tracker.enter(PipelineState::Starting);
        let handle = self
            .launcher
            .start(&self.server, &self.server_env)
            .map_err(PipelineError::Spawn)?;
        let mut guard = ServerGuard::new(handle);
        info!(pid = ?guard.id(), command = %self.server, "server started");

        let rendered = self.render(&mut guard, tracker).await;

        tracker.enter(PipelineState::Stopping);
        if let Err(e) = guard.release() {
            warn!(error = %e, "failed to stop server");
        }

        let (relocation, written) = rendered?;
        Ok(PipelineReport {
            assets_dir: relocation.assets_dir().to_path_buf(),
            relocated: relocation.moved().len(),
            written,
            elapsed: started.elapsed(),
        })
    }

    /// Everything that happens while the server is alive.
    async fn render(
        &self,
        guard: &mut ServerGuard,
        tracker: &mut StateTracker<'_>,
    ) -> Result<(Relocation, Vec<PathBuf>), PipelineError> {
        tracker.enter(PipelineState::AwaitingReady);
        let handle = guard.handle_mut();
        handle
            .await_ready(self.probe.as_ref(), self.ready_timeout)
            .await
            .map_err(|e| match e {
                ServerError::ReadyTimeout { timeout } => PipelineError::ReadyTimeout {
                    timeout,
                    stderr_tail: handle.stderr_tail(),
                },
                other => PipelineError::ServerExited(other),
            })?;
        info!("server is ready");

        // Disjoint resources: the network for snapshots, the filesystem for relocation.
        tracker.enter(PipelineState::Snapshotting);
        let (relocated, fetched) = tokio::join!(
            self.relocator.relocate(&self.build_root),
            self.fetcher.fetch_all(&self.base_url, &self.routes),
        );
        let snapshots = fetched?;
        let relocation = relocated?;
        tracker.enter(PipelineState::Relocated);

        tracker.enter(PipelineState::Writing);
        let written = self
            .relocator
            .write_snapshots(&relocation, &snapshots, &self.routes)
            .await?;
        Ok((relocation, written))
    }
}

/// Builder for [`Pipeline`].
///
/// A launcher, a snapshot source, a server command and at least one route
/// are required; everything else has a default.
pub struct PipelineBuilder {
    steps: Vec<(Stage, TaskRef)>,
    launcher: Option<Arc<dyn ServerLauncher>>,
    server: Option<CommandSpec>,
    server_env: Env,
    probe: Arc<dyn ReadinessProbe>,
    ready_timeout: Duration,
    source: Option<Arc<dyn SnapshotSource>>,
    base_url: String,
    relocator: ArtifactRelocator,
    build_root: PathBuf,
    routes: RouteMap,
    observers: Vec<Arc<dyn PipelineObserver>>,
    cancel: CancellationToken,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self {
            steps: Vec::new(),
            launcher: None,
            server: None,
            server_env: Env::default(),
            probe: Arc::new(MarkerProbe::new("Server started")),
            ready_timeout: DEFAULT_READY_TIMEOUT,
            source: None,
            base_url: "http://localhost:8000".into(),
            relocator: ArtifactRelocator::default(),
            build_root: PathBuf::from("build"),
            routes: RouteMap::default(),
            observers: Vec::new(),
            cancel: CancellationToken::new(),
        }
    }
}

impl PipelineBuilder {
    /// Append a step; steps run in the order they are added.
    pub fn step(mut self, stage: Stage, task: TaskRef) -> Self {
        self.steps.push((stage, task));
        self
    }

    pub fn launcher(mut self, launcher: Arc<dyn ServerLauncher>) -> Self {
        self.launcher = Some(launcher);
        self
    }

    /// Server command plus the environment overrides it is started with.
    pub fn server(mut self, command: CommandSpec, env: Env) -> Self {
        self.server = Some(command);
        self.server_env = env;
        self
    }

    pub fn probe(mut self, probe: Arc<dyn ReadinessProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn ready_marker(self, marker: impl Into<String>) -> Self {
        self.probe(Arc::new(MarkerProbe::new(marker)))
    }

    pub fn ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    pub fn source(mut self, source: Arc<dyn SnapshotSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn assets_dir(mut self, name: impl Into<String>) -> Self {
        self.relocator = ArtifactRelocator::new(name);
        self
    }

    pub fn build_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.build_root = root.into();
        self
    }

    pub fn routes(mut self, routes: RouteMap) -> Self {
        self.routes = routes;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Token that aborts the step phase when cancelled.
    pub fn cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn build(self) -> Result<Pipeline, ModelError> {
        let missing = |what: &str| ModelError::Invalid(format!("pipeline: {what} is not set"));

        let launcher = self.launcher.ok_or_else(|| missing("server launcher"))?;
        let server = self.server.ok_or_else(|| missing("server command"))?;
        let source = self.source.ok_or_else(|| missing("snapshot source"))?;
        server.validate()?;
        if self.routes.is_empty() {
            return Err(missing("route map"));
        }

        Ok(Pipeline {
            steps: self.steps,
            sequencer: TaskSequencer::with_cancel(self.cancel),
            launcher,
            server,
            server_env: self.server_env,
            probe: self.probe,
            ready_timeout: self.ready_timeout,
            fetcher: RouteSnapshotFetcher::new(source),
            base_url: self.base_url,
            relocator: self.relocator,
            build_root: self.build_root,
            routes: self.routes,
            observers: self.observers,
        })
    }
}
