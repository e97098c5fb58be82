pub mod pipeline;
pub mod relocate;
pub mod server;
pub mod snapshot;
pub mod task;

pub mod prelude {
    pub use crate::pipeline::{
        Pipeline, PipelineError, PipelineEvent, PipelineReport, PipelineObserver, PipelineState,
    };
    pub use crate::relocate::{ArtifactRelocator, CleanTask, Relocation, RelocationError};
    pub use crate::server::{
        MarkerProbe, ReadinessProbe, ServerError, ServerGuard, ServerHandle, ServerLauncher,
    };
    pub use crate::snapshot::{
        FetchCause, FetchError, HttpSource, RouteSnapshotFetcher, SnapshotResult, SnapshotSource,
    };
    pub use crate::task::{TaskFailure, TaskSequencer};
}
