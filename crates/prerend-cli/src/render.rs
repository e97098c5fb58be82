use std::sync::Arc;

use anyhow::{Context, Result, bail};
use prerend_core::{
    pipeline::{Pipeline, PipelineReport},
    snapshot::HttpSource,
};
use prerend_exec::{CommandTask, ProcessController};
use prerend_model::{BuildMode, PipelineSpec, RenderEnv};
use prerend_observe::PipelineLogger;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::steps::{build_steps, resolve_version};

/// Resolve the build mode and version into the environment handed to children.
pub async fn render_env(production: bool) -> RenderEnv {
    let env = RenderEnv::new(BuildMode::from_production_flag(production));
    match resolve_version(std::env::var("SOURCE_VERSION").ok()).await {
        Some(version) => env.with_version(version),
        None => env,
    }
}

/// Assemble the pipeline for `spec` with the OS process launcher and HTTP source.
///
/// Cancelling `cancel` kills the running step and skips the rest.
pub fn pipeline(
    spec: &PipelineSpec,
    env: &RenderEnv,
    cancel: CancellationToken,
) -> Result<Pipeline> {
    let source = HttpSource::new(spec.server.request_timeout())
        .context("failed to build HTTP client")?
        .expect_statuses(&spec.server.expect_status);

    let mut builder = Pipeline::builder()
        .launcher(Arc::new(ProcessController::new()))
        .server(spec.server.command.clone(), env.server_env())
        .ready_marker(&spec.server.ready_marker)
        .ready_timeout(spec.server.ready_timeout())
        .source(Arc::new(source))
        .base_url(&spec.server.base_url)
        .assets_dir(&spec.assets_dir)
        .build_root(&spec.build_root)
        .routes(spec.routes.clone())
        .observer(Arc::new(PipelineLogger))
        .cancel_token(cancel);

    for (stage, task) in build_steps(spec, &env.build_env()) {
        builder = builder.step(stage, task);
    }
    Ok(builder.build()?)
}

pub async fn render(
    spec: &PipelineSpec,
    env: &RenderEnv,
    cancel: CancellationToken,
) -> Result<PipelineReport> {
    info!(mode = %env.mode, version = ?env.version, "rendering");

    let report = pipeline(spec, env, cancel)?.run().await?;
    for page in &report.written {
        info!(page = %page.display(), "page written");
    }
    Ok(report)
}

/// Render, then hand the result to the deploy command.
pub async fn deploy(
    spec: &PipelineSpec,
    env: &RenderEnv,
    cancel: CancellationToken,
) -> Result<PipelineReport> {
    let Some(command) = spec.deploy.clone() else {
        bail!("no deploy command configured");
    };

    let report = render(spec, env, cancel.child_token()).await?;
    CommandTask::new("deploy", command)
        .with_env(env.build_env())
        .run(cancel)
        .await
        .context("deploy failed")?;
    info!("deploy finished");
    Ok(report)
}
