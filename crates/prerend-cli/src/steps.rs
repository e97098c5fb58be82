use prerend_core::relocate::CleanTask;
use prerend_exec::CommandTask;
use prerend_model::{Env, PipelineSpec, Stage, StepKind};
use taskvisor::TaskRef;
use tokio::process::Command;
use tracing::{debug, warn};

/// Turn the configured steps into tasks, each external tool getting `env`.
pub fn build_steps(spec: &PipelineSpec, env: &Env) -> Vec<(Stage, TaskRef)> {
    spec.steps
        .iter()
        .map(|step| {
            let task: TaskRef = match &step.kind {
                StepKind::Exec(command) => CommandTask::new(&step.name, command.clone())
                    .with_env(env.clone())
                    .into_task(),
                StepKind::Clean => CleanTask::new(&step.name, &spec.build_root).into_task(),
            };
            (step.stage, task)
        })
        .collect()
}

/// Version stamped into the build as `appVersion`.
///
/// `source_version` (the `SOURCE_VERSION` variable set by hosts that build
/// without a git checkout) wins; otherwise `git rev-parse HEAD` is asked.
pub async fn resolve_version(source_version: Option<String>) -> Option<String> {
    if let Some(v) = source_version.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        debug!(version = %v, "version taken from SOURCE_VERSION");
        return Some(v);
    }

    match Command::new("git").args(["rev-parse", "HEAD"]).output().await {
        Ok(out) if out.status.success() => {
            let v = String::from_utf8_lossy(&out.stdout).trim().to_string();
            Some(v).filter(|v| !v.is_empty())
        }
        Ok(out) => {
            warn!(
                status = %out.status,
                stderr = %String::from_utf8_lossy(&out.stderr).trim(),
                "git rev-parse failed; building without appVersion"
            );
            None
        }
        Err(e) => {
            warn!(error = %e, "git unavailable; building without appVersion");
            None
        }
    }
}
