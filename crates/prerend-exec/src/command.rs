use std::{process::Stdio, sync::Arc};

use prerend_model::{CommandSpec, Env};
use taskvisor::{TaskError, TaskFn, TaskRef};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::{
    ExecError,
    output::{LogConfig, Sink, Stream, spawn_pump},
};

/// Build a `tokio` command from `spec`, with `overrides` layered over the
/// spec's own environment. Stdin is closed.
pub(crate) fn build_command(spec: &CommandSpec, overrides: &Env) -> Result<Command, ExecError> {
    spec.validate()
        .map_err(|e| ExecError::InvalidSpec(e.to_string()))?;

    let mut cmd = Command::new(&spec.command);
    cmd.args(&spec.args);
    if let Some(cwd) = &spec.cwd {
        cmd.current_dir(cwd);
    }
    for (key, value) in spec.env.merged(overrides).resolved() {
        cmd.env(key, value);
    }
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    Ok(cmd)
}

/// Pipeline step that runs an external tool to completion.
///
/// Output is forwarded to the log; a non-zero exit or a terminating signal
/// fails the task. The child is killed when the step is cancelled or its
/// future is dropped.
#[derive(Debug, Clone)]
pub struct CommandTask {
    name: String,
    spec: CommandSpec,
    env: Env,
    log: LogConfig,
}

impl CommandTask {
    pub fn new(name: impl Into<String>, spec: CommandSpec) -> Self {
        Self {
            name: name.into(),
            spec,
            env: Env::default(),
            log: LogConfig::default(),
        }
    }

    /// Extra environment applied on top of the command's own.
    pub fn with_env(mut self, env: Env) -> Self {
        self.env = env;
        self
    }

    pub fn with_log(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn spec(&self) -> &CommandSpec {
        &self.spec
    }

    pub fn into_task(self) -> TaskRef {
        let name = self.name.clone();
        let step = Arc::new(self);
        TaskFn::arc(name, move |cancel: CancellationToken| {
            let step = Arc::clone(&step);
            async move { step.run(cancel).await }
        })
    }

    pub async fn run(&self, cancel: CancellationToken) -> Result<(), TaskError> {
        let mut cmd = build_command(&self.spec, &self.env)?;
        cmd.kill_on_drop(true);
        trace!(
            task = %self.name,
            command = %self.spec,
            cwd = ?self.spec.cwd,
            "spawning step"
        );

        let mut child = cmd.spawn().map_err(|e| TaskError::Fatal {
            reason: format!("spawn failed: '{}': {e}", self.spec),
        })?;

        let mut pumps = Vec::with_capacity(2);
        if let Some(out) = child.stdout.take() {
            pumps.push(spawn_pump(out, Stream::Stdout, self.name.clone(), self.log, Sink::Discard));
        }
        if let Some(err) = child.stderr.take() {
            pumps.push(spawn_pump(err, Stream::Stderr, self.name.clone(), self.log, Sink::Discard));
        }

        let status_fut = child.wait();
        let status = tokio::select! {
            res = status_fut => res.map_err(|e| TaskError::Fail {
                reason: format!("wait failed: {e}"),
            })?,
            _ = cancel.cancelled() => {
                debug!(task = %self.name, "cancellation requested; killing step");
                if let Err(e) = child.kill().await {
                    debug!(task = %self.name, error = %e, "failed to kill step");
                }
                return Err(TaskError::Canceled);
            }
        };

        for pump in pumps {
            // Drain what is left so the step's output precedes its result.
            if let Err(e) = pump.await {
                debug!(task = %self.name, error = %e, "output pump aborted");
            }
        }

        if status.success() {
            return Ok(());
        }
        match status.code() {
            Some(code) => Err(TaskError::Fail {
                reason: format!("process exited with non-zero code: {code}"),
            }),
            None => Err(TaskError::Fail {
                reason: "process terminated by signal".into(),
            }),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::{path::Path, time::Duration};

    use super::*;

    fn sh(script: &str) -> CommandSpec {
        CommandSpec::new("sh", ["-c", script])
    }

    async fn run(task: CommandTask) -> Result<(), TaskError> {
        task.run(CancellationToken::new()).await
    }

    fn late_marker(marker: &Path) -> CommandSpec {
        sh(&format!("sleep 1; touch '{}'", marker.display()))
    }

    #[tokio::test]
    async fn zero_exit_is_success() {
        run(CommandTask::new("lint", sh("echo linting; echo warn >&2")))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn non_zero_exit_is_reported_with_its_code() {
        let err = run(CommandTask::new("test", sh("exit 7"))).await.unwrap_err();
        assert!(matches!(err, TaskError::Fail { ref reason } if reason.ends_with("code: 7")));
    }

    #[tokio::test]
    async fn signal_termination_is_a_failure() {
        let err = run(CommandTask::new("build", sh("kill -TERM $$"))).await.unwrap_err();
        assert!(matches!(err, TaskError::Fail { ref reason } if reason.contains("signal")));
    }

    #[tokio::test]
    async fn missing_binary_fails_to_spawn() {
        let task = CommandTask::new("build", CommandSpec::new("prerend-no-such-tool", ["x"]));
        let err = run(task).await.unwrap_err();
        assert!(matches!(err, TaskError::Fatal { .. }));
    }

    #[tokio::test]
    async fn empty_command_is_rejected_before_spawn() {
        let task = CommandTask::new("noop", CommandSpec::new("  ", Vec::<String>::new()));
        let err = run(task).await.unwrap_err();
        assert!(matches!(err, TaskError::Fatal { .. }));
    }

    #[tokio::test]
    async fn overrides_win_over_the_spec_env() {
        let spec = sh(r#"test "$NODE_ENV" = production && test "$KEEP" = yes"#).with_env(
            Env::new().with("NODE_ENV", "development").with("KEEP", "yes"),
        );
        let task = CommandTask::new("build", spec).with_env(Env::new().with("NODE_ENV", "production"));
        run(task).await.unwrap();
    }

    #[tokio::test]
    async fn runs_in_the_configured_directory() {
        let dir = std::env::temp_dir();
        let mut spec = sh(r#"test "$(pwd -P)" = "$EXPECTED""#);
        let expected = dir.canonicalize().unwrap();
        spec.cwd = Some(dir);
        let task = CommandTask::new("pwd", spec)
            .with_env(Env::new().with("EXPECTED", expected.to_string_lossy().into_owned()));
        run(task).await.unwrap();
    }

    #[tokio::test]
    async fn cancelling_kills_the_child() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("finished");
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let err = CommandTask::new("build", late_marker(&marker))
            .run(cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::Canceled));

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn dropping_the_step_kills_the_child() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("finished");
        let task = CommandTask::new("build", late_marker(&marker)).into_task();

        let res = tokio::time::timeout(
            Duration::from_millis(100),
            task.spawn(CancellationToken::new()),
        )
        .await;
        assert!(res.is_err());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn task_carries_the_step_name() {
        let task = CommandTask::new("lint", sh("true")).into_task();
        assert_eq!(task.name(), "lint");
        task.spawn(CancellationToken::new()).await.unwrap();
    }
}
