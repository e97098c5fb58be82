use std::time::Instant;

use taskvisor::{TaskError, TaskRef};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use crate::task::TaskFailure;

/// Runs tasks one after another and stops at the first failure.
///
/// Tasks never overlap: each is awaited to completion before the next one
/// is started, and nothing after a failed task is attempted. Every task gets
/// a child of the sequencer's token, so cancelling it stops the running
/// task and prevents the rest from starting.
#[derive(Debug, Default, Clone)]
pub struct TaskSequencer {
    cancel: CancellationToken,
}

impl TaskSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub async fn run(&self, tasks: &[TaskRef]) -> Result<(), TaskFailure> {
        self.run_with(tasks, |_, _| {}).await
    }

    /// Like [`TaskSequencer::run`], calling `before(index, name)` right before each task starts.
    #[instrument(level = "debug", skip_all, fields(tasks = tasks.len()))]
    pub async fn run_with<F>(&self, tasks: &[TaskRef], mut before: F) -> Result<(), TaskFailure>
    where
        F: FnMut(usize, &str) + Send,
    {
        for (idx, task) in tasks.iter().enumerate() {
            let name = task.name().to_string();
            if self.cancel.is_cancelled() {
                return Err(TaskFailure {
                    task: name,
                    cause: TaskError::Canceled,
                });
            }
            before(idx, &name);

            let started = Instant::now();
            info!(task = %name, "task started");

            if let Err(cause) = task.spawn(self.cancel.child_token()).await {
                error!(task = %name, error = %cause, "task failed");
                return Err(TaskFailure { task: name, cause });
            }
            info!(
                task = %name,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "task finished"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Arc, Mutex,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };

    use taskvisor::TaskFn;

    use super::*;

    fn spy(name: &'static str, calls: Arc<AtomicUsize>, fail: bool) -> TaskRef {
        TaskFn::arc(name, move |_ctx: CancellationToken| {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                if fail {
                    Err(TaskError::Fail {
                        reason: "boom".into(),
                    })
                } else {
                    Ok(())
                }
            }
        })
    }

    #[tokio::test]
    async fn runs_every_task_once_in_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let tasks: Vec<TaskRef> = ["lint", "test", "build"]
            .into_iter()
            .map(|name| {
                let order = Arc::clone(&order);
                let task: TaskRef = TaskFn::arc(name, move |_ctx: CancellationToken| {
                    let order = Arc::clone(&order);
                    async move {
                        order.lock().unwrap().push(name);
                        Ok::<(), TaskError>(())
                    }
                });
                task
            })
            .collect();

        TaskSequencer::new().run(&tasks).await.unwrap();
        assert_eq!(*order.lock().unwrap(), vec!["lint", "test", "build"]);
    }

    #[tokio::test]
    async fn tasks_after_a_failure_are_never_started() {
        for failing in 0..4 {
            let counters: Vec<Arc<AtomicUsize>> =
                (0..4).map(|_| Arc::new(AtomicUsize::new(0))).collect();
            let names = ["verify", "test", "clean", "build"];
            let tasks: Vec<TaskRef> = (0..4)
                .map(|i| spy(names[i], Arc::clone(&counters[i]), i == failing))
                .collect();

            let failure = TaskSequencer::new().run(&tasks).await.unwrap_err();
            assert_eq!(failure.task, names[failing]);

            for (i, counter) in counters.iter().enumerate() {
                let expected = usize::from(i <= failing);
                assert_eq!(
                    counter.load(Ordering::SeqCst),
                    expected,
                    "task {i} with failure at {failing}"
                );
            }
        }
    }

    #[tokio::test]
    async fn before_hook_sees_each_started_task() {
        let calls = Arc::new(AtomicUsize::new(0));
        let tasks = vec![
            spy("a", Arc::clone(&calls), false),
            spy("b", Arc::clone(&calls), true),
            spy("c", Arc::clone(&calls), false),
        ];

        let mut seen = Vec::new();
        let res = TaskSequencer::new()
            .run_with(&tasks, |idx, name| seen.push((idx, name.to_string())))
            .await;

        assert!(res.is_err());
        assert_eq!(seen, vec![(0, "a".to_string()), (1, "b".to_string())]);
    }

    #[tokio::test]
    async fn empty_sequence_succeeds() {
        assert!(TaskSequencer::new().run(&[]).await.is_ok());
    }

    #[tokio::test]
    async fn failure_names_the_task_and_keeps_its_cause() {
        let tasks: Vec<TaskRef> = vec![TaskFn::arc("eslint", |_ctx: CancellationToken| async {
            Err::<(), _>(TaskError::Fail {
                reason: "exit code 2".into(),
            })
        })];
        let failure = TaskSequencer::new().run(&tasks).await.unwrap_err();
        assert_eq!(failure.task, "eslint");
        assert!(failure.to_string().starts_with("task 'eslint' failed: "));
        assert!(matches!(failure.cause, TaskError::Fail { ref reason } if reason == "exit code 2"));
    }

    #[tokio::test]
    async fn cancelling_stops_the_running_task_and_skips_the_rest() {
        let later = Arc::new(AtomicUsize::new(0));
        let tasks = vec![
            TaskFn::arc("build", |ctx: CancellationToken| async move {
                ctx.cancelled().await;
                Err::<(), _>(TaskError::Canceled)
            }),
            spy("copy", Arc::clone(&later), false),
        ];

        let sequencer = TaskSequencer::new();
        let token = sequencer.cancel_token().clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });

        let failure = tokio::time::timeout(Duration::from_secs(5), sequencer.run(&tasks))
            .await
            .unwrap()
            .unwrap_err();
        assert_eq!(failure.task, "build");
        assert!(matches!(failure.cause, TaskError::Canceled));
        assert_eq!(later.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancelled_sequencer_starts_nothing() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let failure = TaskSequencer::with_cancel(cancel)
            .run(&[spy("lint", Arc::clone(&calls), false)])
            .await
            .unwrap_err();
        assert!(matches!(failure.cause, TaskError::Canceled));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
