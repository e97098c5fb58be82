use tracing::{debug, warn};

use crate::server::{ServerError, ServerHandle};

/// Scoped ownership of a started server.
///
/// The server is stopped exactly once: by [`ServerGuard::release`] on the
/// normal path, or by `Drop` when the owner unwinds or its future is dropped.
pub struct ServerGuard {
    handle: Box<dyn ServerHandle>,
    released: bool,
}

impl ServerGuard {
    pub fn new(handle: Box<dyn ServerHandle>) -> Self {
        Self {
            handle,
            released: false,
        }
    }

    pub fn id(&self) -> Option<u32> {
        self.handle.id()
    }

    pub fn handle_mut(&mut self) -> &mut dyn ServerHandle {
        self.handle.as_mut()
    }

    /// Stop the server and give up ownership.
    pub fn release(mut self) -> Result<(), ServerError> {
        self.released = true;
        debug!(pid = ?self.handle.id(), "stopping server");
        self.handle.stop()
    }
}

impl Drop for ServerGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        warn!(pid = ?self.handle.id(), "server guard dropped without release; stopping server");
        if let Err(e) = self.handle.stop() {
            warn!(error = %e, "failed to stop server on drop");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };

    use async_trait::async_trait;

    use super::*;
    use crate::server::ReadinessProbe;

    struct Counting {
        stops: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ServerHandle for Counting {
        fn id(&self) -> Option<u32> {
            Some(42)
        }

        fn is_ready(&self) -> bool {
            false
        }

        async fn await_ready(
            &mut self,
            _probe: &dyn ReadinessProbe,
            timeout: Duration,
        ) -> Result<(), ServerError> {
            Err(ServerError::ReadyTimeout { timeout })
        }

        fn stop(&mut self) -> Result<(), ServerError> {
            self.stops.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn is_stopped(&self) -> bool {
            self.stops.load(Ordering::SeqCst) > 0
        }

        fn stderr_tail(&self) -> Vec<String> {
            Vec::new()
        }
    }

    fn guard() -> (ServerGuard, Arc<AtomicUsize>) {
        let stops = Arc::new(AtomicUsize::new(0));
        let handle = Counting {
            stops: Arc::clone(&stops),
        };
        (ServerGuard::new(Box::new(handle)), stops)
    }

    #[test]
    fn release_stops_once_and_drop_does_not_repeat() {
        let (guard, stops) = guard();
        guard.release().unwrap();
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_without_release_stops() {
        let (guard, stops) = guard();
        drop(guard);
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panic_while_holding_guard_still_stops() {
        let (guard, stops) = guard();
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _guard = guard;
            panic!("render blew up");
        }));
        assert!(res.is_err());
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }
}
