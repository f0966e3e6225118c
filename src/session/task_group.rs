use std::future::Future;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::error::{Result, SessionError};

/// Units bound to one connection.
///
/// Every unit gets a child of the group token; `shutdown` cancels them all
/// and joins. `first_failure` resolves with the first unit error (or panic),
/// units that finish cleanly are simply reaped.
pub struct TaskGroup {
    tasks: JoinSet<(&'static str, Result<()>)>,
    cancel: CancellationToken,
}

impl TaskGroup {
    pub fn new(parent: &CancellationToken) -> Self {
        Self {
            tasks: JoinSet::new(),
            cancel: parent.child_token(),
        }
    }

    pub fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Spawn a unit; cancellation is a clean `Ok(())` exit
    pub fn spawn<F>(&mut self, name: &'static str, unit: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let cancel = self.cancel.clone();
        self.tasks.spawn(async move {
            let result = tokio::select! {
                _ = cancel.cancelled() => Ok(()),
                result = unit => result,
            };
            (name, result)
        });
        debug!("Spawned unit {}", name);
    }

    /// Wait for the first failing unit. Pends forever if none fails.
    pub async fn first_failure(&mut self) -> SessionError {
        loop {
            match self.tasks.join_next().await {
                Some(Ok((name, Ok(())))) => debug!("Unit {} finished", name),
                Some(Ok((name, Err(e)))) => {
                    error!("Unit {} failed: {}", name, e);
                    return e;
                }
                Some(Err(join_error)) => {
                    error!("Unit panicked: {}", join_error);
                    return SessionError::TaskPanicked(join_error.to_string());
                }
                None => std::future::pending::<()>().await,
            }
        }
    }

    /// Cancel every unit and wait for them to exit, aborting stragglers
    /// after `grace`
    pub async fn shutdown(mut self, grace: Duration) {
        self.cancel.cancel();

        let drained = tokio::time::timeout(grace, async {
            while let Some(joined) = self.tasks.join_next().await {
                if let Ok((name, Err(e))) = joined {
                    debug!("Unit {} exited with {} during shutdown", name, e);
                }
            }
        })
        .await;

        if drained.is_err() {
            warn!("Aborting {} units that ignored cancellation", self.tasks.len());
            self.tasks.abort_all();
            while self.tasks.join_next().await.is_some() {}
        }
    }
}
