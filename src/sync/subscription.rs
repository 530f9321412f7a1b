//! Change feed → reload loop.

use std::future::Future;

use tokio::task::JoinHandle;

use crate::remote::ChangeFeed;

/// A running reload loop. Dropping it stops the loop and releases the feed.
#[derive(Debug)]
pub struct SubscriptionGuard {
    table: String,
    task: Option<JoinHandle<()>>,
}

impl SubscriptionGuard {
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the loop and wait until the feed has been released.
    pub async fn stop(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
            tracing::debug!(table = %self.table, "Subscription stopped");
        }
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Run `reload` once per burst of change events on `feed`.
///
/// Events that queue up while a reload is running are folded into the next
/// reload instead of triggering one each.
pub fn spawn_reload_loop<F, Fut>(mut feed: ChangeFeed, reload: F) -> SubscriptionGuard
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    let table = feed.table().to_string();
    let task = tokio::spawn(async move {
        while let Some(event) = feed.next().await {
            let coalesced = feed.drain_pending();
            tracing::debug!(
                table = %event.table,
                kind = event.kind.as_str(),
                coalesced,
                "Change received, reloading"
            );
            reload().await;
        }
        tracing::debug!(table = %feed.table(), "Change feed closed");
    });
    SubscriptionGuard {
        table,
        task: Some(task),
    }
}
