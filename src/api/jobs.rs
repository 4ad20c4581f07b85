//! Background job queue: the HTTP layer enqueues long-running work here
//! and returns immediately, matching the daemon's sub-200ms response
//! budget for deploy/lifecycle endpoints.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

#[derive(Clone)]
pub struct JobQueue {
    sender: mpsc::UnboundedSender<Job>,
}

impl JobQueue {
    /// Spawns the dispatcher task. Jobs run concurrently; the channel
    /// only decouples "submitted" from "running" so callers never block
    /// on the work itself.
    pub fn spawn() -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Job>();

        tokio::spawn(async move {
            while let Some(job) = receiver.recv().await {
                tokio::spawn(job);
            }
        });

        Self { sender }
    }

    pub fn enqueue<F>(&self, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        // the dispatcher task always outlives this sender; a closed
        // channel only happens on process shutdown
        let _ = self.sender.send(Box::pin(job));
    }
}
