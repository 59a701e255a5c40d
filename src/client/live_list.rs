//! Client-side live request list.
//!
//! Holds the latest ranked snapshot and notifies listeners whenever a new
//! one arrives. Each snapshot replaces the previous list wholesale.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use super::Upvoter;
use crate::live::RequestSnapshot;

type SnapshotListener = Arc<dyn Fn(&RequestSnapshot) + Send + Sync>;

/// State container for the ranked request list.
#[derive(Clone)]
pub struct LiveRequestList {
    inner: Arc<Inner>,
}

struct Inner {
    current: RwLock<RequestSnapshot>,
    listeners: RwLock<Vec<SnapshotListener>>,
    upvoter: Arc<dyn Upvoter>,
}

impl LiveRequestList {
    pub fn new(upvoter: Arc<dyn Upvoter>) -> Self {
        Self {
            inner: Arc::new(Inner {
                current: RwLock::new(Arc::new(Vec::new())),
                listeners: RwLock::new(Vec::new()),
                upvoter,
            }),
        }
    }

    /// The most recent snapshot, highest vote count first.
    pub fn current_list(&self) -> RequestSnapshot {
        self.inner.current.read().clone()
    }

    /// Register a callback invoked with every snapshot applied after this call.
    pub fn on_snapshot<F>(&self, listener: F)
    where
        F: Fn(&RequestSnapshot) + Send + Sync + 'static,
    {
        self.inner.listeners.write().push(Arc::new(listener));
    }

    /// Replace the list with `snapshot` and notify listeners.
    ///
    /// Listeners run without any lock held, so they may read the list or
    /// register further listeners.
    pub fn apply_snapshot(&self, snapshot: RequestSnapshot) {
        *self.inner.current.write() = snapshot.clone();

        let listeners: Vec<SnapshotListener> = self.inner.listeners.read().clone();
        for listener in listeners {
            listener(&snapshot);
        }
    }

    /// Apply `initial`, then every snapshot from `rx` until the feed closes.
    pub fn attach(
        &self,
        initial: RequestSnapshot,
        mut rx: broadcast::Receiver<RequestSnapshot>,
    ) -> JoinHandle<()> {
        self.apply_snapshot(initial);

        let list = self.clone();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(snapshot) => list.apply_snapshot(snapshot),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "Live list lagged behind the feed");
                    }
                    Err(RecvError::Closed) => {
                        tracing::debug!("Request feed closed");
                        break;
                    }
                }
            }
        })
    }

    /// Upvote a request. Failures are logged, not returned.
    pub async fn request_upvote(&self, id: &str) {
        if let Err(e) = self.inner.upvoter.upvote(id).await {
            tracing::warn!(request_id = id, "Upvote failed: {}", e.message());
        }
    }
}
