//! Live snapshots of the ranked request list.
//!
//! Every write to the requests collection publishes a full, ordered snapshot.
//! Subscribers never see deltas, so a lagging receiver can simply skip ahead.

use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{stream, Stream, StreamExt};
use tokio::sync::{broadcast, Mutex, MutexGuard};
use tokio_stream::wrappers::BroadcastStream;

use crate::models::FeatureRequest;

/// Ordered list of all requests, highest vote count first.
pub type RequestSnapshot = Arc<Vec<FeatureRequest>>;

/// Buffered snapshots per subscriber before it starts lagging.
pub const FEED_CAPACITY: usize = 64;

/// Broadcaster for request snapshots.
#[derive(Clone)]
pub struct RequestFeed {
    tx: broadcast::Sender<RequestSnapshot>,
    publish_lock: Arc<Mutex<()>>,
}

impl RequestFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self {
            tx,
            publish_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Hold this while reading and sending a snapshot so publishers cannot
    /// interleave and deliver an older list last.
    pub async fn lock(&self) -> MutexGuard<'_, ()> {
        self.publish_lock.lock().await
    }

    /// Send a snapshot to current subscribers. Having none is not an error.
    pub fn send(&self, snapshot: RequestSnapshot) {
        let receivers = self.tx.send(snapshot).unwrap_or(0);
        tracing::trace!(receivers, "Published request snapshot");
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RequestSnapshot> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for RequestFeed {
    fn default() -> Self {
        Self::new(FEED_CAPACITY)
    }
}

/// Stream the initial snapshot followed by every later one; lag errors are dropped.
pub fn snapshot_stream(
    initial: RequestSnapshot,
    rx: broadcast::Receiver<RequestSnapshot>,
) -> impl Stream<Item = RequestSnapshot> {
    stream::once(async move { initial }).chain(BroadcastStream::new(rx).filter_map(
        |res| async move {
            match res {
                Ok(snapshot) => Some(snapshot),
                Err(e) => {
                    tracing::debug!("Live subscriber lagged: {}", e);
                    None
                }
            }
        },
    ))
}

/// Wrap a snapshot stream as Server-Sent Events with JSON payloads.
pub fn sse_response(
    snapshots: impl Stream<Item = RequestSnapshot> + Send + 'static,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = snapshots.map(|snapshot| {
        let event = Event::default()
            .event("requests")
            .json_data(snapshot.as_slice())
            .unwrap_or_else(|_| Event::default().event("requests").data("serialization_error"));
        Ok(event)
    });

    Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keepalive"),
    )
}
