// ── Reactive registry subscriptions ──
//
// Subscription types for consuming light changes from the registry.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::model::Light;

/// Immutable, ordered view of every light at one point in time.
pub type LightSnapshot = Arc<Vec<Arc<Light>>>;

/// A subscription to the light registry.
///
/// Provides both point-in-time snapshot access and reactive change
/// notification via the `changed()` method or by converting to a `Stream`.
pub struct LightStream {
    current: LightSnapshot,
    receiver: watch::Receiver<LightSnapshot>,
}

impl LightStream {
    pub(crate) fn new(receiver: watch::Receiver<LightSnapshot>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// Get the snapshot captured at creation time (or at the last `changed()`).
    pub fn current(&self) -> &LightSnapshot {
        &self.current
    }

    /// Get the latest snapshot (may have changed since creation).
    pub fn latest(&self) -> LightSnapshot {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change, returning the new snapshot.
    /// Returns `None` if the registry has been dropped.
    pub async fn changed(&mut self) -> Option<LightSnapshot> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    pub fn into_stream(self) -> LightWatchStream {
        LightWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
///
/// Yields the current snapshot first, then a new one each time the
/// registry is mutated.
pub struct LightWatchStream {
    inner: WatchStream<LightSnapshot>,
}

impl Stream for LightWatchStream {
    type Item = LightSnapshot;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
