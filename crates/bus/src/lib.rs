//! Replaying change signal for state observation.
//!
//! A [`Signal`] holds the current value of some piece of state and fans every
//! change out to all live subscribers. A new [`Subscription`] always yields the
//! current value first, then one value per subsequent change, in commit order.

use futures::Stream;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use tokio::sync::mpsc;

struct Inner<T> {
    current: T,
    subscribers: Vec<mpsc::UnboundedSender<T>>,
}

/// Current value plus a registry of subscriber channels.
///
/// Publishing and subscribing take the same lock, so a subscriber can never
/// miss a change that commits after its initial value, nor see one twice.
pub struct Signal<T> {
    inner: Mutex<Inner<T>>,
    version: AtomicU64,
}

impl<T> Signal<T>
where
    T: Clone + PartialEq + Send + 'static,
{
    /// Create a signal holding `initial`.
    pub fn new(initial: T) -> Self {
        Self {
            inner: Mutex::new(Inner {
                current: initial,
                subscribers: Vec::new(),
            }),
            version: AtomicU64::new(0),
        }
    }

    // The guarded state is a plain value and a sender list; neither can be
    // left half-updated by a panicking holder.
    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the current value.
    pub fn get(&self) -> T {
        self.lock().current.clone()
    }

    /// Subscribe to the signal. The current value is delivered immediately.
    pub fn subscribe(&self) -> Subscription<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.lock();
        // Receiver is alive, so this cannot fail.
        let _ = tx.send(inner.current.clone());
        inner.subscribers.push(tx);
        tracing::trace!(subscribers = inner.subscribers.len(), "signal subscribed");
        Subscription { rx }
    }

    /// Replace the current value and notify subscribers.
    ///
    /// Returns `false` without notifying anyone when `value` equals the
    /// current value.
    pub fn publish(&self, value: T) -> bool {
        let mut inner = self.lock();
        if inner.current == value {
            return false;
        }
        inner.current = value;

        let before = inner.subscribers.len();
        let current = inner.current.clone();
        inner.subscribers.retain(|tx| tx.send(current.clone()).is_ok());
        let dropped = before - inner.subscribers.len();
        if dropped > 0 {
            tracing::debug!(dropped, "pruned closed signal subscribers");
        }

        self.version.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Number of committed changes since creation.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Relaxed)
    }

    /// Number of registered subscribers, including ones not yet pruned.
    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }
}

impl<T> Default for Signal<T>
where
    T: Clone + PartialEq + Send + Default + 'static,
{
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Receiving half of a [`Signal`] subscription.
///
/// Dropping the subscription cancels it; the signal prunes the channel on its
/// next publish. The sequence ends only when the signal itself is dropped.
pub struct Subscription<T> {
    rx: mpsc::UnboundedReceiver<T>,
}

impl<T> Subscription<T> {
    /// Wait for the next value.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Take the next value if one is already queued.
    pub fn try_recv(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Drain all queued values, keeping only the most recent.
    pub fn drain_to_latest(&mut self) -> Option<T> {
        let mut latest = None;
        let mut drained = 0usize;
        while let Some(value) = self.try_recv() {
            drained += 1;
            latest = Some(value);
        }
        if drained > 1 {
            tracing::trace!(skipped = drained - 1, "drained signal subscription");
        }
        latest
    }
}

impl<T> Stream for Subscription<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.rx.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::sync::Arc;

    #[test]
    fn test_subscribe_replays_current_value() {
        let signal = Signal::new(7u32);
        let mut sub = signal.subscribe();
        assert_eq!(sub.try_recv(), Some(7));
        assert_eq!(sub.try_recv(), None);
    }

    #[test]
    fn test_publish_same_value_is_silent() {
        let signal = Signal::new("a".to_string());
        let mut sub = signal.subscribe();
        sub.try_recv();

        assert!(!signal.publish("a".to_string()));
        assert_eq!(sub.try_recv(), None);
        assert_eq!(signal.version(), 0);
    }

    #[test]
    fn test_publish_fans_out_to_every_subscriber() {
        let signal = Signal::new(0i32);
        let mut first = signal.subscribe();
        let mut second = signal.subscribe();

        assert!(signal.publish(1));
        assert!(signal.publish(2));

        for sub in [&mut first, &mut second] {
            assert_eq!(sub.try_recv(), Some(0));
            assert_eq!(sub.try_recv(), Some(1));
            assert_eq!(sub.try_recv(), Some(2));
            assert_eq!(sub.try_recv(), None);
        }
        assert_eq!(signal.version(), 2);
    }

    #[test]
    fn test_late_subscriber_sees_latest_only() {
        let signal = Signal::new(0i32);
        signal.publish(1);
        signal.publish(2);

        let mut late = signal.subscribe();
        assert_eq!(late.try_recv(), Some(2));
        assert_eq!(late.try_recv(), None);
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let signal = Signal::new(0i32);
        let sub = signal.subscribe();
        let _kept = signal.subscribe();
        assert_eq!(signal.subscriber_count(), 2);

        drop(sub);
        signal.publish(1);
        assert_eq!(signal.subscriber_count(), 1);
    }

    #[test]
    fn test_drain_to_latest() {
        let signal = Signal::new(0i32);
        let mut sub = signal.subscribe();
        for i in 1..=4 {
            signal.publish(i);
        }
        assert_eq!(sub.drain_to_latest(), Some(4));
        assert_eq!(sub.try_recv(), None);
    }

    #[tokio::test]
    async fn test_stream_yields_changes_across_tasks() {
        let signal = Arc::new(Signal::new(0i32));
        let sub = signal.subscribe();

        let publisher = Arc::clone(&signal);
        tokio::spawn(async move {
            for i in 1..=3 {
                publisher.publish(i);
                tokio::task::yield_now().await;
            }
        });

        let values: Vec<i32> = sub.take(4).collect().await;
        assert_eq!(values, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_recv_ends_when_signal_dropped() {
        let signal = Signal::new(1u8);
        let mut sub = signal.subscribe();
        drop(signal);

        assert_eq!(sub.recv().await, Some(1));
        assert_eq!(sub.recv().await, None);
    }
}
