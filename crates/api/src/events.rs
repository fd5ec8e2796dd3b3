//! `EventMux` (C7): the event subscription surface the orchestrator and
//! callers use to wait on indexer-observed transfer events.
//!
//! Grounded on the teacher's `scanner.rs` event distribution (one
//! `tokio::sync::broadcast`/`mpsc` channel per event source, a background
//! task draining it per subscriber); registrations are tracked in a
//! `dashmap` keyed by a monotonic token so `detach` can cancel one handler
//! without disturbing the others, matching spec.md §9's "indexer holds the
//! callback weakly (by token); detach invalidates tokens."

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde_json::Value as EventPayload;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::debug;

/// Indexer event kinds (spec.md §4.4/§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexerEvent {
    SenderTransactionPrepared,
    ReceiverTransactionPrepared,
    ReceiverTransactionFulfilled,
    SenderTransactionCancelled,
}

/// Opaque handle returned by `attach`/`attach_once`; pass to `detach` to
/// remove exactly that registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistrationToken(u64);

struct Registration {
    task: JoinHandle<()>,
}

/// The event subscription surface: `attach`, `attach_once`, `wait_for`,
/// `detach`.
pub struct EventMux {
    channels: DashMap<IndexerEvent, broadcast::Sender<EventPayload>>,
    registrations: DashMap<u64, Registration>,
    next_token: AtomicU64,
}

impl EventMux {
    pub fn new() -> Self {
        Self { channels: DashMap::new(), registrations: DashMap::new(), next_token: AtomicU64::new(1) }
    }

    fn channel(&self, event: IndexerEvent) -> broadcast::Sender<EventPayload> {
        self.channels.entry(event).or_insert_with(|| broadcast::channel(256).0).clone()
    }

    /// Deliver an event to every live subscriber. Indexer-side plumbing
    /// (outside this crate's scope) calls this as events arrive.
    pub fn emit(&self, event: IndexerEvent, payload: EventPayload) {
        let tx = self.channel(event);
        let _ = tx.send(payload);
    }

    /// Register a standing callback for `event`, optionally gated by
    /// `filter`. Registrations that arrive before this call are missed —
    /// there is no replay (spec.md §5).
    pub fn attach<F, P>(self: &Arc<Self>, event: IndexerEvent, filter: P, mut callback: F) -> RegistrationToken
    where
        F: FnMut(EventPayload) + Send + 'static,
        P: Fn(&EventPayload) -> bool + Send + 'static,
    {
        let mut rx = self.channel(event).subscribe();
        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(payload) => {
                        if filter(&payload) {
                            callback(payload);
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        self.register(task)
    }

    /// Like `attach`, but the callback fires at most once and the
    /// registration then self-detaches.
    pub fn attach_once<F, P>(self: &Arc<Self>, event: IndexerEvent, filter: P, callback: F) -> RegistrationToken
    where
        F: FnOnce(EventPayload) + Send + 'static,
        P: Fn(&EventPayload) -> bool + Send + 'static,
    {
        let mut rx = self.channel(event).subscribe();
        let task = tokio::spawn(async move {
            let mut callback = Some(callback);
            loop {
                match rx.recv().await {
                    Ok(payload) => {
                        if filter(&payload) {
                            if let Some(cb) = callback.take() {
                                cb(payload);
                            }
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        self.register(task)
    }

    fn register(&self, task: JoinHandle<()>) -> RegistrationToken {
        let token = self.next_token.fetch_add(1, Ordering::SeqCst);
        self.registrations.insert(token, Registration { task });
        RegistrationToken(token)
    }

    /// Wait for the first matching event after registration, up to
    /// `timeout`. Resolves to `None` on timeout — the coordination
    /// primitive the orchestrator uses for the meta-tx fulfill path.
    pub async fn wait_for<P>(&self, event: IndexerEvent, timeout: Duration, filter: P) -> Option<EventPayload>
    where
        P: Fn(&EventPayload) -> bool,
    {
        let mut rx = self.channel(event).subscribe();
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return None;
            }
            match tokio::time::timeout(remaining, rx.recv()).await {
                Ok(Ok(payload)) if filter(&payload) => return Some(payload),
                Ok(Ok(_)) => continue,
                Ok(Err(broadcast::error::RecvError::Lagged(_))) => continue,
                Ok(Err(broadcast::error::RecvError::Closed)) => return None,
                Err(_) => return None,
            }
        }
    }

    /// Remove one registration by token.
    pub fn detach(&self, token: RegistrationToken) {
        if let Some((_, reg)) = self.registrations.remove(&token.0) {
            reg.task.abort();
        }
    }

    /// Remove every registration (spec.md §4.7: `detach()` with no argument).
    pub fn detach_all(&self) {
        let tokens: Vec<u64> = self.registrations.iter().map(|e| *e.key()).collect();
        for token in tokens {
            if let Some((_, reg)) = self.registrations.remove(&token) {
                reg.task.abort();
            }
        }
        debug!("detached all event registrations");
    }
}

impl Default for EventMux {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn wait_for_resolves_on_matching_event() {
        let mux = Arc::new(EventMux::new());
        let waiter = {
            let mux = Arc::clone(&mux);
            tokio::spawn(async move {
                mux.wait_for(IndexerEvent::ReceiverTransactionFulfilled, Duration::from_secs(1), |_| true)
                    .await
            })
        };
        tokio::task::yield_now().await;
        mux.emit(IndexerEvent::ReceiverTransactionFulfilled, serde_json::json!({"ok": true}));
        let payload = waiter.await.unwrap();
        assert_eq!(payload, Some(serde_json::json!({"ok": true})));
    }

    #[tokio::test]
    async fn wait_for_times_out_without_a_matching_event() {
        let mux = EventMux::new();
        let result = mux
            .wait_for(IndexerEvent::ReceiverTransactionFulfilled, Duration::from_millis(50), |_| true)
            .await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn detach_stops_delivery_to_that_registration() {
        let mux = Arc::new(EventMux::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let fired = Arc::new(AtomicBool::new(false));
        let token = mux.attach(IndexerEvent::SenderTransactionPrepared, |_| true, move |payload| {
            fired.store(true, Ordering::SeqCst);
            let _ = tx.send(payload);
        });

        mux.detach(token);
        tokio::task::yield_now().await;
        mux.emit(IndexerEvent::SenderTransactionPrepared, serde_json::json!({}));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn detach_all_is_idempotent() {
        let mux = EventMux::new();
        mux.detach_all();
        mux.detach_all();
    }
}
