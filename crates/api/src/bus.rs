//! `MessageBus`: the pub/sub fabric auction and meta-tx traffic rides on
//! (spec.md §1's external `MessageBus` collaborator).
//!
//! Grounded on the teacher's `scanner.rs` event loop, which distributes
//! block events to subscribers over a `tokio::sync::mpsc` channel; here the
//! fan-out is subject-keyed (mirroring NATS-style subjects) so one consumer
//! can share a single subscription across many in-flight auctions, per
//! spec.md §9's "shared bus subscription with inbox-based dispatch".

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::broadcast;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("message bus is not connected")]
    NotConnected,
    #[error("publish failed: {0}")]
    Publish(String),
}

/// One message on the bus: a subject and an opaque (already-serialized)
/// payload. Callers encode/decode their own JSON on top of this.
#[derive(Debug, Clone)]
pub struct BusMessage {
    pub subject: String,
    pub payload: Vec<u8>,
}

/// A live subscription to one subject.
pub struct BusSubscription {
    subject: String,
    rx: broadcast::Receiver<BusMessage>,
}

impl BusSubscription {
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Await the next message, skipping slow-consumer lag gaps rather than
    /// erroring on them (a lagged receiver rejoining the live stream is
    /// the right behavior for a fan-out auction feed).
    pub async fn recv(&mut self) -> Option<BusMessage> {
        loop {
            match self.rx.recv().await {
                Ok(msg) => return Some(msg),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// The messaging fabric abstraction. `connect`/`is_connected` model spec.md
/// §5's "lazy-initialized, reconnect is a no-op if already connected".
#[async_trait]
pub trait MessageBus: Send + Sync {
    async fn connect(&self) -> Result<(), BusError>;
    fn is_connected(&self) -> bool;
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), BusError>;
    async fn subscribe(&self, subject: &str) -> Result<BusSubscription, BusError>;
}

/// In-memory bus for tests and the demo binary: one broadcast channel per
/// subject, created lazily on first publish or subscribe.
pub struct LocalBus {
    channels: DashMap<String, broadcast::Sender<BusMessage>>,
    connected: AtomicBool,
}

impl LocalBus {
    pub fn new() -> Self {
        Self { channels: DashMap::new(), connected: AtomicBool::new(false) }
    }

    fn channel(&self, subject: &str) -> broadcast::Sender<BusMessage> {
        self.channels
            .entry(subject.to_string())
            .or_insert_with(|| broadcast::channel(1024).0)
            .clone()
    }
}

impl Default for LocalBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageBus for LocalBus {
    async fn connect(&self) -> Result<(), BusError> {
        // Idempotent: flips the flag once, no-ops on every subsequent call.
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), BusError> {
        if !self.is_connected() {
            return Err(BusError::NotConnected);
        }
        let tx = self.channel(subject);
        // No subscribers yet is not an error: the message is simply dropped,
        // matching at-most-once pub/sub semantics.
        let _ = tx.send(BusMessage { subject: subject.to_string(), payload });
        Ok(())
    }

    async fn subscribe(&self, subject: &str) -> Result<BusSubscription, BusError> {
        if !self.is_connected() {
            return Err(BusError::NotConnected);
        }
        let tx = self.channel(subject);
        Ok(BusSubscription { subject: subject.to_string(), rx: tx.subscribe() })
    }
}
