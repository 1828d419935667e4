//! Single-slot handoff between one producer and one consumer.
//!
//! A producer parks an item with [`Rendezvous::deliver`] and stays suspended
//! until a consumer has taken it with [`Rendezvous::fetch`] and finished
//! draining it. Nothing is queued beyond the one slot.

use std::{
    fmt,
    io,
    pin::Pin,
    sync::atomic::{AtomicU64, Ordering},
    task::{Context, Poll},
    time::Duration,
};

use bytes::Bytes;
use futures::{Stream, stream::BoxStream};
use parking_lot::Mutex;
use tokio::{
    sync::{Notify, oneshot},
    time::{Instant, timeout_at},
};

use crate::error::RendezvousError;

/// How a taken item left the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    Completed,
    /// The consumer went away before it finished.
    Interrupted,
}

struct Pending<T> {
    ticket: u64,
    item: T,
    picked: oneshot::Sender<()>,
    drained: oneshot::Sender<DrainOutcome>,
}

pub struct Rendezvous<T> {
    slot: Mutex<Option<Pending<T>>>,
    filled: Notify,
    emptied: Notify,
    next_ticket: AtomicU64,
}

impl<T> fmt::Debug for Rendezvous<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rendezvous")
            .field("occupied", &self.is_occupied())
            .finish()
    }
}

impl<T> Default for Rendezvous<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Rendezvous<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            filled: Notify::new(),
            emptied: Notify::new(),
            next_ticket: AtomicU64::new(0),
        }
    }

    pub fn is_occupied(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Places `item` in the slot, waiting for an earlier delivery to clear
    /// first, then waits for a consumer to drain it.
    ///
    /// If no consumer takes the item within `pickup_timeout` it is withdrawn
    /// and [`RendezvousError::NotFetched`] is returned.
    pub async fn deliver(
        &self,
        item: T,
        pickup_timeout: Duration,
    ) -> Result<DrainOutcome, RendezvousError> {
        let deadline = Instant::now() + pickup_timeout;
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let (picked_tx, picked_rx) = oneshot::channel();
        let (drained_tx, drained_rx) = oneshot::channel();
        let mut pending = Some(Pending {
            ticket,
            item,
            picked: picked_tx,
            drained: drained_tx,
        });

        loop {
            let emptied = self.emptied.notified();
            tokio::pin!(emptied);
            emptied.as_mut().enable();

            {
                let mut slot = self.slot.lock();
                if slot.is_none() {
                    *slot = pending.take();
                }
            }
            if pending.is_none() {
                break;
            }
            if timeout_at(deadline, emptied).await.is_err() {
                return Err(RendezvousError::NotFetched);
            }
        }
        // Until a consumer takes the item, dropping this future must not
        // leave it parked in the slot.
        let mut placed = Placed {
            slot: self,
            ticket,
            armed: true,
        };
        self.filled.notify_waiters();

        match timeout_at(deadline, picked_rx).await {
            Ok(Ok(())) => placed.armed = false,
            Ok(Err(_)) => return Err(RendezvousError::NotFetched),
            Err(_) => {
                placed.armed = false;
                if self.withdraw(ticket) {
                    return Err(RendezvousError::NotFetched);
                }
                // A consumer took it while the deadline fired.
            }
        }

        Ok(drained_rx.await.unwrap_or(DrainOutcome::Interrupted))
    }

    fn withdraw(&self, ticket: u64) -> bool {
        let withdrawn = {
            let mut slot = self.slot.lock();
            match slot.as_ref() {
                Some(pending) if pending.ticket == ticket => slot.take(),
                _ => None,
            }
        };
        let was_ours = withdrawn.is_some();
        if was_ours {
            self.emptied.notify_waiters();
        }
        was_ours
    }

    /// Waits up to `timeout` for a delivery and takes it. The slot is left
    /// untouched on timeout.
    pub async fn fetch(
        &self,
        timeout: Duration,
    ) -> Result<Handoff<T>, RendezvousError> {
        let deadline = Instant::now() + timeout;

        loop {
            let filled = self.filled.notified();
            tokio::pin!(filled);
            filled.as_mut().enable();

            let taken = self.slot.lock().take();
            if let Some(pending) = taken {
                self.emptied.notify_waiters();
                let _ = pending.picked.send(());
                return Ok(Handoff {
                    item: pending.item,
                    guard: DrainGuard {
                        drained: Some(pending.drained),
                    },
                });
            }

            if timeout_at(deadline, filled).await.is_err() {
                return Err(RendezvousError::TimedOut);
            }
        }
    }
}

/// Withdraws a placed delivery when `deliver` is dropped before pickup.
struct Placed<'a, T> {
    slot: &'a Rendezvous<T>,
    ticket: u64,
    armed: bool,
}

impl<T> Drop for Placed<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            self.slot.withdraw(self.ticket);
        }
    }
}

/// An item taken from a [`Rendezvous`] together with the guard that
/// releases its producer.
#[derive(Debug)]
pub struct Handoff<T> {
    pub item: T,
    pub guard: DrainGuard,
}

impl<T> Handoff<T> {
    pub fn into_parts(self) -> (T, DrainGuard) {
        (self.item, self.guard)
    }
}

/// Releases the producer on [`complete`](Self::complete) or on drop, the
/// latter reported as [`DrainOutcome::Interrupted`].
#[derive(Debug)]
pub struct DrainGuard {
    drained: Option<oneshot::Sender<DrainOutcome>>,
}

impl DrainGuard {
    pub fn complete(mut self) {
        self.finish(DrainOutcome::Completed);
    }

    fn finish(&mut self, outcome: DrainOutcome) {
        if let Some(tx) = self.drained.take() {
            let _ = tx.send(outcome);
        }
    }
}

impl Drop for DrainGuard {
    fn drop(&mut self) {
        self.finish(DrainOutcome::Interrupted);
    }
}

/// Uploaded build input as it travels through the rendezvous.
pub struct BitsPayload {
    pub content_type: Option<String>,
    pub body: BoxStream<'static, io::Result<Bytes>>,
}

impl BitsPayload {
    pub fn new(
        content_type: Option<String>,
        body: BoxStream<'static, io::Result<Bytes>>,
    ) -> Self {
        Self { content_type, body }
    }
}

impl fmt::Debug for BitsPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BitsPayload")
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// Body stream that completes its [`DrainGuard`] once the inner stream ends
/// cleanly. Dropping it early, or an inner error, leaves the guard to report
/// an interruption.
pub struct DrainingStream {
    inner: BoxStream<'static, io::Result<Bytes>>,
    guard: Option<DrainGuard>,
}

impl DrainingStream {
    pub fn new(handoff: Handoff<BitsPayload>) -> Self {
        let (payload, guard) = handoff.into_parts();
        Self {
            inner: payload.body,
            guard: Some(guard),
        }
    }
}

impl fmt::Debug for DrainingStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrainingStream")
            .field("finished", &self.guard.is_none())
            .finish_non_exhaustive()
    }
}

impl Stream for DrainingStream {
    type Item = io::Result<Bytes>;

    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Self::Item>> {
        let polled = self.inner.as_mut().poll_next(cx);
        match &polled {
            Poll::Ready(None) => {
                if let Some(guard) = self.guard.take() {
                    guard.complete();
                }
            }
            Poll::Ready(Some(Err(_))) => {
                self.guard.take();
            }
            _ => {}
        }
        polled
    }
}
