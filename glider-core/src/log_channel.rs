//! Per-build log fan-out with replay for late observers.
//!
//! Every observer sees the full history recorded before it attached followed
//! by every later chunk, in order, until the channel closes. Replay and live
//! forwarding run under the same lock as [`LogChannel::append`], so the
//! boundary between the two can neither drop nor repeat a chunk.
//!
//! Observer queues are bounded. An observer that falls more than
//! [`OBSERVER_BACKLOG`] chunks behind is disconnected instead of buffering
//! the log without limit; the producer is never slowed down by a reader.

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::ReceiverStream;

use crate::error::LogChannelError;

/// Live chunks an observer may have queued before it is disconnected.
pub const OBSERVER_BACKLOG: usize = 1024;

/// Observer handed to [`LogChannel::attach`]. The channel drops its copy on
/// close, or once the sink is full, which ends the observer's receiver.
pub type LogSink = mpsc::Sender<Bytes>;

/// Stream of chunks returned by [`LogChannel::subscribe`].
pub type LogStream = ReceiverStream<Bytes>;

#[derive(Debug, Default)]
struct LogState {
    history: Vec<Bytes>,
    sinks: Vec<LogSink>,
    closed: bool,
}

#[derive(Debug)]
pub struct LogChannel {
    state: Mutex<LogState>,
    closed: watch::Sender<bool>,
}

impl Default for LogChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl LogChannel {
    pub fn new() -> Self {
        let (closed, _rx) = watch::channel(false);
        Self {
            state: Mutex::new(LogState::default()),
            closed,
        }
    }

    /// Records `chunk` and forwards it to every attached observer. Observers
    /// whose receiving side is gone, or whose queue is full, are dropped.
    ///
    /// Returns `false` when the channel is already closed; the chunk is
    /// discarded in that case.
    pub fn append(&self, chunk: Bytes) -> bool {
        let mut state = self.state.lock();
        if state.closed {
            return false;
        }

        state.sinks.retain(|sink| sink.try_send(chunk.clone()).is_ok());
        state.history.push(chunk);
        true
    }

    /// Replays history into `sink`, registers it for live chunks and waits
    /// until the channel closes. On an already closed channel the sink is
    /// dropped right after the replay and this returns immediately.
    ///
    /// `sink` needs room for the whole history. If the replay does not fit,
    /// the sink is dropped and this returns without waiting.
    pub async fn attach(&self, sink: LogSink) {
        let mut closed = self.closed.subscribe();
        if !self.register(sink) {
            return;
        }
        // The sender lives in `self`, so this can only resolve on close.
        let _ = closed.wait_for(|closed| *closed).await;
    }

    /// Non-blocking form of [`attach`](Self::attach): the returned stream
    /// yields the history, then live chunks, and ends when the channel
    /// closes. Its queue holds the history plus [`OBSERVER_BACKLOG`] live
    /// chunks.
    pub fn subscribe(&self) -> LogStream {
        let mut state = self.state.lock();
        let (tx, rx) = mpsc::channel(state.history.len() + OBSERVER_BACKLOG);
        Self::replay_into(&mut state, tx);
        ReceiverStream::new(rx)
    }

    fn register(&self, sink: LogSink) -> bool {
        let mut state = self.state.lock();
        Self::replay_into(&mut state, sink)
    }

    /// Returns whether the sink was kept for live chunks.
    fn replay_into(state: &mut LogState, sink: LogSink) -> bool {
        for chunk in &state.history {
            if sink.try_send(chunk.clone()).is_err() {
                return false;
            }
        }
        if state.closed {
            return false;
        }
        state.sinks.push(sink);
        true
    }

    /// Disconnects every observer and wakes all pending
    /// [`attach`](Self::attach) calls. Closing twice is an error.
    pub fn close(&self) -> Result<(), LogChannelError> {
        let sinks = {
            let mut state = self.state.lock();
            if state.closed {
                return Err(LogChannelError::AlreadyClosed);
            }
            state.closed = true;
            std::mem::take(&mut state.sinks)
        };
        drop(sinks);
        self.closed.send_replace(true);
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn history_len(&self) -> usize {
        self.state.lock().history.len()
    }

    pub fn observer_count(&self) -> usize {
        self.state.lock().sinks.len()
    }
}
