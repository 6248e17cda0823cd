//! FIFO correlation of written commands with response frames.
//!
//! The daemon answers strictly in order, so the oldest pending continuation
//! always owns the next frame. A frame that arrives while nothing is
//! pending is unsolicited (an idle notification) and goes to subscribers.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::{broadcast, oneshot};
use tracing::{debug, trace};

use super::error::ClientError;
use super::events::Event;
use crate::protocol::ResponseFrame;

type ReplySender = oneshot::Sender<Result<ResponseFrame, ClientError>>;
type ReplyReceiver = oneshot::Receiver<Result<ResponseFrame, ClientError>>;

/// Completion handle for one written command.
#[derive(Debug)]
pub enum Continuation {
    /// Settles a caller's [`Reply`].
    Reply(ReplySender),
    /// Both branches do nothing. Used for the `noidle` the engine injects
    /// on the caller's behalf.
    Discard,
}

impl Continuation {
    /// Create a continuation and the future it settles.
    pub fn reply() -> (Self, Reply) {
        let (tx, rx) = oneshot::channel();
        (Continuation::Reply(tx), Reply::pending(rx))
    }

    fn succeed(self, frame: ResponseFrame) {
        match self {
            // The caller may have dropped its Reply; that is not our problem.
            Continuation::Reply(tx) => {
                let _ = tx.send(Ok(frame));
            }
            Continuation::Discard => {}
        }
    }

    fn fail(self, err: ClientError) {
        match self {
            Continuation::Reply(tx) => {
                let _ = tx.send(Err(err));
            }
            Continuation::Discard => {}
        }
    }
}

/// Pending-request queue plus the event channel for unsolicited frames.
#[derive(Debug)]
pub struct Correlator {
    pending: VecDeque<Continuation>,
    events: broadcast::Sender<Event>,
}

impl Correlator {
    pub fn new(events: broadcast::Sender<Event>) -> Self {
        Self {
            pending: VecDeque::new(),
            events,
        }
    }

    /// Append a continuation. Must be called in write order.
    pub fn enqueue(&mut self, continuation: Continuation) {
        self.pending.push_back(continuation);
    }

    /// Remove the most recent continuation after its write failed.
    pub fn retract(&mut self) -> Option<Continuation> {
        self.pending.pop_back()
    }

    /// Route a completed frame to the oldest pending continuation, or
    /// publish it when nothing is pending.
    pub fn dispatch(&mut self, frame: ResponseFrame) {
        let Some(continuation) = self.pending.pop_front() else {
            self.publish(frame);
            return;
        };

        trace!("Resolving pending request ({} still queued)", self.pending.len());
        if frame.is_ack() {
            continuation.fail(ClientError::Ack(frame));
        } else {
            continuation.succeed(frame);
        }
    }

    /// Settle every pending continuation with `ConnectionClosed`.
    pub fn fail_all(&mut self) {
        if !self.pending.is_empty() {
            debug!("Failing {} pending request(s)", self.pending.len());
        }
        for continuation in self.pending.drain(..) {
            continuation.fail(ClientError::ConnectionClosed);
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn publish(&self, frame: ResponseFrame) {
        debug!("Unsolicited frame: {}", frame.status());

        let changed = frame.changed().to_vec();
        // No subscribers is fine; the frame is simply dropped.
        let _ = self.events.send(Event::Frame(frame));
        if !changed.is_empty() {
            let _ = self.events.send(Event::Changed(changed));
        }
    }
}

/// Future settled by the frame that answers a command.
///
/// Commands that get no response frame (entering idle, cancelling idle)
/// resolve immediately with an empty `OK` frame.
#[derive(Debug)]
pub struct Reply {
    inner: ReplyInner,
}

#[derive(Debug)]
enum ReplyInner {
    Ready(Option<ResponseFrame>),
    Pending(ReplyReceiver),
}

impl Reply {
    fn pending(rx: ReplyReceiver) -> Self {
        Self {
            inner: ReplyInner::Pending(rx),
        }
    }

    pub(crate) fn immediate() -> Self {
        Self {
            inner: ReplyInner::Ready(Some(ResponseFrame::empty_ok())),
        }
    }
}

impl Future for Reply {
    type Output = Result<ResponseFrame, ClientError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().inner {
            ReplyInner::Ready(frame) => Poll::Ready(Ok(frame.take().unwrap_or_default())),
            // A dropped sender means the session was torn down.
            ReplyInner::Pending(rx) => Pin::new(rx)
                .poll(cx)
                .map(|settled| settled.unwrap_or(Err(ClientError::ConnectionClosed))),
        }
    }
}
