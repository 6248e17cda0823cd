//! Idle/noidle bookkeeping.
//!
//! While idling the daemon accepts nothing but `noidle`, so any other
//! command has to be preceded by one. The write path asks [`IdleState::plan`]
//! what to send and records the outcome with [`IdleState::enter`] or
//! [`IdleState::leave`] while it queues the matching continuations. The
//! reader task clears the flag when it dispatches a frame nobody was
//! waiting for, which is the idle notification. Both sides do this under
//! the correlator lock.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::protocol::command::{is_idle_entry, is_noidle};

/// What the write path must do for one outgoing command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plan {
    /// Write nothing and resolve at once: `idle` while already idling, or
    /// `noidle` while not idling.
    Skip,
    /// Write the idle command without queueing a continuation; resolve once
    /// the write completes.
    EnterIdle,
    /// Write `noidle` with a discarding continuation and resolve at once.
    CancelIdle,
    /// Write the command with its own continuation, preceded by a
    /// discarded `noidle` when `cancel_idle` is set.
    Send { cancel_idle: bool },
}

/// The per-connection idle flag.
#[derive(Debug, Default)]
pub struct IdleState {
    idle: AtomicBool,
}

impl IdleState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_idle(&self) -> bool {
        self.idle.load(Ordering::SeqCst)
    }

    /// Decide how to send `command` given the current state.
    pub fn plan(&self, command: &str) -> Plan {
        let idling = self.is_idle();

        if is_idle_entry(command) {
            if idling {
                Plan::Skip
            } else {
                Plan::EnterIdle
            }
        } else if is_noidle(command) {
            if idling {
                Plan::CancelIdle
            } else {
                Plan::Skip
            }
        } else {
            Plan::Send {
                cancel_idle: idling,
            }
        }
    }

    /// The idle command is about to be written.
    pub fn enter(&self) {
        self.idle.store(true, Ordering::SeqCst);
    }

    /// `noidle` was queued, or the idle notification arrived.
    pub fn leave(&self) {
        self.idle.store(false, Ordering::SeqCst);
    }
}
