//! Async client engine for the MPD daemon.
//!
//! # Architecture
//!
//! ```text
//!  command()/idle() ──► write lock ──► idle plan ──► transport
//!                            │
//!                            └──► pending queue (FIFO)
//!                                      ▲
//!  transport ──► FrameReader ──► FrameAssembler ──► Correlator
//!                                                      │
//!                          unsolicited frames ──► Event broadcast
//! ```
//!
//! One reader task per connection owns the inbound half. Every frame
//! settles the oldest pending request; frames that arrive while nothing is
//! pending are idle notifications and reach [`Client::subscribe`]rs as
//! [`Event`]s.
//!
//! # Usage
//!
//! ```ignore
//! use mpdwire::{Client, Target};
//!
//! let client = Client::new();
//! client.connect(&Target::local()).await?;
//! client.command("play").await?;
//! ```

mod connection;
mod correlator;
mod error;
mod events;
mod idle;

pub use connection::Client;
pub use correlator::{Continuation, Correlator, Reply};
pub use error::ClientError;
pub use events::Event;
pub use idle::{IdleState, Plan};
