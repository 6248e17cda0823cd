//! Wire-level pieces of the MPD text protocol.
//!
//! Everything in here is synchronous and transport-agnostic: the client
//! feeds it bytes read from the socket and gets back complete frames.
//!
//! # Protocol
//!
//! The daemon greets every new connection with a banner, then answers each
//! command with zero or more `key: value` lines closed by a status line:
//!
//! ```text
//! OK MPD 0.23.5\n          <- banner, once per connection
//! volume: 42\n
//! state: play\n
//! OK\n                     <- success
//! ACK [50@0] {play} No such song\n   <- failure
//! ```
//!
//! Commands are plain text lines. Batches are wrapped in
//! `command_list_begin` / `command_list_ok_begin` … `command_list_end`.

pub mod command;
mod framing;
mod response;

pub use framing::{FrameAssembler, FrameReader, Lines};
pub use response::{parse_banner, parse_response, AckError, FieldValue, ResponseFrame, StatusKind};
