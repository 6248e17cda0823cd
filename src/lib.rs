//! mpdwire - client engine for the MPD line protocol.
//!
//! This library provides the building blocks for talking to a Music Player
//! Daemon over TCP or a Unix socket:
//!
//! - `protocol` - Line framing, response parsing and command formatting
//! - `client` - Connection manager, request correlation and idle handling
//! - `config` - Connection targets and client options
//!
//! # Client
//!
//! [`Client`] is the recommended entry point:
//!
//! ```ignore
//! use mpdwire::{Client, Target};
//!
//! let client = Client::new();
//! client.connect(&Target::from_env()).await?;
//!
//! let status = client.command("status").await?;
//! let list = client.command_list(["play", "status"], true).await?;
//! ```

pub mod client;
pub mod config;
pub mod protocol;

pub use client::{Client, ClientError, Event, Reply};
pub use config::{ClientOptions, Target};
pub use protocol::ResponseFrame;
