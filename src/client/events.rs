//! Events published to subscribers.

use crate::protocol::ResponseFrame;

/// Connection events, delivered through [`Client::subscribe`](super::Client::subscribe).
///
/// Subscriptions belong to the client, not to a single connection, so a
/// receiver keeps working across reconnects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Banner received; the connection accepts commands.
    Ready { version: String },
    /// A frame arrived with no pending request to match it. This is how
    /// idle notifications surface.
    Frame(ResponseFrame),
    /// Derived from an unsolicited frame carrying `changed` fields.
    Changed(Vec<String>),
    /// The transport failed; followed by `Closed`.
    Error(String),
    /// The daemon closed the connection.
    Closed,
}
