//! Line framing for the MPD text protocol.
//!
//! Transport reads arrive in arbitrary chunks. [`FrameReader`] turns them
//! into complete `\n`-terminated lines, carrying any partial line over to
//! the next chunk. [`FrameAssembler`] groups those lines into frames: body
//! lines accumulate until a status line closes the frame.
//!
//! # Wire Format
//!
//! ```text
//! key: value\n
//! key: value\n
//! OK\n
//! ```
//!
//! Buffering happens on raw bytes so a multi-byte UTF-8 sequence split
//! across two reads is decoded only once the whole line is present.

use tracing::warn;

use super::response::{parse_response, ResponseFrame, StatusKind};

/// Incremental splitter from transport chunks to complete lines.
#[derive(Debug, Default)]
pub struct FrameReader {
    /// Bytes received but not yet handed out as a complete line.
    buffer: Vec<u8>,
}

impl FrameReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `chunk` and iterate over every line it completes.
    ///
    /// The returned iterator is lazy. Lines it does not get to yield stay
    /// buffered and come out of the next `feed` call, so nothing is lost if
    /// the caller stops early. Feeding an empty slice drains lines that are
    /// already complete.
    ///
    /// # Example
    ///
    /// ```
    /// use mpdwire::protocol::FrameReader;
    ///
    /// let mut reader = FrameReader::new();
    /// assert_eq!(reader.feed(b"volume: 4").count(), 0);
    ///
    /// let lines: Vec<String> = reader.feed(b"2\nOK\n").collect();
    /// assert_eq!(lines, vec!["volume: 42\n", "OK\n"]);
    /// ```
    pub fn feed(&mut self, chunk: &[u8]) -> Lines<'_> {
        self.buffer.extend_from_slice(chunk);
        Lines {
            reader: self,
            consumed: 0,
        }
    }

    /// Number of buffered bytes that do not yet form a complete line.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

/// Lines completed by one [`FrameReader::feed`] call.
///
/// Consumed bytes are released from the reader's buffer when this is
/// dropped.
pub struct Lines<'a> {
    reader: &'a mut FrameReader,
    consumed: usize,
}

impl Iterator for Lines<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let rest = &self.reader.buffer[self.consumed..];
        let end = rest.iter().position(|&b| b == b'\n')? + 1;

        let line = match std::str::from_utf8(&rest[..end]) {
            Ok(line) => line.to_owned(),
            Err(e) => {
                warn!("Daemon sent a line that is not valid UTF-8: {}", e);
                String::from_utf8_lossy(&rest[..end]).into_owned()
            }
        };

        self.consumed += end;
        Some(line)
    }
}

impl Drop for Lines<'_> {
    fn drop(&mut self) {
        self.reader.buffer.drain(..self.consumed);
    }
}

/// Groups lines into response frames.
///
/// Body lines are accumulated verbatim, including the
/// [`LIST_OK`](super::command::LIST_OK) acknowledgements inside a command
/// list. The first `OK` or `ACK` status line ends the frame and hands body
/// and status to [`parse_response`].
#[derive(Debug, Default)]
pub struct FrameAssembler {
    body: String,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push one complete line, returning a frame when `line` terminates one.
    pub fn push_line(&mut self, line: &str) -> Option<ResponseFrame> {
        if StatusKind::classify(line).is_some() {
            let body = std::mem::take(&mut self.body);
            return Some(parse_response(&body, line));
        }

        self.body.push_str(line);
        None
    }

    /// True when no body lines are waiting for a status line.
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}
