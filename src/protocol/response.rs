//! Parsed response frames.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Banner prefix the daemon sends once, right after the connection opens.
const BANNER_PREFIX: &str = "OK MPD ";

/// Separator between key and value in a body line.
const FIELD_SEPARATOR: &str = ": ";

/// Classification of a frame-terminating status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Ok,
    Ack,
}

impl StatusKind {
    /// Classify `line`, returning `None` for ordinary body lines.
    ///
    /// `OK` and `ACK` must be the whole line or be followed by a space, so
    /// keys such as `OKAY: 1` and acknowledgements such as `list_OK` are
    /// body content.
    pub fn classify(line: &str) -> Option<Self> {
        let line = line.strip_suffix('\n').unwrap_or(line);

        if line == "OK" || line.starts_with("OK ") {
            Some(StatusKind::Ok)
        } else if line == "ACK" || line.starts_with("ACK ") {
            Some(StatusKind::Ack)
        } else {
            None
        }
    }
}

/// Value of a response field.
///
/// A key seen once maps to `Single`. The first repeat promotes it to a
/// two-element `Multiple`; later repeats append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Single(String),
    Multiple(Vec<String>),
}

impl FieldValue {
    fn push(&mut self, value: String) {
        match self {
            FieldValue::Single(first) => {
                let first = std::mem::take(first);
                *self = FieldValue::Multiple(vec![first, value]);
            }
            FieldValue::Multiple(values) => values.push(value),
        }
    }

    /// The first value received for this key.
    pub fn first(&self) -> &str {
        self.as_slice().first().map(String::as_str).unwrap_or_default()
    }

    /// Every value in arrival order.
    pub fn as_slice(&self) -> &[String] {
        match self {
            FieldValue::Single(value) => std::slice::from_ref(value),
            FieldValue::Multiple(values) => values,
        }
    }
}

/// One complete response: parsed fields, status line and verbatim text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResponseFrame {
    fields: BTreeMap<String, FieldValue>,
    status: String,
    raw: String,
}

impl ResponseFrame {
    /// The frame an idle entry or idle cancellation resolves with: nothing
    /// was received, so there are no fields and no raw text.
    pub(crate) fn empty_ok() -> Self {
        Self {
            status: "OK".to_string(),
            ..Self::default()
        }
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }

    /// Status line without its trailing newline.
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Body and status line exactly as received.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn first(&self, key: &str) -> Option<&str> {
        self.get(key).map(FieldValue::first)
    }

    /// All values for `key`; empty when the key is absent.
    pub fn all(&self, key: &str) -> &[String] {
        self.get(key).map(FieldValue::as_slice).unwrap_or_default()
    }

    pub fn is_ok(&self) -> bool {
        StatusKind::classify(&self.status) == Some(StatusKind::Ok)
    }

    pub fn is_ack(&self) -> bool {
        StatusKind::classify(&self.status) == Some(StatusKind::Ack)
    }

    /// Subsystems reported by an idle notification.
    pub fn changed(&self) -> &[String] {
        self.all("changed")
    }

    /// Structured view of an `ACK` status line, when it has the usual shape.
    pub fn ack(&self) -> Option<AckError> {
        AckError::parse(&self.status)
    }
}

/// Parse a frame body and its status line.
///
/// Body lines must all be `key: value`. A single line without the
/// separator makes the whole field map empty; the text is still available
/// through [`ResponseFrame::raw`].
///
/// # Example
///
/// ```
/// use mpdwire::protocol::{parse_response, FieldValue};
///
/// let frame = parse_response("foo: bar\nfoo: baz\n", "OK\n");
/// assert_eq!(
///     frame.get("foo"),
///     Some(&FieldValue::Multiple(vec!["bar".into(), "baz".into()]))
/// );
/// assert_eq!(frame.status(), "OK");
/// ```
pub fn parse_response(body: &str, status_line: &str) -> ResponseFrame {
    let mut fields: BTreeMap<String, FieldValue> = BTreeMap::new();

    for line in body.split('\n').filter(|line| !line.is_empty()) {
        let Some((key, value)) = line.split_once(FIELD_SEPARATOR) else {
            fields.clear();
            break;
        };

        match fields.get_mut(key) {
            Some(existing) => existing.push(value.to_string()),
            None => {
                fields.insert(key.to_string(), FieldValue::Single(value.to_string()));
            }
        }
    }

    ResponseFrame {
        fields,
        status: status_line
            .strip_suffix('\n')
            .unwrap_or(status_line)
            .to_string(),
        raw: format!("{}{}", body, status_line),
    }
}

/// Extract the protocol version from the connection banner.
///
/// Returns `None` if `line` is not a banner.
pub fn parse_banner(line: &str) -> Option<String> {
    let version = line.strip_prefix(BANNER_PREFIX)?.trim_end();
    Some(version.to_string())
}

/// Details of a daemon-side failure.
///
/// The daemon reports errors as `ACK [<code>@<index>] {<command>} <message>`
/// where `index` is the position of the failing command inside a command
/// list (0 outside of lists).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AckError {
    pub code: u32,
    pub command_index: u32,
    pub command: String,
    pub message: String,
}

impl AckError {
    pub fn parse(status: &str) -> Option<Self> {
        let rest = status.strip_prefix("ACK [")?;
        let (codes, rest) = rest.split_once(']')?;
        let (code, index) = codes.split_once('@')?;

        let rest = rest.trim_start().strip_prefix('{')?;
        let (command, message) = rest.split_once('}')?;

        Some(Self {
            code: code.parse().ok()?,
            command_index: index.parse().ok()?,
            command: command.to_string(),
            message: message.trim().to_string(),
        })
    }
}

impl fmt::Display for AckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}@{}] {{{}}} {}",
            self.code, self.command_index, self.command, self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_unique_keys_map_to_single_values() {
        let frame = parse_response("volume: 42\nstate: play\nrepeat: 0\n", "OK\n");

        assert_eq!(frame.fields().len(), 3);
        assert_eq!(frame.get("volume"), Some(&FieldValue::Single("42".into())));
        assert_eq!(frame.first("state"), Some("play"));
        assert_eq!(frame.first("repeat"), Some("0"));
    }

    #[test]
    fn test_repeated_key_promotes_then_appends() {
        let frame = parse_response("file: a\nfile: b\nfile: c\n", "OK\n");

        assert_eq!(
            frame.get("file"),
            Some(&FieldValue::Multiple(vec![
                "a".into(),
                "b".into(),
                "c".into()
            ]))
        );
        assert_eq!(frame.first("file"), Some("a"));
    }

    #[test]
    fn test_repeated_key_twice_yields_two_elements() {
        let frame = parse_response("foo: bar\nfoo: baz\n", "OK\n");

        assert_eq!(frame.all("foo"), ["bar".to_string(), "baz".to_string()]);
        assert_eq!(frame.raw(), "foo: bar\nfoo: baz\nOK\n");
    }

    #[test]
    fn test_malformed_body_degrades_to_empty_fields() {
        let frame = parse_response("foo: bar\n\nbadline\n", "OK\n");

        assert!(frame.fields().is_empty());
        assert_eq!(frame.status(), "OK");
        assert_eq!(frame.raw(), "foo: bar\n\nbadline\nOK\n");
    }

    #[test]
    fn test_value_keeps_later_separators() {
        let frame = parse_response("Title: Live: Part 1\n", "OK\n");

        assert_eq!(frame.first("Title"), Some("Live: Part 1"));
    }

    #[test]
    fn test_empty_body() {
        let frame = parse_response("", "OK\n");

        assert!(frame.fields().is_empty());
        assert_eq!(frame.status(), "OK");
        assert_eq!(frame.raw(), "OK\n");
        assert!(frame.is_ok());
        assert!(!frame.is_ack());
    }

    #[test]
    fn test_missing_key_reads_as_empty() {
        let frame = parse_response("", "OK\n");

        assert_eq!(frame.first("changed"), None);
        assert!(frame.changed().is_empty());
    }

    #[test]
    fn test_changed_subsystems() {
        let frame = parse_response("changed: player\nchanged: mixer\n", "OK\n");

        assert_eq!(frame.changed(), ["player".to_string(), "mixer".to_string()]);
    }

    #[test]
    fn test_classify_status_lines() {
        assert_eq!(StatusKind::classify("OK\n"), Some(StatusKind::Ok));
        assert_eq!(StatusKind::classify("OK MPD 0.23.5\n"), Some(StatusKind::Ok));
        assert_eq!(StatusKind::classify("ACK\n"), Some(StatusKind::Ack));
        assert_eq!(
            StatusKind::classify("ACK [50@0] {play} No such song\n"),
            Some(StatusKind::Ack)
        );
        assert_eq!(StatusKind::classify("list_OK\n"), None);
        assert_eq!(StatusKind::classify("OKAY: 1\n"), None);
        assert_eq!(StatusKind::classify("file: OK\n"), None);
    }

    #[test]
    fn test_parse_ack_details() {
        let frame = parse_response("", "ACK [50@1] {play} No such song\n");

        let ack = frame.ack().expect("structured ACK");
        assert_eq!(
            ack,
            AckError {
                code: 50,
                command_index: 1,
                command: "play".into(),
                message: "No such song".into(),
            }
        );
        assert_eq!(ack.to_string(), "[50@1] {play} No such song");
    }

    #[test]
    fn test_bare_ack_has_no_details() {
        let frame = parse_response("", "ACK\n");

        assert!(frame.is_ack());
        assert_eq!(frame.ack(), None);
    }

    #[test]
    fn test_parse_banner() {
        assert_eq!(parse_banner("OK MPD 0.23.5\n").as_deref(), Some("0.23.5"));
        assert_eq!(parse_banner("OK\n"), None);
        assert_eq!(parse_banner("ACK [5@0] {} go away\n"), None);
    }

    #[test]
    fn test_frame_serializes_untagged_values() {
        let frame = parse_response("foo: bar\nfoo: baz\nvolume: 7\n", "OK\n");

        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "fields": {"foo": ["bar", "baz"], "volume": "7"},
                "status": "OK",
                "raw": "foo: bar\nfoo: baz\nvolume: 7\nOK\n"
            })
        );
    }
}
