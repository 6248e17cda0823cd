//! Outbound command text.
//!
//! The engine does not know what individual commands mean. It only needs
//! to recognise the two idle commands and to wrap batches in command-list
//! markers.

/// Enters idle mode; the daemon answers only once something changes.
pub const IDLE: &str = "idle";

/// Cancels idle mode.
pub const NOIDLE: &str = "noidle";

pub const COMMAND_LIST_BEGIN: &str = "command_list_begin";
pub const COMMAND_LIST_OK_BEGIN: &str = "command_list_ok_begin";
pub const COMMAND_LIST_END: &str = "command_list_end";

/// Per-command acknowledgement inside a `command_list_ok_begin` batch.
pub const LIST_OK: &str = "list_OK";

/// Append the terminating newline if `command` lacks one.
pub fn normalize(command: &str) -> String {
    if command.ends_with('\n') {
        command.to_string()
    } else {
        format!("{}\n", command)
    }
}

fn verb(command: &str) -> Option<&str> {
    command.split_whitespace().next()
}

/// True for `idle`, with or without a subsystem filter (`idle player mixer`).
pub fn is_idle_entry(command: &str) -> bool {
    verb(command) == Some(IDLE)
}

pub fn is_noidle(command: &str) -> bool {
    verb(command) == Some(NOIDLE)
}

/// Build the text of a command list.
///
/// With `ok_variant` the daemon acknowledges every successful sub-command
/// with a `list_OK` line before the final status line.
///
/// # Example
///
/// ```
/// use mpdwire::protocol::command::command_list;
///
/// let text = command_list(["play", "setvol 50"], true);
/// assert_eq!(text, "command_list_ok_begin\nplay\nsetvol 50\ncommand_list_end\n");
/// ```
pub fn command_list<I, S>(commands: I, ok_variant: bool) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let begin = if ok_variant {
        COMMAND_LIST_OK_BEGIN
    } else {
        COMMAND_LIST_BEGIN
    };

    let mut text = normalize(begin);
    for command in commands {
        text.push_str(&normalize(command.as_ref()));
    }
    text.push_str(&normalize(COMMAND_LIST_END));
    text
}
