//! Generic command construction.
//!
//! The client does not enumerate the server's command set; any command is a
//! name plus byte-string arguments, encoded on the wire as one multi-bulk
//! array frame.

use crate::frame::{Frame, PushFrame};
use bytes::Bytes;

/// One command ready to be sent.
///
/// ```
/// use redis_worker::Command;
///
/// let cmd = Command::new("SET").arg("greeting").arg("hello");
/// ```
#[derive(Debug, Clone)]
pub struct Command {
    args: Vec<Bytes>,
}

impl Command {
    pub fn new(name: impl AsRef<[u8]>) -> Command {
        Command {
            args: vec![Bytes::copy_from_slice(name.as_ref())],
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl AsRef<[u8]>) -> Command {
        self.args.push(Bytes::copy_from_slice(arg.as_ref()));
        self
    }

    /// Build a command from a textual command line, split on whitespace.
    ///
    /// Mirrors the inline-command convention: `"INCR counter"` becomes
    /// `INCR` with one argument. There is no quoting; arguments containing
    /// whitespace must go through [`Command::arg`]. Returns `None` for a
    /// blank line.
    pub fn from_line(line: &str) -> Option<Command> {
        let mut words = line.split_ascii_whitespace();
        let name = words.next()?;

        let mut cmd = Command::new(name);
        for word in words {
            cmd = cmd.arg(word);
        }

        Some(cmd)
    }

    /// Encode as the multi-bulk array frame the wire expects.
    pub(crate) fn to_frame(&self) -> Frame {
        let mut frame = vec![];
        for arg in &self.args {
            frame.push_bulk(arg.clone());
        }

        frame.into()
    }
}
