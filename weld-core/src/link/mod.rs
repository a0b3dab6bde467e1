//! Line transport primitives.
//!
//! Bytes arrive in an interrupt or reader context and are framed into lines by
//! [`LineAssembler`]. Each complete line crosses into the control loop through
//! a one-slot [`LineMailbox`]. Replies leave through a [`LineSink`].

use core::cell::RefCell;
use core::fmt;

use critical_section::Mutex;
use heapless::Vec;
use portable_atomic::{AtomicBool, Ordering};

use crate::protocol::Reply;

/// Longest inbound line kept; further bytes are dropped.
pub const MAX_LINE_LEN: usize = 127;

/// One framed inbound line without its terminator.
pub type InboundLine = Vec<u8, MAX_LINE_LEN>;

/// Destination for outbound protocol lines.
pub trait LineSink {
    fn send(&mut self, reply: &Reply);

    /// Pushes queued lines onto the wire before the caller blocks.
    ///
    /// Called between `WELD_START` and the first stage.
    fn flush(&mut self) {}
}

impl<S: LineSink + ?Sized> LineSink for &mut S {
    fn send(&mut self, reply: &Reply) {
        (**self).send(reply);
    }

    fn flush(&mut self) {
        (**self).flush();
    }
}

#[cfg(feature = "alloc")]
impl LineSink for alloc::vec::Vec<alloc::string::String> {
    fn send(&mut self, reply: &Reply) {
        use alloc::string::ToString;

        self.push(reply.to_string());
    }
}

/// Errors reported by [`LineMailbox::offer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MailboxError {
    /// The previous line has not been taken yet.
    Occupied,
    /// The line exceeds [`MAX_LINE_LEN`].
    TooLong { len: usize },
}

impl fmt::Display for MailboxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MailboxError::Occupied => f.write_str("previous line not yet consumed"),
            MailboxError::TooLong { len } => {
                write!(f, "line of {len} bytes exceeds {MAX_LINE_LEN}")
            }
        }
    }
}

/// Single-producer, single-consumer hand-off for one complete line.
///
/// The producer only writes the slot while the ready flag is clear. The
/// consumer copies the slot out and clears the flag afterwards.
pub struct LineMailbox {
    ready: AtomicBool,
    slot: Mutex<RefCell<InboundLine>>,
}

impl LineMailbox {
    pub const fn new() -> Self {
        Self {
            ready: AtomicBool::new(false),
            slot: Mutex::new(RefCell::new(Vec::new())),
        }
    }

    /// Publishes `line` if the slot is free.
    pub fn offer(&self, line: &[u8]) -> Result<(), MailboxError> {
        if self.ready.load(Ordering::Acquire) {
            return Err(MailboxError::Occupied);
        }
        if line.len() > MAX_LINE_LEN {
            return Err(MailboxError::TooLong { len: line.len() });
        }

        critical_section::with(|cs| {
            let mut slot = self.slot.borrow_ref_mut(cs);
            slot.clear();
            // Length checked above.
            let _ = slot.extend_from_slice(line);
        });
        self.ready.store(true, Ordering::Release);
        Ok(())
    }

    /// Removes the pending line, if any.
    pub fn take(&self) -> Option<InboundLine> {
        if !self.ready.load(Ordering::Acquire) {
            return None;
        }

        let line = critical_section::with(|cs| self.slot.borrow_ref(cs).clone());
        self.ready.store(false, Ordering::Release);
        Some(line)
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }
}

impl Default for LineMailbox {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of feeding a line terminator to the assembler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Framed {
    /// The line was placed in the mailbox.
    Delivered { len: usize, truncated: bool },
    /// The mailbox still held the previous line, so this one was discarded.
    Dropped { len: usize },
}

/// Frames a byte stream into lines terminated by `\r` or `\n`.
///
/// Empty lines are ignored and bytes beyond [`MAX_LINE_LEN`] are discarded.
#[derive(Clone, Debug, Default)]
pub struct LineAssembler {
    buffer: InboundLine,
    truncated: bool,
}

impl LineAssembler {
    pub const fn new() -> Self {
        Self {
            buffer: Vec::new(),
            truncated: false,
        }
    }

    /// Feeds one byte, publishing a finished line to `mailbox`.
    pub fn push(&mut self, byte: u8, mailbox: &LineMailbox) -> Option<Framed> {
        match byte {
            b'\r' | b'\n' => self.terminate(mailbox),
            other => {
                if self.buffer.push(other).is_err() {
                    self.truncated = true;
                }
                None
            }
        }
    }

    /// Bytes buffered for the line in progress.
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    fn terminate(&mut self, mailbox: &LineMailbox) -> Option<Framed> {
        let truncated = core::mem::take(&mut self.truncated);
        if self.buffer.is_empty() {
            return None;
        }

        let len = self.buffer.len();
        let framed = match mailbox.offer(&self.buffer) {
            Ok(()) => Framed::Delivered { len, truncated },
            Err(_) => Framed::Dropped { len },
        };
        self.buffer.clear();
        Some(framed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(assembler: &mut LineAssembler, mailbox: &LineMailbox, bytes: &[u8]) -> Option<Framed> {
        let mut last = None;
        for byte in bytes {
            if let Some(framed) = assembler.push(*byte, mailbox) {
                last = Some(framed);
            }
        }
        last
    }

    #[test]
    fn mailbox_holds_one_line_until_taken() {
        let mailbox = LineMailbox::new();
        assert_eq!(mailbox.take(), None);
        mailbox.offer(b"STATUS").unwrap();
        assert!(mailbox.is_ready());
        assert_eq!(mailbox.offer(b"ARM,1"), Err(MailboxError::Occupied));
        assert_eq!(mailbox.take().as_deref(), Some(&b"STATUS"[..]));
        assert!(!mailbox.is_ready());
        mailbox.offer(b"ARM,1").unwrap();
        assert_eq!(mailbox.take().as_deref(), Some(&b"ARM,1"[..]));
    }

    #[test]
    fn mailbox_rejects_oversized_lines() {
        let mailbox = LineMailbox::new();
        let long = [b'A'; MAX_LINE_LEN + 1];
        assert_eq!(
            mailbox.offer(&long),
            Err(MailboxError::TooLong {
                len: MAX_LINE_LEN + 1
            })
        );
        assert!(!mailbox.is_ready());
    }

    #[test]
    fn either_terminator_ends_a_line_and_blank_lines_vanish() {
        let mailbox = LineMailbox::new();
        let mut assembler = LineAssembler::new();
        assert_eq!(
            feed(&mut assembler, &mailbox, b"ARM,1\r"),
            Some(Framed::Delivered {
                len: 5,
                truncated: false
            })
        );
        assert_eq!(mailbox.take().as_deref(), Some(&b"ARM,1"[..]));
        assert_eq!(feed(&mut assembler, &mailbox, b"\n\r\n"), None);
        assert!(!mailbox.is_ready());
    }

    #[test]
    fn overflow_bytes_are_dropped() {
        let mailbox = LineMailbox::new();
        let mut assembler = LineAssembler::new();
        for _ in 0..MAX_LINE_LEN + 10 {
            assembler.push(b'X', &mailbox);
        }
        assert_eq!(
            assembler.push(b'\n', &mailbox),
            Some(Framed::Delivered {
                len: MAX_LINE_LEN,
                truncated: true
            })
        );
        assert_eq!(mailbox.take().map(|line| line.len()), Some(MAX_LINE_LEN));
    }

    #[test]
    fn line_arriving_while_occupied_is_dropped() {
        let mailbox = LineMailbox::new();
        let mut assembler = LineAssembler::new();
        feed(&mut assembler, &mailbox, b"SET_POWER,80\n");
        assert_eq!(
            feed(&mut assembler, &mailbox, b"CMD,FIRE\n"),
            Some(Framed::Dropped { len: 8 })
        );
        assert_eq!(mailbox.take().as_deref(), Some(&b"SET_POWER,80"[..]));
        assert!(assembler.pending().is_empty());
    }
}
