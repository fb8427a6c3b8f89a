//! Read-ahead cursor over one sorted line stream.
//!
//! The cursor holds the most recently read, not yet consumed line. Every call to
//! [`InputCursor::advance`] replaces it with the next line, checking that the
//! stream stays sorted ascending (byte-wise) and optionally skipping consecutive
//! duplicates.

use std::io::BufRead;

use crate::error::{MatchError, OrderViolation, Result};

/// What a cursor currently holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorState {
    /// Not advanced yet
    Pending,
    /// A line, terminator stripped
    Holding(Vec<u8>),
    /// Stream done: the source is drained and its last line consumed
    Exhausted,
}

/// One input stream with a single line of lookahead.
pub struct InputCursor<R> {
    name: String,
    reader: R,
    dedup: bool,
    state: CursorState,
    /// No more bytes to read. The held line may still be unconsumed.
    source_exhausted: bool,
    lines_read: u64,
    scratch: Vec<u8>,
}

impl<R: BufRead> InputCursor<R> {
    /// Wrap `reader`. With `dedup`, consecutive equal lines are read once.
    pub fn new(name: impl Into<String>, reader: R, dedup: bool) -> Self {
        Self {
            name: name.into(),
            reader,
            dedup,
            state: CursorState::Pending,
            source_exhausted: false,
            lines_read: 0,
            scratch: Vec::new(),
        }
    }

    /// Move to the next line.
    ///
    /// A line that sorts before the held one yields [`MatchError::OrderViolation`];
    /// the held line is left in place. Calling this after the stream is done is a
    /// no-op.
    pub fn advance(&mut self) -> Result<()> {
        if self.is_done() {
            return Ok(());
        }
        if self.source_exhausted {
            // Last line was unterminated and has now been consumed.
            self.state = CursorState::Exhausted;
            return Ok(());
        }

        loop {
            self.scratch.clear();
            let n = self
                .reader
                .read_until(b'\n', &mut self.scratch)
                .map_err(|source| MatchError::Io {
                    input: self.name.clone(),
                    after: self.current().map(|line| String::from_utf8_lossy(line).into_owned()),
                    source,
                })?;

            if n == 0 {
                self.source_exhausted = true;
                self.state = CursorState::Exhausted;
                return Ok(());
            }

            if self.scratch.last() == Some(&b'\n') {
                self.scratch.pop();
            } else {
                self.source_exhausted = true;
            }
            self.lines_read += 1;

            if let CursorState::Holding(held) = &self.state {
                if self.dedup && self.scratch == *held {
                    // Counted, but never reported.
                    if self.source_exhausted {
                        self.state = CursorState::Exhausted;
                        return Ok(());
                    }
                    continue;
                }
                if self.scratch < *held {
                    return Err(OrderViolation {
                        input: self.name.clone(),
                        line: self.lines_read,
                        previous: String::from_utf8_lossy(held).into_owned(),
                        offending: String::from_utf8_lossy(&self.scratch).into_owned(),
                    }
                    .into());
                }
            }

            match &mut self.state {
                CursorState::Holding(held) => std::mem::swap(held, &mut self.scratch),
                _ => self.state = CursorState::Holding(std::mem::take(&mut self.scratch)),
            }
            return Ok(());
        }
    }

    /// Stop reading this input. Its remaining lines are never reported.
    pub fn retire(&mut self) {
        self.source_exhausted = true;
        self.state = CursorState::Exhausted;
    }
}

impl<R> InputCursor<R> {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The held line, if any.
    #[must_use]
    pub fn current(&self) -> Option<&[u8]> {
        match &self.state {
            CursorState::Holding(line) => Some(line),
            _ => None,
        }
    }

    #[must_use]
    pub fn state(&self) -> &CursorState {
        &self.state
    }

    /// Physical lines consumed so far, including skipped duplicates.
    #[must_use]
    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }

    #[must_use]
    pub fn is_source_exhausted(&self) -> bool {
        self.source_exhausted
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.state == CursorState::Exhausted
    }
}
