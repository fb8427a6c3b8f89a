//! nmatch - N-way comparison of sorted line files
//!
//! Reads any number of sorted text files in lockstep and sorts every line into an
//! output named after the set of files containing it. For two files `a` and `b`:
//! `YN` holds lines only in `a`, `NY` lines only in `b` and `YY` lines in both.
//!
//! Memory stays bounded by one held line per input regardless of file size.
//!
//! ```
//! use std::io::Cursor;
//! use nmatch::{MatchOptions, NamedInput, Session};
//!
//! let inputs = vec![
//!     NamedInput::new("a", Cursor::new(b"x\ny\n".to_vec())),
//!     NamedInput::new("b", Cursor::new(b"y\nz\n".to_vec())),
//! ];
//! let outcome = Session::new(inputs, &MatchOptions::default(), |_| Ok(Vec::<u8>::new()))?.run()?;
//! let sinks = outcome.channels.into_sinks();
//! assert_eq!(sinks["YN"], b"x\n");
//! assert_eq!(sinks["YY"], b"y\n");
//! assert_eq!(sinks["NY"], b"z\n");
//! # Ok::<(), nmatch::MatchError>(())
//! ```

/// Output channels and pattern selection
pub mod channel;
/// Read-ahead input cursors
pub mod cursor;
pub mod engine;
pub mod error;
/// Input validation and output file creation
pub mod files;
pub mod pattern;
/// Text and JSON run reports
pub mod report;
pub mod session;

pub use channel::{ChannelSet, OutputChannel, Selection};
pub use cursor::InputCursor;
pub use engine::{MergeEngine, Step, ViolationPolicy};
pub use error::{MatchError, OrderViolation, Result};
pub use pattern::{Pattern, PatternSpace};
pub use session::{MatchOptions, MatchOutcome, MatchSummary, NamedInput, Session};
