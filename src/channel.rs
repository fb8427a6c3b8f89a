//! Output channels, one per non-empty membership pattern.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;

use serde::Serialize;

use crate::error::{MatchError, Result};
use crate::pattern::{Pattern, PatternSpace};

/// Which channels get a sink.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    /// Every non-empty pattern
    #[default]
    All,
    /// Only these labels
    Labels(BTreeSet<String>),
}

impl Selection {
    /// Build from a list of labels; an empty list selects everything.
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: BTreeSet<String> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() {
            Selection::All
        } else {
            Selection::Labels(labels)
        }
    }

    /// Parse a comma separated list such as `NYY,NYN`. Blank entries are ignored.
    #[must_use]
    pub fn parse_list(list: &str) -> Self {
        Self::from_labels(list.split(',').map(str::trim).filter(|s| !s.is_empty()))
    }

    /// Resolve labels against `width` inputs, rejecting any that cannot occur.
    pub fn resolve(&self, width: usize) -> Result<Option<BTreeSet<Pattern>>> {
        match self {
            Selection::All => Ok(None),
            Selection::Labels(labels) => {
                let mut patterns = BTreeSet::new();
                for label in labels {
                    let pattern = Pattern::parse(label, width)?;
                    if pattern.is_empty() {
                        log::warn!("pattern {label} names no input and never receives lines");
                    }
                    patterns.insert(pattern);
                }
                Ok(Some(patterns))
            }
        }
    }
}

/// A sink bound to one pattern.
pub struct OutputChannel<W> {
    pattern: Pattern,
    label: String,
    sink: Option<W>,
    count: u64,
}

impl<W: Write> OutputChannel<W> {
    /// A channel that writes to `sink`.
    pub fn active(pattern: Pattern, sink: W) -> Self {
        Self { pattern, label: pattern.label(), sink: Some(sink), count: 0 }
    }

    /// A channel whose output is not wanted.
    pub fn inactive(pattern: Pattern) -> Self {
        Self { pattern, label: pattern.label(), sink: None, count: 0 }
    }

    /// Append `line` and a newline. Returns whether anything was written.
    pub fn write(&mut self, line: &[u8]) -> Result<bool> {
        let Some(sink) = self.sink.as_mut() else {
            return Ok(false);
        };
        sink.write_all(line)
            .and_then(|()| sink.write_all(b"\n"))
            .map_err(|source| MatchError::Write { label: self.label.clone(), source })?;
        self.count += 1;
        Ok(true)
    }

    pub fn flush(&mut self) -> Result<()> {
        if let Some(sink) = self.sink.as_mut() {
            sink.flush()
                .map_err(|source| MatchError::Write { label: self.label.clone(), source })?;
        }
        Ok(())
    }
}

impl<W> OutputChannel<W> {
    #[must_use]
    pub fn pattern(&self) -> Pattern {
        self.pattern
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.sink.is_some()
    }

    /// Lines written so far
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }

    #[must_use]
    pub fn sink(&self) -> Option<&W> {
        self.sink.as_ref()
    }

    pub fn into_sink(self) -> Option<W> {
        self.sink
    }
}

/// Per-channel outcome of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelSummary {
    pub label: String,
    pub active: bool,
    pub lines_written: u64,
}

/// Explicit mapping from pattern to channel, built once per session.
pub struct ChannelSet<W> {
    width: usize,
    channels: BTreeMap<Pattern, OutputChannel<W>>,
}

impl<W: Write> ChannelSet<W> {
    /// One channel per non-empty pattern over `space`. `open` is called for the
    /// selected patterns only, in index order.
    pub fn build<F>(space: PatternSpace, selection: &Selection, mut open: F) -> Result<Self>
    where
        F: FnMut(Pattern) -> Result<W>,
    {
        let selected = selection.resolve(space.width())?;
        let mut channels = BTreeMap::new();
        for pattern in space.outputs() {
            let wanted = selected.as_ref().map_or(true, |set| set.contains(&pattern));
            let channel = if wanted {
                OutputChannel::active(pattern, open(pattern)?)
            } else {
                OutputChannel::inactive(pattern)
            };
            channels.insert(pattern, channel);
        }
        Ok(Self { width: space.width(), channels })
    }

    /// Flush every active sink, reporting the first failure.
    pub fn flush_all(&mut self) -> Result<()> {
        let mut first_err = None;
        for channel in self.channels.values_mut() {
            if let Err(e) = channel.flush() {
                log::error!("{e}");
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

impl<W> ChannelSet<W> {
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    #[must_use]
    pub fn get(&self, pattern: Pattern) -> Option<&OutputChannel<W>> {
        self.channels.get(&pattern)
    }

    pub fn get_mut(&mut self, pattern: Pattern) -> Option<&mut OutputChannel<W>> {
        self.channels.get_mut(&pattern)
    }

    /// Look a channel up by its label.
    #[must_use]
    pub fn by_label(&self, label: &str) -> Option<&OutputChannel<W>> {
        Pattern::parse(label, self.width).ok().and_then(|pattern| self.channels.get(&pattern))
    }

    /// Channels in pattern index order.
    pub fn iter(&self) -> impl Iterator<Item = &OutputChannel<W>> {
        self.channels.values()
    }

    #[must_use]
    pub fn summaries(&self) -> Vec<ChannelSummary> {
        self.iter()
            .map(|channel| ChannelSummary {
                label: channel.label().to_string(),
                active: channel.is_active(),
                lines_written: channel.count(),
            })
            .collect()
    }

    /// Sinks of the active channels, keyed by label.
    pub fn into_sinks(self) -> BTreeMap<String, W> {
        self.channels
            .into_values()
            .filter_map(|channel| {
                let label = channel.label.clone();
                channel.into_sink().map(|sink| (label, sink))
            })
            .collect()
    }
}
