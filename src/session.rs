//! One merge run: inputs, channels and options, from setup to summary.

use std::io::{BufRead, Write};

use serde::Serialize;

use crate::channel::{ChannelSet, ChannelSummary, Selection};
use crate::cursor::InputCursor;
use crate::engine::{InputSummary, MergeEngine, ViolationPolicy};
use crate::error::{MatchError, OrderViolation, Result};
use crate::pattern::{Pattern, PatternSpace, MAX_INPUTS};

/// Options consumed by a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchOptions {
    /// Skip consecutive duplicate lines within each input
    pub dedup: bool,
    /// Which channels are written
    pub selection: Selection,
    pub violation_policy: ViolationPolicy,
}

/// An input stream and the name it is reported under.
pub struct NamedInput<R> {
    pub name: String,
    pub reader: R,
}

impl<R> NamedInput<R> {
    pub fn new(name: impl Into<String>, reader: R) -> Self {
        Self { name: name.into(), reader }
    }
}

/// Counts of a completed run. Inputs are in argument order, outputs in pattern order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchSummary {
    pub inputs: Vec<InputSummary>,
    pub outputs: Vec<ChannelSummary>,
    pub steps: u64,
    /// How unsorted inputs were handled
    pub violation_policy: ViolationPolicy,
    pub violations: Vec<OrderViolation>,
}

impl MatchSummary {
    /// Lines written across all channels.
    #[must_use]
    pub fn lines_written(&self) -> u64 {
        self.outputs.iter().map(|o| o.lines_written).sum()
    }

    /// Lines written to the channel labelled `label`, if it exists.
    #[must_use]
    pub fn written_to(&self, label: &str) -> Option<u64> {
        self.outputs.iter().find(|o| o.label == label).map(|o| o.lines_written)
    }
}

/// A finished run: its summary and the flushed channels.
pub struct MatchOutcome<W> {
    pub summary: MatchSummary,
    pub channels: ChannelSet<W>,
}

/// Cursors plus channels for exactly one run.
///
/// The first input becomes the first label character: inputs are handed to the
/// engine in reverse, so input `k` of `n` sits at cursor `n - 1 - k`.
pub struct Session<R, W> {
    cursors: Vec<InputCursor<R>>,
    channels: ChannelSet<W>,
    policy: ViolationPolicy,
}

impl<R: BufRead, W: Write> Session<R, W> {
    /// Validate options against `inputs` and open the selected sinks.
    pub fn new<F>(inputs: Vec<NamedInput<R>>, options: &MatchOptions, open: F) -> Result<Self>
    where
        F: FnMut(Pattern) -> Result<W>,
    {
        if inputs.is_empty() {
            return Err(MatchError::NoInputs);
        }
        if inputs.len() > MAX_INPUTS {
            return Err(MatchError::TooManyInputs { count: inputs.len(), max: MAX_INPUTS });
        }

        let space = PatternSpace::new(inputs.len())?;
        let channels = ChannelSet::build(space, &options.selection, open)?;
        let cursors = inputs
            .into_iter()
            .rev()
            .map(|input| InputCursor::new(input.name, input.reader, options.dedup))
            .collect();

        Ok(Self { cursors, channels, policy: options.violation_policy })
    }

    /// Run the merge to completion. Sinks are flushed on success and failure.
    pub fn run(mut self) -> Result<MatchOutcome<W>> {
        let mut engine = MergeEngine::new(self.cursors, &mut self.channels, self.policy)?;
        let result = engine.run();
        let steps = engine.steps();
        let (mut inputs, violations) = engine.finish();

        let flushed = self.channels.flush_all();
        result?;
        flushed?;

        inputs.reverse();
        let summary = MatchSummary {
            inputs,
            outputs: self.channels.summaries(),
            steps,
            violation_policy: self.policy,
            violations,
        };
        Ok(MatchOutcome { summary, channels: self.channels })
    }
}
