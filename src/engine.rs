//! The merge/compare/dispatch loop.
//!
//! Every step takes the smallest line held by any cursor, collects all cursors
//! holding that same line, writes the line once to the channel of the resulting
//! pattern and advances exactly those cursors. Cursors that ran out hold nothing
//! and never take part in the minimum.
//!
//! ## Positional convention
//!
//! Cursor `i` is bit `i` of the pattern index, so the first cursor is the *last*
//! label character. Callers wanting argument order to match label order hand the
//! cursors over reversed; [`crate::session::Session`] does this.

use std::io::{BufRead, Write};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::channel::ChannelSet;
use crate::cursor::InputCursor;
use crate::error::{MatchError, OrderViolation, Result};
use crate::pattern::Pattern;

const PROGRESS_INTERVAL: Duration = Duration::from_secs(10);
/// Steps between clock checks for the progress report
const PROGRESS_CHECK_STEPS: u64 = 1 << 16;

/// What to do when an input turns out to be unsorted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViolationPolicy {
    /// Fail the whole run
    #[default]
    Abort,
    /// Retire the offending input, record the violation and keep merging the rest
    Isolate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Cursors not primed yet
    Ready,
    Running,
    Done,
    /// A step returned an error; no further reads or writes happen
    Failed,
}

/// Outcome of a single [`MergeEngine::step`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// One line matched `pattern`; `written` is false for inactive channels.
    Dispatched { pattern: Pattern, written: bool },
    /// All cursors exhausted
    Done,
}

/// Per-input outcome of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputSummary {
    pub name: String,
    pub lines_read: u64,
}

/// Drives cursors into channels.
pub struct MergeEngine<'a, R, W> {
    cursors: Vec<InputCursor<R>>,
    channels: &'a mut ChannelSet<W>,
    policy: ViolationPolicy,
    state: EngineState,
    participants: Vec<usize>,
    violations: Vec<OrderViolation>,
    steps: u64,
}

impl<'a, R: BufRead, W: Write> MergeEngine<'a, R, W> {
    /// `channels` must span exactly as many inputs as there are cursors.
    pub fn new(
        cursors: Vec<InputCursor<R>>,
        channels: &'a mut ChannelSet<W>,
        policy: ViolationPolicy,
    ) -> Result<Self> {
        if cursors.is_empty() {
            return Err(MatchError::NoInputs);
        }
        if channels.width() != cursors.len() {
            return Err(MatchError::WidthMismatch { channels: channels.width(), cursors: cursors.len() });
        }
        Ok(Self {
            participants: Vec::with_capacity(cursors.len()),
            cursors,
            channels,
            policy,
            state: EngineState::Ready,
            violations: Vec::new(),
            steps: 0,
        })
    }

    /// Advance every cursor once.
    fn prime(&mut self) -> Result<()> {
        for i in 0..self.cursors.len() {
            self.advance_cursor(i)?;
        }
        self.state = EngineState::Running;
        Ok(())
    }

    fn advance_cursor(&mut self, i: usize) -> Result<()> {
        let cursor = &mut self.cursors[i];
        match cursor.advance() {
            Ok(()) => {
                if cursor.is_done() {
                    log::debug!("{}: exhausted after {} lines", cursor.name(), cursor.lines_read());
                }
                Ok(())
            }
            Err(MatchError::OrderViolation(violation)) if self.policy == ViolationPolicy::Isolate => {
                log::warn!("{violation}; ignoring the rest of {}", cursor.name());
                cursor.retire();
                self.violations.push(violation);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Collect the cursors holding the smallest line into `participants`.
    fn collect_minimum(&mut self) {
        self.participants.clear();
        let mut min: Option<&[u8]> = None;
        for (i, cursor) in self.cursors.iter().enumerate() {
            let Some(line) = cursor.current() else { continue };
            match min {
                Some(m) if line > m => {}
                Some(m) if line == m => self.participants.push(i),
                _ => {
                    min = Some(line);
                    self.participants.clear();
                    self.participants.push(i);
                }
            }
        }
    }

    /// Run one dispatch step.
    ///
    /// After an error the engine is failed: cursors may be half advanced, so every
    /// later call returns [`MatchError::EngineFailed`] without touching any input.
    pub fn step(&mut self) -> Result<Step> {
        if self.state == EngineState::Failed {
            return Err(MatchError::EngineFailed);
        }
        let result = self.dispatch();
        if result.is_err() {
            self.state = EngineState::Failed;
        }
        result
    }

    fn dispatch(&mut self) -> Result<Step> {
        match self.state {
            EngineState::Done => return Ok(Step::Done),
            EngineState::Ready => self.prime()?,
            EngineState::Running | EngineState::Failed => {}
        }

        self.collect_minimum();
        let Some(&first) = self.participants.first() else {
            self.state = EngineState::Done;
            return Ok(Step::Done);
        };

        let pattern = Pattern::from_positions(&self.participants, self.cursors.len());
        let mut written = false;
        if let Some(channel) = self.channels.get_mut(pattern) {
            if channel.is_active() {
                if let Some(line) = self.cursors[first].current() {
                    written = channel.write(line)?;
                }
            }
        }

        for k in 0..self.participants.len() {
            let i = self.participants[k];
            self.advance_cursor(i)?;
        }
        self.steps += 1;

        Ok(Step::Dispatched { pattern, written })
    }

    /// Step until every cursor is exhausted.
    pub fn run(&mut self) -> Result<()> {
        log::info!("Merging {} inputs into {} channels", self.cursors.len(), self.channels.len());
        let start = Instant::now();
        let mut last_report = Instant::now();

        while let Step::Dispatched { .. } = self.step()? {
            if self.steps % PROGRESS_CHECK_STEPS == 0 && last_report.elapsed() >= PROGRESS_INTERVAL {
                log::info!("  Steps: {}, lines read: {}", self.steps, self.lines_read());
                last_report = Instant::now();
            }
        }

        log::info!(
            "Merge complete: {} steps, {} lines read in {:.1}s",
            self.steps,
            self.lines_read(),
            start.elapsed().as_secs_f64()
        );
        Ok(())
    }
}

impl<R, W> MergeEngine<'_, R, W> {
    #[must_use]
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Dispatch steps taken so far
    #[must_use]
    pub fn steps(&self) -> u64 {
        self.steps
    }

    #[must_use]
    pub fn cursors(&self) -> &[InputCursor<R>] {
        &self.cursors
    }

    /// Violations tolerated under [`ViolationPolicy::Isolate`].
    #[must_use]
    pub fn violations(&self) -> &[OrderViolation] {
        &self.violations
    }

    fn lines_read(&self) -> u64 {
        self.cursors.iter().map(InputCursor::lines_read).sum()
    }

    /// Per-cursor line counts, in cursor order.
    #[must_use]
    pub fn input_summaries(&self) -> Vec<InputSummary> {
        self.cursors
            .iter()
            .map(|cursor| InputSummary { name: cursor.name().to_string(), lines_read: cursor.lines_read() })
            .collect()
    }

    /// Release the cursors, keeping the violations.
    pub fn finish(self) -> (Vec<InputSummary>, Vec<OrderViolation>) {
        (self.input_summaries(), self.violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Selection;
    use crate::pattern::PatternSpace;
    use std::collections::BTreeMap;
    use std::io::Cursor;

    type Mem = Cursor<Vec<u8>>;

    fn cursors(inputs: &[&[&str]], dedup: bool) -> Vec<InputCursor<Mem>> {
        inputs
            .iter()
            .enumerate()
            .map(|(i, lines)| {
                let data: String = lines.iter().map(|l| format!("{l}\n")).collect();
                InputCursor::new(i.to_string(), Cursor::new(data.into_bytes()), dedup)
            })
            .collect()
    }

    fn channels(width: usize, selection: &Selection) -> ChannelSet<Vec<u8>> {
        ChannelSet::build(PatternSpace::new(width).unwrap(), selection, |_| Ok(Vec::new())).unwrap()
    }

    fn outputs(set: ChannelSet<Vec<u8>>) -> BTreeMap<String, String> {
        set.into_sinks()
            .into_iter()
            .map(|(label, sink)| (label, String::from_utf8(sink).unwrap()))
            .collect()
    }

    fn run(inputs: &[&[&str]], dedup: bool) -> BTreeMap<String, String> {
        let mut set = channels(inputs.len(), &Selection::All);
        let mut engine = MergeEngine::new(cursors(inputs, dedup), &mut set, ViolationPolicy::Abort).unwrap();
        engine.run().unwrap();
        assert_eq!(engine.state(), EngineState::Done);
        outputs(set)
    }

    #[test]
    fn test_two_inputs() {
        // Cursor 0 is the last label character.
        let out = run(&[&["ab", "abc", "b", "bc"], &["a", "ab", "abc", "ac"]], false);
        assert_eq!(out["YN"], "a\nac\n");
        assert_eq!(out["NY"], "b\nbc\n");
        assert_eq!(out["YY"], "ab\nabc\n");
    }

    #[test]
    fn test_three_inputs() {
        let out = run(
            &[
                &["a", "ab", "abc", "ac"],
                &["ab", "abc", "b", "bc"],
                &["abc", "ac", "bc", "c", "cc"],
            ],
            false,
        );
        assert_eq!(out["NNY"], "a\n");
        assert_eq!(out["NYN"], "b\n");
        assert_eq!(out["NYY"], "ab\n");
        assert_eq!(out["YNN"], "c\ncc\n");
        assert_eq!(out["YNY"], "ac\n");
        assert_eq!(out["YYN"], "bc\n");
        assert_eq!(out["YYY"], "abc\n");
    }

    #[test]
    fn test_run_past_progress_check_boundary() {
        let total = PROGRESS_CHECK_STEPS * 2 + 3;
        let data: String = (0..total).map(|i| format!("{i:08}\n")).collect();
        let mut set = channels(1, &Selection::All);
        let cursors = vec![InputCursor::new("big", Cursor::new(data.into_bytes()), false)];
        let mut engine = MergeEngine::new(cursors, &mut set, ViolationPolicy::Abort).unwrap();
        engine.run().unwrap();
        assert_eq!(engine.steps(), total);
        assert_eq!(engine.lines_read(), total);
        drop(engine);
        assert_eq!(set.by_label("Y").unwrap().count(), total);
    }

    #[test]
    fn test_single_input_passes_through() {
        let out = run(&[&["a", "aa", "aaa"]], false);
        assert_eq!(out.len(), 1);
        assert_eq!(out["Y"], "a\naa\naaa\n");
    }

    #[test]
    fn test_duplicates_redispatched_without_dedup() {
        let out = run(&[&["a", "a", "b"], &["a"]], false);
        assert_eq!(out["YY"], "a\n");
        assert_eq!(out["NY"], "a\nb\n");
        let out = run(&[&["a", "a", "b"], &["a"]], true);
        assert_eq!(out["YY"], "a\n");
        assert_eq!(out["NY"], "b\n");
    }

    #[test]
    fn test_step_by_step() {
        let mut set = channels(2, &Selection::All);
        let mut engine =
            MergeEngine::new(cursors(&[&["a", "c"], &["b", "c"]], false), &mut set, ViolationPolicy::Abort).unwrap();
        assert_eq!(engine.state(), EngineState::Ready);

        let labels: Vec<String> = std::iter::from_fn(|| match engine.step().unwrap() {
            Step::Dispatched { pattern, written } => {
                assert!(written);
                Some(pattern.label())
            }
            Step::Done => None,
        })
        .collect();
        assert_eq!(labels, vec!["NY", "YN", "YY"]);
        assert_eq!(engine.steps(), 3);
        assert_eq!(engine.step().unwrap(), Step::Done);
    }

    #[test]
    fn test_inactive_channels_are_counted_as_steps_only() {
        let mut set = channels(2, &Selection::parse_list("YY"));
        let mut engine =
            MergeEngine::new(cursors(&[&["a", "c"], &["b", "c"]], false), &mut set, ViolationPolicy::Abort).unwrap();
        engine.run().unwrap();
        assert_eq!(engine.steps(), 3);
        drop(engine);
        assert_eq!(set.by_label("YY").unwrap().count(), 1);
        assert_eq!(set.by_label("NY").unwrap().count(), 0);
        assert_eq!(outputs(set)["YY"], "c\n");
    }

    #[test]
    fn test_order_violation_aborts() {
        let mut set = channels(2, &Selection::All);
        let mut engine =
            MergeEngine::new(cursors(&[&["a", "b"], &["c", "a"]], false), &mut set, ViolationPolicy::Abort).unwrap();
        let err = engine.run().unwrap_err();
        match err {
            MatchError::OrderViolation(v) => {
                assert_eq!(v.input, "1");
                assert_eq!(v.previous, "c");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_step_after_error_never_redispatches() {
        let mut set = channels(1, &Selection::All);
        let mut engine =
            MergeEngine::new(cursors(&[&["a", "c", "b", "d"]], false), &mut set, ViolationPolicy::Abort).unwrap();
        assert!(matches!(engine.step().unwrap(), Step::Dispatched { .. }));
        assert!(engine.step().unwrap_err().is_order_violation());
        assert_eq!(engine.state(), EngineState::Failed);

        for _ in 0..3 {
            assert!(matches!(engine.step(), Err(MatchError::EngineFailed)));
        }
        assert_eq!(engine.steps(), 1);
        assert!(matches!(engine.run(), Err(MatchError::EngineFailed)));
        drop(engine);
        assert_eq!(outputs(set)["Y"], "a\nc\n");
    }

    struct FailingSource;

    impl std::io::Read for FailingSource {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "unreadable"))
        }
    }

    #[test]
    fn test_failed_priming_is_not_retried() {
        let mut set = channels(1, &Selection::All);
        let cursor = InputCursor::new("x", std::io::BufReader::new(FailingSource), false);
        let mut engine = MergeEngine::new(vec![cursor], &mut set, ViolationPolicy::Abort).unwrap();
        assert!(matches!(engine.step(), Err(MatchError::Io { .. })));
        assert!(matches!(engine.step(), Err(MatchError::EngineFailed)));
        assert_eq!(engine.cursors()[0].lines_read(), 0);
    }

    #[test]
    fn test_order_violation_isolated() {
        let mut set = channels(2, &Selection::All);
        let mut engine = MergeEngine::new(
            cursors(&[&["a", "b", "d"], &["b", "a", "d"]], false),
            &mut set,
            ViolationPolicy::Isolate,
        )
        .unwrap();
        engine.run().unwrap();
        let (inputs, violations) = engine.finish();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].input, "1");
        assert_eq!(violations[0].line, 2);
        assert_eq!(inputs[1].lines_read, 2);
        let out = outputs(set);
        assert_eq!(out["NY"], "a\nd\n");
        assert_eq!(out["YY"], "b\n");
        assert_eq!(out["YN"], "");
    }

    #[test]
    fn test_empty_inputs_finish_immediately() {
        let out = run(&[&[], &[]], false);
        assert!(out.values().all(String::is_empty));
    }

    #[test]
    fn test_mismatched_width_rejected() {
        let mut set = channels(3, &Selection::All);
        let result = MergeEngine::new(cursors(&[&["a"]], false), &mut set, ViolationPolicy::Abort);
        assert!(matches!(result, Err(MatchError::WidthMismatch { channels: 3, cursors: 1 })));
    }

    #[test]
    fn test_no_cursors_rejected() {
        let mut set = channels(0, &Selection::All);
        let result = MergeEngine::<Mem, Vec<u8>>::new(Vec::new(), &mut set, ViolationPolicy::Abort);
        assert!(matches!(result, Err(MatchError::NoInputs)));
    }
}
