//! Membership patterns over N inputs.
//!
//! A pattern records which inputs hold the current minimum line. Its index is a
//! bit vector where bit `i` stands for the cursor at position `i`; its label renders
//! the same bits most significant first, `Y` for present and `N` for absent.
//!
//! For two inputs the space is `NN NY YN YY`, in index order 0..=3.

use std::fmt;

use crate::error::{MatchError, Result};

/// Label character for an input that holds the value
pub const PRESENT: char = 'Y';
/// Label character for an input that does not
pub const ABSENT: char = 'N';

/// Largest supported number of inputs.
///
/// 16 inputs already mean 65 535 output channels.
pub const MAX_INPUTS: usize = 16;

/// One membership pattern: `width` input bits packed into `index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pattern {
    index: u32,
    width: u8,
}

impl Pattern {
    /// Build a pattern from its index. Bits above `width` are masked off.
    ///
    /// # Panics
    ///
    /// If `width` exceeds [`MAX_INPUTS`].
    #[must_use]
    pub fn new(index: u32, width: usize) -> Self {
        assert!(width <= MAX_INPUTS, "pattern width {width} exceeds {MAX_INPUTS}");
        let mask = if width == 0 { 0 } else { u32::MAX >> (32 - width) };
        Self { index: index & mask, width: width as u8 }
    }

    /// Pattern with exactly the given cursor positions present.
    #[must_use]
    pub fn from_positions(positions: &[usize], width: usize) -> Self {
        let index = positions.iter().fold(0u32, |acc, &pos| acc | (1 << pos));
        Self::new(index, width)
    }

    /// Parse a `Y`/`N` label. Its length must equal `width`.
    pub fn parse(label: &str, width: usize) -> Result<Self> {
        if width > MAX_INPUTS {
            return Err(MatchError::TooManyInputs { count: width, max: MAX_INPUTS });
        }
        let len = label.chars().count();
        if len != width {
            return Err(MatchError::InvalidPattern {
                pattern: label.to_string(),
                reason: format!("expected {width} characters (one per input), got {len}"),
            });
        }

        let mut index = 0u32;
        for ch in label.chars() {
            index <<= 1;
            match ch {
                PRESENT => index |= 1,
                ABSENT => {}
                other => {
                    return Err(MatchError::InvalidPattern {
                        pattern: label.to_string(),
                        reason: format!("unexpected character {other:?}, only {PRESENT} and {ABSENT} are allowed"),
                    })
                }
            }
        }
        Ok(Self::new(index, width))
    }

    /// Index of this pattern in its [`PatternSpace`].
    #[must_use]
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Number of inputs this pattern covers.
    #[must_use]
    pub fn width(&self) -> usize {
        usize::from(self.width)
    }

    /// Whether the cursor at `position` is part of this pattern.
    #[must_use]
    pub fn contains(&self, position: usize) -> bool {
        position < self.width() && self.index & (1 << position) != 0
    }

    /// No input present. Never materialized as an output.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index == 0
    }

    /// Every input present: the intersection of all inputs.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.width > 0 && self.index.count_ones() == u32::from(self.width)
    }

    /// The `Y`/`N` rendering, most significant bit first.
    #[must_use]
    pub fn label(&self) -> String {
        (0..self.width())
            .rev()
            .map(|pos| if self.contains(pos) { PRESENT } else { ABSENT })
            .collect()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Every pattern over `width` inputs, in index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternSpace {
    width: usize,
}

impl PatternSpace {
    /// Pattern space over `width` inputs.
    pub fn new(width: usize) -> Result<Self> {
        if width > MAX_INPUTS {
            return Err(MatchError::TooManyInputs { count: width, max: MAX_INPUTS });
        }
        Ok(Self { width })
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of patterns: `2^width`, or 0 for no inputs.
    #[must_use]
    pub fn len(&self) -> usize {
        if self.width == 0 {
            0
        } else {
            1 << self.width
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All patterns, index 0 (all absent) first.
    pub fn iter(&self) -> impl Iterator<Item = Pattern> + '_ {
        (0..self.len() as u32).map(move |index| Pattern::new(index, self.width))
    }

    /// Patterns that can carry output: everything but the all-absent one.
    pub fn outputs(&self) -> impl Iterator<Item = Pattern> + '_ {
        self.iter().filter(|pattern| !pattern.is_empty())
    }

    /// All labels in index order.
    #[must_use]
    pub fn labels(&self) -> Vec<String> {
        self.iter().map(|pattern| pattern.label()).collect()
    }
}
