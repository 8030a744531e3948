//! Pre-, post- and development-release segments.
//!
//! A segment keeps the punctuation it was written with so that a parsed
//! version renders back to the same text. Whether the segment carries an
//! explicit number is tracked by [SegmentNumber] rather than a sentinel.

use std::fmt;

/// Number attached to a segment (`1.0a` vs `1.0a3`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentNumber {
    /// Segment present without an explicit number
    Unnumbered,
    /// Segment present with an explicit number
    Numbered(u64),
}

impl SegmentNumber {
    /// Adds `value` to the number.
    ///
    /// An unnumbered segment only becomes numbered when `value` is positive.
    /// Going below zero falls back to unnumbered.
    pub fn bumped(self, value: i64) -> Self {
        match self {
            SegmentNumber::Unnumbered if value > 0 => SegmentNumber::Numbered(value as u64),
            SegmentNumber::Unnumbered => SegmentNumber::Unnumbered,
            SegmentNumber::Numbered(n) => match (n as i64).checked_add(value) {
                Some(r) if r >= 0 => SegmentNumber::Numbered(r as u64),
                _ => SegmentNumber::Unnumbered,
            },
        }
    }

    /// Adds `value`, clamping at zero. Used for the bare `-N` post form
    /// which always needs a number.
    pub fn bumped_clamped(self, value: i64) -> Self {
        let n = self.value_or_zero() as i64;
        SegmentNumber::Numbered(n.saturating_add(value).max(0) as u64)
    }

    /// Number used by normalization and ordering
    pub fn value_or_zero(self) -> u64 {
        match self {
            SegmentNumber::Unnumbered => 0,
            SegmentNumber::Numbered(n) => n,
        }
    }

    /// Builds the number of a freshly created segment.
    ///
    /// A value of one (or less) is written without a number: `1.0.post`.
    pub fn fresh(value: i64) -> Self {
        if value > 1 {
            SegmentNumber::Numbered(value as u64)
        } else {
            SegmentNumber::Unnumbered
        }
    }
}

/// One optional version segment as written in the source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Separator before the label (`.`, `-`, `_` or empty)
    pub sep: String,
    /// Stage label as written (`rc`, `Alpha`, `post`, `dev`); empty for `1.0-1`
    pub label: String,
    /// Separator between label and number
    pub opt_sep: String,
    pub number: SegmentNumber,
}

impl Segment {
    pub fn new(
        sep: impl Into<String>,
        label: impl Into<String>,
        opt_sep: impl Into<String>,
        number: SegmentNumber,
    ) -> Self {
        Segment {
            sep: sep.into(),
            label: label.into(),
            opt_sep: opt_sep.into(),
            number,
        }
    }

    /// Bare hyphen post-release (`1.0-1`)
    pub fn implicit_post(number: u64) -> Self {
        Segment::new("", "", "", SegmentNumber::Numbered(number))
    }

    pub fn is_implicit(&self) -> bool {
        self.label.is_empty()
    }

    /// Returns the segment with its number replaced
    pub fn with_number(mut self, number: SegmentNumber) -> Self {
        self.number = number;
        self
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_implicit() {
            return write!(f, "-{}", self.number.value_or_zero());
        }
        write!(f, "{}{}{}", self.sep, self.label, self.opt_sep)?;
        if let SegmentNumber::Numbered(n) = self.number {
            write!(f, "{}", n)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bump_unnumbered() {
        assert_eq!(
            SegmentNumber::Unnumbered.bumped(1),
            SegmentNumber::Numbered(1)
        );
        assert_eq!(SegmentNumber::Unnumbered.bumped(0), SegmentNumber::Unnumbered);
        assert_eq!(SegmentNumber::Unnumbered.bumped(-3), SegmentNumber::Unnumbered);
    }

    #[test]
    fn test_bump_numbered() {
        assert_eq!(
            SegmentNumber::Numbered(0).bumped(1),
            SegmentNumber::Numbered(1)
        );
        assert_eq!(
            SegmentNumber::Numbered(1).bumped(-1),
            SegmentNumber::Numbered(0)
        );
        assert_eq!(SegmentNumber::Numbered(0).bumped(-1), SegmentNumber::Unnumbered);
    }

    #[test]
    fn test_bump_clamped() {
        assert_eq!(
            SegmentNumber::Numbered(0).bumped_clamped(-1),
            SegmentNumber::Numbered(0)
        );
        assert_eq!(
            SegmentNumber::Numbered(1).bumped_clamped(-1),
            SegmentNumber::Numbered(0)
        );
        assert_eq!(
            SegmentNumber::Numbered(0).bumped_clamped(1),
            SegmentNumber::Numbered(1)
        );
    }

    #[test]
    fn test_fresh() {
        assert_eq!(SegmentNumber::fresh(0), SegmentNumber::Unnumbered);
        assert_eq!(SegmentNumber::fresh(1), SegmentNumber::Unnumbered);
        assert_eq!(SegmentNumber::fresh(2), SegmentNumber::Numbered(2));
    }

    #[test]
    fn test_display() {
        let seg = Segment::new("-", "RC", ".", SegmentNumber::Numbered(2));
        assert_eq!(seg.to_string(), "-RC.2");
        let seg = Segment::new(".", "post", "", SegmentNumber::Unnumbered);
        assert_eq!(seg.to_string(), ".post");
        assert_eq!(Segment::implicit_post(3).to_string(), "-3");
    }
}
