use serde::{Deserialize, Serialize};

/// Inclusive byte interval `[start, end]` inside the edited file.
///
/// A range always holds at least one byte. Segments own one of these and
/// never mutate it; edits replace the segment instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ByteRange {
    start: u64,
    end: u64,
}

impl ByteRange {
    /// Build an inclusive range, `None` when `end < start`.
    pub fn new(start: u64, end: u64) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// Build the range covering `len` bytes from `start`, `None` for empty lengths.
    pub fn with_len(start: u64, len: u64) -> Option<Self> {
        let last = len.checked_sub(1)?;
        Self::new(start, start.checked_add(last)?)
    }

    /// Convert an editor selection `[start, end)` to the inclusive convention.
    pub fn from_half_open(start: u64, end: u64) -> Option<Self> {
        Self::new(start, end.checked_sub(1)?)
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Always false, a range holds at least one byte.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Inclusive containment: `self.start <= other.start && other.end <= self.end`.
    pub fn contains(&self, other: &ByteRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Half-open form used by the display collaborator.
    pub fn to_half_open(&self) -> std::ops::Range<u64> {
        self.start..self.end + 1
    }

    /// Move the range so that offsets relative to `from` become relative to `to`.
    ///
    /// Used when stamping a template's layout onto another instance.
    pub fn rebase(&self, from: u64, to: u64) -> Option<Self> {
        let start = self.start.checked_sub(from)?.checked_add(to)?;
        let end = self.end.checked_sub(from)?.checked_add(to)?;
        Self::new(start, end)
    }

    /// True when `other` starts right after this range ends.
    pub fn is_followed_by(&self, other: &ByteRange) -> bool {
        self.end.checked_add(1) == Some(other.start)
    }

    /// Span both ranges, assuming `self` precedes `other`.
    pub fn join(&self, other: &ByteRange) -> Option<Self> {
        Self::new(self.start.min(other.start), self.end.max(other.end))
    }

    pub fn start_hex(&self) -> String {
        to_hex(self.start)
    }

    pub fn end_hex(&self) -> String {
        to_hex(self.end)
    }
}

impl std::fmt::Display for ByteRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// 10 digit zero padded lowercase hex offset
fn to_hex(position: u64) -> String {
    format!("{position:010x}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_length_is_inclusive() {
        let range = ByteRange::new(4, 7).unwrap();
        assert_eq!(range.len(), 4);
        assert_eq!(ByteRange::new(9, 9).unwrap().len(), 1);
    }

    #[test]
    fn test_reversed_bounds_rejected() {
        assert!(ByteRange::new(8, 7).is_none());
        assert!(ByteRange::with_len(3, 0).is_none());
    }

    #[rstest]
    #[case(0, 16, Some((0, 15)))]
    #[case(4, 8, Some((4, 7)))]
    #[case(5, 6, Some((5, 5)))]
    #[case(5, 5, None)]
    #[case(0, 0, None)]
    fn test_from_half_open(#[case] start: u64, #[case] end: u64, #[case] expected: Option<(u64, u64)>) {
        let range = ByteRange::from_half_open(start, end).map(|r| (r.start(), r.end()));
        assert_eq!(range, expected);
    }

    #[rstest]
    #[case((0, 15), (4, 7), true)]
    #[case((0, 15), (0, 15), true)]
    #[case((4, 7), (3, 7), false)]
    #[case((4, 7), (4, 8), false)]
    fn test_containment(#[case] outer: (u64, u64), #[case] inner: (u64, u64), #[case] expected: bool) {
        let outer = ByteRange::new(outer.0, outer.1).unwrap();
        let inner = ByteRange::new(inner.0, inner.1).unwrap();
        assert_eq!(outer.contains(&inner), expected);
    }

    #[test]
    fn test_rebase_keeps_relative_layout() {
        let child = ByteRange::new(12, 15).unwrap();
        let moved = child.rebase(8, 40).unwrap();
        assert_eq!((moved.start(), moved.end()), (44, 47));
        assert!(child.rebase(13, 0).is_none());
    }

    #[test]
    fn test_adjacency_and_join() {
        let left = ByteRange::new(0, 3).unwrap();
        let right = ByteRange::new(4, 9).unwrap();
        assert!(left.is_followed_by(&right));
        assert!(!right.is_followed_by(&left));
        assert_eq!(left.join(&right), ByteRange::new(0, 9));
    }

    #[test]
    fn test_half_open_round_trip() {
        let range = ByteRange::new(16, 31).unwrap();
        let half_open = range.to_half_open();
        assert_eq!(half_open, 16..32);
        assert_eq!(ByteRange::from_half_open(half_open.start, half_open.end), Some(range));
    }

    #[test]
    fn test_hex_offsets() {
        let range = ByteRange::new(255, 4096).unwrap();
        assert_eq!(range.start_hex(), "00000000ff");
        assert_eq!(range.end_hex(), "0000001000");
    }
}
