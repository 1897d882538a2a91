//! Interval-based character sets.
//!
//! `IntCharSet` represents an arbitrary set of character codes as an ordered
//! sequence of inclusive intervals. The sequence is kept sorted, pairwise
//! disjoint, and non-adjacent after every operation, so equality of sets is
//! equality of interval lists.
//!
//! Character codes are plain `u32` values in `0..=max_char`, where `max_char`
//! is the generator-wide alphabet ceiling (see [`crate::CharDomain`]).

/// A single inclusive range `[start, end]` of character codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: u32,
    pub end: u32,
}

impl Interval {
    /// Create an interval. `start` must not exceed `end`.
    pub fn new(start: u32, end: u32) -> Self {
        debug_assert!(start <= end, "empty interval [{start}, {end}]");
        Interval { start, end }
    }

    /// Whether `code` lies within this interval.
    #[inline]
    pub fn contains(&self, code: u32) -> bool {
        self.start <= code && code <= self.end
    }

    /// Number of codes covered.
    pub fn len(&self) -> usize {
        (self.end - self.start + 1) as usize
    }
}

/// An ordered, disjoint, non-adjacent sequence of intervals representing an
/// arbitrary character set.
///
/// Invariant: for consecutive intervals `a`, `b` it always holds that
/// `a.end + 1 < b.start` — intervals never touch or overlap.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IntCharSet {
    intervals: Vec<Interval>,
}

impl IntCharSet {
    /// The empty set.
    pub fn new() -> Self {
        IntCharSet { intervals: Vec::new() }
    }

    /// The set containing a single code.
    pub fn single(code: u32) -> Self {
        IntCharSet { intervals: vec![Interval::new(code, code)] }
    }

    /// The set covering one inclusive range.
    pub fn range(start: u32, end: u32) -> Self {
        IntCharSet { intervals: vec![Interval::new(start, end)] }
    }

    /// View of the underlying interval list.
    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Number of codes in the set.
    pub fn len(&self) -> usize {
        self.intervals.iter().map(Interval::len).sum()
    }

    /// Whether `code` is a member.
    pub fn contains(&self, code: u32) -> bool {
        // Intervals are sorted, so a binary search on start would do; linear
        // scan is fine at the interval counts seen in practice.
        self.intervals.iter().any(|iv| iv.contains(code))
    }

    /// Insert one interval, merging with any intervals it overlaps or touches.
    pub fn add_interval(&mut self, iv: Interval) {
        let mut start = iv.start;
        let mut end = iv.end;

        // Position of the first interval that could merge with [start, end].
        let mut i = 0;
        while i < self.intervals.len() && self.intervals[i].end.saturating_add(1) < start {
            i += 1;
        }

        // Absorb every interval that overlaps or is adjacent.
        let mut j = i;
        while j < self.intervals.len() && self.intervals[j].start <= end.saturating_add(1) {
            start = start.min(self.intervals[j].start);
            end = end.max(self.intervals[j].end);
            j += 1;
        }

        self.intervals.splice(i..j, [Interval::new(start, end)]);
    }

    /// Set union: add every code of `other` to `self`.
    pub fn add(&mut self, other: &IntCharSet) {
        for iv in &other.intervals {
            self.add_interval(*iv);
        }
    }

    /// Set intersection, returned as a new set.
    pub fn and(&self, other: &IntCharSet) -> IntCharSet {
        let mut result = IntCharSet::new();
        let (mut i, mut j) = (0, 0);
        while i < self.intervals.len() && j < other.intervals.len() {
            let a = self.intervals[i];
            let b = other.intervals[j];
            let start = a.start.max(b.start);
            let end = a.end.min(b.end);
            if start <= end {
                // Directly pushed: overlaps of two disjoint sorted lists are
                // themselves disjoint, non-adjacent, and in order.
                result.intervals.push(Interval::new(start, end));
            }
            if a.end < b.end {
                i += 1;
            } else {
                j += 1;
            }
        }
        result
    }

    /// Set difference, in place: remove every code of `other` from `self`.
    pub fn sub(&mut self, other: &IntCharSet) {
        let mut result: Vec<Interval> = Vec::with_capacity(self.intervals.len());
        for &iv in &self.intervals {
            let mut start = iv.start;
            let end = iv.end;
            for &cut in &other.intervals {
                if cut.end < start {
                    continue;
                }
                if cut.start > end {
                    break;
                }
                if cut.start > start {
                    result.push(Interval::new(start, cut.start - 1));
                }
                if cut.end >= end {
                    // Rest of iv is removed entirely.
                    start = end.wrapping_add(1);
                    break;
                }
                start = cut.end + 1;
            }
            if start <= end && start != end.wrapping_add(1) {
                result.push(Interval::new(start, end));
            }
        }
        self.intervals = result;
    }

    /// Complement relative to the domain `0..=max_char`.
    pub fn complement(&self, max_char: u32) -> IntCharSet {
        let mut full = IntCharSet::range(0, max_char);
        full.sub(self);
        full
    }

    /// Whether `self` is a subset of `other`.
    pub fn is_subset_of(&self, other: &IntCharSet) -> bool {
        self.and(other) == *self
    }

    /// Close the set under simple upper/lower/title case mappings, clipped to
    /// the domain. Title case coincides with the simple uppercase mapping for
    /// every character we can represent here.
    pub fn case_closure(&mut self, max_char: u32) {
        let mut extra = IntCharSet::new();
        for code in self.codes() {
            let Some(ch) = char::from_u32(code) else { continue };
            for up in ch.to_uppercase() {
                let c = up as u32;
                if c <= max_char {
                    extra.add_interval(Interval::new(c, c));
                }
            }
            for lo in ch.to_lowercase() {
                let c = lo as u32;
                if c <= max_char {
                    extra.add_interval(Interval::new(c, c));
                }
            }
        }
        self.add(&extra);
    }

    /// Iterate over every code in the set in ascending order.
    pub fn codes(&self) -> impl Iterator<Item = u32> + '_ {
        self.intervals.iter().flat_map(|iv| iv.start..=iv.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_merges_adjacent() {
        let mut set = IntCharSet::single(b'a' as u32);
        set.add_interval(Interval::new(b'b' as u32, b'd' as u32));
        assert_eq!(set.intervals().len(), 1, "adjacent intervals must merge");
        assert_eq!(set.intervals()[0], Interval::new(b'a' as u32, b'd' as u32));
    }

    #[test]
    fn test_add_merges_overlapping() {
        let mut set = IntCharSet::range(10, 20);
        set.add_interval(Interval::new(15, 30));
        set.add_interval(Interval::new(5, 9));
        assert_eq!(set.intervals(), &[Interval::new(5, 30)]);
    }

    #[test]
    fn test_add_keeps_gaps() {
        let mut set = IntCharSet::range(10, 20);
        set.add_interval(Interval::new(30, 40));
        assert_eq!(set.intervals().len(), 2);
        assert!(!set.contains(25));
        assert!(set.contains(35));
    }

    #[test]
    fn test_and() {
        let a = IntCharSet::range(0, 50);
        let mut b = IntCharSet::range(40, 60);
        b.add_interval(Interval::new(70, 80));
        let both = a.and(&b);
        assert_eq!(both.intervals(), &[Interval::new(40, 50)]);
    }

    #[test]
    fn test_sub_splits_interval() {
        let mut set = IntCharSet::range(0, 100);
        set.sub(&IntCharSet::range(40, 60));
        assert_eq!(
            set.intervals(),
            &[Interval::new(0, 39), Interval::new(61, 100)]
        );
    }

    #[test]
    fn test_sub_removes_all() {
        let mut set = IntCharSet::range(5, 10);
        set.sub(&IntCharSet::range(0, 20));
        assert!(set.is_empty());
    }

    #[test]
    fn test_complement_round_trip() {
        let set = IntCharSet::range(b'a' as u32, b'c' as u32);
        let comp = set.complement(0x7F);
        assert!(!comp.contains(b'b' as u32));
        assert!(comp.contains(b'd' as u32));
        assert_eq!(comp.complement(0x7F), set);
        assert_eq!(set.len() + comp.len(), 0x80);
    }

    #[test]
    fn test_case_closure() {
        let mut set = IntCharSet::single(b'a' as u32);
        set.case_closure(0xFF);
        assert!(set.contains(b'A' as u32));
        assert!(set.contains(b'a' as u32));
    }

    #[test]
    fn test_case_closure_clips_to_domain() {
        // 'ÿ' (0xFF) uppercases to 'Ÿ' (0x178), outside an 8-bit domain.
        let mut set = IntCharSet::single(0xFF);
        set.case_closure(0xFF);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_subset() {
        let small = IntCharSet::range(10, 20);
        let big = IntCharSet::range(0, 50);
        assert!(small.is_subset_of(&big));
        assert!(!big.is_subset_of(&small));
    }
}
