//! Character-class partitioning.
//!
//! Partitions the character domain `0..=max_char` into equivalence classes —
//! sets of characters indistinguishable by any rule in the specification.
//! This reduces NFA/DFA transition tables from one column per character to
//! one column per class, typically a 15-20x compression for 8-bit input and
//! far more for 16-bit input.
//!
//! The partition is built incrementally: every literal character and every
//! character-class expression appearing anywhere in any rule (lookaheads
//! included) is registered via [`CharClassPartition::make_class`] before NFA
//! construction begins, so the partition is stable for the whole run.

use crate::charset::IntCharSet;

/// An ordered sequence of character sets that together cover the domain
/// exactly once: every character belongs to exactly one class.
#[derive(Debug, Clone)]
pub struct CharClassPartition {
    classes: Vec<IntCharSet>,
    max_char: u32,
}

impl CharClassPartition {
    /// Create the trivial partition: one class holding the whole domain.
    pub fn new(max_char: u32) -> Self {
        CharClassPartition {
            classes: vec![IntCharSet::range(0, max_char)],
            max_char,
        }
    }

    /// Number of classes.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// The alphabet ceiling this partition covers.
    pub fn max_char(&self) -> u32 {
        self.max_char
    }

    /// View of the class list.
    pub fn classes(&self) -> &[IntCharSet] {
        &self.classes
    }

    /// Refine the partition so that no character inside `set` shares a class
    /// with a character outside it.
    ///
    /// For each existing class `x` with `and = x ∩ set`:
    /// - `and` empty: `x` is untouched.
    /// - `x ⊆ set` (i.e. `and == x`): `x` stays whole; shrink the residual
    ///   `set` by `and` and keep scanning.
    /// - `set ⊆ and` (i.e. `and == set`): split `x` into `x \ and` and `and`;
    ///   the target is now exactly covered, so stop.
    /// - partial overlap: split both `x` and `set` by `and` and keep scanning
    ///   the remaining classes against the shrunken `set`.
    ///
    /// Calling this twice with the same set is a no-op the second time, so
    /// registration passes need not deduplicate.
    pub fn make_class(&mut self, set: &IntCharSet, case_fold: bool) {
        let mut set = set.clone();
        if case_fold {
            set.case_closure(self.max_char);
        }

        let existing = self.classes.len();
        for i in 0..existing {
            let and = self.classes[i].and(&set);
            if and.is_empty() {
                continue;
            }
            if self.classes[i] == and {
                set.sub(&and);
                if set.is_empty() {
                    return;
                }
                continue;
            }
            if set == and {
                self.classes[i].sub(&and);
                self.classes.push(and);
                return;
            }
            self.classes[i].sub(&and);
            set.sub(&and);
            self.classes.push(and);
        }
    }

    /// The index of the class containing `code`.
    ///
    /// Totality and disjointness of the partition guarantee exactly one match.
    pub fn class_code(&self, code: u32) -> usize {
        debug_assert!(code <= self.max_char, "code {code} outside domain");
        self.classes
            .iter()
            .position(|class| class.contains(code))
            .expect("partition must cover the whole domain")
    }

    /// Precomputed `char → class` lookup for every code in the domain.
    pub fn char_map(&self) -> Vec<usize> {
        let mut map = vec![usize::MAX; self.max_char as usize + 1];
        for (idx, class) in self.classes.iter().enumerate() {
            for code in class.codes() {
                map[code as usize] = idx;
            }
        }
        map
    }

    /// Indices of all classes intersecting `set`.
    ///
    /// After registration, every class intersecting `set` lies entirely
    /// inside it, so this enumerates the class codes a transition over `set`
    /// must cover.
    pub fn class_codes_of(&self, set: &IntCharSet) -> Vec<usize> {
        self.classes
            .iter()
            .enumerate()
            .filter(|(_, class)| !class.and(set).is_empty())
            .map(|(idx, _)| idx)
            .collect()
    }
}
