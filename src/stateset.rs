//! Growable bitset over NFA state indices.
//!
//! Subset construction and epsilon-closure worklists spend most of their time
//! in set union, membership, and "take one element out" operations, so the
//! representation is a plain `Vec<u64>` word array. Equality and hashing
//! ignore trailing zero words: two sets with the same members are equal
//! regardless of how large either has grown, which is what makes `StateSet`
//! usable as the subset-construction hash key.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::StateId;

const BITS: usize = 64;

/// A set of NFA state indices.
#[derive(Clone, Default)]
pub struct StateSet {
    words: Vec<u64>,
}

impl StateSet {
    pub fn new() -> Self {
        StateSet { words: Vec::new() }
    }

    /// An empty set pre-sized for states `0..capacity`.
    pub fn with_capacity(capacity: usize) -> Self {
        StateSet { words: vec![0; capacity.div_ceil(BITS)] }
    }

    /// Build a set from a list of members.
    pub fn from_states(states: &[StateId]) -> Self {
        let mut set = StateSet::new();
        for &s in states {
            set.add(s);
        }
        set
    }

    /// Insert a state. Returns `true` if the set changed.
    pub fn add(&mut self, state: StateId) -> bool {
        let word = state as usize / BITS;
        let bit = 1u64 << (state as usize % BITS);
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        let changed = self.words[word] & bit == 0;
        self.words[word] |= bit;
        changed
    }

    pub fn contains(&self, state: StateId) -> bool {
        let word = state as usize / BITS;
        word < self.words.len() && self.words[word] & (1 << (state as usize % BITS)) != 0
    }

    /// Union `other` into `self`. Returns `true` if the set changed.
    pub fn union(&mut self, other: &StateSet) -> bool {
        if other.words.len() > self.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        let mut changed = false;
        for (w, &o) in self.words.iter_mut().zip(&other.words) {
            let merged = *w | o;
            changed |= merged != *w;
            *w = merged;
        }
        changed
    }

    /// Take and remove the smallest element, if any. Closure worklists drain
    /// the set with this.
    pub fn pop(&mut self) -> Option<StateId> {
        for (i, word) in self.words.iter_mut().enumerate() {
            if *word != 0 {
                let bit = word.trailing_zeros() as usize;
                *word &= *word - 1; // clear lowest set bit
                return Some((i * BITS + bit) as StateId);
            }
        }
        None
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn clear(&mut self) {
        self.words.clear();
    }

    /// Iterate members in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = StateId> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &word)| {
            (0..BITS)
                .filter(move |bit| word & (1 << bit) != 0)
                .map(move |bit| (i * BITS + bit) as StateId)
        })
    }

    fn trimmed(&self) -> &[u64] {
        let mut len = self.words.len();
        while len > 0 && self.words[len - 1] == 0 {
            len -= 1;
        }
        &self.words[..len]
    }
}

impl PartialEq for StateSet {
    fn eq(&self, other: &Self) -> bool {
        self.trimmed() == other.trimmed()
    }
}

impl Eq for StateSet {}

impl Hash for StateSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.trimmed().hash(state);
    }
}

impl fmt::Debug for StateSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
