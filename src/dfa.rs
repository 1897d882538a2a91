//! Deterministic finite automaton data model.
//!
//! A dense 2-D transition table indexed by `[state][class_code]`, with
//! parallel per-state attribute arrays and an entry-state index mapping the
//! logical entry points (`lexical_state * 2 + at_bol`, followed by the
//! forward/backward pairs of general-lookahead rules) to DFA state ids.
//!
//! Built once by subset construction, mutated in place by minimization, then
//! read-only for table compression.

use crate::action::Action;
use crate::{StateId, NO_TARGET};

/// Attribute bit: state accepts.
pub const ATTR_FINAL: u32 = 1;
/// Attribute bit: the match in this state is valid only pending lookahead
/// confirmation.
pub const ATTR_PUSHBACK: u32 = 2;
/// Attribute bit: final state of a lookahead expression.
pub const ATTR_LOOKEND: u32 = 4;

/// A complete DFA.
#[derive(Debug, Clone)]
pub struct Dfa {
    /// Dense transition table: `table[state][class] = target` or [`NO_TARGET`].
    pub table: Vec<Vec<StateId>>,
    pub is_final: Vec<bool>,
    pub is_pushback: Vec<bool>,
    pub is_lookend: Vec<bool>,
    pub action: Vec<Option<Action>>,
    /// `entry_states[lex_state * 2 + at_bol]`, then general-lookahead pairs.
    /// [`NO_TARGET`] for an entry whose start state died during minimization.
    pub entry_states: Vec<StateId>,
    /// Alphabet size after character-class partitioning.
    pub num_classes: usize,
}

impl Dfa {
    /// An empty DFA over `num_classes` character classes.
    pub fn new(num_classes: usize) -> Self {
        Dfa {
            table: Vec::new(),
            is_final: Vec::new(),
            is_pushback: Vec::new(),
            is_lookend: Vec::new(),
            action: Vec::new(),
            entry_states: Vec::new(),
            num_classes,
        }
    }

    /// Number of states.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Append a fresh state with all transitions dead; returns its id.
    pub fn add_state(&mut self) -> StateId {
        let id = self.table.len() as StateId;
        self.table.push(vec![NO_TARGET; self.num_classes]);
        self.is_final.push(false);
        self.is_pushback.push(false);
        self.is_lookend.push(false);
        self.action.push(None);
        id
    }

    /// O(1) transition lookup: target state or [`NO_TARGET`].
    #[inline]
    pub fn transition(&self, state: StateId, class: usize) -> StateId {
        self.table[state as usize][class]
    }

    #[inline]
    pub fn set_transition(&mut self, state: StateId, class: usize, target: StateId) {
        self.table[state as usize][class] = target;
    }

    /// Per-state attribute bitmask for the compressed attribute table.
    pub fn attributes(&self, state: StateId) -> u32 {
        let s = state as usize;
        let mut attr = 0;
        if self.is_final[s] {
            attr |= ATTR_FINAL;
        }
        if self.is_pushback[s] {
            attr |= ATTR_PUSHBACK;
        }
        if self.is_lookend[s] {
            attr |= ATTR_LOOKEND;
        }
        attr
    }
}
