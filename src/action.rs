//! Rule actions and priority resolution.
//!
//! An [`Action`] is the payload attached to an accepting automaton state:
//! the opaque action content handed through from the front end, the rule's
//! priority (source order, lower value wins), and the lookahead bookkeeping
//! the emitted scanner needs to re-position after a trailing-context match.

use serde::{Deserialize, Serialize};

/// How an action's rule interacts with trailing-context lookahead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LookaheadKind {
    /// Plain rule, no lookahead.
    None,
    /// `r1 / r2` where `r1` has fixed length: the scanner backs up to a
    /// fixed distance from the match start.
    FixedBase,
    /// `r1 / r2` where `r2` has fixed length: the scanner backs up a fixed
    /// distance from the match end.
    FixedLook,
    /// `r1 / r2` where `r2` is a finite union of fixed-length alternatives;
    /// one action copy exists per distinct alternative length.
    FiniteChoice,
    /// General lookahead: the scanner re-runs the forward/backward pass
    /// automata registered under [`Action::entry`] to find the split point.
    GeneralLook,
    /// Marker action on the end of a general lookahead's forward automaton
    /// (over `r1 · r2`).
    ForwardPass,
    /// Marker action on the end of a general lookahead's backward automaton
    /// (over the reverse of `r2`).
    BackwardPass,
}

/// Immutable-after-construction action value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Action {
    /// Opaque action payload (the front end's action text).
    pub content: String,
    /// Rule priority; lower value = higher priority (source order).
    pub priority: usize,
    /// Source line of the owning rule, for diagnostics.
    pub line: usize,
    pub kind: LookaheadKind,
    /// Lookahead length; only meaningful for the fixed kinds.
    pub len: usize,
    /// Index of the forward/backward entry-state pair; only meaningful for
    /// `GeneralLook`.
    pub entry: usize,
}

impl Action {
    /// A plain action with no lookahead.
    pub fn new(content: &str, priority: usize, line: usize) -> Self {
        Action {
            content: content.to_string(),
            priority,
            line,
            kind: LookaheadKind::None,
            len: 0,
            entry: 0,
        }
    }

    /// A copy of this action re-tagged with a lookahead kind and length.
    pub fn with_lookahead(&self, kind: LookaheadKind, len: usize) -> Self {
        Action { kind, len, ..self.clone() }
    }

    /// Two actions are equivalent iff content, kind, length and entry pair
    /// all match. Priority deliberately does not participate: two copies of
    /// one rule's action remain one action for dead-rule accounting.
    pub fn is_equiv(&self, other: &Action) -> bool {
        self.content == other.content
            && self.kind == other.kind
            && self.len == other.len
            && self.entry == other.entry
    }

    /// Key with the same notion of equality as [`Action::is_equiv`], usable
    /// for grouping during minimization.
    pub fn equiv_key(&self) -> (&str, LookaheadKind, usize, usize) {
        (&self.content, self.kind, self.len, self.entry)
    }

    /// Pick the higher-priority (numerically lower) of two actions. Ties go
    /// to `self`, which callers arrange to be the earlier-seen action.
    pub fn higher_priority<'a>(&'a self, other: &'a Action) -> &'a Action {
        if self.priority <= other.priority {
            self
        } else {
            other
        }
    }
}

/// Per-run generation context.
///
/// Carries the "used actions" set built up during NFA construction and
/// consulted for the never-matched diagnostic after minimization. Threaded
/// explicitly through construction so that independent generation runs never
/// share state.
#[derive(Debug, Default)]
pub struct GenContext {
    used: Vec<Action>,
}

impl GenContext {
    pub fn new() -> Self {
        GenContext { used: Vec::new() }
    }

    /// Record an action constructed during NFA building.
    pub fn register(&mut self, action: &Action) {
        if !self.used.iter().any(|a| a.is_equiv(action)) {
            self.used.push(action.clone());
        }
    }

    /// All actions registered this run.
    pub fn used_actions(&self) -> &[Action] {
        &self.used
    }
}
