//! # lexgen-core — automaton compiler for a lexical-analyzer generator
//!
//! Turns a validated table of pattern rules into a minimized DFA plus a
//! compact, serializable transition-table representation for embedding in a
//! generated scanner:
//!
//! ```text
//!  RuleTable + Macros
//!         │
//!         ▼
//!  ┌───────────────────────────────────────────────┐
//!  │  1. CharClassPartition:                       │
//!  │     character domain → equivalence classes    │
//!  │                                               │
//!  │  2. NfaBuilder:                               │
//!  │     regex AST → NFA (Thompson fragments,      │
//!  │     lookahead, negation via complementation)  │
//!  │                                               │
//!  │  3. Subset construction: NFA → DFA            │
//!  │                                               │
//!  │  4. Minimization: partition refinement        │
//!  │                                               │
//!  │  5. Compression: row/col reduction,           │
//!  │     run-length + hi/low packing               │
//!  └───────────────────────────────────────────────┘
//!         │
//!         ▼
//!  CompiledScanner (DFA + packed tables + warnings)
//! ```
//!
//! Parsing the rule-specification text, expanding macros, emitting scanner
//! source, and the runtime scanning loop are all the caller's business; this
//! crate starts at a validated [`RuleTable`] and stops at the tables.

pub mod action;
pub mod charset;
pub mod classes;
pub mod compress;
pub mod dfa;
pub mod minimize;
pub mod nfa;
pub mod pipeline;
pub mod regex;
pub mod stateset;
pub mod subset;

#[cfg(test)]
mod tests;

pub use compress::CompressedTables;
pub use pipeline::{compile, CompiledScanner, GenOptions, Warning};

/// Automaton state index, NFA and DFA alike.
pub type StateId = u32;

/// Sentinel for a missing DFA transition.
pub const NO_TARGET: StateId = StateId::MAX;

/// The configured character domain the generator compiles for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharDomain {
    /// 7-bit ASCII, codes `0..=0x7F`.
    Ascii7,
    /// 8-bit, codes `0..=0xFF`.
    Latin1,
    /// 16-bit, codes `0..=0xFFFF`.
    Unicode16,
}

impl CharDomain {
    /// Highest character code in the domain, inclusive.
    pub fn max_char(self) -> u32 {
        match self {
            CharDomain::Ascii7 => 0x7F,
            CharDomain::Latin1 => 0xFF,
            CharDomain::Unicode16 => 0xFFFF,
        }
    }
}

/// One pattern rule, as handed over by the front end.
#[derive(Debug, Clone)]
pub struct Rule {
    /// Source line, for diagnostics.
    pub line: usize,
    /// Lexical states this rule is active in.
    pub states: Vec<usize>,
    /// Match only at beginning of line.
    pub bol: bool,
    /// Validated, macro-referencing expression.
    pub regex: regex::Regex,
    /// Trailing-context expression (`r1 / r2`'s `r2`), if any.
    pub look: Option<regex::Regex>,
    /// Opaque action payload.
    pub content: String,
}

/// The complete rule table for one generation run. Rule priority is source
/// order: the rule's index in `rules`.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    pub rules: Vec<Rule>,
    pub num_lex_states: usize,
    /// Whether each lexical state is inclusive (rules declared without an
    /// explicit state list are active in it). `Rule::states` arrives with
    /// that resolution already applied, so automaton construction never
    /// consults this; it is carried through for the emitter.
    pub inclusive: Vec<bool>,
    /// End-of-file action per lexical state. EOF actions take no part in
    /// automaton construction and are excluded from dead-rule diagnostics.
    pub eof_actions: Vec<Option<String>>,
    pub default_eof: Option<String>,
}

/// Fatal generation errors. Internal invariant violations (negation over an
/// empty fragment, unresolved macro references) abort via panic instead;
/// these are the errors a caller can meaningfully receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenError {
    /// The NFA handed to subset construction has no states.
    NoStates,
    /// The rule table declares zero lexical states.
    NoLexicalStates,
}

impl std::fmt::Display for GenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenError::NoStates => write!(f, "automaton has no states"),
            GenError::NoLexicalStates => write!(f, "rule table declares no lexical states"),
        }
    }
}

impl std::error::Error for GenError {}
