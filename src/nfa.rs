//! NFA construction from rule regular expressions.
//!
//! Each rule's regex AST is lowered into a fragment with exactly one entry
//! and one exit state (no edges cross into the entry or out of the exit),
//! then wired to the lexical-state entry points. Three constructs need more
//! than the standard Thompson cases:
//!
//! - **Negation** (`!r`) is not expressible as a plain NFA fragment: the
//!   operand fragment is determinized on the spot, totalized with an error
//!   sink, its finality flipped, and the result re-embedded as a fragment.
//! - **Fixed-length lookahead** (`r1 / r2` with a fixed-length side) becomes
//!   a marked tail after `r1`, tagged with the fixed length.
//! - **General lookahead** additionally builds a forward automaton over
//!   `r1 · r2` and a backward automaton over the reverse of `r2`, reachable
//!   from an extra pair of global entry points that the emitted scanner uses
//!   to locate the split point.
//!
//! State ids `0 .. 2 * num_lex_states` are reserved as the paired entry
//! points (`2 * lexical_state + at_bol`), followed by two reserved states per
//! general-lookahead rule. All entry pairs are reserved up front, so rules
//! are classified (fixed / finite-choice / general) before construction.

use crate::action::{Action, GenContext, LookaheadKind};
use crate::charset::IntCharSet;
use crate::classes::CharClassPartition;
use crate::regex::{
    alternatives_of_length, finite_choice_lengths, fixed_length, reverse, Macros, Regex,
};
use crate::stateset::StateSet;
use crate::{Rule, StateId};

use std::collections::HashMap;

/// A sub-automaton with a designated entry and exit state.
pub type Fragment = (StateId, StateId);

/// Non-deterministic automaton: dynamically grown arrays indexed by state id.
#[derive(Debug, Clone)]
pub struct Nfa {
    /// Epsilon targets per state.
    pub eps: Vec<StateSet>,
    /// Labeled transitions: `table[state][class_code]` is the target set.
    pub table: Vec<Vec<Option<StateSet>>>,
    pub is_final: Vec<bool>,
    pub is_pushback: Vec<bool>,
    pub is_lookend: Vec<bool>,
    pub action: Vec<Option<Action>>,
    pub num_classes: usize,
    pub num_lex_states: usize,
    /// Total number of entry states: `2 * num_lex_states` lexical entries
    /// plus 2 per general-lookahead rule.
    pub num_entry: usize,
}

impl Nfa {
    /// Create an NFA with all entry states reserved.
    pub fn new(num_lex_states: usize, num_look_pairs: usize, num_classes: usize) -> Self {
        let num_entry = 2 * num_lex_states + 2 * num_look_pairs;
        let mut nfa = Nfa {
            eps: Vec::new(),
            table: Vec::new(),
            is_final: Vec::new(),
            is_pushback: Vec::new(),
            is_lookend: Vec::new(),
            action: Vec::new(),
            num_classes,
            num_lex_states,
            num_entry,
        };
        for _ in 0..num_entry {
            nfa.add_state();
        }
        nfa
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Append a fresh state; returns its id.
    pub fn add_state(&mut self) -> StateId {
        let id = self.table.len() as StateId;
        self.eps.push(StateSet::new());
        self.table.push(vec![None; self.num_classes]);
        self.is_final.push(false);
        self.is_pushback.push(false);
        self.is_lookend.push(false);
        self.action.push(None);
        id
    }

    pub fn add_epsilon(&mut self, from: StateId, to: StateId) {
        self.eps[from as usize].add(to);
    }

    pub fn add_transition(&mut self, from: StateId, class: usize, to: StateId) {
        self.table[from as usize][class]
            .get_or_insert_with(StateSet::new)
            .add(to);
    }

    /// Entry state for a lexical state, split by beginning-of-line.
    #[inline]
    pub fn entry(&self, lex_state: usize, at_bol: bool) -> StateId {
        (2 * lex_state + at_bol as usize) as StateId
    }

    /// Forward (`backward = false`) or backward entry state of a
    /// general-lookahead pair.
    #[inline]
    pub fn look_entry(&self, pair: usize, backward: bool) -> StateId {
        (2 * self.num_lex_states + 2 * pair + backward as usize) as StateId
    }

    /// Set of states reachable from `states` using only epsilon edges.
    pub fn epsilon_closure(&self, states: &StateSet) -> StateSet {
        let mut closure = states.clone();
        let mut worklist = states.clone();
        while let Some(state) = worklist.pop() {
            for target in self.eps[state as usize].iter() {
                if closure.add(target) {
                    worklist.add(target);
                }
            }
        }
        closure
    }
}

/// Builds the generation run's NFA rule by rule.
pub struct NfaBuilder<'a> {
    nfa: Nfa,
    classes: &'a CharClassPartition,
    macros: &'a Macros,
    next_look_pair: usize,
}

impl<'a> NfaBuilder<'a> {
    pub fn new(
        classes: &'a CharClassPartition,
        macros: &'a Macros,
        num_lex_states: usize,
        num_look_pairs: usize,
    ) -> Self {
        NfaBuilder {
            nfa: Nfa::new(num_lex_states, num_look_pairs, classes.len()),
            classes,
            macros,
            next_look_pair: 0,
        }
    }

    /// Consume the builder, yielding the finished NFA.
    pub fn finish(self) -> Nfa {
        self.nfa
    }

    /// Does `rule` need a forward/backward entry pair? Used by the caller to
    /// reserve entry states before construction starts.
    pub fn needs_look_pair(rule: &Rule, macros: &Macros) -> bool {
        match &rule.look {
            None => false,
            Some(look) => {
                fixed_length(look, macros).is_none()
                    && fixed_length(&rule.regex, macros).is_none()
                    && finite_choice_lengths(look, macros).is_none()
            }
        }
    }

    /// Insert one rule, wiring its fragment to the entry states of every
    /// lexical state it is active in. `priority` is the rule's source order.
    pub fn insert_rule(&mut self, rule: &Rule, priority: usize, ctx: &mut GenContext) {
        let base = Action::new(&rule.content, priority, rule.line);

        match &rule.look {
            None => {
                let (start, end) = self.insert_regex(&rule.regex);
                self.mark_final(end, base.clone());
                ctx.register(&base);
                self.wire_entries(rule, start);
            }
            Some(look) => self.insert_lookahead_rule(rule, look, base, ctx),
        }
    }

    fn insert_lookahead_rule(
        &mut self,
        rule: &Rule,
        look: &Regex,
        base: Action,
        ctx: &mut GenContext,
    ) {
        let len_base = fixed_length(&rule.regex, self.macros);
        let len_look = fixed_length(look, self.macros);

        if let Some(len) = len_look {
            // Lookahead has fixed length: the scanner backs up `len` chars
            // from the match end.
            let action = base.with_lookahead(LookaheadKind::FixedLook, len);
            let (start, _) = self.insert_base_and_tail(&rule.regex, look, action.clone());
            ctx.register(&action);
            self.wire_entries(rule, start);
        } else if let Some(len) = len_base {
            // Base has fixed length: the scanner restarts `len` chars after
            // the match start.
            let action = base.with_lookahead(LookaheadKind::FixedBase, len);
            let (start, _) = self.insert_base_and_tail(&rule.regex, look, action.clone());
            ctx.register(&action);
            self.wire_entries(rule, start);
        } else if let Some(lengths) = finite_choice_lengths(look, self.macros) {
            // Finite union of fixed-length alternatives: one marked exit per
            // distinct length, each with its own action copy. The untagged
            // base action can never itself match and stays unregistered.
            let (start, base_end) = self.insert_regex(&rule.regex);
            self.nfa.is_pushback[base_end as usize] = true;
            for &len in &lengths {
                let alts = alternatives_of_length(look, len, self.macros);
                let tail = Regex::Alt(alts);
                let (tail_start, tail_end) = self.insert_regex(&tail);
                self.nfa.add_epsilon(base_end, tail_start);
                let action = base.with_lookahead(LookaheadKind::FiniteChoice, len);
                self.mark_look_final(tail_end, action.clone());
                ctx.register(&action);
            }
            self.wire_entries(rule, start);
        } else {
            // General lookahead: the main automaton matches r1 · r2 with the
            // GeneralLook action; the forward/backward pass automata are
            // reachable only from their reserved entry pair.
            let pair = self.next_look_pair;
            self.next_look_pair += 1;

            let action = Action {
                kind: LookaheadKind::GeneralLook,
                entry: pair,
                ..base.clone()
            };
            let (start, _end) = self.insert_base_and_tail(&rule.regex, look, action.clone());
            ctx.register(&action);
            self.wire_entries(rule, start);

            let forward = Action {
                kind: LookaheadKind::ForwardPass,
                entry: pair,
                ..base.clone()
            };
            let combined = Regex::Concat(vec![rule.regex.clone(), look.clone()]);
            let (fwd_start, fwd_end) = self.insert_regex(&combined);
            self.mark_final(fwd_end, forward.clone());
            ctx.register(&forward);
            let fwd_entry = self.nfa.look_entry(pair, false);
            self.nfa.add_epsilon(fwd_entry, fwd_start);

            let backward = Action {
                kind: LookaheadKind::BackwardPass,
                entry: pair,
                ..base.clone()
            };
            let reversed = reverse(look, self.macros);
            let (bwd_start, bwd_end) = self.insert_regex(&reversed);
            self.mark_final(bwd_end, backward.clone());
            ctx.register(&backward);
            let bwd_entry = self.nfa.look_entry(pair, true);
            self.nfa.add_epsilon(bwd_entry, bwd_start);
        }
    }

    /// Build `r1` followed by a lookahead tail `r2`; the junction state is
    /// marked pushback, the tail end is the rule's marked (look-end) final
    /// state. Returns `(start_of_r1, end_of_r2)`.
    fn insert_base_and_tail(&mut self, base: &Regex, look: &Regex, action: Action) -> Fragment {
        let (start, base_end) = self.insert_regex(base);
        self.nfa.is_pushback[base_end as usize] = true;
        let (tail_start, tail_end) = self.insert_regex(look);
        self.nfa.add_epsilon(base_end, tail_start);
        self.mark_look_final(tail_end, action);
        (start, tail_end)
    }

    fn mark_final(&mut self, state: StateId, action: Action) {
        self.nfa.is_final[state as usize] = true;
        self.nfa.action[state as usize] = Some(action);
    }

    fn mark_look_final(&mut self, state: StateId, action: Action) {
        self.nfa.is_lookend[state as usize] = true;
        self.mark_final(state, action);
    }

    /// Epsilon-link the entry points of every lexical state the rule is
    /// active in to `start`. A beginning-of-line rule is reachable only from
    /// the BOL entry of the pair; any other rule from both.
    fn wire_entries(&mut self, rule: &Rule, start: StateId) {
        for &lex in &rule.states {
            let bol_entry = self.nfa.entry(lex, true);
            self.nfa.add_epsilon(bol_entry, start);
            if !rule.bol {
                let entry = self.nfa.entry(lex, false);
                self.nfa.add_epsilon(entry, start);
            }
        }
    }

    /// Lower a regex into a fragment with fresh entry and exit states.
    pub fn insert_regex(&mut self, regex: &Regex) -> Fragment {
        match regex {
            Regex::Char(c) => self.insert_set(IntCharSet::single(*c)),
            Regex::CharIgnoreCase(c) => {
                let mut set = IntCharSet::single(*c);
                set.case_closure(self.classes.max_char());
                self.insert_set(set)
            }
            Regex::Class(set) => self.insert_set(set.clone()),
            Regex::NotClass(set) => self.insert_set(set.complement(self.classes.max_char())),
            Regex::Str(codes) => {
                let start = self.nfa.add_state();
                let mut current = start;
                for &code in codes {
                    let next = self.nfa.add_state();
                    let class = self.classes.class_code(code);
                    self.nfa.add_transition(current, class, next);
                    current = next;
                }
                (start, current)
            }
            Regex::Concat(parts) => {
                let start = self.nfa.add_state();
                let mut current = start;
                for part in parts {
                    let (s, e) = self.insert_regex(part);
                    self.nfa.add_epsilon(current, s);
                    current = e;
                }
                let end = self.nfa.add_state();
                self.nfa.add_epsilon(current, end);
                (start, end)
            }
            Regex::Alt(parts) => {
                let start = self.nfa.add_state();
                let end = self.nfa.add_state();
                for part in parts {
                    let (s, e) = self.insert_regex(part);
                    self.nfa.add_epsilon(start, s);
                    self.nfa.add_epsilon(e, end);
                }
                (start, end)
            }
            Regex::Star(inner) => {
                let (s, e) = self.insert_regex(inner);
                let start = self.nfa.add_state();
                let end = self.nfa.add_state();
                self.nfa.add_epsilon(start, s);
                self.nfa.add_epsilon(e, end);
                self.nfa.add_epsilon(start, end);
                self.nfa.add_epsilon(e, s);
                (start, end)
            }
            Regex::Plus(inner) => {
                let (s, e) = self.insert_regex(inner);
                let start = self.nfa.add_state();
                let end = self.nfa.add_state();
                self.nfa.add_epsilon(start, s);
                self.nfa.add_epsilon(e, end);
                self.nfa.add_epsilon(e, s);
                (start, end)
            }
            Regex::Question(inner) => {
                let (s, e) = self.insert_regex(inner);
                let start = self.nfa.add_state();
                let end = self.nfa.add_state();
                self.nfa.add_epsilon(start, s);
                self.nfa.add_epsilon(e, end);
                self.nfa.add_epsilon(start, end);
                (start, end)
            }
            Regex::Not(inner) => {
                let frag = self.insert_regex(inner);
                self.complement(frag)
            }
            Regex::Macro(name) => {
                let body = self.macros.get(name).clone();
                self.insert_regex(&body)
            }
        }
    }

    /// Single-transition fragment over every partition class intersecting
    /// `set`. Registration during the class-collection pre-pass guarantees
    /// each intersecting class lies entirely inside `set`.
    fn insert_set(&mut self, set: IntCharSet) -> Fragment {
        let start = self.nfa.add_state();
        let end = self.nfa.add_state();
        for class in self.classes.class_codes_of(&set) {
            self.nfa.add_transition(start, class, end);
        }
        (start, end)
    }

    /// Complement a fragment's language.
    ///
    /// The fragment is determinized by a fragment-local subset construction,
    /// totalized with an explicit error sink where transitions are missing,
    /// and re-embedded as fresh NFA states with finality flipped: every
    /// subset-state *not* containing the fragment exit becomes accepting
    /// (joined to a fresh exit by epsilon). Only reachable subsets are ever
    /// materialized, which is the unreachable-state pruning the construction
    /// needs. Mutual NFA↔DFA recursion stays bounded because the operand
    /// fragment is already fully built; a rule cannot negate itself.
    fn complement(&mut self, (frag_start, frag_end): Fragment) -> Fragment {
        assert!(
            !self.nfa.is_empty(),
            "complement over an automaton with no states"
        );

        let num_classes = self.nfa.num_classes;

        let mut subsets: Vec<StateSet> = Vec::new();
        let mut subset_ids: HashMap<StateSet, usize> = HashMap::new();
        let mut trans: Vec<Vec<Option<usize>>> = Vec::new();

        let start_set = self.nfa.epsilon_closure(&StateSet::from_states(&[frag_start]));
        subset_ids.insert(start_set.clone(), 0);
        subsets.push(start_set);

        let mut next = 0;
        while next < subsets.len() {
            let current = subsets[next].clone();
            let mut row = vec![None; num_classes];
            for (class, slot) in row.iter_mut().enumerate() {
                let mut targets = StateSet::new();
                for state in current.iter() {
                    if let Some(set) = &self.nfa.table[state as usize][class] {
                        targets.union(set);
                    }
                }
                if targets.is_empty() {
                    continue;
                }
                let closure = self.nfa.epsilon_closure(&targets);
                let id = *subset_ids.entry(closure.clone()).or_insert_with(|| {
                    subsets.push(closure);
                    subsets.len() - 1
                });
                *slot = Some(id);
            }
            trans.push(row);
            next += 1;
        }

        // The sink is only needed when some transition is actually missing.
        let needs_sink = trans.iter().any(|row| row.iter().any(Option::is_none));
        let n = subsets.len();

        let new_states: Vec<StateId> = (0..n + needs_sink as usize)
            .map(|_| self.nfa.add_state())
            .collect();
        let new_end = self.nfa.add_state();

        for (i, row) in trans.iter().enumerate() {
            for (class, target) in row.iter().enumerate() {
                match target {
                    Some(t) => self.nfa.add_transition(new_states[i], class, new_states[*t]),
                    None => self.nfa.add_transition(new_states[i], class, new_states[n]),
                }
            }
        }
        if needs_sink {
            for class in 0..num_classes {
                self.nfa.add_transition(new_states[n], class, new_states[n]);
            }
            // The sink never contained the fragment exit: accepting.
            self.nfa.add_epsilon(new_states[n], new_end);
        }
        for (i, subset) in subsets.iter().enumerate() {
            if !subset.contains(frag_end) {
                self.nfa.add_epsilon(new_states[i], new_end);
            }
        }

        (new_states[0], new_end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(max_char: u32, sets: &[IntCharSet]) -> (CharClassPartition, Macros) {
        let mut classes = CharClassPartition::new(max_char);
        for set in sets {
            classes.make_class(set, false);
        }
        (classes, Macros::new())
    }

    /// Walk a fragment over an input, NFA-style, and report whether the
    /// fragment exit is reachable at the end.
    fn accepts(nfa: &Nfa, classes: &CharClassPartition, frag: Fragment, input: &[u32]) -> bool {
        let mut current = nfa.epsilon_closure(&StateSet::from_states(&[frag.0]));
        for &code in input {
            let class = classes.class_code(code);
            let mut targets = StateSet::new();
            for state in current.iter() {
                if let Some(set) = &nfa.table[state as usize][class] {
                    targets.union(set);
                }
            }
            if targets.is_empty() {
                return false;
            }
            current = nfa.epsilon_closure(&targets);
        }
        current.contains(frag.1)
    }

    #[test]
    fn test_char_fragment() {
        let (classes, macros) = setup(0x7F, &[IntCharSet::single(b'a' as u32)]);
        let mut builder = NfaBuilder::new(&classes, &macros, 1, 0);
        let frag = builder.insert_regex(&Regex::Char(b'a' as u32));
        let nfa = builder.finish();
        assert!(accepts(&nfa, &classes, frag, &[b'a' as u32]));
        assert!(!accepts(&nfa, &classes, frag, &[b'b' as u32]));
        assert!(!accepts(&nfa, &classes, frag, &[]));
    }

    #[test]
    fn test_star_fragment() {
        let (classes, macros) = setup(0x7F, &[IntCharSet::single(b'a' as u32)]);
        let mut builder = NfaBuilder::new(&classes, &macros, 1, 0);
        let frag = builder.insert_regex(&Regex::Star(Box::new(Regex::Char(b'a' as u32))));
        let nfa = builder.finish();
        assert!(accepts(&nfa, &classes, frag, &[]));
        assert!(accepts(&nfa, &classes, frag, &[b'a' as u32]));
        assert!(accepts(&nfa, &classes, frag, &[b'a' as u32; 4]));
        assert!(!accepts(&nfa, &classes, frag, &[b'b' as u32]));
    }

    #[test]
    fn test_alt_and_concat() {
        let a = b'a' as u32;
        let b = b'b' as u32;
        let (classes, macros) =
            setup(0x7F, &[IntCharSet::single(a), IntCharSet::single(b)]);
        let mut builder = NfaBuilder::new(&classes, &macros, 1, 0);
        // (a|b)b
        let frag = builder.insert_regex(&Regex::Concat(vec![
            Regex::Alt(vec![Regex::Char(a), Regex::Char(b)]),
            Regex::Char(b),
        ]));
        let nfa = builder.finish();
        assert!(accepts(&nfa, &classes, frag, &[a, b]));
        assert!(accepts(&nfa, &classes, frag, &[b, b]));
        assert!(!accepts(&nfa, &classes, frag, &[a, a]));
        assert!(!accepts(&nfa, &classes, frag, &[a]));
    }

    #[test]
    fn test_negated_class_over_small_domain() {
        // !([a-c]) over a 7-bit domain: accepts 'd' and anything else
        // outside a-c, rejects a, b, c.
        let a = b'a' as u32;
        let c = b'c' as u32;
        let (classes, macros) = setup(0x7F, &[IntCharSet::range(a, c)]);
        let mut builder = NfaBuilder::new(&classes, &macros, 1, 0);
        let frag =
            builder.insert_regex(&Regex::Not(Box::new(Regex::Class(IntCharSet::range(a, c)))));
        let nfa = builder.finish();

        assert!(!accepts(&nfa, &classes, frag, &[a]));
        assert!(!accepts(&nfa, &classes, frag, &[b'b' as u32]));
        assert!(!accepts(&nfa, &classes, frag, &[c]));
        assert!(accepts(&nfa, &classes, frag, &[b'd' as u32]));
        assert!(accepts(&nfa, &classes, frag, &[b'z' as u32]));
        assert!(accepts(&nfa, &classes, frag, &[0x7F]));
        // The complement also holds the empty string and longer strings.
        assert!(accepts(&nfa, &classes, frag, &[]));
        assert!(accepts(&nfa, &classes, frag, &[a, a]));
    }

    #[test]
    fn test_negation_of_string() {
        let a = b'a' as u32;
        let b = b'b' as u32;
        let (classes, macros) =
            setup(0x7F, &[IntCharSet::single(a), IntCharSet::single(b)]);
        let mut builder = NfaBuilder::new(&classes, &macros, 1, 0);
        let frag = builder.insert_regex(&Regex::Not(Box::new(Regex::Str(vec![a, b]))));
        let nfa = builder.finish();

        assert!(!accepts(&nfa, &classes, frag, &[a, b]));
        assert!(accepts(&nfa, &classes, frag, &[a]));
        assert!(accepts(&nfa, &classes, frag, &[b, a]));
        assert!(accepts(&nfa, &classes, frag, &[a, b, a]));
    }

    #[test]
    fn test_entry_reservation() {
        let (classes, macros) = setup(0x7F, &[]);
        let builder = NfaBuilder::new(&classes, &macros, 2, 1);
        let nfa = builder.finish();
        assert_eq!(nfa.num_entry, 6);
        assert_eq!(nfa.entry(0, false), 0);
        assert_eq!(nfa.entry(0, true), 1);
        assert_eq!(nfa.entry(1, false), 2);
        assert_eq!(nfa.look_entry(0, false), 4);
        assert_eq!(nfa.look_entry(0, true), 5);
        assert_eq!(nfa.len(), 6);
    }
}
