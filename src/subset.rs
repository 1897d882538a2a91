//! Subset construction: NFA → DFA conversion.
//!
//! Standard powerset construction with epsilon-closure caching:
//! 1. Precompute the epsilon closure of every NFA state.
//! 2. The closure of each entry state seeds a DFA state, registered in
//!    first-seen order so `dfa.entry_states[i]` mirrors NFA entry `i`.
//! 3. Worklist: for each unprocessed DFA state and each character class,
//!    the successor is the closure of the union of member transitions;
//!    subsets are interned by structural equality.
//!
//! A DFA state accepts iff its subset contains an accepting NFA state; its
//! action is the highest-priority action among those, and the pushback /
//! look-end flags are inherited by membership the same way.

use std::collections::HashMap;

use crate::dfa::Dfa;
use crate::nfa::Nfa;
use crate::stateset::StateSet;
use crate::{GenError, StateId};

/// Convert an NFA to an equivalent DFA.
///
/// Termination is guaranteed because only reachable subsets are materialized
/// and there are finitely many. An NFA with no states cannot yield an
/// automaton and is a fatal error.
pub fn nfa_to_dfa(nfa: &Nfa) -> Result<Dfa, GenError> {
    if nfa.is_empty() {
        return Err(GenError::NoStates);
    }

    let num_classes = nfa.num_classes;
    let mut dfa = Dfa::new(num_classes);

    // Per-state epsilon closures, memoized up front. The closure of a subset
    // is then a union of cached closures instead of a fresh graph walk.
    let closures: Vec<StateSet> = (0..nfa.len())
        .map(|s| nfa.epsilon_closure(&StateSet::from_states(&[s as StateId])))
        .collect();

    let mut subset_ids: HashMap<StateSet, StateId> = HashMap::new();
    let mut subsets: Vec<StateSet> = Vec::new();

    let mut intern = |set: StateSet,
                      dfa: &mut Dfa,
                      subsets: &mut Vec<StateSet>,
                      subset_ids: &mut HashMap<StateSet, StateId>|
     -> StateId {
        if let Some(&id) = subset_ids.get(&set) {
            return id;
        }
        let id = dfa.add_state();
        let s = id as usize;
        for member in set.iter() {
            let m = member as usize;
            if nfa.is_final[m] {
                dfa.is_final[s] = true;
                dfa.action[s] = match (dfa.action[s].take(), &nfa.action[m]) {
                    (None, action) => action.clone(),
                    (Some(current), None) => Some(current),
                    (Some(current), Some(candidate)) => {
                        Some(current.higher_priority(candidate).clone())
                    }
                };
            }
            if nfa.is_pushback[m] {
                dfa.is_pushback[s] = true;
            }
            if nfa.is_lookend[m] {
                dfa.is_lookend[s] = true;
            }
        }
        subset_ids.insert(set.clone(), id);
        subsets.push(set);
        id
    };

    // Entry states first, in order.
    for entry in 0..nfa.num_entry {
        let closure = closures[entry].clone();
        let id = intern(closure, &mut dfa, &mut subsets, &mut subset_ids);
        dfa.entry_states.push(id);
    }

    let mut next = 0;
    while next < subsets.len() {
        let current = subsets[next].clone();
        for class in 0..num_classes {
            let mut successor = StateSet::new();
            for state in current.iter() {
                if let Some(targets) = &nfa.table[state as usize][class] {
                    for target in targets.iter() {
                        successor.union(&closures[target as usize]);
                    }
                }
            }
            if successor.is_empty() {
                continue; // no transition for this class
            }
            let target_id = intern(successor, &mut dfa, &mut subsets, &mut subset_ids);
            dfa.set_transition(next as StateId, class, target_id);
        }
        next += 1;
    }

    Ok(dfa)
}
