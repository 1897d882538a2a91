//! DFA minimization by partition refinement (Hopcroft-style).
//!
//! Merges DFA states that are indistinguishable by any finite input with
//! respect to finality, pushback behavior, lookahead-end behavior, and
//! action *equivalence* (not identity — two copies of one rule's action
//! compare equal).
//!
//! The automaton is first totalized with one implicit error state so every
//! (state, class) pair has a target; the initial partition groups states by
//! their attribute/action tuple; then (block, class) splitters are processed
//! off a worklist, always enqueueing the smaller half of every split, which
//! bounds total work to O(n · log n · |alphabet|). Afterwards each block is
//! collapsed to its lowest-numbered member, the arrays are rewritten in
//! place, and the error block plus anything unreachable is discarded.

use std::collections::HashMap;

use crate::action::LookaheadKind;
use crate::dfa::Dfa;
use crate::{StateId, NO_TARGET};

/// Initial-partition key: (final, pushback, lookend, action equivalence).
type BlockKey = (bool, bool, bool, Option<(String, LookaheadKind, usize, usize)>);

/// Minimize `dfa` in place.
///
/// Entry states are remapped through the block→representative mapping; an
/// entry whose start state turns out dead (error-equivalent) is rewritten to
/// [`NO_TARGET`]. A DFA with zero states is a fatal invariant violation.
pub fn minimize(dfa: &mut Dfa) {
    let n = dfa.len();
    assert!(n > 0, "minimization over an automaton with no states");

    let num_classes = dfa.num_classes;
    // Implicit universal error state at index n: all classes self-loop.
    // Totalizing the automaton lets the refinement treat missing transitions
    // uniformly.
    let err = n;
    let total = n + 1;

    let mut trans: Vec<Vec<usize>> = Vec::with_capacity(total);
    for s in 0..n {
        trans.push(
            (0..num_classes)
                .map(|c| match dfa.table[s][c] {
                    NO_TARGET => err,
                    t => t as usize,
                })
                .collect(),
        );
    }
    trans.push(vec![err; num_classes]);

    // Inverse transition map: predecessors of each state per class. Only the
    // predecessors of splitter members can cause further splits.
    let mut inverse: Vec<Vec<Vec<u32>>> = vec![vec![Vec::new(); num_classes]; total];
    for s in 0..total {
        for c in 0..num_classes {
            inverse[trans[s][c]][c].push(s as u32);
        }
    }

    // Initial partition. The error state's key is the plain dead-state key,
    // so states that can never reach acceptance start in its block and fall
    // out of the automaton at compaction.
    let mut groups: HashMap<BlockKey, Vec<u32>> = HashMap::new();
    for s in 0..total {
        let key: BlockKey = if s == err {
            (false, false, false, None)
        } else {
            let action = if dfa.is_final[s] {
                dfa.action[s]
                    .as_ref()
                    .map(|a| (a.content.clone(), a.kind, a.len, a.entry))
            } else {
                None
            };
            (dfa.is_final[s], dfa.is_pushback[s], dfa.is_lookend[s], action)
        };
        groups.entry(key).or_default().push(s as u32);
    }

    let mut partitions: Vec<Vec<u32>> = Vec::with_capacity(groups.len());
    let mut partition_of: Vec<usize> = vec![0; total];
    for (_key, states) in groups {
        let idx = partitions.len();
        for &s in &states {
            partition_of[s as usize] = idx;
        }
        partitions.push(states);
    }

    // Seed the worklist with every (block, class) pair of the initial
    // partition; refinement only ever shrinks blocks.
    let mut worklist: Vec<(usize, usize)> = Vec::new();
    for block in 0..partitions.len() {
        for class in 0..num_classes {
            worklist.push((block, class));
        }
    }

    let mut in_d = vec![false; total];
    let mut d_states: Vec<u32> = Vec::new();
    let mut affected: Vec<usize> = Vec::new();

    while let Some((splitter, class)) = worklist.pop() {
        // D: states whose class-`class` transition lands in the splitter,
        // captured before any block is touched so a splitter splitting one
        // of its own predecessors' blocks cannot skew later splits.
        d_states.clear();
        affected.clear();
        let mut seen = vec![false; partitions.len()];
        for &member in &partitions[splitter] {
            for &pred in &inverse[member as usize][class] {
                if !in_d[pred as usize] {
                    in_d[pred as usize] = true;
                    d_states.push(pred);
                }
                let block = partition_of[pred as usize];
                if !seen[block] {
                    seen[block] = true;
                    affected.push(block);
                }
            }
        }

        for &block in &affected {
            if partitions[block].len() <= 1 {
                continue;
            }

            let goes = partitions[block]
                .iter()
                .filter(|&&s| in_d[s as usize])
                .count();
            let stays = partitions[block].len() - goes;
            if goes == 0 || stays == 0 {
                continue;
            }

            // Split; the smaller half becomes the new block and is enqueued
            // for every class. Enqueueing only the smaller half is what
            // bounds each state to O(log n) block moves.
            let new_block = partitions.len();
            let split_the_goers = goes <= stays;
            let mut kept = Vec::with_capacity(if split_the_goers { stays } else { goes });
            let mut split = Vec::with_capacity(if split_the_goers { goes } else { stays });
            for &s in &partitions[block] {
                if in_d[s as usize] == split_the_goers {
                    split.push(s);
                } else {
                    kept.push(s);
                }
            }
            for &s in &split {
                partition_of[s as usize] = new_block;
            }
            partitions[block] = kept;
            partitions.push(split);

            for c in 0..num_classes {
                worklist.push((new_block, c));
            }
        }

        for &s in &d_states {
            in_d[s as usize] = false;
        }
    }

    // ── Compaction: collapse each block to its lowest-numbered member ──
    let err_block = partition_of[err];

    // Blocks reachable from the still-live entry states. Refinement can
    // leave blocks whose every path runs through the discarded error block.
    let mut reachable = vec![false; partitions.len()];
    let mut stack: Vec<usize> = Vec::new();
    for &entry in &dfa.entry_states {
        if entry == NO_TARGET {
            continue;
        }
        let block = partition_of[entry as usize];
        if block != err_block && !reachable[block] {
            reachable[block] = true;
            stack.push(entry as usize);
        }
    }
    while let Some(state) = stack.pop() {
        for c in 0..num_classes {
            let t = trans[state][c];
            let block = partition_of[t];
            if block != err_block && !reachable[block] {
                reachable[block] = true;
                stack.push(t);
            }
        }
    }

    let mut live: Vec<(u32, usize)> = partitions
        .iter()
        .enumerate()
        .filter(|(idx, members)| !members.is_empty() && *idx != err_block && reachable[*idx])
        .map(|(idx, members)| (*members.iter().min().expect("non-empty block"), idx))
        .collect();
    live.sort_unstable();

    let mut new_id: Vec<Option<StateId>> = vec![None; partitions.len()];
    for (id, &(_, block)) in live.iter().enumerate() {
        new_id[block] = Some(id as StateId);
    }

    let mut table = Vec::with_capacity(live.len());
    let mut is_final = Vec::with_capacity(live.len());
    let mut is_pushback = Vec::with_capacity(live.len());
    let mut is_lookend = Vec::with_capacity(live.len());
    let mut action = Vec::with_capacity(live.len());

    for &(rep, _) in &live {
        let rep = rep as usize;
        let mut row = Vec::with_capacity(num_classes);
        for c in 0..num_classes {
            row.push(match new_id[partition_of[trans[rep][c]]] {
                Some(id) => id,
                None => NO_TARGET,
            });
        }
        table.push(row);
        is_final.push(dfa.is_final[rep]);
        is_pushback.push(dfa.is_pushback[rep]);
        is_lookend.push(dfa.is_lookend[rep]);
        action.push(dfa.action[rep].clone());
    }

    for entry in dfa.entry_states.iter_mut() {
        if *entry == NO_TARGET {
            continue;
        }
        *entry = match new_id[partition_of[*entry as usize]] {
            Some(id) => id,
            None => NO_TARGET,
        };
    }

    dfa.table = table;
    dfa.is_final = is_final;
    dfa.is_pushback = is_pushback;
    dfa.is_lookend = is_lookend;
    dfa.action = action;
}
