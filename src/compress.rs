//! Transition-table compression.
//!
//! Three stages, each losslessly invertible:
//! 1. **Row/column reduction** — duplicate columns, then duplicate rows
//!    (compared over surviving columns only), are mapped onto their
//!    lowest-index representative and physically dropped; `row_map` /
//!    `col_map` record where each original index went.
//! 2. **Run-length packing** — the compacted table in row-major order is
//!    encoded as `(count, value)` pairs, with an integer offset translation
//!    so the dead-transition sentinel lands in the unsigned range.
//! 3. **Wide packing** — row-base offsets (`row_map[state] * num_cols`) can
//!    exceed 16 bits, so they get a hi/low split per value instead.
//!
//! All packed output is chunked at [`MAX_CHUNK_LEN`] units; the decoder's
//! chunk index stays implicit in emission order. `unpack_rle` / `unpack_wide`
//! are exact inverses of their packers — that round trip is the contract
//! everything downstream relies on.

use serde::{Deserialize, Serialize};

use crate::dfa::Dfa;
use crate::NO_TARGET;

/// Maximum number of 16-bit units per packed chunk.
pub const MAX_CHUNK_LEN: usize = 0xFFF0;

/// Offset applied to transition values so `-1` (dead) packs as `0`.
pub const TRANS_OFFSET: i64 = 1;

/// An ordered sequence of bounded packed segments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackedChunks {
    pub chunks: Vec<Vec<u16>>,
}

impl PackedChunks {
    /// Total number of 16-bit units across all chunks.
    pub fn units(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }
}

/// Result of row/column reduction: the physically compacted table plus the
/// maps that reconstruct the original indexing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reduced {
    /// Compacted table, row-major; dead transitions are `-1`.
    pub data: Vec<i64>,
    /// Surviving column count.
    pub num_cols: usize,
    /// Original row (state) → compacted row index of its representative.
    pub row_map: Vec<usize>,
    /// Original column (class) → compacted column index of its representative.
    pub col_map: Vec<usize>,
}

impl Reduced {
    /// Reconstruct one original table cell.
    pub fn lookup(&self, state: usize, class: usize) -> i64 {
        self.data[self.row_map[state] * self.num_cols + self.col_map[class]]
    }
}

/// Eliminate duplicate columns, then duplicate rows, of `table`.
///
/// A column is redundant if an identical column exists at a lower index; a
/// row is redundant if a row identical over the *surviving* columns exists at
/// a lower index. [`NO_TARGET`] is translated to `-1` on the way in.
pub fn reduce(table: &[Vec<u32>], num_classes: usize) -> Reduced {
    let num_rows = table.len();

    let cell = |row: usize, col: usize| -> i64 {
        match table[row][col] {
            NO_TARGET => -1,
            t => t as i64,
        }
    };

    // Column pass. `col_rep[c]` = lowest original column equal to c.
    let mut col_rep: Vec<usize> = Vec::with_capacity(num_classes);
    let mut live_cols: Vec<usize> = Vec::new();
    for c in 0..num_classes {
        let dup = live_cols
            .iter()
            .find(|&&earlier| (0..num_rows).all(|r| cell(r, earlier) == cell(r, c)));
        match dup {
            Some(&earlier) => col_rep.push(earlier),
            None => {
                live_cols.push(c);
                col_rep.push(c);
            }
        }
    }
    let mut col_map = vec![0usize; num_classes];
    for c in 0..num_classes {
        let rep = col_rep[c];
        col_map[c] = live_cols
            .iter()
            .position(|&lc| lc == rep)
            .expect("representative column survives");
    }

    // Row pass over surviving columns only.
    let row_key = |r: usize| -> Vec<i64> { live_cols.iter().map(|&c| cell(r, c)).collect() };
    let mut live_rows: Vec<usize> = Vec::new();
    let mut row_map = vec![0usize; num_rows];
    for r in 0..num_rows {
        let key = row_key(r);
        match live_rows.iter().position(|&earlier| row_key(earlier) == key) {
            Some(pos) => row_map[r] = pos,
            None => {
                row_map[r] = live_rows.len();
                live_rows.push(r);
            }
        }
    }

    let mut data = Vec::with_capacity(live_rows.len() * live_cols.len());
    for &r in &live_rows {
        for &c in &live_cols {
            data.push(cell(r, c));
        }
    }

    Reduced {
        data,
        num_cols: live_cols.len(),
        row_map,
        col_map,
    }
}

/// Run-length pack `values` as `(count, value + offset)` pairs.
///
/// Every translated value must fit `u16`; runs longer than `u16::MAX` are
/// emitted as multiple pairs.
pub fn pack_rle(values: &[i64], offset: i64) -> PackedChunks {
    pack_rle_limited(values, offset, MAX_CHUNK_LEN)
}

fn pack_rle_limited(values: &[i64], offset: i64, limit: usize) -> PackedChunks {
    assert!(limit >= 2, "a chunk must hold at least one pair");
    let mut chunks = Vec::new();
    let mut chunk: Vec<u16> = Vec::new();

    let mut emit = |count: usize, value: i64, chunks: &mut Vec<Vec<u16>>, chunk: &mut Vec<u16>| {
        let translated = value + offset;
        assert!(
            (0..=i64::from(u16::MAX)).contains(&translated),
            "value {value} out of packable range at offset {offset}"
        );
        let mut remaining = count;
        while remaining > 0 {
            let run = remaining.min(u16::MAX as usize);
            if chunk.len() + 2 > limit {
                chunks.push(std::mem::take(chunk));
            }
            chunk.push(run as u16);
            chunk.push(translated as u16);
            remaining -= run;
        }
    };

    let mut iter = values.iter();
    if let Some(&first) = iter.next() {
        let mut current = first;
        let mut count = 1usize;
        for &v in iter {
            if v == current {
                count += 1;
            } else {
                emit(count, current, &mut chunks, &mut chunk);
                current = v;
                count = 1;
            }
        }
        emit(count, current, &mut chunks, &mut chunk);
    }
    if !chunk.is_empty() || chunks.is_empty() {
        chunks.push(chunk);
    }
    PackedChunks { chunks }
}

/// Exact inverse of [`pack_rle`].
pub fn unpack_rle(packed: &PackedChunks, offset: i64) -> Vec<i64> {
    let mut values = Vec::new();
    let mut units = packed.chunks.iter().flat_map(|c| c.iter().copied());
    while let Some(count) = units.next() {
        let value = units
            .next()
            .expect("dangling run count in packed data");
        let v = i64::from(value) - offset;
        values.extend(std::iter::repeat(v).take(count as usize));
    }
    values
}

/// Pack `values` as per-value hi/low 16-bit splits, for arrays whose entries
/// may not fit a single `u16` (row-base offsets).
pub fn pack_wide(values: &[i64]) -> PackedChunks {
    pack_wide_limited(values, MAX_CHUNK_LEN)
}

fn pack_wide_limited(values: &[i64], limit: usize) -> PackedChunks {
    assert!(limit >= 2, "a chunk must hold at least one value");
    let mut chunks = Vec::new();
    let mut chunk: Vec<u16> = Vec::new();
    for &v in values {
        assert!(
            (0..=0xFFFF_FFFF).contains(&v),
            "value {v} out of hi/low range"
        );
        if chunk.len() + 2 > limit {
            chunks.push(std::mem::take(&mut chunk));
        }
        chunk.push((v >> 16) as u16);
        chunk.push((v & 0xFFFF) as u16);
    }
    if !chunk.is_empty() || chunks.is_empty() {
        chunks.push(chunk);
    }
    PackedChunks { chunks }
}

/// Exact inverse of [`pack_wide`].
pub fn unpack_wide(packed: &PackedChunks) -> Vec<i64> {
    let mut values = Vec::new();
    let mut units = packed.chunks.iter().flat_map(|c| c.iter().copied());
    while let Some(hi) = units.next() {
        let lo = units.next().expect("dangling hi half in packed data");
        values.push((i64::from(hi) << 16) | i64::from(lo));
    }
    values
}

/// Everything the emitter needs to reconstruct the scanner tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressedTables {
    /// Reduced transition table, run-length packed with [`TRANS_OFFSET`].
    pub trans: PackedChunks,
    /// char → class-code map over the full domain, run-length packed.
    pub char_map: PackedChunks,
    /// Per-state attribute bitmask, run-length packed.
    pub attributes: PackedChunks,
    /// Per-state action-dispatch index (`0` = none, else `1 + index` into
    /// [`CompressedTables::action_list`]), run-length packed.
    pub actions: PackedChunks,
    /// Per-state row-base offset `row_map[state] * num_cols`, wide packed.
    pub row_offsets: PackedChunks,
    pub row_map: Vec<usize>,
    pub col_map: Vec<usize>,
    /// Surviving column count of the reduced transition table.
    pub num_cols: usize,
    pub num_states: usize,
    /// Deduplicated actions referenced by the dispatch table.
    pub action_list: Vec<crate::action::Action>,
}

/// Compress a finished DFA plus its char → class map.
pub fn compress_dfa(dfa: &Dfa, char_map: &[usize]) -> CompressedTables {
    let reduced = reduce(&dfa.table, dfa.num_classes);

    let row_offsets: Vec<i64> = reduced
        .row_map
        .iter()
        .map(|&row| (row * reduced.num_cols) as i64)
        .collect();

    let mut action_list: Vec<crate::action::Action> = Vec::new();
    let dispatch: Vec<i64> = dfa
        .action
        .iter()
        .map(|slot| match slot {
            None => 0,
            Some(action) => {
                let idx = match action_list.iter().position(|a| a.is_equiv(action)) {
                    Some(idx) => idx,
                    None => {
                        action_list.push(action.clone());
                        action_list.len() - 1
                    }
                };
                (idx + 1) as i64
            }
        })
        .collect();

    let attributes: Vec<i64> = (0..dfa.len())
        .map(|s| i64::from(dfa.attributes(s as u32)))
        .collect();
    let classes: Vec<i64> = char_map.iter().map(|&c| c as i64).collect();

    CompressedTables {
        trans: pack_rle(&reduced.data, TRANS_OFFSET),
        char_map: pack_rle(&classes, 0),
        attributes: pack_rle(&attributes, 0),
        actions: pack_rle(&dispatch, 0),
        row_offsets: pack_wide(&row_offsets),
        row_map: reduced.row_map,
        col_map: reduced.col_map,
        num_cols: reduced.num_cols,
        num_states: dfa.len(),
        action_list,
    }
}

impl CompressedTables {
    /// Decode one transition the way the emitted scanner does:
    /// `flat[row_offset[state] + col_map[class]]`, `-1` meaning dead.
    pub fn transition(&self, state: usize, class: usize) -> i64 {
        let flat = unpack_rle(&self.trans, TRANS_OFFSET);
        let offsets = unpack_wide(&self.row_offsets);
        flat[offsets[state] as usize + self.col_map[class]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduce_duplicate_rows_and_columns() {
        // Rows 0 and 2 identical; columns 1 and 2 identical.
        let table = vec![
            vec![1, 0, 0, NO_TARGET],
            vec![2, 2, 2, 1],
            vec![1, 0, 0, NO_TARGET],
        ];
        let reduced = reduce(&table, 4);
        assert_eq!(reduced.row_map, vec![0, 1, 0]);
        assert_eq!(reduced.col_map, vec![0, 1, 1, 2]);
        assert_eq!(reduced.num_cols, 3);
        assert_eq!(reduced.data.len(), 2 * 3);

        for state in 0..3 {
            for class in 0..4 {
                let original = match table[state][class] {
                    NO_TARGET => -1,
                    t => t as i64,
                };
                assert_eq!(reduced.lookup(state, class), original);
            }
        }
    }

    #[test]
    fn test_rle_round_trip() {
        let values = vec![-1, -1, -1, 5, 5, 0, 7, 7, 7, 7, -1];
        let packed = pack_rle(&values, TRANS_OFFSET);
        assert_eq!(unpack_rle(&packed, TRANS_OFFSET), values);
        // Three runs of -1/5/0/7/-1 → five pairs.
        assert_eq!(packed.units(), 10);
    }

    #[test]
    fn test_rle_chunk_boundaries() {
        // Limit of 4 units = two pairs per chunk; six distinct values force
        // three chunks.
        let values = vec![1, 2, 3, 4, 5, 6];
        let packed = pack_rle_limited(&values, 0, 4);
        assert_eq!(packed.chunks.len(), 3);
        assert!(packed.chunks.iter().all(|c| c.len() <= 4));
        assert_eq!(unpack_rle(&packed, 0), values);
    }

    #[test]
    fn test_rle_long_run_splits_pairs() {
        let values = vec![9i64; u16::MAX as usize + 10];
        let packed = pack_rle(&values, 0);
        assert_eq!(unpack_rle(&packed, 0), values);
    }

    #[test]
    fn test_wide_round_trip_past_16_bits() {
        let values = vec![0, 1, 0xFFFF, 0x1_0000, 0xAB_CDEF];
        let packed = pack_wide(&values);
        assert_eq!(unpack_wide(&packed), values);
    }

    #[test]
    fn test_wide_chunk_boundaries() {
        let values: Vec<i64> = (0..5).collect();
        let packed = pack_wide_limited(&values, 4);
        assert_eq!(packed.chunks.len(), 3);
        assert_eq!(unpack_wide(&packed), values);
    }

    #[test]
    fn test_empty_input_packs_to_one_empty_chunk() {
        let packed = pack_rle(&[], 0);
        assert_eq!(packed.chunks, vec![Vec::<u16>::new()]);
        assert_eq!(unpack_rle(&packed, 0), Vec::<i64>::new());
    }

    #[test]
    fn test_compress_dfa_reconstructs_transitions() {
        use crate::dfa::Dfa;

        let mut dfa = Dfa::new(3);
        let a = dfa.add_state();
        let b = dfa.add_state();
        let c = dfa.add_state();
        dfa.set_transition(a, 0, b);
        dfa.set_transition(a, 1, b);
        dfa.set_transition(b, 2, c);
        dfa.is_final[c as usize] = true;
        dfa.action[c as usize] = Some(crate::action::Action::new("emit", 0, 1));

        let char_map = vec![0usize, 0, 1, 2, 2];
        let tables = compress_dfa(&dfa, &char_map);

        for state in 0..dfa.len() {
            for class in 0..3 {
                let original = match dfa.table[state][class] {
                    NO_TARGET => -1,
                    t => t as i64,
                };
                assert_eq!(tables.transition(state, class), original);
            }
        }
        assert_eq!(unpack_rle(&tables.char_map, 0), vec![0, 0, 1, 2, 2]);
        assert_eq!(tables.action_list.len(), 1);
        assert_eq!(unpack_rle(&tables.actions, 0), vec![0, 0, 1]);
    }
}
