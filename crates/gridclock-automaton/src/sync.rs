//! Pattern-length derivation and phase re-alignment.
//!
//! Phase alignment is best effort: a row whose pattern length changes copies
//! the phase of a peer with the same length, or else of the closest longer
//! pattern. This does not guarantee phase lock across arbitrary edits.

use gridclock_core::{Config, Mode, RowIndex};

use crate::rows::RowStore;

/// Pattern length `row` should have given its divisor and edge.
pub fn pattern_length_for(rows: &RowStore, config: &Config, index: RowIndex) -> u32 {
    let row = rows.row(index);
    match (config.mode, row.logic_edge) {
        (Mode::Logical, Some(edge)) => {
            let target = rows.row(edge.target);
            row.divisor.max(1).saturating_mul(target.divisor.max(1))
        }
        _ => config.base_pattern_length(row.divisor),
    }
}

/// Phase for `index` once its pattern length becomes `length`.
pub fn aligned_phase(rows: &RowStore, index: RowIndex, length: u32) -> u32 {
    let length = length.max(1);
    let peers = || rows.iter().filter(move |(i, _)| *i != index);

    if let Some((_, peer)) = peers().find(|(_, r)| r.pattern_length == length) {
        return peer.phase % length;
    }

    peers()
        .filter(|(_, r)| r.pattern_length > length)
        .min_by_key(|(_, r)| r.pattern_length - length)
        .map(|(_, r)| r.phase % length)
        .unwrap_or(rows.row(index).phase % length)
}

/// Re-derive a row's pattern length and re-align its phase.
pub fn resync_row(rows: &mut RowStore, config: &Config, index: RowIndex) {
    let length = pattern_length_for(rows, config, index);
    let phase = aligned_phase(rows, index, length);
    let row = rows.row_mut(index);
    row.pattern_length = length;
    row.phase = phase;
}

/// Re-derive every pattern length, keeping phases in range.
///
/// Used after wholesale changes (mode switch, cleared graph) where no peer
/// is a meaningful alignment reference.
pub fn refresh_lengths(rows: &mut RowStore, config: &Config) {
    for index in RowIndex::all() {
        let length = pattern_length_for(rows, config, index);
        let row = rows.row_mut(index);
        row.pattern_length = length;
        row.phase %= length;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridclock_core::{LogicEdge, LogicOperator};

    fn row(i: u8) -> RowIndex {
        RowIndex::new(i).unwrap()
    }

    fn store_with_divisors(divisors: [u32; 8]) -> RowStore {
        let config = Config::default();
        let mut rows = RowStore::with_defaults(&config);
        for (i, d) in divisors.iter().enumerate() {
            let r = rows.row_mut(row(i as u8));
            r.divisor = *d;
            r.pattern_length = *d;
        }
        rows
    }

    #[test]
    fn test_edge_multiplies_lengths() {
        let config = Config::default();
        let mut rows = store_with_divisors([4, 3, 1, 1, 1, 1, 1, 1]);
        rows.row_mut(row(0)).logic_edge = Some(LogicEdge::new(LogicOperator::And, row(1)));

        resync_row(&mut rows, &config, row(0));
        assert_eq!(rows.row(row(0)).pattern_length, 12);
    }

    #[test]
    fn test_edge_length_saturates() {
        let config = Config::default();
        let mut rows = store_with_divisors([u32::MAX / 2, 3, 1, 1, 1, 1, 1, 1]);
        rows.row_mut(row(0)).logic_edge = Some(LogicEdge::new(LogicOperator::And, row(1)));
        assert_eq!(pattern_length_for(&rows, &config, row(0)), u32::MAX);
    }

    #[test]
    fn test_step_mode_ignores_edges() {
        let config = Config {
            mode: Mode::Step,
            ..Default::default()
        };
        let mut rows = store_with_divisors([4, 3, 1, 1, 1, 1, 1, 1]);
        rows.row_mut(row(0)).logic_edge = Some(LogicEdge::new(LogicOperator::And, row(1)));
        assert_eq!(pattern_length_for(&rows, &config, row(0)), 64);
    }

    #[test]
    fn test_phase_copied_from_equal_length_peer() {
        let mut rows = store_with_divisors([4, 3, 12, 1, 1, 1, 1, 1]);
        rows.row_mut(row(2)).phase = 7;
        assert_eq!(aligned_phase(&rows, row(0), 12), 7);
    }

    #[test]
    fn test_phase_copied_from_nearest_longer_peer() {
        let mut rows = store_with_divisors([4, 3, 16, 32, 1, 1, 1, 1]);
        rows.row_mut(row(2)).phase = 13;
        rows.row_mut(row(3)).phase = 30;
        // 16 is the closest longer length; 13 % 12 keeps the phase in range
        assert_eq!(aligned_phase(&rows, row(0), 12), 1);
    }

    #[test]
    fn test_phase_kept_without_candidates() {
        let mut rows = store_with_divisors([4, 3, 2, 1, 1, 1, 1, 1]);
        rows.row_mut(row(0)).phase = 3;
        assert_eq!(aligned_phase(&rows, row(0), 12), 3);
        // row 2 already runs a length-2 pattern
        assert_eq!(aligned_phase(&rows, row(0), 2), 0);
    }

    #[test]
    fn test_refresh_lengths_wraps_phase() {
        let config = Config::default();
        let mut rows = store_with_divisors([4, 3, 1, 1, 1, 1, 1, 1]);
        rows.row_mut(row(0)).pattern_length = 12;
        rows.row_mut(row(0)).phase = 10;

        refresh_lengths(&mut rows, &config);
        assert_eq!(rows.row(row(0)).pattern_length, 4);
        assert_eq!(rows.row(row(0)).phase, 2);
    }
}
