//! Logic graph resolver.
//!
//! Every edit to the row reference graph passes through [`LogicGraph`]. An
//! edit is either accepted, leaving the graph well-formed and all dependent
//! rows recomputed, or rejected with the rows exactly as they were.
//!
//! ## Depth rules
//!
//! ```text
//! Single:  no self edge, no A→B with B→A
//! Nested:  acyclic, fan-in ≤ 1, at most MAX_LOGIC_EDGES edges
//! ```
//!
//! Recompute order after a nested edit:
//!
//! ```text
//!   root ◀── … ◀── selected ◀── … ◀── leaf
//!   └── upward stack, popped ──┘     └ downward, discovery order ┘
//! ```

use gridclock_core::{
    Config, EditRejection, LogicDepth, LogicEdge, LogicOperator, RowIndex, MAX_LOGIC_EDGES,
};
use tracing::debug;

use crate::rows::{RowStack, RowStore};
use crate::sync::{refresh_lengths, resync_row};

/// Effect of an accepted edge edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeChange {
    /// The row had no edge and now has one.
    Added(LogicEdge),
    /// The row's edge was swapped for another.
    Replaced {
        previous: LogicEdge,
        edge: LogicEdge,
    },
    /// Pressing the current edge again removed it.
    Cleared(LogicEdge),
}

/// Outcome of [`LogicGraph::try_apply_edge`].
pub type EditOutcome = Result<EdgeChange, EditRejection>;

/// Mutable view over the rows, under a fixed config.
#[derive(Debug)]
pub struct LogicGraph<'a> {
    rows: &'a mut RowStore,
    config: &'a Config,
}

impl<'a> LogicGraph<'a> {
    pub fn new(rows: &'a mut RowStore, config: &'a Config) -> Self {
        Self { rows, config }
    }

    /// Validate and apply an edge from `selected` to `target`.
    ///
    /// Pressing the edge a row already has clears it instead.
    pub fn try_apply_edge(
        &mut self,
        selected: RowIndex,
        target: RowIndex,
        operator: LogicOperator,
    ) -> EditOutcome {
        let edge = LogicEdge::new(operator, target);
        let previous = self.rows.edge(selected);

        if previous == Some(edge) {
            self.rows.row_mut(selected).logic_edge = None;
            self.propagate(selected, RowStack::new());
            debug!(row = %selected, target = %target, "edge_cleared");
            return Ok(EdgeChange::Cleared(edge));
        }

        match self.config.logic_depth {
            LogicDepth::Single => self.apply_single(selected, edge)?,
            LogicDepth::Nested => self.apply_nested(selected, edge)?,
        }

        debug!(row = %selected, target = %target, op = %operator, "edge_set");
        Ok(match previous {
            Some(previous) => EdgeChange::Replaced { previous, edge },
            None => EdgeChange::Added(edge),
        })
    }

    fn apply_single(&mut self, selected: RowIndex, edge: LogicEdge) -> Result<(), EditRejection> {
        if edge.target == selected {
            return Err(EditRejection::SelfReference);
        }
        if self.rows.row(edge.target).targets(selected) {
            return Err(EditRejection::DirectCycle);
        }

        self.rows.row_mut(selected).logic_edge = Some(edge);
        resync_row(self.rows, self.config, selected);
        Ok(())
    }

    fn apply_nested(&mut self, selected: RowIndex, edge: LogicEdge) -> Result<(), EditRejection> {
        let target = edge.target;
        if target == selected {
            return Err(EditRejection::SelfReference);
        }
        if self.rows.is_targeted_by_other(target, selected) {
            return Err(EditRejection::AlreadyTargeted);
        }
        if self.rows.row(target).targets(selected) {
            return Err(EditRejection::DirectCycle);
        }

        let previous = self.rows.edge(selected);
        if previous.is_none() && self.rows.edge_count() >= MAX_LOGIC_EDGES {
            return Err(EditRejection::CapacityExceeded);
        }

        self.rows.row_mut(selected).logic_edge = Some(edge);
        let upward = match upward_chain(self.rows, selected) {
            Ok(upward) => upward,
            Err(rejection) => {
                self.rows.row_mut(selected).logic_edge = previous;
                return Err(rejection);
            }
        };

        self.propagate(selected, upward);
        Ok(())
    }

    /// Move `index` to a new division column.
    ///
    /// Returns the new divisor, or `None` (no change) for a position outside
    /// the division columns.
    pub fn set_position(&mut self, index: RowIndex, position: u8) -> Option<u32> {
        let divisor = self.config.divisor_for(position)?.max(1);
        let row = self.rows.row_mut(index);
        row.position = position;
        row.divisor = divisor;

        self.propagate(index, RowStack::new());
        debug!(row = %index, position, divisor, "division_set");
        Some(divisor)
    }

    /// Drop every edge and recompute all rows.
    pub fn clear_edges(&mut self) {
        for row in self.rows.rows_mut() {
            row.logic_edge = None;
        }
        refresh_lengths(self.rows, self.config);
    }

    /// Whether the current edges satisfy the rules of `depth`.
    pub fn satisfies(&self, depth: LogicDepth) -> bool {
        graph_satisfies(self.rows, depth)
    }

    /// Recompute `start`, then the popped upward chain, then every row that
    /// transitively depends on `start`.
    fn propagate(&mut self, start: RowIndex, mut upward: RowStack) {
        resync_row(self.rows, self.config, start);

        while let Some(index) = upward.pop() {
            resync_row(self.rows, self.config, index);
        }

        let downward = downward_chain(self.rows, start);
        for &index in downward.as_slice() {
            resync_row(self.rows, self.config, index);
        }
    }
}

/// Rows reached by following edges up from `start`, nearest first.
///
/// Fails with [`EditRejection::TransitiveCycle`] if the walk returns to
/// `start`.
pub fn upward_chain(rows: &RowStore, start: RowIndex) -> Result<RowStack, EditRejection> {
    let mut chain = RowStack::new();
    let mut current = start;

    while let Some(edge) = rows.edge(current) {
        let next = edge.target;
        if next == start {
            return Err(EditRejection::TransitiveCycle);
        }
        // a loop not passing through `start` ends the walk
        if chain.contains(next) || !chain.push(next) {
            break;
        }
        current = next;
    }

    Ok(chain)
}

/// Rows that transitively reference `start`, in breadth-first order.
pub fn downward_chain(rows: &RowStore, start: RowIndex) -> RowStack {
    let mut found = RowStack::new();
    let mut cursor = 0;
    let mut frontier = start;

    loop {
        for referrer in rows.referrers(frontier) {
            if referrer != start && !found.contains(referrer) {
                found.push(referrer);
            }
        }
        match found.get(cursor) {
            Some(next) => {
                frontier = next;
                cursor += 1;
            }
            None => break,
        }
    }

    found
}

/// Check the invariants of `depth` against the current edges.
pub fn graph_satisfies(rows: &RowStore, depth: LogicDepth) -> bool {
    let no_self = rows
        .iter()
        .all(|(index, row)| !row.targets(index));
    if !no_self {
        return false;
    }

    let no_pairs = rows.iter().all(|(index, row)| match row.logic_edge {
        Some(edge) => !rows.row(edge.target).targets(index),
        None => true,
    });
    if !no_pairs {
        return false;
    }

    match depth {
        LogicDepth::Single => true,
        LogicDepth::Nested => {
            rows.edge_count() <= MAX_LOGIC_EDGES
                && RowIndex::all().all(|target| rows.referrers(target).count() <= 1)
                && RowIndex::all().all(|index| upward_chain(rows, index).is_ok())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(i: u8) -> RowIndex {
        RowIndex::new(i).unwrap()
    }

    fn nested() -> Config {
        Config {
            logic_depth: LogicDepth::Nested,
            ..Default::default()
        }
    }

    fn link(rows: &mut RowStore, from: u8, to: u8) {
        rows.row_mut(row(from)).logic_edge = Some(LogicEdge::new(LogicOperator::And, row(to)));
    }

    #[test]
    fn test_upward_chain_order() {
        let mut rows = RowStore::with_defaults(&Config::default());
        link(&mut rows, 0, 1);
        link(&mut rows, 1, 2);
        link(&mut rows, 2, 3);

        let chain = upward_chain(&rows, row(0)).unwrap();
        assert_eq!(chain.as_slice(), &[row(1), row(2), row(3)]);
    }

    #[test]
    fn test_upward_chain_detects_return() {
        let mut rows = RowStore::with_defaults(&Config::default());
        link(&mut rows, 0, 1);
        link(&mut rows, 1, 2);
        link(&mut rows, 2, 0);

        assert_eq!(
            upward_chain(&rows, row(0)),
            Err(EditRejection::TransitiveCycle)
        );
    }

    #[test]
    fn test_downward_chain_breadth_first() {
        let mut rows = RowStore::with_defaults(&Config::default());
        link(&mut rows, 1, 0);
        link(&mut rows, 2, 0);
        link(&mut rows, 3, 1);
        link(&mut rows, 4, 3);

        let chain = downward_chain(&rows, row(0));
        assert_eq!(chain.as_slice(), &[row(1), row(2), row(3), row(4)]);
    }

    #[test]
    fn test_single_rejects_self_and_pair() {
        let config = Config::default();
        let mut rows = RowStore::with_defaults(&config);
        let mut graph = LogicGraph::new(&mut rows, &config);

        assert_eq!(
            graph.try_apply_edge(row(2), row(2), LogicOperator::Or),
            Err(EditRejection::SelfReference)
        );
        assert!(graph.try_apply_edge(row(2), row(3), LogicOperator::Or).is_ok());
        assert_eq!(
            graph.try_apply_edge(row(3), row(2), LogicOperator::Or),
            Err(EditRejection::DirectCycle)
        );
    }

    #[test]
    fn test_toggle_clears_and_replace_reports_previous() {
        let config = Config::default();
        let mut rows = RowStore::with_defaults(&config);
        let mut graph = LogicGraph::new(&mut rows, &config);

        let and = LogicEdge::new(LogicOperator::And, row(4));
        let xor = LogicEdge::new(LogicOperator::Xor, row(4));
        assert_eq!(
            graph.try_apply_edge(row(1), row(4), LogicOperator::And),
            Ok(EdgeChange::Added(and))
        );
        assert_eq!(
            graph.try_apply_edge(row(1), row(4), LogicOperator::Xor),
            Ok(EdgeChange::Replaced {
                previous: and,
                edge: xor
            })
        );
        assert_eq!(
            graph.try_apply_edge(row(1), row(4), LogicOperator::Xor),
            Ok(EdgeChange::Cleared(xor))
        );
        assert!(rows.edge(row(1)).is_none());
    }

    #[test]
    fn test_nested_rejects_second_referrer() {
        let config = nested();
        let mut rows = RowStore::with_defaults(&config);
        let mut graph = LogicGraph::new(&mut rows, &config);

        graph
            .try_apply_edge(row(0), row(5), LogicOperator::And)
            .unwrap();
        assert_eq!(
            graph.try_apply_edge(row(1), row(5), LogicOperator::And),
            Err(EditRejection::AlreadyTargeted)
        );
    }

    #[test]
    fn test_nested_capacity() {
        let config = nested();
        let mut rows = RowStore::with_defaults(&config);
        let mut graph = LogicGraph::new(&mut rows, &config);

        // chain 0→1→2→3→4→5→6 uses all six edges
        for i in 0..6 {
            graph
                .try_apply_edge(row(i), row(i + 1), LogicOperator::Or)
                .unwrap();
        }
        assert_eq!(
            graph.try_apply_edge(row(7), row(0), LogicOperator::Or),
            Err(EditRejection::CapacityExceeded)
        );
        assert!(graph
            .try_apply_edge(row(6), row(7), LogicOperator::Or)
            .is_err());
        // retargeting an existing edge does not add one
        assert!(graph
            .try_apply_edge(row(5), row(7), LogicOperator::Or)
            .is_ok());
        assert_eq!(rows.edge_count(), 6);
    }

    #[test]
    fn test_set_position_recomputes_referrers() {
        let config = nested();
        let mut rows = RowStore::with_defaults(&config);
        let mut graph = LogicGraph::new(&mut rows, &config);

        graph.set_position(row(1), 12).unwrap(); // ÷4
        graph
            .try_apply_edge(row(0), row(1), LogicOperator::And)
            .unwrap();
        graph.set_position(row(0), 13).unwrap(); // ÷3
        assert_eq!(rows.row(row(0)).pattern_length, 12);

        let mut graph = LogicGraph::new(&mut rows, &config);
        graph.set_position(row(1), 11).unwrap(); // ÷5
        assert_eq!(rows.row(row(0)).pattern_length, 15);
        assert_eq!(rows.row(row(1)).pattern_length, 5);
    }

    #[test]
    fn test_set_position_out_of_range_is_noop() {
        let config = Config::default();
        let mut rows = RowStore::with_defaults(&config);
        let before = rows.clone();
        let mut graph = LogicGraph::new(&mut rows, &config);

        assert_eq!(graph.set_position(row(3), 2), None);
        assert_eq!(graph.set_position(row(3), 16), None);
        assert_eq!(rows, before);
    }

    #[test]
    fn test_graph_satisfies() {
        let mut rows = RowStore::with_defaults(&Config::default());
        link(&mut rows, 0, 2);
        link(&mut rows, 1, 2);
        assert!(graph_satisfies(&rows, LogicDepth::Single));
        assert!(!graph_satisfies(&rows, LogicDepth::Nested));

        link(&mut rows, 1, 3);
        link(&mut rows, 2, 3);
        link(&mut rows, 3, 0);
        // 0→2→3→0 is fine for single depth, never for nested
        assert!(graph_satisfies(&rows, LogicDepth::Single));
        assert!(!graph_satisfies(&rows, LogicDepth::Nested));
    }
}
