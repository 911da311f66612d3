//! Row store and the bounded row stack used by graph walks.

use gridclock_core::{default_rows, Config, LogicEdge, Row, RowIndex, GATE_OUTS};

/// The eight rows owned by a session.
///
/// Always holds exactly [`GATE_OUTS`] rows; rows are edited in place, never
/// added or removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowStore {
    rows: [Row; GATE_OUTS],
}

impl RowStore {
    pub fn new(rows: [Row; GATE_OUTS]) -> Self {
        Self { rows }
    }

    /// Factory rows for `config`.
    pub fn with_defaults(config: &Config) -> Self {
        Self::new(default_rows(config))
    }

    pub fn row(&self, index: RowIndex) -> &Row {
        &self.rows[index.index()]
    }

    pub(crate) fn row_mut(&mut self, index: RowIndex) -> &mut Row {
        &mut self.rows[index.index()]
    }

    pub fn rows(&self) -> &[Row; GATE_OUTS] {
        &self.rows
    }

    pub(crate) fn rows_mut(&mut self) -> &mut [Row; GATE_OUTS] {
        &mut self.rows
    }

    /// Rows paired with their indices.
    pub fn iter(&self) -> impl Iterator<Item = (RowIndex, &Row)> {
        RowIndex::all().zip(self.rows.iter())
    }

    pub fn edge(&self, index: RowIndex) -> Option<LogicEdge> {
        self.row(index).logic_edge
    }

    pub fn edge_count(&self) -> usize {
        self.rows.iter().filter(|r| r.logic_edge.is_some()).count()
    }

    /// Rows whose edge points at `target`.
    pub fn referrers(&self, target: RowIndex) -> impl Iterator<Item = RowIndex> + '_ {
        self.iter()
            .filter(move |(_, row)| row.targets(target))
            .map(|(index, _)| index)
    }

    /// Whether any row other than `except` points at `target`.
    pub fn is_targeted_by_other(&self, target: RowIndex, except: RowIndex) -> bool {
        self.referrers(target).any(|r| r != except)
    }

    pub(crate) fn clear_blinks(&mut self) {
        for row in &mut self.rows {
            row.blink = false;
        }
    }

    pub(crate) fn into_rows(self) -> [Row; GATE_OUTS] {
        self.rows
    }
}

/// Fixed-capacity list of rows, used as a stack or a FIFO cursor.
///
/// A graph of eight nodes never needs more than eight entries, so walks run
/// without heap allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowStack {
    items: [RowIndex; GATE_OUTS],
    len: usize,
}

impl Default for RowStack {
    fn default() -> Self {
        Self::new()
    }
}

impl RowStack {
    pub const CAPACITY: usize = GATE_OUTS;

    pub fn new() -> Self {
        Self {
            items: [RowIndex::MIN; GATE_OUTS],
            len: 0,
        }
    }

    /// Push a row; returns `false` when full.
    pub fn push(&mut self, row: RowIndex) -> bool {
        if self.len == Self::CAPACITY {
            return false;
        }
        self.items[self.len] = row;
        self.len += 1;
        true
    }

    /// Remove the most recently pushed row.
    pub fn pop(&mut self) -> Option<RowIndex> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        Some(self.items[self.len])
    }

    /// Entry at `position`, counting from the first push.
    pub fn get(&self, position: usize) -> Option<RowIndex> {
        self.as_slice().get(position).copied()
    }

    pub fn contains(&self, row: RowIndex) -> bool {
        self.as_slice().contains(&row)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[RowIndex] {
        &self.items[..self.len]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridclock_core::LogicOperator;

    fn row(i: u8) -> RowIndex {
        RowIndex::new(i).unwrap()
    }

    #[test]
    fn test_stack_is_lifo() {
        let mut stack = RowStack::new();
        assert!(stack.push(row(1)));
        assert!(stack.push(row(4)));
        assert_eq!(stack.pop(), Some(row(4)));
        assert_eq!(stack.pop(), Some(row(1)));
        assert_eq!(stack.pop(), None);
    }

    #[test]
    fn test_stack_refuses_ninth_entry() {
        let mut stack = RowStack::new();
        for i in RowIndex::all() {
            assert!(stack.push(i));
        }
        assert!(!stack.push(row(0)));
        assert_eq!(stack.len(), RowStack::CAPACITY);
        assert_eq!(stack.get(7), Some(row(7)));
        assert_eq!(stack.get(8), None);
    }

    #[test]
    fn test_referrers() {
        let mut store = RowStore::with_defaults(&Config::default());
        store.row_mut(row(0)).logic_edge = Some(LogicEdge::new(LogicOperator::And, row(3)));
        store.row_mut(row(5)).logic_edge = Some(LogicEdge::new(LogicOperator::Or, row(3)));

        let referrers: Vec<_> = store.referrers(row(3)).collect();
        assert_eq!(referrers, vec![row(0), row(5)]);
        assert!(store.is_targeted_by_other(row(3), row(0)));
        assert!(!store.is_targeted_by_other(row(2), row(0)));
        assert_eq!(store.edge_count(), 2);
    }
}
