use std::collections::BTreeSet;

use serde::Serialize;

use crate::graph::NodeId;

/// Square `(source, destination) -> next hops` table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteTable {
    size: usize,
    cells: Vec<BTreeSet<NodeId>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RouteTableSummary {
    pub pairs: usize,
    pub reachable: usize,
    pub total_next_hops: usize,
    pub mean_next_hops: f64,
    pub max_next_hops: usize,
}

impl RouteTable {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![BTreeSet::new(); size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Drops every entry and resizes to `size` x `size`.
    pub fn reset(&mut self, size: usize) {
        self.cells.clear();
        self.cells.resize(size * size, BTreeSet::new());
        self.size = size;
    }

    pub fn next_hops(&self, source: NodeId, destination: NodeId) -> &BTreeSet<NodeId> {
        static EMPTY: BTreeSet<NodeId> = BTreeSet::new();
        self.index(source, destination)
            .map(|index| &self.cells[index])
            .unwrap_or(&EMPTY)
    }

    /// Replaces the cell for `(source, destination)` with `next_hops`.
    pub fn install<I>(&mut self, source: NodeId, destination: NodeId, next_hops: I)
    where
        I: IntoIterator<Item = NodeId>,
    {
        let cell = self.cell_mut(source, destination);
        cell.clear();
        cell.extend(next_hops);
    }

    /// Adds one next hop to an already installed cell.
    pub fn add_next_hop(&mut self, source: NodeId, destination: NodeId, next_hop: NodeId) {
        self.cell_mut(source, destination).insert(next_hop);
    }

    pub fn clear(&mut self, source: NodeId, destination: NodeId) {
        self.cell_mut(source, destination).clear();
    }

    /// Non-empty cells in (source, destination) order.
    pub fn pairs(&self) -> impl Iterator<Item = (NodeId, NodeId, &BTreeSet<NodeId>)> {
        let size = self.size;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, hops)| !hops.is_empty())
            .map(move |(index, hops)| (index / size, index % size, hops))
    }

    /// Counts over off-diagonal pairs; the diagonal always routes to itself.
    pub fn summary(&self) -> RouteTableSummary {
        let pairs = self.size * self.size.saturating_sub(1);
        let mut reachable = 0;
        let mut total_next_hops = 0;
        let mut max_next_hops = 0;
        for (source, destination, hops) in self.pairs() {
            if source == destination {
                continue;
            }
            reachable += 1;
            total_next_hops += hops.len();
            max_next_hops = max_next_hops.max(hops.len());
        }
        RouteTableSummary {
            pairs,
            reachable,
            total_next_hops,
            mean_next_hops: if reachable == 0 {
                0.0
            } else {
                total_next_hops as f64 / reachable as f64
            },
            max_next_hops,
        }
    }

    fn index(&self, source: NodeId, destination: NodeId) -> Option<usize> {
        (source < self.size && destination < self.size).then(|| source * self.size + destination)
    }

    fn cell_mut(&mut self, source: NodeId, destination: NodeId) -> &mut BTreeSet<NodeId> {
        assert!(
            source < self.size && destination < self.size,
            "route cell ({source}, {destination}) outside {0}x{0} table",
            self.size
        );
        &mut self.cells[source * self.size + destination]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_replaces_previous_cell_content() {
        let mut table = RouteTable::new(3);
        table.install(0, 2, [1, 2]);
        table.install(0, 2, [1, 1]);
        assert_eq!(table.next_hops(0, 2), &BTreeSet::from([1]));

        table.add_next_hop(0, 2, 2);
        assert_eq!(table.next_hops(0, 2), &BTreeSet::from([1, 2]));

        table.clear(0, 2);
        assert!(table.next_hops(0, 2).is_empty());
        assert!(table.next_hops(5, 0).is_empty());
    }

    #[test]
    fn summary_ignores_the_diagonal() {
        let mut table = RouteTable::new(3);
        table.install(0, 0, [0]);
        table.install(0, 1, [1]);
        table.install(0, 2, [1, 2]);
        table.install(2, 1, [1]);

        let summary = table.summary();
        assert_eq!(summary.pairs, 6);
        assert_eq!(summary.reachable, 3);
        assert_eq!(summary.total_next_hops, 4);
        assert_eq!(summary.max_next_hops, 2);

        let listed: Vec<(NodeId, NodeId)> = table.pairs().map(|(s, t, _)| (s, t)).collect();
        assert_eq!(listed, vec![(0, 0), (0, 1), (0, 2), (2, 1)]);
    }

    #[test]
    fn reset_resizes_and_clears() {
        let mut table = RouteTable::new(2);
        table.install(1, 0, [0]);
        table.reset(4);
        assert_eq!(table.size(), 4);
        assert_eq!(table.pairs().count(), 0);
    }
}
