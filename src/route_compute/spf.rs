use tracing::{debug, trace};

use super::queue::PriorityQueue;
use super::{PathTable, RouteComputeError};
use crate::graph::{Graph, Link, NodeId, Weight};
use crate::model::context::RoutingContext;
use crate::model::routing::RouteTable;

/// Reusable tables for the SPF family.
#[derive(Debug, Default)]
pub struct SpfWorkspace {
    pub table: PathTable,
    pub queue: PriorityQueue<NodeId>,
}

impl SpfWorkspace {
    pub fn new(node_count: usize) -> Self {
        Self {
            table: PathTable::new(),
            queue: PriorityQueue::with_capacity(node_count),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    /// Follow outgoing links; next hops are first hops from the root.
    Forward,
    /// Follow incoming links; next hops are one hop closer to the root.
    Reverse,
}

pub(crate) fn edge_cost(weight: Option<&Weight>, link: &Link) -> u64 {
    weight
        .and_then(|weight| weight.cost(link.id))
        .map(u64::from)
        .unwrap_or(1)
}

/// Shortest paths from `root` with equal-cost multipath next hops.
///
/// Without a weight every link costs 1. On return `table.metric(n)` is the
/// distance from `root` to `n` and `table.next_hops(n)` the set of root
/// neighbours that start a shortest path toward `n`.
pub fn compute_spf(
    graph: &Graph,
    weight: Option<&Weight>,
    root: NodeId,
    table: &mut PathTable,
    queue: &mut PriorityQueue<NodeId>,
) {
    run(graph, weight, root, table, queue, Direction::Forward);
}

/// Shortest-path tree toward `root`, walking incoming links.
///
/// `table.metric(n)` is the distance from `n` to `root`; `table.next_hops(n)`
/// holds every neighbour of `n` that lies on a shortest path toward `root`.
pub fn compute_reverse_spf(
    graph: &Graph,
    weight: Option<&Weight>,
    root: NodeId,
    table: &mut PathTable,
    queue: &mut PriorityQueue<NodeId>,
) {
    run(graph, weight, root, table, queue, Direction::Reverse);
}

fn run(
    graph: &Graph,
    weight: Option<&Weight>,
    root: NodeId,
    table: &mut PathTable,
    queue: &mut PriorityQueue<NodeId>,
    direction: Direction,
) {
    table.reset(graph.node_count(), root);
    queue.clear(table);
    if !graph.contains(root) {
        return;
    }
    queue.enqueue(root, table);

    while let Some(v) = queue.dequeue(table) {
        let base = table.state(v).metric;
        let Some(node) = graph.node(v) else {
            continue;
        };
        let link_ids = match direction {
            Direction::Forward => &node.outgoing,
            Direction::Reverse => &node.incoming,
        };

        for link in link_ids.iter().filter_map(|id| graph.link(*id)) {
            let c = match direction {
                Direction::Forward => link.to,
                Direction::Reverse => link.from,
            };
            if c == root || c == v {
                continue;
            }

            let candidate = base.saturating_add(edge_cost(weight, link));
            let current = table.state(c);
            if current.reached && current.metric < candidate {
                continue;
            }

            if current.reached && current.metric == candidate {
                let grew = merge_next_hops(table, root, v, c, direction);
                // A settled node that gained hops over a zero-cost link must
                // pass them on again.
                if grew && table.state(c).heap_index.is_none() {
                    queue.enqueue(c, table);
                }
                continue;
            }

            replace_next_hops(table, root, v, c, direction);
            let state = table.state_mut(c);
            state.metric = candidate;
            state.reached = true;
            let heap_index = state.heap_index;
            match heap_index {
                Some(index) => queue.update(index, table),
                None => queue.enqueue(c, table),
            }
        }
    }
}

fn replace_next_hops(
    table: &mut PathTable,
    root: NodeId,
    v: NodeId,
    c: NodeId,
    direction: Direction,
) {
    if direction == Direction::Reverse || v == root {
        let hops = &mut table.state_mut(c).next_hops;
        hops.clear();
        hops.insert(if direction == Direction::Reverse { v } else { c });
        return;
    }
    let (from, into) = table.pair_mut(v, c);
    into.next_hops.clone_from(&from.next_hops);
}

fn merge_next_hops(
    table: &mut PathTable,
    root: NodeId,
    v: NodeId,
    c: NodeId,
    direction: Direction,
) -> bool {
    if direction == Direction::Reverse {
        return table.state_mut(c).next_hops.insert(v);
    }
    if v == root {
        return table.state_mut(c).next_hops.insert(c);
    }
    let (from, into) = table.pair_mut(v, c);
    let before = into.next_hops.len();
    into.next_hops.extend(from.next_hops.iter().copied());
    into.next_hops.len() != before
}

/// Rewrites every `(root, *)` cell from a forward SPF rooted at `root`.
pub fn dijkstra_route(ctx: &mut RoutingContext, root: NodeId) -> Result<(), RouteComputeError> {
    ctx.check_preconditions()?;
    ctx.graph().check_node(root)?;
    debug!(
        "dijkstra route: root={} nodes={}",
        root,
        ctx.graph().node_count()
    );

    let (graph, weight, working, routes) = ctx.split();
    let work = working
        .spf
        .get_or_insert_with(|| SpfWorkspace::new(graph.node_count()));
    install_forward(graph, weight, root, work, routes);
    Ok(())
}

pub fn dijkstra_route_all(ctx: &mut RoutingContext) -> Result<(), RouteComputeError> {
    ctx.check_preconditions()?;
    debug!("dijkstra route all: nodes={}", ctx.graph().node_count());

    let (graph, weight, working, routes) = ctx.split();
    let work = working
        .spf
        .get_or_insert_with(|| SpfWorkspace::new(graph.node_count()));
    for root in 0..graph.node_count() {
        install_forward(graph, weight, root, work, routes);
    }
    Ok(())
}

/// Rewrites every `(*, destination)` cell from a reverse SPF toward
/// `destination`.
pub fn reverse_dijkstra_route(
    ctx: &mut RoutingContext,
    destination: NodeId,
) -> Result<(), RouteComputeError> {
    ctx.check_preconditions()?;
    ctx.graph().check_node(destination)?;
    debug!(
        "reverse dijkstra route: destination={} nodes={}",
        destination,
        ctx.graph().node_count()
    );

    let (graph, weight, working, routes) = ctx.split();
    let work = working
        .spf
        .get_or_insert_with(|| SpfWorkspace::new(graph.node_count()));
    install_reverse(graph, weight, destination, work, routes);
    Ok(())
}

pub fn reverse_dijkstra_route_all(ctx: &mut RoutingContext) -> Result<(), RouteComputeError> {
    ctx.check_preconditions()?;
    debug!(
        "reverse dijkstra route all: nodes={}",
        ctx.graph().node_count()
    );

    let (graph, weight, working, routes) = ctx.split();
    let work = working
        .spf
        .get_or_insert_with(|| SpfWorkspace::new(graph.node_count()));
    for destination in 0..graph.node_count() {
        install_reverse(graph, weight, destination, work, routes);
    }
    Ok(())
}

fn install_forward(
    graph: &Graph,
    weight: Option<&Weight>,
    root: NodeId,
    work: &mut SpfWorkspace,
    routes: &mut RouteTable,
) {
    compute_spf(graph, weight, root, &mut work.table, &mut work.queue);
    trace!("spf settled: root={}", root);
    for destination in 0..graph.node_count() {
        routes.install(
            root,
            destination,
            work.table.next_hops(destination).iter().copied(),
        );
    }
}

fn install_reverse(
    graph: &Graph,
    weight: Option<&Weight>,
    destination: NodeId,
    work: &mut SpfWorkspace,
    routes: &mut RouteTable,
) {
    compute_reverse_spf(graph, weight, destination, &mut work.table, &mut work.queue);
    trace!("reverse spf settled: destination={}", destination);
    for source in 0..graph.node_count() {
        routes.install(
            source,
            destination,
            work.table.next_hops(source).iter().copied(),
        );
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use proptest::prelude::*;

    use super::*;

    fn ring(n: usize) -> Graph {
        let mut graph = Graph::with_nodes(n);
        for node in 0..n {
            graph.connect(node, (node + 1) % n, 0).unwrap();
        }
        graph
    }

    fn forward(graph: &Graph, weight: Option<&Weight>, root: NodeId) -> PathTable {
        let mut table = PathTable::new();
        let mut queue = PriorityQueue::new();
        compute_spf(graph, weight, root, &mut table, &mut queue);
        table
    }

    fn reverse(graph: &Graph, weight: Option<&Weight>, root: NodeId) -> PathTable {
        let mut table = PathTable::new();
        let mut queue = PriorityQueue::new();
        compute_reverse_spf(graph, weight, root, &mut table, &mut queue);
        table
    }

    #[test]
    fn ring_of_four_has_two_equal_cost_first_hops() {
        let graph = ring(4);
        let table = forward(&graph, None, 0);

        assert_eq!(table.metric(2), Some(2));
        assert_eq!(table.next_hops(2), &BTreeSet::from([1, 3]));
        assert_eq!(table.next_hops(1), &BTreeSet::from([1]));
        assert_eq!(table.next_hops(0), &BTreeSet::from([0]));
    }

    #[test]
    fn weighted_links_pick_the_cheaper_branch() {
        let mut graph = Graph::with_nodes(4);
        graph.add_link(0, 1, 0).unwrap();
        graph.add_link(0, 2, 0).unwrap();
        graph.add_link(1, 3, 0).unwrap();
        graph.add_link(2, 3, 0).unwrap();
        let weight = Weight::from_costs(&graph, vec![1, 1, 5, 1]).unwrap();

        let table = forward(&graph, Some(&weight), 0);
        assert_eq!(table.metric(3), Some(2));
        assert_eq!(table.next_hops(3), &BTreeSet::from([2]));
    }

    #[test]
    fn unreachable_nodes_have_no_metric_or_hops() {
        let mut graph = Graph::with_nodes(3);
        graph.add_link(0, 1, 0).unwrap();
        graph.add_link(2, 0, 0).unwrap();

        let table = forward(&graph, None, 0);
        assert_eq!(table.metric(2), None);
        assert!(table.next_hops(2).is_empty());
    }

    #[test]
    fn zero_cost_links_are_not_mistaken_for_unvisited() {
        let mut graph = Graph::with_nodes(4);
        graph.add_link(0, 1, 0).unwrap();
        graph.add_link(1, 2, 0).unwrap();
        graph.add_link(0, 3, 0).unwrap();
        graph.add_link(3, 2, 0).unwrap();
        let weight = Weight::from_costs(&graph, vec![0, 0, 0, 5]).unwrap();

        let table = forward(&graph, Some(&weight), 0);
        assert_eq!(table.metric(1), Some(0));
        assert_eq!(table.metric(2), Some(0));
        assert_eq!(table.next_hops(2), &BTreeSet::from([1]));
    }

    #[test]
    fn zero_cost_equal_paths_propagate_after_settling() {
        let mut graph = Graph::with_nodes(4);
        graph.add_link(0, 1, 0).unwrap();
        graph.add_link(0, 2, 0).unwrap();
        graph.add_link(2, 1, 0).unwrap();
        graph.add_link(1, 3, 0).unwrap();
        let weight = Weight::from_costs(&graph, vec![1, 1, 0, 1]).unwrap();

        let table = forward(&graph, Some(&weight), 0);
        assert_eq!(table.metric(1), Some(1));
        assert_eq!(table.next_hops(1), &BTreeSet::from([1, 2]));
        assert_eq!(table.metric(3), Some(2));
        assert_eq!(table.next_hops(3), &BTreeSet::from([1, 2]));
    }

    #[test]
    fn zero_cost_detour_through_root_is_not_a_first_hop() {
        let mut graph = Graph::with_nodes(3);
        graph.add_link(0, 1, 0).unwrap();
        graph.add_link(1, 0, 0).unwrap();
        graph.add_link(0, 2, 0).unwrap();
        let weight = Weight::from_costs(&graph, vec![0, 0, 1]).unwrap();

        let table = forward(&graph, Some(&weight), 0);
        assert_eq!(table.metric(1), Some(0));
        assert_eq!(table.metric(2), Some(1));
        assert_eq!(table.next_hops(2), &BTreeSet::from([2]));
    }

    #[test]
    fn reverse_spf_on_directed_path_points_downstream() {
        let mut graph = Graph::with_nodes(3);
        graph.add_link(0, 1, 0).unwrap();
        graph.add_link(1, 2, 0).unwrap();

        let table = reverse(&graph, None, 2);
        assert_eq!(table.metric(0), Some(2));
        assert_eq!(table.next_hops(0), &BTreeSet::from([1]));
        assert_eq!(table.next_hops(1), &BTreeSet::from([2]));
        assert_eq!(table.next_hops(2), &BTreeSet::from([2]));
    }

    #[test]
    fn dijkstra_route_rewrites_cells_for_root() {
        let mut ctx = RoutingContext::new(ring(4));
        dijkstra_route(&mut ctx, 0).unwrap();
        assert_eq!(ctx.routes().next_hops(0, 2), &BTreeSet::from([1, 3]));
        assert_eq!(ctx.routes().next_hops(0, 0), &BTreeSet::from([0]));
        assert!(ctx.routes().next_hops(1, 3).is_empty());

        assert!(matches!(
            dijkstra_route(&mut ctx, 9),
            Err(RouteComputeError::UnknownNode { node: 9, .. })
        ));
    }

    #[test]
    fn reverse_route_matches_forward_route_for_every_pair() {
        let mut graph = ring(5);
        graph.add_link(0, 2, 0).unwrap();
        graph.add_link(3, 1, 0).unwrap();

        let mut forward_ctx = RoutingContext::new(graph);
        dijkstra_route_all(&mut forward_ctx).unwrap();
        let snapshot = forward_ctx.routes().clone();

        reverse_dijkstra_route_all(&mut forward_ctx).unwrap();
        assert_eq!(forward_ctx.routes(), &snapshot);
    }

    /// Reference distances from `root`, optionally never entering `avoid`.
    fn bellman_ford(
        graph: &Graph,
        weight: &Weight,
        root: NodeId,
        avoid: Option<NodeId>,
    ) -> Vec<Option<u64>> {
        let mut dist = vec![None; graph.node_count()];
        dist[root] = Some(0);
        for _ in 0..graph.node_count() {
            for link in graph.links().filter(|link| Some(link.to) != avoid) {
                let Some(base) = dist[link.from] else {
                    continue;
                };
                let candidate = base + u64::from(weight.cost(link.id).unwrap());
                if dist[link.to].map_or(true, |best| candidate < best) {
                    dist[link.to] = Some(candidate);
                }
            }
        }
        dist
    }

    fn topology() -> impl Strategy<Value = (usize, Vec<(usize, usize, u32)>)> {
        (2usize..9).prop_flat_map(|n| {
            let link = (0..n, 0..n, 0u32..6);
            (Just(n), prop::collection::vec(link, 0..(n * 3)))
        })
    }

    fn build(n: usize, links: &[(usize, usize, u32)]) -> (Graph, Weight) {
        let mut graph = Graph::with_nodes(n);
        let mut costs = Vec::new();
        for (from, to, cost) in links {
            graph.add_link(*from, *to, 0).unwrap();
            costs.push(*cost);
        }
        let weight = Weight::from_costs(&graph, costs).unwrap();
        (graph, weight)
    }

    proptest! {
        #[test]
        fn forward_metrics_match_reference_distances((n, links) in topology()) {
            let (graph, weight) = build(n, &links);
            for root in 0..n {
                let table = forward(&graph, Some(&weight), root);
                let expected = bellman_ford(&graph, &weight, root, None);
                for node in 0..n {
                    prop_assert_eq!(table.metric(node), expected[node]);
                }
            }
        }

        #[test]
        fn first_hops_are_exactly_the_shortest_path_neighbours((n, links) in topology()) {
            let (graph, weight) = build(n, &links);
            for root in 0..n {
                let table = forward(&graph, Some(&weight), root);
                let total = bellman_ford(&graph, &weight, root, None);
                // Shortest paths never pass through their own root again.
                let rest: Vec<Vec<Option<u64>>> = (0..n)
                    .map(|start| bellman_ford(&graph, &weight, start, Some(root)))
                    .collect();
                for target in (0..n).filter(|t| *t != root) {
                    let mut expected = BTreeSet::new();
                    if let Some(total) = total[target] {
                        for link in graph.outgoing(root).filter(|l| l.to != root) {
                            let via = rest[link.to][target]
                                .map(|rest| u64::from(weight.cost(link.id).unwrap()) + rest);
                            if via == Some(total) {
                                expected.insert(link.to);
                            }
                        }
                    }
                    prop_assert_eq!(table.next_hops(target), &expected);
                }
            }
        }

        #[test]
        fn reverse_metrics_are_dual_to_forward((n, links) in topology()) {
            let (graph, weight) = build(n, &links);
            for destination in 0..n {
                let tree = reverse(&graph, Some(&weight), destination);
                for source in 0..n {
                    let table = forward(&graph, Some(&weight), source);
                    prop_assert_eq!(tree.metric(source), table.metric(destination));
                }
            }
        }
    }
}
