use tracing::debug;

use super::ordering::{compute_ordering, install_ordering, OrderingWorkspace, TreeGate};
use super::queue::PriorityQueue;
use super::spf::compute_reverse_spf;
use super::{OrderingMetric, PathTable, RouteComputeError};
use crate::graph::{Graph, NodeId, Weight};
use crate::model::context::RoutingContext;
use crate::model::routing::RouteTable;

const UNVISITED: usize = usize::MAX;

/// Reverse shortest-path tree plus the ordering tables it constrains.
#[derive(Debug)]
pub struct SpeWorkspace {
    pub tree: PathTable,
    pub tree_queue: PriorityQueue<NodeId>,
    /// Zero-distance cycle id per node, see [`zero_distance_cycles`].
    pub cycles: Vec<usize>,
    pub ordering: OrderingWorkspace,
}

impl SpeWorkspace {
    pub fn new(node_count: usize) -> Self {
        Self {
            tree: PathTable::new(),
            tree_queue: PriorityQueue::with_capacity(node_count),
            cycles: Vec::with_capacity(node_count),
            ordering: OrderingWorkspace::new(node_count),
        }
    }
}

/// MA-ordering toward `destination` that never labels a node before the
/// nodes it reaches `destination` through on a shortest path.
pub fn compute_spe_ordering(
    graph: &Graph,
    weight: Option<&Weight>,
    destination: NodeId,
    work: &mut SpeWorkspace,
) {
    compute_reverse_spf(
        graph,
        weight,
        destination,
        &mut work.tree,
        &mut work.tree_queue,
    );
    zero_distance_cycles(&work.tree, &mut work.cycles);
    let gate = TreeGate {
        tree: &work.tree,
        cycles: &work.cycles,
    };
    compute_ordering(
        graph,
        destination,
        OrderingMetric::Adjacency,
        Some(&gate),
        &mut work.ordering.table,
        &mut work.ordering.queue,
    );
}

/// Strongly connected components of the tree restricted to equal-distance
/// hops, written as one id per node into `cycles`.
///
/// Equal-distance hops only exist across zero-cost links. Nodes sharing an id
/// wait on each other in the tree, so the ordering must not wait on those
/// hops. Every other node gets an id of its own.
pub(crate) fn zero_distance_cycles(tree: &PathTable, cycles: &mut Vec<usize>) {
    let node_count = tree.len();
    let successors: Vec<Vec<NodeId>> = (0..node_count)
        .map(|node| {
            let own = tree.metric(node);
            tree.next_hops(node)
                .iter()
                .copied()
                .filter(|hop| *hop != node && tree.metric(*hop) == own)
                .collect()
        })
        .collect();

    cycles.clear();
    cycles.resize(node_count, UNVISITED);
    let mut index = vec![UNVISITED; node_count];
    let mut low = vec![0usize; node_count];
    let mut on_stack = vec![false; node_count];
    let mut stack = Vec::new();
    let mut next_index = 0;
    let mut next_cycle = 0;

    for start in 0..node_count {
        if index[start] != UNVISITED {
            continue;
        }
        index[start] = next_index;
        low[start] = next_index;
        next_index += 1;
        stack.push(start);
        on_stack[start] = true;
        let mut frames = vec![(start, 0usize)];

        while let Some(frame) = frames.last_mut() {
            let node = frame.0;
            if let Some(&next) = successors[node].get(frame.1) {
                frame.1 += 1;
                if index[next] == UNVISITED {
                    index[next] = next_index;
                    low[next] = next_index;
                    next_index += 1;
                    stack.push(next);
                    on_stack[next] = true;
                    frames.push((next, 0));
                } else if on_stack[next] {
                    low[node] = low[node].min(index[next]);
                }
                continue;
            }

            frames.pop();
            if let Some(&(parent, _)) = frames.last() {
                low[parent] = low[parent].min(low[node]);
            }
            if low[node] == index[node] {
                while let Some(member) = stack.pop() {
                    on_stack[member] = false;
                    cycles[member] = next_cycle;
                    if member == node {
                        break;
                    }
                }
                next_cycle += 1;
            }
        }
    }
}

fn route_one(
    graph: &Graph,
    weight: Option<&Weight>,
    destination: NodeId,
    work: &mut SpeWorkspace,
    routes: &mut RouteTable,
) {
    compute_spe_ordering(graph, weight, destination, work);
    install_ordering(graph, &work.ordering.table, routes);
}

pub fn mara_spe_route(
    ctx: &mut RoutingContext,
    destination: NodeId,
) -> Result<(), RouteComputeError> {
    ctx.check_preconditions()?;
    ctx.graph().check_node(destination)?;
    debug!(
        "mara-spe route: destination={} nodes={}",
        destination,
        ctx.graph().node_count()
    );

    let (graph, weight, working, routes) = ctx.split();
    let work = working
        .spe
        .get_or_insert_with(|| SpeWorkspace::new(graph.node_count()));
    route_one(graph, weight, destination, work, routes);
    Ok(())
}

pub fn mara_spe_route_all(ctx: &mut RoutingContext) -> Result<(), RouteComputeError> {
    ctx.check_preconditions()?;
    debug!("mara-spe route all: nodes={}", ctx.graph().node_count());

    let (graph, weight, working, routes) = ctx.split();
    let work = working
        .spe
        .get_or_insert_with(|| SpeWorkspace::new(graph.node_count()));
    for destination in 0..graph.node_count() {
        route_one(graph, weight, destination, work, routes);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use proptest::prelude::*;

    use super::*;
    use crate::route_compute::ordering::ordering_next_hops;
    use crate::route_compute::ordering::tests::{acyclic, build, topology};

    fn spe(
        n: usize,
        links: &[(NodeId, NodeId, u32)],
        destination: NodeId,
    ) -> (Graph, SpeWorkspace) {
        let mut graph = Graph::with_nodes(n);
        for (from, to, _) in links {
            graph.add_link(*from, *to, 0).unwrap();
        }
        let costs = links.iter().map(|(_, _, cost)| *cost).collect();
        let weight = Weight::from_costs(&graph, costs).unwrap();
        let mut work = SpeWorkspace::new(n);
        compute_spe_ordering(&graph, Some(&weight), destination, &mut work);
        (graph, work)
    }

    #[test]
    fn direct_shortest_links_survive_the_ordering() {
        // Every node has a cost-1 link straight to 3; detours cost 9 or more.
        let mut graph = Graph::with_nodes(4);
        let links = [(0, 3), (1, 3), (2, 3), (0, 1), (1, 0), (2, 1), (0, 2)];
        for (from, to) in links {
            graph.add_link(from, to, 0).unwrap();
        }
        let weight = Weight::from_costs(&graph, vec![1, 1, 1, 9, 9, 9, 9]).unwrap();

        let mut ctx = RoutingContext::with_weight(graph, weight).unwrap();
        mara_spe_route(&mut ctx, 3).unwrap();
        for source in 0..3 {
            assert!(ctx.routes().next_hops(source, 3).contains(&3));
        }
        assert_eq!(ctx.routes().next_hops(3, 3), &BTreeSet::from([3]));
    }

    #[test]
    fn tree_constraint_delays_nodes_until_successors_are_labeled() {
        // Square 0-1-2-3 with chord 0-2. Cheap path 0 -> 1 -> 2; the chord
        // 0 -> 2 is expensive so 0 must wait for 1.
        let mut graph = Graph::with_nodes(4);
        let pairs = [(0, 1), (1, 2), (2, 3), (3, 0), (0, 2)];
        let mut costs = Vec::new();
        for (a, b) in pairs {
            graph.connect(a, b, 0).unwrap();
            let cost = if (a, b) == (0, 2) { 10 } else { 1 };
            costs.extend([cost, cost]);
        }
        let weight = Weight::from_costs(&graph, costs).unwrap();

        let mut work = SpeWorkspace::new(4);
        compute_spe_ordering(&graph, Some(&weight), 2, &mut work);
        let table = &work.ordering.table;
        assert_eq!(table.label(2), Some(1));
        assert!(table.label(1) < table.label(0));
        assert!(table.label(3) < table.label(0));
        assert_eq!(ordering_next_hops(&graph, table, 0), BTreeSet::from([1, 2, 3]));
    }

    #[test]
    fn zero_cost_tree_hop_is_waited_on() {
        let (graph, work) = spe(3, &[(0, 2, 1), (0, 1, 0), (1, 2, 1)], 2);

        assert_eq!(work.tree.next_hops(0), &BTreeSet::from([1, 2]));
        assert_ne!(work.cycles[0], work.cycles[1]);
        let table = &work.ordering.table;
        assert_eq!(table.label(2), Some(1));
        assert_eq!(table.label(1), Some(2));
        assert_eq!(table.label(0), Some(3));
        assert_eq!(ordering_next_hops(&graph, table, 0), BTreeSet::from([1, 2]));
    }

    #[test]
    fn zero_cost_cycle_is_labeled_without_waiting_forever() {
        let links = [(0, 1, 0), (1, 0, 0), (0, 2, 1), (1, 2, 1)];
        let (graph, work) = spe(3, &links, 2);

        assert_eq!(work.tree.next_hops(0), &BTreeSet::from([1, 2]));
        assert_eq!(work.tree.next_hops(1), &BTreeSet::from([0, 2]));
        assert_eq!(work.cycles[0], work.cycles[1]);
        assert_ne!(work.cycles[0], work.cycles[2]);

        let table = &work.ordering.table;
        assert_eq!(table.label(0), Some(2));
        assert_eq!(table.label(1), Some(3));
        assert_eq!(ordering_next_hops(&graph, table, 0), BTreeSet::from([2]));
        assert_eq!(ordering_next_hops(&graph, table, 1), BTreeSet::from([0, 2]));
    }

    fn weighted(n: usize, links: &[(usize, usize, u64)]) -> (Graph, Weight) {
        let graph = build(n, links);
        let costs = links.iter().map(|(_, _, b)| (*b % 7) as u32).collect();
        let weight = Weight::from_costs(&graph, costs).unwrap();
        (graph, weight)
    }

    proptest! {
        #[test]
        fn routing_graph_contains_the_shortest_path_tree((n, links) in topology()) {
            let (graph, weight) = weighted(n, &links);
            let mut work = SpeWorkspace::new(n);
            for destination in 0..n {
                compute_spe_ordering(&graph, Some(&weight), destination, &mut work);
                let mut edges = Vec::new();
                for source in (0..n).filter(|s| *s != destination) {
                    let hops = ordering_next_hops(&graph, &work.ordering.table, source);
                    prop_assert_eq!(
                        work.tree.metric(source).is_some(),
                        work.ordering.table.is_labeled(source)
                    );
                    for hop in work.tree.next_hops(source) {
                        if work.cycles[*hop] != work.cycles[source] {
                            prop_assert!(hops.contains(hop));
                        }
                    }
                    edges.extend(hops.into_iter().map(|hop| (source, hop)));
                }
                prop_assert!(acyclic(n, &edges));
            }
        }

        #[test]
        fn cycle_members_are_reached_at_equal_distance((n, links) in topology()) {
            let (graph, weight) = weighted(n, &links);
            let mut work = SpeWorkspace::new(n);
            for destination in 0..n {
                compute_spe_ordering(&graph, Some(&weight), destination, &mut work);
                for a in 0..n {
                    for b in (0..n).filter(|b| *b != a) {
                        if work.cycles[a] == work.cycles[b] {
                            prop_assert_ne!(a, destination);
                            prop_assert!(work.tree.metric(a).is_some());
                            prop_assert_eq!(work.tree.metric(a), work.tree.metric(b));
                        }
                    }
                }
            }
        }

        #[test]
        fn recomputation_is_idempotent((n, links) in topology()) {
            let (graph, weight) = weighted(n, &links);
            let mut ctx = RoutingContext::with_weight(graph, weight).unwrap();
            mara_spe_route_all(&mut ctx).unwrap();
            let first = ctx.routes().clone();
            mara_spe_route_all(&mut ctx).unwrap();
            prop_assert_eq!(ctx.routes(), &first);
        }
    }
}
