use std::collections::BTreeSet;

use tracing::{debug, trace};

use super::queue::PriorityQueue;
use super::spf::compute_spf;
use super::{PathTable, RouteComputeError};
use crate::graph::{Graph, NodeId};
use crate::model::context::RoutingContext;
use crate::model::routing::RouteTable;

/// One forward SPF table per node plus a shared queue.
#[derive(Debug, Default)]
pub struct LfiWorkspace {
    pub tables: Vec<PathTable>,
    pub queue: PriorityQueue<NodeId>,
}

impl LfiWorkspace {
    pub fn new(node_count: usize) -> Self {
        let mut work = Self::default();
        work.ensure(node_count);
        work
    }

    fn ensure(&mut self, node_count: usize) {
        self.tables.resize_with(node_count, PathTable::new);
    }
}

fn neighbors_of(graph: &Graph, source: NodeId) -> BTreeSet<NodeId> {
    graph
        .outgoing(source)
        .map(|link| link.to)
        .filter(|neighbor| *neighbor != source)
        .collect()
}

/// Shortest-path next hops for `(source, *)` extended with every neighbour
/// strictly closer to the destination than `source` itself.
pub fn lfi_route(ctx: &mut RoutingContext, source: NodeId) -> Result<(), RouteComputeError> {
    ctx.check_preconditions()?;
    ctx.graph().check_node(source)?;

    let (graph, weight, working, routes) = ctx.split();
    let work = working
        .lfi
        .get_or_insert_with(|| LfiWorkspace::new(graph.node_count()));
    work.ensure(graph.node_count());

    let neighbors = neighbors_of(graph, source);
    debug!(
        "lfi route: source={} neighbors={:?} nodes={}",
        source,
        neighbors,
        graph.node_count()
    );

    compute_spf(
        graph,
        weight,
        source,
        &mut work.tables[source],
        &mut work.queue,
    );
    for neighbor in &neighbors {
        compute_spf(
            graph,
            weight,
            *neighbor,
            &mut work.tables[*neighbor],
            &mut work.queue,
        );
    }
    install(graph, &work.tables, source, &neighbors, routes);
    Ok(())
}

/// Runs [`lfi_route`] for every node, computing each SPF table once and
/// sharing it between its own row and its neighbours' rows.
pub fn lfi_route_all(ctx: &mut RoutingContext) -> Result<(), RouteComputeError> {
    ctx.check_preconditions()?;
    debug!("lfi route all: nodes={}", ctx.graph().node_count());

    let (graph, weight, working, routes) = ctx.split();
    let work = working
        .lfi
        .get_or_insert_with(|| LfiWorkspace::new(graph.node_count()));
    work.ensure(graph.node_count());

    for root in 0..graph.node_count() {
        compute_spf(graph, weight, root, &mut work.tables[root], &mut work.queue);
    }
    for source in 0..graph.node_count() {
        let neighbors = neighbors_of(graph, source);
        install(graph, &work.tables, source, &neighbors, routes);
    }
    Ok(())
}

fn install(
    graph: &Graph,
    tables: &[PathTable],
    source: NodeId,
    neighbors: &BTreeSet<NodeId>,
    routes: &mut RouteTable,
) {
    let own = &tables[source];
    let mut alternates = 0usize;

    for destination in 0..graph.node_count() {
        let primary = own.next_hops(destination);
        routes.install(source, destination, primary.iter().copied());
        if primary.is_empty() {
            continue;
        }
        let Some(own_metric) = own.metric(destination) else {
            continue;
        };

        for neighbor in neighbors {
            let table = &tables[*neighbor];
            if table.next_hops(destination).is_empty() {
                continue;
            }
            let closer = table
                .metric(destination)
                .is_some_and(|metric| metric < own_metric);
            if closer && !primary.contains(neighbor) {
                routes.add_next_hop(source, destination, *neighbor);
                alternates += 1;
            }
        }
    }
    trace!("lfi installed: source={} alternates={}", source, alternates);
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::graph::Weight;
    use crate::route_compute::dijkstra_route_all;

    fn build(n: usize, links: &[(NodeId, NodeId, u32)], bidirectional: bool) -> RoutingContext {
        let mut graph = Graph::with_nodes(n);
        let mut costs = Vec::new();
        for (from, to, cost) in links {
            graph.add_link(*from, *to, 0).unwrap();
            costs.push(*cost);
            if bidirectional {
                graph.add_link(*to, *from, 0).unwrap();
                costs.push(*cost);
            }
        }
        let weight = Weight::from_costs(&graph, costs).unwrap();
        RoutingContext::with_weight(graph, weight).unwrap()
    }

    #[test]
    fn directed_path_keeps_the_only_neighbour() {
        let mut ctx = build(3, &[(0, 1, 1), (1, 2, 1)], false);
        lfi_route(&mut ctx, 0).unwrap();
        assert_eq!(ctx.routes().next_hops(0, 2), &BTreeSet::from([1]));
        assert_eq!(ctx.routes().next_hops(0, 0), &BTreeSet::from([0]));
    }

    #[test]
    fn downstream_neighbour_becomes_alternate() {
        let mut ctx = build(4, &[(0, 1, 2), (1, 3, 2), (0, 2, 3), (2, 3, 2)], true);
        lfi_route(&mut ctx, 0).unwrap();

        assert_eq!(ctx.routes().next_hops(0, 3), &BTreeSet::from([1, 2]));
        assert_eq!(ctx.routes().next_hops(0, 1), &BTreeSet::from([1]));
        assert_eq!(ctx.routes().next_hops(0, 2), &BTreeSet::from([2]));
    }

    #[test]
    fn unreachable_destination_stays_empty() {
        let mut ctx = build(3, &[(0, 1, 1), (2, 0, 1)], false);
        lfi_route(&mut ctx, 0).unwrap();
        assert!(ctx.routes().next_hops(0, 2).is_empty());
    }

    fn topology() -> impl Strategy<Value = (usize, Vec<(usize, usize, u32)>)> {
        (2usize..8).prop_flat_map(|n| {
            let link = (0..n, 0..n, 0u32..5);
            (Just(n), prop::collection::vec(link, 0..(n * 3)))
        })
    }

    proptest! {
        #[test]
        fn alternates_are_strictly_closer((n, links) in topology()) {
            let mut ctx = build(n, &links, false);
            lfi_route_all(&mut ctx).unwrap();
            let lfi = ctx.routes().clone();

            dijkstra_route_all(&mut ctx).unwrap();
            let spf = ctx.routes().clone();

            let mut tables = Vec::new();
            for root in 0..n {
                let mut table = PathTable::new();
                let mut queue = PriorityQueue::new();
                compute_spf(ctx.graph(), ctx.weight(), root, &mut table, &mut queue);
                tables.push(table);
            }

            for source in 0..n {
                for destination in (0..n).filter(|d| *d != source) {
                    let hops = lfi.next_hops(source, destination);
                    let primary = spf.next_hops(source, destination);
                    prop_assert!(primary.is_subset(hops));
                    for hop in hops {
                        let own = tables[source].metric(destination).unwrap();
                        let theirs = tables[*hop].metric(destination).unwrap();
                        if primary.contains(hop) {
                            // Zero-cost first links leave the primary hop level.
                            prop_assert!(theirs <= own);
                        } else {
                            prop_assert!(theirs < own);
                        }
                    }
                }
            }
        }

        #[test]
        fn single_root_matches_all_roots((n, links) in topology()) {
            let mut all = build(n, &links, false);
            lfi_route_all(&mut all).unwrap();

            let mut single = build(n, &links, false);
            for source in 0..n {
                lfi_route(&mut single, source).unwrap();
            }
            prop_assert_eq!(all.routes(), single.routes());
        }
    }
}
