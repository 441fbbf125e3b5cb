//! Maximum-adjacency ordering (MARA-MC and MARA-MMMF).
//!
//! Nodes are labelled 1..N starting at the destination by repeatedly taking
//! the unlabelled node with the most adjacency (or bandwidth) toward already
//! labelled nodes. Routing along strictly decreasing labels is loop free.

use std::collections::BTreeSet;

use tracing::{debug, trace};

use super::queue::PriorityQueue;
use super::{OrderingMetric, OrderingTable, PathTable, RouteComputeError};
use crate::graph::{Graph, NodeId};
use crate::model::context::RoutingContext;
use crate::model::routing::RouteTable;

#[derive(Debug)]
pub struct OrderingWorkspace {
    pub table: OrderingTable,
    pub queue: PriorityQueue<NodeId>,
}

impl OrderingWorkspace {
    pub fn new(node_count: usize) -> Self {
        Self {
            table: OrderingTable::new(OrderingMetric::Adjacency),
            queue: PriorityQueue::with_capacity(node_count),
        }
    }
}

/// Reverse shortest-path tree that constrains an ordering (MARA-SPE).
#[derive(Debug, Clone, Copy)]
pub struct TreeGate<'a> {
    pub tree: &'a PathTable,
    /// Zero-distance cycle id per node. A node never waits on a tree hop
    /// that shares its cycle.
    pub cycles: &'a [usize],
}

/// Labels every node that can reach `destination`.
///
/// With `gate` set, a node only becomes a candidate once all of its
/// shortest-path tree next hops carry a label (MARA-SPE).
pub fn compute_ordering(
    graph: &Graph,
    destination: NodeId,
    metric: OrderingMetric,
    gate: Option<&TreeGate<'_>>,
    table: &mut OrderingTable,
    queue: &mut PriorityQueue<NodeId>,
) {
    table.reset(graph.node_count(), destination, metric);
    queue.clear(table);
    if !graph.contains(destination) {
        return;
    }

    let seed = table.state_mut(destination);
    seed.adjacency = u32::MAX;
    seed.bandwidth = u64::MAX;
    queue.enqueue(destination, table);

    while let Some(candidate) = queue.dequeue(table) {
        if table.is_labeled(candidate) {
            continue;
        }
        table.assign_label(candidate);

        for link in graph.incoming(candidate) {
            let predecessor = link.from;
            if table.is_labeled(predecessor) {
                continue;
            }

            let state = table.state_mut(predecessor);
            state.adjacency = state.adjacency.saturating_add(1);
            state.bandwidth = state.bandwidth.saturating_add(link.bandwidth);

            if let Some(gate) = gate {
                if !tree_hops_labeled(gate, table, predecessor) {
                    continue;
                }
            }

            let heap_index = table.state(predecessor).heap_index;
            match heap_index {
                Some(index) => queue.update(index, table),
                None => queue.enqueue(predecessor, table),
            }
        }
    }
}

fn tree_hops_labeled(gate: &TreeGate<'_>, table: &OrderingTable, node: NodeId) -> bool {
    let own = gate.cycles.get(node);
    gate.tree
        .next_hops(node)
        .iter()
        .all(|hop| table.is_labeled(*hop) || gate.cycles.get(*hop) == own)
}

/// Next hops of `source` toward the table's destination: every successor
/// with a strictly smaller label. The destination routes to itself.
pub fn ordering_next_hops(
    graph: &Graph,
    table: &OrderingTable,
    source: NodeId,
) -> BTreeSet<NodeId> {
    let Some(label) = table.label(source) else {
        return BTreeSet::new();
    };
    if label == 1 {
        return BTreeSet::from([source]);
    }
    graph
        .outgoing(source)
        .map(|link| link.to)
        .filter(|next| table.label(*next).is_some_and(|theirs| theirs < label))
        .collect()
}

pub(crate) fn install_ordering(graph: &Graph, table: &OrderingTable, routes: &mut RouteTable) {
    let Some(destination) = table.destination() else {
        return;
    };
    for source in 0..graph.node_count() {
        routes.install(source, destination, ordering_next_hops(graph, table, source));
    }
    trace!(
        "ordering installed: destination={} labeled={}",
        destination,
        table.labeled_count()
    );
}

fn route_destination(
    ctx: &mut RoutingContext,
    destination: NodeId,
    metric: OrderingMetric,
) -> Result<(), RouteComputeError> {
    ctx.check_preconditions()?;
    ctx.graph().check_node(destination)?;
    debug!(
        "ma-ordering route: metric={:?} destination={} nodes={}",
        metric,
        destination,
        ctx.graph().node_count()
    );

    let (graph, _, working, routes) = ctx.split();
    let work = working
        .ordering
        .get_or_insert_with(|| OrderingWorkspace::new(graph.node_count()));
    compute_ordering(
        graph,
        destination,
        metric,
        None,
        &mut work.table,
        &mut work.queue,
    );
    install_ordering(graph, &work.table, routes);
    Ok(())
}

fn route_all(ctx: &mut RoutingContext, metric: OrderingMetric) -> Result<(), RouteComputeError> {
    ctx.check_preconditions()?;
    debug!(
        "ma-ordering route all: metric={:?} nodes={}",
        metric,
        ctx.graph().node_count()
    );

    let (graph, _, working, routes) = ctx.split();
    let work = working
        .ordering
        .get_or_insert_with(|| OrderingWorkspace::new(graph.node_count()));
    for destination in 0..graph.node_count() {
        compute_ordering(
            graph,
            destination,
            metric,
            None,
            &mut work.table,
            &mut work.queue,
        );
        install_ordering(graph, &work.table, routes);
    }
    Ok(())
}

pub fn mara_mc_route(
    ctx: &mut RoutingContext,
    destination: NodeId,
) -> Result<(), RouteComputeError> {
    route_destination(ctx, destination, OrderingMetric::Adjacency)
}

pub fn mara_mc_route_all(ctx: &mut RoutingContext) -> Result<(), RouteComputeError> {
    route_all(ctx, OrderingMetric::Adjacency)
}

pub fn mara_mmmf_route(
    ctx: &mut RoutingContext,
    destination: NodeId,
) -> Result<(), RouteComputeError> {
    route_destination(ctx, destination, OrderingMetric::Bandwidth)
}

pub fn mara_mmmf_route_all(ctx: &mut RoutingContext) -> Result<(), RouteComputeError> {
    route_all(ctx, OrderingMetric::Bandwidth)
}
