//! Topology arena shared by every route computation.
//!
//! Nodes and links are addressed by dense integer ids that double as array
//! indices; every cross reference (link endpoints, per-node adjacency lists)
//! is stored as an id into the owning [`Graph`].

use std::sync::atomic::{AtomicU64, Ordering};

use crate::route_compute::RouteComputeError;

pub type NodeId = usize;
pub type LinkId = usize;

static NEXT_GRAPH_TAG: AtomicU64 = AtomicU64::new(1);

/// Identity of one [`Graph`] instance, used to bind a [`Weight`] to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GraphTag(u64);

impl GraphTag {
    fn fresh() -> Self {
        Self(NEXT_GRAPH_TAG.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub outgoing: Vec<LinkId>,
    pub incoming: Vec<LinkId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    pub id: LinkId,
    pub from: NodeId,
    pub to: NodeId,
    /// Zero when unknown.
    pub bandwidth: u64,
}

#[derive(Debug)]
pub struct Graph {
    tag: GraphTag,
    nodes: Vec<Node>,
    links: Vec<Link>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    pub fn new() -> Self {
        Self {
            tag: GraphTag::fresh(),
            nodes: Vec::new(),
            links: Vec::new(),
        }
    }

    pub fn with_nodes(count: usize) -> Self {
        let mut graph = Self::new();
        for _ in 0..count {
            graph.add_node();
        }
        graph
    }

    pub fn tag(&self) -> GraphTag {
        self.tag
    }

    pub fn add_node(&mut self) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node {
            id,
            outgoing: Vec::new(),
            incoming: Vec::new(),
        });
        id
    }

    pub fn add_link(
        &mut self,
        from: NodeId,
        to: NodeId,
        bandwidth: u64,
    ) -> Result<LinkId, RouteComputeError> {
        self.check_node(from)?;
        self.check_node(to)?;

        let id = self.links.len();
        self.links.push(Link {
            id,
            from,
            to,
            bandwidth,
        });
        self.nodes[from].outgoing.push(id);
        self.nodes[to].incoming.push(id);
        Ok(id)
    }

    /// Adds `a -> b` and `b -> a` with the same bandwidth.
    pub fn connect(
        &mut self,
        a: NodeId,
        b: NodeId,
        bandwidth: u64,
    ) -> Result<(LinkId, LinkId), RouteComputeError> {
        let forward = self.add_link(a, b, bandwidth)?;
        let backward = self.add_link(b, a, bandwidth)?;
        Ok((forward, backward))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id < self.nodes.len()
    }

    pub fn check_node(&self, id: NodeId) -> Result<(), RouteComputeError> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(RouteComputeError::UnknownNode {
                node: id,
                node_count: self.nodes.len(),
            })
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(id)
    }

    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.iter()
    }

    /// Links leaving `id`, in insertion order. Empty for unknown ids.
    pub fn outgoing(&self, id: NodeId) -> impl Iterator<Item = &Link> {
        self.nodes
            .get(id)
            .map(|node| node.outgoing.as_slice())
            .unwrap_or_default()
            .iter()
            .map(|link| &self.links[*link])
    }

    /// Links entering `id`, in insertion order. Empty for unknown ids.
    pub fn incoming(&self, id: NodeId) -> impl Iterator<Item = &Link> {
        self.nodes
            .get(id)
            .map(|node| node.incoming.as_slice())
            .unwrap_or_default()
            .iter()
            .map(|link| &self.links[*link])
    }
}

/// Per-link integer costs computed for one particular [`Graph`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Weight {
    graph: GraphTag,
    costs: Vec<u32>,
}

impl Weight {
    pub fn uniform(graph: &Graph, cost: u32) -> Self {
        Self {
            graph: graph.tag(),
            costs: vec![cost; graph.link_count()],
        }
    }

    pub fn from_costs(graph: &Graph, costs: Vec<u32>) -> Result<Self, RouteComputeError> {
        if costs.len() != graph.link_count() {
            return Err(RouteComputeError::WeightSizeMismatch {
                weights: costs.len(),
                links: graph.link_count(),
            });
        }
        Ok(Self {
            graph: graph.tag(),
            costs,
        })
    }

    /// Reference-bandwidth costing: `reference / bandwidth`, at least 1.
    /// Links with unknown bandwidth cost `reference`.
    pub fn inverse_bandwidth(graph: &Graph, reference: u64) -> Self {
        let costs = graph
            .links()
            .map(|link| {
                let raw = if link.bandwidth == 0 {
                    reference
                } else {
                    reference / link.bandwidth
                };
                u32::try_from(raw.max(1)).unwrap_or(u32::MAX)
            })
            .collect();
        Self {
            graph: graph.tag(),
            costs,
        }
    }

    pub fn is_bound_to(&self, graph: &Graph) -> bool {
        self.graph == graph.tag()
    }

    pub fn cost(&self, link: LinkId) -> Option<u32> {
        self.costs.get(link).copied()
    }

    pub fn set(&mut self, link: LinkId, cost: u32) -> Result<(), RouteComputeError> {
        let links = self.costs.len();
        let slot = self
            .costs
            .get_mut(link)
            .ok_or(RouteComputeError::UnknownLink { link, links })?;
        *slot = cost;
        Ok(())
    }

    /// Verifies this weight was computed for `graph` and covers all its links.
    pub fn check_bound(&self, graph: &Graph) -> Result<(), RouteComputeError> {
        if !self.is_bound_to(graph) {
            return Err(RouteComputeError::WeightGraphMismatch);
        }
        if self.costs.len() != graph.link_count() {
            return Err(RouteComputeError::WeightSizeMismatch {
                weights: self.costs.len(),
                links: graph.link_count(),
            });
        }
        Ok(())
    }
}
