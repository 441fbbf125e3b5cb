use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use super::queue::QueueKeys;
use super::RouteComputeError;
use crate::graph::NodeId;

/// Per-node shortest-path bookkeeping for one SPF run.
#[derive(Debug, Clone, Default)]
pub struct PathState {
    pub metric: u64,
    pub reached: bool,
    pub next_hops: BTreeSet<NodeId>,
    pub heap_index: Option<usize>,
}

/// PathState for every node of the graph, indexed by node id.
#[derive(Debug, Clone, Default)]
pub struct PathTable {
    states: Vec<PathState>,
}

impl PathTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears every entry in place, resizing only when the node count changed.
    pub fn reset(&mut self, node_count: usize, root: NodeId) {
        self.states.resize_with(node_count, PathState::default);
        for state in &mut self.states {
            state.metric = 0;
            state.reached = false;
            state.next_hops.clear();
            state.heap_index = None;
        }
        if let Some(state) = self.states.get_mut(root) {
            state.reached = true;
            state.next_hops.insert(root);
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Shortest cost between the root and `node`, `None` when unreachable.
    pub fn metric(&self, node: NodeId) -> Option<u64> {
        self.states
            .get(node)
            .filter(|state| state.reached)
            .map(|state| state.metric)
    }

    pub fn next_hops(&self, node: NodeId) -> &BTreeSet<NodeId> {
        static EMPTY: BTreeSet<NodeId> = BTreeSet::new();
        self.states
            .get(node)
            .map(|state| &state.next_hops)
            .unwrap_or(&EMPTY)
    }

    pub(crate) fn state(&self, node: NodeId) -> &PathState {
        &self.states[node]
    }

    pub(crate) fn state_mut(&mut self, node: NodeId) -> &mut PathState {
        &mut self.states[node]
    }

    /// Returns `(from, into)` for two distinct nodes.
    pub(crate) fn pair_mut(&mut self, from: NodeId, into: NodeId) -> (&PathState, &mut PathState) {
        debug_assert_ne!(from, into);
        if from < into {
            let (head, tail) = self.states.split_at_mut(into);
            (&head[from], &mut tail[0])
        } else {
            let (head, tail) = self.states.split_at_mut(from);
            (&tail[0], &mut head[into])
        }
    }
}

impl QueueKeys<NodeId> for PathTable {
    fn compare(&self, a: &NodeId, b: &NodeId) -> Ordering {
        self.states[*a]
            .metric
            .cmp(&self.states[*b].metric)
            .then_with(|| a.cmp(b))
    }

    fn set_position(&mut self, item: &NodeId, position: Option<usize>) {
        self.states[*item].heap_index = position;
    }
}

/// Which accumulated quantity ranks candidates in a MA-ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderingMetric {
    /// Most links into already labeled nodes first (MARA-MC).
    Adjacency,
    /// Most bandwidth into already labeled nodes first (MARA-MMMF).
    Bandwidth,
}

#[derive(Debug, Clone, Default)]
pub struct OrderingState {
    pub label: Option<u32>,
    pub adjacency: u32,
    pub bandwidth: u64,
    pub heap_index: Option<usize>,
}

/// OrderingState for every node toward one destination.
#[derive(Debug, Clone)]
pub struct OrderingTable {
    metric: OrderingMetric,
    destination: Option<NodeId>,
    next_label: u32,
    states: Vec<OrderingState>,
}

impl OrderingTable {
    pub fn new(metric: OrderingMetric) -> Self {
        Self {
            metric,
            destination: None,
            next_label: 1,
            states: Vec::new(),
        }
    }

    pub fn reset(&mut self, node_count: usize, destination: NodeId, metric: OrderingMetric) {
        self.states.resize_with(node_count, OrderingState::default);
        for state in &mut self.states {
            *state = OrderingState::default();
        }
        self.metric = metric;
        self.destination = Some(destination);
        self.next_label = 1;
    }

    pub fn destination(&self) -> Option<NodeId> {
        self.destination
    }

    pub fn label(&self, node: NodeId) -> Option<u32> {
        self.states.get(node).and_then(|state| state.label)
    }

    pub fn is_labeled(&self, node: NodeId) -> bool {
        self.label(node).is_some()
    }

    /// Number of labels handed out so far.
    pub fn labeled_count(&self) -> u32 {
        self.next_label - 1
    }

    pub(crate) fn assign_label(&mut self, node: NodeId) -> u32 {
        let label = self.next_label;
        self.states[node].label = Some(label);
        self.next_label += 1;
        label
    }

    pub(crate) fn state(&self, node: NodeId) -> &OrderingState {
        &self.states[node]
    }

    pub(crate) fn state_mut(&mut self, node: NodeId) -> &mut OrderingState {
        &mut self.states[node]
    }
}

impl QueueKeys<NodeId> for OrderingTable {
    fn compare(&self, a: &NodeId, b: &NodeId) -> Ordering {
        let (sa, sb) = (&self.states[*a], &self.states[*b]);
        let primary = match self.metric {
            OrderingMetric::Adjacency => sb.adjacency.cmp(&sa.adjacency),
            OrderingMetric::Bandwidth => sb.bandwidth.cmp(&sa.bandwidth),
        };
        primary.then_with(|| a.cmp(b))
    }

    fn set_position(&mut self, item: &NodeId, position: Option<usize>) {
        self.states[*item].heap_index = position;
    }
}

/// Working-data families; each owns one reusable workspace in a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AlgorithmFamily {
    Spf,
    Lfi,
    Ordering,
    Spe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    Dijkstra,
    ReverseDijkstra,
    Lfi,
    MaraMc,
    MaraMmmf,
    MaraSpe,
}

impl Algorithm {
    pub const ALL: [Algorithm; 6] = [
        Algorithm::Dijkstra,
        Algorithm::ReverseDijkstra,
        Algorithm::Lfi,
        Algorithm::MaraMc,
        Algorithm::MaraMmmf,
        Algorithm::MaraSpe,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Dijkstra => "dijkstra",
            Algorithm::ReverseDijkstra => "reverse-dijkstra",
            Algorithm::Lfi => "lfi",
            Algorithm::MaraMc => "mara-mc",
            Algorithm::MaraMmmf => "mara-mmmf",
            Algorithm::MaraSpe => "mara-spe",
        }
    }

    pub fn family(self) -> AlgorithmFamily {
        match self {
            Algorithm::Dijkstra | Algorithm::ReverseDijkstra => AlgorithmFamily::Spf,
            Algorithm::Lfi => AlgorithmFamily::Lfi,
            Algorithm::MaraMc | Algorithm::MaraMmmf => AlgorithmFamily::Ordering,
            Algorithm::MaraSpe => AlgorithmFamily::Spe,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = RouteComputeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        match normalized.as_str() {
            "dijkstra" | "spf" => Ok(Algorithm::Dijkstra),
            "reverse-dijkstra" | "rspf" => Ok(Algorithm::ReverseDijkstra),
            "lfi" => Ok(Algorithm::Lfi),
            "mara-mc" | "mc" => Ok(Algorithm::MaraMc),
            "mara-mmmf" | "mmmf" => Ok(Algorithm::MaraMmmf),
            "mara-spe" | "spe" => Ok(Algorithm::MaraSpe),
            _ => Err(RouteComputeError::UnknownAlgorithm(s.to_string())),
        }
    }
}

/// Which (source, destination) cells one computation is responsible for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    All,
    Root(NodeId),
    Destination(NodeId),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::All => f.write_str("all"),
            Scope::Root(node) => write!(f, "root:{node}"),
            Scope::Destination(node) => write!(f, "destination:{node}"),
        }
    }
}

impl FromStr for Scope {
    type Err = RouteComputeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().to_lowercase();
        if trimmed == "all" {
            return Ok(Scope::All);
        }
        let (kind, node) = trimmed
            .split_once(':')
            .ok_or_else(|| RouteComputeError::InvalidScope(s.to_string()))?;
        let node = node
            .trim()
            .parse::<NodeId>()
            .map_err(|_| RouteComputeError::InvalidScope(s.to_string()))?;
        match kind.trim() {
            "root" | "source" => Ok(Scope::Root(node)),
            "destination" | "dest" => Ok(Scope::Destination(node)),
            _ => Err(RouteComputeError::InvalidScope(s.to_string())),
        }
    }
}
