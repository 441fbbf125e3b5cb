use crate::graph::{LinkId, NodeId};

/// Precondition failures reported by the route computation entry points.
#[derive(Debug, thiserror::Error)]
pub enum RouteComputeError {
    #[error("unknown node {node} (graph has {node_count} nodes)")]
    UnknownNode { node: NodeId, node_count: usize },

    #[error("unknown link {link} (weight covers {links} links)")]
    UnknownLink { link: LinkId, links: usize },

    #[error("weight was computed for a different graph")]
    WeightGraphMismatch,

    #[error("weight has {weights} entries but the graph has {links} links")]
    WeightSizeMismatch { weights: usize, links: usize },

    #[error("{algorithm} does not support {scope} scope")]
    UnsupportedScope {
        algorithm: &'static str,
        scope: String,
    },

    #[error("unknown algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("invalid scope: {0}")]
    InvalidScope(String),
}
