mod error;
mod lfi;
mod ordering;
mod queue;
mod spe;
mod spf;
mod strategy;
mod types;

pub use error::RouteComputeError;
pub use lfi::{lfi_route, lfi_route_all, LfiWorkspace};
pub use ordering::{
    compute_ordering, mara_mc_route, mara_mc_route_all, mara_mmmf_route, mara_mmmf_route_all,
    ordering_next_hops, OrderingWorkspace, TreeGate,
};
pub use queue::{PriorityQueue, QueueKeys};
pub use spe::{compute_spe_ordering, mara_spe_route, mara_spe_route_all, SpeWorkspace};
pub use spf::{
    compute_reverse_spf, compute_spf, dijkstra_route, dijkstra_route_all,
    reverse_dijkstra_route, reverse_dijkstra_route_all, SpfWorkspace,
};
pub use strategy::compute_routes;
pub use types::{
    Algorithm, AlgorithmFamily, OrderingMetric, OrderingState, OrderingTable, PathState,
    PathTable, Scope,
};
