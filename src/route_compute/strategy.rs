use tracing::debug;

use super::{
    dijkstra_route, dijkstra_route_all, lfi_route, lfi_route_all, mara_mc_route,
    mara_mc_route_all, mara_mmmf_route, mara_mmmf_route_all, mara_spe_route, mara_spe_route_all,
    reverse_dijkstra_route, reverse_dijkstra_route_all, Algorithm, RouteComputeError, Scope,
};
use crate::model::context::RoutingContext;

/// Runs `algorithm` over `scope`, rewriting every cell it is responsible for.
///
/// Root-scoped algorithms (Dijkstra, LFI) accept [`Scope::Root`]; the
/// destination-scoped ones accept [`Scope::Destination`]. Every algorithm
/// accepts [`Scope::All`].
pub fn compute_routes(
    ctx: &mut RoutingContext,
    algorithm: Algorithm,
    scope: Scope,
) -> Result<(), RouteComputeError> {
    debug!("compute routes: algorithm={} scope={}", algorithm, scope);

    match (algorithm, scope) {
        (Algorithm::Dijkstra, Scope::Root(root)) => dijkstra_route(ctx, root),
        (Algorithm::Dijkstra, Scope::All) => dijkstra_route_all(ctx),
        (Algorithm::ReverseDijkstra, Scope::Destination(destination)) => {
            reverse_dijkstra_route(ctx, destination)
        }
        (Algorithm::ReverseDijkstra, Scope::All) => reverse_dijkstra_route_all(ctx),
        (Algorithm::Lfi, Scope::Root(root)) => lfi_route(ctx, root),
        (Algorithm::Lfi, Scope::All) => lfi_route_all(ctx),
        (Algorithm::MaraMc, Scope::Destination(destination)) => mara_mc_route(ctx, destination),
        (Algorithm::MaraMc, Scope::All) => mara_mc_route_all(ctx),
        (Algorithm::MaraMmmf, Scope::Destination(destination)) => {
            mara_mmmf_route(ctx, destination)
        }
        (Algorithm::MaraMmmf, Scope::All) => mara_mmmf_route_all(ctx),
        (Algorithm::MaraSpe, Scope::Destination(destination)) => mara_spe_route(ctx, destination),
        (Algorithm::MaraSpe, Scope::All) => mara_spe_route_all(ctx),
        (algorithm, scope) => Err(RouteComputeError::UnsupportedScope {
            algorithm: algorithm.name(),
            scope: scope.to_string(),
        }),
    }
}
