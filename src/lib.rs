pub mod graph;
pub mod model;
pub mod route_compute;
pub mod runtime;
