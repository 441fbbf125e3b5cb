pub mod context;
pub mod routing;
