pub mod dijkstra;
pub mod spf;

pub use dijkstra::{calculate_shortest_paths, ShortestPathTree};
pub use spf::{compute_routes, Omission, SpfOutcome};
