pub mod probes;

pub use probes::create_routes;
