pub mod connection;

pub use connection::{connect_options, get_database_pool, load_root_ca, pool_with_options};
