pub mod settings;

pub use settings::{AppConfig, DatabaseConfig, ServerConfig, VolumeConfig};
