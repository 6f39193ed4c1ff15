mod engine_config;
mod wire;

pub use engine_config::{SelectionMode, SonoConfig};
pub use wire::{ConfigurationResponse, WireConfiguration};
