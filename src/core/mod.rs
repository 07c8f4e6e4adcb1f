//! Core functionality shared by the engine and the CLI.
//!
//! Configuration loading and duration handling.

mod config;
pub mod duration;

pub use config::{Config, EngineConfig, NodeConfig, LOCAL_CONFIG_FILE};
