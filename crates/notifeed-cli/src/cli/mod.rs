pub mod commands;
pub mod config;
pub mod output;
pub mod tracing_setup;

pub use commands::{run_command, FeedCommand};
pub use config::ConfigOverrides;
