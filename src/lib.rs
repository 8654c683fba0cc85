pub mod cli;
pub mod commands;
pub mod config;

pub use cli::{Cli, Commands};
pub use commands::{CommandError, run};
pub use config::AppConfig;
