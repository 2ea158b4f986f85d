pub mod cli;
pub mod client;
pub mod error;
pub mod models;
pub mod server;
pub mod services;
pub mod tools;
pub mod utils;

#[cfg(test)]
mod testing;

pub use cli::{Cli, Commands};
pub use error::AppError;
pub use models::{Config, OutputFormat};
pub use tools::{SongTools, ToolCall, ToolResponse};
