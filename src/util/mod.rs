//! Shared utilities

pub mod config;
pub mod fs;
pub mod hash;
pub mod log;
pub mod process;
pub mod reporter;
pub mod shell;

pub use config::Config;
pub use reporter::{Reporter, TracingReporter};
pub use shell::Shell;
