//! High-level operations.
//!
//! This module contains the configure pipeline and the stages it runs.

pub mod acquire;
pub mod configure;
pub mod errors;
pub mod tools;

pub use acquire::{inspect_tree, Acquirer, Attempt, TreeLayout};
pub use configure::Pipeline;
pub use errors::ConfigureError;
pub use tools::{detect_tools, find_cc};
