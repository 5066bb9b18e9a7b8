//! Compile-and-run capability probing.
//!
//! A probe is a tiny C program built with the host compiler. Its exit
//! status (or whether it built at all) becomes a [`CapabilityFact`].
//!
//! [`CapabilityFact`]: crate::core::CapabilityFact

pub mod checks;
pub mod prober;

pub use checks::{run_standard_checks, sanitize};
pub use prober::Prober;
