//! Package sources.
//!
//! Fetching toolkit packages from mirrors and unpacking them.

pub mod archive;
pub mod fetch;

pub use archive::{top_level_dir, ArchiveFormat, Unpacker};
pub use fetch::{artifact_url, Fetch, HttpFetcher, ProxySettings};
