//! Core engine: realm resolution, item metadata, listing retrieval, and
//! the concurrent per-realm scan.

pub mod fetcher;
pub mod realms;
pub mod resolver;
pub mod scanner;
