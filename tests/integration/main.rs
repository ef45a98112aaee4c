//! Integration tests: the full scan pipeline against an in-memory
//! marketplace.

mod mock_api;
mod scan_pipeline;
