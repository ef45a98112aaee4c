//! AUCTIONHAWK: multi-realm auction house scanner and bargain detector
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod api;
pub mod collections;
pub mod config;
pub mod engine;
pub mod report;
pub mod storage;
pub mod strategy;
pub mod types;
