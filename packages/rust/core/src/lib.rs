//! Ingestion pipeline and fleet orchestration for postsync.
//!
//! This crate ties feed fetching, dedup, storage, and archive supplementing
//! into the per-owner `sync_owner` flow, and runs that flow across a fleet
//! of target repositories with retries (`run_sweep`).

pub mod fleet;
pub mod ingest;
