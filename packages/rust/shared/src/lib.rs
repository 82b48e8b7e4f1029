//! Shared types, error model, and configuration for postsync.
//!
//! This crate is the foundation depended on by all other postsync crates.
//! It provides:
//! - [`PostsyncError`] — the unified error type
//! - Domain types ([`OwnerConfig`], [`PostRecord`], [`SourceKind`], [`SupplementStrategy`])
//! - Configuration ([`AppConfig`], [`SyncConfig`], [`FleetConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, FleetConfig, FleetSection, SyncConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from,
};
pub use error::{PostsyncError, Result};
pub use types::{
    CONTENT_FALLBACK, OwnerConfig, PostRecord, SUBSTACK_MARKER, SourceKind, SupplementStrategy,
};
