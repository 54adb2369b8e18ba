// src/resolver/mod.rs

//! Candidate gathering and analysis
//!
//! `gather` collects every package version that may take part in a
//! solution, `prune` and `checks` narrow and validate that set before it
//! reaches a solver, and `uninstall` computes removal sets over the
//! installed packages.

mod cache;
pub mod checks;
mod context;
mod gather;
pub mod prune;
mod uninstall;

pub use cache::{GatherCache, GatherCacheResult};
pub use context::GatherContext;
pub use gather::{
    gather, ResolverGather, DEFAULT_MAX_DEGREE_OF_PARALLELISM, DEFAULT_REQUEST_TIMEOUT,
};
pub use uninstall::{compute_packages_to_uninstall, InstalledGraph, UninstallationContext};
