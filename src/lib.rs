// src/lib.rs

//! Package Gather
//!
//! Dependency gathering and candidate pruning for package managers.
//!
//! # Architecture
//!
//! - Gather: bounded-parallel queries against package sources, expanding the
//!   dependency closure until no new ids turn up
//! - Cache: per-run memo of source answers, shareable across attempts
//! - Prune: composable filters applied to the gathered candidates
//! - Uninstall: removal sets and orphan checks over the installed graph

pub mod config;
mod error;
pub mod package;
pub mod resolver;
pub mod source;
pub mod version;

pub use config::GatherSettings;
pub use error::{Error, Result};
pub use package::{
    DependencyBehavior, PackageDependency, PackageId, PackageIdentity, PackageReference,
    SourcePackageDependencyInfo, TargetFramework, UpdateConstraints,
};
pub use resolver::{
    compute_packages_to_uninstall, gather, GatherCache, GatherCacheResult, GatherContext,
    InstalledGraph, ResolverGather, UninstallationContext,
};
pub use source::{
    DependencyInfoResource, MemoryRepository, PackageSource, PackageSourceMapping,
    SourceRepository,
};
pub use version::{PackageVersion, VersionRange};
