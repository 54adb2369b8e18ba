// src/resolver/context.rs
//! Parameters for a single gather run

use super::cache::GatherCache;
use crate::package::{DependencyBehavior, PackageId, PackageIdentity, TargetFramework};
use crate::source::{PackageSourceMapping, SourceRepository};
use std::sync::Arc;

/// Everything a gather run needs to know up front
///
/// Built once per resolution attempt. The cache is fresh unless the caller
/// hands in one carried over from an earlier attempt with [`Self::with_cache`].
#[derive(Clone)]
pub struct GatherContext {
    pub target_framework: TargetFramework,
    /// Sources allowed to answer for primary targets, in priority order
    pub primary_sources: Vec<Arc<dyn SourceRepository>>,
    /// Every source, including fallbacks, queried during closure expansion
    pub all_sources: Vec<Arc<dyn SourceRepository>>,
    /// The local install location
    pub packages_folder_source: Arc<dyn SourceRepository>,
    /// Targets requested at an exact version
    pub primary_targets: Vec<PackageIdentity>,
    /// Targets requested by id alone
    pub primary_target_ids: Vec<PackageId>,
    pub installed_packages: Vec<PackageIdentity>,
    pub allow_downgrades: bool,
    /// Update-all runs tolerate primary targets missing from every source
    pub is_update_all: bool,
    pub dependency_behavior: DependencyBehavior,
    pub source_mapping: PackageSourceMapping,
    pub cache: Arc<GatherCache>,
}

impl GatherContext {
    pub fn new(
        target_framework: TargetFramework,
        packages_folder_source: Arc<dyn SourceRepository>,
    ) -> Self {
        Self {
            target_framework,
            primary_sources: Vec::new(),
            all_sources: Vec::new(),
            packages_folder_source,
            primary_targets: Vec::new(),
            primary_target_ids: Vec::new(),
            installed_packages: Vec::new(),
            allow_downgrades: false,
            is_update_all: false,
            dependency_behavior: DependencyBehavior::default(),
            source_mapping: PackageSourceMapping::default(),
            cache: Arc::new(GatherCache::new()),
        }
    }

    pub fn with_primary_sources(mut self, sources: Vec<Arc<dyn SourceRepository>>) -> Self {
        self.primary_sources = sources;
        self
    }

    pub fn with_all_sources(mut self, sources: Vec<Arc<dyn SourceRepository>>) -> Self {
        self.all_sources = sources;
        self
    }

    pub fn with_primary_targets(mut self, targets: Vec<PackageIdentity>) -> Self {
        self.primary_targets = targets;
        self
    }

    pub fn with_primary_target_ids(mut self, ids: Vec<PackageId>) -> Self {
        self.primary_target_ids = ids;
        self
    }

    pub fn with_installed_packages(mut self, installed: Vec<PackageIdentity>) -> Self {
        self.installed_packages = installed;
        self
    }

    pub fn with_allow_downgrades(mut self, allow: bool) -> Self {
        self.allow_downgrades = allow;
        self
    }

    pub fn with_update_all(mut self, is_update_all: bool) -> Self {
        self.is_update_all = is_update_all;
        self
    }

    pub fn with_dependency_behavior(mut self, behavior: DependencyBehavior) -> Self {
        self.dependency_behavior = behavior;
        self
    }

    pub fn with_source_mapping(mut self, mapping: PackageSourceMapping) -> Self {
        self.source_mapping = mapping;
        self
    }

    /// Share a cache with other runs
    pub fn with_cache(mut self, cache: Arc<GatherCache>) -> Self {
        self.cache = cache;
        self
    }
}
