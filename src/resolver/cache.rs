// src/resolver/cache.rs
//! Per-run gather cache
//!
//! Memoizes source lookups for the duration of a gather run. Entries are
//! keyed by source and target framework plus either an exact identity or a
//! bare id (all versions). A stored empty list is still an entry: the
//! source was asked and had nothing.
//!
//! Entries are write-once. A second write for an existing key is ignored.

use crate::package::{PackageId, PackageIdentity, SourcePackageDependencyInfo, TargetFramework};
use crate::source::PackageSource;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SingleVersionKey {
    source: PackageSource,
    identity: PackageIdentity,
    framework: TargetFramework,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct AllVersionsKey {
    source: PackageSource,
    id: PackageId,
    framework: TargetFramework,
}

/// Outcome of a cache lookup
#[derive(Debug, Clone, Default)]
pub struct GatherCacheResult {
    /// Whether the query was made before
    pub has_entry: bool,
    pub packages: Vec<SourcePackageDependencyInfo>,
}

impl GatherCacheResult {
    fn miss() -> Self {
        Self::default()
    }

    fn hit(packages: Vec<SourcePackageDependencyInfo>) -> Self {
        Self {
            has_entry: true,
            packages,
        }
    }
}

/// Concurrent memo table shared by gather workers
#[derive(Debug, Default)]
pub struct GatherCache {
    single_version: DashMap<SingleVersionKey, Vec<SourcePackageDependencyInfo>>,
    all_versions: DashMap<AllVersionsKey, Vec<SourcePackageDependencyInfo>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl GatherCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the answer to an exact-version query
    pub fn add_package(
        &self,
        source: &PackageSource,
        identity: &PackageIdentity,
        framework: &TargetFramework,
        package: Option<SourcePackageDependencyInfo>,
    ) {
        let key = SingleVersionKey {
            source: source.clone(),
            identity: identity.clone(),
            framework: framework.clone(),
        };
        self.single_version
            .entry(key)
            .or_insert_with(|| package.into_iter().collect());
    }

    /// Record the answer to an all-versions query
    pub fn add_all_packages(
        &self,
        source: &PackageSource,
        id: &PackageId,
        framework: &TargetFramework,
        packages: Vec<SourcePackageDependencyInfo>,
    ) {
        let key = AllVersionsKey {
            source: source.clone(),
            id: id.clone(),
            framework: framework.clone(),
        };
        self.all_versions.entry(key).or_insert(packages);
    }

    /// Look up an exact-version query
    ///
    /// Falls back to an all-versions entry for the same id, filtered down to
    /// the requested version.
    pub fn get_package(
        &self,
        source: &PackageSource,
        identity: &PackageIdentity,
        framework: &TargetFramework,
    ) -> GatherCacheResult {
        let key = SingleVersionKey {
            source: source.clone(),
            identity: identity.clone(),
            framework: framework.clone(),
        };
        if let Some(entry) = self.single_version.get(&key) {
            return self.record_hit(entry.value().clone());
        }

        let all_key = AllVersionsKey {
            source: source.clone(),
            id: identity.id.clone(),
            framework: framework.clone(),
        };
        if let Some(entry) = self.all_versions.get(&all_key) {
            let matching = entry
                .value()
                .iter()
                .filter(|p| &p.identity == identity)
                .cloned()
                .collect();
            return self.record_hit(matching);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        GatherCacheResult::miss()
    }

    /// Look up an all-versions query
    pub fn get_packages(
        &self,
        source: &PackageSource,
        id: &PackageId,
        framework: &TargetFramework,
    ) -> GatherCacheResult {
        let key = AllVersionsKey {
            source: source.clone(),
            id: id.clone(),
            framework: framework.clone(),
        };
        match self.all_versions.get(&key) {
            Some(entry) => self.record_hit(entry.value().clone()),
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                GatherCacheResult::miss()
            }
        }
    }

    fn record_hit(&self, packages: Vec<SourcePackageDependencyInfo>) -> GatherCacheResult {
        self.hits.fetch_add(1, Ordering::Relaxed);
        GatherCacheResult::hit(packages)
    }

    /// Number of lookups answered from the cache
    pub fn hit_count(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Number of lookups that found no entry
    pub fn miss_count(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Total number of stored entries across both key spaces
    pub fn len(&self) -> usize {
        self.single_version.len() + self.all_versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
