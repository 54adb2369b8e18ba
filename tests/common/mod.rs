// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use package_gather::{
    DependencyInfoResource, Error, MemoryRepository, PackageDependency, PackageId,
    PackageIdentity, PackageSource, Result, SourcePackageDependencyInfo, SourceRepository,
    TargetFramework,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub fn framework() -> TargetFramework {
    TargetFramework::new("net451")
}

pub fn create_package(id: &str, version: &str) -> PackageIdentity {
    PackageIdentity::parse(id, version).unwrap()
}

/// Dependency info where every dependency accepts `1.0.0` and above
pub fn create_dependency_info(
    id: &str,
    version: &str,
    dependency_ids: &[&str],
) -> SourcePackageDependencyInfo {
    SourcePackageDependencyInfo::new(
        create_package(id, version),
        dependency_ids
            .iter()
            .map(|dep| PackageDependency::parse(*dep, "1.0.0").unwrap())
            .collect(),
        PackageSource::from_location("unknown"),
    )
}

pub fn create_repo(
    location: &str,
    packages: Vec<SourcePackageDependencyInfo>,
) -> Arc<dyn SourceRepository> {
    Arc::new(MemoryRepository::new(
        PackageSource::from_location(location),
        packages,
    ))
}

pub fn create_named_repo(
    location: &str,
    name: &str,
    packages: Vec<SourcePackageDependencyInfo>,
) -> Arc<dyn SourceRepository> {
    Arc::new(MemoryRepository::new(
        PackageSource::new(name, location),
        packages,
    ))
}

/// Group results by lowercase id with their version counts, sorted by id
pub fn count_by_id(results: &[SourcePackageDependencyInfo]) -> Vec<(String, usize)> {
    let mut counts: std::collections::BTreeMap<String, usize> = Default::default();
    for package in results {
        *counts.entry(package.id().to_string().to_lowercase()).or_default() += 1;
    }
    counts.into_iter().collect()
}

pub fn sorted_ids(results: &[SourcePackageDependencyInfo]) -> Vec<String> {
    let mut ids: Vec<String> = results
        .iter()
        .map(|p| p.id().to_string().to_lowercase())
        .collect();
    ids.sort();
    ids.dedup();
    ids
}

/// Accessor that fails every query with a transport error
pub struct ThrowingResource;

#[async_trait]
impl DependencyInfoResource for ThrowingResource {
    async fn resolve_package(
        &self,
        identity: &PackageIdentity,
        _framework: &TargetFramework,
        _token: &CancellationToken,
    ) -> Result<Option<SourcePackageDependencyInfo>> {
        Err(Error::DownloadError(format!("unable to load {}", identity)))
    }

    async fn resolve_packages(
        &self,
        id: &PackageId,
        _framework: &TargetFramework,
        _token: &CancellationToken,
    ) -> Result<Vec<SourcePackageDependencyInfo>> {
        Err(Error::DownloadError(format!("unable to load {}", id)))
    }
}

/// Accessor that never answers within any reasonable timeout
pub struct StalledResource;

#[async_trait]
impl DependencyInfoResource for StalledResource {
    async fn resolve_package(
        &self,
        _identity: &PackageIdentity,
        _framework: &TargetFramework,
        _token: &CancellationToken,
    ) -> Result<Option<SourcePackageDependencyInfo>> {
        tokio::time::sleep(Duration::from_secs(600)).await;
        Ok(None)
    }

    async fn resolve_packages(
        &self,
        _id: &PackageId,
        _framework: &TargetFramework,
        _token: &CancellationToken,
    ) -> Result<Vec<SourcePackageDependencyInfo>> {
        tokio::time::sleep(Duration::from_secs(600)).await;
        Ok(Vec::new())
    }
}

/// Accessor that answers every id with a `1.0.0` package after a short delay
/// and records the highest number of queries in flight at once
#[derive(Default)]
pub struct ConcurrencyTrackingResource {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl ConcurrencyTrackingResource {
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    async fn answer(&self, id: &PackageId) -> SourcePackageDependencyInfo {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        create_dependency_info(id.as_str(), "1.0.0", &[])
    }
}

#[async_trait]
impl DependencyInfoResource for ConcurrencyTrackingResource {
    async fn resolve_package(
        &self,
        identity: &PackageIdentity,
        _framework: &TargetFramework,
        _token: &CancellationToken,
    ) -> Result<Option<SourcePackageDependencyInfo>> {
        Ok(Some(self.answer(&identity.id).await))
    }

    async fn resolve_packages(
        &self,
        id: &PackageId,
        _framework: &TargetFramework,
        _token: &CancellationToken,
    ) -> Result<Vec<SourcePackageDependencyInfo>> {
        Ok(vec![self.answer(id).await])
    }
}

/// Repository wrapping a fixed accessor
pub struct FixedRepository {
    source: PackageSource,
    resource: Option<Arc<dyn DependencyInfoResource>>,
}

#[async_trait]
impl SourceRepository for FixedRepository {
    fn package_source(&self) -> &PackageSource {
        &self.source
    }

    async fn dependency_info(&self) -> Result<Arc<dyn DependencyInfoResource>> {
        self.resource
            .clone()
            .ok_or_else(|| Error::DownloadError("service index unavailable".to_string()))
    }
}

pub fn create_throwing_repo(location: &str) -> Arc<dyn SourceRepository> {
    Arc::new(FixedRepository {
        source: PackageSource::from_location(location),
        resource: Some(Arc::new(ThrowingResource)),
    })
}

pub fn create_timeout_repo(location: &str) -> Arc<dyn SourceRepository> {
    Arc::new(FixedRepository {
        source: PackageSource::from_location(location),
        resource: Some(Arc::new(StalledResource)),
    })
}

/// Repository whose accessor cannot be created at all
pub fn create_broken_repo(location: &str) -> Arc<dyn SourceRepository> {
    Arc::new(FixedRepository {
        source: PackageSource::from_location(location),
        resource: None,
    })
}

pub fn create_tracking_repo(
    location: &str,
) -> (Arc<dyn SourceRepository>, Arc<ConcurrencyTrackingResource>) {
    let resource = Arc::new(ConcurrencyTrackingResource::default());
    let accessor: Arc<dyn DependencyInfoResource> = resource.clone();
    let repo: Arc<dyn SourceRepository> = Arc::new(FixedRepository {
        source: PackageSource::from_location(location),
        resource: Some(accessor),
    });
    (repo, resource)
}
