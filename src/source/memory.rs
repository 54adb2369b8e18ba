// src/source/memory.rs

//! In-memory source repository
//!
//! Serves dependency metadata the caller already holds, typically the
//! contents of the local packages folder.

use super::{DependencyInfoResource, PackageSource, SourceRepository};
use crate::error::{Error, Result};
use crate::package::{
    PackageDependency, PackageId, PackageIdentity, SourcePackageDependencyInfo, TargetFramework,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;

/// Dependency info accessor over a fixed package list
#[derive(Debug)]
pub struct MemoryResource {
    packages: Vec<SourcePackageDependencyInfo>,
    requests: AtomicUsize,
}

impl MemoryResource {
    /// Number of queries answered so far
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }

    fn record(&self, token: &CancellationToken) -> Result<()> {
        if token.is_cancelled() {
            return Err(Error::Cancelled);
        }
        self.requests.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[async_trait]
impl DependencyInfoResource for MemoryResource {
    async fn resolve_package(
        &self,
        identity: &PackageIdentity,
        _framework: &TargetFramework,
        token: &CancellationToken,
    ) -> Result<Option<SourcePackageDependencyInfo>> {
        self.record(token)?;
        Ok(self
            .packages
            .iter()
            .find(|p| &p.identity == identity)
            .cloned())
    }

    async fn resolve_packages(
        &self,
        id: &PackageId,
        _framework: &TargetFramework,
        token: &CancellationToken,
    ) -> Result<Vec<SourcePackageDependencyInfo>> {
        self.record(token)?;
        Ok(self
            .packages
            .iter()
            .filter(|p| p.id() == id)
            .cloned()
            .collect())
    }
}

/// A source repository backed by an in-memory package list
pub struct MemoryRepository {
    source: PackageSource,
    resource: Arc<MemoryResource>,
}

impl MemoryRepository {
    /// Create a repository; every package is re-attributed to `source`
    pub fn new(
        source: PackageSource,
        packages: impl IntoIterator<Item = SourcePackageDependencyInfo>,
    ) -> Self {
        let packages = packages
            .into_iter()
            .map(|mut p| {
                p.source = source.clone();
                p
            })
            .collect();

        Self {
            source,
            resource: Arc::new(MemoryResource {
                packages,
                requests: AtomicUsize::new(0),
            }),
        }
    }

    /// Create a repository from bare identities and their dependencies
    pub fn from_packages(
        source: PackageSource,
        packages: impl IntoIterator<Item = (PackageIdentity, Vec<PackageDependency>)>,
    ) -> Self {
        let infos: Vec<_> = packages
            .into_iter()
            .map(|(identity, deps)| {
                SourcePackageDependencyInfo::new(identity, deps, source.clone())
            })
            .collect();
        Self::new(source, infos)
    }

    /// Number of queries the accessor has answered
    pub fn request_count(&self) -> usize {
        self.resource.request_count()
    }

    pub fn resource(&self) -> Arc<MemoryResource> {
        Arc::clone(&self.resource)
    }
}

#[async_trait]
impl SourceRepository for MemoryRepository {
    fn package_source(&self) -> &PackageSource {
        &self.source
    }

    async fn dependency_info(&self) -> Result<Arc<dyn DependencyInfoResource>> {
        let resource: Arc<dyn DependencyInfoResource> = self.resource.clone();
        Ok(resource)
    }
}
