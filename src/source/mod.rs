// src/source/mod.rs

//! Package sources and the dependency metadata accessors they expose
//!
//! A `SourceRepository` is one configured feed. Gathering asks each
//! repository once for its `DependencyInfoResource` and then issues all
//! queries against that accessor. The wire protocol behind an accessor is
//! the implementor's concern.

mod mapping;
mod memory;

pub use mapping::PackageSourceMapping;
pub use memory::{MemoryRepository, MemoryResource};

use crate::error::Result;
use crate::package::{PackageId, PackageIdentity, SourcePackageDependencyInfo, TargetFramework};
use async_trait::async_trait;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A named package source location (feed URL, UNC share or folder)
#[derive(Debug, Clone)]
pub struct PackageSource {
    pub name: String,
    pub source: String,
}

impl PackageSource {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }

    /// A source whose name is its location
    pub fn from_location(source: impl Into<String>) -> Self {
        let source = source.into();
        Self {
            name: source.clone(),
            source,
        }
    }
}

// Sources are the same source when their locations match
impl PartialEq for PackageSource {
    fn eq(&self, other: &Self) -> bool {
        self.source.eq_ignore_ascii_case(&other.source)
    }
}

impl Eq for PackageSource {}

impl Hash for PackageSource {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for byte in self.source.bytes() {
            state.write_u8(byte.to_ascii_lowercase());
        }
        state.write_u8(0xff);
    }
}

impl fmt::Display for PackageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Dependency metadata queries against a single source
#[async_trait]
pub trait DependencyInfoResource: Send + Sync {
    /// Look up one exact package version
    ///
    /// Returns `Ok(None)` when the source does not carry that version.
    async fn resolve_package(
        &self,
        identity: &PackageIdentity,
        framework: &TargetFramework,
        token: &CancellationToken,
    ) -> Result<Option<SourcePackageDependencyInfo>>;

    /// Look up every version of a package id
    async fn resolve_packages(
        &self,
        id: &PackageId,
        framework: &TargetFramework,
        token: &CancellationToken,
    ) -> Result<Vec<SourcePackageDependencyInfo>>;
}

/// A configured source able to hand out a dependency info accessor
#[async_trait]
pub trait SourceRepository: Send + Sync {
    fn package_source(&self) -> &PackageSource;

    /// Create (or return) the accessor for this source
    async fn dependency_info(&self) -> Result<Arc<dyn DependencyInfoResource>>;
}
