// src/package.rs

//! Package identities and the dependency metadata exchanged with sources
//!
//! Package ids and target frameworks compare case-insensitively but keep the
//! casing they were created with for display.

use crate::error::Result;
use crate::source::PackageSource;
use crate::version::{PackageVersion, VersionRange};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

macro_rules! case_insensitive_name {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.0.eq_ignore_ascii_case(&other.0)
            }
        }

        impl Eq for $name {}

        impl Hash for $name {
            fn hash<H: Hasher>(&self, state: &mut H) {
                for byte in self.0.bytes() {
                    state.write_u8(byte.to_ascii_lowercase());
                }
                state.write_u8(0xff);
            }
        }

        impl Ord for $name {
            fn cmp(&self, other: &Self) -> Ordering {
                self.0
                    .bytes()
                    .map(|b| b.to_ascii_lowercase())
                    .cmp(other.0.bytes().map(|b| b.to_ascii_lowercase()))
            }
        }

        impl PartialOrd for $name {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

case_insensitive_name!(
    /// A package id such as `Newtonsoft.Json`
    PackageId
);

case_insensitive_name!(
    /// A target framework moniker such as `net451`
    TargetFramework
);

/// A package id with an optional version
///
/// An identity without a version stands for "every version of this id".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageIdentity {
    pub id: PackageId,
    pub version: Option<PackageVersion>,
}

impl PackageIdentity {
    pub fn new(id: impl Into<PackageId>, version: PackageVersion) -> Self {
        Self {
            id: id.into(),
            version: Some(version),
        }
    }

    /// Identity covering every version of `id`
    pub fn any_version(id: impl Into<PackageId>) -> Self {
        Self {
            id: id.into(),
            version: None,
        }
    }

    /// Build an identity from an id and a version string
    pub fn parse(id: impl Into<PackageId>, version: &str) -> Result<Self> {
        Ok(Self::new(id, PackageVersion::parse(version)?))
    }

    pub fn has_version(&self) -> bool {
        self.version.is_some()
    }

    /// Whether the version is a prerelease; unversioned identities are not
    pub fn is_prerelease(&self) -> bool {
        self.version.as_ref().is_some_and(PackageVersion::is_prerelease)
    }

    /// Dotted `id.version` form used when naming installed packages
    pub fn dotted(&self) -> String {
        match &self.version {
            Some(version) => format!("{}.{}", self.id, version),
            None => self.id.to_string(),
        }
    }
}

impl fmt::Display for PackageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{} {}", self.id, version),
            None => write!(f, "{}", self.id),
        }
    }
}

/// One dependency edge: an id and the versions it accepts
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageDependency {
    pub id: PackageId,
    pub version_range: VersionRange,
}

impl PackageDependency {
    pub fn new(id: impl Into<PackageId>, version_range: VersionRange) -> Self {
        Self {
            id: id.into(),
            version_range,
        }
    }

    /// Parse the range in interval notation
    pub fn parse(id: impl Into<PackageId>, range: &str) -> Result<Self> {
        Ok(Self::new(id, VersionRange::parse(range)?))
    }
}

impl fmt::Display for PackageDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.version_range)
    }
}

/// A package version, its dependencies and the source it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePackageDependencyInfo {
    pub identity: PackageIdentity,
    pub dependencies: Vec<PackageDependency>,
    pub source: PackageSource,
}

impl SourcePackageDependencyInfo {
    pub fn new(
        identity: PackageIdentity,
        dependencies: Vec<PackageDependency>,
        source: PackageSource,
    ) -> Self {
        Self {
            identity,
            dependencies,
            source,
        }
    }

    pub fn id(&self) -> &PackageId {
        &self.identity.id
    }

    pub fn version(&self) -> Option<&PackageVersion> {
        self.identity.version.as_ref()
    }

    /// Whether any dependency names `id`
    pub fn depends_on(&self, id: &PackageId) -> bool {
        self.dependencies.iter().any(|d| &d.id == id)
    }
}

/// An installed package together with its declared `allowedVersions` range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageReference {
    pub identity: PackageIdentity,
    pub allowed_versions: Option<VersionRange>,
}

impl PackageReference {
    pub fn new(identity: PackageIdentity) -> Self {
        Self {
            identity,
            allowed_versions: None,
        }
    }

    pub fn with_allowed_versions(mut self, range: VersionRange) -> Self {
        self.allowed_versions = Some(range);
        self
    }
}

/// Which version components must stay equal to the installed version on update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateConstraints {
    pub exact_major: bool,
    pub exact_minor: bool,
    pub exact_patch: bool,
    pub exact_release: bool,
}

impl UpdateConstraints {
    /// All components pinned: only the installed version itself qualifies
    pub fn is_exact_version(&self) -> bool {
        self.exact_major && self.exact_minor && self.exact_patch && self.exact_release
    }
}

/// How dependency versions are picked by the downstream solver
///
/// Gathering only distinguishes `Ignore`, which disables closure expansion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DependencyBehavior {
    Ignore,
    #[default]
    Lowest,
    HighestPatch,
    HighestMinor,
    Highest,
}
