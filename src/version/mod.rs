// src/version/mod.rs

//! Package versions and version ranges
//!
//! Versions follow the `major.minor.patch[.revision][-prerelease][+metadata]`
//! shape. Missing numeric parts default to zero, so `1.0`, `1.0.0` and
//! `1.0.0.0` all name the same version. Build metadata is accepted but takes
//! no part in equality or ordering.
//!
//! Ranges use interval notation:
//! - `1.0` → at least 1.0
//! - `[1.0]` → exactly 1.0
//! - `[1.0,2.0)` → 1.0 up to but excluding 2.0
//! - `(,2.0]` → anything up to and including 2.0
//! - `*` or empty → any version

use crate::error::{Error, Result};
use semver::Prerelease;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// A parsed package version
///
/// Prerelease labels compare case-insensitively: `1.0.0-BETA` and
/// `1.0.0-beta` are the same version.
#[derive(Debug, Clone)]
pub struct PackageVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub revision: u64,
    pub pre: Prerelease,
}

impl PackageVersion {
    /// Create a stable three-part version
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            revision: 0,
            pre: Prerelease::EMPTY,
        }
    }

    /// Parse a version string
    ///
    /// Examples:
    /// - "1.0" → 1.0.0
    /// - "1.2.3.4" → 1.2.3 revision 4
    /// - "2.0.0-beta.1" → 2.0.0 with prerelease label "beta.1"
    /// - "1.0.0+build5" → 1.0.0 (metadata dropped)
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::ParseError("Empty version string".to_string()));
        }

        // Metadata never participates in comparison
        let without_metadata = match trimmed.find('+') {
            Some(pos) => &trimmed[..pos],
            None => trimmed,
        };

        let (numeric, label) = match without_metadata.find('-') {
            Some(pos) => (&without_metadata[..pos], Some(&without_metadata[pos + 1..])),
            None => (without_metadata, None),
        };

        let parts: Vec<&str> = numeric.split('.').collect();
        if parts.len() > 4 {
            return Err(Error::ParseError(format!(
                "Too many numeric components in version '{}'",
                s
            )));
        }

        let mut numbers = [0u64; 4];
        for (slot, part) in numbers.iter_mut().zip(parts.iter()) {
            *slot = part.trim().parse::<u64>().map_err(|e| {
                Error::ParseError(format!("Invalid number '{}' in version '{}': {}", part, s, e))
            })?;
        }

        let pre = match label {
            Some(label) if label.is_empty() => {
                return Err(Error::ParseError(format!(
                    "Empty prerelease label in version '{}'",
                    s
                )));
            }
            Some(label) => Prerelease::new(label).map_err(|e| {
                Error::ParseError(format!("Invalid prerelease label in version '{}': {}", s, e))
            })?,
            None => Prerelease::EMPTY,
        };

        Ok(Self {
            major: numbers[0],
            minor: numbers[1],
            patch: numbers[2],
            revision: numbers[3],
            pre,
        })
    }

    /// Whether this version carries a prerelease label
    pub fn is_prerelease(&self) -> bool {
        !self.pre.is_empty()
    }

    /// The prerelease label, empty for stable versions
    pub fn release_label(&self) -> &str {
        self.pre.as_str()
    }
}

impl FromStr for PackageVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if self.revision > 0 {
            write!(f, ".{}", self.revision)?;
        }
        if !self.pre.is_empty() {
            write!(f, "-{}", self.pre)?;
        }
        Ok(())
    }
}

impl Ord for PackageVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch, self.revision)
            .cmp(&(other.major, other.minor, other.patch, other.revision))
            .then_with(|| compare_labels(self.pre.as_str(), other.pre.as_str()))
    }
}

impl PartialEq for PackageVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PackageVersion {}

impl Hash for PackageVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.major, self.minor, self.patch, self.revision).hash(state);
        for byte in self.pre.as_str().bytes() {
            state.write_u8(byte.to_ascii_lowercase());
        }
        state.write_u8(0xff);
    }
}

/// Semver precedence for prerelease labels, ignoring ASCII case
///
/// A stable version (empty label) sorts above every prerelease. Numeric
/// identifiers sort numerically and below alphanumeric ones.
fn compare_labels(left: &str, right: &str) -> Ordering {
    match (left.is_empty(), right.is_empty()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        (false, false) => {}
    }

    let mut left_parts = left.split('.');
    let mut right_parts = right.split('.');
    loop {
        let (l, r) = match (left_parts.next(), right_parts.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) => (l, r),
        };

        let ordering = match (l.parse::<u64>(), r.parse::<u64>()) {
            (Ok(l), Ok(r)) => l.cmp(&r),
            (Ok(_), Err(_)) => Ordering::Less,
            (Err(_), Ok(_)) => Ordering::Greater,
            (Err(_), Err(_)) => l
                .bytes()
                .map(|b| b.to_ascii_lowercase())
                .cmp(r.bytes().map(|b| b.to_ascii_lowercase())),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
}

impl PartialOrd for PackageVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A range of acceptable versions with optional, independently inclusive bounds
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct VersionRange {
    pub min: Option<PackageVersion>,
    pub min_inclusive: bool,
    pub max: Option<PackageVersion>,
    pub max_inclusive: bool,
}

impl VersionRange {
    /// A range accepting every version
    pub fn all() -> Self {
        Self::default()
    }

    /// `version` or anything newer
    pub fn at_least(version: PackageVersion) -> Self {
        Self {
            min: Some(version),
            min_inclusive: true,
            max: None,
            max_inclusive: false,
        }
    }

    /// Exactly `version`
    pub fn exact(version: PackageVersion) -> Self {
        Self {
            min: Some(version.clone()),
            min_inclusive: true,
            max: Some(version),
            max_inclusive: true,
        }
    }

    /// Parse a range in interval notation
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() || s == "*" {
            return Ok(Self::all());
        }

        let opens = s.starts_with('[') || s.starts_with('(');
        let closes = s.ends_with(']') || s.ends_with(')');

        if !opens && !closes {
            return Ok(Self::at_least(PackageVersion::parse(s)?));
        }
        if !(opens && closes) || s.len() < 2 {
            return Err(Error::ParseError(format!("Unbalanced version range '{}'", s)));
        }

        let min_inclusive = s.starts_with('[');
        let max_inclusive = s.ends_with(']');
        let inner = &s[1..s.len() - 1];

        let range = match inner.split_once(',') {
            None => {
                // "[1.0]" is the only bracketed form without a comma
                if !(min_inclusive && max_inclusive) {
                    return Err(Error::ParseError(format!(
                        "Single-version range '{}' must use square brackets",
                        s
                    )));
                }
                Self::exact(PackageVersion::parse(inner)?)
            }
            Some((low, high)) => {
                if high.contains(',') {
                    return Err(Error::ParseError(format!(
                        "Too many bounds in version range '{}'",
                        s
                    )));
                }
                let min = parse_bound(low)?;
                let max = parse_bound(high)?;
                Self {
                    min_inclusive: min_inclusive && min.is_some(),
                    max_inclusive: max_inclusive && max.is_some(),
                    min,
                    max,
                }
            }
        };

        if let (Some(min), Some(max)) = (&range.min, &range.max) {
            let valid = match min.cmp(max) {
                Ordering::Less => true,
                Ordering::Equal => range.min_inclusive && range.max_inclusive,
                Ordering::Greater => false,
            };
            if !valid {
                return Err(Error::ParseError(format!("Empty version range '{}'", s)));
            }
        }

        Ok(range)
    }

    /// Check whether a version falls inside this range
    pub fn satisfies(&self, version: &PackageVersion) -> bool {
        let above_min = match &self.min {
            Some(min) if self.min_inclusive => version >= min,
            Some(min) => version > min,
            None => true,
        };
        let below_max = match &self.max {
            Some(max) if self.max_inclusive => version <= max,
            Some(max) => version < max,
            None => true,
        };
        above_min && below_max
    }

    /// Whether the range places no restriction at all
    pub fn is_any(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

fn parse_bound(s: &str) -> Result<Option<PackageVersion>> {
    let s = s.trim();
    if s.is_empty() {
        Ok(None)
    } else {
        PackageVersion::parse(s).map(Some)
    }
}

impl FromStr for VersionRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let (Some(min), Some(max)) = (&self.min, &self.max)
            && min == max
            && self.min_inclusive
            && self.max_inclusive
        {
            return write!(f, "[{}]", min);
        }

        f.write_str(if self.min_inclusive { "[" } else { "(" })?;
        if let Some(min) = &self.min {
            write!(f, "{}", min)?;
        }
        f.write_str(", ")?;
        if let Some(max) = &self.max {
            write!(f, "{}", max)?;
        }
        f.write_str(if self.max_inclusive { "]" } else { ")" })
    }
}
