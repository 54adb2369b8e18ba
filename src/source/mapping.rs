// src/source/mapping.rs
//! Package source mapping
//!
//! Restricts which sources may answer for a package id. Each source name
//! lists id patterns:
//! - Exact id: `"Contoso.Core"`
//! - Prefix: `"Contoso.*"` (any id starting with `Contoso.`)
//! - Everything: `"*"`
//!
//! The most specific matching pattern wins. An exact id beats any prefix
//! and a longer prefix beats a shorter one. Matching ignores ASCII case and
//! surrounding whitespace.

use crate::package::PackageId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Source name -> id patterns
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageSourceMapping {
    patterns: BTreeMap<String, Vec<String>>,
}

impl PackageSourceMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add patterns for a source name
    pub fn with_source<I, S>(mut self, source_name: impl Into<String>, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.patterns
            .entry(source_name.into())
            .or_default()
            .extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Whether any pattern is configured
    pub fn is_enabled(&self) -> bool {
        self.patterns.values().any(|p| !p.is_empty())
    }

    /// Names of the sources allowed to answer for `id`
    ///
    /// Empty when no pattern matches; callers then query no source at all.
    pub fn configured_sources(&self, id: &PackageId) -> Vec<String> {
        let mut best: Option<usize> = None;
        let mut sources = Vec::new();

        for (source_name, patterns) in &self.patterns {
            let Some(score) = patterns
                .iter()
                .filter_map(|p| pattern_specificity(id.as_str(), p))
                .max()
            else {
                continue;
            };

            match best {
                Some(current) if score < current => {}
                Some(current) if score == current => sources.push(source_name.clone()),
                _ => {
                    best = Some(score);
                    sources.clear();
                    sources.push(source_name.clone());
                }
            }
        }

        sources
    }

    /// Whether `source_name` may answer for `id`
    pub fn allows(&self, source_name: &str, id: &PackageId) -> bool {
        self.configured_sources(id)
            .iter()
            .any(|name| name.eq_ignore_ascii_case(source_name))
    }
}

/// Score a pattern against an id, or `None` when it does not match
fn pattern_specificity(id: &str, pattern: &str) -> Option<usize> {
    let pattern = pattern.trim();
    if pattern.is_empty() {
        return None;
    }

    match pattern.strip_suffix('*') {
        Some(prefix) => {
            let matches = id.len() >= prefix.len()
                && id.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes());
            matches.then_some(prefix.len())
        }
        // Exact ids outrank every prefix
        None => id.eq_ignore_ascii_case(pattern).then_some(usize::MAX),
    }
}
