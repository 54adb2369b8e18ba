// src/resolver/checks.rs

//! Sanity checks applied between gathering and solving
//!
//! These turn an empty or over-constrained candidate set into an error the
//! user can act on, before the solver reports a vaguer failure.

use crate::error::{Error, Result};
use crate::package::{PackageId, PackageReference, SourcePackageDependencyInfo};

/// Fail when gathering produced nothing at all
pub fn ensure_gathered(
    candidates: &[SourcePackageDependencyInfo],
    description: &str,
) -> Result<()> {
    if candidates.is_empty() {
        return Err(Error::NothingGathered(description.to_string()));
    }
    Ok(())
}

/// Fail when a target's `allowedVersions` range excludes every candidate
pub fn ensure_version_allowed_by_references(
    target_ids: &[PackageId],
    references: &[PackageReference],
    candidates: &[SourcePackageDependencyInfo],
) -> Result<()> {
    for target_id in target_ids {
        let Some(reference) = references.iter().find(|r| &r.identity.id == target_id) else {
            continue;
        };
        let Some(range) = &reference.allowed_versions else {
            continue;
        };

        let allowed = candidates
            .iter()
            .filter(|p| p.id() == target_id)
            .filter_map(|p| p.version())
            .any(|v| range.satisfies(v));

        if !allowed {
            return Err(Error::ConstraintViolation(format!(
                "Unable to resolve '{}'. An additional constraint '{}' defined in packages.config prevents this operation.",
                target_id, range
            )));
        }
    }
    Ok(())
}

/// Fail when the installed version of `id` is newer than every candidate
pub fn ensure_no_newer_version_referenced(
    id: &PackageId,
    references: &[PackageReference],
    candidates: &[SourcePackageDependencyInfo],
) -> Result<()> {
    let Some(installed) = references
        .iter()
        .find(|r| &r.identity.id == id)
        .and_then(|r| r.identity.version.as_ref())
    else {
        return Ok(());
    };

    let highest = candidates
        .iter()
        .filter(|p| p.id() == id)
        .filter_map(|p| p.version())
        .max();

    match highest {
        Some(highest) if installed > highest => Err(Error::ConstraintViolation(format!(
            "A newer version of '{}' ({}) is already referenced, no update is available",
            id, installed
        ))),
        _ => Ok(()),
    }
}
