// src/resolver/prune.rs

//! Candidate pruning rules
//!
//! Each rule narrows a gathered candidate list according to one policy and
//! hands the survivors back. Rules are independent; callers pick the ones
//! they need and chain them in whatever order the operation calls for.
//! None of them touch the gather cache or context.

use crate::package::{
    PackageId, PackageIdentity, PackageReference, SourcePackageDependencyInfo, UpdateConstraints,
};
use crate::version::PackageVersion;
use std::collections::{HashSet, VecDeque};
use tracing::debug;

type Candidates = Vec<SourcePackageDependencyInfo>;

fn is_prerelease(package: &SourcePackageDependencyInfo) -> bool {
    package.identity.is_prerelease()
}

/// Drop prereleases unless the id is already installed as a prerelease
///
/// For update-all any other prerelease of such an id survives. Otherwise
/// only the exact installed prerelease identity does.
pub fn prune_prerelease_except_allowed(
    mut candidates: Candidates,
    installed: &[PackageIdentity],
    is_update_all: bool,
) -> Candidates {
    let installed_prerelease: Vec<&PackageIdentity> =
        installed.iter().filter(|p| p.is_prerelease()).collect();

    candidates.retain(|package| {
        if !is_prerelease(package) {
            return true;
        }
        if is_update_all {
            installed_prerelease.iter().any(|p| &p.id == package.id())
        } else {
            installed_prerelease.iter().any(|p| **p == package.identity)
        }
    });
    candidates
}

/// Drop prereleases for ids that did not ask for one
///
/// Prereleases survive for ids that are prerelease targets and for the
/// transitive dependencies of prerelease packages being installed.
pub fn prune_prerelease_for_stable_targets(
    mut candidates: Candidates,
    targets: &[PackageIdentity],
    packages_to_install: &[PackageIdentity],
) -> Candidates {
    let mut allowed: HashSet<PackageId> = targets
        .iter()
        .filter(|t| t.is_prerelease())
        .map(|t| t.id.clone())
        .collect();

    // Cyclic metadata cannot walk deeper than the number of distinct ids
    let max_depth = candidates
        .iter()
        .map(|p| p.id())
        .collect::<HashSet<_>>()
        .len();

    for target in packages_to_install.iter().filter(|p| p.is_prerelease()) {
        let Some(root) = candidates.iter().find(|p| &p.identity == target) else {
            continue;
        };
        allowed.extend(transitive_dependency_ids(root, &candidates, max_depth));
    }

    candidates.retain(|package| !is_prerelease(package) || allowed.contains(package.id()));
    candidates
}

/// Dependency ids reachable from `root` through the candidate set
fn transitive_dependency_ids(
    root: &SourcePackageDependencyInfo,
    candidates: &[SourcePackageDependencyInfo],
    max_depth: usize,
) -> HashSet<PackageId> {
    let mut found = HashSet::new();
    let mut visited: HashSet<&PackageIdentity> = HashSet::new();
    let mut pending: VecDeque<(&SourcePackageDependencyInfo, usize)> = VecDeque::new();

    visited.insert(&root.identity);
    pending.push_back((root, 0));

    while let Some((package, depth)) = pending.pop_front() {
        if depth >= max_depth {
            debug!(
                "Stopping dependency walk at {} after reaching depth {}",
                package.identity, depth
            );
            continue;
        }

        for dependency in &package.dependencies {
            found.insert(dependency.id.clone());
            for next in candidates.iter().filter(|p| p.id() == &dependency.id) {
                if visited.insert(&next.identity) {
                    pending.push_back((next, depth + 1));
                }
            }
        }
    }

    found
}

/// Drop versions below the installed version of the same id
pub fn prune_downgrades(mut candidates: Candidates, references: &[PackageReference]) -> Candidates {
    candidates.retain(|package| {
        !references.iter().any(|r| {
            &r.identity.id == package.id()
                && matches!(
                    (package.version(), &r.identity.version),
                    (Some(candidate), Some(installed)) if candidate < installed
                )
        })
    });
    candidates
}

/// Drop versions outside a reference's `allowedVersions` range
pub fn prune_disallowed_versions(
    mut candidates: Candidates,
    references: &[PackageReference],
) -> Candidates {
    for reference in references {
        let Some(range) = &reference.allowed_versions else {
            continue;
        };
        candidates.retain(|package| {
            package.id() != &reference.identity.id
                || package.version().is_some_and(|v| range.satisfies(v))
        });
    }
    candidates
}

/// Keep only `target`'s exact version for its id
pub fn remove_all_versions_for_id_except(
    mut candidates: Candidates,
    target: &PackageIdentity,
) -> Candidates {
    candidates.retain(|package| package.id() != &target.id || package.identity == *target);
    candidates
}

/// Drop every prerelease of `id`
pub fn remove_all_prerelease_versions_for_id(
    mut candidates: Candidates,
    id: &PackageId,
) -> Candidates {
    candidates.retain(|package| package.id() != id || !is_prerelease(package));
    candidates
}

/// Drop versions of `id` below `minimum`
pub fn remove_all_versions_less_than(
    mut candidates: Candidates,
    id: &PackageId,
    minimum: &PackageVersion,
) -> Candidates {
    candidates.retain(|package| {
        package.id() != id || package.version().is_some_and(|v| v >= minimum)
    });
    candidates
}

/// Pin primary targets to their requested versions
pub fn prune_by_primary_targets(
    mut candidates: Candidates,
    targets: &[PackageIdentity],
) -> Candidates {
    for target in targets.iter().filter(|t| t.has_version()) {
        candidates.retain(|package| package.id() != &target.id || package.identity == *target);
    }
    candidates
}

/// Keep only the highest version of `id`
pub fn prune_all_but_highest(mut candidates: Candidates, id: &PackageId) -> Candidates {
    let highest = candidates
        .iter()
        .filter(|p| p.id() == id)
        .filter_map(|p| p.version())
        .max()
        .cloned();

    if let Some(highest) = highest {
        candidates.retain(|package| package.id() != id || package.version() == Some(&highest));
    }
    candidates
}

/// Drop versions that move a component the constraints pin
pub fn prune_by_update_constraints(
    mut candidates: Candidates,
    references: &[PackageReference],
    constraints: UpdateConstraints,
) -> Candidates {
    if constraints == UpdateConstraints::default() {
        return candidates;
    }

    for reference in references {
        let Some(installed) = &reference.identity.version else {
            continue;
        };
        candidates.retain(|package| {
            if package.id() != &reference.identity.id {
                return true;
            }
            let Some(version) = package.version() else {
                return false;
            };
            !(constraints.exact_major && version.major != installed.major
                || constraints.exact_minor && version.minor != installed.minor
                || constraints.exact_patch && version.patch != installed.patch
                || constraints.exact_release
                    && !version
                        .release_label()
                        .eq_ignore_ascii_case(installed.release_label()))
        });
    }
    candidates
}
