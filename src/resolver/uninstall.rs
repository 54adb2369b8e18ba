// src/resolver/uninstall.rs

//! Uninstall impact analysis
//!
//! Works over the installed set only. Dependency edges count when the
//! installed version of the dependency satisfies the declared range.
//! The removal order lists dependents before the packages they depend on,
//! so uninstalling in order never leaves a package without a dependency.

use crate::error::{Error, Result};
use crate::package::{PackageIdentity, SourcePackageDependencyInfo};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use tracing::debug;

/// Options for computing an uninstall
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UninstallationContext {
    /// Also remove the target's dependencies
    pub remove_dependencies: bool,
    /// Remove even if installed dependents remain
    pub force_remove: bool,
}

impl UninstallationContext {
    pub fn new(remove_dependencies: bool, force_remove: bool) -> Self {
        Self {
            remove_dependencies,
            force_remove,
        }
    }
}

/// Forward and reverse dependency edges among installed packages
#[derive(Debug, Default)]
pub struct InstalledGraph {
    /// Package -> installed packages it depends on
    dependencies: HashMap<PackageIdentity, Vec<PackageIdentity>>,
    /// Package -> installed packages that depend on it
    dependents: HashMap<PackageIdentity, Vec<PackageIdentity>>,
}

impl InstalledGraph {
    /// Build the maps from dependency metadata for the installed packages
    pub fn build(
        dependency_info: &[SourcePackageDependencyInfo],
        installed: &[PackageIdentity],
    ) -> Self {
        let mut graph = Self::default();
        let installed_set: HashSet<&PackageIdentity> = installed.iter().collect();

        for info in dependency_info {
            if !installed_set.contains(&info.identity) {
                continue;
            }

            for dependency in &info.dependencies {
                let satisfied = installed.iter().find(|candidate| {
                    candidate.id == dependency.id
                        && candidate
                            .version
                            .as_ref()
                            .is_some_and(|v| dependency.version_range.satisfies(v))
                });

                let Some(target) = satisfied else {
                    continue;
                };

                push_unique(
                    graph.dependencies.entry(info.identity.clone()).or_default(),
                    target,
                );
                push_unique(
                    graph.dependents.entry(target.clone()).or_default(),
                    &info.identity,
                );
            }
        }

        graph
    }

    pub fn dependencies_of(&self, package: &PackageIdentity) -> &[PackageIdentity] {
        self.dependencies.get(package).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn dependents_of(&self, package: &PackageIdentity) -> &[PackageIdentity] {
        self.dependents.get(package).map(Vec::as_slice).unwrap_or(&[])
    }
}

fn push_unique(list: &mut Vec<PackageIdentity>, package: &PackageIdentity) {
    if !list.contains(package) {
        list.push(package.clone());
    }
}

/// Insertion-ordered set with "move to end"
#[derive(Default)]
struct RemovalOrder {
    positions: HashMap<PackageIdentity, u64>,
    ordered: BTreeMap<u64, PackageIdentity>,
    next: u64,
}

impl RemovalOrder {
    fn contains(&self, package: &PackageIdentity) -> bool {
        self.positions.contains_key(package)
    }

    /// Append, or move to the end when already present
    fn touch(&mut self, package: &PackageIdentity) {
        if let Some(old) = self.positions.insert(package.clone(), self.next) {
            self.ordered.remove(&old);
        }
        self.ordered.insert(self.next, package.clone());
        self.next += 1;
    }

    fn into_vec(self) -> Vec<PackageIdentity> {
        self.ordered.into_values().collect()
    }
}

/// Compute the packages to remove when uninstalling `target`
///
/// Fails with `DependentBlocksUninstall` when an installed package outside
/// the removal set still depends on something being removed, unless
/// `force_remove` is set.
pub fn compute_packages_to_uninstall(
    target: &PackageIdentity,
    dependency_info: &[SourcePackageDependencyInfo],
    installed: &[PackageIdentity],
    context: &UninstallationContext,
) -> Result<Vec<PackageIdentity>> {
    let graph = InstalledGraph::build(dependency_info, installed);
    let order = removal_order(target, &graph, context.remove_dependencies);

    if !context.force_remove {
        check_dependents(target, &graph, &order, context.remove_dependencies)?;
    }

    let packages = order.into_vec();
    debug!("Uninstalling {} removes {} packages", target, packages.len());
    Ok(packages)
}

fn removal_order(
    target: &PackageIdentity,
    graph: &InstalledGraph,
    remove_dependencies: bool,
) -> RemovalOrder {
    let mut order = RemovalOrder::default();
    let mut queued: HashSet<PackageIdentity> = HashSet::new();
    let mut queue = VecDeque::new();

    queued.insert(target.clone());
    queue.push_back(target.clone());

    while let Some(package) = queue.pop_front() {
        order.touch(&package);
        if !remove_dependencies {
            continue;
        }

        for dependency in graph.dependencies_of(&package) {
            if order.contains(dependency) {
                // Shared dependency: it has to go after this package too
                move_to_end(dependency, graph, &mut order, &mut HashSet::new());
            } else if queued.insert(dependency.clone()) {
                queue.push_back(dependency.clone());
            }
        }
    }

    order
}

/// Move a package and its already-ordered dependencies behind everything else
fn move_to_end(
    package: &PackageIdentity,
    graph: &InstalledGraph,
    order: &mut RemovalOrder,
    moved: &mut HashSet<PackageIdentity>,
) {
    if !moved.insert(package.clone()) {
        return;
    }
    order.touch(package);
    for dependency in graph.dependencies_of(package) {
        if order.contains(dependency) {
            move_to_end(dependency, graph, order, moved);
        }
    }
}

fn check_dependents(
    target: &PackageIdentity,
    graph: &InstalledGraph,
    order: &RemovalOrder,
    remove_dependencies: bool,
) -> Result<()> {
    let mut checked = HashSet::new();
    let mut pending = vec![target.clone()];

    while let Some(package) = pending.pop() {
        if !checked.insert(package.clone()) {
            continue;
        }

        let blocking: Vec<String> = graph
            .dependents_of(&package)
            .iter()
            .filter(|dependent| !order.contains(dependent))
            .map(PackageIdentity::dotted)
            .collect();

        if !blocking.is_empty() {
            return Err(Error::DependentBlocksUninstall {
                package: package.dotted(),
                dependents: blocking,
            });
        }

        if remove_dependencies {
            pending.extend(graph.dependencies_of(&package).iter().rev().cloned());
        }
    }

    Ok(())
}
