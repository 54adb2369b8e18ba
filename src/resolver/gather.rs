// src/resolver/gather.rs
//! Concurrent dependency gathering
//!
//! Collects every package version that could take part in a solution for
//! the primary targets. The coordinator owns the request queue, the
//! accumulated results and the set of searched ids. A bounded pool of
//! worker tasks performs the source queries and hands back results.
//!
//! The search frontier is recomputed after every wave of completed
//! requests and the run ends once the queue is empty and no worker is
//! outstanding.

use super::cache::GatherCache;
use super::context::GatherContext;
use crate::config::GatherSettings;
use crate::error::{Error, Result};
use crate::package::{
    DependencyBehavior, PackageId, PackageIdentity, SourcePackageDependencyInfo, TargetFramework,
};
use crate::source::{DependencyInfoResource, PackageSource, SourceRepository};
use futures::stream::{self, StreamExt};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Default number of concurrent source requests
pub const DEFAULT_MAX_DEGREE_OF_PARALLELISM: usize = 16;

/// Default per-request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// A source paired with its initialized accessor
#[derive(Clone)]
struct SourceResource {
    source: PackageSource,
    resource: Arc<dyn DependencyInfoResource>,
}

#[derive(Clone)]
struct GatherRequest {
    /// `None` for installed packages answered by the packages folder
    source: Option<SourceResource>,
    /// Without a version the request covers every version of the id
    package: PackageIdentity,
    ignore_exceptions: bool,
    order: u64,
    is_installed_package: bool,
}

struct GatherResult {
    request: GatherRequest,
    packages: Vec<SourcePackageDependencyInfo>,
    /// Time spent querying the source, `None` for cache hits
    elapsed: Option<Duration>,
}

struct Resources {
    primary: Vec<SourceResource>,
    all: Vec<SourceResource>,
    packages_folder: Arc<dyn DependencyInfoResource>,
}

#[derive(Debug, Clone, Copy)]
enum SourceSet {
    Primary,
    All,
}

/// Gathers candidate packages for a resolution attempt
pub struct ResolverGather {
    context: GatherContext,
    max_degree_of_parallelism: usize,
    request_timeout: Duration,
}

impl ResolverGather {
    pub fn new(context: GatherContext) -> Self {
        Self {
            context,
            max_degree_of_parallelism: DEFAULT_MAX_DEGREE_OF_PARALLELISM,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Set the worker pool size (at least one)
    pub fn with_max_degree_of_parallelism(mut self, max: usize) -> Self {
        self.max_degree_of_parallelism = max.max(1);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Apply loaded settings
    ///
    /// A source mapping in the settings replaces the one in the context.
    pub fn with_settings(mut self, settings: &GatherSettings) -> Result<Self> {
        settings.validate()?;
        self.max_degree_of_parallelism = settings.degree_of_parallelism();
        self.request_timeout = settings.request_timeout()?;
        if settings.source_mapping.is_enabled() {
            self.context.source_mapping = settings.source_mapping.clone();
        }
        Ok(self)
    }

    pub fn max_degree_of_parallelism(&self) -> usize {
        self.max_degree_of_parallelism
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn context(&self) -> &GatherContext {
        &self.context
    }

    /// Run the gather
    ///
    /// Returns each gathered package identity once. When several sources
    /// return the same identity, the one requested first wins.
    pub async fn gather(
        &self,
        token: &CancellationToken,
    ) -> Result<Vec<SourcePackageDependencyInfo>> {
        let started = Instant::now();
        ensure_not_cancelled(token)?;

        let resources = self.initialize_resources(token).await?;
        let mut run = GatherRun::new(self, resources);
        let combined = run.execute(token).await?;

        info!(
            "Gathered {} packages in {:.2?}",
            combined.len(),
            started.elapsed()
        );
        debug!("Summary of time taken to gather dependencies per source:");
        for (source, time) in &run.time_taken {
            debug!("{}\t-\t{:.2?}", source, time);
        }

        Ok(combined)
    }

    /// Create one accessor per distinct source
    async fn initialize_resources(&self, token: &CancellationToken) -> Result<Resources> {
        let context = &self.context;

        let mut ordered: Vec<Arc<dyn SourceRepository>> = context.primary_sources.clone();
        ordered.push(Arc::clone(&context.packages_folder_source));
        ordered.extend(context.all_sources.iter().cloned());

        let mut seen = HashSet::new();
        let unique: Vec<Arc<dyn SourceRepository>> = ordered
            .iter()
            .filter(|repo| seen.insert(repo.package_source().clone()))
            .cloned()
            .collect();

        debug!("Initializing {} package sources", unique.len());

        let pending = stream::iter(unique)
            .map(|repo| async move {
                let source = repo.package_source().clone();
                let resource = repo.dependency_info().await;
                (source, resource)
            })
            .buffer_unordered(self.max_degree_of_parallelism)
            .collect::<Vec<_>>();

        let initialized = tokio::select! {
            _ = token.cancelled() => return Err(Error::Cancelled),
            initialized = pending => initialized,
        };

        let mut by_source = HashMap::new();
        for (source, resource) in initialized {
            match resource {
                Ok(resource) => {
                    by_source.insert(source, resource);
                }
                Err(e) => {
                    return Err(Error::InitializationFailure {
                        source_url: source.source,
                        cause: Box::new(e),
                    });
                }
            }
        }

        let select = |repos: &[Arc<dyn SourceRepository>]| -> Vec<SourceResource> {
            let mut selected: Vec<SourceResource> = Vec::new();
            for repo in repos {
                let source = repo.package_source();
                if selected.iter().any(|s| &s.source == source) {
                    continue;
                }
                if let Some(resource) = by_source.get(source) {
                    selected.push(SourceResource {
                        source: source.clone(),
                        resource: Arc::clone(resource),
                    });
                }
            }
            selected
        };

        let primary = select(&context.primary_sources);
        let all = select(&ordered);
        let packages_folder = by_source
            .get(context.packages_folder_source.package_source())
            .cloned()
            .ok_or_else(|| Error::InitializationFailure {
                source_url: context.packages_folder_source.package_source().source.clone(),
                cause: Box::new(Error::Config("packages folder source unavailable".to_string())),
            })?;

        Ok(Resources {
            primary,
            all,
            packages_folder,
        })
    }
}

/// Gather with default settings
pub async fn gather(
    context: GatherContext,
    token: &CancellationToken,
) -> Result<Vec<SourcePackageDependencyInfo>> {
    ResolverGather::new(context).gather(token).await
}

/// Mutable state of one gather run, owned by the coordinator
struct GatherRun<'a> {
    gather: &'a ResolverGather,
    resources: Resources,
    queue: VecDeque<GatherRequest>,
    workers: JoinSet<Result<GatherResult>>,
    results: Vec<GatherResult>,
    ids_searched: HashSet<PackageId>,
    time_taken: BTreeMap<String, Duration>,
    next_order: u64,
}

impl<'a> GatherRun<'a> {
    fn new(gather: &'a ResolverGather, resources: Resources) -> Self {
        Self {
            gather,
            resources,
            queue: VecDeque::new(),
            workers: JoinSet::new(),
            results: Vec::new(),
            ids_searched: HashSet::new(),
            time_taken: BTreeMap::new(),
            next_order: 0,
        }
    }

    async fn execute(
        &mut self,
        token: &CancellationToken,
    ) -> Result<Vec<SourcePackageDependencyInfo>> {
        let gather = self.gather;
        let context = &gather.context;

        // Primary targets come from primary sources only
        let mut primary_ids: Vec<PackageId> = Vec::new();
        for target in &context.primary_targets {
            // Exact-version targets still block a later all-versions search
            self.ids_searched.insert(target.id.clone());
            if !primary_ids.contains(&target.id) {
                primary_ids.push(target.id.clone());
            }
            self.queue_work(SourceSet::Primary, target.clone(), false, false);
        }
        for id in &context.primary_target_ids {
            if !primary_ids.contains(id) {
                primary_ids.push(id.clone());
            }
            self.queue_work(
                SourceSet::Primary,
                PackageIdentity::any_version(id.clone()),
                false,
                false,
            );
        }

        self.start_workers(token);
        self.gather_installed_packages(&primary_ids, token).await?;

        loop {
            ensure_not_cancelled(token)?;
            self.start_tasks_and_process_work(token).await?;

            let mut current = merge_results(self.results.iter());
            if !context.allow_downgrades {
                current.retain(|package| !is_downgrade(package, &context.installed_packages));
            }

            // Installed packages may have come from a remote source
            let installed_info =
                merge_results(self.results.iter().filter(|r| r.request.is_installed_package));

            if context.dependency_behavior != DependencyBehavior::Ignore {
                let closure = closure_ids(&current, &installed_info, &self.ids_searched);
                for id in closure {
                    if !self.ids_searched.contains(&id) {
                        let package = PackageIdentity::any_version(id);
                        self.queue_work(SourceSet::All, package, true, false);
                    }
                }
            }

            if self.queue.is_empty() && self.workers.is_empty() {
                debug!("Total number of results gathered: {}", self.results.len());
                break;
            }
        }

        ensure_not_cancelled(token)?;

        let combined = merge_results(self.results.iter());

        if !context.is_update_all {
            for target_id in &primary_ids {
                if combined.iter().any(|package| package.id() == target_id) {
                    continue;
                }

                let target = context
                    .primary_targets
                    .iter()
                    .find(|t| &t.id == target_id)
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| target_id.to_string());
                let sources = self
                    .resources
                    .primary
                    .iter()
                    .map(|s| s.source.source.as_str())
                    .collect::<Vec<_>>()
                    .join(",");

                return Err(Error::PrimaryTargetNotFound { target, sources });
            }
        }

        Ok(combined)
    }

    /// Resolve installed packages from the packages folder
    ///
    /// Installed packages that are also primary targets are skipped so that
    /// upgrades and reinstalls see the remote versions.
    async fn gather_installed_packages(
        &mut self,
        primary_ids: &[PackageId],
        token: &CancellationToken,
    ) -> Result<()> {
        let gather = self.gather;
        let context = &gather.context;

        for installed in &context.installed_packages {
            if primary_ids.contains(&installed.id) {
                continue;
            }
            ensure_not_cancelled(token)?;

            let request_token = token.child_token();
            let lookup = self.resources.packages_folder.resolve_package(
                installed,
                &context.target_framework,
                &request_token,
            );
            let info = tokio::select! {
                _ = token.cancelled() => return Err(Error::Cancelled),
                found = tokio::time::timeout(gather.request_timeout, lookup) => match found {
                    Ok(found) => found?,
                    Err(_) => {
                        request_token.cancel();
                        let folder = context.packages_folder_source.package_source();
                        return Err(Error::SourceUnreachable {
                            package_id: installed.id.to_string(),
                            source_url: folder.source.clone(),
                            cause: Box::new(Error::Timeout(gather.request_timeout)),
                        });
                    }
                },
            };

            match info {
                Some(info) => {
                    let order = self.next_order;
                    self.next_order += 1;
                    self.results.push(GatherResult {
                        request: GatherRequest {
                            source: None,
                            package: installed.clone(),
                            ignore_exceptions: false,
                            order,
                            is_installed_package: true,
                        },
                        packages: vec![info],
                        elapsed: None,
                    });
                }
                None => {
                    debug!(
                        "Installed package {} not found locally, searching all sources",
                        installed
                    );
                    self.queue_work(SourceSet::All, installed.clone(), true, true);
                }
            }
        }

        Ok(())
    }

    /// Queue one request per eligible source
    fn queue_work(
        &mut self,
        set: SourceSet,
        package: PackageIdentity,
        ignore_exceptions: bool,
        is_installed_package: bool,
    ) {
        let gather = self.gather;
        let mapping = &gather.context.source_mapping;
        let configured = if mapping.is_enabled() {
            let configured = mapping.configured_sources(&package.id);
            if configured.is_empty() {
                debug!("Package source mapping match not found for package ID '{}'", package.id);
            } else {
                debug!(
                    "Package source mapping matches found for package ID '{}' are: '{}'",
                    package.id,
                    configured.join(", ")
                );
            }
            Some(configured)
        } else {
            None
        };

        // Exact versions never mark the id searched; the full version list
        // may still be needed once the id joins the closure
        if !(package.has_version() || self.ids_searched.insert(package.id.clone())) {
            return;
        }

        let sources = match set {
            SourceSet::Primary => &self.resources.primary,
            SourceSet::All => &self.resources.all,
        };

        for source in sources {
            if let Some(configured) = &configured
                && !configured
                    .iter()
                    .any(|name| name.eq_ignore_ascii_case(&source.source.name))
            {
                continue;
            }

            let order = self.next_order;
            self.next_order += 1;
            self.queue.push_back(GatherRequest {
                source: Some(source.clone()),
                package: package.clone(),
                ignore_exceptions,
                order,
                is_installed_package,
            });
        }
    }

    /// Fill the worker pool from the queue
    fn start_workers(&mut self, token: &CancellationToken) {
        let gather = self.gather;
        while self.workers.len() < gather.max_degree_of_parallelism {
            let Some(request) = self.queue.pop_front() else {
                break;
            };
            self.workers.spawn(gather_package(
                request,
                Arc::clone(&gather.context.cache),
                gather.context.target_framework.clone(),
                gather.request_timeout,
                token.clone(),
            ));
        }
    }

    /// Start queued work and integrate finished workers
    ///
    /// Waits for at least one worker, keeps going while the pool is full,
    /// then tops the pool back up.
    async fn start_tasks_and_process_work(&mut self, token: &CancellationToken) -> Result<()> {
        loop {
            ensure_not_cancelled(token)?;
            self.start_workers(token);

            if !self.workers.is_empty() {
                let joined = tokio::select! {
                    _ = token.cancelled() => return Err(Error::Cancelled),
                    joined = self.workers.join_next() => joined,
                };
                if let Some(joined) = joined {
                    self.integrate(joined)?;
                }
                while let Some(joined) = self.workers.try_join_next() {
                    self.integrate(joined)?;
                }
            }

            if self.workers.len() < self.gather.max_degree_of_parallelism {
                break;
            }
        }

        self.start_workers(token);
        Ok(())
    }

    fn integrate(
        &mut self,
        joined: std::result::Result<Result<GatherResult>, JoinError>,
    ) -> Result<()> {
        let result = joined.map_err(|e| Error::WorkerFailed(e.to_string()))??;

        if let (Some(elapsed), Some(source)) = (result.elapsed, &result.request.source) {
            *self
                .time_taken
                .entry(source.source.source.clone())
                .or_default() += elapsed;
        }

        self.results.push(result);
        Ok(())
    }
}

/// Answer one request from the cache or its source
async fn gather_package(
    request: GatherRequest,
    cache: Arc<GatherCache>,
    framework: TargetFramework,
    timeout: Duration,
    token: CancellationToken,
) -> Result<GatherResult> {
    let Some(source) = request.source.clone() else {
        return Ok(GatherResult {
            request,
            packages: Vec::new(),
            elapsed: None,
        });
    };

    let cached = if request.package.has_version() {
        cache.get_package(&source.source, &request.package, &framework)
    } else {
        cache.get_packages(&source.source, &request.package.id, &framework)
    };
    if cached.has_entry {
        debug!(
            "Package {} from source {} gathered from cache",
            request.package.id, source.source.name
        );
        return Ok(GatherResult {
            request,
            packages: cached.packages,
            elapsed: None,
        });
    }

    let started = Instant::now();
    let request_token = token.child_token();
    let fetch = fetch_from_source(&source.resource, &request.package, &framework, &request_token);
    let fetched = match tokio::time::timeout(timeout, fetch).await {
        Ok(fetched) => fetched,
        Err(_) => {
            request_token.cancel();
            Err(Error::Timeout(timeout))
        }
    };

    let packages = match fetched {
        Ok(packages) => packages,
        Err(_) if token.is_cancelled() => return Err(Error::Cancelled),
        Err(e) if request.ignore_exceptions => {
            // Secondary sources are often unreachable, e.g. an offline share
            debug!(
                "Ignoring failure for package {} from source {}: {}",
                request.package, source.source.source, e
            );
            Vec::new()
        }
        Err(e) => {
            return Err(Error::SourceUnreachable {
                package_id: request.package.id.to_string(),
                source_url: source.source.source.clone(),
                cause: Box::new(e),
            });
        }
    };

    if request.package.has_version() {
        cache.add_package(
            &source.source,
            &request.package,
            &framework,
            packages.first().cloned(),
        );
    } else {
        cache.add_all_packages(&source.source, &request.package.id, &framework, packages.clone());
    }

    Ok(GatherResult {
        request,
        packages,
        elapsed: Some(started.elapsed()),
    })
}

async fn fetch_from_source(
    resource: &Arc<dyn DependencyInfoResource>,
    package: &PackageIdentity,
    framework: &TargetFramework,
    token: &CancellationToken,
) -> Result<Vec<SourcePackageDependencyInfo>> {
    ensure_not_cancelled(token)?;
    if package.has_version() {
        let found = resource.resolve_package(package, framework, token).await?;
        Ok(found.into_iter().collect())
    } else {
        resource.resolve_packages(&package.id, framework, token).await
    }
}

fn ensure_not_cancelled(token: &CancellationToken) -> Result<()> {
    if token.is_cancelled() {
        Err(Error::Cancelled)
    } else {
        Ok(())
    }
}

/// Flatten results in request order, keeping the first copy of each identity
fn merge_results<'r>(
    results: impl Iterator<Item = &'r GatherResult>,
) -> Vec<SourcePackageDependencyInfo> {
    let mut ordered: Vec<&GatherResult> = results.collect();
    ordered.sort_by_key(|r| r.request.order);

    let mut seen = HashSet::new();
    ordered
        .into_iter()
        .flat_map(|r| r.packages.iter())
        .filter(|p| seen.insert(p.identity.clone()))
        .cloned()
        .collect()
}

fn is_downgrade(package: &SourcePackageDependencyInfo, installed: &[PackageIdentity]) -> bool {
    installed.iter().any(|i| {
        &i.id == package.id()
            && matches!((package.version(), &i.version), (Some(v), Some(iv)) if v < iv)
    })
}

/// Ids that still need an all-versions search
///
/// Union of the dependencies of searched packages, the parents of searched
/// packages, installed ids missing from the results and dependency ids
/// missing from the results. Already searched ids are included; callers
/// subtract them.
fn closure_ids(
    current: &[SourcePackageDependencyInfo],
    installed: &[SourcePackageDependencyInfo],
    ids_searched: &HashSet<PackageId>,
) -> BTreeSet<PackageId> {
    let mut closure = BTreeSet::new();

    closure.extend(
        current
            .iter()
            .filter(|p| ids_searched.contains(p.id()))
            .flat_map(|p| p.dependencies.iter().map(|d| d.id.clone())),
    );

    closure.extend(
        current
            .iter()
            .filter(|p| p.dependencies.iter().any(|d| ids_searched.contains(&d.id)))
            .map(|p| p.id().clone()),
    );

    let current_ids: HashSet<&PackageId> = current.iter().map(|p| p.id()).collect();

    closure.extend(
        installed
            .iter()
            .map(|p| p.id())
            .filter(|id| !current_ids.contains(id))
            .cloned(),
    );

    closure.extend(
        current
            .iter()
            .flat_map(|p| p.dependencies.iter())
            .map(|d| &d.id)
            .filter(|id| !current_ids.contains(id))
            .cloned(),
    );

    closure
}
