// Facade for the engine; each operation lives in its own submodule.

use log::Level;

use crate::adapters::StorageAdapter;
use crate::logging::{AuditSink, FactsEmitter};
use crate::policy::Policy;
use crate::resolve::{Env, PathResolver};
use crate::types::plan::OperationPlan;
use crate::types::report::{CleanupReport, CreateReport, MigrationReport, PathMap, ValidationReport};
use crate::types::safepath::PathStyle;
use crate::types::tree::TreeSpec;
use crate::types::ResolvedTree;

mod apply;
mod cleanup;
pub mod errors;
mod migrate;
pub mod options;
mod plan;
pub mod report;
mod validate;

use errors::ApiError;
use options::{CreateOptions, MigrateOptions};

/// Entry point for every tree operation.
///
/// Each call is a pure function of its arguments plus the engine's policy and
/// environment mapping; nothing is cached between calls.
///
/// ```no_run
/// use treewright::{TreeEngine, TreeSpec, CreateOptions};
/// use treewright::adapters::LocalAdapter;
/// use treewright::logging::JsonlSink;
/// use treewright::policy::Policy;
///
/// let engine = TreeEngine::new(JsonlSink::default(), JsonlSink::default(), Policy::default());
/// let spec = TreeSpec::from_yaml_str("uploads:\n  raw: {}\nREADME.txt: generated\n")?;
/// let report = engine.create_tree("./project_data", &spec, &LocalAdapter::new(), CreateOptions::default())?;
/// assert!(report.is_success());
/// println!("{}", report.tree["uploads"]["raw"].path);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct TreeEngine<E: FactsEmitter, A: AuditSink> {
    facts: E,
    audit: A,
    policy: Policy,
    env: Env,
}

impl<E: FactsEmitter, A: AuditSink> TreeEngine<E, A> {
    /// Engine with an empty environment mapping.
    pub fn new(facts: E, audit: A, policy: Policy) -> Self {
        Self {
            facts,
            audit,
            policy,
            env: Env::new(),
        }
    }

    /// Source for `$NAME`, `${NAME}` and `~` expansion.
    #[must_use]
    pub fn with_env(mut self, env: Env) -> Self {
        self.env = env;
        self
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn create_options(&self) -> CreateOptions {
        CreateOptions::from_policy(&self.policy)
    }

    pub fn migrate_options(&self) -> MigrateOptions {
        MigrateOptions::from_policy(&self.policy)
    }

    /// Resolve `spec` below `base` for the given path style.
    ///
    /// # Errors
    ///
    /// Unresolved variables, traversal attempts and invalid names.
    pub fn resolve(&self, base: &str, spec: &TreeSpec, style: PathStyle) -> Result<ResolvedTree, ApiError> {
        Ok(PathResolver::new(&self.env, style).resolve_tree(base, spec)?)
    }

    /// Resolve and plan without executing. Only `exists` is called on the adapter.
    ///
    /// # Errors
    ///
    /// Configuration errors from resolution.
    pub fn plan(&self, base: &str, spec: &TreeSpec, adapter: &dyn StorageAdapter) -> Result<OperationPlan, ApiError> {
        let tree = self.resolve(base, spec, adapter.path_style())?;
        let plan = plan::build(&tree, adapter);
        plan::emit_plan_facts(&self.facts, &plan);
        Ok(plan)
    }

    /// Materialize `spec` below `base`.
    ///
    /// Per-node failures are collected into the report; only configuration errors
    /// return `Err`, and they do so before anything is mutated.
    ///
    /// # Errors
    ///
    /// Unresolved variables, traversal attempts and invalid names.
    pub fn create_tree(
        &self,
        base: &str,
        spec: &TreeSpec,
        adapter: &dyn StorageAdapter,
        opts: CreateOptions,
    ) -> Result<CreateReport, ApiError> {
        let tree = self.resolve(base, spec, adapter.path_style())?;
        let plan = plan::build(&tree, adapter);
        plan::emit_plan_facts(&self.facts, &plan);
        Ok(apply::run(self, tree, plan, adapter, &opts))
    }

    /// Move everything stored at `src_base` on `src` to `dst_base` on `dst`.
    ///
    /// # Errors
    ///
    /// `NotFound` when the source does not exist; configuration errors; storage errors
    /// while discovering the source tree.
    pub fn migrate(
        &self,
        src_base: &str,
        dst_base: &str,
        src: &dyn StorageAdapter,
        dst: &dyn StorageAdapter,
        opts: MigrateOptions,
    ) -> Result<MigrationReport, ApiError> {
        migrate::run(self, src_base, dst_base, src, dst, &opts)
    }

    /// # Errors
    ///
    /// Configuration errors from resolution.
    pub fn validate(
        &self,
        base: &str,
        spec: &TreeSpec,
        adapter: &dyn StorageAdapter,
    ) -> Result<ValidationReport, ApiError> {
        let tree = self.resolve(base, spec, adapter.path_style())?;
        Ok(validate::run(self, &tree, adapter))
    }

    /// Flattened `key -> path` map with filesystem paths.
    ///
    /// # Errors
    ///
    /// Configuration errors and `FlattenKeyCollision`.
    pub fn flatten(&self, base: &str, spec: &TreeSpec) -> Result<PathMap, ApiError> {
        let tree = self.resolve(base, spec, PathStyle::Filesystem)?;
        Ok(report::flatten_tree(&tree, &self.policy.flatten.separator)?)
    }

    /// Indented outline of `spec`; no I/O.
    #[must_use]
    pub fn summarize(&self, spec: &TreeSpec) -> String {
        report::summarize_spec(spec)
    }

    /// Box-drawn rendering of what exists at `path`.
    pub fn summarize_existing(&self, path: &str, adapter: &dyn StorageAdapter, depth_limit: Option<usize>) -> String {
        let resolved = PathResolver::new(&self.env, adapter.path_style()).resolve_base(path);
        match resolved {
            Ok(p) => report::summarize_existing(adapter, &p, depth_limit, &self.policy.scan),
            Err(e) => {
                self.audit.log(Level::Warn, &format!("summarize_existing {path}: {e}"));
                format!("Path not found: {path}")
            }
        }
    }

    /// Delete the nodes of `spec` below `base`. Without `confirm` nothing is deleted.
    ///
    /// Undeclared entries are never removed; a declared directory holding any is kept.
    ///
    /// # Errors
    ///
    /// Configuration errors from resolution; these always precede any delete.
    pub fn cleanup(
        &self,
        base: &str,
        spec: &TreeSpec,
        adapter: &dyn StorageAdapter,
        confirm: bool,
    ) -> Result<CleanupReport, ApiError> {
        let tree = self.resolve(base, spec, adapter.path_style())?;
        Ok(cleanup::run(self, &tree, adapter, confirm))
    }
}
