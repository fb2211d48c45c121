//! Alias resolution: following redirects to their ultimate concrete target.
//!
//! Resolution walks the store's namespace one dotted component at a time,
//! following intermediate aliases on the way down. A per-call stack of visited
//! paths detects cycles; successes are memoized in the store's
//! generation-stamped resolution cache, so a store mutation invalidates every
//! cached target at once.
//!
//! The strict entry point is [`resolve`]; [`safe_resolve`] never fails and is
//! what the diff engine and other best-effort consumers use.

use thiserror::Error;

use crate::model::AliasTarget;
use crate::store::{NodeId, SignatureStore};

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during alias resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// The target path cannot be found in the loaded store (unloaded or
    /// nonexistent module/member). Recoverable via [`safe_resolve`].
    #[error("cannot resolve '{target}' (alias '{alias}'): target not found in loaded modules")]
    TargetNotFound { alias: String, target: String },

    /// Resolution revisited a path already on its own stack. Always indicates
    /// a malformed or deliberately self-referential alias graph.
    #[error("cyclic alias resolution: {}", cycle.join(" -> "))]
    Cycle { cycle: Vec<String> },

    /// The target lives in a module known to be non-analyzable, so there is
    /// no tree to walk. Distinct from [`ResolveError::TargetNotFound`] so
    /// callers can silently skip builtins.
    #[error("cannot resolve '{target}': module '{module}' is a non-analyzable builtin")]
    BuiltinModule { target: String, module: String },
}

/// Result type for resolution operations.
pub type ResolveResult<T> = Result<T, ResolveError>;

// ============================================================================
// Resolution
// ============================================================================

/// Resolve a node to its ultimate concrete target.
///
/// Concrete objects resolve to themselves. Aliases are followed through any
/// number of hops; the result is cached on the store, stamped with the current
/// generation, so same-generation re-resolution does not re-walk.
pub fn resolve(store: &SignatureStore, id: NodeId) -> ResolveResult<NodeId> {
    let mut stack = Vec::new();
    deref(store, id, &mut stack)
}

/// Resolve a node, returning `None` on any failure.
///
/// The failure is logged at debug level; nothing is silently swallowed.
pub fn safe_resolve(store: &SignatureStore, id: NodeId) -> Option<NodeId> {
    match resolve(store, id) {
        Ok(target) => Some(target),
        Err(error) => {
            tracing::debug!(node = %id, %error, "alias resolution failed");
            None
        }
    }
}

/// Resolve an absolute dotted path, following aliases at every hop.
pub fn resolve_path(store: &SignatureStore, path: &str) -> ResolveResult<NodeId> {
    let mut stack = Vec::new();
    walk(store, path, path, &mut stack)
}

/// Scope-aware resolution of a (possibly dotted) name.
///
/// Walks the parent chain from `scope` looking for the first component among
/// each ancestor's members, then falls back to an absolute walk from the
/// roots. This is how base-class expressions are turned into class nodes: a
/// bare `Base` usually names a sibling or an import in the enclosing module.
pub fn resolve_name(store: &SignatureStore, scope: NodeId, name: &str) -> Option<NodeId> {
    let mut components = name.split('.');
    let first = components.next()?;
    let rest: Vec<&str> = components.collect();

    let mut cursor = Some(scope);
    while let Some(id) = cursor {
        let node = store.node(id)?;
        if let Some(object) = node.as_object() {
            if let Some(member) = object.members.get(first) {
                if let Some(found) = walk_members(store, member, &rest) {
                    return Some(found);
                }
            }
        }
        cursor = node.parent();
    }

    match resolve_path(store, name) {
        Ok(target) => Some(target),
        Err(error) => {
            tracing::debug!(name, %error, "scope-aware resolution failed");
            None
        }
    }
}

fn walk_members(store: &SignatureStore, start: NodeId, components: &[&str]) -> Option<NodeId> {
    let mut current = safe_resolve(store, start)?;
    for component in components {
        current = store.object(current)?.members.get(component)?;
        current = safe_resolve(store, current)?;
    }
    Some(current)
}

// ============================================================================
// Bulk Resolution
// ============================================================================

/// Outcome of a bulk resolution pass over every alias in a store.
#[derive(Debug, Default)]
pub struct ResolutionReport {
    /// Aliases resolved (and cached) by this pass.
    pub resolved: usize,
    /// Aliases left unresolved, with the path of each failing alias.
    pub failures: Vec<(String, ResolveError)>,
}

/// Resolve every alias in the store, populating the resolution cache.
///
/// Failures do not stop the pass; each is recorded in the report. Running
/// this before a diff removes all cache-write contention from the traversal.
pub fn resolve_all(store: &SignatureStore) -> ResolutionReport {
    let alias_ids: Vec<NodeId> = store
        .nodes()
        .filter(|(_, node)| node.is_alias())
        .map(|(id, _)| id)
        .collect();
    tracing::info!(
        aliases = alias_ids.len(),
        generation = store.generation(),
        "resolving aliases"
    );

    let mut report = ResolutionReport::default();
    for id in alias_ids {
        match resolve(store, id) {
            Ok(_) => report.resolved += 1,
            Err(error) => {
                let path = store.path_of(id).unwrap_or_else(|| id.to_string());
                tracing::debug!(alias = %path, %error, "alias left unresolved");
                report.failures.push((path, error));
            }
        }
    }

    if report.failures.is_empty() {
        tracing::info!(resolved = report.resolved, "all aliases resolved");
    } else {
        tracing::info!(
            resolved = report.resolved,
            unresolved = report.failures.len(),
            "some aliases could not be resolved"
        );
    }
    report
}

// ============================================================================
// Internals
// ============================================================================

/// Follow a node to a concrete object, pushing each visited alias path onto
/// the per-call stack for cycle detection.
fn deref(store: &SignatureStore, id: NodeId, stack: &mut Vec<String>) -> ResolveResult<NodeId> {
    let Some(node) = store.node(id) else {
        return Err(ResolveError::TargetNotFound {
            alias: id.to_string(),
            target: id.to_string(),
        });
    };
    let Some(alias) = node.as_alias() else {
        return Ok(id);
    };

    let path = store.path_of(id).unwrap_or_else(|| alias.name.clone());
    if stack.iter().any(|visited| *visited == path) {
        let mut cycle = stack.clone();
        cycle.push(path);
        return Err(ResolveError::Cycle { cycle });
    }
    stack.push(path.clone());

    let result = if let Some(cached) = store.cached_resolution(id) {
        Ok(cached)
    } else {
        match &alias.target {
            AliasTarget::Bound(bound) => deref(store, *bound, stack),
            AliasTarget::Path(target) => walk(store, &path, target, stack),
        }
    };
    stack.pop();

    let target = result?;
    store.record_resolution(id, target);
    Ok(target)
}

/// Walk a dotted target path from the store roots, dereferencing aliases at
/// every hop.
fn walk(
    store: &SignatureStore,
    origin: &str,
    target: &str,
    stack: &mut Vec<String>,
) -> ResolveResult<NodeId> {
    let not_found = || ResolveError::TargetNotFound {
        alias: origin.to_string(),
        target: target.to_string(),
    };

    let mut components = target.split('.');
    let first = components.next().filter(|c| !c.is_empty()).ok_or_else(not_found)?;
    let mut current = match store.root(first) {
        Some(id) => id,
        None if store.is_builtin_module(first) => {
            return Err(ResolveError::BuiltinModule {
                target: target.to_string(),
                module: first.to_string(),
            });
        }
        None => return Err(not_found()),
    };

    for component in components {
        current = deref(store, current, stack)?;
        let object = store.object(current).ok_or_else(not_found)?;
        current = object.members.get(component).ok_or_else(not_found)?;
    }

    // The final member may itself be an alias.
    deref(store, current, stack)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Alias, Object, Parameters};

    fn store_with_function() -> (SignatureStore, NodeId, NodeId) {
        let mut store = SignatureStore::new();
        let pkg = store.add_root_module("pkg");
        let function = store.add_member(pkg, Object::function("f", Parameters::new()));
        (store, pkg, function)
    }

    #[test]
    fn test_resolve_concrete_object_is_identity() {
        let (store, _, function) = store_with_function();
        assert_eq!(resolve(&store, function).unwrap(), function);
    }

    #[test]
    fn test_resolve_single_hop() {
        let (mut store, pkg, function) = store_with_function();
        let alias = store.add_member(pkg, Alias::new("g", "pkg.f"));
        assert_eq!(resolve(&store, alias).unwrap(), function);
    }

    #[test]
    fn test_resolve_chained_hops() {
        let (mut store, pkg, function) = store_with_function();
        store.add_member(pkg, Alias::new("g", "pkg.f"));
        let outer = store.add_member(pkg, Alias::new("h", "pkg.g"));
        assert_eq!(resolve(&store, outer).unwrap(), function);
    }

    #[test]
    fn test_resolve_bound_target() {
        let (mut store, pkg, function) = store_with_function();
        let alias = store.add_member(pkg, Alias::new("g", "unused"));
        store.bind_alias(alias, function);
        assert_eq!(resolve(&store, alias).unwrap(), function);
    }

    #[test]
    fn test_self_cycle_detected() {
        let (mut store, pkg, _) = store_with_function();
        let alias = store.add_member(pkg, Alias::new("me", "pkg.me"));
        match resolve(&store, alias) {
            Err(ResolveError::Cycle { cycle }) => {
                assert_eq!(cycle.first().map(String::as_str), Some("pkg.me"));
                assert_eq!(cycle.last().map(String::as_str), Some("pkg.me"));
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_unloaded_module_is_target_not_found() {
        let (mut store, pkg, _) = store_with_function();
        let alias = store.add_member(pkg, Alias::new("np", "numpy.ndarray"));
        assert!(matches!(
            resolve(&store, alias),
            Err(ResolveError::TargetNotFound { .. })
        ));
    }

    #[test]
    fn test_builtin_module_is_distinguished() {
        let (mut store, pkg, _) = store_with_function();
        let alias = store.add_member(pkg, Alias::new("maxsize", "sys.maxsize"));
        match resolve(&store, alias) {
            Err(ResolveError::BuiltinModule { module, .. }) => assert_eq!(module, "sys"),
            other => panic!("expected builtin module error, got {other:?}"),
        }
    }

    #[test]
    fn test_safe_resolve_returns_none_on_failure() {
        let (mut store, pkg, _) = store_with_function();
        let alias = store.add_member(pkg, Alias::new("missing", "pkg.nope"));
        assert_eq!(safe_resolve(&store, alias), None);
    }

    #[test]
    fn test_resolve_path_follows_intermediate_alias() {
        let mut store = SignatureStore::new();
        let pkg = store.add_root_module("pkg");
        let module = store.add_member(pkg, Object::module("mod"));
        let class = store.add_member(module, Object::class("C", vec![]));
        store.add_member(pkg, Alias::new("m2", "pkg.mod"));
        assert_eq!(resolve_path(&store, "pkg.m2.C").unwrap(), class);
    }

    #[test]
    fn test_resolve_name_prefers_enclosing_scope() {
        let mut store = SignatureStore::new();
        let pkg = store.add_root_module("pkg");
        let module = store.add_member(pkg, Object::module("mod"));
        let local = store.add_member(module, Object::class("Base", vec![]));
        let class = store.add_member(module, Object::class("C", vec![]));
        assert_eq!(resolve_name(&store, class, "Base"), Some(local));
    }

    #[test]
    fn test_resolve_name_falls_back_to_absolute() {
        let mut store = SignatureStore::new();
        let pkg = store.add_root_module("pkg");
        let other = store.add_root_module("other");
        let base = store.add_member(other, Object::class("Base", vec![]));
        let class = store.add_member(pkg, Object::class("C", vec![]));
        assert_eq!(resolve_name(&store, class, "other.Base"), Some(base));
    }

    #[test]
    fn test_resolve_all_reports_failures() {
        let (mut store, pkg, _) = store_with_function();
        store.add_member(pkg, Alias::new("ok", "pkg.f"));
        store.add_member(pkg, Alias::new("bad", "pkg.nope"));
        let report = resolve_all(&store);
        assert_eq!(report.resolved, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, "pkg.bad");
    }
}
