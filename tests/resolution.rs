//! Alias resolution integration tests: cycle detection, cache idempotence,
//! and generation-stamped invalidation.

use pyrift::fixtures::{alias, function, params, store_with_root, submodule};
use pyrift::model::Object;
use pyrift::resolver::{resolve, resolve_all, resolve_path, ResolveError};
use pyrift::store::SignatureStore;

/// Cycles of length 1 through N always fail with a cycle error, never loop.
#[test]
fn cycles_of_any_length_are_detected() {
    for length in 1..=6 {
        let (mut store, root) = store_with_root("pkg");
        for i in 0..length {
            let next = (i + 1) % length;
            alias(&mut store, root, &format!("a{i}"), &format!("pkg.a{next}"));
        }
        let first = store.lookup_path("pkg.a0").unwrap();
        match resolve(&store, first) {
            Err(ResolveError::Cycle { cycle }) => {
                assert!(
                    cycle.len() >= length,
                    "cycle evidence too short for length {length}: {cycle:?}"
                );
                assert_eq!(cycle.first(), cycle.last());
            }
            other => panic!("length-{length} cycle not detected: {other:?}"),
        }
    }
}

/// A cycle reachable through a healthy prefix is still caught.
#[test]
fn cycle_behind_a_prefix_is_detected() {
    let (mut store, root) = store_with_root("pkg");
    alias(&mut store, root, "entry", "pkg.b");
    alias(&mut store, root, "b", "pkg.c");
    alias(&mut store, root, "c", "pkg.b");
    let entry = store.lookup_path("pkg.entry").unwrap();
    assert!(matches!(
        resolve(&store, entry),
        Err(ResolveError::Cycle { .. })
    ));
}

/// Same-generation re-resolution returns the identical node.
#[test]
fn resolution_is_idempotent_at_fixed_generation() {
    let (mut store, root) = store_with_root("pkg");
    let target = function(&mut store, root, "f", params([]));
    let redirect = alias(&mut store, root, "g", "pkg.f");

    let first = resolve(&store, redirect).unwrap();
    let second = resolve(&store, redirect).unwrap();
    assert_eq!(first, target);
    assert_eq!(first, second);
}

/// A structural mutation bumps the generation; stale cache entries are
/// recomputed instead of returned.
#[test]
fn mutation_invalidates_cached_resolutions() {
    let (mut store, root) = store_with_root("pkg");
    let original = function(&mut store, root, "f", params([]));
    let redirect = alias(&mut store, root, "g", "pkg.f");
    assert_eq!(resolve(&store, redirect).unwrap(), original);

    // Replace the target. The old cached node must not come back.
    assert!(store.remove_member(root, "f"));
    assert!(matches!(
        resolve(&store, redirect),
        Err(ResolveError::TargetNotFound { .. })
    ));

    let replacement = function(&mut store, root, "f", params([]));
    let resolved = resolve(&store, redirect).unwrap();
    assert_eq!(resolved, replacement);
    assert_ne!(resolved, original);
}

/// Re-exports chain across modules; resolution lands on the concrete object.
#[test]
fn chained_reexports_across_modules() {
    let (mut store, root) = store_with_root("pkg");
    let internal = submodule(&mut store, root, "internal");
    let public = submodule(&mut store, root, "api");
    let target = function(&mut store, internal, "impl_fn", params([]));
    alias(&mut store, public, "run", "pkg.internal.impl_fn");
    alias(&mut store, root, "run", "pkg.api.run");

    let top = store.lookup_path("pkg.run").unwrap();
    assert_eq!(resolve(&store, top).unwrap(), target);
}

#[test]
fn resolve_path_walks_through_aliased_modules() {
    let (mut store, root) = store_with_root("pkg");
    let inner = submodule(&mut store, root, "inner");
    let target = function(&mut store, inner, "f", params([]));
    alias(&mut store, root, "shortcut", "pkg.inner");

    assert_eq!(resolve_path(&store, "pkg.shortcut.f").unwrap(), target);
}

#[test]
fn builtin_targets_fail_with_dedicated_error() {
    let (mut store, root) = store_with_root("pkg");
    let builtin = alias(&mut store, root, "path_sep", "sys.path");
    let external = alias(&mut store, root, "arr", "numpy.ndarray");

    assert!(matches!(
        resolve(&store, builtin),
        Err(ResolveError::BuiltinModule { .. })
    ));
    assert!(matches!(
        resolve(&store, external),
        Err(ResolveError::TargetNotFound { .. })
    ));
}

#[test]
fn custom_builtin_modules_extend_the_set() {
    let mut store = SignatureStore::new().with_builtin_modules(["_native_ext"]);
    let root = store.add_root_module("pkg");
    let redirect = store.add_member(root, pyrift::model::Alias::new("x", "_native_ext.x"));
    match resolve(&store, redirect) {
        Err(ResolveError::BuiltinModule { module, .. }) => assert_eq!(module, "_native_ext"),
        other => panic!("expected builtin module error, got {other:?}"),
    }
}

/// Bulk resolution caches what it can and reports the rest without stopping.
#[test]
fn resolve_all_is_best_effort() {
    let (mut store, root) = store_with_root("pkg");
    function(&mut store, root, "f", params([]));
    alias(&mut store, root, "good", "pkg.f");
    alias(&mut store, root, "dangling", "pkg.gone");
    alias(&mut store, root, "loop", "pkg.loop");

    let report = resolve_all(&store);
    assert_eq!(report.resolved, 1);
    assert_eq!(report.failures.len(), 2);

    let stats = store.stats();
    assert_eq!(stats.aliases, 3);
    assert_eq!(stats.resolved_aliases, 1);
    assert_eq!(stats.unresolved_aliases, 2);
}

/// The store construction API replaces same-name members in place, and the
/// resolver observes the replacement.
#[test]
fn replacement_members_resolve_to_the_new_node() {
    let (mut store, root) = store_with_root("pkg");
    function(&mut store, root, "f", params([]));
    let redirect = alias(&mut store, root, "g", "pkg.f");
    let class = store.add_member(root, Object::class("f", vec![]));

    assert_eq!(resolve(&store, redirect).unwrap(), class);
}
