//! Method Resolution Order computation using C3 linearization.
//!
//! Inherited-member lookup under multiple inheritance needs a deterministic
//! ancestor order. C3 linearization guarantees:
//!
//! - a class precedes all of its ancestors,
//! - the local base order given at each class is preserved,
//! - a consistent ordering exists across the hierarchy, or the computation
//!   fails.
//!
//! Base expressions are resolved through the alias resolver before the merge,
//! so `class C(mod.Base)` and `from mod import Base as B; class C(B)` both
//! linearize through the same class node. Bases that cannot be resolved to a
//! class in the store (external packages, builtins) are excluded from the
//! merge and recorded in [`Linearization::unresolved`], so lookups know the
//! ancestor set may be incomplete.
//!
//! Identity is [`NodeId`], so same-named classes from different modules stay
//! distinct.

use std::collections::HashSet;

use thiserror::Error;

use crate::model::{Kind, Node};
use crate::resolver::{resolve_name, safe_resolve};
use crate::store::{NodeId, SignatureStore};

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during linearization.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MroError {
    /// The inheritance hierarchy is self-contradictory (no valid C3
    /// linearization exists), or contains an inheritance cycle.
    #[error("inconsistent hierarchy for class '{class}': cannot compute a linearization")]
    InconsistentHierarchy { class: String },
}

/// Result type for linearization operations.
pub type MroResult<T> = Result<T, MroError>;

// ============================================================================
// Linearization
// ============================================================================

/// A class's ancestor order, the class itself first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Linearization {
    /// The class and its ancestors in C3 order.
    pub order: Vec<NodeId>,
    /// Base expressions that could not be resolved to class nodes. A
    /// non-empty list means the ancestor set is incomplete.
    pub unresolved: Vec<String>,
}

impl Linearization {
    /// Whether every base in the hierarchy was resolved.
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Compute the Method Resolution Order for a class.
///
/// A pure function of the resolved base lists: identical base orders always
/// produce identical results. Results are cached on the store, stamped with
/// the current generation.
pub fn linearize(store: &SignatureStore, class: NodeId) -> MroResult<Linearization> {
    let mut visited = HashSet::new();
    linearize_inner(store, class, &mut visited)
}

fn linearize_inner(
    store: &SignatureStore,
    class: NodeId,
    visited: &mut HashSet<NodeId>,
) -> MroResult<Linearization> {
    if let Some(cached) = store.cached_linearization(class) {
        return Ok(cached);
    }

    let inconsistent = || MroError::InconsistentHierarchy {
        class: store
            .path_of(class)
            .unwrap_or_else(|| class.to_string()),
    };

    // An inheritance cycle shows up as a revisit during recursion.
    if !visited.insert(class) {
        return Err(inconsistent());
    }

    let Some(object) = store.object(class) else {
        visited.remove(&class);
        return Err(inconsistent());
    };
    let scope = object.parent.unwrap_or(class);

    let mut unresolved: Vec<String> = Vec::new();
    let mut direct_bases: Vec<NodeId> = Vec::new();
    for base in object.bases() {
        match resolve_base(store, scope, base.text()) {
            Some(id) => direct_bases.push(id),
            None => {
                tracing::debug!(
                    class = %store.path_of(class).unwrap_or_default(),
                    base = base.text(),
                    "base could not be resolved to a class; ancestor set incomplete"
                );
                unresolved.push(base.text().to_string());
            }
        }
    }

    let mut seqs: Vec<Vec<NodeId>> = Vec::new();
    for &base in &direct_bases {
        let base_linearization = linearize_inner(store, base, visited)?;
        unresolved.extend(base_linearization.unresolved);
        seqs.push(base_linearization.order);
    }
    seqs.push(direct_bases);

    let mut order = vec![class];
    match merge(&mut seqs) {
        Some(merged) => order.extend(merged),
        None => {
            visited.remove(&class);
            return Err(inconsistent());
        }
    }

    visited.remove(&class);
    let linearization = Linearization { order, unresolved };
    store.record_linearization(class, linearization.clone());
    Ok(linearization)
}

/// Resolve a base expression to a class node, following aliases safely.
fn resolve_base(store: &SignatureStore, scope: NodeId, name: &str) -> Option<NodeId> {
    let found = resolve_name(store, scope, name)?;
    let concrete = safe_resolve(store, found)?;
    match store.node(concrete) {
        Some(Node::Object(object)) if object.kind() == Kind::Class => Some(concrete),
        _ => None,
    }
}

/// C3 merge: repeatedly take the head of the first list whose head does not
/// appear in the tail of any other list. No eligible head means the hierarchy
/// is inconsistent.
fn merge(seqs: &mut Vec<Vec<NodeId>>) -> Option<Vec<NodeId>> {
    let mut result = Vec::new();

    loop {
        seqs.retain(|seq| !seq.is_empty());
        if seqs.is_empty() {
            return Some(result);
        }

        let mut candidate = None;
        for seq in seqs.iter() {
            let head = seq[0];
            let in_tail = seqs.iter().any(|s| s.len() > 1 && s[1..].contains(&head));
            if !in_tail {
                candidate = Some(head);
                break;
            }
        }

        let candidate = candidate?;
        result.push(candidate);
        for seq in seqs.iter_mut() {
            if seq.first() == Some(&candidate) {
                seq.remove(0);
            }
        }
    }
}

// ============================================================================
// Member Lookup
// ============================================================================

/// Answer "does class C (or an ancestor) define member M", walking the
/// linearization and resolving alias members safely.
///
/// When the class cannot be linearized, only its own members are consulted.
pub fn lookup_member(store: &SignatureStore, class: NodeId, name: &str) -> Option<NodeId> {
    let order = match linearize(store, class) {
        Ok(linearization) => linearization.order,
        Err(error) => {
            tracing::debug!(%error, "falling back to own members only");
            vec![class]
        }
    };
    for ancestor in order {
        if let Some(member) = store.object(ancestor)?.members.get(name) {
            if let Some(concrete) = safe_resolve(store, member) {
                return Some(concrete);
            }
        }
    }
    None
}

// ============================================================================
// Tests
// ============================================================================
