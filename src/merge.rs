//! Stub merging: overlaying a stub-derived tree (from `.pyi` files) onto the
//! matching source tree.
//!
//! Stub data takes precedence; source members not present in the stub are
//! preserved. Function signatures, attribute annotations, class bases,
//! exports, docstrings, and labels are overlaid; members existing only in the
//! stub are deep-copied in. Merging mutates the store, so it bumps the
//! generation and invalidates every cached resolution and linearization.

use thiserror::Error;

use crate::model::{Kind, Node, ObjectData};
use crate::store::{NodeId, SignatureStore};

/// Errors that can occur while merging stubs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    /// The stub declares a different kind of object than the source at the
    /// same path.
    #[error("kind mismatch at '{path}': source is {source_kind}, stub is {stub_kind}")]
    KindMismatch {
        path: String,
        source_kind: Kind,
        stub_kind: Kind,
    },
}

/// Overlay the stub tree rooted at `stub` onto the source tree rooted at
/// `target`.
pub fn merge_stubs(
    store: &mut SignatureStore,
    target: NodeId,
    stubs: &SignatureStore,
    stub: NodeId,
) -> Result<(), MergeError> {
    merge_node(store, target, stubs, stub)
}

fn merge_node(
    store: &mut SignatureStore,
    target: NodeId,
    stubs: &SignatureStore,
    stub: NodeId,
) -> Result<(), MergeError> {
    let Some(stub_object) = stubs.object(stub) else {
        return Ok(());
    };
    let (source_kind, path) = match store.object(target) {
        Some(object) => (object.kind(), store.path_of(target).unwrap_or_default()),
        None => return Ok(()),
    };
    let stub_kind = stub_object.kind();
    if source_kind != stub_kind {
        return Err(MergeError::KindMismatch {
            path,
            source_kind,
            stub_kind,
        });
    }

    if let Some(Node::Object(object)) = store.node_mut(target) {
        if let Some(docstring) = &stub_object.docstring {
            object.docstring = Some(docstring.clone());
        }
        object.labels.extend(stub_object.labels.iter().cloned());

        match (&mut object.data, &stub_object.data) {
            (
                ObjectData::Module { exports },
                ObjectData::Module {
                    exports: stub_exports,
                },
            ) => {
                if stub_exports.is_some() {
                    *exports = stub_exports.clone();
                }
            }
            (
                ObjectData::Class { bases, decorators },
                ObjectData::Class {
                    bases: stub_bases,
                    decorators: stub_decorators,
                },
            ) => {
                if !stub_bases.is_empty() {
                    *bases = stub_bases.clone();
                }
                if !stub_decorators.is_empty() {
                    *decorators = stub_decorators.clone();
                }
            }
            (
                ObjectData::Function {
                    parameters,
                    returns,
                    decorators,
                },
                ObjectData::Function {
                    parameters: stub_parameters,
                    returns: stub_returns,
                    decorators: stub_decorators,
                },
            ) => {
                // Signatures are overlaid wholesale; stubs are authoritative
                // for them.
                *parameters = stub_parameters.clone();
                *returns = stub_returns.clone();
                if !stub_decorators.is_empty() {
                    *decorators = stub_decorators.clone();
                }
            }
            (
                ObjectData::Attribute { annotation, value },
                ObjectData::Attribute {
                    annotation: stub_annotation,
                    value: stub_value,
                },
            ) => {
                if stub_annotation.is_some() {
                    *annotation = stub_annotation.clone();
                }
                if stub_value.is_some() {
                    *value = stub_value.clone();
                }
            }
            _ => {}
        }
    }
    store.bump_generation();

    let stub_members: Vec<(String, NodeId)> = stub_object
        .members
        .iter()
        .map(|(name, id)| (name.to_string(), id))
        .collect();
    for (name, stub_member) in stub_members {
        let existing = store
            .object(target)
            .and_then(|object| object.members.get(&name));
        match existing {
            Some(existing) => {
                let both_objects = store.node(existing).is_some_and(|node| !node.is_alias())
                    && stubs.node(stub_member).is_some_and(|node| !node.is_alias());
                if both_objects {
                    merge_node(store, existing, stubs, stub_member)?;
                } else {
                    // An alias on either side is replaced by the stub's view,
                    // keeping the declaration position.
                    store.copy_subtree(target, stubs, stub_member);
                }
            }
            None => {
                store.copy_subtree(target, stubs, stub_member);
            }
        }
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
