//! Breaking-change detection between two signature stores.
//!
//! [`find_breaking_changes`] walks two independently-built stores in
//! lock-step, matching members by path, and yields one typed [`Breakage`] per
//! backward-incompatible difference. Ordinary structural differences are
//! findings, never errors: the engine uses only the safe resolver variant, so
//! a single unresolved reference skips one comparison instead of aborting the
//! traversal.
//!
//! The output is a lazy iterator driven by an explicit worklist. Finiteness
//! is bounded by graph size through a seen-pair set; cancellation is dropping
//! the iterator. The engine holds no state across calls.

use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::expr::Expr;
use crate::model::{Kind, ObjectData, ParameterKind, Parameters};
use crate::mro::{linearize, lookup_member};
use crate::resolver::safe_resolve;
use crate::store::{NodeId, SignatureStore};

// ============================================================================
// Breakage Taxonomy
// ============================================================================

/// Stable tags for the breakage taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakageKind {
    ObjectRemoved,
    ObjectChangedKind,
    ClassRemovedBase,
    ReturnChangedType,
    AttributeChangedType,
    AttributeChangedValue,
    ParameterChangedRequired,
    ParameterChangedKind,
    ParameterChangedDefault,
    ParameterMoved,
    ParameterRemoved,
    ParameterAddedRequired,
}

impl BreakageKind {
    /// The snake_case tag, as used in serialized reports.
    pub fn as_str(self) -> &'static str {
        match self {
            BreakageKind::ObjectRemoved => "object_removed",
            BreakageKind::ObjectChangedKind => "object_changed_kind",
            BreakageKind::ClassRemovedBase => "class_removed_base",
            BreakageKind::ReturnChangedType => "return_changed_type",
            BreakageKind::AttributeChangedType => "attribute_changed_type",
            BreakageKind::AttributeChangedValue => "attribute_changed_value",
            BreakageKind::ParameterChangedRequired => "parameter_changed_required",
            BreakageKind::ParameterChangedKind => "parameter_changed_kind",
            BreakageKind::ParameterChangedDefault => "parameter_changed_default",
            BreakageKind::ParameterMoved => "parameter_moved",
            BreakageKind::ParameterRemoved => "parameter_removed",
            BreakageKind::ParameterAddedRequired => "parameter_added_required",
        }
    }
}

impl std::fmt::Display for BreakageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One backward-incompatible API change.
///
/// Every variant carries the affected object's dotted path plus enough
/// kind-specific detail to render a report without re-walking the graphs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Breakage {
    /// A public object present in the old graph is gone from the new one.
    ObjectRemoved { path: String },
    /// Same name, different kind (e.g. was a function, now an attribute).
    ObjectChangedKind {
        path: String,
        old_kind: Kind,
        new_kind: Kind,
    },
    /// A class lost an ancestor; `isinstance` assumptions break.
    ClassRemovedBase { path: String, base: String },
    /// A function's return annotation changed.
    ReturnChangedType {
        path: String,
        old_returns: Expr,
        new_returns: Expr,
    },
    /// An attribute's annotation changed.
    AttributeChangedType {
        path: String,
        old_annotation: Expr,
        new_annotation: Expr,
    },
    /// An attribute's literal value changed.
    AttributeChangedValue {
        path: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        old_value: Option<Expr>,
        #[serde(skip_serializing_if = "Option::is_none")]
        new_value: Option<Expr>,
    },
    /// A parameter flipped from optional to required.
    ParameterChangedRequired { path: String, parameter: String },
    /// A parameter's kind tightened.
    ParameterChangedKind {
        path: String,
        parameter: String,
        old_kind: ParameterKind,
        new_kind: ParameterKind,
    },
    /// A parameter's default value changed.
    ParameterChangedDefault {
        path: String,
        parameter: String,
        old_default: Expr,
        new_default: Expr,
    },
    /// A parameter is still positionally callable but at a different index.
    ParameterMoved {
        path: String,
        parameter: String,
        old_position: usize,
        new_position: usize,
    },
    /// A parameter is gone and no catch-all can absorb it.
    ParameterRemoved { path: String, parameter: String },
    /// A new required parameter old call sites cannot supply.
    ParameterAddedRequired { path: String, parameter: String },
}

impl Breakage {
    /// The stable kind tag for this finding.
    pub fn kind(&self) -> BreakageKind {
        match self {
            Breakage::ObjectRemoved { .. } => BreakageKind::ObjectRemoved,
            Breakage::ObjectChangedKind { .. } => BreakageKind::ObjectChangedKind,
            Breakage::ClassRemovedBase { .. } => BreakageKind::ClassRemovedBase,
            Breakage::ReturnChangedType { .. } => BreakageKind::ReturnChangedType,
            Breakage::AttributeChangedType { .. } => BreakageKind::AttributeChangedType,
            Breakage::AttributeChangedValue { .. } => BreakageKind::AttributeChangedValue,
            Breakage::ParameterChangedRequired { .. } => BreakageKind::ParameterChangedRequired,
            Breakage::ParameterChangedKind { .. } => BreakageKind::ParameterChangedKind,
            Breakage::ParameterChangedDefault { .. } => BreakageKind::ParameterChangedDefault,
            Breakage::ParameterMoved { .. } => BreakageKind::ParameterMoved,
            Breakage::ParameterRemoved { .. } => BreakageKind::ParameterRemoved,
            Breakage::ParameterAddedRequired { .. } => BreakageKind::ParameterAddedRequired,
        }
    }

    /// The affected object's dotted path.
    pub fn path(&self) -> &str {
        match self {
            Breakage::ObjectRemoved { path }
            | Breakage::ObjectChangedKind { path, .. }
            | Breakage::ClassRemovedBase { path, .. }
            | Breakage::ReturnChangedType { path, .. }
            | Breakage::AttributeChangedType { path, .. }
            | Breakage::AttributeChangedValue { path, .. }
            | Breakage::ParameterChangedRequired { path, .. }
            | Breakage::ParameterChangedKind { path, .. }
            | Breakage::ParameterChangedDefault { path, .. }
            | Breakage::ParameterMoved { path, .. }
            | Breakage::ParameterRemoved { path, .. }
            | Breakage::ParameterAddedRequired { path, .. } => path,
        }
    }
}

fn value_text(value: &Option<Expr>) -> &str {
    value.as_ref().map_or("unset", Expr::text)
}

impl std::fmt::Display for Breakage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Breakage::ObjectRemoved { path } => {
                write!(f, "{path}: public object removed")
            }
            Breakage::ObjectChangedKind {
                path,
                old_kind,
                new_kind,
            } => {
                write!(f, "{path}: kind changed from {old_kind} to {new_kind}")
            }
            Breakage::ClassRemovedBase { path, base } => {
                write!(f, "{path}: base class '{base}' removed")
            }
            Breakage::ReturnChangedType {
                path,
                old_returns,
                new_returns,
            } => {
                write!(
                    f,
                    "{path}: return type changed from '{old_returns}' to '{new_returns}'"
                )
            }
            Breakage::AttributeChangedType {
                path,
                old_annotation,
                new_annotation,
            } => {
                write!(
                    f,
                    "{path}: type changed from '{old_annotation}' to '{new_annotation}'"
                )
            }
            Breakage::AttributeChangedValue {
                path,
                old_value,
                new_value,
            } => {
                write!(
                    f,
                    "{path}: value changed from '{}' to '{}'",
                    value_text(old_value),
                    value_text(new_value)
                )
            }
            Breakage::ParameterChangedRequired { path, parameter } => {
                write!(f, "{path}: parameter '{parameter}' became required")
            }
            Breakage::ParameterChangedKind {
                path,
                parameter,
                old_kind,
                new_kind,
            } => {
                write!(
                    f,
                    "{path}: parameter '{parameter}' changed kind from {old_kind} to {new_kind}"
                )
            }
            Breakage::ParameterChangedDefault {
                path,
                parameter,
                old_default,
                new_default,
            } => {
                write!(
                    f,
                    "{path}: parameter '{parameter}' default changed from '{old_default}' to '{new_default}'"
                )
            }
            Breakage::ParameterMoved {
                path,
                parameter,
                old_position,
                new_position,
            } => {
                write!(
                    f,
                    "{path}: parameter '{parameter}' moved from position {old_position} to {new_position}"
                )
            }
            Breakage::ParameterRemoved { path, parameter } => {
                write!(f, "{path}: parameter '{parameter}' removed")
            }
            Breakage::ParameterAddedRequired { path, parameter } => {
                write!(f, "{path}: required parameter '{parameter}' added")
            }
        }
    }
}

// ============================================================================
// Entry Points
// ============================================================================

/// Find every breaking change between two stores, matching top-level modules
/// by name.
///
/// The returned iterator is lazy: consumers may stop early and no further
/// work is performed.
pub fn find_breaking_changes<'a>(
    old: &'a SignatureStore,
    new: &'a SignatureStore,
) -> Breakages<'a> {
    let mut breakages = Breakages::new(old, new);
    for root in old.roots() {
        if !old.is_public(root) {
            continue;
        }
        let Some(name) = old.name_of(root) else {
            continue;
        };
        match new.root(name) {
            Some(new_root) => breakages.pending.push_back((root, new_root)),
            None => breakages.queued.push_back(Breakage::ObjectRemoved {
                path: name.to_string(),
            }),
        }
    }
    breakages
}

/// Lazy sequence of breakages between two stores.
pub struct Breakages<'a> {
    old: &'a SignatureStore,
    new: &'a SignatureStore,
    /// Matched container pairs awaiting comparison.
    pending: VecDeque<(NodeId, NodeId)>,
    /// Findings produced but not yet yielded.
    queued: VecDeque<Breakage>,
    /// Pairs already compared; bounds traversal on aliased re-export loops.
    seen: HashSet<(NodeId, NodeId)>,
}

impl<'a> Breakages<'a> {
    fn new(old: &'a SignatureStore, new: &'a SignatureStore) -> Self {
        Breakages {
            old,
            new,
            pending: VecDeque::new(),
            queued: VecDeque::new(),
            seen: HashSet::new(),
        }
    }

    /// Compare one specific pair of matching containers, for callers holding
    /// module or class pairs of their own.
    pub fn between(
        old: &'a SignatureStore,
        old_id: NodeId,
        new: &'a SignatureStore,
        new_id: NodeId,
    ) -> Self {
        let mut breakages = Breakages::new(old, new);
        breakages.pending.push_back((old_id, new_id));
        breakages
    }

    fn compare_pair(&mut self, old_id: NodeId, new_id: NodeId) {
        let old = self.old;
        let new = self.new;
        let (Some(old_object), Some(new_object)) = (old.object(old_id), new.object(new_id))
        else {
            return;
        };

        match (&old_object.data, &new_object.data) {
            (ObjectData::Class { .. }, ObjectData::Class { .. }) => {
                self.compare_bases(old_id, new_id);
            }
            (
                ObjectData::Function {
                    parameters: old_parameters,
                    returns: old_returns,
                    ..
                },
                ObjectData::Function {
                    parameters: new_parameters,
                    returns: new_returns,
                    ..
                },
            ) => {
                let path = old.path_of(old_id).unwrap_or_default();
                compare_parameters(&path, old_parameters, new_parameters, &mut self.queued);
                if let (Some(old_returns), Some(new_returns)) = (old_returns, new_returns) {
                    if old_returns != new_returns {
                        self.queued.push_back(Breakage::ReturnChangedType {
                            path,
                            old_returns: old_returns.clone(),
                            new_returns: new_returns.clone(),
                        });
                    }
                }
            }
            (
                ObjectData::Attribute {
                    annotation: old_annotation,
                    value: old_value,
                },
                ObjectData::Attribute {
                    annotation: new_annotation,
                    value: new_value,
                },
            ) => {
                let path = old.path_of(old_id).unwrap_or_default();
                if let (Some(old_annotation), Some(new_annotation)) =
                    (old_annotation, new_annotation)
                {
                    if old_annotation != new_annotation {
                        self.queued.push_back(Breakage::AttributeChangedType {
                            path: path.clone(),
                            old_annotation: old_annotation.clone(),
                            new_annotation: new_annotation.clone(),
                        });
                    }
                }
                if old_value != new_value {
                    self.queued.push_back(Breakage::AttributeChangedValue {
                        path,
                        old_value: old_value.clone(),
                        new_value: new_value.clone(),
                    });
                }
                // Attributes have no members to recurse into.
                return;
            }
            (ObjectData::Module { .. }, ObjectData::Module { .. }) => {}
            // Kind mismatches are reported by the parent before the pair is
            // ever enqueued.
            _ => return,
        }

        self.compare_members(old_id, new_id);
    }

    /// Every path in the old class's linearized ancestor set but not the new
    /// one is a lost base. Either side being unlinearizable or incomplete
    /// makes the ancestor set unknown; the check is skipped.
    fn compare_bases(&mut self, old_id: NodeId, new_id: NodeId) {
        let old = self.old;
        let (old_linearization, new_linearization) =
            match (linearize(old, old_id), linearize(self.new, new_id)) {
                (Ok(old_linearization), Ok(new_linearization))
                    if old_linearization.is_complete() && new_linearization.is_complete() =>
                {
                    (old_linearization, new_linearization)
                }
                _ => {
                    tracing::debug!(
                        class = %old.path_of(old_id).unwrap_or_default(),
                        "ancestor set unknown; skipping base comparison"
                    );
                    return;
                }
            };

        let new_ancestors: HashSet<String> = new_linearization.order[1..]
            .iter()
            .filter_map(|id| self.new.path_of(*id))
            .collect();
        let class_path = old.path_of(old_id).unwrap_or_default();
        for ancestor in &old_linearization.order[1..] {
            let Some(base) = old.path_of(*ancestor) else {
                continue;
            };
            if !new_ancestors.contains(&base) {
                self.queued.push_back(Breakage::ClassRemovedBase {
                    path: class_path.clone(),
                    base,
                });
            }
        }
    }

    fn compare_members(&mut self, old_id: NodeId, new_id: NodeId) {
        let old = self.old;
        let new = self.new;
        let (Some(old_object), Some(new_object)) = (old.object(old_id), new.object(new_id))
        else {
            return;
        };

        for (name, old_member) in old_object.members.iter() {
            if !old.is_public(old_member) {
                continue;
            }

            // Aliases are transparent: resolve both sides before comparing,
            // and skip a member whose alias cannot be resolved.
            let Some(old_resolved) = safe_resolve(old, old_member) else {
                tracing::debug!(
                    member = %old.path_of(old_member).unwrap_or_default(),
                    "old member unresolvable; skipping comparison"
                );
                continue;
            };

            let new_resolved = match new_object.members.get(name) {
                Some(new_member) => match safe_resolve(new, new_member) {
                    Some(resolved) => resolved,
                    None => {
                        tracing::debug!(
                            member = %new.path_of(new_member).unwrap_or_default(),
                            "new member unresolvable; skipping comparison"
                        );
                        continue;
                    }
                },
                // A member hoisted to a base class still counts as present:
                // consult the new class's ancestor order before calling it
                // removed.
                None => {
                    let inherited = (new_object.kind() == Kind::Class)
                        .then(|| lookup_member(new, new_id, name))
                        .flatten();
                    match inherited {
                        Some(resolved) => resolved,
                        None => {
                            self.queued.push_back(Breakage::ObjectRemoved {
                                path: old.path_of(old_member).unwrap_or_default(),
                            });
                            continue;
                        }
                    }
                }
            };

            let (Some(old_kind), Some(new_kind)) = (
                old.object(old_resolved).map(|object| object.kind()),
                new.object(new_resolved).map(|object| object.kind()),
            ) else {
                continue;
            };
            if old_kind != new_kind {
                self.queued.push_back(Breakage::ObjectChangedKind {
                    path: old.path_of(old_member).unwrap_or_default(),
                    old_kind,
                    new_kind,
                });
                continue;
            }

            self.pending.push_back((old_resolved, new_resolved));
        }
    }
}

impl Iterator for Breakages<'_> {
    type Item = Breakage;

    fn next(&mut self) -> Option<Breakage> {
        loop {
            if let Some(breakage) = self.queued.pop_front() {
                return Some(breakage);
            }
            let (old_id, new_id) = self.pending.pop_front()?;
            if self.seen.insert((old_id, new_id)) {
                self.compare_pair(old_id, new_id);
            }
        }
    }
}

// ============================================================================
// Parameter Comparison
// ============================================================================

/// Whether a kind change breaks existing call sites. Widening a parameter's
/// availability is assumed safe; everything else, including any change
/// touching a variadic, is tightening.
fn kind_change_is_breaking(old: ParameterKind, new: ParameterKind) -> bool {
    use ParameterKind::*;
    !matches!(
        (old, new),
        (PositionalOnly, PositionalOrKeyword) | (KeywordOnly, PositionalOrKeyword)
    )
}

/// Whether a parameter of `kind` can still be supplied through the catch-alls
/// present on the other side.
fn absorbable(kind: ParameterKind, has_var_positional: bool, has_var_keyword: bool) -> bool {
    match kind {
        ParameterKind::PositionalOnly => has_var_positional,
        ParameterKind::KeywordOnly => has_var_keyword,
        ParameterKind::PositionalOrKeyword => has_var_positional && has_var_keyword,
        ParameterKind::VarPositional | ParameterKind::VarKeyword => false,
    }
}

/// Zero-based position of each positionally-callable parameter.
fn positional_index(parameters: &Parameters, name: &str) -> Option<usize> {
    parameters
        .iter()
        .filter(|parameter| parameter.kind.is_positional())
        .position(|parameter| parameter.name == name)
}

/// Compare two parameter lists. Name match takes precedence over position
/// match; the checks per matched pair are mutually exclusive, evaluated in
/// order, first match wins.
fn compare_parameters(
    path: &str,
    old: &Parameters,
    new: &Parameters,
    out: &mut VecDeque<Breakage>,
) {
    let new_has_var_positional = new.has_kind(ParameterKind::VarPositional);
    let new_has_var_keyword = new.has_kind(ParameterKind::VarKeyword);
    let old_has_var_positional = old.has_kind(ParameterKind::VarPositional);
    let old_has_var_keyword = old.has_kind(ParameterKind::VarKeyword);

    for old_parameter in old {
        let Some(new_parameter) = new.get(&old_parameter.name) else {
            if !absorbable(
                old_parameter.kind,
                new_has_var_positional,
                new_has_var_keyword,
            ) {
                out.push_back(Breakage::ParameterRemoved {
                    path: path.to_string(),
                    parameter: old_parameter.name.clone(),
                });
            }
            continue;
        };

        if !old_parameter.required() && new_parameter.required() {
            out.push_back(Breakage::ParameterChangedRequired {
                path: path.to_string(),
                parameter: old_parameter.name.clone(),
            });
        } else if old_parameter.kind != new_parameter.kind
            && kind_change_is_breaking(old_parameter.kind, new_parameter.kind)
        {
            out.push_back(Breakage::ParameterChangedKind {
                path: path.to_string(),
                parameter: old_parameter.name.clone(),
                old_kind: old_parameter.kind,
                new_kind: new_parameter.kind,
            });
        } else if let (Some(old_default), Some(new_default)) =
            (&old_parameter.default, &new_parameter.default)
        {
            if old_default != new_default {
                out.push_back(Breakage::ParameterChangedDefault {
                    path: path.to_string(),
                    parameter: old_parameter.name.clone(),
                    old_default: old_default.clone(),
                    new_default: new_default.clone(),
                });
            } else {
                compare_positions(path, old, new, &old_parameter.name, out);
            }
        } else {
            compare_positions(path, old, new, &old_parameter.name, out);
        }
    }

    for new_parameter in new {
        if old.get(&new_parameter.name).is_none()
            && new_parameter.required()
            && !absorbable(
                new_parameter.kind,
                old_has_var_positional,
                old_has_var_keyword,
            )
        {
            out.push_back(Breakage::ParameterAddedRequired {
                path: path.to_string(),
                parameter: new_parameter.name.clone(),
            });
        }
    }
}

fn compare_positions(
    path: &str,
    old: &Parameters,
    new: &Parameters,
    name: &str,
    out: &mut VecDeque<Breakage>,
) {
    if let (Some(old_position), Some(new_position)) =
        (positional_index(old, name), positional_index(new, name))
    {
        if old_position != new_position {
            out.push_back(Breakage::ParameterMoved {
                path: path.to_string(),
                parameter: name.to_string(),
                old_position,
                new_position,
            });
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
