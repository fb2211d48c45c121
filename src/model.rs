//! Object/alias model: the node types stored in a [`SignatureStore`].
//!
//! A package is represented as a tree of [`Node`]s. A node is either a
//! concrete [`Object`] (module, class, function, attribute) or an [`Alias`],
//! a member slot standing in for a node that may live elsewhere - the static
//! shape of `import x as y`, `from m import x`, and re-exports.
//!
//! The concrete/redirect split is a tagged union, not subclassing: traversal
//! code matches on the [`Node`] variants explicitly.
//!
//! [`SignatureStore`]: crate::store::SignatureStore

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::expr::Expr;
use crate::store::NodeId;

// ============================================================================
// Kind
// ============================================================================

/// The kind of a concrete object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Module,
    Class,
    Function,
    Attribute,
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Kind::Module => "module",
            Kind::Class => "class",
            Kind::Function => "function",
            Kind::Attribute => "attribute",
        };
        f.write_str(label)
    }
}

// ============================================================================
// Source Metadata
// ============================================================================

/// A source line span (1-based, inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSpan {
    pub start: usize,
    pub end: usize,
}

impl LineSpan {
    /// Create a new line span.
    pub fn new(start: usize, end: usize) -> Self {
        LineSpan { start, end }
    }
}

/// A docstring with its source span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Docstring {
    /// The raw docstring text.
    pub value: String,
    /// Where the docstring appears in source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines: Option<LineSpan>,
}

impl Docstring {
    /// Create a docstring from raw text.
    pub fn new(value: impl Into<String>) -> Self {
        Docstring {
            value: value.into(),
            lines: None,
        }
    }

    /// Set the source span.
    pub fn with_lines(mut self, lines: LineSpan) -> Self {
        self.lines = Some(lines);
        self
    }
}

/// A decorator applied to a class or function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decorator {
    /// The decorator expression (without the leading `@`).
    pub expr: Expr,
}

impl Decorator {
    /// Create a decorator from its expression.
    pub fn new(expr: Expr) -> Self {
        Decorator { expr }
    }
}

// ============================================================================
// Parameters
// ============================================================================

/// How a parameter can be bound at a call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    /// Before the `/` separator.
    PositionalOnly,
    /// The default kind.
    PositionalOrKeyword,
    /// After the `*` separator.
    KeywordOnly,
    /// `*args`.
    VarPositional,
    /// `**kwargs`.
    VarKeyword,
}

impl ParameterKind {
    /// Whether this kind is a variadic catch-all.
    pub fn is_variadic(self) -> bool {
        matches!(self, ParameterKind::VarPositional | ParameterKind::VarKeyword)
    }

    /// Whether a parameter of this kind can be bound positionally.
    pub fn is_positional(self) -> bool {
        matches!(
            self,
            ParameterKind::PositionalOnly | ParameterKind::PositionalOrKeyword
        )
    }
}

impl std::fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ParameterKind::PositionalOnly => "positional-only",
            ParameterKind::PositionalOrKeyword => "positional-or-keyword",
            ParameterKind::KeywordOnly => "keyword-only",
            ParameterKind::VarPositional => "variadic positional",
            ParameterKind::VarKeyword => "variadic keyword",
        };
        f.write_str(label)
    }
}

/// A single function parameter.
///
/// Parameters are plain values owned by their function, not store nodes:
/// nothing addresses a parameter by dotted path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name.
    pub name: String,
    /// How the parameter binds at call sites.
    pub kind: ParameterKind,
    /// Type annotation (if annotated).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation: Option<Expr>,
    /// Default value expression (if present).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Expr>,
}

impl Parameter {
    /// Create a new parameter with the given name and kind.
    pub fn new(name: impl Into<String>, kind: ParameterKind) -> Self {
        Parameter {
            name: name.into(),
            kind,
            annotation: None,
            default: None,
        }
    }

    /// Set the annotation.
    pub fn with_annotation(mut self, annotation: Expr) -> Self {
        self.annotation = Some(annotation);
        self
    }

    /// Set the default value.
    pub fn with_default(mut self, default: Expr) -> Self {
        self.default = Some(default);
        self
    }

    /// Whether a call site must supply this parameter: no default and not
    /// variadic.
    pub fn required(&self) -> bool {
        self.default.is_none() && !self.kind.is_variadic()
    }
}

/// An ordered parameter list, addressable by name or index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameters(Vec<Parameter>);

impl Parameters {
    /// Create an empty parameter list.
    pub fn new() -> Self {
        Parameters(Vec::new())
    }

    /// Append a parameter.
    pub fn push(&mut self, parameter: Parameter) {
        self.0.push(parameter);
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate parameters in declaration order.
    pub fn iter(&self) -> std::slice::Iter<'_, Parameter> {
        self.0.iter()
    }

    /// Look up a parameter by name.
    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.0.iter().find(|parameter| parameter.name == name)
    }

    /// Whether the list contains a parameter of the given kind.
    pub fn has_kind(&self, kind: ParameterKind) -> bool {
        self.0.iter().any(|parameter| parameter.kind == kind)
    }
}

impl FromIterator<Parameter> for Parameters {
    fn from_iter<I: IntoIterator<Item = Parameter>>(iter: I) -> Self {
        Parameters(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Parameters {
    type Item = &'a Parameter;
    type IntoIter = std::slice::Iter<'a, Parameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// ============================================================================
// Members
// ============================================================================

/// An insertion-ordered name-to-node member table.
///
/// Order is declaration order and is semantically meaningful: the diff engine
/// traverses members in it. An order vector carries the sequence; a hash index
/// carries the by-name lookups.
#[derive(Debug, Clone, Default)]
pub struct Members {
    order: Vec<(String, NodeId)>,
    index: HashMap<String, usize>,
}

impl Members {
    /// Create an empty member table.
    pub fn new() -> Self {
        Members::default()
    }

    /// Insert a member, replacing any existing member of the same name
    /// (the replacement keeps the original declaration position).
    pub fn insert(&mut self, name: impl Into<String>, id: NodeId) -> Option<NodeId> {
        let name = name.into();
        match self.index.get(&name) {
            Some(&position) => {
                let previous = self.order[position].1;
                self.order[position].1 = id;
                Some(previous)
            }
            None => {
                self.index.insert(name.clone(), self.order.len());
                self.order.push((name, id));
                None
            }
        }
    }

    /// Remove a member by name, returning its node ID.
    pub fn remove(&mut self, name: &str) -> Option<NodeId> {
        let position = self.index.remove(name)?;
        let (_, id) = self.order.remove(position);
        for slot in self.index.values_mut() {
            if *slot > position {
                *slot -= 1;
            }
        }
        Some(id)
    }

    /// Look up a member by name.
    pub fn get(&self, name: &str) -> Option<NodeId> {
        self.index.get(name).map(|&position| self.order[position].1)
    }

    /// Whether a member with the given name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterate `(name, id)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, NodeId)> + '_ {
        self.order.iter().map(|(name, id)| (name.as_str(), *id))
    }

    /// Iterate member IDs in declaration order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.order.iter().map(|(_, id)| *id)
    }
}

// ============================================================================
// Objects
// ============================================================================

/// Kind-specific payload of a concrete object.
#[derive(Debug, Clone)]
pub enum ObjectData {
    Module {
        /// Explicit export list (`__all__`) when the module defines one.
        /// `None` means name-convention classification applies.
        exports: Option<Vec<String>>,
    },
    Class {
        /// Base expressions in declaration order.
        bases: Vec<Expr>,
        decorators: Vec<Decorator>,
    },
    Function {
        parameters: Parameters,
        /// Return annotation (if annotated).
        returns: Option<Expr>,
        decorators: Vec<Decorator>,
    },
    Attribute {
        annotation: Option<Expr>,
        value: Option<Expr>,
    },
}

/// A concrete node: a module, class, function, or attribute.
#[derive(Debug, Clone)]
pub struct Object {
    /// Identifier, unique among siblings.
    pub name: String,
    /// Owning container, `None` for root modules. A store index, not an
    /// owning edge, so subtrees can be dropped independently.
    pub parent: Option<NodeId>,
    /// Children in declaration order.
    pub members: Members,
    /// Docstring (if present).
    pub docstring: Option<Docstring>,
    /// Source span (if known).
    pub lines: Option<LineSpan>,
    /// Free-form tags such as "property", "classmethod", "abstractmethod".
    pub labels: BTreeSet<String>,
    /// Kind-specific payload.
    pub data: ObjectData,
}

impl Object {
    fn new(name: impl Into<String>, data: ObjectData) -> Self {
        Object {
            name: name.into(),
            parent: None,
            members: Members::new(),
            docstring: None,
            lines: None,
            labels: BTreeSet::new(),
            data,
        }
    }

    /// Create a module.
    pub fn module(name: impl Into<String>) -> Self {
        Object::new(name, ObjectData::Module { exports: None })
    }

    /// Create a class with the given base expressions.
    pub fn class(name: impl Into<String>, bases: Vec<Expr>) -> Self {
        Object::new(
            name,
            ObjectData::Class {
                bases,
                decorators: Vec::new(),
            },
        )
    }

    /// Create a function with the given parameters.
    pub fn function(name: impl Into<String>, parameters: Parameters) -> Self {
        Object::new(
            name,
            ObjectData::Function {
                parameters,
                returns: None,
                decorators: Vec::new(),
            },
        )
    }

    /// Create an attribute.
    pub fn attribute(name: impl Into<String>) -> Self {
        Object::new(
            name,
            ObjectData::Attribute {
                annotation: None,
                value: None,
            },
        )
    }

    /// Set the docstring.
    pub fn with_docstring(mut self, docstring: Docstring) -> Self {
        self.docstring = Some(docstring);
        self
    }

    /// Set the source span.
    pub fn with_lines(mut self, lines: LineSpan) -> Self {
        self.lines = Some(lines);
        self
    }

    /// Add a label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels.insert(label.into());
        self
    }

    /// Set the return annotation. Only meaningful for functions.
    pub fn with_returns(mut self, returns: Expr) -> Self {
        if let ObjectData::Function {
            returns: slot, ..
        } = &mut self.data
        {
            *slot = Some(returns);
        }
        self
    }

    /// Set the decorator list. Only meaningful for classes and functions.
    pub fn with_decorators(mut self, decorators: Vec<Decorator>) -> Self {
        match &mut self.data {
            ObjectData::Class {
                decorators: slot, ..
            }
            | ObjectData::Function {
                decorators: slot, ..
            } => *slot = decorators,
            _ => {}
        }
        self
    }

    /// Set the annotation. Only meaningful for attributes.
    pub fn with_annotation(mut self, annotation: Expr) -> Self {
        if let ObjectData::Attribute {
            annotation: slot, ..
        } = &mut self.data
        {
            *slot = Some(annotation);
        }
        self
    }

    /// Set the value expression. Only meaningful for attributes.
    pub fn with_value(mut self, value: Expr) -> Self {
        if let ObjectData::Attribute { value: slot, .. } = &mut self.data {
            *slot = Some(value);
        }
        self
    }

    /// The object's kind.
    pub fn kind(&self) -> Kind {
        match self.data {
            ObjectData::Module { .. } => Kind::Module,
            ObjectData::Class { .. } => Kind::Class,
            ObjectData::Function { .. } => Kind::Function,
            ObjectData::Attribute { .. } => Kind::Attribute,
        }
    }

    /// The explicit export list, for modules that define one.
    pub fn exports(&self) -> Option<&[String]> {
        match &self.data {
            ObjectData::Module { exports } => exports.as_deref(),
            _ => None,
        }
    }

    /// The base expressions, for classes.
    pub fn bases(&self) -> &[Expr] {
        match &self.data {
            ObjectData::Class { bases, .. } => bases,
            _ => &[],
        }
    }

    /// The parameter list, for functions.
    pub fn parameters(&self) -> Option<&Parameters> {
        match &self.data {
            ObjectData::Function { parameters, .. } => Some(parameters),
            _ => None,
        }
    }

    /// The return annotation, for functions.
    pub fn returns(&self) -> Option<&Expr> {
        match &self.data {
            ObjectData::Function { returns, .. } => returns.as_ref(),
            _ => None,
        }
    }
}

// ============================================================================
// Aliases
// ============================================================================

/// Where an alias points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasTarget {
    /// An unresolved dotted path, the common state right after construction
    /// when the target may belong to a module not yet loaded.
    Path(String),
    /// An already-bound node in the same store.
    Bound(NodeId),
}

/// A member slot standing in for another node.
///
/// The name under which an alias is reachable may differ from its target's
/// declared name and path. Following `target` through zero or more alias hops
/// terminates in a concrete object, a resolution error, or a detected cycle;
/// the resolver never loops silently.
#[derive(Debug, Clone)]
pub struct Alias {
    /// Member name, unique among siblings.
    pub name: String,
    /// Owning container.
    pub parent: Option<NodeId>,
    /// Where the alias points.
    pub target: AliasTarget,
    /// Source span of the import (if known).
    pub lines: Option<LineSpan>,
}

impl Alias {
    /// Create an alias for a dotted target path.
    pub fn new(name: impl Into<String>, target: impl Into<String>) -> Self {
        Alias {
            name: name.into(),
            parent: None,
            target: AliasTarget::Path(target.into()),
            lines: None,
        }
    }

    /// Set the source span.
    pub fn with_lines(mut self, lines: LineSpan) -> Self {
        self.lines = Some(lines);
        self
    }
}

// ============================================================================
// Node
// ============================================================================

/// A member slot: either a concrete object or a redirect.
#[derive(Debug, Clone)]
pub enum Node {
    Object(Object),
    Alias(Alias),
}

impl Node {
    /// The node's member name.
    pub fn name(&self) -> &str {
        match self {
            Node::Object(object) => &object.name,
            Node::Alias(alias) => &alias.name,
        }
    }

    /// The owning container.
    pub fn parent(&self) -> Option<NodeId> {
        match self {
            Node::Object(object) => object.parent,
            Node::Alias(alias) => alias.parent,
        }
    }

    pub(crate) fn set_parent(&mut self, parent: Option<NodeId>) {
        match self {
            Node::Object(object) => object.parent = parent,
            Node::Alias(alias) => alias.parent = parent,
        }
    }

    /// The concrete object, if this slot holds one.
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Node::Object(object) => Some(object),
            Node::Alias(_) => None,
        }
    }

    /// The alias, if this slot is a redirect.
    pub fn as_alias(&self) -> Option<&Alias> {
        match self {
            Node::Object(_) => None,
            Node::Alias(alias) => Some(alias),
        }
    }

    /// Whether this slot is a redirect.
    pub fn is_alias(&self) -> bool {
        matches!(self, Node::Alias(_))
    }
}

impl From<Object> for Node {
    fn from(object: Object) -> Self {
        Node::Object(object)
    }
}

impl From<Alias> for Node {
    fn from(alias: Alias) -> Self {
        Node::Alias(alias)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_derivation() {
        let plain = Parameter::new("a", ParameterKind::PositionalOrKeyword);
        assert!(plain.required());

        let defaulted = Parameter::new("b", ParameterKind::PositionalOrKeyword)
            .with_default(Expr::constant("1"));
        assert!(!defaulted.required());

        let args = Parameter::new("args", ParameterKind::VarPositional);
        assert!(!args.required());

        let kwargs = Parameter::new("kwargs", ParameterKind::VarKeyword);
        assert!(!kwargs.required());
    }

    #[test]
    fn test_members_preserve_insertion_order() {
        let mut members = Members::new();
        members.insert("b", NodeId(1));
        members.insert("a", NodeId(2));
        members.insert("c", NodeId(3));

        let names: Vec<&str> = members.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
        assert_eq!(members.get("a"), Some(NodeId(2)));
    }

    #[test]
    fn test_members_remove_keeps_lookups_consistent() {
        let mut members = Members::new();
        members.insert("a", NodeId(1));
        members.insert("b", NodeId(2));
        members.insert("c", NodeId(3));

        assert_eq!(members.remove("a"), Some(NodeId(1)));
        assert_eq!(members.get("b"), Some(NodeId(2)));
        assert_eq!(members.get("c"), Some(NodeId(3)));
        let names: Vec<&str> = members.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["b", "c"]);
    }

    #[test]
    fn test_members_insert_replaces_in_place() {
        let mut members = Members::new();
        members.insert("a", NodeId(1));
        members.insert("b", NodeId(2));

        assert_eq!(members.insert("a", NodeId(9)), Some(NodeId(1)));
        assert_eq!(members.get("a"), Some(NodeId(9)));
        // Replacement keeps the original declaration position.
        let names: Vec<&str> = members.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_object_kind() {
        assert_eq!(Object::module("m").kind(), Kind::Module);
        assert_eq!(Object::class("C", vec![]).kind(), Kind::Class);
        assert_eq!(
            Object::function("f", Parameters::new()).kind(),
            Kind::Function
        );
        assert_eq!(Object::attribute("x").kind(), Kind::Attribute);
    }
}
