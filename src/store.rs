//! Signature store: the namespace every dotted path resolves against.
//!
//! A [`SignatureStore`] holds one load session's worth of package trees in a
//! node arena keyed by [`NodeId`], with root modules in insertion order. It is
//! populated through the construction API (`add_root_module`, `add_member`,
//! the setters), optionally overlaid by stub merging, and then treated as
//! read-only by the resolver, linearizer, and diff engine - apart from their
//! cache writes, which go through mutex-guarded, generation-stamped maps on
//! the store itself.
//!
//! Every structural mutation bumps the generation counter; cache entries
//! stamped with an older generation are ignored and recomputed.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::model::{AliasTarget, Docstring, Kind, Node, Object, ObjectData};
use crate::mro::Linearization;

// ============================================================================
// Node IDs
// ============================================================================

/// Unique identifier for a node within one store.
///
/// IDs are store indexes, never shared between stores: the diff engine keeps
/// two stores side by side and never mixes their IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Create a new node ID.
    pub fn new(id: u32) -> Self {
        NodeId(id)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node_{}", self.0)
    }
}

// ============================================================================
// Builtin Modules
// ============================================================================

/// CPython modules with no source tree to analyze. Alias targets that land in
/// one of these fail resolution with a dedicated error so callers can skip
/// them silently.
const BUILTIN_MODULES: &[&str] = &[
    "_abc",
    "_ast",
    "_codecs",
    "_collections",
    "_functools",
    "_imp",
    "_io",
    "_locale",
    "_operator",
    "_signal",
    "_sre",
    "_stat",
    "_string",
    "_symtable",
    "_thread",
    "_tokenize",
    "_tracemalloc",
    "_warnings",
    "_weakref",
    "atexit",
    "builtins",
    "errno",
    "faulthandler",
    "gc",
    "itertools",
    "marshal",
    "posix",
    "pwd",
    "sys",
    "time",
];

// ============================================================================
// Store Statistics
// ============================================================================

/// Node counts for one store at its current generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub modules: usize,
    pub classes: usize,
    pub functions: usize,
    pub attributes: usize,
    pub aliases: usize,
    /// Aliases with a current-generation cache entry.
    pub resolved_aliases: usize,
    pub unresolved_aliases: usize,
}

// ============================================================================
// Signature Store
// ============================================================================

/// The graph store: one load session's package trees plus resolution state.
#[derive(Debug, Default)]
pub struct SignatureStore {
    // Primary storage (BTreeMap for deterministic iteration)
    nodes: BTreeMap<NodeId, Node>,
    next_id: u32,

    // Root modules, insertion-ordered, with a by-name index
    roots: Vec<NodeId>,
    root_by_name: HashMap<String, NodeId>,

    /// Module names known to be non-analyzable builtins.
    builtin_modules: BTreeSet<String>,

    /// Bumped on every structural mutation after construction begins.
    generation: u64,

    // Generation-stamped caches. Mutex-guarded so parallel read-only
    // consumers get serialized cache writes.
    resolution_cache: Mutex<HashMap<NodeId, (u64, NodeId)>>,
    linearization_cache: Mutex<HashMap<NodeId, (u64, Linearization)>>,
}

impl SignatureStore {
    /// Create an empty store seeded with the standard CPython builtin-module
    /// set.
    pub fn new() -> Self {
        SignatureStore {
            builtin_modules: BUILTIN_MODULES.iter().map(|name| name.to_string()).collect(),
            ..SignatureStore::default()
        }
    }

    /// Extend the builtin-module set, for codebases that ship their own
    /// extension modules.
    pub fn with_builtin_modules<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.builtin_modules.extend(names.into_iter().map(Into::into));
        self
    }

    /// Whether a top-level module name is a known non-analyzable builtin.
    pub fn is_builtin_module(&self, name: &str) -> bool {
        self.builtin_modules.contains(name)
    }

    /// The current generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn bump_generation(&mut self) {
        self.generation += 1;
    }

    // ========================================================================
    // Construction API
    // ========================================================================

    /// Add a top-level module and return its ID.
    ///
    /// # Panics
    ///
    /// Panics if a root with the same name already exists.
    pub fn add_root_module(&mut self, name: impl Into<String>) -> NodeId {
        let name = name.into();
        assert!(
            !self.root_by_name.contains_key(&name),
            "root module '{name}' already exists"
        );
        let id = self.allocate(Node::Object(Object::module(name.clone())));
        self.roots.push(id);
        self.root_by_name.insert(name, id);
        self.bump_generation();
        id
    }

    /// Add a member under a container and return its ID.
    ///
    /// The node's parent link is set to `parent`. A member of the same name is
    /// replaced in place (its subtree is dropped), keeping the original
    /// declaration position.
    ///
    /// # Panics
    ///
    /// Panics if `parent` is not a concrete object in this store.
    pub fn add_member(&mut self, parent: NodeId, node: impl Into<Node>) -> NodeId {
        let mut node = node.into();
        node.set_parent(Some(parent));
        let name = node.name().to_string();
        let id = self.allocate(node);

        let replaced = match self.nodes.get_mut(&parent) {
            Some(Node::Object(object)) => object.members.insert(name, id),
            _ => panic!("add_member: parent {parent} must be a concrete object"),
        };
        if let Some(previous) = replaced {
            self.drop_subtree(previous);
        }
        self.bump_generation();
        id
    }

    /// Remove a member (and its whole subtree) by name. Returns whether a
    /// member was removed.
    pub fn remove_member(&mut self, parent: NodeId, name: &str) -> bool {
        let removed = match self.nodes.get_mut(&parent) {
            Some(Node::Object(object)) => object.members.remove(name),
            _ => None,
        };
        match removed {
            Some(id) => {
                self.drop_subtree(id);
                self.bump_generation();
                true
            }
            None => false,
        }
    }

    /// Set a module's explicit export list (`__all__`).
    pub fn set_exports(&mut self, module: NodeId, exports: Vec<String>) {
        if let Some(Node::Object(object)) = self.nodes.get_mut(&module) {
            if let ObjectData::Module { exports: slot } = &mut object.data {
                *slot = Some(exports);
                self.bump_generation();
            }
        }
    }

    /// Set a node's docstring. Not a structural mutation.
    pub fn set_docstring(&mut self, id: NodeId, docstring: Docstring) {
        if let Some(Node::Object(object)) = self.nodes.get_mut(&id) {
            object.docstring = Some(docstring);
        }
    }

    /// Bind an alias directly to a node in this store.
    pub fn bind_alias(&mut self, alias: NodeId, target: NodeId) {
        if let Some(Node::Alias(node)) = self.nodes.get_mut(&alias) {
            node.target = AliasTarget::Bound(target);
            self.bump_generation();
        }
    }

    fn allocate(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, node);
        id
    }

    fn drop_subtree(&mut self, id: NodeId) {
        let children: Vec<NodeId> = match self.nodes.remove(&id) {
            Some(Node::Object(object)) => object.members.ids().collect(),
            _ => Vec::new(),
        };
        for child in children {
            self.drop_subtree(child);
        }
    }

    /// Deep-copy a subtree from another store under `parent`.
    ///
    /// Bound alias targets are rewritten to their dotted path in the source
    /// store, since node IDs do not carry across stores.
    pub(crate) fn copy_subtree(
        &mut self,
        parent: NodeId,
        source: &SignatureStore,
        source_id: NodeId,
    ) -> Option<NodeId> {
        let node = source.node(source_id)?;
        let (shallow, children) = match node {
            Node::Object(object) => {
                let mut copy = object.clone();
                copy.members = crate::model::Members::new();
                let children: Vec<NodeId> = object.members.ids().collect();
                (Node::Object(copy), children)
            }
            Node::Alias(alias) => {
                let mut copy = alias.clone();
                if let AliasTarget::Bound(bound) = &copy.target {
                    let path = source.path_of(*bound)?;
                    copy.target = AliasTarget::Path(path);
                }
                (Node::Alias(copy), Vec::new())
            }
        };
        let id = self.add_member(parent, shallow);
        for child in children {
            self.copy_subtree(id, source, child);
        }
        Some(id)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Look up a node by ID.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Look up a concrete object by ID.
    pub fn object(&self, id: NodeId) -> Option<&Object> {
        self.node(id).and_then(Node::as_object)
    }

    /// Look up an alias by ID.
    pub fn alias(&self, id: NodeId) -> Option<&crate::model::Alias> {
        self.node(id).and_then(Node::as_alias)
    }

    /// A node's member name.
    pub fn name_of(&self, id: NodeId) -> Option<&str> {
        self.node(id).map(Node::name)
    }

    /// A node's dotted path, derived from the parent chain.
    pub fn path_of(&self, id: NodeId) -> Option<String> {
        let mut names = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = self.node(current)?;
            names.push(node.name());
            cursor = node.parent();
        }
        names.reverse();
        Some(names.join("."))
    }

    /// Root module IDs in insertion order.
    pub fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.roots.iter().copied()
    }

    /// Look up a root module by name.
    pub fn root(&self, name: &str) -> Option<NodeId> {
        self.root_by_name.get(name).copied()
    }

    /// All nodes in ID order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().map(|(id, node)| (*id, node))
    }

    /// Walk a dotted path by direct member lookup, without following aliases.
    ///
    /// The final component may land on an alias (the alias itself is
    /// returned); an alias in an intermediate position stops the walk, since
    /// following it is the resolver's job.
    pub fn lookup_path(&self, path: &str) -> Option<NodeId> {
        let mut components = path.split('.');
        let mut current = self.root(components.next()?)?;
        for component in components {
            current = self.object(current)?.members.get(component)?;
        }
        Some(current)
    }

    /// Whether a node is part of the supported API surface.
    ///
    /// Names without a leading underscore are public, as are dunder names.
    /// Other underscore names are public only when listed in the nearest
    /// enclosing module's explicit export list.
    pub fn is_public(&self, id: NodeId) -> bool {
        let Some(node) = self.node(id) else {
            return false;
        };
        let name = node.name();
        if !name.starts_with('_') {
            return true;
        }
        if name.starts_with("__") && name.ends_with("__") && name.len() > 4 {
            return true;
        }
        let mut cursor = node.parent();
        while let Some(parent_id) = cursor {
            let Some(parent) = self.node(parent_id) else {
                break;
            };
            if let Some(object) = parent.as_object() {
                if object.kind() == Kind::Module {
                    return object
                        .exports()
                        .is_some_and(|exports| exports.iter().any(|export| export == name));
                }
            }
            cursor = parent.parent();
        }
        false
    }

    /// Node counts at the current generation. Cheap full-arena scan.
    pub fn stats(&self) -> StoreStats {
        let mut stats = StoreStats::default();
        let cache = self.resolution_cache.lock().unwrap();
        for (id, node) in self.nodes() {
            match node {
                Node::Object(object) => match object.kind() {
                    Kind::Module => stats.modules += 1,
                    Kind::Class => stats.classes += 1,
                    Kind::Function => stats.functions += 1,
                    Kind::Attribute => stats.attributes += 1,
                },
                Node::Alias(_) => {
                    stats.aliases += 1;
                    match cache.get(&id) {
                        Some((stamp, _)) if *stamp == self.generation => {
                            stats.resolved_aliases += 1
                        }
                        _ => stats.unresolved_aliases += 1,
                    }
                }
            }
        }
        stats
    }

    // ========================================================================
    // Caches
    // ========================================================================

    pub(crate) fn cached_resolution(&self, alias: NodeId) -> Option<NodeId> {
        let cache = self.resolution_cache.lock().unwrap();
        match cache.get(&alias) {
            Some((stamp, target)) if *stamp == self.generation => Some(*target),
            _ => None,
        }
    }

    pub(crate) fn record_resolution(&self, alias: NodeId, target: NodeId) {
        let mut cache = self.resolution_cache.lock().unwrap();
        cache.insert(alias, (self.generation, target));
    }

    pub(crate) fn cached_linearization(&self, class: NodeId) -> Option<Linearization> {
        let cache = self.linearization_cache.lock().unwrap();
        match cache.get(&class) {
            Some((stamp, linearization)) if *stamp == self.generation => {
                Some(linearization.clone())
            }
            _ => None,
        }
    }

    pub(crate) fn record_linearization(&self, class: NodeId, linearization: Linearization) {
        let mut cache = self.linearization_cache.lock().unwrap();
        cache.insert(class, (self.generation, linearization));
    }
}

// ============================================================================
// Tests
// ============================================================================
