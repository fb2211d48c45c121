//! pyrift: a static signature model for Python codebases and a
//! breaking-change detector built on top of it.
//!
//! A whole package is represented as one graph of modules, classes,
//! functions, attributes, and the import aliases connecting them, without
//! executing any user code. The pieces:
//!
//! - [`store`]: the [`SignatureStore`], the namespace every dotted path
//!   resolves against, with generation-stamped resolution caches.
//! - [`model`]: the node types - concrete objects and alias redirects.
//! - [`resolver`]: on-demand alias resolution, memoized and cycle-safe.
//! - [`mro`]: C3 linearization for inherited-member lookup.
//! - [`diff`]: the breaking-change engine comparing two stores.
//! - [`merge`]: overlaying `.pyi` stub trees onto source trees.
//!
//! Construction of the graph from source text (or from live objects) belongs
//! to external walkers; they populate a store through its construction API
//! and hand it over. The command-line and report layers consume the
//! [`diff::Breakage`] sequence.
//!
//! ```
//! use pyrift::diff::{find_breaking_changes, BreakageKind};
//! use pyrift::fixtures::{function, param, params, store_with_root};
//!
//! let (mut old, old_root) = store_with_root("pkg");
//! function(&mut old, old_root, "greet", params([param("name")]));
//!
//! let (new, _) = store_with_root("pkg");
//! let found: Vec<_> = find_breaking_changes(&old, &new).collect();
//! assert_eq!(found.len(), 1);
//! assert_eq!(found[0].kind(), BreakageKind::ObjectRemoved);
//! ```
//!
//! [`SignatureStore`]: store::SignatureStore

pub mod diff;
pub mod expr;
pub mod fixtures;
pub mod merge;
pub mod model;
pub mod mro;
pub mod resolver;
pub mod store;

pub use diff::{find_breaking_changes, Breakage, BreakageKind, Breakages};
pub use expr::Expr;
pub use merge::{merge_stubs, MergeError};
pub use model::{
    Alias, AliasTarget, Decorator, Docstring, Kind, LineSpan, Members, Node, Object, ObjectData,
    Parameter, ParameterKind, Parameters,
};
pub use mro::{linearize, lookup_member, Linearization, MroError, MroResult};
pub use resolver::{
    resolve, resolve_all, resolve_name, resolve_path, safe_resolve, ResolutionReport,
    ResolveError, ResolveResult,
};
pub use store::{NodeId, SignatureStore, StoreStats};
