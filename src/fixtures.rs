//! Graph-building helpers for tests and embedders.
//!
//! These are thin wrappers over the store's construction API that keep test
//! setups down to one line per node. They are public so that walkers and
//! inspectors built on top of this crate can use them in their own tests.

use crate::expr::Expr;
use crate::model::{Alias, Object, Parameter, ParameterKind, Parameters};
use crate::store::{NodeId, SignatureStore};

/// A fresh store with one root module.
pub fn store_with_root(name: &str) -> (SignatureStore, NodeId) {
    let mut store = SignatureStore::new();
    let root = store.add_root_module(name);
    (store, root)
}

/// Add a submodule.
pub fn submodule(store: &mut SignatureStore, parent: NodeId, name: &str) -> NodeId {
    store.add_member(parent, Object::module(name))
}

/// Add a class whose bases are name expressions.
pub fn class(store: &mut SignatureStore, parent: NodeId, name: &str, bases: &[&str]) -> NodeId {
    let bases = bases.iter().map(|base| Expr::name(*base)).collect();
    store.add_member(parent, Object::class(name, bases))
}

/// Add a function.
pub fn function(
    store: &mut SignatureStore,
    parent: NodeId,
    name: &str,
    parameters: Parameters,
) -> NodeId {
    store.add_member(parent, Object::function(name, parameters))
}

/// Add an attribute.
pub fn attribute(store: &mut SignatureStore, parent: NodeId, name: &str) -> NodeId {
    store.add_member(parent, Object::attribute(name))
}

/// Add an alias for a dotted target path.
pub fn alias(store: &mut SignatureStore, parent: NodeId, name: &str, target: &str) -> NodeId {
    store.add_member(parent, Alias::new(name, target))
}

/// A positional-or-keyword parameter without a default.
pub fn param(name: &str) -> Parameter {
    Parameter::new(name, ParameterKind::PositionalOrKeyword)
}

/// A positional-or-keyword parameter with a constant default.
pub fn param_with_default(name: &str, default: &str) -> Parameter {
    param(name).with_default(Expr::constant(default))
}

/// Collect parameters into a list.
pub fn params(parameters: impl IntoIterator<Item = Parameter>) -> Parameters {
    parameters.into_iter().collect()
}
