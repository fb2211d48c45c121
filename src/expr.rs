//! Lightweight expression representation for annotations, defaults, decorators,
//! and base-class lists.
//!
//! The signature model never evaluates Python expressions. It keeps them as
//! just enough structure to tell a resolvable name apart from opaque source
//! text. Equality is structural, which for this representation coincides with
//! textual equality - the contract the diff engine's annotation comparison
//! relies on.

use serde::{Deserialize, Serialize};

/// An expression as it appears in a signature position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "expr", content = "text", rename_all = "snake_case")]
pub enum Expr {
    /// A plain or dotted identifier (`Base`, `abc.ABC`). Candidates for
    /// resolution against the store.
    Name(String),
    /// A literal constant, kept as source text (`1`, `"default"`, `None`).
    Constant(String),
    /// Anything else, kept as source text (`list[int]`, `lambda: 0`).
    Raw(String),
}

impl Expr {
    /// Create a name expression.
    pub fn name(text: impl Into<String>) -> Self {
        Expr::Name(text.into())
    }

    /// Create a constant expression.
    pub fn constant(text: impl Into<String>) -> Self {
        Expr::Constant(text.into())
    }

    /// Create a raw source-text expression.
    pub fn raw(text: impl Into<String>) -> Self {
        Expr::Raw(text.into())
    }

    /// The source text of the expression.
    pub fn text(&self) -> &str {
        match self {
            Expr::Name(text) | Expr::Constant(text) | Expr::Raw(text) => text,
        }
    }

    /// Whether this expression is a (possibly dotted) identifier that can be
    /// looked up in a store.
    pub fn is_name(&self) -> bool {
        matches!(self, Expr::Name(_))
    }
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.text())
    }
}
