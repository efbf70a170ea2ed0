//! Path rebinding for copy-on-write updates.
//!
//! Descending a tree towards a target records, per level, the sibling that
//! must be kept. Applying the resulting [`Rebinder`] to a replacement node
//! rebuilds only the pairs on the path and reuses every sibling by reference.

use std::sync::Arc;

use super::{Node, SharedNode};

/// Replace a node somewhere below a root, returning the new root.
#[derive(Clone, Debug, Default)]
pub enum Rebinder {
    /// Replacement becomes the new root
    #[default]
    Identity,
    /// Replacement becomes the left child, next to the kept right sibling
    RebindLeft { right: SharedNode },
    /// Replacement becomes the right child, next to the kept left sibling
    RebindRight { left: SharedNode },
    /// Apply `inner` first, then feed its result to `outer`
    Compose(Box<Rebinder>, Box<Rebinder>),
}

impl Rebinder {
    /// `outer ∘ inner`, skipping identities.
    pub fn compose(inner: Rebinder, outer: Rebinder) -> Rebinder {
        match (inner, outer) {
            (Rebinder::Identity, outer) => outer,
            (inner, Rebinder::Identity) => inner,
            (inner, outer) => Rebinder::Compose(Box::new(inner), Box::new(outer)),
        }
    }

    /// Build the new root with `node` installed at the rebinder's target.
    pub fn apply(&self, node: SharedNode) -> SharedNode {
        match self {
            Rebinder::Identity => node,
            Rebinder::RebindLeft { right } => Node::pair(node, Arc::clone(right)),
            Rebinder::RebindRight { left } => Node::pair(Arc::clone(left), node),
            Rebinder::Compose(inner, outer) => outer.apply(inner.apply(node)),
        }
    }

    /// Number of levels between the target and the root.
    pub fn depth(&self) -> usize {
        match self {
            Rebinder::Identity => 0,
            Rebinder::RebindLeft { .. } | Rebinder::RebindRight { .. } => 1,
            Rebinder::Compose(inner, outer) => inner.depth() + outer.depth(),
        }
    }
}

/// Fold per-level steps, ordered root first, into one rebinder.
pub(crate) fn from_steps(steps: Vec<Rebinder>) -> Rebinder {
    steps
        .into_iter()
        .fold(Rebinder::Identity, |upper, step| Rebinder::compose(step, upper))
}
