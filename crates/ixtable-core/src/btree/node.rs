//! Arena node types for [`super::BTree`].
//!
//! A B+tree's nodes naturally link in every direction: parent to child,
//! child to parent, leaf to leaf, sibling to sibling. Rust has no safe
//! way to express that graph with ordinary references, so nodes live in
//! a contiguous arena ([`super::tree::BTree::nodes`]) and every link is
//! a 32-bit [`NodeId`] into it instead of a pointer. Keys within a node
//! are a plain sorted `Vec` rather than a linked element list: a `Vec`
//! has the same order and count behavior without introducing any of
//! the cyclic references the arena is there to avoid.

use crate::variant::Variant;

/// Index into [`super::tree::BTree::nodes`]. `NULL` marks "no node".
pub type NodeId = u32;

/// Sentinel for the absence of a node link.
pub const NULL: NodeId = u32::MAX;

/// A leaf node: holds the actual values, keeps a cached count, and links
/// to its left/right siblings to form the ordered leaf chain used for
/// sequential traversal.
pub struct LeafNode<V> {
    pub parent: NodeId,
    pub prev: NodeId,
    pub next: NodeId,
    pub keys: Vec<Variant>,
    pub values: Vec<V>,
}

impl<V> LeafNode<V> {
    pub fn new() -> Self {
        Self {
            parent: NULL,
            prev: NULL,
            next: NULL,
            keys: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn count(&self) -> usize {
        self.keys.len()
    }
}

/// An internal node: holds `m` separator keys and `m + 1` child links.
/// `children[i]` covers keys less than `keys[i]` (for `i < keys.len()`)
/// and the last child covers keys greater than or equal to every
/// separator.
pub struct InternalNode {
    pub parent: NodeId,
    pub keys: Vec<Variant>,
    pub children: Vec<NodeId>,
}

impl InternalNode {
    pub fn new() -> Self {
        Self {
            parent: NULL,
            keys: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn count(&self) -> usize {
        self.keys.len()
    }

    pub fn last_child(&self) -> NodeId {
        *self.children.last().expect("internal node always has >= 1 child")
    }
}

/// A node is either a leaf or an internal node; both are arena-allocated
/// and addressed by [`NodeId`].
pub enum Node<V> {
    Leaf(LeafNode<V>),
    Internal(InternalNode),
}

impl<V> Node<V> {
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    pub fn as_leaf(&self) -> &LeafNode<V> {
        match self {
            Node::Leaf(l) => l,
            Node::Internal(_) => panic!("ixtable bug: expected leaf node"),
        }
    }

    pub fn as_leaf_mut(&mut self) -> &mut LeafNode<V> {
        match self {
            Node::Leaf(l) => l,
            Node::Internal(_) => panic!("ixtable bug: expected leaf node"),
        }
    }

    pub fn as_internal(&self) -> &InternalNode {
        match self {
            Node::Internal(i) => i,
            Node::Leaf(_) => panic!("ixtable bug: expected internal node"),
        }
    }

    pub fn as_internal_mut(&mut self) -> &mut InternalNode {
        match self {
            Node::Internal(i) => i,
            Node::Leaf(_) => panic!("ixtable bug: expected internal node"),
        }
    }

    pub fn parent(&self) -> NodeId {
        match self {
            Node::Leaf(l) => l.parent,
            Node::Internal(i) => i.parent,
        }
    }

    pub fn set_parent(&mut self, parent: NodeId) {
        match self {
            Node::Leaf(l) => l.parent = parent,
            Node::Internal(i) => i.parent = parent,
        }
    }

    pub fn count(&self) -> usize {
        match self {
            Node::Leaf(l) => l.count(),
            Node::Internal(i) => i.count(),
        }
    }
}
