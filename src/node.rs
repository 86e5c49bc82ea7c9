//! HAMT node variants and the shared node handle.
//!
//! Three node shapes cover the memory/time tradeoffs of the trie:
//!
//! - [`BitmapNode`] — sparse node of at most 16 entries addressed through a
//!   32-bit bitmap
//! - [`ArrayNode`] — dense node of exactly 32 child slots, pure indirection
//! - [`CollisionNode`] — linear list of pairs sharing one 32-bit hash
//!
//! Every node carries a mutation token (`mutid`).  `0` marks a persistent
//! node that must never change; a non-zero token marks a node owned by the
//! mutation draft that stamped it, which may edit it in place.

use std::fmt;
use std::fmt::Write as _;
use std::sync::Arc;

/// Number of child slots in an [`ArrayNode`].
pub(crate) const ARRAY_NODE_SIZE: usize = 32;

/// Entry count at which a [`BitmapNode`] is promoted to an [`ArrayNode`].
///
/// The same threshold drives demotion: an array node that drops below 16
/// occupied slots is rebuilt as a bitmap node.
pub(crate) const MAX_BITMAP_ENTRIES: usize = 16;

/// Deepest possible node chain: seven five-bit levels plus a terminal
/// collision node.
pub(crate) const MAX_TREE_DEPTH: usize = 8;

/// Shared handle to a node.
///
/// Subtrees are shared freely between maps; the tree shape makes reference
/// cycles impossible, so reference counting is sound.
pub(crate) type NodeRef<K, V> = Arc<Node<K, V>>;

/// A key binding stored inline in a bitmap node.
///
/// The folded 32-bit hash rides along so that promotion and splitting never
/// need to re-hash a stored key.
#[derive(Clone)]
pub(crate) struct Leaf<K, V> {
    pub hash: i32,
    pub key: K,
    pub value: V,
}

/// One slot of a bitmap node: either a binding or a subtree pointer.
#[derive(Clone)]
pub(crate) enum Entry<K, V> {
    Leaf(Leaf<K, V>),
    Child(NodeRef<K, V>),
}

/// Sparse node: `entries.len() == bitmap.count_ones()`, at most 16 entries.
pub(crate) struct BitmapNode<K, V> {
    pub mutid: u64,
    pub bitmap: u32,
    pub entries: Vec<Entry<K, V>>,
}

impl<K: Clone, V: Clone> BitmapNode<K, V> {
    /// Copies this node, stamping the copy with `mutid`.
    pub(crate) fn to_owned_with(&self, mutid: u64) -> Self {
        Self {
            mutid,
            bitmap: self.bitmap,
            entries: self.entries.clone(),
        }
    }
}

/// Dense node: 32 slots of child pointers, no inline bindings.
///
/// `count` tracks the occupied slots.  Array nodes below the root always
/// hold 16 or more children; dropping below that demotes them back to a
/// bitmap node.
pub(crate) struct ArrayNode<K, V> {
    pub mutid: u64,
    pub count: u8,
    pub slots: [Option<NodeRef<K, V>>; ARRAY_NODE_SIZE],
}

impl<K, V> ArrayNode<K, V> {
    /// Copies this node, stamping the copy with `mutid`.
    ///
    /// Only clones the 32 `Arc` handles, never key or value data.
    pub(crate) fn to_owned_with(&self, mutid: u64) -> Self {
        Self {
            mutid,
            count: self.count,
            slots: self.slots.clone(),
        }
    }
}

/// Linear node holding two or more pairs whose keys share `hash`.
pub(crate) struct CollisionNode<K, V> {
    pub mutid: u64,
    pub hash: i32,
    pub pairs: Vec<(K, V)>,
}

/// A trie node.
pub(crate) enum Node<K, V> {
    Bitmap(BitmapNode<K, V>),
    Array(ArrayNode<K, V>),
    Collision(CollisionNode<K, V>),
}

impl<K, V> Node<K, V> {
    /// The mutation token stamped on this node.
    pub(crate) fn mutid(&self) -> u64 {
        match self {
            Self::Bitmap(n) => n.mutid,
            Self::Array(n) => n.mutid,
            Self::Collision(n) => n.mutid,
        }
    }
}

/// Allocates an empty bitmap node stamped with `mutid`.
pub(crate) fn empty_bitmap<K, V>(mutid: u64) -> NodeRef<K, V> {
    Arc::new(Node::Bitmap(BitmapNode {
        mutid,
        bitmap: 0,
        entries: Vec::new(),
    }))
}

/// Gains mutable access to a node the current draft owns exclusively.
///
/// Callers must have verified the node carries the live mutation token; a
/// live-stamped node is referenced only by its parent in the draft's tree.
pub(crate) fn arc_mut<K, V>(slot: &mut NodeRef<K, V>) -> &mut Node<K, V> {
    Arc::get_mut(slot).expect("node stamped with the live mutation token has a single owner")
}

/// Returns the binding of a bitmap node holding exactly one leaf entry.
///
/// Such nodes are forbidden as children and get inlined into their parent;
/// a single-entry bitmap whose entry is a subtree pointer does not qualify,
/// because tree levels cannot be moved up or down.
pub(crate) fn single_leaf_of<K: Clone, V: Clone>(node: &Node<K, V>) -> Option<Leaf<K, V>> {
    match node {
        Node::Bitmap(b) if b.entries.len() == 1 => match &b.entries[0] {
            Entry::Leaf(leaf) => Some(leaf.clone()),
            Entry::Child(_) => None,
        },
        _ => None,
    }
}

/// Writes an indented description of the subtree under `node` into `out`.
///
/// One line per node with kind, sizes, binary bitmap, and address; children
/// indented one level deeper.  The format is for tests and debugging only.
pub(crate) fn dump_node<K, V>(node: &Node<K, V>, out: &mut String, level: usize)
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    let pad = "    ".repeat(level + 1);
    match node {
        Node::Bitmap(b) => {
            let _ = writeln!(
                out,
                "{pad}BitmapNode(size={} bitmap={:#b} id={:p}):",
                b.entries.len(),
                b.bitmap,
                b,
            );
            for entry in &b.entries {
                match entry {
                    Entry::Leaf(leaf) => {
                        let _ = writeln!(out, "{pad}    {:?}: {:?}", leaf.key, leaf.value);
                    }
                    Entry::Child(child) => {
                        let _ = writeln!(out, "{pad}    <node>:");
                        dump_node(child, out, level + 1);
                    }
                }
            }
        }
        Node::Array(a) => {
            let _ = writeln!(
                out,
                "{pad}ArrayNode(count={} id={:p}):",
                a.count,
                a,
            );
            for (i, slot) in a.slots.iter().enumerate() {
                if let Some(child) = slot {
                    let _ = writeln!(out, "{pad}    {i}:");
                    dump_node(child, out, level + 1);
                }
            }
        }
        Node::Collision(c) => {
            let _ = writeln!(
                out,
                "{pad}CollisionNode(size={} hash={} id={:p}):",
                c.pairs.len(),
                c.hash,
                c,
            );
            for (key, value) in &c.pairs {
                let _ = writeln!(out, "{pad}    {key:?}: {value:?}");
            }
        }
    }
}
