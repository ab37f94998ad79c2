//! Arena-allocated search tree with in-place compaction.
//!
//! Nodes live in one `Vec` and refer to each other by index. The children of
//! a node always occupy a contiguous run, so they must all be added before
//! any other node gains children, and iterating them is a range walk.
//!
//! The tree never grows past `max_nodes`. Space is reclaimed by marking the
//! nodes worth keeping with [`Tree::recursively_mark_if`] and then compacting
//! with [`Tree::erase_children_of_unmarked_nodes`], a single left-to-right
//! pass that slides kept nodes down and patches parent and first-child
//! indices as it goes.

use std::ops::{Index, IndexMut};

const MARK_KEEP: u8 = 1;
const MARK_KEEP_KIDS: u8 = 2;

/// Index of a node. Invalidated by compaction and by
/// [`Tree::erase_all_but_root`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug)]
struct Node<T> {
    mark: u8,
    first_child: u32,
    /// The root is its own parent.
    parent: u32,
    num_children: u32,
    val: T,
}

pub struct Tree<T> {
    nodes: Vec<Node<T>>,
    root: u32,
    max_nodes: usize,
}

/// Iterator over the children of a node.
pub struct Children {
    next: u32,
    end: u32,
}

impl Iterator for Children {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        (self.next < self.end).then(|| {
            self.next += 1;
            NodeId(self.next - 1)
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = (self.end - self.next) as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for Children {}

impl<T> Tree<T> {
    /// A tree holding only a root with value `root_val`, never to exceed
    /// `max_nodes` nodes.
    pub fn new(max_nodes: usize, root_val: T) -> Self {
        assert!(max_nodes > 0, "a tree needs room for its root");
        assert!(max_nodes <= u32::MAX as usize);
        Self {
            nodes: vec![Node {
                mark: 0,
                first_child: 0,
                parent: 0,
                num_children: 0,
                val: root_val,
            }],
            root: 0,
            max_nodes,
        }
    }

    /// Bytes used by one node.
    pub const fn node_size() -> usize {
        std::mem::size_of::<Node<T>>()
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId(self.root)
    }

    #[inline]
    pub fn is_root(&self, id: NodeId) -> bool {
        id.0 == self.root
    }

    /// Allocated nodes, including any no longer reachable from the root.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn max_nodes(&self) -> usize {
        self.max_nodes
    }

    /// How many more nodes can be added before compaction is needed.
    #[inline]
    pub fn unused_capacity(&self) -> usize {
        self.max_nodes - self.nodes.len()
    }

    #[inline]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        (!self.is_root(id)).then(|| NodeId(self.nodes[id.index()].parent))
    }

    #[inline]
    pub fn num_children(&self, id: NodeId) -> usize {
        self.nodes[id.index()].num_children as usize
    }

    #[inline]
    pub fn has_children(&self, id: NodeId) -> bool {
        self.nodes[id.index()].num_children > 0
    }

    #[inline]
    pub fn children(&self, id: NodeId) -> Children {
        let node = &self.nodes[id.index()];
        Children {
            next: node.first_child,
            end: node.first_child + node.num_children,
        }
    }

    #[inline]
    pub fn child(&self, id: NodeId, n: usize) -> NodeId {
        let node = &self.nodes[id.index()];
        assert!(n < node.num_children as usize);
        NodeId(node.first_child + n as u32)
    }

    /// Append a child to `id`.
    ///
    /// # Panics
    ///
    /// Panics if the tree is full, or if `id` already has children and
    /// another node has gained children since.
    pub fn add_child(&mut self, id: NodeId, val: T) -> NodeId {
        let next = self.nodes.len() as u32;
        assert!(self.unused_capacity() > 0, "tree is full");
        if self.nodes.len() == self.nodes.capacity() {
            // Grow geometrically, but never past the node budget.
            let grow = self.nodes.len().min(self.unused_capacity());
            self.nodes.reserve_exact(grow);
        }
        let node = &mut self.nodes[id.index()];
        assert!(
            node.num_children == 0 || node.first_child + node.num_children == next,
            "children of a node must be contiguous"
        );
        if node.num_children == 0 {
            node.first_child = next;
        }
        node.num_children += 1;
        self.nodes.push(Node {
            mark: 0,
            first_child: 0,
            parent: id.0,
            num_children: 0,
            val,
        });
        NodeId(next)
    }

    /// Make the subtree at `id` the whole tree. Nodes outside it stay
    /// allocated until the next compaction.
    pub fn re_root(&mut self, id: NodeId) {
        self.root = id.0;
        self.nodes[id.index()].parent = id.0;
    }

    /// Drop every node except the root, which keeps its value.
    pub fn erase_all_but_root(&mut self) {
        let root = self.root as usize;
        self.nodes.swap(0, root);
        self.nodes.truncate(1);
        let node = &mut self.nodes[0];
        node.parent = 0;
        node.num_children = 0;
        node.mark = 0;
        self.root = 0;
    }

    /// Mark nodes for the next compaction, walking down from the root.
    ///
    /// A node for which `keep_children` holds keeps its children, and each
    /// child is examined in turn. A node for which it fails is kept but
    /// will lose its children.
    pub fn recursively_mark_if(&mut self, keep_children: impl Fn(&T) -> bool) {
        let mut stack = vec![self.root];
        while let Some(i) = stack.pop() {
            let node = &mut self.nodes[i as usize];
            if keep_children(&node.val) {
                node.mark |= MARK_KEEP | MARK_KEEP_KIDS;
                stack.extend(node.first_child..node.first_child + node.num_children);
            } else {
                node.mark |= MARK_KEEP;
            }
        }
    }

    /// Compact the tree down to the marked nodes, dropping the children of
    /// nodes not marked to keep them. The root is always kept and ends up
    /// at index 0. Clears all marks.
    pub fn erase_children_of_unmarked_nodes(&mut self) {
        let root = self.root as usize;
        self.nodes[root].mark |= MARK_KEEP;

        let mut write = 0;
        for read in root..self.nodes.len() {
            let mark = self.nodes[read].mark;
            if mark == 0 {
                continue;
            }
            self.nodes.swap(write, read);
            let w = write as u32;
            let node = &mut self.nodes[write];
            node.mark = 0;

            if mark & MARK_KEEP_KIDS != 0 {
                let kids = node.first_child as usize..(node.first_child + node.num_children) as usize;
                for kid in kids {
                    self.nodes[kid].parent = w;
                }
            } else {
                node.num_children = 0;
            }

            if read != root {
                let parent = self.nodes[write].parent as usize;
                let parent = &mut self.nodes[parent];
                if w < parent.first_child {
                    parent.first_child = w;
                }
            }
            write += 1;
        }

        self.nodes.truncate(write);
        self.root = 0;
        self.nodes[0].parent = 0;
    }

    /// Number of nodes in the subtree rooted at `id`.
    pub fn subtree_size(&self, id: NodeId) -> usize {
        let mut count = 0;
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            count += 1;
            stack.extend(self.children(n));
        }
        count
    }
}

impl<T> Index<NodeId> for Tree<T> {
    type Output = T;

    #[inline]
    fn index(&self, id: NodeId) -> &T {
        &self.nodes[id.index()].val
    }
}

impl<T> IndexMut<NodeId> for Tree<T> {
    #[inline]
    fn index_mut(&mut self, id: NodeId) -> &mut T {
        &mut self.nodes[id.index()].val
    }
}
