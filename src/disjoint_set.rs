//! Disjoint sets over board points with per-set payloads.
//!
//! Every element is in one of three states:
//!
//! - **dispersed**: not part of any set (an empty intersection, for stones)
//! - **root**: the representative of its set; owns the membership bitset
//!   and the set's token
//! - **member**: part of a set, pointing directly at its root
//!
//! Members always point straight at their root. On a join the smaller set is
//! relabelled, so `find` is a single load and the total relabelling cost
//! over a game stays small. Dispersal walks the membership bitset, so it is
//! linear in the size of the set being dissolved.
//!
//! The token attached to each set is merged with [`Token::merge`] whenever
//! two sets are joined.

use crate::bitset::PointSet;

/// Payload carried by each set, combined when sets merge.
pub trait Token: Clone + Default {
    fn merge(&mut self, other: &Self);
}

#[derive(Clone)]
struct Node<T> {
    root: Option<usize>,
    /// Exact membership, only meaningful at a root.
    members: PointSet,
    token: T,
    /// Position of this root inside `DisjointSets::roots`.
    root_slot: usize,
}

#[derive(Clone)]
pub struct DisjointSets<T: Token> {
    nodes: Vec<Node<T>>,
    roots: Vec<usize>,
}

impl<T: Token> DisjointSets<T> {
    /// A forest of `len` dispersed elements.
    pub fn new(len: usize) -> Self {
        let node = Node {
            root: None,
            members: PointSet::new(),
            token: T::default(),
            root_slot: 0,
        };
        Self {
            nodes: vec![node; len],
            roots: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Root of the set containing `e`, or `None` if `e` is dispersed.
    #[inline]
    pub fn find(&self, e: usize) -> Option<usize> {
        self.nodes[e].root
    }

    #[inline]
    pub fn is_dispersed(&self, e: usize) -> bool {
        self.nodes[e].root.is_none()
    }

    #[inline]
    pub fn is_root(&self, e: usize) -> bool {
        self.nodes[e].root == Some(e)
    }

    /// Turns a dispersed element into a singleton set with a default token.
    pub fn create_singleton(&mut self, e: usize) {
        self.create_singleton_with(e, T::default());
    }

    /// Turns a dispersed element into a singleton set carrying `token`.
    pub fn create_singleton_with(&mut self, e: usize, token: T) {
        assert!(self.is_dispersed(e), "element {e} already belongs to a set");
        let slot = self.roots.len();
        let node = &mut self.nodes[e];
        node.root = Some(e);
        node.members = PointSet::singleton(e);
        node.token = token;
        node.root_slot = slot;
        self.roots.push(e);
    }

    /// Merges the sets of `a` and `b` and returns the surviving root.
    ///
    /// The root of the larger set survives. Joining two elements that are
    /// already together changes nothing.
    pub fn join(&mut self, a: usize, b: usize) -> usize {
        let ra = self.find(a).expect("join on a dispersed element");
        let rb = self.find(b).expect("join on a dispersed element");
        if ra == rb {
            return ra;
        }

        let (big, small) = if self.nodes[ra].members.count() >= self.nodes[rb].members.count() {
            (ra, rb)
        } else {
            (rb, ra)
        };

        let small_members = std::mem::take(&mut self.nodes[small].members);
        for m in &small_members {
            self.nodes[m].root = Some(big);
        }
        let small_token = std::mem::take(&mut self.nodes[small].token);
        let big_node = &mut self.nodes[big];
        big_node.members |= small_members;
        big_node.token.merge(&small_token);

        self.remove_root(small);
        big
    }

    /// Returns every element of `e`'s set to the dispersed state.
    pub fn disperse(&mut self, e: usize) {
        let root = self.find(e).expect("disperse on a dispersed element");
        let members = std::mem::take(&mut self.nodes[root].members);
        for m in &members {
            self.nodes[m].root = None;
        }
        self.nodes[root].token = T::default();
        self.remove_root(root);
    }

    /// Members of the set rooted at `root`.
    #[inline]
    pub fn members(&self, root: usize) -> &PointSet {
        debug_assert!(self.is_root(root));
        &self.nodes[root].members
    }

    #[inline]
    pub fn token(&self, root: usize) -> &T {
        debug_assert!(self.is_root(root));
        &self.nodes[root].token
    }

    #[inline]
    pub fn token_mut(&mut self, root: usize) -> &mut T {
        debug_assert!(self.is_root(root));
        &mut self.nodes[root].token
    }

    /// Current roots, in no particular order.
    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    fn remove_root(&mut self, root: usize) {
        let slot = self.nodes[root].root_slot;
        self.roots.swap_remove(slot);
        if let Some(&moved) = self.roots.get(slot) {
            self.nodes[moved].root_slot = slot;
        }
    }
}
