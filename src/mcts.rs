//! Monte Carlo Tree Search (UCT) with RAVE.
//!
//! A [`UctWorker`] owns one search tree over a private copy of the game
//! position. Each simulation:
//!
//! 1. **Select**: descend from the root by the UCB value of each child
//!    (win rate blended with RAVE and the grandfather heuristic, plus an
//!    exploration term), stopping at a leaf or at a node whose outcome is
//!    already proven.
//! 2. **Expand**: once a leaf has been visited `expansion_threshold` times it
//!    gets one child per legal move, pass included, and selection takes one
//!    more step.
//! 3. **Simulate**: the rollout policy plays the game out to two passes.
//! 4. **Backpropagate**: every node on the path records the result, and the
//!    siblings along the path receive RAVE credit for moves their player
//!    made later in the same simulation.
//!
//! Node statistics are from the point of view of the player who made the
//! node's move. Proven results travel up the tree as [`Outcome::WinFor`].
//!
//! The tree has a fixed capacity. Before every simulation the worker checks
//! there is room for one more expansion and, if not, compacts the tree,
//! dropping the children of rarely visited nodes.

use fastrand::Rng;
use log::debug;

use crate::config::SearchConfig;
use crate::constants::{
    FIRST_PLAY_URGENCY, INITIAL_CULL_THRESHOLD, SELECTION_EPSILON, UCB1_TUNED_MAX_VARIANCE,
};
use crate::coord::{Color, Move};
use crate::playout::{RolloutPolicy, complete_game};
use crate::position::{MoveError, Position};
use crate::tree::{NodeId, Tree};

/// Game-theoretic result known for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Outcome {
    #[default]
    Unknown,
    WinFor(Color),
}

/// Statistics stored in every tree node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UctNode {
    /// Move leading to this node. Meaningless for a root built from scratch.
    pub mv: Move,
    pub outcome: Outcome,
    pub times_played: u32,
    /// Simulations through this node won by the player who made `mv`.
    pub wins: u32,
    pub rave_times_played: f32,
    pub rave_wins: f32,
}

impl UctNode {
    pub fn new(mv: Move) -> Self {
        Self {
            mv,
            outcome: Outcome::Unknown,
            times_played: 0,
            wins: 0,
            rave_times_played: 0.0,
            rave_wins: 0.0,
        }
    }

    /// Raw win rate, zero for an unvisited node.
    pub fn mean(&self) -> f32 {
        if self.times_played == 0 {
            0.0
        } else {
            self.wins as f32 / self.times_played as f32
        }
    }
}

/// How attractive a child is during selection. Orders `Loss < Value < Win`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub enum Urgency {
    Loss,
    Value(f32),
    Win,
}

/// Weight given to `rave_times_played` pseudo-visits.
#[inline]
pub fn rave_weight(config: &SearchConfig, rave_times_played: f32) -> f32 {
    rave_times_played / (config.rave_param1() + config.rave_param2() * rave_times_played)
}

/// Estimated value of `child` for the player who made its move, optionally
/// with the UCB exploration bonus. `log_n` is the log of the parent's visit
/// count.
pub fn value_upper_bound(
    config: &SearchConfig,
    child: &UctNode,
    log_n: f32,
    grandfather_mean: f32,
    grandfather_weight: f32,
    add_uct_term: bool,
) -> f32 {
    let mut value = 0.0;
    let mut weight_sum = 0.0;

    if child.times_played > 0 {
        value += child.wins as f32;
        weight_sum += child.times_played as f32;
    }

    value += grandfather_weight * grandfather_mean;
    weight_sum += grandfather_weight;

    if config.use_rave && child.rave_times_played > 0.0 {
        let rave_value = child.rave_wins / child.rave_times_played;
        let weight = rave_weight(config, child.rave_times_played);
        value += rave_value * weight;
        weight_sum += weight;
    }

    if weight_sum < SELECTION_EPSILON {
        return FIRST_PLAY_URGENCY;
    }
    value /= weight_sum;

    if add_uct_term {
        let n = if config.include_rave_count_for_exploration {
            weight_sum + 1.0
        } else {
            child.times_played as f32 + 1.0
        };
        if config.use_ucb1_tuned {
            let variance =
                (value - value * value + (2.0 * log_n / n).sqrt()).min(UCB1_TUNED_MAX_VARIANCE);
            value += config.exploration_constant * (log_n * variance / n).sqrt();
        } else {
            value += config.exploration_constant * (log_n / n).sqrt();
        }
    }

    value
}

/// Shape of a search tree, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeSummary {
    pub nodes: usize,
    pub mean_depth: f32,
    /// Mean depth weighted by visit count.
    pub weighted_depth: f32,
    pub max_depth: usize,
}

/// One independent UCT search over its own tree.
pub struct UctWorker {
    config: SearchConfig,
    tree: Tree<UctNode>,
    rng: Rng,
    initial_state: Position,
    policy: RolloutPolicy,
    /// Compact the tree before the next simulation (set after re-rooting).
    force_cull: bool,
    // Scratch buffers reused across simulations.
    moves: Vec<Move>,
    path: Vec<NodeId>,
    last_seen: Vec<[usize; 2]>,
}

impl UctWorker {
    /// A worker searching from `state` with a tree sized from
    /// `config.max_mem_mb`.
    pub fn new(state: Position, config: SearchConfig, seed: u64) -> Self {
        let max_nodes = config.max_nodes();
        Self::with_max_nodes(state, config, seed, max_nodes)
    }

    pub fn with_max_nodes(state: Position, config: SearchConfig, seed: u64, max_nodes: usize) -> Self {
        let policy = if config.use_patterns {
            RolloutPolicy::Heuristic
        } else {
            RolloutPolicy::Random
        };
        Self {
            tree: Tree::new(max_nodes, UctNode::new(Move::Pass)),
            rng: Rng::with_seed(seed),
            policy,
            force_cull: false,
            moves: Vec::new(),
            path: Vec::new(),
            last_seen: vec![[usize::MAX; 2]; state.num_points() + 1],
            initial_state: state,
            config,
        }
    }

    pub fn state(&self) -> &Position {
        &self.initial_state
    }

    pub fn tree(&self) -> &Tree<UctNode> {
        &self.tree
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn root(&self) -> &UctNode {
        &self.tree[self.tree.root()]
    }

    /// Statistics of the root's children, in move order.
    pub fn root_children(&self) -> impl Iterator<Item = &UctNode> + '_ {
        self.tree.children(self.tree.root()).map(|c| &self.tree[c])
    }

    /// The root's outcome is proven; further simulations are pointless.
    pub fn perfect_play_found(&self) -> bool {
        self.root().outcome != Outcome::Unknown
    }

    /// Run up to `simulations` simulations, stopping early once perfect
    /// play is found. Returns how many were run.
    pub fn ponder(&mut self, simulations: u32) -> u32 {
        for done in 0..simulations {
            if self.perfect_play_found() {
                return done;
            }
            self.cull_if_needed();
            self.play_one_sequence();
        }
        simulations
    }

    /// Advance the worker's position by `mv`, keeping the matching subtree
    /// when tree reuse is on.
    pub fn update_after_play(&mut self, mv: Move) -> Result<(), MoveError> {
        self.initial_state.play(mv)?;

        let root = self.tree.root();
        let reused = if self.config.reuse_tree {
            self.tree.children(root).find(|&c| self.tree[c].mv == mv)
        } else {
            None
        };

        match reused {
            Some(child) => {
                self.tree.re_root(child);
                self.tree[child].outcome = Outcome::Unknown;
                self.force_cull = true;
            }
            None => self.reset_tree(),
        }
        Ok(())
    }

    /// Search from `state` with a fresh tree.
    pub fn reset_to_new_state(&mut self, state: Position) {
        self.last_seen = vec![[usize::MAX; 2]; state.num_points() + 1];
        self.initial_state = state;
        self.reset_tree();
    }

    fn reset_tree(&mut self) {
        self.tree.erase_all_but_root();
        let root = self.tree.root();
        self.tree[root] = UctNode::new(Move::Pass);
        self.force_cull = false;
    }

    // -------------------------------------------------------------------------
    // Memory management
    // -------------------------------------------------------------------------

    /// Make sure there is room for one more expansion.
    ///
    /// A pending forced compaction keeps the whole live subtree. If space is
    /// still short, compaction repeats with a visit threshold that starts at
    /// [`INITIAL_CULL_THRESHOLD`] and doubles until more than half of the
    /// capacity is free.
    pub fn cull_if_needed(&mut self) {
        if self.force_cull {
            self.force_cull = false;
            self.cull(0);
        }

        let needed = self.initial_state.num_points() + 1;
        if self.tree.unused_capacity() >= needed {
            return;
        }

        let target = self.tree.max_nodes() / 2;
        let mut threshold = INITIAL_CULL_THRESHOLD;
        loop {
            self.cull(threshold);
            if self.tree.unused_capacity() > target {
                break;
            }
            threshold = threshold.saturating_mul(2);
        }
    }

    fn cull(&mut self, threshold: u32) {
        let before = self.tree.len();
        self.tree
            .recursively_mark_if(|node| node.times_played >= threshold);
        self.tree.erase_children_of_unmarked_nodes();
        debug!(
            "cull [threshold {threshold}]: {before} -> {} nodes (capacity {})",
            self.tree.len(),
            self.tree.max_nodes()
        );
    }

    // -------------------------------------------------------------------------
    // Simulation
    // -------------------------------------------------------------------------

    fn play_one_sequence(&mut self) {
        if self.perfect_play_found() {
            return;
        }

        let mut state = self.initial_state.clone();
        let mut moves = std::mem::take(&mut self.moves);
        let mut path = std::mem::take(&mut self.path);
        moves.clear();
        path.clear();

        self.select(&mut state, &mut path, &mut moves);

        let leaf = *path.last().expect("path always holds the root");
        let winner = match self.tree[leaf].outcome {
            Outcome::WinFor(color) => Some(color),
            Outcome::Unknown => {
                complete_game(&mut state, self.policy, &mut self.rng, &mut moves);
                state.winner()
            }
        };

        self.update_wins(&path, &moves, winner);

        self.moves = moves;
        self.path = path;
    }

    /// Walk down the tree, expanding the leaf if it has been visited often
    /// enough. Fills `path` with the visited nodes (root first) and `moves`
    /// with the moves between them, playing those moves on `state`.
    fn select(&mut self, state: &mut Position, path: &mut Vec<NodeId>, moves: &mut Vec<Move>) {
        let mut node = self.tree.root();
        self.tree[node].times_played += 1;
        path.push(node);

        while self.tree.has_children(node) && self.tree[node].outcome == Outcome::Unknown {
            node = self.descend_by_ucb(node, state.to_play());
            self.step(node, state, path, moves);
        }

        if self.tree[node].outcome == Outcome::Unknown
            && self.tree[node].times_played >= self.config.expansion_threshold
        {
            self.create_children(node, state);
            node = self.descend_by_ucb(node, state.to_play());
            self.step(node, state, path, moves);
        }
    }

    fn step(&mut self, node: NodeId, state: &mut Position, path: &mut Vec<NodeId>, moves: &mut Vec<Move>) {
        let stats = &mut self.tree[node];
        stats.times_played += 1;
        let mv = stats.mv;
        state
            .play(mv)
            .expect("tree moves are legal in the position they were created for");
        moves.push(mv);
        path.push(node);
    }

    /// One child per legal move. When the opponent has just passed, the pass
    /// child ends the game and its result is known immediately; a draw goes
    /// against the player passing.
    fn create_children(&mut self, node: NodeId, state: &Position) {
        let mover = state.to_play();
        let pass_ends_game = state.previous_move_was_pass();

        for mv in state.legal_moves() {
            let mut child = UctNode::new(mv);
            if pass_ends_game && mv.is_pass() {
                let winner = state.winner().unwrap_or(mover.opponent());
                child.outcome = Outcome::WinFor(winner);
            }
            self.tree.add_child(node, child);
        }
    }

    /// Pick the child of `node` with the highest urgency for `mover`, the
    /// player to move at `node`. Proven results are propagated to `node`.
    fn descend_by_ucb(&mut self, node: NodeId, mover: Color) -> NodeId {
        let tree = &self.tree;
        let config = &self.config;
        let rng = &mut self.rng;

        let add_uct_term = config.exploration_constant > SELECTION_EPSILON;
        let log_n = if add_uct_term {
            let mut n = tree[node].times_played as f32 + 1.0;
            if config.include_rave_count_for_exploration {
                n += tree
                    .children(node)
                    .map(|c| rave_weight(config, tree[c].rave_times_played))
                    .sum::<f32>();
            }
            n.ln()
        } else {
            0.0
        };

        // The grandparent's children are moves by the same player, two plies
        // earlier. Both child lists are sorted by move.
        let grandfather = if config.grandfather_weight > SELECTION_EPSILON {
            tree.parent(node).and_then(|p| tree.parent(p))
        } else {
            None
        };
        let mut uncles = grandfather.map(|g| tree.children(g).peekable());

        let mut best: Option<(Urgency, NodeId)> = None;
        for child in tree.children(node) {
            let stats = &tree[child];

            let urgency = match stats.outcome {
                Outcome::WinFor(winner) if winner == mover => Urgency::Win,
                Outcome::WinFor(_) => Urgency::Loss,
                Outcome::Unknown => {
                    let (gf_mean, gf_weight) = match uncles.as_mut() {
                        Some(uncles) => {
                            while uncles.next_if(|&u| tree[u].mv < stats.mv).is_some() {}
                            match uncles.next_if(|&u| tree[u].mv == stats.mv) {
                                Some(u) => (
                                    (tree[u].wins as f32 + 1.0) / (tree[u].times_played as f32 + 1.0),
                                    config.grandfather_weight,
                                ),
                                None => (1.0, 0.0),
                            }
                        }
                        None => (1.0, 0.0),
                    };
                    let value =
                        value_upper_bound(config, stats, log_n, gf_mean, gf_weight, add_uct_term);
                    Urgency::Value(value + SELECTION_EPSILON * (rng.u32(..) & 0xFF) as f32)
                }
            };

            if urgency == Urgency::Win {
                self.tree[node].outcome = Outcome::WinFor(mover);
                return child;
            }
            if best.is_none_or(|(b, _)| urgency > b) {
                best = Some((urgency, child));
            }
        }

        let (urgency, chosen) = best.expect("descending from a node without children");
        if urgency == Urgency::Loss {
            self.tree[node].outcome = Outcome::WinFor(mover.opponent());
        }
        chosen
    }

    /// Record the result of a simulation along `path`, with RAVE credit for
    /// the siblings of every node on it.
    fn update_wins(&mut self, path: &[NodeId], moves: &[Move], winner: Option<Color>) {
        let config = &self.config;
        let tree = &mut self.tree;
        let last_seen = &mut self.last_seen;
        last_seen.fill([usize::MAX; 2]);

        let first_mover = self.initial_state.to_play();
        let mover_of = |i: usize| {
            if i % 2 == 0 {
                first_mover
            } else {
                first_mover.opponent()
            }
        };
        let len = moves.len();
        let in_tree = path.len() - 1;

        // Earliest ply at which each player played each point in the
        // rollout part of the game.
        for i in (in_tree..len).rev() {
            last_seen[moves[i].rave_index()][mover_of(i).index()] = i;
        }

        for (depth, &node) in path.iter().enumerate().rev() {
            let node_mover = if depth == 0 {
                first_mover.opponent()
            } else {
                mover_of(depth - 1)
            };
            if winner == Some(node_mover) {
                tree[node].wins += 1;
            }

            let child_mover = node_mover.opponent();
            let child_won = winner == Some(child_mover);
            let ply = depth as f32 - 1.0;

            for child in tree.children(node) {
                let mv = tree[child].mv;
                if mv.is_pass() && !config.rave_update_passes {
                    continue;
                }
                let seen = last_seen[mv.rave_index()];
                let played_at = seen[child_mover.index()];
                if played_at == usize::MAX {
                    continue;
                }
                if config.rave_check_same && seen[node_mover.index()] < played_at {
                    continue;
                }

                let weight = if config.weighted_rave {
                    2.0 - (played_at as f32 - ply) / (len as f32 - ply)
                } else {
                    1.0
                };
                let stats = &mut tree[child];
                stats.rave_times_played += weight;
                if child_won {
                    stats.rave_wins += weight;
                }
            }

            if depth > 0 {
                last_seen[moves[depth - 1].rave_index()][node_mover.index()] = depth - 1;
            }
        }
    }

    // -------------------------------------------------------------------------
    // Diagnostics
    // -------------------------------------------------------------------------

    /// Up to `max_len` moves following the best value estimate (no
    /// exploration) from the root.
    pub fn principal_variation(&self, max_len: usize) -> Vec<Move> {
        let mut line = Vec::new();
        let mut node = self.tree.root();
        let mut mover = self.initial_state.to_play();

        while line.len() < max_len && self.tree.has_children(node) {
            let mut best: Option<(Urgency, NodeId)> = None;
            for child in self.tree.children(node) {
                let stats = &self.tree[child];
                let urgency = match stats.outcome {
                    Outcome::WinFor(winner) if winner == mover => Urgency::Win,
                    Outcome::WinFor(_) => Urgency::Loss,
                    Outcome::Unknown => {
                        Urgency::Value(value_upper_bound(&self.config, stats, 0.0, 0.0, 0.0, false))
                    }
                };
                if best.is_none_or(|(b, _)| urgency > b) {
                    best = Some((urgency, child));
                }
            }
            let Some((_, child)) = best else { break };
            line.push(self.tree[child].mv);
            node = child;
            mover = mover.opponent();
        }
        line
    }

    pub fn summarise_tree(&self) -> TreeSummary {
        let mut nodes = 0usize;
        let mut depth_sum = 0usize;
        let mut weighted_sum = 0.0f64;
        let mut visit_sum = 0.0f64;
        let mut max_depth = 0;

        let mut stack = vec![(self.tree.root(), 0usize)];
        while let Some((node, depth)) = stack.pop() {
            nodes += 1;
            depth_sum += depth;
            max_depth = max_depth.max(depth);
            let visits = self.tree[node].times_played as f64;
            weighted_sum += visits * depth as f64;
            visit_sum += visits;
            stack.extend(self.tree.children(node).map(|c| (c, depth + 1)));
        }

        TreeSummary {
            nodes,
            mean_depth: depth_sum as f32 / nodes as f32,
            weighted_depth: if visit_sum > 0.0 {
                (weighted_sum / visit_sum) as f32
            } else {
                0.0
            },
            max_depth,
        }
    }
}
