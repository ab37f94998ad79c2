//! Integration tests for uct-go
//!
//! These exercise the public API the way a front end would: whole games on
//! `Position` and `Engine`, plus property checks on the union-find and the
//! search tree with randomly generated inputs.

use std::collections::HashSet;

use fastrand::Rng;

use uct_go::config::SearchConfig;
use uct_go::coord::{Color, Move, Point, neighbors, parse_move};
use uct_go::disjoint_set::{DisjointSets, Token};
use uct_go::engine::{Engine, SearchBudget};
use uct_go::position::{MoveError, Position, Superko};
use uct_go::tree::Tree;

// =============================================================================
// Helper functions for setting up test positions
// =============================================================================

/// Play a sequence of GTP vertices, alternating colors from Black.
fn setup_position(size: usize, moves: &[&str]) -> Position {
    let mut pos = Position::new_game(size, Superko::Positional);
    for text in moves {
        let mv = parse_move(text, size).unwrap_or_else(|| panic!("bad vertex {text}"));
        pos.play(mv).unwrap_or_else(|e| panic!("{text}: {e}"));
    }
    pos
}

fn vertex(text: &str, size: usize) -> Move {
    parse_move(text, size).unwrap()
}

fn small_config(seed: u64) -> SearchConfig {
    SearchConfig {
        max_mem_mb: 16,
        seed,
        ..SearchConfig::default()
    }
}

/// Area score computed from scratch with a flood fill.
fn flood_fill_score(pos: &Position) -> (f32, f32) {
    let n = pos.num_points();
    let mut black = 0.0;
    let mut white = pos.komi();
    let mut seen = vec![false; n];

    for p in 0..n {
        match pos.get(p) {
            Some(Color::Black) => black += 1.0,
            Some(Color::White) => white += 1.0,
            None if !seen[p] => {
                let mut region = 0.0;
                let mut touches = [false; 2];
                let mut stack = vec![p];
                seen[p] = true;
                while let Some(q) = stack.pop() {
                    region += 1.0;
                    for &r in neighbors(q, pos.size()).iter() {
                        match pos.get(r) {
                            Some(c) => touches[c.index()] = true,
                            None if !seen[r] => {
                                seen[r] = true;
                                stack.push(r);
                            }
                            None => {}
                        }
                    }
                }
                match touches {
                    [true, false] => black += region,
                    [false, true] => white += region,
                    _ => {}
                }
            }
            None => {}
        }
    }
    (black, white)
}

// =============================================================================
// Legality
// =============================================================================

#[test]
fn test_fresh_board_everything_is_legal() {
    for size in [2, 5, 9, 13, 19] {
        let pos = Position::new_game(size, Superko::Positional);
        for p in 0..size * size {
            assert!(pos.is_legal(Move::Play(p)), "{size}x{size} point {p}");
        }
        assert!(pos.is_legal(Move::Pass));
        assert!(!pos.is_legal(Move::Resign));
        assert_eq!(pos.legal_moves().len(), size * size + 1);
    }
}

#[test]
fn test_occupied_point_is_illegal() {
    let mut pos = setup_position(9, &["E5"]);
    assert!(!pos.is_legal(vertex("E5", 9)));
    assert_eq!(pos.play(vertex("E5", 9)), Err(MoveError::Occupied));
    // A rejected move leaves the position untouched.
    assert_eq!(pos.to_play(), Color::White);
    assert_eq!(pos.move_number(), 1);
}

#[test]
fn test_ko_recapture_is_superko() {
    for superko in [Superko::Positional, Superko::Situational] {
        let mut pos = Position::new_game(9, superko);
        for text in ["A2", "C1", "B1", "C3", "B3", "D2", "pass", "B2", "C2"] {
            pos.play(vertex(text, 9)).unwrap();
        }
        // Black C2 captured white B2; retaking at once repeats the position.
        assert_eq!(pos.play(vertex("B2", 9)), Err(MoveError::Superko));
    }
}

#[test]
fn test_suicide_is_illegal() {
    let pos = setup_position(9, &["B1", "pass", "A2"]);
    assert_eq!(pos.query(vertex("A1", 9)), Err(MoveError::Suicide));
}

// =============================================================================
// Captures and scoring
// =============================================================================

#[test]
fn test_capture_restores_liberties() {
    let mut pos = setup_position(9, &["B1", "B2", "A2", "pass", "C2", "pass"]);
    let b2 = vertex("B2", 9).point().unwrap();
    let b1 = vertex("B1", 9).point().unwrap();

    let captured = pos.play(vertex("B3", 9)).unwrap();
    assert_eq!(captured, 1);
    assert_eq!(pos.get(b2), None);
    assert!(pos.empty_points().contains(b2));

    let root = pos.group_of(b1).unwrap();
    assert!(pos.liberties(root).contains(b2));
    for root in pos.groups().roots() {
        assert_eq!(pos.group_color(*root), Color::Black);
    }
}

#[test]
fn test_double_pass_white_wins_by_komi() {
    let mut pos = Position::new_game(9, Superko::Positional);
    pos.play(Move::Pass).unwrap();
    assert!(!pos.is_game_over());
    pos.play(Move::Pass).unwrap();
    assert!(pos.is_game_over());
    assert_eq!(pos.winner(), Some(Color::White));
    assert_eq!(pos.score().to_string(), "W+6.5");
}

#[test]
fn test_engine_winner_matches_scoring() {
    let mut state = Position::new_game(5, Superko::Positional);
    state.set_komi(2.5);
    let mut engine = Engine::new(state, small_config(1)).unwrap();
    engine.apply(Color::Black, vertex("C3", 5)).unwrap();
    engine.apply(Color::White, Move::Pass).unwrap();
    engine.apply(Color::Black, Move::Pass).unwrap();

    let (black, white) = flood_fill_score(engine.state());
    assert_eq!((black, white), (25.0, 2.5));
    assert_eq!(engine.winner(), Some(Color::Black));
    let score = engine.score();
    assert_eq!((score.black, score.white), (black, white));
}

#[test]
fn test_random_games_score_like_flood_fill() {
    let mut rng = Rng::with_seed(99);
    for _ in 0..20 {
        let mut pos = Position::new_game(7, Superko::Positional);
        for _ in 0..60 {
            let moves = pos.legal_moves();
            pos.play(moves[rng.usize(..moves.len())]).unwrap();
        }
        let (black, white) = flood_fill_score(&pos);
        let score = pos.score();
        assert_eq!((score.black, score.white), (black, white));
    }
}

// =============================================================================
// Union-find properties
// =============================================================================

#[derive(Clone, Default)]
struct Count(usize);

impl Token for Count {
    fn merge(&mut self, other: &Self) {
        self.0 += other.0;
    }
}

#[test]
fn test_union_find_properties() {
    let mut rng = Rng::with_seed(5);
    let n = 81;
    let mut sets: DisjointSets<Count> = DisjointSets::new(n);

    for _ in 0..2000 {
        let a = rng.usize(..n);
        let b = rng.usize(..n);
        match rng.u8(..4) {
            0 | 1 => {
                for e in [a, b] {
                    if sets.is_dispersed(e) {
                        sets.create_singleton_with(e, Count(1));
                    }
                }
                let root = sets.join(a, b);
                assert_eq!(sets.find(a), Some(root));
                assert_eq!(sets.find(b), Some(root));
                assert!(sets.members(root).contains(a) && sets.members(root).contains(b));
                // Joining again changes nothing.
                assert_eq!(sets.join(a, b), root);
            }
            2 => {
                if !sets.is_dispersed(a) {
                    let root = sets.find(a).unwrap();
                    let members: Vec<Point> = sets.members(root).iter().collect();
                    sets.disperse(a);
                    assert!(members.iter().all(|&m| sets.is_dispersed(m)));
                }
            }
            _ => {}
        }

        // find is idempotent and membership agrees with find.
        let roots: HashSet<usize> = sets.roots().iter().copied().collect();
        for e in 0..n {
            match sets.find(e) {
                Some(root) => {
                    assert_eq!(sets.find(root), Some(root));
                    assert!(roots.contains(&root));
                    assert!(sets.members(root).contains(e));
                }
                None => assert!(roots.iter().all(|&r| !sets.members(r).contains(e))),
            }
        }
        for &root in &roots {
            assert_eq!(sets.token(root).0, sets.members(root).count());
        }
    }
}

// =============================================================================
// Search tree compaction
// =============================================================================

fn random_tree(rng: &mut Rng, max_nodes: usize) -> Tree<u32> {
    let mut tree = Tree::new(max_nodes, rng.u32(..40));
    let mut frontier = vec![tree.root()];
    let mut next = Vec::new();
    while !frontier.is_empty() {
        for &node in &frontier {
            if rng.bool() {
                continue;
            }
            let kids = rng.usize(1..6);
            if tree.unused_capacity() < kids {
                return tree;
            }
            for _ in 0..kids {
                next.push(tree.add_child(node, rng.u32(..40)));
            }
        }
        frontier = std::mem::take(&mut next);
    }
    tree
}

#[test]
fn test_compaction_properties() {
    let mut rng = Rng::with_seed(21);
    for _ in 0..50 {
        let mut tree = random_tree(&mut rng, 500);
        let root_val = tree[tree.root()];
        let threshold = rng.u32(..40);

        tree.recursively_mark_if(|&v| v >= threshold);
        tree.erase_children_of_unmarked_nodes();

        let root = tree.root();
        assert_eq!(tree[root], root_val);
        assert_eq!(tree.len(), tree.subtree_size(root));

        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if tree.has_children(node) {
                assert!(tree[node] >= threshold);
            }
            if let Some(parent) = tree.parent(node) {
                assert!(tree[parent] >= threshold);
            }
            for child in tree.children(node) {
                assert_eq!(tree.parent(child), Some(node));
                stack.push(child);
            }
        }
    }
}

// =============================================================================
// Search
// =============================================================================

#[test]
fn test_same_seed_same_moves() {
    let mut a = Engine::new(Position::new_game(5, Superko::Positional), small_config(42)).unwrap();
    let mut b = Engine::new(Position::new_game(5, Superko::Positional), small_config(42)).unwrap();

    for _ in 0..4 {
        let mv_a = a.request_move(SearchBudget::Playouts(400), false);
        let mv_b = b.request_move(SearchBudget::Playouts(400), false);
        assert_eq!(mv_a, mv_b);
        if mv_a == Move::Resign {
            break;
        }
        a.notify_move_played(mv_a).unwrap();
        b.notify_move_played(mv_b).unwrap();
    }
    assert_eq!(a.state().hash(), b.state().hash());
}

#[test]
fn test_self_play_to_the_end() {
    let config = SearchConfig {
        reuse_tree: true,
        num_threads: 2,
        resign_if_appropriate: false,
        ..small_config(3)
    };
    let mut engine = Engine::new(Position::new_game(5, Superko::Situational), config).unwrap();

    let mut moves = 0;
    while !engine.state().is_game_over() && moves < 150 {
        let mv = engine.request_move(SearchBudget::Playouts(100), false);
        assert!(engine.is_legal(mv), "engine chose illegal {mv:?}");
        engine.notify_move_played(mv).unwrap();
        moves += 1;
    }
    let (black, white) = flood_fill_score(engine.state());
    let expected = if black > white {
        Some(Color::Black)
    } else if white > black {
        Some(Color::White)
    } else {
        None
    };
    assert_eq!(engine.winner(), expected);
}
