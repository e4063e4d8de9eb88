//! Iterative-deepening alpha-beta search: fail-soft negamax with a
//! transposition table, null-move pruning, late move reductions, a forced
//! move extension, draw detection, and a capture/check quiescence search.

pub mod time;
pub mod tt;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::eval;
use crate::eval::see;
use crate::eval::Score;
use crate::movegen::generate_legal_moves;
use crate::position::Position;
use crate::types::{Color, Move, PieceKind, ScoredMoveList};
use tt::{Bound, TranspositionTable};

const MAX_PLY: usize = crate::types::MAX_PLY;

/// Score magnitude used as the search's "infinity", sourced from
/// [`Score::max`] rather than duplicated as a separate literal, so mate
/// distances stay inside the same protected range the TT and the rest of
/// the crate agree on.
const INFINITY: i32 = Score::max().cp();

const NULL_MOVE_MIN_DEPTH: u32 = 3;
const NULL_MOVE_REDUCTION: u32 = 2;
const LMR_MIN_DEPTH: u32 = 3;
const LMR_MIN_MOVE_INDEX: usize = 3;
const NEAR_MATE_MARGIN: i32 = 100;
const HISTORY_MAX: i32 = 16_384;

const TIER_TT: i32 = 3_000_000;
const TIER_CAPTURE: i32 = 2_000_000;
const TIER_KILLER: i32 = 1_000_000;

/// Tunable search parameters, separate from the hard limits a caller (e.g.
/// a UCI `go` command) imposes on a particular search.
#[derive(Clone, Copy, Debug)]
pub struct SearchConfig {
    /// Depth searched when no other limit is given.
    pub max_depth: u32,
    pub null_move: bool,
    pub null_move_min_depth: u32,
    pub null_move_reduction: u32,
    pub late_move_reductions: bool,
    /// Plies of quiescence search before forcing a stand-pat return.
    pub quiescence_max_depth: i32,
    /// Quiescence plies during which promotions (beyond captures) are
    /// still searched instead of pruned.
    pub promotion_min_qdepth: i32,
    /// Skip captures with a negative static-exchange result in quiescence.
    pub see_pruning_in_quiescence: bool,
    /// Half-width of the aspiration window re-centered around each
    /// iteration's previous score.
    pub aspiration_window: i32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            max_depth: 64,
            null_move: true,
            null_move_min_depth: NULL_MOVE_MIN_DEPTH,
            null_move_reduction: NULL_MOVE_REDUCTION,
            late_move_reductions: true,
            quiescence_max_depth: 5,
            promotion_min_qdepth: 2,
            see_pruning_in_quiescence: true,
            aspiration_window: 25,
        }
    }
}

/// Hard limits on a single search invocation.
#[derive(Clone)]
pub struct SearchLimits {
    pub max_depth: Option<u32>,
    pub max_nodes: Option<u64>,
    pub move_time_ms: Option<u64>,
    pub stop: Arc<AtomicBool>,
}

impl Default for SearchLimits {
    fn default() -> Self {
        SearchLimits {
            max_depth: None,
            max_nodes: None,
            move_time_ms: None,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }
}

/// Result of an iterative-deepening search.
#[derive(Clone, Copy, Debug)]
pub struct SearchOutcome {
    pub best_move: Option<Move>,
    pub score: Score,
    pub depth: u32,
    pub nodes: u64,
}

/// Non-negative move/square history scores, indexed by side to move. Used
/// to order quiet moves that aren't the TT move or a killer.
pub(crate) struct HistoryTable {
    table: [[[i32; 64]; 64]; 2],
}

impl HistoryTable {
    fn new() -> Self {
        HistoryTable { table: [[[0; 64]; 64]; 2] }
    }

    #[must_use]
    fn score(&self, side: Color, from: crate::types::Square, to: crate::types::Square) -> i32 {
        self.table[side.index()][from.as_index()][to.as_index()]
    }

    fn update(&mut self, side: Color, from: crate::types::Square, to: crate::types::Square, depth: u32) {
        let bonus = (depth * depth) as i32;
        let slot = &mut self.table[side.index()][from.as_index()][to.as_index()];
        *slot = (*slot + bonus).min(HISTORY_MAX);
    }
}

fn has_non_pawn_material(pos: &Position) -> bool {
    let board = pos.board();
    let side = pos.side_to_move();
    for kind in [PieceKind::Knight, PieceKind::Bishop, PieceKind::Rook, PieceKind::Queen] {
        if !board.pieces_of(side, kind).is_empty() {
            return true;
        }
    }
    false
}

/// Per-invocation search state: TT reference, killer/history tables, node
/// accounting, and the deadline derived from the caller's limits.
struct Search<'a> {
    tt: &'a mut TranspositionTable,
    killers: [[Move; 2]; MAX_PLY],
    history: HistoryTable,
    nodes: u64,
    aborted: bool,
    start: Instant,
    config: SearchConfig,
    limits: &'a SearchLimits,
    evaluate: &'a dyn Fn(&Position) -> i32,
}

impl<'a> Search<'a> {
    fn new(
        tt: &'a mut TranspositionTable,
        config: SearchConfig,
        limits: &'a SearchLimits,
        evaluate: &'a dyn Fn(&Position) -> i32,
    ) -> Self {
        Search {
            tt,
            killers: [[Move::null(); 2]; MAX_PLY],
            history: HistoryTable::new(),
            nodes: 0,
            aborted: false,
            start: Instant::now(),
            config,
            limits,
            evaluate,
        }
    }

    /// Checked every node; cheap enough that we don't need to rate-limit
    /// the clock read any more coarsely than that.
    fn should_abort(&self) -> bool {
        if self.limits.stop.load(Ordering::Relaxed) {
            return true;
        }
        if let Some(max_nodes) = self.limits.max_nodes {
            if self.nodes >= max_nodes {
                return true;
            }
        }
        if let Some(move_time_ms) = self.limits.move_time_ms {
            if self.start.elapsed().as_millis() as u64 >= move_time_ms {
                return true;
            }
        }
        false
    }

    fn store_killer(&mut self, ply: usize, mv: Move) {
        if ply >= MAX_PLY {
            return;
        }
        if self.killers[ply][0] != mv {
            self.killers[ply][1] = self.killers[ply][0];
            self.killers[ply][0] = mv;
        }
    }

    /// Order legal moves for a node: TT move first, then captures/promotions
    /// by [`eval::score_move`], then killers, then quiets by history.
    fn order_moves(&self, pos: &Position, moves: &crate::types::MoveList, ply: usize, tt_move: Option<Move>) -> ScoredMoveList {
        let mut scored = ScoredMoveList::new();
        for &mv in moves.iter() {
            let score = if Some(mv) == tt_move {
                TIER_TT
            } else if mv.is_capture() || mv.is_promotion() {
                TIER_CAPTURE + eval::score_move(pos, mv)
            } else if ply < MAX_PLY && mv == self.killers[ply][0] {
                TIER_KILLER + 10
            } else if ply < MAX_PLY && mv == self.killers[ply][1] {
                TIER_KILLER
            } else {
                self.history.score(pos.side_to_move(), mv.from(), mv.to())
            };
            scored.push(mv, score);
        }
        scored
    }

    fn negamax(&mut self, pos: &mut Position, depth: u32, mut alpha: Score, beta: Score, ply: usize, allow_null: bool) -> Score {
        if self.should_abort() {
            self.aborted = true;
            return Score::DRAW;
        }
        self.nodes += 1;

        if ply > 0 && pos.is_draw_by_clock_or_repetition() {
            return Score::DRAW;
        }

        if depth == 0 {
            return self.quiescence(pos, alpha, beta, 0);
        }

        let is_pv = beta.cp() - alpha.cp() > 1;
        let in_check = eval::is_in_check(pos);
        let hash = pos.hash();

        let mut tt_move = None;
        if let Some(entry) = self.tt.probe(hash) {
            tt_move = entry.best_move();
            let tt_score = Score::from_cp(entry.score());
            if entry.depth() >= depth && !is_pv && entry.generation() == self.tt.generation() {
                let cutoff = match entry.bound() {
                    Bound::Exact => true,
                    Bound::Lower => tt_score >= beta,
                    Bound::Upper => tt_score <= alpha,
                };
                if cutoff {
                    return tt_score;
                }
            }
        }

        if self.config.null_move
            && allow_null
            && !is_pv
            && !in_check
            && ply > 0
            && depth >= self.config.null_move_min_depth
            && beta.cp().abs() < INFINITY - NEAR_MATE_MARGIN
            && has_non_pawn_material(pos)
        {
            let reduced = depth.saturating_sub(1 + self.config.null_move_reduction);
            let info = pos.make_null_move();
            let score = -self.negamax(pos, reduced, -beta, -beta + 1, ply + 1, false);
            pos.unmake_null_move(info);
            if self.aborted {
                return Score::DRAW;
            }
            if score >= beta {
                return score;
            }
        }

        let moves = generate_legal_moves(pos);
        if moves.is_empty() {
            return Score::from_cp(if in_check { -INFINITY + ply as i32 } else { 0 });
        }

        // Forced move extension: search one ply deeper when there is exactly
        // one legal move, but never past the fifty-move limit.
        let search_depth =
            if moves.len() == 1 && pos.turn().halfmove_clock < 50 { depth + 1 } else { depth };

        let mut scored = self.order_moves(pos, &moves, ply, tt_move);
        let move_count = scored.len();

        let mut best_score = Score::min();
        let mut best_move = None;
        let mut bound = Bound::Upper;

        for i in 0..move_count {
            let Some(mv) = scored.select_next(i) else { break };
            let is_quiet = !mv.is_capture() && !mv.is_promotion();

            let undo = pos.make_move(mv);
            let gives_check = eval::is_in_check(pos);

            let reduction = if self.config.late_move_reductions
                && i >= LMR_MIN_MOVE_INDEX
                && search_depth > LMR_MIN_DEPTH
                && is_quiet
                && !in_check
                && !gives_check
                && !is_pv
            {
                1
            } else {
                0
            };

            let score = if i == 0 {
                -self.negamax(pos, search_depth - 1, -beta, -alpha, ply + 1, true)
            } else {
                let reduced_depth = (search_depth - 1).saturating_sub(reduction);
                let mut s = -self.negamax(pos, reduced_depth, -alpha - 1, -alpha, ply + 1, true);
                if reduction > 0 && s > alpha {
                    s = -self.negamax(pos, search_depth - 1, -alpha - 1, -alpha, ply + 1, true);
                }
                if s > alpha && s < beta {
                    s = -self.negamax(pos, search_depth - 1, -beta, -alpha, ply + 1, true);
                }
                s
            };

            pos.unmake_move(mv, undo);

            if self.aborted {
                return Score::DRAW;
            }

            if score > best_score {
                best_score = score;
                best_move = Some(mv);
                if score > alpha {
                    alpha = score;
                    bound = Bound::Exact;
                    if score >= beta {
                        bound = Bound::Lower;
                        if is_quiet {
                            self.store_killer(ply, mv);
                            self.history.update(pos.side_to_move(), mv.from(), mv.to(), depth);
                        }
                        break;
                    }
                }
            }
        }

        self.tt.store(hash, depth, best_score.cp(), bound, best_move);
        best_score
    }

    fn quiescence(&mut self, pos: &mut Position, mut alpha: Score, beta: Score, qdepth: i32) -> Score {
        if self.should_abort() {
            self.aborted = true;
            return Score::DRAW;
        }
        self.nodes += 1;

        let in_check = eval::is_in_check(pos);
        let stand_pat = if in_check { Score::min() } else { Score::from_cp((self.evaluate)(pos)) };

        if !in_check {
            if stand_pat >= beta {
                return stand_pat;
            }
            if stand_pat > alpha {
                alpha = stand_pat;
            }
            if qdepth >= self.config.quiescence_max_depth {
                return stand_pat;
            }
        }

        let moves = generate_legal_moves(pos);
        if in_check && moves.is_empty() {
            return Score::min();
        }

        let mut scored = ScoredMoveList::new();
        for &mv in moves.iter() {
            if in_check {
                scored.push(mv, eval::score_move(pos, mv));
                continue;
            }
            if mv.is_capture() {
                if self.config.see_pruning_in_quiescence && see::see(pos, mv.from(), mv.to()) < 0 {
                    continue;
                }
                scored.push(mv, eval::score_move(pos, mv));
            } else if mv.is_promotion() && qdepth < self.config.promotion_min_qdepth {
                scored.push(mv, eval::score_move(pos, mv));
            }
        }

        let mut best_score = stand_pat;
        let count = scored.len();
        for i in 0..count {
            let Some(mv) = scored.select_next(i) else { break };
            let undo = pos.make_move(mv);
            let score = -self.quiescence(pos, -beta, -alpha, qdepth + 1);
            pos.unmake_move(mv, undo);

            if self.aborted {
                return Score::DRAW;
            }

            if score > best_score {
                best_score = score;
                if score > alpha {
                    alpha = score;
                    if score >= beta {
                        break;
                    }
                }
            }
        }

        best_score
    }
}

/// Run an iterative-deepening search from `pos`, using `tt` for cutoffs and
/// move ordering across the whole session. `evaluate` is called at
/// quiescence leaves; pass [`eval::evaluate_board`] for the static
/// evaluator or a closure over a loaded [`crate::nnue::network::NnueNetwork`]
/// to search with NNUE instead. Each call bumps the table's generation and
/// starts with fresh killer/history tables, so repeated calls across a game
/// are independent searches rather than a persistent session; [`crate::engine::Engine`]
/// is the session-level wrapper that keeps the same `tt` across moves in a
/// game while still starting killers/history fresh each call.
#[must_use]
pub fn iterative_deepening(
    pos: &mut Position,
    tt: &mut TranspositionTable,
    config: &SearchConfig,
    limits: &SearchLimits,
    evaluate: &dyn Fn(&Position) -> i32,
) -> SearchOutcome {
    tt.new_search();
    let max_depth = limits.max_depth.unwrap_or(config.max_depth).max(1);
    let mut search = Search::new(tt, *config, limits, evaluate);

    let mut best_move = None;
    let mut best_score = Score::DRAW;
    let mut completed_depth = 0;

    for depth in 1..=max_depth {
        if search.should_abort() {
            break;
        }

        let mut delta = config.aspiration_window;
        let (mut alpha, mut beta) = if depth >= 2 {
            (
                Score::from_cp((best_score.cp() - delta).max(-INFINITY)),
                Score::from_cp((best_score.cp() + delta).min(INFINITY)),
            )
        } else {
            (Score::min(), Score::max())
        };

        let score = loop {
            let s = search.negamax(pos, depth, alpha, beta, 0, true);
            if search.aborted {
                break s;
            }
            if s <= alpha && alpha.cp() > -INFINITY {
                alpha = Score::from_cp((alpha.cp() - delta).max(-INFINITY));
                delta *= 2;
            } else if s >= beta && beta.cp() < INFINITY {
                beta = Score::from_cp((beta.cp() + delta).min(INFINITY));
                delta *= 2;
            } else {
                break s;
            }
        };

        if search.aborted {
            break;
        }

        best_score = score;
        completed_depth = depth;
        if let Some(entry) = search.tt.probe(pos.hash()) {
            best_move = entry.best_move();
        }

        #[cfg(feature = "logging")]
        log::debug!(
            "depth {} complete: score {} nodes {} best {:?}",
            completed_depth,
            best_score.cp(),
            search.nodes,
            best_move
        );
    }

    SearchOutcome { best_move, score: best_score, depth: completed_depth, nodes: search.nodes }
}
