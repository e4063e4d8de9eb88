//! Engine wiring: evaluator selection, transposition table sizing, and the
//! handful of settings a UCI `setoption` handler would forward into the
//! core. This is the only layer that knows both the search and the two
//! evaluators exist; everything below it takes an evaluator as a plain
//! closure and doesn't care where it came from.

use std::sync::Arc;

use crate::eval;
use crate::nnue::{self, network::NnueNetwork};
use crate::position::Position;
use crate::search::tt::TranspositionTable;
use crate::search::{self, SearchConfig, SearchLimits, SearchOutcome};

/// Which evaluator a search should call at its leaves.
#[derive(Clone)]
pub enum EvalSource {
    /// The static, hand-tuned piece-square-table evaluator.
    Static,
    /// A loaded HalfKP network.
    Nnue(Arc<NnueNetwork>),
}

impl Default for EvalSource {
    /// With `embedded_nnue` compiled in, default to a zero-weight network
    /// rather than touching the filesystem; callers that want real NNUE
    /// strength load a trained file via [`EngineConfig::with_nnue_file`].
    fn default() -> Self {
        if cfg!(feature = "embedded_nnue") {
            EvalSource::Nnue(Arc::new(NnueNetwork::zero()))
        } else {
            EvalSource::Static
        }
    }
}

impl EvalSource {
    #[must_use]
    pub fn evaluate(&self, pos: &Position) -> i32 {
        match self {
            EvalSource::Static => eval::evaluate_board(pos),
            EvalSource::Nnue(network) => nnue::evaluate(network, pos),
        }
    }
}

/// Settings a caller (a UCI `setoption` handler, a test harness) can adjust
/// before building an [`Engine`].
#[derive(Clone)]
pub struct EngineConfig {
    pub eval_source: EvalSource,
    pub tt_size_mb: usize,
    /// Worker count for [`crate::perft::perft_parallel`]; `None` defers to
    /// hardware concurrency.
    pub perft_workers: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig { eval_source: EvalSource::default(), tt_size_mb: 16, perft_workers: None }
    }
}

impl EngineConfig {
    /// Load a trained network from disk, falling back to the static
    /// evaluator (rather than failing construction) if the file is missing
    /// or malformed.
    #[must_use]
    pub fn with_nnue_file(mut self, path: impl AsRef<std::path::Path>) -> Self {
        match NnueNetwork::load(&path) {
            Ok(network) => {
                #[cfg(feature = "logging")]
                log::info!("loaded NNUE network from {:?}", path.as_ref());
                self.eval_source = EvalSource::Nnue(Arc::new(network));
            }
            Err(_err) => {
                #[cfg(feature = "logging")]
                log::warn!("failed to load NNUE file {:?}, falling back to static eval: {_err}", path.as_ref());
                self.eval_source = EvalSource::Static;
            }
        }
        self
    }

    #[must_use]
    pub fn with_static_eval(mut self) -> Self {
        self.eval_source = EvalSource::Static;
        self
    }

    #[must_use]
    pub fn with_tt_size_mb(mut self, size_mb: usize) -> Self {
        self.tt_size_mb = size_mb.max(1);
        self
    }

    #[must_use]
    pub fn with_perft_workers(mut self, workers: usize) -> Self {
        self.perft_workers = Some(workers.max(1));
        self
    }
}

/// Owns the transposition table and evaluator a game session reuses across
/// `computeBestMove` calls.
pub struct Engine {
    config: EngineConfig,
    tt: TranspositionTable,
}

impl Engine {
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        let tt = TranspositionTable::new(config.tt_size_mb);
        Engine { config, tt }
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Clear the transposition table for a new game. Killers and history
    /// are already per-search-local state, so nothing else survives
    /// between `computeBestMove` calls anyway.
    pub fn new_game(&mut self) {
        self.tt.clear();
    }

    #[must_use]
    pub fn best_move(
        &mut self,
        pos: &mut Position,
        search_config: &SearchConfig,
        limits: &SearchLimits,
    ) -> SearchOutcome {
        let eval_source = self.config.eval_source.clone();
        search::iterative_deepening(pos, &mut self.tt, search_config, limits, &move |p| {
            eval_source.evaluate(p)
        })
    }

    /// Worker count [`crate::perft::perft_parallel`] should use: the
    /// configured override, or `max(4, hardware concurrency)`.
    #[must_use]
    pub fn perft_worker_count(&self) -> usize {
        self.config.perft_workers.unwrap_or_else(|| {
            std::thread::available_parallelism().map(std::num::NonZeroUsize::get).unwrap_or(4).max(4)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_builds_an_engine() {
        let mut engine = Engine::new(EngineConfig::default());
        let mut pos = Position::new();
        let limits = SearchLimits {
            max_depth: Some(2),
            ..SearchLimits::default()
        };
        let outcome = engine.best_move(&mut pos, &SearchConfig::default(), &limits);
        assert!(outcome.best_move.is_some());
    }

    #[test]
    fn missing_nnue_file_falls_back_to_static_eval() {
        let config = EngineConfig::default().with_nnue_file("definitely-not-a-real-file.nnue");
        assert!(matches!(config.eval_source, EvalSource::Static));
    }

    #[test]
    fn new_game_clears_the_transposition_table() {
        let mut engine = Engine::new(EngineConfig::default());
        let mut pos = Position::new();
        let limits = SearchLimits { max_depth: Some(3), ..SearchLimits::default() };
        engine.best_move(&mut pos, &SearchConfig::default(), &limits);
        engine.new_game();
        assert_eq!(engine.tt.hashfull_per_mille(), 0);
    }

    #[test]
    fn explicit_perft_worker_count_overrides_hardware_concurrency() {
        let config = EngineConfig::default().with_perft_workers(2);
        let engine = Engine::new(config);
        assert_eq!(engine.perft_worker_count(), 2);
    }
}
