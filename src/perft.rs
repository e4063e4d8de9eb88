//! Perft: exact leaf-counting move-generator enumeration.
//!
//! `perft` walks the legal move tree to a fixed depth and counts leaves. It
//! exists to stress-test move generation and make/unmake against known
//! reference counts, not to play chess. Two caches shortcut repeated
//! subtrees: a small direct-mapped cache for depth-2 subtrees (their counts
//! never exceed a few hundred thousand, so a `u32` packed alongside a
//! verification tag fits in one atomic word) and a sharded, locked cache for
//! deeper subtrees whose count clears a triviality threshold.
//!
//! `perft_parallel` farms the work across a fixed worker pool once the tree
//! is wide enough to be worth the thread overhead.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::movegen::generate_legal_moves;
use crate::position::Position;

/// Subtree counts at or below this size are not worth caching; storing them
/// would evict entries that save real work with entries that don't.
const GENERAL_CACHE_MIN_COUNT: u128 = 100;

/// Depth-2 subtree counts never exceed roughly 218 (the widest known legal
/// move count in a single position) squared, comfortably inside a `u32`.
const DEPTH2_CACHE_SLOTS: usize = 1 << 16;

const GENERAL_CACHE_SHARDS: usize = 64;

fn depth_mixer(depth: u32) -> u64 {
    // Splitmix-style odd multiplier, one per depth, so the same hash at two
    // different depths never collides in either cache.
    0x9E37_79B9_7F4A_7C15u64
        .wrapping_mul(u64::from(depth) + 1)
        .rotate_left(depth % 17)
}

struct GeneralCacheEntry {
    key: u64,
    depth: u32,
    count: u128,
}

struct PerftCache {
    depth2_slots: Box<[AtomicU64]>,
    depth2_mask: usize,
    general_shards: Vec<Mutex<HashMap<u64, GeneralCacheEntry>>>,
}

impl PerftCache {
    fn new() -> Self {
        let depth2_slots = (0..DEPTH2_CACHE_SLOTS).map(|_| AtomicU64::new(0)).collect();
        let general_shards = (0..GENERAL_CACHE_SHARDS).map(|_| Mutex::new(HashMap::new())).collect();
        PerftCache {
            depth2_slots,
            depth2_mask: DEPTH2_CACHE_SLOTS - 1,
            general_shards,
        }
    }

    fn probe_depth2(&self, key: u64) -> Option<u32> {
        let slot = &self.depth2_slots[(key as usize) & self.depth2_mask];
        let packed = slot.load(Ordering::Relaxed);
        if packed == 0 {
            return None;
        }
        let tag = (packed >> 32) as u32;
        let expected_tag = (key >> 32) as u32 | 1;
        if tag == expected_tag {
            Some(packed as u32)
        } else {
            None
        }
    }

    fn store_depth2(&self, key: u64, count: u32) {
        let slot = &self.depth2_slots[(key as usize) & self.depth2_mask];
        // Tag is forced odd so a freshly-zeroed slot (packed == 0) never
        // reads back as a spurious hit for tag 0, count 0.
        let tag = u64::from((key >> 32) as u32 | 1);
        slot.store((tag << 32) | u64::from(count), Ordering::Relaxed);
    }

    fn shard_for(&self, key: u64) -> &Mutex<HashMap<u64, GeneralCacheEntry>> {
        &self.general_shards[(key as usize) % GENERAL_CACHE_SHARDS]
    }

    fn probe_general(&self, key: u64, depth: u32) -> Option<u128> {
        let shard = self.shard_for(key).lock();
        shard.get(&key).filter(|entry| entry.depth == depth).map(|entry| entry.count)
    }

    fn store_general(&self, key: u64, depth: u32, count: u128) {
        let mut shard = self.shard_for(key).lock();
        shard.insert(key, GeneralCacheEntry { key, depth, count });
    }
}

static PERFT_CACHE: LazyLock<PerftCache> = LazyLock::new(PerftCache::new);

fn count_leaves(pos: &mut Position, depth: u32) -> u128 {
    if depth == 0 {
        return 1;
    }
    if depth == 1 {
        return u128::from(generate_legal_moves(pos).len() as u64);
    }

    let key = pos.hash() ^ depth_mixer(depth);

    if depth == 2 {
        if let Some(count) = PERFT_CACHE.probe_depth2(key) {
            return u128::from(count);
        }
        let count = count_uncached(pos, depth);
        PERFT_CACHE.store_depth2(key, count as u32);
        return count;
    }

    if let Some(count) = PERFT_CACHE.probe_general(key, depth) {
        return count;
    }
    let count = count_uncached(pos, depth);
    if count > GENERAL_CACHE_MIN_COUNT {
        PERFT_CACHE.store_general(key, depth, count);
    }
    count
}

fn count_uncached(pos: &mut Position, depth: u32) -> u128 {
    let moves = generate_legal_moves(pos);
    let mut total = 0u128;
    for mv in moves.iter() {
        let info = pos.make_move(*mv);
        total += count_leaves(pos, depth - 1);
        pos.unmake_move(*mv, info);
    }
    total
}

/// Count the legal leaves reachable from `pos` in exactly `depth` plies.
///
/// Single-threaded; see [`perft_parallel`] for the worker-pool variant used
/// on deeper trees.
#[must_use]
pub fn perft(pos: &mut Position, depth: u32) -> u128 {
    count_leaves(pos, depth)
}

/// One line of a `perft_divide` breakdown: a root move and the leaf count
/// of the subtree it heads.
#[derive(Debug, Clone, Copy)]
pub struct PerftDivideLine {
    pub mv: crate::types::Move,
    pub nodes: u128,
}

/// Per-root-move leaf counts, useful for isolating a move generation bug
/// against a reference engine's own divide output.
#[must_use]
pub fn perft_divide(pos: &mut Position, depth: u32) -> Vec<PerftDivideLine> {
    let moves = generate_legal_moves(pos);
    let mut lines = Vec::with_capacity(moves.len());
    for mv in moves.iter() {
        let info = pos.make_move(*mv);
        let nodes = if depth == 0 { 1 } else { count_leaves(pos, depth - 1) };
        pos.unmake_move(*mv, info);
        lines.push(PerftDivideLine { mv: *mv, nodes });
    }
    lines
}

/// How often, and through what callback, [`perft_parallel`] reports the
/// running node count while the worker pool is still active.
#[derive(Clone)]
pub struct ProgressConfig {
    pub interval: Duration,
    pub callback: Arc<dyn Fn(u64) + Send + Sync>,
}

/// Push one ply of expansion onto the task list at a time until it has at
/// least `min_tasks` entries or no task can be expanded further.
fn expand_tasks(pos: &Position, depth: u32, min_tasks: usize) -> Vec<(Position, u32)> {
    let mut tasks = vec![(pos.clone(), depth)];
    loop {
        if tasks.len() >= min_tasks {
            break;
        }
        let Some(idx) = tasks.iter().position(|(_, d)| *d > 1) else {
            break;
        };
        let (mut task_pos, task_depth) = tasks.swap_remove(idx);
        let moves = generate_legal_moves(&task_pos);
        for mv in moves.iter() {
            let info = task_pos.make_move(*mv);
            tasks.push((task_pos.clone(), task_depth - 1));
            task_pos.unmake_move(*mv, info);
        }
    }
    tasks
}

/// Count the legal leaves reachable from `pos` in exactly `depth` plies,
/// splitting the work across a fixed worker pool once the tree is wide
/// enough to be worth it.
///
/// `progress`, if given, is polled at a fixed interval from a dedicated
/// thread and fed the node count visited so far; the count is advisory
/// (workers report completed subtrees, not individual leaves) and is not
/// meant to be read back as an exact partial total.
#[must_use]
pub fn perft_parallel(pos: &Position, depth: u32, progress: Option<ProgressConfig>) -> u128 {
    if depth == 0 {
        return 1;
    }

    // depth^3 as a rough stand-in for "estimated work"; small enough depths
    // are cheaper to just run on the calling thread.
    let task_target = (u64::from(depth)).saturating_pow(3).max(1) as usize;
    let tasks = if task_target >= 100 {
        expand_tasks(pos, depth, task_target.max(100))
    } else {
        vec![(pos.clone(), depth)]
    };

    if tasks.len() <= 1 {
        let mut p = pos.clone();
        return count_leaves(&mut p, depth);
    }

    let num_workers = thread::available_parallelism().map(std::num::NonZeroUsize::get).unwrap_or(4).max(4);

    #[cfg(feature = "logging")]
    log::info!("perft worker pool: {} workers over {} tasks at depth {}", num_workers, tasks.len(), depth);

    let tasks = Arc::new(tasks);
    let next_index = Arc::new(AtomicUsize::new(0));
    let visited_nodes = Arc::new(AtomicU64::new(0));
    let stop_progress = Arc::new(AtomicBool::new(false));

    let progress_handle = progress.map(|cfg| {
        let visited_nodes = Arc::clone(&visited_nodes);
        let stop_progress = Arc::clone(&stop_progress);
        thread::spawn(move || {
            while !stop_progress.load(Ordering::Relaxed) {
                thread::sleep(cfg.interval);
                if stop_progress.load(Ordering::Relaxed) {
                    break;
                }
                (cfg.callback)(visited_nodes.load(Ordering::Relaxed));
            }
        })
    });

    let mut handles = Vec::with_capacity(num_workers);
    for _ in 0..num_workers {
        let tasks = Arc::clone(&tasks);
        let next_index = Arc::clone(&next_index);
        let visited_nodes = Arc::clone(&visited_nodes);
        handles.push(thread::spawn(move || {
            let mut local_total: u128 = 0;
            loop {
                let idx = next_index.fetch_add(1, Ordering::Relaxed);
                if idx >= tasks.len() {
                    break;
                }
                let (task_pos, task_depth) = &tasks[idx];
                let mut p = task_pos.clone();
                let count = count_leaves(&mut p, *task_depth);
                local_total += count;
                visited_nodes.fetch_add(u64::try_from(count).unwrap_or(u64::MAX), Ordering::Relaxed);
            }
            local_total
        }));
    }

    let mut grand_total = 0u128;
    for handle in handles {
        grand_total += handle.join().expect("perft worker panicked");
    }

    stop_progress.store(true, Ordering::Relaxed);
    if let Some(handle) = progress_handle {
        let _ = handle.join();
    }

    grand_total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starting_position_matches_known_counts() {
        let mut pos = Position::new();
        assert_eq!(perft(&mut pos, 1), 20);
        assert_eq!(perft(&mut pos, 2), 400);
        assert_eq!(perft(&mut pos, 3), 8_902);
        assert_eq!(perft(&mut pos, 4), 197_281);
    }

    #[test]
    #[ignore = "several million nodes, slow under miri/debug"]
    fn starting_position_matches_known_counts_deep() {
        let mut pos = Position::new();
        assert_eq!(perft(&mut pos, 5), 4_865_609);
        assert_eq!(perft(&mut pos, 6), 119_060_324);
    }

    #[test]
    fn kiwipete_matches_known_counts() {
        let mut pos =
            Position::from_fen("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1");
        assert_eq!(perft(&mut pos, 1), 48);
        assert_eq!(perft(&mut pos, 2), 2_039);
        assert_eq!(perft(&mut pos, 3), 97_862);
    }

    #[test]
    #[ignore = "four million nodes, slow under miri/debug"]
    fn kiwipete_matches_known_count_at_depth_four() {
        let mut pos =
            Position::from_fen("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1");
        assert_eq!(perft(&mut pos, 4), 4_085_603);
    }

    #[test]
    fn endgame_position_matches_known_counts() {
        let mut pos = Position::from_fen("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1");
        assert_eq!(perft(&mut pos, 1), 14);
        assert_eq!(perft(&mut pos, 2), 191);
        assert_eq!(perft(&mut pos, 3), 2_812);
    }

    #[test]
    fn discovered_check_position_matches_known_counts() {
        let mut pos =
            Position::from_fen("r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1");
        assert_eq!(perft(&mut pos, 1), 6);
        assert_eq!(perft(&mut pos, 2), 264);
        assert_eq!(perft(&mut pos, 3), 9_467);
    }

    #[test]
    fn promotion_race_position_matches_known_counts() {
        let mut pos = Position::from_fen("rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8");
        assert_eq!(perft(&mut pos, 1), 44);
        assert_eq!(perft(&mut pos, 2), 1_486);
        assert_eq!(perft(&mut pos, 3), 62_379);
    }

    #[test]
    fn maximum_branching_position_matches_known_count() {
        let mut pos = Position::from_fen("R6R/3Q4/1Q4Q1/4Q3/2Q4Q/Q4Q2/pp1Q4/kBNN1KB1 w - - 0 1");
        assert_eq!(perft(&mut pos, 3), 19_073);
    }

    #[test]
    fn parallel_perft_agrees_with_single_threaded_perft() {
        let pos = Position::from_fen("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1");
        let mut single = pos.clone();
        assert_eq!(perft_parallel(&pos, 3, None), perft(&mut single, 3));
    }

    #[test]
    fn parallel_perft_reports_progress() {
        let pos = Position::new();
        let reports: Arc<Mutex<Vec<u64>>> = Arc::new(Mutex::new(Vec::new()));
        let reports_clone = Arc::clone(&reports);
        let progress = ProgressConfig {
            interval: Duration::from_millis(1),
            callback: Arc::new(move |n| reports_clone.lock().push(n)),
        };
        let total = perft_parallel(&pos, 4, Some(progress));
        assert_eq!(total, 197_281);
    }

    #[test]
    fn divide_breakdown_sums_to_total() {
        let mut pos = Position::new();
        let total = perft(&mut pos, 3);
        let lines = perft_divide(&mut pos, 3);
        let summed: u128 = lines.iter().map(|line| line.nodes).sum();
        assert_eq!(summed, total);
        assert_eq!(lines.len(), 20);
    }
}
