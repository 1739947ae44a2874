//! Deck shuffler
//!
//! Produces a non-repeating-until-exhausted sequence from one pool, like a
//! shuffled card deck that is only reshuffled once it is empty. For a pool of
//! N ≥ 2 tracks, N consecutive draws are N distinct tracks; the (N+1)-th draw
//! starts a new cycle over the same pool.
//!
//! The deck is bound to a [`PoolContext`]. Selecting a different context
//! replaces the whole deck state (pool, played set, queue); nothing carries
//! over from the previous pool.
//!
//! The random source is injected so tests can seed it.

use crate::library::{Pool, Track};
use ambient_common::events::PoolContext;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tracing::debug;

struct DeckState {
    context: PoolContext,
    pool: Pool,
    played: HashSet<String>,
    /// Indices into `pool`, front is drawn next
    queue: VecDeque<usize>,
    shuffle_enabled: bool,
}

/// Deck over the active pool
pub struct DeckShuffler<R = StdRng> {
    rng: R,
    state: Option<DeckState>,
}

impl DeckShuffler<StdRng> {
    /// Deck with an entropy-seeded random source
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    /// Deck with a fixed seed (reproducible order)
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> DeckShuffler<R> {
    pub fn new(rng: R) -> Self {
        Self { rng, state: None }
    }

    /// Replace the deck with a fresh one over `pool`
    ///
    /// With `shuffle_enabled` the queue is a random permutation of the pool,
    /// otherwise the pool's natural order. The played set is cleared.
    pub fn reset_deck(&mut self, context: PoolContext, pool: Pool, shuffle_enabled: bool) {
        debug!(
            "Resetting deck: {:?} ({} tracks, shuffle={})",
            context,
            pool.len(),
            shuffle_enabled
        );
        let mut state = DeckState {
            context,
            pool,
            played: HashSet::new(),
            queue: VecDeque::new(),
            shuffle_enabled,
        };
        Self::refill(&mut self.rng, &mut state);
        self.state = Some(state);
    }

    /// Make sure the deck is dealing from `context`
    ///
    /// Resets only if the pool identity changed. Returns true on reset.
    pub fn ensure_pool(&mut self, context: PoolContext, pool: Pool, shuffle_enabled: bool) -> bool {
        if self.context() == Some(context) {
            return false;
        }
        self.reset_deck(context, pool, shuffle_enabled);
        true
    }

    /// Draw the next track
    ///
    /// Reshuffles the same pool when the queue is drained. Returns `None`
    /// only when there is no deck or its pool is empty.
    pub fn next(&mut self) -> Option<Arc<Track>> {
        let state = self.state.as_mut()?;
        if state.pool.is_empty() {
            return None;
        }

        if state.queue.is_empty() || state.played.len() >= state.pool.len() {
            debug!("Deck exhausted, reshuffling {} tracks", state.pool.len());
            state.played.clear();
            Self::refill(&mut self.rng, state);
        }

        let index = state.queue.pop_front()?;
        let track = Arc::clone(&state.pool[index]);
        state.played.insert(track.path.clone());
        Some(track)
    }

    /// Change shuffle mode; applies from the next reshuffle
    pub fn set_shuffle_enabled(&mut self, enabled: bool) {
        if let Some(state) = self.state.as_mut() {
            state.shuffle_enabled = enabled;
        }
    }

    /// Context the deck is dealing from
    pub fn context(&self) -> Option<PoolContext> {
        self.state.as_ref().map(|s| s.context)
    }

    /// Size of the active pool (0 without a deck)
    pub fn pool_len(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.pool.len())
    }

    /// Tracks left before the next reshuffle
    #[cfg(test)]
    pub fn remaining(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.queue.len())
    }

    fn refill(rng: &mut R, state: &mut DeckState) {
        let mut order: Vec<usize> = (0..state.pool.len()).collect();
        if state.shuffle_enabled {
            order.shuffle(rng);
        }
        state.queue = order.into();
    }
}
