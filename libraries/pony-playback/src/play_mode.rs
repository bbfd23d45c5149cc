//! Next/previous track selection
//!
//! Sequential, LoopAll and LoopOne are plain index arithmetic. Shuffle uses a
//! shuffle bag: a random permutation consumed without replacement, so no
//! track repeats before every other track has been drawn once. The drawn
//! indices double as a bounded history for "previous".

use crate::types::PlayMode;
use rand::seq::SliceRandom;
use rand::{thread_rng, Rng};
use std::collections::HashSet;

/// Maximum number of drawn indices remembered for "previous"
const SHUFFLE_HISTORY_LIMIT: usize = 100;

/// Next position for the ordered modes
///
/// `Shuffle` is handled by [`ShuffleBag`]; passed here it steps like `LoopAll`.
pub fn ordered_next(len: usize, current: Option<usize>, mode: PlayMode) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let Some(current) = current.filter(|&c| c < len) else {
        return Some(0);
    };

    match mode {
        PlayMode::Sequential => (current + 1 < len).then_some(current + 1),
        PlayMode::LoopAll | PlayMode::Shuffle => Some((current + 1) % len),
        PlayMode::LoopOne => Some(current),
    }
}

/// Previous position for the ordered modes
pub fn ordered_prev(len: usize, current: Option<usize>, mode: PlayMode) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let Some(current) = current.filter(|&c| c < len) else {
        return Some(len - 1);
    };

    match mode {
        PlayMode::Sequential => current.checked_sub(1),
        PlayMode::LoopAll | PlayMode::Shuffle => {
            Some(if current == 0 { len - 1 } else { current - 1 })
        }
        PlayMode::LoopOne => Some(current),
    }
}

/// Consume-without-replacement random order over playlist positions
#[derive(Debug, Clone, Default)]
pub struct ShuffleBag {
    /// Playlist length the bag was built for
    len: usize,

    /// Undrawn positions of the current round (drawn from the back)
    remaining: Vec<usize>,

    /// Drawn positions, oldest first
    drawn: Vec<usize>,

    /// Positions already played in the current round
    round: HashSet<usize>,

    /// Position in `drawn` of the track currently focused
    cursor: usize,
}

impl ShuffleBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything and start over for a playlist of `len`
    pub fn reset(&mut self, len: usize) {
        self.len = len;
        self.remaining.clear();
        self.drawn.clear();
        self.round.clear();
        self.cursor = 0;
    }

    /// Draw the next position
    ///
    /// After [`ShuffleBag::prev`], walks forward through the history again
    /// before drawing anything new.
    pub fn next(&mut self, len: usize, current: Option<usize>) -> Option<usize> {
        self.ensure_len(len);
        if len == 0 {
            return None;
        }

        if self.drawn.is_empty() {
            if let Some(current) = current.filter(|&c| c < len) {
                self.remaining.retain(|&i| i != current);
                self.push_drawn(current);
            }
        }

        if self.cursor + 1 < self.drawn.len() {
            self.cursor += 1;
            return Some(self.drawn[self.cursor]);
        }

        if self.remaining.is_empty() {
            let avoid = self.drawn.last().copied();
            self.refill(avoid);
        }

        let index = self.remaining.pop()?;
        self.push_drawn(index);
        Some(index)
    }

    /// Step back through the drawn history
    ///
    /// Never un-draws from the bag. Returns `None` at the start of history.
    pub fn prev(&mut self, len: usize) -> Option<usize> {
        self.ensure_len(len);
        if self.cursor == 0 || self.drawn.is_empty() {
            return None;
        }
        self.cursor -= 1;
        Some(self.drawn[self.cursor])
    }

    /// Record a track the user jumped to directly
    ///
    /// Drops any forward history and takes the track out of the current round.
    pub fn note_played(&mut self, len: usize, index: usize) {
        self.ensure_len(len);
        if index >= len || self.drawn.get(self.cursor) == Some(&index) {
            return;
        }
        if !self.drawn.is_empty() {
            self.drawn.truncate(self.cursor + 1);
        }
        self.remaining.retain(|&i| i != index);
        self.push_drawn(index);
    }

    /// A track was appended at `index` (== old length)
    pub fn on_appended(&mut self, index: usize) {
        self.len = index + 1;
        if !self.remaining.is_empty() {
            let at = thread_rng().gen_range(0..=self.remaining.len());
            self.remaining.insert(at, index);
        }
    }

    /// The track at `index` was removed; shift everything after it
    pub fn on_removed(&mut self, index: usize) {
        self.len = self.len.saturating_sub(1);

        self.remaining.retain(|&i| i != index);
        for i in &mut self.remaining {
            if *i > index {
                *i -= 1;
            }
        }

        self.round = self
            .round
            .iter()
            .filter(|&&i| i != index)
            .map(|&i| if i > index { i - 1 } else { i })
            .collect();

        let mut kept_before_cursor: usize = 0;
        let mut drawn = Vec::with_capacity(self.drawn.len());
        for (pos, &i) in self.drawn.iter().enumerate() {
            if i == index {
                continue;
            }
            if pos <= self.cursor {
                kept_before_cursor += 1;
            }
            drawn.push(if i > index { i - 1 } else { i });
        }
        self.drawn = drawn;
        self.cursor = kept_before_cursor.saturating_sub(1);
    }

    /// Number of undrawn positions left in this round
    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }

    fn ensure_len(&mut self, len: usize) {
        if self.len != len {
            self.reset(len);
        }
    }

    /// Refill with the positions not yet played this round
    ///
    /// Once every position has played a new round starts, and `avoid` never
    /// lands first when there is a choice.
    fn refill(&mut self, avoid: Option<usize>) {
        let mut rng = thread_rng();
        self.remaining = (0..self.len).filter(|i| !self.round.contains(i)).collect();
        if self.remaining.is_empty() {
            self.round.clear();
            self.remaining = (0..self.len).collect();
        }
        self.remaining.shuffle(&mut rng);

        // Drawn from the back, so the last element comes out first
        if let (Some(avoid), true) = (avoid, self.remaining.len() > 1) {
            let last = self.remaining.len() - 1;
            if self.remaining[last] == avoid {
                let swap_with = rng.gen_range(0..last);
                self.remaining.swap(last, swap_with);
            }
        }
    }

    fn push_drawn(&mut self, index: usize) {
        self.round.insert(index);
        self.drawn.push(index);
        if self.drawn.len() > SHUFFLE_HISTORY_LIMIT {
            self.drawn.remove(0);
        }
        self.cursor = self.drawn.len() - 1;
    }
}

/// Next/previous selection for every play mode
///
/// Owns the shuffle bag, so it lives inside the engine next to the playlist.
#[derive(Debug, Clone, Default)]
pub struct PlayModeSelector {
    bag: ShuffleBag,
}

impl PlayModeSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select_next(
        &mut self,
        len: usize,
        current: Option<usize>,
        mode: PlayMode,
    ) -> Option<usize> {
        match mode {
            PlayMode::Shuffle => self.bag.next(len, current),
            _ => ordered_next(len, current, mode),
        }
    }

    pub fn select_prev(
        &mut self,
        len: usize,
        current: Option<usize>,
        mode: PlayMode,
    ) -> Option<usize> {
        match mode {
            PlayMode::Shuffle => self.bag.prev(len),
            _ => ordered_prev(len, current, mode),
        }
    }

    /// Playlist replaced, cleared, or mode switched
    pub fn reset(&mut self, len: usize) {
        self.bag.reset(len);
    }

    pub fn note_played(&mut self, len: usize, index: usize) {
        self.bag.note_played(len, index);
    }

    pub fn on_appended(&mut self, index: usize) {
        self.bag.on_appended(index);
    }

    pub fn on_removed(&mut self, index: usize) {
        self.bag.on_removed(index);
    }
}
