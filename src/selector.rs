use tracing::debug;

use crate::history::PresetHistory;
use crate::ratings::{RatingError, RatingStore, FAVORITE_RATING};

/// Read-only view of the playlist the selector picks from.
pub trait PlaylistView {
    fn size(&self) -> u32;
    /// Path-like identifier of the preset at `index`.
    fn item_at(&self, index: u32) -> Option<&str>;
}

impl<S: AsRef<str>> PlaylistView for Vec<S> {
    fn size(&self) -> u32 {
        u32::try_from(self.len()).unwrap_or(u32::MAX)
    }

    fn item_at(&self, index: u32) -> Option<&str> {
        self.get(index as usize).map(AsRef::<str>::as_ref)
    }
}

/// Navigation history, ratings and the weighted random picker.
pub struct PresetSelector {
    history: PresetHistory,
    ratings: RatingStore,
    rng: fastrand::Rng,
    favorites_only: bool,
}

impl PresetSelector {
    pub fn new(ratings: RatingStore, rng: fastrand::Rng) -> Self {
        Self {
            history: PresetHistory::new(),
            ratings,
            rng,
            favorites_only: false,
        }
    }

    pub fn record_visit(&mut self, index: u32) {
        self.history.record_visit(index);
    }

    pub fn go_back(&mut self) -> Option<u32> {
        self.history.go_back()
    }

    pub fn go_forward(&mut self) -> Option<u32> {
        self.history.go_forward()
    }

    /// 1-based cursor position and entry count, `(0, 0)` when empty.
    pub fn history_position(&self) -> (usize, usize) {
        let pos = self.history.cursor().map(|c| c + 1).unwrap_or(0);
        (pos, self.history.len())
    }

    pub fn history(&self) -> &PresetHistory {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn set_rating(&mut self, preset: &str, rating: u8) -> Result<(), RatingError> {
        self.ratings.set_rating(preset, rating)
    }

    pub fn rating(&self, preset: &str) -> u8 {
        self.ratings.rating(preset)
    }

    pub fn add_to_favorites(&mut self, preset: &str) -> Result<(), RatingError> {
        self.ratings.set_rating(preset, FAVORITE_RATING)
    }

    pub fn ratings(&self) -> &RatingStore {
        &self.ratings
    }

    pub fn favorites_only(&self) -> bool {
        self.favorites_only
    }

    pub fn set_favorites_only(&mut self, on: bool) {
        self.favorites_only = on;
    }

    pub fn toggle_favorites_only(&mut self) -> bool {
        self.favorites_only = !self.favorites_only;
        self.favorites_only
    }

    /// Weighted draw using the current favorites-only mode.
    pub fn pick_random(&mut self, playlist: &dyn PlaylistView) -> Option<u32> {
        self.select_weighted(playlist, self.favorites_only)
    }

    /// Draws an index with probability proportional to its rating. In
    /// favorites-only mode only rating-9 presets qualify, all with equal weight.
    pub fn select_weighted(
        &mut self,
        playlist: &dyn PlaylistView,
        favorites_only: bool,
    ) -> Option<u32> {
        let mut candidates: Vec<(u32, u64)> = Vec::new();
        let mut total_weight = 0u64;
        for index in 0..playlist.size() {
            let Some(item) = playlist.item_at(index) else {
                continue;
            };
            let rating = self.ratings.rating(item);
            let weight = if favorites_only {
                if rating != FAVORITE_RATING {
                    continue;
                }
                1
            } else {
                u64::from(rating)
            };
            total_weight += weight;
            candidates.push((index, weight));
        }

        if total_weight == 0 {
            debug!(favorites_only, "no weighted candidates");
            return None;
        }

        let draw = self.rng.u64(1..=total_weight);
        let mut cumulative = 0u64;
        for (index, weight) in candidates {
            cumulative += weight;
            if cumulative >= draw {
                return Some(index);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selector(seed: u64) -> PresetSelector {
        PresetSelector::new(RatingStore::in_memory(), fastrand::Rng::with_seed(seed))
    }

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("/presets/p{i:03}.milk")).collect()
    }

    #[test]
    fn empty_playlist_yields_none() {
        let mut sel = selector(1);
        let empty: Vec<String> = Vec::new();
        assert_eq!(sel.select_weighted(&empty, false), None);
        assert_eq!(sel.select_weighted(&empty, true), None);
    }

    #[test]
    fn favorites_only_without_favorites_yields_none() {
        let mut sel = selector(1);
        let list = names(10);
        sel.set_rating(&list[3], 8).expect("rate");
        assert_eq!(sel.select_weighted(&list, true), None);
    }

    #[test]
    fn favorites_only_picks_only_favorites() {
        let mut sel = selector(2);
        let list = names(20);
        sel.add_to_favorites(&list[4]).expect("fav");
        sel.add_to_favorites(&list[17]).expect("fav");
        for _ in 0..200 {
            let pick = sel.select_weighted(&list, true).expect("candidate");
            assert!(pick == 4 || pick == 17, "picked non-favorite {pick}");
        }
    }

    #[test]
    fn higher_rating_is_drawn_more_often() {
        let mut sel = selector(3);
        let list = names(2);
        sel.set_rating(&list[0], 1).expect("rate");
        sel.set_rating(&list[1], 9).expect("rate");
        let mut counts = [0u32; 2];
        for _ in 0..10_000 {
            counts[sel.select_weighted(&list, false).expect("candidate") as usize] += 1;
        }
        // Expected split is 1:9.
        assert!(counts[1] > counts[0] * 5, "counts {counts:?}");
    }

    #[test]
    fn history_position_is_one_based() {
        let mut sel = selector(4);
        assert_eq!(sel.history_position(), (0, 0));
        sel.record_visit(8);
        sel.record_visit(9);
        assert_eq!(sel.history_position(), (2, 2));
        assert_eq!(sel.go_back(), Some(8));
        assert_eq!(sel.history_position(), (1, 2));
    }

    #[test]
    fn toggling_favorites_only_changes_pick_random() {
        let mut sel = selector(5);
        let list = names(5);
        assert!(sel.pick_random(&list).is_some());
        assert!(sel.toggle_favorites_only());
        assert_eq!(sel.pick_random(&list), None);
    }
}
