//! Playlist store
//!
//! Ordered, id-unique track sequence with a current-position pointer.
//!
//! ```text
//! tracks:  [ A ][ B ][ C ][ D ]
//!                 ^
//!               index  -> current track = B
//! ```
//!
//! The index is `Some` exactly when the playlist is non-empty, and always
//! points inside the sequence. Every mutation keeps the two in agreement.

use crate::error::{PlaybackError, Result};
use crate::types::Track;
use std::collections::HashSet;

/// Track removed from the playlist
#[derive(Debug, Clone, PartialEq)]
pub struct Removed {
    /// The removed track
    pub track: Track,

    /// Position it occupied before removal
    pub index: usize,

    /// Whether it was the current track
    pub was_current: bool,
}

/// Ordered track collection plus current position
#[derive(Debug, Clone, Default)]
pub struct PlaylistStore {
    tracks: Vec<Track>,
    index: Option<usize>,
}

impl PlaylistStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a track (or reuse the entry with the same id) and focus it
    ///
    /// Returns the focused position.
    pub fn add_and_focus(&mut self, track: Track) -> usize {
        let index = match self.position_of(&track.id) {
            Some(existing) => existing,
            None => {
                self.tracks.push(track);
                self.tracks.len() - 1
            }
        };
        self.index = Some(index);
        index
    }

    /// Replace the whole sequence and focus `track_to_play`
    ///
    /// Duplicate ids in `tracks` collapse to their first occurrence. If
    /// `track_to_play` is not part of `tracks` it is appended. An empty
    /// `tracks` is rejected and leaves the store untouched.
    pub fn replace_all(&mut self, tracks: Vec<Track>, track_to_play: Track) -> Result<usize> {
        if tracks.is_empty() {
            return Err(PlaybackError::InvalidArgument(
                "replace_all requires at least one track".to_string(),
            ));
        }

        let mut seen = HashSet::with_capacity(tracks.len());
        let mut deduped: Vec<Track> = tracks
            .into_iter()
            .filter(|t| seen.insert(t.id.clone()))
            .collect();

        let index = match deduped.iter().position(|t| t.id == track_to_play.id) {
            Some(i) => i,
            None => {
                deduped.push(track_to_play);
                deduped.len() - 1
            }
        };

        self.tracks = deduped;
        self.index = Some(index);
        Ok(index)
    }

    /// Remove a track by id
    ///
    /// Removing a track before the current one shifts the index so it keeps
    /// pointing at the same track. Removing the current track keeps the index
    /// at the same position (clamped), the engine refocuses right after.
    pub fn remove(&mut self, id: &str) -> Option<Removed> {
        let index = self.position_of(id)?;
        let was_current = self.index == Some(index);
        let track = self.tracks.remove(index);

        self.index = match self.index {
            _ if self.tracks.is_empty() => None,
            Some(current) if current > index => Some(current - 1),
            Some(current) => Some(current.min(self.tracks.len() - 1)),
            None => None,
        };

        Some(Removed {
            track,
            index,
            was_current,
        })
    }

    /// Focus the track at `index`
    pub fn focus(&mut self, index: usize) -> Result<()> {
        if index >= self.tracks.len() {
            return Err(PlaybackError::InvalidArgument(format!(
                "index {} out of range for playlist of {}",
                index,
                self.tracks.len()
            )));
        }
        self.index = Some(index);
        Ok(())
    }

    /// Remove every track and clear the current position
    pub fn clear(&mut self) {
        self.tracks.clear();
        self.index = None;
    }

    /// Current track, if any
    pub fn current(&self) -> Option<&Track> {
        self.index.and_then(|i| self.tracks.get(i))
    }

    /// Current position, if any
    pub fn current_index(&self) -> Option<usize> {
        self.index
    }

    /// Track at `index`
    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    /// Position of the track with `id`
    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.tracks.iter().position(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Owned copy of the sequence
    pub fn snapshot(&self) -> Vec<Track> {
        self.tracks.clone()
    }

    /// Borrowed view of the sequence
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MediaSource;
    use std::path::PathBuf;
    use std::time::Duration;

    fn create_test_track(id: &str) -> Track {
        Track {
            id: id.to_string(),
            title: format!("Track {}", id),
            artist: "Test Artist".to_string(),
            album: "Test Album".to_string(),
            source: MediaSource::Local(PathBuf::from(format!("/music/{}.mp3", id))),
            duration: Duration::from_secs(180),
            cover: None,
        }
    }

    fn ids(store: &PlaylistStore) -> Vec<&str> {
        store.tracks().iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn empty_store_has_no_current() {
        let store = PlaylistStore::new();
        assert!(store.is_empty());
        assert_eq!(store.current_index(), None);
        assert!(store.current().is_none());
    }

    #[test]
    fn add_and_focus_appends() {
        let mut store = PlaylistStore::new();
        assert_eq!(store.add_and_focus(create_test_track("1")), 0);
        assert_eq!(store.add_and_focus(create_test_track("2")), 1);

        assert_eq!(ids(&store), vec!["1", "2"]);
        assert_eq!(store.current().unwrap().id, "2");
    }

    #[test]
    fn add_and_focus_reuses_existing_id() {
        let mut store = PlaylistStore::new();
        store.add_and_focus(create_test_track("1"));
        store.add_and_focus(create_test_track("2"));

        assert_eq!(store.add_and_focus(create_test_track("1")), 0);
        assert_eq!(store.len(), 2);
        assert_eq!(store.current().unwrap().id, "1");
    }

    #[test]
    fn replace_all_rejects_empty() {
        let mut store = PlaylistStore::new();
        store.add_and_focus(create_test_track("1"));

        let result = store.replace_all(vec![], create_test_track("9"));
        assert!(matches!(result, Err(PlaybackError::InvalidArgument(_))));

        // Unchanged
        assert_eq!(ids(&store), vec!["1"]);
        assert_eq!(store.current_index(), Some(0));
    }

    #[test]
    fn replace_all_appends_missing_track() {
        let mut store = PlaylistStore::new();
        let index = store
            .replace_all(
                vec![create_test_track("1"), create_test_track("2")],
                create_test_track("3"),
            )
            .unwrap();

        assert_eq!(index, 2);
        assert_eq!(ids(&store), vec!["1", "2", "3"]);
        assert_eq!(store.current().unwrap().id, "3");
    }

    #[test]
    fn replace_all_focuses_present_track() {
        let mut store = PlaylistStore::new();
        let index = store
            .replace_all(
                vec![create_test_track("1"), create_test_track("2")],
                create_test_track("2"),
            )
            .unwrap();

        assert_eq!(index, 1);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn replace_all_collapses_duplicates() {
        let mut store = PlaylistStore::new();
        store
            .replace_all(
                vec![
                    create_test_track("1"),
                    create_test_track("2"),
                    create_test_track("1"),
                ],
                create_test_track("1"),
            )
            .unwrap();

        assert_eq!(ids(&store), vec!["1", "2"]);
        assert_eq!(store.current_index(), Some(0));
    }

    #[test]
    fn remove_before_current_shifts_index() {
        let mut store = PlaylistStore::new();
        for id in ["1", "2", "3"] {
            store.add_and_focus(create_test_track(id));
        }

        let removed = store.remove("1").unwrap();
        assert!(!removed.was_current);
        assert_eq!(removed.index, 0);
        assert_eq!(store.current().unwrap().id, "3");
        assert_eq!(store.current_index(), Some(1));
    }

    #[test]
    fn remove_after_current_keeps_index() {
        let mut store = PlaylistStore::new();
        for id in ["1", "2", "3"] {
            store.add_and_focus(create_test_track(id));
        }
        store.focus(0).unwrap();

        store.remove("3").unwrap();
        assert_eq!(store.current().unwrap().id, "1");
    }

    #[test]
    fn remove_current_last_entry_clamps() {
        let mut store = PlaylistStore::new();
        for id in ["1", "2", "3"] {
            store.add_and_focus(create_test_track(id));
        }

        let removed = store.remove("3").unwrap();
        assert!(removed.was_current);
        assert_eq!(store.current_index(), Some(1));
    }

    #[test]
    fn remove_only_track_clears_index() {
        let mut store = PlaylistStore::new();
        store.add_and_focus(create_test_track("1"));

        store.remove("1").unwrap();
        assert!(store.is_empty());
        assert_eq!(store.current_index(), None);
    }

    #[test]
    fn remove_unknown_id() {
        let mut store = PlaylistStore::new();
        store.add_and_focus(create_test_track("1"));
        assert!(store.remove("nope").is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn focus_out_of_range() {
        let mut store = PlaylistStore::new();
        store.add_and_focus(create_test_track("1"));
        assert!(store.focus(3).is_err());
        assert_eq!(store.current_index(), Some(0));
    }

    #[test]
    fn clear_store() {
        let mut store = PlaylistStore::new();
        store.add_and_focus(create_test_track("1"));
        store.clear();
        assert!(store.is_empty());
        assert!(store.current().is_none());
    }
}
