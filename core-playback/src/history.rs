//! # History View
//!
//! Derived projection over the library snapshot: episodes the user has
//! actually listened to, most recent first. Never stored; recomputed on
//! demand, so removing a podcast removes its episodes from history for free.

use core_library::models::Episode;
use core_library::service::LibraryService;

/// Read-only play-history projection.
#[derive(Clone)]
pub struct HistoryView {
    library: LibraryService,
}

impl HistoryView {
    pub fn new(library: LibraryService) -> Self {
        Self { library }
    }

    /// Episodes with any playback progress or a completion flag, one entry
    /// per episode, ordered by `last_played` descending. Episodes without a
    /// `last_played` stamp sort last, in snapshot order (the sort is stable).
    pub async fn entries(&self) -> Vec<Episode> {
        let mut episodes: Vec<Episode> = self
            .library
            .episodes_snapshot()
            .await
            .into_iter()
            .filter(Episode::qualifies_for_history)
            .collect();

        episodes.sort_by(|a, b| match (b.last_played, a.last_played) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Greater,
            (None, Some(_)) => std::cmp::Ordering::Less,
            (None, None) => std::cmp::Ordering::Equal,
        });

        episodes
    }
}
