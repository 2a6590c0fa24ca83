//! The derived play-history projection.

mod support;

use core_library::models::PodcastId;
use core_playback::history::HistoryView;
use support::*;

#[tokio::test]
async fn entries_filter_untouched_and_sort_by_recency() {
    let pod_a = PodcastId::new();
    let pod_b = PodcastId::new();

    let untouched = episode(pod_a, Some(300.0), 0.0, false, None);
    let oldest = episode(pod_a, Some(300.0), 0.2, true, Some(100));
    let newest = episode(pod_a, Some(300.0), 0.9, true, Some(300));
    let middle = episode(pod_b, Some(600.0), 0.5, true, Some(200));
    // Played long ago without a recorded stamp: belongs at the end.
    let unstamped = episode(pod_b, Some(600.0), 0.0, true, None);

    let (oldest_id, newest_id, middle_id, unstamped_id) =
        (oldest.id, newest.id, middle.id, unstamped.id);

    let h = Harness::with_podcasts(vec![
        podcast_with(vec![untouched, oldest, newest]),
        podcast_with(vec![middle, unstamped]),
    ])
    .await;
    let history = HistoryView::new(h.library.clone());

    let entries = history.entries().await;
    let ids: Vec<_> = entries.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![newest_id, middle_id, oldest_id, unstamped_id]);
}

#[tokio::test]
async fn one_entry_per_episode_as_progress_moves() {
    let pod = PodcastId::new();
    let ep = episode(pod, Some(300.0), 0.1, true, Some(100));
    let episode_id = ep.id;

    let h = Harness::with_podcasts(vec![podcast_with(vec![ep])]).await;
    let history = HistoryView::new(h.library.clone());

    h.library
        .touch_episode_progress(episode_id, 0.4, 200)
        .await;
    h.library
        .touch_episode_progress(episode_id, 0.6, 300)
        .await;

    let entries = history.entries().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].progress, 0.6);
    assert_eq!(entries[0].last_played, Some(300));
}

#[tokio::test]
async fn removing_a_podcast_removes_its_history_entries() {
    let pod_a = PodcastId::new();
    let pod_b = PodcastId::new();
    let kept = episode(pod_a, Some(300.0), 0.3, true, Some(100));
    let dropped = episode(pod_b, Some(300.0), 0.7, true, Some(200));
    let kept_id = kept.id;

    let h = Harness::with_podcasts(vec![
        podcast_with(vec![kept]),
        podcast_with(vec![dropped]),
    ])
    .await;
    let history = HistoryView::new(h.library.clone());
    assert_eq!(history.entries().await.len(), 2);

    h.library.remove_podcast(pod_b).await.unwrap();

    let entries = history.entries().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].id, kept_id);
}
