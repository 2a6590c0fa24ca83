//! Debounce behavior of the checkpoint writer under a paused runtime clock.

mod support;

use bridge_traits::time::ManualClock;
use core_library::models::{PodcastId, UserId};
use core_library::service::LibraryService;
use core_playback::checkpoint::CheckpointWriter;
use core_runtime::events::EventBus;
use std::sync::Arc;
use std::time::Duration;
use support::*;
use tokio::time::{advance, Instant};

const INTERVAL: Duration = Duration::from_millis(2000);

struct Fixture {
    writer: CheckpointWriter,
    repo: Arc<RecordingEpisodeRepo>,
    library: LibraryService,
    episode_id: core_library::models::EpisodeId,
}

async fn fixture() -> Fixture {
    let podcast_id = PodcastId::new();
    let ep = episode(podcast_id, Some(300.0), 0.0, false, None);
    let episode_id = ep.id;

    let repo = RecordingEpisodeRepo::new();
    let clock = Arc::new(ManualClock::at(T0_MILLIS));
    let library = LibraryService::new(
        StaticPodcastRepo::seeded(vec![podcast_with(vec![ep])]),
        repo.clone(),
        Arc::new(NullFeed),
        clock.clone(),
        EventBus::default(),
        UserId::new("user-1"),
    );
    library.load().await.unwrap();

    let writer = CheckpointWriter::new(library.clone(), clock, INTERVAL);
    Fixture {
        writer,
        repo,
        library,
        episode_id,
    }
}

#[tokio::test(start_paused = true)]
async fn ticks_coalesce_into_spaced_writes() {
    let f = fixture().await;

    // First tick of a fresh writer goes durable immediately.
    f.writer.record_tick(f.episode_id, 0.1).await;
    settle().await;
    assert_eq!(f.repo.save_count(), 1);
    let first_write = Instant::now();

    // A burst of ticks inside the window produces exactly one more write,
    // carrying the latest value, no sooner than interval after the first.
    f.writer.record_tick(f.episode_id, 0.15).await;
    advance(Duration::from_millis(300)).await;
    f.writer.record_tick(f.episode_id, 0.2).await;
    advance(Duration::from_millis(300)).await;
    f.writer.record_tick(f.episode_id, 0.25).await;

    assert_eq!(f.repo.save_count(), 1);

    advance(Duration::from_millis(2000)).await;
    settle().await;

    let saves = f.repo.saves();
    assert_eq!(saves.len(), 2);
    assert_eq!(saves[1].1.progress, 0.25);
    assert!(Instant::now() - first_write >= INTERVAL);
}

#[tokio::test(start_paused = true)]
async fn every_write_sets_played_and_last_played() {
    let f = fixture().await;

    f.writer.record_tick(f.episode_id, 0.3).await;
    settle().await;

    let saves = f.repo.saves();
    assert!(saves[0].1.played);
    assert!(saves[0].1.last_played >= T0_MILLIS);
}

#[tokio::test(start_paused = true)]
async fn snapshot_updates_on_every_tick_before_the_durable_write() {
    let f = fixture().await;

    f.writer.record_tick(f.episode_id, 0.1).await;
    settle().await;
    assert_eq!(f.repo.save_count(), 1);

    // New tick inside the window: snapshot moves, the database doesn't.
    f.writer.record_tick(f.episode_id, 0.37).await;
    let episode = f.library.find_episode(f.episode_id).await.unwrap();
    assert_eq!(episode.progress, 0.37);
    assert!(episode.played);
    assert_eq!(f.repo.save_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn flush_bypasses_the_window_and_cancels_the_timer() {
    let f = fixture().await;

    f.writer.record_tick(f.episode_id, 0.1).await;
    settle().await;
    f.writer.record_tick(f.episode_id, 0.2).await;

    f.writer.flush().await;
    let saves = f.repo.saves();
    assert_eq!(saves.len(), 2);
    assert_eq!(saves[1].1.progress, 0.2);

    // The armed timer was cancelled; nothing fires later.
    advance(Duration::from_millis(5000)).await;
    settle().await;
    assert_eq!(f.repo.save_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn flush_with_overrides_whatever_is_pending() {
    let f = fixture().await;

    f.writer.record_tick(f.episode_id, 0.1).await;
    settle().await;
    f.writer.record_tick(f.episode_id, 0.2).await;

    f.writer.flush_with(f.episode_id, 0.55).await;
    let saves = f.repo.saves();
    assert_eq!(saves.len(), 2);
    assert_eq!(saves[1].1.progress, 0.55);

    advance(Duration::from_millis(5000)).await;
    settle().await;
    assert_eq!(f.repo.save_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn flush_with_nothing_pending_writes_nothing() {
    let f = fixture().await;
    f.writer.flush().await;
    assert_eq!(f.repo.save_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn clear_drops_the_pending_value() {
    let f = fixture().await;

    f.writer.record_tick(f.episode_id, 0.1).await;
    settle().await;
    f.writer.record_tick(f.episode_id, 0.4).await;

    f.writer.clear().await;
    advance(Duration::from_millis(5000)).await;
    settle().await;
    assert_eq!(f.repo.save_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn stored_progress_is_rounded_to_two_decimals() {
    let f = fixture().await;

    f.writer.record_tick(f.episode_id, 0.39999).await;
    settle().await;

    let saves = f.repo.saves();
    assert_eq!(saves[0].1.progress, 0.4);

    // The snapshot keeps the raw fraction.
    let episode = f.library.find_episode(f.episode_id).await.unwrap();
    assert_eq!(episode.progress, 0.39999);
}

#[tokio::test(start_paused = true)]
async fn write_failures_are_swallowed_and_not_retried() {
    let f = fixture().await;
    f.repo.fail_saves(true);

    f.writer.record_tick(f.episode_id, 0.5).await;
    settle().await;
    f.writer.flush_with(f.episode_id, 0.6).await;
    assert_eq!(f.repo.save_count(), 0);

    // Later writes succeed again; no backlog replays.
    f.repo.fail_saves(false);
    advance(Duration::from_millis(5000)).await;
    settle().await;
    assert_eq!(f.repo.save_count(), 0);

    f.writer.record_tick(f.episode_id, 0.7).await;
    settle().await;
    let saves = f.repo.saves();
    assert_eq!(saves.len(), 1);
    assert_eq!(saves[0].1.progress, 0.7);
}

#[tokio::test(start_paused = true)]
async fn snapshot_is_authoritative_when_writes_fail() {
    let f = fixture().await;
    f.repo.fail_saves(true);

    f.writer.record_tick(f.episode_id, 0.45).await;
    settle().await;

    let episode = f.library.find_episode(f.episode_id).await.unwrap();
    assert_eq!(episode.progress, 0.45);
    assert_eq!(f.repo.save_count(), 0);
}
