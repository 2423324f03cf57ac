//! Integration tests for Serenade Core

mod common;

use common::{is_create, is_destroy, is_inject, Call, Harness, MOUNT};
use serenade_core::{
    resolve, BackgroundMusic, CanonicalId, ControllerOptions, Error, LoaderStatus, MountPoint,
    MusicConfig, PlaybackState, PlayerCommand, PlayerEvent, SessionOptions,
};
use std::rc::Rc;

const WATCH_URL: &str = "https://www.youtube.com/watch?v=abc12345678";

fn canonical(reference: &str) -> CanonicalId {
    resolve(reference).expect("reference resolves")
}

fn noop_sink() -> serenade_core::EventSink {
    Rc::new(|_| {})
}

fn looping(reference: &str) -> MusicConfig {
    MusicConfig::new(reference, true, true)
}

// =============================================================================
// Session Registry Tests
// =============================================================================

#[test]
fn test_create_before_ready_is_rejected() {
    let h = Harness::new();
    let registry = h.runtime.registry();

    let result = registry.create_session(
        &canonical(WATCH_URL),
        &h.mount_point(),
        &SessionOptions::default(),
        noop_sink(),
    );

    assert!(matches!(result, Err(Error::PlatformNotReady)));
    assert_eq!(h.count(is_create), 0);
    assert!(registry.live_handle().is_none());
}

#[test]
fn test_missing_mount_point_keeps_existing_session() {
    let h = Harness::new();
    h.runtime.loader().ensure_loaded(|| {});
    h.fire_ready();
    let registry = h.runtime.registry();

    let first = registry
        .create_session(&canonical(WATCH_URL), &h.mount_point(), &SessionOptions::default(), noop_sink())
        .unwrap();

    let result = registry.create_session(
        &canonical(WATCH_URL),
        &MountPoint::new("nowhere"),
        &SessionOptions::default(),
        noop_sink(),
    );

    assert!(matches!(result, Err(Error::MountPointMissing { .. })));
    assert_eq!(registry.live_handle(), Some(first));
    assert_eq!(h.count(is_destroy), 0);
}

#[test]
fn test_singleton_destroys_before_create() {
    let h = Harness::new();
    h.runtime.loader().ensure_loaded(|| {});
    h.fire_ready();
    h.add_mount("preview-music");
    let registry = h.runtime.registry();

    let first = registry
        .create_session(&canonical(WATCH_URL), &h.mount_point(), &SessionOptions::default(), noop_sink())
        .unwrap();
    let second = registry
        .create_session(
            &canonical("dQw4w9WgXcQ"),
            &MountPoint::new("preview-music"),
            &SessionOptions::default(),
            noop_sink(),
        )
        .unwrap();

    assert_ne!(first, second);
    assert_eq!(
        h.calls(),
        vec![
            Call::Inject,
            Call::Create { player: 0, id: "abc12345678".into(), mount: MOUNT.into() },
            Call::Destroy(0),
            Call::Create { player: 1, id: "dQw4w9WgXcQ".into(), mount: "preview-music".into() },
        ]
    );

    let stats = registry.stats();
    assert_eq!((stats.created, stats.destroyed, stats.live), (2, 1, 1));
    assert!(!registry.is_live(&first));
    assert!(registry.is_live(&second));
}

#[test]
fn test_destroy_is_idempotent() {
    let h = Harness::new();
    h.runtime.loader().ensure_loaded(|| {});
    h.fire_ready();
    let registry = h.runtime.registry();

    let handle = registry
        .create_session(&canonical(WATCH_URL), &h.mount_point(), &SessionOptions::default(), noop_sink())
        .unwrap();

    assert!(registry.destroy_session(&handle));
    let after_first = registry.stats();

    assert!(!registry.destroy_session(&handle));
    assert!(!registry.destroy_session(&serenade_core::SessionHandle::new()));
    let after_repeat = registry.stats();
    assert_eq!(
        (after_repeat.created, after_repeat.destroyed, after_repeat.live),
        (after_first.created, after_first.destroyed, after_first.live)
    );
    assert_eq!(after_repeat.releases, 3);
    assert_eq!(h.count(is_destroy), 1);
}

#[test]
fn test_commands_to_stale_handle_are_ignored() {
    let h = Harness::new();
    h.runtime.loader().ensure_loaded(|| {});
    h.fire_ready();
    let registry = h.runtime.registry();

    let handle = registry
        .create_session(&canonical(WATCH_URL), &h.mount_point(), &SessionOptions::default(), noop_sink())
        .unwrap();
    assert!(registry.command(&handle, PlayerCommand::Play));

    registry.destroy_session(&handle);
    assert!(!registry.command(&handle, PlayerCommand::Pause));
    assert_eq!(h.count(|c| matches!(c, Call::Pause(_))), 0);
}

#[test]
fn test_creation_failure_leaves_no_session() {
    let h = Harness::new();
    h.runtime.loader().ensure_loaded(|| {});
    h.fire_ready();
    h.fail_creation(true);
    let registry = h.runtime.registry();

    let result = registry.create_session(
        &canonical(WATCH_URL),
        &h.mount_point(),
        &SessionOptions::default(),
        noop_sink(),
    );

    assert!(matches!(result, Err(Error::PlayerCreation(_))));
    assert!(registry.live_session().is_none());
    assert_eq!(registry.stats().created, 0);
}

#[test]
fn test_destroy_hook_runs_on_replacement() {
    let h = Harness::new();
    h.runtime.loader().ensure_loaded(|| {});
    h.fire_ready();
    let registry = h.runtime.registry();

    let first = registry
        .create_session(&canonical(WATCH_URL), &h.mount_point(), &SessionOptions::default(), noop_sink())
        .unwrap();
    let fired = Rc::new(std::cell::Cell::new(0));
    let counter = Rc::clone(&fired);
    assert!(registry.on_destroyed(&first, move || counter.set(counter.get() + 1)));

    registry
        .create_session(&canonical(WATCH_URL), &h.mount_point(), &SessionOptions::default(), noop_sink())
        .unwrap();
    assert_eq!(fired.get(), 1);

    assert!(!registry.destroy_session(&first));
    assert!(!registry.on_destroyed(&first, || {}));
    assert_eq!(fired.get(), 1);
}

// =============================================================================
// Controller Lifecycle Tests
// =============================================================================

#[test]
fn test_looping_scenario() {
    let h = Harness::new();
    let music = BackgroundMusic::new(&h.runtime, h.mount_point());

    music.mount(looping(WATCH_URL));
    assert_eq!(music.canonical_id().unwrap(), "abc12345678");
    assert!(music.has_auto_started());
    assert_eq!(h.runtime.loader().status(), LoaderStatus::Loading);
    assert_eq!(music.state(), PlaybackState::Idle);

    h.fire_ready();
    assert_eq!(h.runtime.loader().status(), LoaderStatus::Loaded);
    let session = h.runtime.registry().live_session().unwrap();
    assert_eq!(session.canonical_id, "abc12345678");
    assert!(session.loop_playback);

    let player = h.player(0);
    player.emit(PlayerEvent::Ready);
    assert_eq!(music.state(), PlaybackState::Playing);

    for _ in 0..3 {
        player.emit(PlayerEvent::Ended);
        assert_eq!(music.state(), PlaybackState::Ended);
        player.emit(PlayerEvent::Playing);
        assert_eq!(music.state(), PlaybackState::Playing);
    }

    music.unmount();
    assert_eq!(music.state(), PlaybackState::Idle);

    assert_eq!(
        h.calls(),
        vec![
            Call::Inject,
            Call::Create { player: 0, id: "abc12345678".into(), mount: MOUNT.into() },
            Call::Play(0),
            Call::Seek(0, 0.0),
            Call::Play(0),
            Call::Seek(0, 0.0),
            Call::Play(0),
            Call::Seek(0, 0.0),
            Call::Play(0),
            Call::Destroy(0),
        ]
    );
}

#[test]
fn test_ended_without_loop_is_terminal() {
    let h = Harness::new();
    let music = BackgroundMusic::new(&h.runtime, h.mount_point());
    music.mount(MusicConfig::new(WATCH_URL, true, false));
    h.fire_ready();

    let player = h.player(0);
    player.emit(PlayerEvent::Ready);
    h.clear_calls();

    player.emit(PlayerEvent::Ended);
    assert_eq!(music.state(), PlaybackState::Ended);
    assert!(h.calls().is_empty());
}

#[test]
fn test_many_mounts_share_one_injection() {
    let h = Harness::new();
    h.add_mount("a");
    h.add_mount("b");
    let first = BackgroundMusic::new(&h.runtime, MountPoint::new("a"));
    let second = BackgroundMusic::new(&h.runtime, MountPoint::new("b"));

    first.mount(looping(WATCH_URL));
    second.mount(looping("https://youtu.be/dQw4w9WgXcQ"));
    assert_eq!(h.runtime.loader().pending(), 2);

    h.fire_ready();

    assert_eq!(h.count(is_inject), 1);
    assert_eq!(
        h.calls(),
        vec![
            Call::Inject,
            Call::Create { player: 0, id: "abc12345678".into(), mount: "a".into() },
            Call::Destroy(0),
            Call::Create { player: 1, id: "dQw4w9WgXcQ".into(), mount: "b".into() },
        ]
    );
    assert!(first.session_handle().is_none());
    assert!(second.session_handle().is_some());
}

#[test]
fn test_loaded_fast_path_on_remount() {
    let h = Harness::new();
    let music = BackgroundMusic::new(&h.runtime, h.mount_point());

    music.mount(looping(WATCH_URL));
    h.fire_ready();
    music.unmount();

    music.mount(looping(WATCH_URL));
    assert!(music.session_handle().is_some());
    assert_eq!(h.count(is_inject), 1);
    assert_eq!(h.count(is_create), 2);
    assert_eq!(h.count(is_destroy), 1);
}

#[test]
fn test_unmount_destroys_exactly_once() {
    let h = Harness::new();
    let music = BackgroundMusic::new(&h.runtime, h.mount_point());
    music.mount(looping(WATCH_URL));
    h.fire_ready();

    music.unmount();
    music.unmount();

    assert_eq!(h.count(is_destroy), 1);
    assert!(h.player(0).is_destroyed());
    let stats = h.runtime.registry().stats();
    assert_eq!((stats.releases, stats.live), (1, 0));
}

#[test]
fn test_unmount_after_failed_creation_releases_once() {
    let h = Harness::new();
    h.fail_creation(true);
    let music = BackgroundMusic::new(&h.runtime, h.mount_point());
    music.mount(looping(WATCH_URL));
    h.fire_ready();
    assert_eq!(h.runtime.registry().stats().created, 0);
    assert_eq!(music.state(), PlaybackState::Idle);

    let before = h.runtime.registry().stats().releases;
    music.unmount();
    music.unmount();

    assert_eq!(h.runtime.registry().stats().releases - before, 1);
    assert_eq!(h.count(is_destroy), 0);
}

#[test]
fn test_unmount_with_missing_mount_point_releases_once() {
    let h = Harness::new();
    h.remove_mount(MOUNT);
    let music = BackgroundMusic::new(&h.runtime, h.mount_point());
    music.mount(looping(WATCH_URL));
    h.fire_ready();
    assert_eq!(h.count(is_create), 0);

    let before = h.runtime.registry().stats().releases;
    music.unmount();

    assert_eq!(h.runtime.registry().stats().releases - before, 1);
    assert_eq!(h.runtime.registry().stats().live, 0);
}

#[test]
fn test_unmount_after_eviction_releases_once() {
    let h = Harness::new();
    h.add_mount("preview");
    let editor = BackgroundMusic::new(&h.runtime, h.mount_point());
    let preview = BackgroundMusic::new(&h.runtime, MountPoint::new("preview"));
    editor.mount(looping(WATCH_URL));
    h.fire_ready();
    preview.mount(looping(WATCH_URL));

    let before = h.runtime.registry().stats().releases;
    editor.unmount();

    assert_eq!(h.runtime.registry().stats().releases - before, 1);
    assert_eq!(h.count(is_destroy), 1);
    assert!(!h.player(1).is_destroyed());
    assert!(preview.session_handle().is_some());
}

#[test]
fn test_unmount_while_loading_never_creates() {
    let h = Harness::new();
    let music = BackgroundMusic::new(&h.runtime, h.mount_point());
    music.mount(looping(WATCH_URL));

    music.unmount();
    h.fire_ready();

    assert_eq!(h.count(is_create), 0);
    assert_eq!(h.count(is_destroy), 0);
    let stats = h.runtime.registry().stats();
    assert_eq!((stats.releases, stats.live), (1, 0));
    assert_eq!(music.state(), PlaybackState::Idle);
}

#[test]
fn test_stale_readiness_after_remount_creates_once() {
    let h = Harness::new();
    let music = BackgroundMusic::new(&h.runtime, h.mount_point());

    music.mount(looping(WATCH_URL));
    music.unmount();
    music.mount(looping(WATCH_URL));
    h.fire_ready();

    assert_eq!(h.count(is_inject), 1);
    assert_eq!(h.count(is_create), 1);
    assert!(music.session_handle().is_some());
}

#[test]
fn test_drop_tears_down() {
    let h = Harness::new();
    {
        let music = BackgroundMusic::new(&h.runtime, h.mount_point());
        music.mount(looping(WATCH_URL));
        h.fire_ready();
    }

    assert_eq!(h.count(is_destroy), 1);
    assert!(h.runtime.registry().live_handle().is_none());
}

#[test]
fn test_events_after_unmount_are_ignored() {
    let h = Harness::new();
    let music = BackgroundMusic::new(&h.runtime, h.mount_point());
    music.mount(looping(WATCH_URL));
    h.fire_ready();
    let player = h.player(0);
    player.emit(PlayerEvent::Ready);

    music.unmount();
    h.clear_calls();
    player.emit(PlayerEvent::Ended);

    assert!(h.calls().is_empty());
    assert_eq!(music.state(), PlaybackState::Idle);
}

#[test]
fn test_unresolvable_reference_stays_idle() {
    let h = Harness::new();
    let music = BackgroundMusic::new(&h.runtime, h.mount_point());

    music.mount(looping("https://vimeo.com/123456"));
    music.toggle_playback();

    assert!(music.canonical_id().is_none());
    assert!(!music.has_auto_started());
    assert_eq!(music.state(), PlaybackState::Idle);
    assert_eq!(h.runtime.loader().status(), LoaderStatus::Unloaded);
    assert!(h.calls().is_empty());
}

#[test]
fn test_disabled_music_makes_no_platform_calls() {
    let h = Harness::new();
    let music = BackgroundMusic::new(&h.runtime, h.mount_point());

    music.mount(MusicConfig::new(WATCH_URL, false, true));
    music.toggle_playback();

    assert_eq!(h.runtime.loader().status(), LoaderStatus::Unloaded);
    assert!(h.calls().is_empty());
}

#[test]
fn test_missing_mount_point_then_toggle_retries() {
    let h = Harness::new();
    h.remove_mount(MOUNT);
    let music = BackgroundMusic::new(&h.runtime, h.mount_point());

    music.mount(looping(WATCH_URL));
    h.fire_ready();
    assert_eq!(h.count(is_create), 0);
    assert_eq!(music.state(), PlaybackState::Idle);

    h.add_mount(MOUNT);
    music.toggle_playback();
    assert_eq!(h.count(is_create), 1);
    assert!(music.session_handle().is_some());
}

#[test]
fn test_auto_start_once_per_mount() {
    let h = Harness::new();
    let music = BackgroundMusic::new(&h.runtime, h.mount_point());

    music.mount(looping(WATCH_URL));
    music.update(looping(WATCH_URL));
    music.update(looping(WATCH_URL));
    assert_eq!(h.runtime.loader().pending(), 1);

    h.fire_ready();
    assert_eq!(h.count(is_create), 1);

    music.unmount();
    assert!(!music.has_auto_started());
    music.mount(looping(WATCH_URL));
    assert!(music.has_auto_started());
    assert_eq!(h.count(is_create), 2);
}

// =============================================================================
// Toggle Tests
// =============================================================================

#[test]
fn test_toggle_pauses_and_resumes() {
    let h = Harness::new();
    let music = BackgroundMusic::new(&h.runtime, h.mount_point());
    music.mount(looping(WATCH_URL));
    h.fire_ready();
    let player = h.player(0);
    player.emit(PlayerEvent::Ready);
    h.clear_calls();

    music.toggle_playback();
    assert_eq!(h.calls(), vec![Call::Pause(0)]);
    // No optimistic change; the platform confirms.
    assert_eq!(music.state(), PlaybackState::Playing);

    player.emit(PlayerEvent::Paused);
    assert_eq!(music.state(), PlaybackState::Paused);

    music.toggle_playback();
    assert_eq!(h.calls(), vec![Call::Pause(0), Call::Play(0)]);
}

#[test]
fn test_toggle_while_loading_does_not_queue_twice() {
    let h = Harness::new();
    let music = BackgroundMusic::new(&h.runtime, h.mount_point());
    music.mount(looping(WATCH_URL));

    music.toggle_playback();
    music.toggle_playback();
    assert_eq!(h.runtime.loader().pending(), 1);

    h.fire_ready();
    assert_eq!(h.count(is_create), 1);
}

#[test]
fn test_toggle_reclaims_session_taken_by_another_mount() {
    let h = Harness::new();
    h.add_mount("preview");
    let editor = BackgroundMusic::new(&h.runtime, h.mount_point());
    let preview = BackgroundMusic::new(&h.runtime, MountPoint::new("preview"));

    editor.mount(looping(WATCH_URL));
    h.fire_ready();
    preview.mount(looping(WATCH_URL));
    assert!(editor.session_handle().is_none());

    editor.toggle_playback();
    assert!(editor.session_handle().is_some());
    assert!(preview.session_handle().is_none());
    assert_eq!(h.runtime.registry().stats().live, 1);
}

#[test]
fn test_evicted_mount_drops_to_idle() {
    let h = Harness::new();
    h.add_mount("preview");
    let editor = BackgroundMusic::new(&h.runtime, h.mount_point());
    let preview = BackgroundMusic::new(&h.runtime, MountPoint::new("preview"));
    let mut editor_rx = editor.subscribe();

    editor.mount(looping(WATCH_URL));
    h.fire_ready();
    h.player(0).emit(PlayerEvent::Ready);
    assert_eq!(editor.state(), PlaybackState::Playing);
    let _ = editor_rx.borrow_and_update();

    preview.mount(looping(WATCH_URL));

    assert!(h.player(0).is_destroyed());
    assert_eq!(editor.state(), PlaybackState::Idle);
    assert!(editor_rx.has_changed().unwrap());

    h.player(1).emit(PlayerEvent::Ready);
    assert_eq!(preview.state(), PlaybackState::Playing);
    assert_eq!(editor.state(), PlaybackState::Idle);
}

// =============================================================================
// Update Tests
// =============================================================================

#[test]
fn test_update_new_track_replaces_session() {
    let h = Harness::new();
    let music = BackgroundMusic::new(&h.runtime, h.mount_point());
    music.mount(looping(WATCH_URL));
    h.fire_ready();

    music.update(looping("https://www.youtube.com/shorts/dQw4w9WgXcQ"));

    assert_eq!(
        h.calls()[1..],
        [
            Call::Create { player: 0, id: "abc12345678".into(), mount: MOUNT.into() },
            Call::Destroy(0),
            Call::Create { player: 1, id: "dQw4w9WgXcQ".into(), mount: MOUNT.into() },
        ]
    );
    assert_eq!(music.canonical_id().unwrap(), "dQw4w9WgXcQ");
}

#[test]
fn test_update_disable_then_enable() {
    let h = Harness::new();
    let music = BackgroundMusic::new(&h.runtime, h.mount_point());
    music.mount(looping(WATCH_URL));
    h.fire_ready();
    h.player(0).emit(PlayerEvent::Ready);

    music.update(MusicConfig::new(WATCH_URL, false, true));
    assert_eq!(music.state(), PlaybackState::Idle);
    assert_eq!(h.count(is_destroy), 1);
    assert!(music.session_handle().is_none());

    music.update(looping(WATCH_URL));
    assert_eq!(h.count(is_create), 2);
    assert!(music.session_handle().is_some());
}

// =============================================================================
// Options Tests
// =============================================================================

#[test]
fn test_strict_ready_waits_for_playing_event() {
    let h = Harness::with_options(ControllerOptions {
        optimistic_play: false,
        ..Default::default()
    });
    let music = BackgroundMusic::new(&h.runtime, h.mount_point());
    music.mount(looping(WATCH_URL));
    h.fire_ready();

    let player = h.player(0);
    player.emit(PlayerEvent::Ready);
    assert_eq!(music.state(), PlaybackState::Ready);

    player.emit(PlayerEvent::Playing);
    assert_eq!(music.state(), PlaybackState::Playing);
}

#[test]
fn test_volume_applied_on_ready() {
    let h = Harness::with_options(ControllerOptions {
        volume: Some(35),
        ..Default::default()
    });
    let music = BackgroundMusic::new(&h.runtime, h.mount_point());
    music.mount(looping(WATCH_URL));
    h.fire_ready();
    h.clear_calls();

    h.player(0).emit(PlayerEvent::Ready);
    assert_eq!(h.calls(), vec![Call::Volume(0, 35), Call::Play(0)]);
}

#[test]
fn test_state_subscription() {
    let h = Harness::new();
    let music = BackgroundMusic::new(&h.runtime, h.mount_point());
    let mut rx = music.subscribe();

    music.mount(looping(WATCH_URL));
    h.fire_ready();
    assert!(!rx.has_changed().unwrap());

    h.player(0).emit(PlayerEvent::Ready);
    assert!(rx.has_changed().unwrap());
    assert_eq!(*rx.borrow_and_update(), PlaybackState::Playing);

    music.unmount();
    assert_eq!(*rx.borrow_and_update(), PlaybackState::Idle);
}

#[test]
fn test_runtime_reset() {
    let h = Harness::new();
    let music = BackgroundMusic::new(&h.runtime, h.mount_point());
    music.mount(looping(WATCH_URL));
    h.fire_ready();

    h.runtime.reset();

    assert_eq!(music.state(), PlaybackState::Idle);
    assert_eq!(h.runtime.loader().status(), LoaderStatus::Unloaded);
    assert!(h.runtime.registry().live_handle().is_none());
    assert_eq!(h.count(is_destroy), 1);

    // The controller's own teardown is now a no-op against the registry.
    music.unmount();
    assert_eq!(h.count(is_destroy), 1);
}
