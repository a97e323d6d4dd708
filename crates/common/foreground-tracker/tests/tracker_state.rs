//! Foreground resolution, caching and termination against a fake desktop.

mod util;

use foreground_tracker::{ProcessInfo, TrackerConfig};
use util::*;

const EDITOR: u32 = 812;
const BROWSER: u32 = 1337;

#[tokio::test]
async fn lookup_of_pid_zero_is_empty_without_os_calls() {
    let desktop = FakeDesktop::new();
    let (mut tracker, _source) = tracker(&desktop, quiet_config());
    let handle = tracker.start().unwrap();
    settle(&handle).await;

    let before = desktop.os_calls();
    for _ in 0..3 {
        let info = handle.lookup(0);
        assert!(info.is_empty());
        assert_eq!(info.pid(), 0);
        assert!(info.title().is_empty());
        assert!(!info.is_live());
    }
    assert_eq!(desktop.os_calls(), before);
}

#[tokio::test]
async fn lookup_of_unknown_pid_is_empty() {
    let desktop = FakeDesktop::new();
    let (mut tracker, _source) = tracker(&desktop, quiet_config());
    let handle = tracker.start().unwrap();

    let info = handle.lookup(999);

    assert!(info.is_empty());
    assert_eq!(info.snapshot(), foreground_tracker::ProcessSnapshot::empty());
}

#[tokio::test]
async fn lookup_captures_process_identity() {
    let desktop = FakeDesktop::new();
    desktop.spawn(EDITOR, "editor", "notes.txt - Editor");
    let (mut tracker, _source) = tracker(&desktop, quiet_config());
    let handle = tracker.start().unwrap();

    let info = handle.lookup(EDITOR);

    assert_eq!(info.pid(), EDITOR);
    assert_eq!(info.name(), "editor");
    assert_eq!(info.version(), "1.0.0.0");
    assert_eq!(info.title(), "notes.txt - Editor");
    assert!(!info.start_time().is_empty());
    assert!(info.command_line().is_empty());
    assert!(info.is_live());
}

#[tokio::test]
async fn bootstrap_may_observe_own_window() {
    let desktop = FakeDesktop::new();
    desktop.spawn(SELF_PID, "tracker", "Foreground tracker");
    desktop.focus(SELF_PID);
    let (mut tracker, _source) = tracker(&desktop, quiet_config());
    let handle = tracker.start().unwrap();
    settle(&handle).await;

    assert_eq!(handle.current_foreground().pid(), SELF_PID);
}

#[tokio::test]
async fn bootstrap_ignores_own_window_when_configured() {
    let desktop = FakeDesktop::new();
    desktop.spawn(SELF_PID, "tracker", "Foreground tracker");
    desktop.focus(SELF_PID);
    let config = TrackerConfig::builder()
        .enrich_command_line(false)
        .observe_self_on_start(false)
        .build();
    let (mut tracker, _source) = tracker(&desktop, config);
    let handle = tracker.start().unwrap();
    settle(&handle).await;

    assert!(handle.current_foreground().is_empty());
}

#[tokio::test]
async fn refresh_publishes_new_foreground_process() {
    let desktop = FakeDesktop::new();
    desktop.spawn(EDITOR, "editor", "notes.txt - Editor");
    let (mut tracker, _source) = tracker(&desktop, quiet_config());
    let handle = tracker.start().unwrap();
    let mut published = settle(&handle).await;
    assert!(handle.current_foreground().is_empty());

    desktop.focus(EDITOR);
    assert!(handle.refresh().await.unwrap());

    let current = handle.current_foreground();
    assert_eq!(current.pid(), EDITOR);
    let events = drain(&mut published);
    assert_eq!(events.len(), 1);
    assert!(ProcessInfo::same(&events[0], &current));
}

#[tokio::test]
async fn refresh_is_idempotent() {
    let desktop = FakeDesktop::new();
    desktop.spawn(EDITOR, "editor", "notes.txt - Editor");
    desktop.focus(EDITOR);
    let (mut tracker, _source) = tracker(&desktop, quiet_config());
    let handle = tracker.start().unwrap();
    let mut published = settle(&handle).await;
    let first = handle.current_foreground();
    let opens = desktop.opens();

    assert!(!handle.refresh().await.unwrap());
    assert!(!handle.refresh().await.unwrap());

    assert!(ProcessInfo::same(&first, &handle.current_foreground()));
    assert_eq!(desktop.opens(), opens);
    assert!(drain(&mut published).is_empty());
}

#[tokio::test]
async fn refresh_suppresses_own_window() {
    let desktop = FakeDesktop::new();
    desktop.spawn(EDITOR, "editor", "notes.txt - Editor");
    desktop.spawn(SELF_PID, "tracker", "Foreground tracker");
    desktop.focus(EDITOR);
    let (mut tracker, _source) = tracker(&desktop, quiet_config());
    let handle = tracker.start().unwrap();
    let mut published = settle(&handle).await;
    let before = handle.current_foreground();

    desktop.focus(SELF_PID);
    assert!(!handle.refresh().await.unwrap());

    assert!(ProcessInfo::same(&before, &handle.current_foreground()));
    assert!(drain(&mut published).is_empty());
}

#[tokio::test]
async fn failed_resolution_keeps_cached_snapshot() {
    let desktop = FakeDesktop::new();
    desktop.spawn(EDITOR, "editor", "notes.txt - Editor");
    desktop.focus(EDITOR);
    let (mut tracker, _source) = tracker(&desktop, quiet_config());
    let handle = tracker.start().unwrap();
    let mut published = settle(&handle).await;
    let before = handle.current_foreground();

    desktop.fail_owner_lookup(true);
    assert!(!handle.refresh().await.unwrap());
    desktop.fail_owner_lookup(false);

    desktop.clear_focus();
    assert!(!handle.refresh().await.unwrap());

    // Window whose owner resolves to the "no process" pid.
    desktop.focus(0);
    assert!(!handle.refresh().await.unwrap());

    // Foreground process that vanished before it could be opened.
    desktop.spawn(BROWSER, "browser", "Start page");
    desktop.exit(BROWSER);
    desktop.focus(BROWSER);
    assert!(!handle.refresh().await.unwrap());

    desktop.focus(EDITOR);
    assert!(!handle.refresh().await.unwrap());

    assert!(ProcessInfo::same(&before, &handle.current_foreground()));
    assert!(drain(&mut published).is_empty());
}

#[tokio::test]
async fn title_refresh_with_empty_current_is_noop() {
    let desktop = FakeDesktop::new();
    let (mut tracker, _source) = tracker(&desktop, quiet_config());
    let handle = tracker.start().unwrap();
    let mut published = settle(&handle).await;
    let window_queries = desktop.window_queries();

    assert!(!handle.refresh_title_only().await.unwrap());

    assert!(handle.current_foreground().is_empty());
    assert_eq!(desktop.window_queries(), window_queries);
    assert!(drain(&mut published).is_empty());
}

#[tokio::test]
async fn title_refresh_republishes_same_snapshot() {
    let desktop = FakeDesktop::new();
    desktop.spawn(EDITOR, "editor", "notes.txt - Editor");
    desktop.focus(EDITOR);
    let (mut tracker, _source) = tracker(&desktop, quiet_config());
    let handle = tracker.start().unwrap();
    let mut published = settle(&handle).await;
    let before = handle.current_foreground();

    assert!(!handle.refresh_title_only().await.unwrap());

    desktop.set_title(EDITOR, "todo.txt - Editor");
    assert!(handle.refresh_title_only().await.unwrap());

    let events = drain(&mut published);
    assert_eq!(events.len(), 1);
    assert!(ProcessInfo::same(&events[0], &before));
    assert_eq!(before.title(), "todo.txt - Editor");
}

#[tokio::test]
async fn terminate_success_refreshes_to_next_foreground() {
    let desktop = FakeDesktop::new();
    desktop.spawn(EDITOR, "editor", "notes.txt - Editor");
    desktop.spawn(BROWSER, "browser", "Start page");
    desktop.focus(EDITOR);
    let (mut tracker, _source) = tracker(&desktop, quiet_config());
    let handle = tracker.start().unwrap();
    let mut published = settle(&handle).await;

    // The window manager hands focus to the browser once the editor is gone.
    desktop.focus(BROWSER);
    assert!(handle.terminate_foreground().await.unwrap());

    assert!(!desktop.is_alive(EDITOR));
    assert_eq!(handle.current_foreground().pid(), BROWSER);
    let events = drain(&mut published);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].pid(), BROWSER);
}

#[tokio::test]
async fn terminate_without_handle_publishes_empty_snapshot() {
    let desktop = FakeDesktop::new();
    desktop.spawn(EDITOR, "editor", "notes.txt - Editor");
    desktop.focus(EDITOR);
    let (mut tracker, _source) = tracker(&desktop, quiet_config());
    let handle = tracker.start().unwrap();
    let mut published = settle(&handle).await;

    // First kill goes through; the killed window is still reported as the
    // foreground, so the cached snapshot stays but has lost its handle.
    assert!(handle.terminate_foreground().await.unwrap());
    assert!(!handle.current_foreground().is_live());
    assert!(drain(&mut published).is_empty());

    assert!(!handle.terminate_foreground().await.unwrap());

    let events = drain(&mut published);
    assert_eq!(events.len(), 1);
    let reset = &events[0];
    assert_eq!(reset.pid(), 0);
    assert_eq!(reset.snapshot(), foreground_tracker::ProcessSnapshot::empty());
    assert!(ProcessInfo::same(reset, &handle.current_foreground()));
}

#[tokio::test]
async fn failed_kill_resets_and_publishes() {
    let desktop = FakeDesktop::new();
    desktop.spawn(EDITOR, "editor", "notes.txt - Editor");
    desktop.protect(EDITOR);
    desktop.focus(EDITOR);
    let (mut tracker, _source) = tracker(&desktop, quiet_config());
    let handle = tracker.start().unwrap();
    let mut published = settle(&handle).await;
    let before = handle.current_foreground();

    assert!(!handle.terminate_foreground().await.unwrap());

    assert!(desktop.is_alive(EDITOR));
    assert!(before.is_empty());
    let events = drain(&mut published);
    assert_eq!(events.len(), 1);
    assert!(ProcessInfo::same(&events[0], &before));
}

#[tokio::test]
async fn killed_pid_is_not_resurrected_from_cache() {
    let desktop = FakeDesktop::new();
    desktop.spawn(EDITOR, "editor", "notes.txt - Editor");
    desktop.focus(EDITOR);
    let (mut tracker, _source) = tracker(&desktop, quiet_config());
    let handle = tracker.start().unwrap();
    let mut published = settle(&handle).await;
    let killed = handle.current_foreground();

    assert!(handle.terminate_foreground().await.unwrap());

    // A new process reuses the pid and takes the foreground.
    desktop.spawn(EDITOR, "terminal", "~");
    assert!(handle.refresh().await.unwrap());

    let current = handle.current_foreground();
    assert!(!ProcessInfo::same(&current, &killed));
    assert_eq!(current.pid(), EDITOR);
    assert_eq!(current.name(), "terminal");
    assert!(current.is_live());
    let events = drain(&mut published);
    assert_eq!(events.len(), 1);
    assert!(ProcessInfo::same(&events[0], &current));
}

#[tokio::test]
async fn publish_defaults_to_current_snapshot() {
    let desktop = FakeDesktop::new();
    desktop.spawn(EDITOR, "editor", "notes.txt - Editor");
    desktop.spawn(BROWSER, "browser", "Start page");
    desktop.focus(EDITOR);
    let (mut tracker, _source) = tracker(&desktop, quiet_config());
    let handle = tracker.start().unwrap();
    let mut published = settle(&handle).await;

    handle.publish(None).await.unwrap();
    let looked_up = handle.lookup(BROWSER);
    handle.publish(Some(looked_up.clone())).await.unwrap();

    let events = drain(&mut published);
    assert_eq!(events.len(), 2);
    assert!(ProcessInfo::same(&events[0], &handle.current_foreground()));
    assert!(ProcessInfo::same(&events[1], &looked_up));
    assert_eq!(handle.current_foreground().pid(), EDITOR);
}
