//! Common test utilities for foreground-tracker integration tests

use foreground_tracker::{
    EventSink, EventSource, ForegroundError, ForegroundResult, ForegroundTracker, OsEvent,
    ProcessHandle, ProcessTable, SharedProcessInfo, TrackerConfig, TrackerHandle, WindowId,
    WindowResolver,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc::UnboundedReceiver;

/// Pid the fake process table reports as "this process".
pub const SELF_PID: u32 = 4242;

const GATE_TIMEOUT: Duration = Duration::from_secs(5);

struct FakeProcess {
    name: String,
    title: String,
    command_line: String,
    started: SystemTime,
    alive: Arc<AtomicBool>,
    killable: bool,
}

#[derive(Default)]
struct DesktopState {
    foreground: Option<u32>,
    owner_lookup_fails: bool,
    processes: HashMap<u32, FakeProcess>,
    command_line_gates: HashMap<u32, mpsc::Receiver<()>>,
}

/// In-memory desktop implementing both collaborator traits. Counts every
/// call that would hit the OS.
#[derive(Default)]
pub struct FakeDesktop {
    state: Mutex<DesktopState>,
    opens: AtomicUsize,
    window_queries: AtomicUsize,
    command_line_queries: AtomicUsize,
    command_lines_served: AtomicUsize,
}

fn window_of(pid: u32) -> WindowId {
    WindowId(0x1_0000 + u64::from(pid) * 0x10)
}

fn pid_of(window: WindowId) -> u32 {
    ((window.0 - 0x1_0000) / 0x10) as u32
}

#[allow(dead_code)]
impl FakeDesktop {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Starts a process, replacing any previous process with the same pid.
    pub fn spawn(&self, pid: u32, name: &str, title: &str) {
        self.state.lock().processes.insert(
            pid,
            FakeProcess {
                name: name.to_owned(),
                title: title.to_owned(),
                command_line: format!("{name} --flag"),
                started: SystemTime::now(),
                alive: Arc::new(AtomicBool::new(true)),
                killable: true,
            },
        );
    }

    pub fn focus(&self, pid: u32) {
        self.state.lock().foreground = Some(pid);
    }

    pub fn clear_focus(&self) {
        self.state.lock().foreground = None;
    }

    pub fn fail_owner_lookup(&self, fail: bool) {
        self.state.lock().owner_lookup_fails = fail;
    }

    pub fn set_title(&self, pid: u32, title: &str) {
        if let Some(process) = self.state.lock().processes.get_mut(&pid) {
            process.title = title.to_owned();
        }
    }

    pub fn exit(&self, pid: u32) {
        if let Some(process) = self.state.lock().processes.get(&pid) {
            process.alive.store(false, Ordering::SeqCst);
        }
    }

    /// Makes kill requests against `pid` fail.
    pub fn protect(&self, pid: u32) {
        if let Some(process) = self.state.lock().processes.get_mut(&pid) {
            process.killable = false;
        }
    }

    pub fn is_alive(&self, pid: u32) -> bool {
        self.state
            .lock()
            .processes
            .get(&pid)
            .is_some_and(|process| process.alive.load(Ordering::SeqCst))
    }

    /// Blocks `command_line_of(pid)` until the returned sender fires.
    pub fn gate_command_line(&self, pid: u32) -> mpsc::Sender<()> {
        let (open, gate) = mpsc::channel();
        self.state.lock().command_line_gates.insert(pid, gate);
        open
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn window_queries(&self) -> usize {
        self.window_queries.load(Ordering::SeqCst)
    }

    pub fn command_line_queries(&self) -> usize {
        self.command_line_queries.load(Ordering::SeqCst)
    }

    /// Command line queries that have returned.
    pub fn command_lines_served(&self) -> usize {
        self.command_lines_served.load(Ordering::SeqCst)
    }

    pub fn os_calls(&self) -> usize {
        self.opens() + self.window_queries() + self.command_line_queries()
    }

    fn live_title(&self, pid: u32) -> Option<String> {
        let state = self.state.lock();
        state
            .processes
            .get(&pid)
            .filter(|process| process.alive.load(Ordering::SeqCst))
            .map(|process| process.title.clone())
    }
}

impl WindowResolver for FakeDesktop {
    fn foreground_window(&self) -> Option<WindowId> {
        self.window_queries.fetch_add(1, Ordering::SeqCst);
        self.state.lock().foreground.map(window_of)
    }

    fn owning_process_id(&self, window: WindowId) -> ForegroundResult<u32> {
        self.window_queries.fetch_add(1, Ordering::SeqCst);
        if self.state.lock().owner_lookup_fails {
            return Err(ForegroundError::platform("owner lookup failed"));
        }
        Ok(pid_of(window))
    }

    fn window_title(&self, window: WindowId) -> String {
        self.window_queries.fetch_add(1, Ordering::SeqCst);
        self.live_title(pid_of(window)).unwrap_or_default()
    }

    fn main_window_of(&self, pid: u32) -> Option<WindowId> {
        self.window_queries.fetch_add(1, Ordering::SeqCst);
        self.live_title(pid).map(|_| window_of(pid))
    }
}

impl ProcessTable for FakeDesktop {
    fn open_process(&self, pid: u32) -> ForegroundResult<Box<dyn ProcessHandle>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock();
        let process = state
            .processes
            .get(&pid)
            .filter(|process| process.alive.load(Ordering::SeqCst))
            .ok_or(ForegroundError::ProcessNotFound(pid))?;

        Ok(Box::new(FakeHandle {
            pid,
            name: process.name.clone(),
            started: process.started,
            alive: Arc::clone(&process.alive),
            killable: process.killable,
        }))
    }

    fn is_current_process(&self, pid: u32) -> bool {
        pid == SELF_PID
    }

    fn command_line_of(&self, pid: u32) -> String {
        self.command_line_queries.fetch_add(1, Ordering::SeqCst);
        let gate = self.state.lock().command_line_gates.remove(&pid);
        if let Some(gate) = gate {
            let _ = gate.recv_timeout(GATE_TIMEOUT);
        }
        let command_line = self
            .state
            .lock()
            .processes
            .get(&pid)
            .map(|process| process.command_line.clone())
            .unwrap_or_default();
        self.command_lines_served.fetch_add(1, Ordering::SeqCst);
        command_line
    }
}

#[derive(Debug)]
struct FakeHandle {
    pid: u32,
    name: String,
    started: SystemTime,
    alive: Arc<AtomicBool>,
    killable: bool,
}

impl ProcessHandle for FakeHandle {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn name(&self) -> ForegroundResult<String> {
        Ok(self.name.clone())
    }

    fn version(&self) -> ForegroundResult<String> {
        Ok("1.0.0.0".to_owned())
    }

    fn start_time(&self) -> ForegroundResult<SystemTime> {
        Ok(self.started)
    }

    fn has_exited(&self) -> ForegroundResult<bool> {
        Ok(!self.alive.load(Ordering::SeqCst))
    }

    fn kill(&mut self) -> ForegroundResult<()> {
        if !self.killable {
            return Err(ForegroundError::PermissionDenied);
        }
        self.alive.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// Test side of a [`FakeEventSource`].
#[derive(Clone, Default)]
pub struct SourceControl {
    sink: Arc<Mutex<Option<EventSink>>>,
    stopped: Arc<AtomicBool>,
}

#[allow(dead_code)]
impl SourceControl {
    pub fn fire(&self, event: OsEvent) -> bool {
        self.sink
            .lock()
            .as_ref()
            .is_some_and(|sink| sink.notify(event))
    }

    pub fn is_started(&self) -> bool {
        self.sink.lock().is_some()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

pub struct FakeEventSource {
    control: SourceControl,
    fail_start: bool,
}

impl EventSource for FakeEventSource {
    fn start(&mut self, sink: EventSink) -> ForegroundResult<()> {
        if self.fail_start {
            return Err(ForegroundError::Unsupported);
        }
        *self.control.sink.lock() = Some(sink);
        Ok(())
    }

    fn stop(&mut self) {
        self.control.sink.lock().take();
        self.control.stopped.store(true, Ordering::SeqCst);
    }
}

/// Config without background enrichment, so every notification is caused
/// by the test itself.
#[allow(dead_code)]
pub fn quiet_config() -> TrackerConfig {
    TrackerConfig::builder().enrich_command_line(false).build()
}

#[allow(dead_code)]
pub fn tracker(desktop: &Arc<FakeDesktop>, config: TrackerConfig) -> (ForegroundTracker, SourceControl) {
    tracker_with_source(desktop, config, false)
}

#[allow(dead_code)]
pub fn tracker_with_source(
    desktop: &Arc<FakeDesktop>,
    config: TrackerConfig,
    fail_start: bool,
) -> (ForegroundTracker, SourceControl) {
    let control = SourceControl::default();
    let source = FakeEventSource {
        control: control.clone(),
        fail_start,
    };
    let tracker = ForegroundTracker::with_collaborators(
        config,
        Arc::clone(desktop) as Arc<dyn WindowResolver>,
        Arc::clone(desktop) as Arc<dyn ProcessTable>,
        Box::new(source),
    );
    (tracker, control)
}

/// Waits until the dispatch loop has processed everything queued so far and
/// returns a fresh subscription.
#[allow(dead_code)]
pub async fn settle(handle: &TrackerHandle) -> UnboundedReceiver<SharedProcessInfo> {
    handle
        .subscribe()
        .await
        .expect("tracker should be running")
}

/// Everything published so far, without waiting.
#[allow(dead_code)]
pub fn drain(receiver: &mut UnboundedReceiver<SharedProcessInfo>) -> Vec<SharedProcessInfo> {
    let mut published = Vec::new();
    while let Ok(info) = receiver.try_recv() {
        published.push(info);
    }
    published
}

/// Waits for the next published snapshot matching `pred`.
#[allow(dead_code)]
pub async fn next_matching(
    receiver: &mut UnboundedReceiver<SharedProcessInfo>,
    pred: impl Fn(&SharedProcessInfo) -> bool,
) -> SharedProcessInfo {
    tokio::time::timeout(GATE_TIMEOUT, async {
        loop {
            let info = receiver.recv().await.expect("tracker stopped publishing");
            if pred(&info) {
                return info;
            }
        }
    })
    .await
    .expect("no matching snapshot was published")
}

/// Check if integration tests should run
///
/// Tests will only run if INTEGRATION_TEST=1 environment variable is set
#[allow(dead_code)]
pub fn should_run_integration_tests() -> bool {
    env::var("INTEGRATION_TEST")
        .map(|v| v == "1")
        .unwrap_or(false)
}
