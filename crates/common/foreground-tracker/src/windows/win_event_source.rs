use crate::{
    ForegroundError, ForegroundResult, OsEvent, TrackerConfig,
    source::{EventSink, EventSource},
};
use std::cell::RefCell;
use std::sync::mpsc;
use std::thread::JoinHandle;
use tracing::{debug, info, warn};
use windows_sys::Win32::{
    Foundation::HWND,
    System::Threading::GetCurrentThreadId,
    UI::{
        Accessibility::{HWINEVENTHOOK, SetWinEventHook, UnhookWinEvent},
        WindowsAndMessaging::{
            DispatchMessageW, EVENT_OBJECT_NAMECHANGE, EVENT_SYSTEM_CAPTURESTART,
            EVENT_SYSTEM_FOREGROUND, GetMessageW, MSG, OBJID_WINDOW, PM_NOREMOVE, PeekMessageW,
            PostQuitMessage, PostThreadMessageW, TranslateMessage, WINEVENT_OUTOFCONTEXT,
            WINEVENT_SKIPOWNPROCESS, WM_QUIT,
        },
    },
};

thread_local! {
    static EVENT_SINK: RefCell<Option<EventSink>> = const { RefCell::new(None) };
}

const HOOKED_EVENTS: [u32; 3] = [
    EVENT_SYSTEM_FOREGROUND,
    EVENT_SYSTEM_CAPTURESTART,
    EVENT_OBJECT_NAMECHANGE,
];

/// `SetWinEventHook` based notification source. Hooks are installed out of
/// context on a dedicated thread that pumps messages until stopped.
pub struct WinEventSource {
    thread: Option<(u32, JoinHandle<()>)>,
}

impl WinEventSource {
    #[must_use]
    pub fn new(_config: &TrackerConfig) -> Self {
        Self { thread: None }
    }
}

fn classify(event: u32, id_object: i32) -> Option<OsEvent> {
    match event {
        EVENT_SYSTEM_FOREGROUND => Some(OsEvent::FocusChanged),
        EVENT_SYSTEM_CAPTURESTART => Some(OsEvent::CaptureStarted),
        // Caret, cursor and child control renames are noise.
        EVENT_OBJECT_NAMECHANGE if id_object == OBJID_WINDOW => Some(OsEvent::TitleChanged),
        _ => None,
    }
}

unsafe extern "system" fn win_event_proc(
    _hook: HWINEVENTHOOK,
    event: u32,
    _hwnd: HWND,
    id_object: i32,
    _id_child: i32,
    _event_thread: u32,
    _event_time: u32,
) {
    let Some(event) = classify(event, id_object) else {
        return;
    };

    let delivered = EVENT_SINK.with_borrow(|sink| sink.as_ref().is_some_and(|s| s.notify(event)));
    if !delivered {
        unsafe { PostQuitMessage(0) };
    }
}

fn install_hooks() -> ForegroundResult<Vec<HWINEVENTHOOK>> {
    let mut hooks = Vec::with_capacity(HOOKED_EVENTS.len());
    for event in HOOKED_EVENTS {
        // Our own title changes would otherwise feed back into the tracker.
        let flags = if event == EVENT_OBJECT_NAMECHANGE {
            WINEVENT_OUTOFCONTEXT | WINEVENT_SKIPOWNPROCESS
        } else {
            WINEVENT_OUTOFCONTEXT
        };
        let hook = unsafe {
            SetWinEventHook(
                event,
                event,
                std::ptr::null_mut(),
                Some(win_event_proc),
                0,
                0,
                flags,
            )
        };
        if hook.is_null() {
            unhook_all(&hooks);
            return Err(ForegroundError::platform(format!(
                "SetWinEventHook failed for event {event:#x}"
            )));
        }
        hooks.push(hook);
    }
    Ok(hooks)
}

fn unhook_all(hooks: &[HWINEVENTHOOK]) {
    for &hook in hooks {
        if unsafe { UnhookWinEvent(hook) } == 0 {
            debug!("UnhookWinEvent failed");
        }
    }
}

fn pump_messages() {
    let mut msg: MSG = unsafe { std::mem::zeroed() };
    loop {
        let ret = unsafe { GetMessageW(&mut msg, std::ptr::null_mut(), 0, 0) };
        if ret == 0 {
            break;
        }
        if ret == -1 {
            warn!("GetMessageW failed, leaving message loop");
            break;
        }
        unsafe {
            TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }
}

fn run(sink: EventSink, ready: mpsc::Sender<ForegroundResult<u32>>) {
    // Forces creation of the thread's message queue before anyone can post
    // WM_QUIT to it.
    let mut msg: MSG = unsafe { std::mem::zeroed() };
    unsafe { PeekMessageW(&mut msg, std::ptr::null_mut(), 0, 0, PM_NOREMOVE) };

    let hooks = match install_hooks() {
        Ok(hooks) => hooks,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    EVENT_SINK.set(Some(sink));
    let _ = ready.send(Ok(unsafe { GetCurrentThreadId() }));

    pump_messages();

    unhook_all(&hooks);
    EVENT_SINK.set(None);
    debug!("win event loop exiting");
}

impl EventSource for WinEventSource {
    fn start(&mut self, sink: EventSink) -> ForegroundResult<()> {
        if self.thread.is_some() {
            return Err(ForegroundError::AlreadyRunning);
        }

        let (ready, started) = mpsc::channel();
        let thread = std::thread::Builder::new()
            .name("foreground-win-events".into())
            .spawn(move || run(sink, ready))
            .map_err(|e| {
                ForegroundError::platform_with_source("failed to spawn win event thread", e)
            })?;

        let thread_id = match started.recv() {
            Ok(Ok(thread_id)) => thread_id,
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(e);
            }
            Err(_) => {
                let _ = thread.join();
                return Err(ForegroundError::platform(
                    "win event thread exited during startup",
                ));
            }
        };

        self.thread = Some((thread_id, thread));
        info!("win event notification source started");
        Ok(())
    }

    fn stop(&mut self) {
        let Some((thread_id, thread)) = self.thread.take() else {
            return;
        };
        if unsafe { PostThreadMessageW(thread_id, WM_QUIT, 0, 0) } == 0 {
            debug!("PostThreadMessageW failed, event thread already gone");
        }
        if thread.join().is_err() {
            warn!("win event thread panicked");
        }
    }
}

impl Drop for WinEventSource {
    fn drop(&mut self) {
        self.stop();
    }
}
