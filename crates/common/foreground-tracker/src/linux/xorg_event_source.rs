use super::x11::X11Session;
use crate::{
    ForegroundError, ForegroundResult, OsEvent, TrackerConfig,
    source::{EventSink, EventSource},
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, warn};
use x11rb::{
    connection::Connection,
    protocol::{Event, xproto::PropertyNotifyEvent},
};

const MAX_CONSECUTIVE_X11_ERRORS: u32 = 10;

/// Turns `PropertyNotify` events on the root window (`_NET_ACTIVE_WINDOW`)
/// and on the active window (`_NET_WM_NAME`, `WM_NAME`) into [`OsEvent`]s.
///
/// X11 has no capture-start notification, so only focus and title changes
/// are reported.
pub struct XorgEventSource {
    poll_interval: Duration,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl XorgEventSource {
    #[must_use]
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            poll_interval: config.poll_interval,
            stop: Arc::new(AtomicBool::new(false)),
            thread: None,
        }
    }
}

impl EventSource for XorgEventSource {
    fn start(&mut self, sink: EventSink) -> ForegroundResult<()> {
        if self.thread.is_some() {
            return Err(ForegroundError::AlreadyRunning);
        }

        let session = X11Session::connect()?;
        session.watch_properties(session.root, true)?;
        session.flush()?;

        self.stop.store(false, Ordering::Release);
        let stop = Arc::clone(&self.stop);
        let poll_interval = self.poll_interval;

        let thread = std::thread::Builder::new()
            .name("foreground-x11-events".into())
            .spawn(move || {
                if let Err(e) = run(&session, &sink, &stop, poll_interval) {
                    warn!("X11 notification source stopped: {e}");
                }
            })
            .map_err(|e| {
                ForegroundError::platform_with_source("failed to spawn X11 event thread", e)
            })?;

        self.thread = Some(thread);
        info!("X11 notification source started");
        Ok(())
    }

    fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            warn!("X11 event thread panicked");
        }
    }
}

impl Drop for XorgEventSource {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(
    session: &X11Session,
    sink: &EventSink,
    stop: &AtomicBool,
    poll_interval: Duration,
) -> ForegroundResult<()> {
    let mut watched: Option<u32> = None;
    follow_active_window(session, &mut watched);

    while let Some(event) = next_event(session, stop, sink, poll_interval)? {
        let Event::PropertyNotify(PropertyNotifyEvent { atom, window, .. }) = event else {
            continue;
        };

        let notification = if window == session.root && atom == session.atoms.net_active_window {
            follow_active_window(session, &mut watched);
            OsEvent::FocusChanged
        } else if Some(window) == watched
            && (atom == session.atoms.net_wm_name || atom == session.atoms.wm_name)
        {
            OsEvent::TitleChanged
        } else {
            continue;
        };

        if !sink.notify(notification) {
            break;
        }
    }

    debug!("X11 event loop exiting");
    Ok(())
}

/// Moves title monitoring from the previously active window to the current
/// one.
fn follow_active_window(session: &X11Session, watched: &mut Option<u32>) {
    let active = match session.active_window() {
        Ok(active) => active,
        Err(e) => {
            debug!("failed to get active window: {e}");
            None
        }
    };
    if active == *watched {
        return;
    }

    if let Some(old) = watched.take()
        && let Err(e) = session.watch_properties(old, false)
    {
        debug!("{e}");
    }
    if let Some(new) = active {
        match session.watch_properties(new, true) {
            Ok(()) => *watched = Some(new),
            Err(e) => debug!("{e}"),
        }
    }
    if let Err(e) = session.flush() {
        debug!("{e}");
    }
}

/// Returns `Ok(None)` once stopped or once the tracker is gone.
fn next_event(
    session: &X11Session,
    stop: &AtomicBool,
    sink: &EventSink,
    poll_interval: Duration,
) -> ForegroundResult<Option<Event>> {
    let mut consecutive_errors: u32 = 0;

    loop {
        if stop.load(Ordering::Acquire) || sink.is_closed() {
            return Ok(None);
        }
        match session.conn.poll_for_event() {
            Ok(Some(event)) => return Ok(Some(event)),
            Ok(None) => std::thread::sleep(poll_interval),
            Err(e) => {
                consecutive_errors += 1;
                info!("X11 error ({consecutive_errors}/{MAX_CONSECUTIVE_X11_ERRORS}): {e}");
                if consecutive_errors >= MAX_CONSECUTIVE_X11_ERRORS {
                    return Err(ForegroundError::platform_with_source(
                        "X11 connection failed repeatedly",
                        e,
                    ));
                }
                std::thread::sleep(Duration::from_secs(1));
            }
        }
    }
}
