use crate::{
    ForegroundResult, ProcessSnapshot, binding::ProcessHandle, binding::WindowResolver,
    resolver::Resolver,
};
use chrono::{DateTime, Local};
use parking_lot::{Mutex, RwLock};
use std::fmt::{self, Write as _};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info, trace};

pub type SharedProcessInfo = Arc<ProcessInfo>;

/// A captured process together with the live handle it was captured from.
///
/// Listeners receive snapshots as [`SharedProcessInfo`]; the same allocation
/// is handed out again whenever the tracker reuses a cached snapshot, so
/// [`ProcessInfo::same`] tells whether two notifications refer to the same
/// capture. The title and command line can change after publication.
pub struct ProcessInfo {
    fields: RwLock<ProcessSnapshot>,
    handle: Mutex<Option<Box<dyn ProcessHandle>>>,
}

impl ProcessInfo {
    pub(crate) fn empty() -> SharedProcessInfo {
        Arc::new(Self {
            fields: RwLock::new(ProcessSnapshot::empty()),
            handle: Mutex::new(None),
        })
    }

    /// Captures the identity of `handle`'s process. Lookup failures leave the
    /// affected field empty.
    pub(crate) fn capture(handle: Box<dyn ProcessHandle>, resolver: &Resolver) -> SharedProcessInfo {
        let pid = handle.pid();
        let name = best_effort(pid, "name", handle.name());
        let version = best_effort(pid, "version", handle.version());
        let start_time = best_effort(
            pid,
            "start time",
            handle
                .start_time()
                .map(|started| render_start_time(started, resolver.start_time_format())),
        );

        let info = Arc::new(Self {
            fields: RwLock::new(ProcessSnapshot {
                pid,
                name,
                version,
                start_time,
                ..ProcessSnapshot::default()
            }),
            handle: Mutex::new(Some(handle)),
        });

        info.refresh_title(resolver.windows());

        if pid != 0 && info.fields.read().command_line.is_empty() {
            resolver.enrich(Arc::clone(&info));
        }

        info
    }

    /// Whether `a` and `b` are the same capture.
    #[must_use]
    pub fn same(a: &SharedProcessInfo, b: &SharedProcessInfo) -> bool {
        Arc::ptr_eq(a, b)
    }

    #[must_use]
    pub fn snapshot(&self) -> ProcessSnapshot {
        self.fields.read().clone()
    }

    #[must_use]
    pub fn pid(&self) -> u32 {
        self.fields.read().pid
    }

    #[must_use]
    pub fn title(&self) -> String {
        self.fields.read().title.clone()
    }

    #[must_use]
    pub fn name(&self) -> String {
        self.fields.read().name.clone()
    }

    #[must_use]
    pub fn version(&self) -> String {
        self.fields.read().version.clone()
    }

    #[must_use]
    pub fn start_time(&self) -> String {
        self.fields.read().start_time.clone()
    }

    #[must_use]
    pub fn command_line(&self) -> String {
        self.fields.read().command_line.clone()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.read().is_empty()
    }

    /// Whether this snapshot still owns a handle to its process.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.handle.lock().is_some()
    }

    /// Re-reads the main window title. Returns whether it changed.
    pub(crate) fn refresh_title(&self, windows: &dyn WindowResolver) -> bool {
        let pid = self.pid();
        let title = if pid == 0 || !self.is_live() {
            String::new()
        } else {
            match windows.main_window_of(pid) {
                Some(window) => windows.window_title(window),
                None => {
                    trace!(pid, "process has no main window");
                    String::new()
                }
            }
        };

        let mut fields = self.fields.write();
        if fields.title == title {
            return false;
        }
        fields.title = title;
        true
    }

    /// Requests termination through the owned handle, giving the handle up
    /// either way. Returns `true` only if termination was requested.
    pub(crate) fn terminate(&self) -> bool {
        let pid = self.pid();
        let Some(mut handle) = self.handle.lock().take() else {
            debug!(pid, "no live handle to terminate");
            return false;
        };

        match handle.has_exited() {
            Ok(false) => {}
            Ok(true) => {
                debug!(pid, "process already exited");
                return false;
            }
            Err(e) => {
                debug!(pid, "failed to query exit status: {e}");
                return false;
            }
        }

        match handle.kill() {
            Ok(()) => {
                info!(pid, "terminated foreground process");
                true
            }
            Err(e) => {
                debug!(pid, "failed to terminate process: {e}");
                false
            }
        }
    }

    /// Clears every field to the Empty snapshot in place and drops the handle.
    pub(crate) fn reset(&self) {
        self.fields.write().clear();
        self.handle.lock().take();
    }

    /// Stores an enriched command line, unless the snapshot was reset to a
    /// different pid in the meantime.
    pub(crate) fn attach_command_line(&self, pid: u32, command_line: String) -> bool {
        let mut fields = self.fields.write();
        if fields.pid != pid {
            return false;
        }
        fields.command_line = command_line;
        true
    }
}

impl fmt::Debug for ProcessInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessInfo")
            .field("snapshot", &*self.fields.read())
            .field("live", &self.is_live())
            .finish()
    }
}

impl fmt::Display for ProcessInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.fields.read(), f)
    }
}

fn best_effort(pid: u32, what: &str, value: ForegroundResult<String>) -> String {
    value.unwrap_or_else(|e| {
        debug!(pid, "failed to read process {what}: {e}");
        String::new()
    })
}

fn render_start_time(started: SystemTime, format: &str) -> String {
    let local: DateTime<Local> = started.into();
    let mut rendered = String::new();
    if write!(rendered, "{}", local.format(format)).is_err() {
        debug!("invalid start time format {format:?}");
        rendered.clear();
    }
    rendered
}
