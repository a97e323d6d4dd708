use crate::{
    ForegroundError, ForegroundResult,
    binding::{ProcessHandle, ProcessTable},
};
use parking_lot::Mutex;
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use sysinfo::{Pid, ProcessRefreshKind, ProcessStatus, ProcessesToUpdate, System, UpdateKind};
use tracing::debug;

/// [`ProcessTable`] backed by `sysinfo`. Only the queried pid is refreshed on
/// each call.
#[derive(Clone)]
pub struct SysinfoProcessTable {
    system: Arc<Mutex<System>>,
    self_pid: Option<u32>,
}

impl SysinfoProcessTable {
    #[must_use]
    pub fn new() -> Self {
        let self_pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid.as_u32()),
            Err(e) => {
                debug!("failed to determine own pid: {e}");
                None
            }
        };
        Self {
            system: Arc::new(Mutex::new(System::new())),
            self_pid,
        }
    }
}

impl Default for SysinfoProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SysinfoProcessTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SysinfoProcessTable")
            .field("self_pid", &self.self_pid)
            .finish_non_exhaustive()
    }
}

fn refresh_one(system: &mut System, pid: Pid, kind: ProcessRefreshKind) {
    system.refresh_processes_specifics(ProcessesToUpdate::Some(&[pid]), true, kind);
}

fn is_gone(status: ProcessStatus) -> bool {
    matches!(status, ProcessStatus::Zombie | ProcessStatus::Dead)
}

fn display_name(name: &std::ffi::OsStr) -> String {
    let name = name.to_string_lossy();
    if cfg!(windows) {
        let len = name.len();
        if len > 4 && name.is_char_boundary(len - 4) && name[len - 4..].eq_ignore_ascii_case(".exe")
        {
            return name[..len - 4].to_owned();
        }
    }
    name.into_owned()
}

/// Joins arguments with single spaces, quoting the ones that contain
/// whitespace.
pub(crate) fn join_command_line(args: &[OsString]) -> String {
    let mut line = String::new();
    for arg in args {
        let arg = arg.to_string_lossy();
        if !line.is_empty() {
            line.push(' ');
        }
        if arg.chars().any(char::is_whitespace) {
            line.push('"');
            line.push_str(&arg);
            line.push('"');
        } else {
            line.push_str(&arg);
        }
    }
    line
}

impl ProcessTable for SysinfoProcessTable {
    fn open_process(&self, pid: u32) -> ForegroundResult<Box<dyn ProcessHandle>> {
        let sys_pid = Pid::from_u32(pid);
        let mut system = self.system.lock();
        refresh_one(
            &mut system,
            sys_pid,
            ProcessRefreshKind::nothing().with_exe(UpdateKind::OnlyIfNotSet),
        );

        let process = system
            .process(sys_pid)
            .filter(|process| !is_gone(process.status()))
            .ok_or(ForegroundError::ProcessNotFound(pid))?;

        Ok(Box::new(SysinfoProcess {
            pid,
            name: display_name(process.name()),
            exe: process.exe().map(PathBuf::from),
            started_at: process.start_time(),
            system: Arc::clone(&self.system),
        }))
    }

    fn is_current_process(&self, pid: u32) -> bool {
        self.self_pid == Some(pid)
    }

    fn command_line_of(&self, pid: u32) -> String {
        let sys_pid = Pid::from_u32(pid);
        let mut system = self.system.lock();
        refresh_one(
            &mut system,
            sys_pid,
            ProcessRefreshKind::nothing().with_cmd(UpdateKind::Always),
        );

        match system.process(sys_pid) {
            Some(process) => join_command_line(process.cmd()),
            None => {
                debug!(pid, "process vanished before its command line was read");
                String::new()
            }
        }
    }
}

/// Handle to one process as seen by `sysinfo`. Remembers the start time so a
/// recycled pid is never mistaken for the original process.
pub struct SysinfoProcess {
    pid: u32,
    name: String,
    exe: Option<PathBuf>,
    started_at: u64,
    system: Arc<Mutex<System>>,
}

impl SysinfoProcess {
    fn with_live_process<T>(
        &self,
        f: impl FnOnce(&sysinfo::Process) -> ForegroundResult<T>,
    ) -> ForegroundResult<T> {
        let sys_pid = Pid::from_u32(self.pid);
        let mut system = self.system.lock();
        refresh_one(&mut system, sys_pid, ProcessRefreshKind::nothing());

        match system.process(sys_pid) {
            Some(process) if process.start_time() == self.started_at && !is_gone(process.status()) => {
                f(process)
            }
            _ => Err(ForegroundError::ProcessNotFound(self.pid)),
        }
    }
}

impl std::fmt::Debug for SysinfoProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SysinfoProcess")
            .field("pid", &self.pid)
            .field("name", &self.name)
            .field("exe", &self.exe)
            .finish_non_exhaustive()
    }
}

impl ProcessHandle for SysinfoProcess {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn name(&self) -> ForegroundResult<String> {
        Ok(self.name.clone())
    }

    fn version(&self) -> ForegroundResult<String> {
        match &self.exe {
            Some(exe) => crate::platform::utils::product_version(exe),
            None => Err(ForegroundError::platform(format!(
                "executable path of pid {} is unknown",
                self.pid
            ))),
        }
    }

    fn start_time(&self) -> ForegroundResult<SystemTime> {
        Ok(UNIX_EPOCH + Duration::from_secs(self.started_at))
    }

    fn has_exited(&self) -> ForegroundResult<bool> {
        match self.with_live_process(|_| Ok(())) {
            Ok(()) => Ok(false),
            Err(ForegroundError::ProcessNotFound(_)) => Ok(true),
            Err(e) => Err(e),
        }
    }

    fn kill(&mut self) -> ForegroundResult<()> {
        self.with_live_process(|process| {
            if process.kill() {
                Ok(())
            } else {
                Err(ForegroundError::PermissionDenied)
            }
        })
    }
}
