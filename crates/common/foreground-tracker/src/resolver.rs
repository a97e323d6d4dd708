use crate::{
    ProcessInfo, SharedProcessInfo, TrackerConfig,
    binding::{ProcessTable, WindowResolver},
    tracker::Command,
};
use std::sync::Arc;
use tokio::{runtime::Handle, sync::mpsc};
use tracing::{debug, trace};

/// Defers a publish onto the dispatch loop from any thread.
#[derive(Debug, Clone)]
pub(crate) struct Poster {
    commands: mpsc::UnboundedSender<Command>,
}

impl Poster {
    pub(crate) fn new(commands: mpsc::UnboundedSender<Command>) -> Self {
        Self { commands }
    }

    pub(crate) fn post_publish(&self, info: SharedProcessInfo) {
        if self
            .commands
            .send(Command::Publish {
                info: Some(info),
                done: None,
            })
            .is_err()
        {
            trace!("dispatch loop gone, dropping deferred publish");
        }
    }
}

#[derive(Clone)]
struct Enrichment {
    runtime: Handle,
    poster: Poster,
}

/// Turns pids into snapshots. Shared by the dispatch loop and every
/// [`TrackerHandle`](crate::TrackerHandle).
#[derive(Clone)]
pub(crate) struct Resolver {
    windows: Arc<dyn WindowResolver>,
    processes: Arc<dyn ProcessTable>,
    enrichment: Option<Enrichment>,
    start_time_format: Arc<str>,
}

impl Resolver {
    pub(crate) fn new(
        windows: Arc<dyn WindowResolver>,
        processes: Arc<dyn ProcessTable>,
        config: &TrackerConfig,
        runtime: Handle,
        poster: Poster,
    ) -> Self {
        let enrichment = config
            .enrich_command_line
            .then_some(Enrichment { runtime, poster });
        Self {
            windows,
            processes,
            enrichment,
            start_time_format: Arc::from(config.start_time_format.as_str()),
        }
    }

    pub(crate) fn windows(&self) -> &dyn WindowResolver {
        &*self.windows
    }

    pub(crate) fn processes(&self) -> &dyn ProcessTable {
        &*self.processes
    }

    pub(crate) fn start_time_format(&self) -> &str {
        &self.start_time_format
    }

    /// Resolves `pid` to a fresh snapshot. `0` and every lookup failure yield
    /// the Empty snapshot.
    pub(crate) fn lookup(&self, pid: u32) -> SharedProcessInfo {
        if pid == 0 {
            return ProcessInfo::empty();
        }

        match self.processes.open_process(pid) {
            Ok(handle) => ProcessInfo::capture(handle, self),
            Err(e) => {
                debug!(pid, "failed to open process: {e}");
                ProcessInfo::empty()
            }
        }
    }

    /// Fetches the command line of `info` on the blocking pool, then defers a
    /// publish of `info` onto the dispatch loop.
    pub(crate) fn enrich(&self, info: SharedProcessInfo) {
        let Some(enrichment) = &self.enrichment else {
            return;
        };

        let pid = info.pid();
        let processes = Arc::clone(&self.processes);
        let poster = enrichment.poster.clone();

        enrichment.runtime.spawn_blocking(move || {
            let command_line = processes.command_line_of(pid);
            if command_line.is_empty() {
                debug!(pid, "command line unavailable");
            }
            if info.attach_command_line(pid, command_line) {
                poster.post_publish(info);
            } else {
                trace!(pid, "snapshot was reset before enrichment finished");
            }
        });
    }
}
