use crate::{
    ForegroundError, ForegroundResult, OsEvent, ProcessInfo, SharedProcessInfo, TrackerConfig,
    binding::{ProcessTable, WindowResolver},
    dispatch::{Dispatch, Listener, ListenerId},
    resolver::{Poster, Resolver},
    source::{EventSink, EventSource},
};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::{
    runtime::Handle,
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, info, trace, warn};

/// Messages processed by the dispatch loop, the tracker's owning context.
pub(crate) enum Command {
    Os(OsEvent),
    Refresh {
        allow_self: bool,
        done: Option<oneshot::Sender<bool>>,
    },
    RefreshTitle {
        done: oneshot::Sender<bool>,
    },
    Terminate {
        done: oneshot::Sender<bool>,
    },
    Publish {
        info: Option<SharedProcessInfo>,
        done: Option<oneshot::Sender<()>>,
    },
    AddListener {
        listener: Listener,
        done: oneshot::Sender<ListenerId>,
    },
    Subscribe {
        sender: mpsc::UnboundedSender<SharedProcessInfo>,
        replay_current: bool,
        done: oneshot::Sender<ListenerId>,
    },
    RemoveListener {
        id: ListenerId,
        done: oneshot::Sender<bool>,
    },
    Shutdown,
}

/// Tracker state. Lives inside the dispatch loop and is never shared.
struct TrackerCore {
    resolver: Resolver,
    current: Arc<RwLock<SharedProcessInfo>>,
    dispatch: Dispatch,
}

impl TrackerCore {
    fn current(&self) -> SharedProcessInfo {
        Arc::clone(&*self.current.read())
    }

    fn handle_os_event(&mut self, event: OsEvent) {
        trace!(?event, "os notification");
        if event.needs_full_refresh() {
            self.refresh(false);
        } else {
            self.refresh_title_only();
        }
    }

    /// Resolves the foreground window to a snapshot, reusing the cached one
    /// when it still belongs to the same live process. `None` means "leave
    /// the current state alone".
    fn resolve_foreground(&self, allow_self: bool) -> Option<SharedProcessInfo> {
        let windows = self.resolver.windows();
        let Some(window) = windows.foreground_window() else {
            debug!("no foreground window");
            return None;
        };

        let pid = match windows.owning_process_id(window) {
            Ok(pid) => pid,
            Err(e) => {
                debug!(%window, "failed to resolve window owner: {e}");
                return None;
            }
        };

        if pid == 0 {
            debug!(%window, "foreground window resolved to pid 0");
            return None;
        }

        if !allow_self && self.resolver.processes().is_current_process(pid) {
            trace!(pid, "ignoring own foreground window");
            return None;
        }

        let current = self.current();
        if current.pid() == pid && current.is_live() {
            return Some(current);
        }

        let info = self.resolver.lookup(pid);
        if info.is_empty() {
            debug!(pid, "foreground process could not be captured");
            return None;
        }
        Some(info)
    }

    fn refresh(&mut self, allow_self: bool) -> bool {
        let Some(info) = self.resolve_foreground(allow_self) else {
            return false;
        };

        let previous = self.current();
        if ProcessInfo::same(&info, &previous) {
            return false;
        }

        debug!(
            pid = info.pid(),
            previous = previous.pid(),
            "foreground process changed"
        );
        *self.current.write() = Arc::clone(&info);
        self.dispatch.publish(&info);
        true
    }

    fn refresh_title_only(&mut self) -> bool {
        let current = self.current();
        if current.is_empty() {
            return false;
        }
        if !current.refresh_title(self.resolver.windows()) {
            return false;
        }
        self.dispatch.publish(&current);
        true
    }

    fn terminate_foreground(&mut self) -> bool {
        let current = self.current();
        if current.terminate() {
            self.refresh(false);
            return true;
        }

        debug!(pid = current.pid(), "termination failed, resetting snapshot");
        current.reset();
        self.dispatch.publish(&current);
        false
    }

    fn publish(&mut self, info: Option<SharedProcessInfo>) {
        let info = info.unwrap_or_else(|| self.current());
        self.dispatch.publish(&info);
    }
}

async fn run_dispatch_loop(mut core: TrackerCore, mut commands: mpsc::UnboundedReceiver<Command>) {
    info!("foreground tracker dispatch loop started");

    while let Some(command) = commands.recv().await {
        match command {
            Command::Os(event) => core.handle_os_event(event),
            Command::Refresh { allow_self, done } => {
                let changed = core.refresh(allow_self);
                if let Some(done) = done {
                    let _ = done.send(changed);
                }
            }
            Command::RefreshTitle { done } => {
                let _ = done.send(core.refresh_title_only());
            }
            Command::Terminate { done } => {
                let _ = done.send(core.terminate_foreground());
            }
            Command::Publish { info, done } => {
                core.publish(info);
                if let Some(done) = done {
                    let _ = done.send(());
                }
            }
            Command::AddListener { listener, done } => {
                let _ = done.send(core.dispatch.add_listener(listener));
            }
            Command::Subscribe {
                sender,
                replay_current,
                done,
            } => {
                if replay_current {
                    let current = core.current();
                    if !current.is_empty() {
                        let _ = sender.send(current);
                    }
                }
                let _ = done.send(core.dispatch.add_channel(sender));
            }
            Command::RemoveListener { id, done } => {
                let _ = done.send(core.dispatch.remove(id));
            }
            Command::Shutdown => break,
        }
    }

    info!("foreground tracker dispatch loop stopped");
}

/// Cloneable access to a running tracker.
///
/// Every mutation is executed on the dispatch loop; the async methods resolve
/// once the loop has processed the request. Listeners must not `.await` these
/// methods from inside their callback (they run on the loop); spawn a task
/// instead.
#[derive(Clone)]
pub struct TrackerHandle {
    commands: mpsc::UnboundedSender<Command>,
    current: Arc<RwLock<SharedProcessInfo>>,
    resolver: Resolver,
}

impl TrackerHandle {
    /// The last published foreground snapshot. Empty until something has
    /// been resolved.
    #[must_use]
    pub fn current_foreground(&self) -> SharedProcessInfo {
        Arc::clone(&*self.current.read())
    }

    /// Re-resolves the foreground process. Returns whether a notification
    /// was published.
    ///
    /// # Errors
    ///
    /// Returns an error if the tracker has stopped.
    pub async fn refresh(&self) -> ForegroundResult<bool> {
        self.request(|done| Command::Refresh {
            allow_self: false,
            done: Some(done),
        })
        .await
    }

    /// Re-reads only the title of the current snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the tracker has stopped.
    pub async fn refresh_title_only(&self) -> ForegroundResult<bool> {
        self.request(|done| Command::RefreshTitle { done }).await
    }

    /// Kills the current foreground process. On failure the current snapshot
    /// is reset to Empty and republished. Returns whether the kill went
    /// through.
    ///
    /// # Errors
    ///
    /// Returns an error if the tracker has stopped.
    pub async fn terminate_foreground(&self) -> ForegroundResult<bool> {
        self.request(|done| Command::Terminate { done }).await
    }

    /// Resolves an arbitrary pid on the calling thread. Never fails: `0` and
    /// lookup failures yield the Empty snapshot.
    #[must_use]
    pub fn lookup(&self, pid: u32) -> SharedProcessInfo {
        self.resolver.lookup(pid)
    }

    /// Broadcasts `info`, or the current snapshot when `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the tracker has stopped.
    pub async fn publish(&self, info: Option<SharedProcessInfo>) -> ForegroundResult<()> {
        self.request(|done| Command::Publish {
            info,
            done: Some(done),
        })
        .await
    }

    /// Queues a publish of `info` without waiting for it.
    pub fn post_publish(&self, info: SharedProcessInfo) {
        Poster::new(self.commands.clone()).post_publish(info);
    }

    /// Registers a callback invoked on the dispatch loop for every published
    /// snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the tracker has stopped.
    pub async fn add_listener<F>(&self, listener: F) -> ForegroundResult<ListenerId>
    where
        F: FnMut(&SharedProcessInfo) + Send + 'static,
    {
        let listener: Listener = Box::new(listener);
        self.request(|done| Command::AddListener { listener, done })
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the tracker has stopped.
    pub async fn remove_listener(&self, id: ListenerId) -> ForegroundResult<bool> {
        self.request(|done| Command::RemoveListener { id, done })
            .await
    }

    /// Receives every published snapshot through a channel. The subscription
    /// ends when the receiver is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the tracker has stopped.
    pub async fn subscribe(&self) -> ForegroundResult<mpsc::UnboundedReceiver<SharedProcessInfo>> {
        self.subscribe_inner(false).await
    }

    /// Like [`subscribe`](Self::subscribe), but the receiver first gets the
    /// current snapshot unless it is Empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the tracker has stopped.
    pub async fn subscribe_with_current(
        &self,
    ) -> ForegroundResult<mpsc::UnboundedReceiver<SharedProcessInfo>> {
        self.subscribe_inner(true).await
    }

    async fn subscribe_inner(
        &self,
        replay_current: bool,
    ) -> ForegroundResult<mpsc::UnboundedReceiver<SharedProcessInfo>> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.request(|done| Command::Subscribe {
            sender,
            replay_current,
            done,
        })
        .await?;
        Ok(receiver)
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> ForegroundResult<T> {
        let (done, reply) = oneshot::channel();
        self.commands
            .send(command(done))
            .map_err(|_| ForegroundError::NotRunning)?;
        reply.await.map_err(|_| ForegroundError::ChannelClosed)
    }
}

impl std::fmt::Debug for TrackerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackerHandle")
            .field("current", &*self.current.read())
            .field("closed", &self.commands.is_closed())
            .finish_non_exhaustive()
    }
}

struct Running {
    handle: TrackerHandle,
    task: JoinHandle<()>,
}

/// Owns the tracker's lifecycle: the notification source and the dispatch
/// loop.
pub struct ForegroundTracker {
    config: TrackerConfig,
    windows: Arc<dyn WindowResolver>,
    processes: Arc<dyn ProcessTable>,
    source: Box<dyn EventSource>,
    running: Option<Running>,
}

impl ForegroundTracker {
    /// Creates a tracker backed by the native platform bindings.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform's window system is unavailable.
    pub fn new(config: TrackerConfig) -> ForegroundResult<Self> {
        let windows = crate::platform::NativeWindowResolver::new()?;
        let source = crate::platform::NativeEventSource::new(&config);
        Ok(Self::with_collaborators(
            config,
            Arc::new(windows),
            Arc::new(crate::SysinfoProcessTable::new()),
            Box::new(source),
        ))
    }

    #[must_use]
    pub fn with_collaborators(
        config: TrackerConfig,
        windows: Arc<dyn WindowResolver>,
        processes: Arc<dyn ProcessTable>,
        source: Box<dyn EventSource>,
    ) -> Self {
        Self {
            config,
            windows,
            processes,
            source,
            running: None,
        }
    }

    #[must_use]
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|running| !running.task.is_finished())
    }

    /// # Errors
    ///
    /// Returns [`ForegroundError::NotRunning`] before `start` or after `stop`.
    pub fn handle(&self) -> ForegroundResult<TrackerHandle> {
        self.running
            .as_ref()
            .map(|running| running.handle.clone())
            .ok_or(ForegroundError::NotRunning)
    }

    /// Spawns the dispatch loop, queues the bootstrap refresh and starts the
    /// notification source. Must be called inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the tracker is already running, no runtime is
    /// available, or the notification source fails to start.
    pub fn start(&mut self) -> ForegroundResult<TrackerHandle> {
        if self.running.is_some() {
            return Err(ForegroundError::AlreadyRunning);
        }

        let runtime = Handle::try_current().map_err(|e| {
            ForegroundError::platform_with_source(
                "foreground tracker must be started inside a tokio runtime",
                e,
            )
        })?;

        let (commands, receiver) = mpsc::unbounded_channel();
        let resolver = Resolver::new(
            Arc::clone(&self.windows),
            Arc::clone(&self.processes),
            &self.config,
            runtime.clone(),
            Poster::new(commands.clone()),
        );
        let current = Arc::new(RwLock::new(ProcessInfo::empty()));

        let core = TrackerCore {
            resolver: resolver.clone(),
            current: Arc::clone(&current),
            dispatch: Dispatch::default(),
        };
        let task = runtime.spawn(run_dispatch_loop(core, receiver));

        let _ = commands.send(Command::Refresh {
            allow_self: self.config.observe_self_on_start,
            done: None,
        });

        if let Err(e) = self.source.start(EventSink::new(commands.clone())) {
            warn!("failed to start notification source: {e}");
            let _ = commands.send(Command::Shutdown);
            return Err(e);
        }

        let handle = TrackerHandle {
            commands,
            current,
            resolver,
        };
        self.running = Some(Running {
            handle: handle.clone(),
            task,
        });
        info!("foreground tracker started");
        Ok(handle)
    }

    /// Stops the notification source and waits for the dispatch loop to
    /// drain.
    ///
    /// # Errors
    ///
    /// Returns an error if the tracker is not running or the loop panicked.
    pub async fn stop(&mut self) -> ForegroundResult<()> {
        let running = self.running.take().ok_or(ForegroundError::NotRunning)?;

        self.source.stop();
        let _ = running.handle.commands.send(Command::Shutdown);
        running
            .task
            .await
            .map_err(|e| ForegroundError::platform_with_source("dispatch loop panicked", e))?;

        info!("foreground tracker stopped");
        Ok(())
    }
}

impl Drop for ForegroundTracker {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            self.source.stop();
            let _ = running.handle.commands.send(Command::Shutdown);
        }
    }
}

impl std::fmt::Debug for ForegroundTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForegroundTracker")
            .field("config", &self.config)
            .field("running", &self.running.is_some())
            .finish_non_exhaustive()
    }
}
