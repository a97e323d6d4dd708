use crate::{ForegroundResult, OsEvent, tracker::Command};
use tokio::sync::mpsc;

/// Producer side of the tracker's command queue handed to notification
/// sources. Cheap to clone and usable from any thread.
#[derive(Debug, Clone)]
pub struct EventSink {
    commands: mpsc::UnboundedSender<Command>,
}

impl EventSink {
    pub(crate) fn new(commands: mpsc::UnboundedSender<Command>) -> Self {
        Self { commands }
    }

    /// Queues `event` for the dispatch loop. Returns `false` once the
    /// tracker has shut down.
    pub fn notify(&self, event: OsEvent) -> bool {
        self.commands.send(Command::Os(event)).is_ok()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

/// Delivers OS focus notifications to the tracker.
///
/// `start` is called once by [`ForegroundTracker::start`](crate::ForegroundTracker::start);
/// implementations usually spawn a thread that calls [`EventSink::notify`].
/// `stop` must be idempotent.
pub trait EventSource: Send + 'static {
    /// # Errors
    ///
    /// Returns an error if the platform notifications cannot be installed.
    fn start(&mut self, sink: EventSink) -> ForegroundResult<()>;

    fn stop(&mut self);
}
