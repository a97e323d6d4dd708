use crate::SharedProcessInfo;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::trace;

/// Callback invoked with every published snapshot, on the dispatch loop.
pub type Listener = Box<dyn FnMut(&SharedProcessInfo) + Send + 'static>;

/// Identifies a registered listener or channel subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

enum Subscriber {
    Callback(Listener),
    Channel(mpsc::UnboundedSender<SharedProcessInfo>),
}

/// Multicast fan-out of "foreground changed" notifications.
///
/// Subscribers are invoked synchronously in registration order. A panicking
/// callback is not caught.
#[derive(Default)]
pub(crate) struct Dispatch {
    subscribers: Vec<(ListenerId, Subscriber)>,
    next_id: u64,
}

impl Dispatch {
    pub(crate) fn add_listener(&mut self, listener: Listener) -> ListenerId {
        self.push(Subscriber::Callback(listener))
    }

    pub(crate) fn add_channel(
        &mut self,
        sender: mpsc::UnboundedSender<SharedProcessInfo>,
    ) -> ListenerId {
        self.push(Subscriber::Channel(sender))
    }

    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(existing, _)| *existing != id);
        self.subscribers.len() != before
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub(crate) fn publish(&mut self, info: &SharedProcessInfo) {
        trace!(
            pid = info.pid(),
            subscribers = self.subscribers.len(),
            "publishing foreground snapshot"
        );
        // Channel subscribers whose receiver is gone are dropped here.
        self.subscribers
            .retain_mut(|(_, subscriber)| match subscriber {
                Subscriber::Callback(listener) => {
                    listener(info);
                    true
                }
                Subscriber::Channel(sender) => sender.send(Arc::clone(info)).is_ok(),
            });
    }

    fn push(&mut self, subscriber: Subscriber) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, subscriber));
        id
    }
}
