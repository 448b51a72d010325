use crossbeam_channel::Sender;

use crate::{error::Error, store::StoreEvent, util::Sequence};

/// An open push connection.  `close` returns only once the connection is shut
/// down and nothing more will be delivered from it.
pub trait Channel: Send {
    fn close(self: Box<Self>);
}

/// Opens push connections.  Implementations deliver
/// `StoreEvent::Changed { subscription, .. }` for every change message and a
/// final `StoreEvent::WatchClosed { subscription }` when the connection ends.
pub trait Watch {
    fn open(
        &self,
        subscription: u64,
        scope: Option<&str>,
        events: Sender<StoreEvent>,
    ) -> Result<Box<dyn Channel>, Error>;
}

struct Subscription {
    id: u64,
    scope: Option<String>,
    channel: Option<Box<dyn Channel>>,
}

/// Keeps at most one push connection open, scoped to the active setlist.
pub struct Subscriber {
    watch: Box<dyn Watch>,
    events: Sender<StoreEvent>,
    current: Option<Subscription>,
    sequence: Sequence<u64>,
}

impl Subscriber {
    pub fn new(watch: Box<dyn Watch>, events: Sender<StoreEvent>) -> Self {
        Self {
            watch,
            events,
            current: None,
            sequence: Sequence::default(),
        }
    }

    /// Watch `scope`.  Subscribing to the scope already watched does nothing,
    /// even if its connection has ended.  Otherwise the previous connection is
    /// closed before the new one is opened.  A connection that fails to open
    /// is logged and leaves the subscription idle.
    pub fn subscribe(&mut self, scope: Option<String>) {
        if matches!(&self.current, Some(current) if current.scope == scope) {
            return;
        }
        self.close();

        let id = self.sequence.advance();
        let channel = match self.watch.open(id, scope.as_deref(), self.events.clone()) {
            Ok(channel) => {
                log::info!("watching {:?}", scope);
                Some(channel)
            }
            Err(err) => {
                log::error!("failed to watch {:?}: {}", scope, err);
                None
            }
        };
        self.current = Some(Subscription { id, scope, channel });
    }

    pub fn close(&mut self) {
        if let Some(Subscription {
            channel: Some(channel),
            scope,
            ..
        }) = self.current.take()
        {
            log::info!("closing watch of {:?}", scope);
            channel.close();
        }
    }

    pub fn is_current(&self, subscription: u64) -> bool {
        matches!(&self.current, Some(current) if current.id == subscription)
    }

    /// Scope of the current subscription, if any was made.
    pub fn scope(&self) -> Option<Option<&str>> {
        self.current.as_ref().map(|current| current.scope.as_deref())
    }

    /// Whether the current subscription still has a live connection.
    pub fn is_connected(&self) -> bool {
        matches!(&self.current, Some(current) if current.channel.is_some())
    }

    /// The connection of `subscription` ended on its own.  Release it, but
    /// don't reconnect.
    pub fn closed(&mut self, subscription: u64) {
        match &mut self.current {
            Some(current) if current.id == subscription => {
                log::warn!("watch of {:?} ended", current.scope);
                if let Some(channel) = current.channel.take() {
                    channel.close();
                }
            }
            _ => {
                log::debug!("stale watch end received, ignoring");
            }
        }
    }
}

impl Drop for Subscriber {
    fn drop(&mut self) {
        self.close();
    }
}
