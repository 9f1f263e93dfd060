//! In-process fan-out for session and connection events
//!
//! The connect bridge and the session context publish here; the server log
//! and the tests listen. Publishing never blocks and never fails.

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{debug, trace, warn};

use crate::DomainEvent;

const CAPACITY: usize = 256;

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CAPACITY);
        Self { tx }
    }

    /// Publishing handle for producers
    pub fn sender(&self) -> EventSender {
        EventSender {
            tx: self.tx.clone(),
        }
    }

    /// Listener that sees events published from now on
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            rx: self.tx.subscribe(),
            missed: 0,
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub struct EventSender {
    tx: broadcast::Sender<DomainEvent>,
}

impl EventSender {
    /// Publish an event, returning how many listeners got it
    pub fn emit(&self, event: DomainEvent) -> usize {
        let kind = event.type_name();
        let platform = event.platform();
        let delivered = self.tx.send(event).unwrap_or(0);
        if delivered == 0 {
            trace!(kind, ?platform, "[Events] Nobody listening");
        } else {
            debug!(kind, ?platform, listeners = delivered, "[Events] Published");
        }
        delivered
    }
}

pub struct EventReceiver {
    rx: broadcast::Receiver<DomainEvent>,
    missed: u64,
}

impl EventReceiver {
    /// Next event, or `None` once every sender is gone
    ///
    /// A listener that falls behind skips ahead; the gap is counted in
    /// [`EventReceiver::missed`].
    pub async fn recv(&mut self) -> Option<DomainEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(n)) => {
                    self.missed += n;
                    warn!(skipped = n, "[Events] Listener fell behind");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    pub fn try_recv(&mut self) -> Option<DomainEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(n)) => self.missed += n,
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    /// Everything already queued for this listener
    pub fn drain(&mut self) -> Vec<DomainEvent> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    pub fn missed(&self) -> u64 {
        self.missed
    }
}
