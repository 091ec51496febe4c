//! Dispatch bus.
//!
//! A [`Dispatcher`] is a cloneable handle that enqueues [`ViewAction`]s for
//! the [`crate::Runtime`]. Delivery is FIFO across all handles. There is no
//! delivery confirmation beyond knowing the runtime is still alive.

use tokio::sync::mpsc;

use crate::{action::ViewAction, error::RuntimeError};

/// Receiving end of the bus, owned by the runtime.
pub type Inbox = mpsc::UnboundedReceiver<ViewAction>;

/// Handle for dispatching actions onto the bus.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    sender: mpsc::UnboundedSender<ViewAction>,
}

impl Dispatcher {
    /// Create a bus, returning the dispatch handle and its inbox.
    pub fn channel() -> (Self, Inbox) {
        let (sender, inbox) = mpsc::unbounded_channel();
        (Self { sender }, inbox)
    }

    /// Enqueue `action` behind everything already dispatched.
    pub fn dispatch(&self, action: ViewAction) -> Result<(), RuntimeError> {
        self.sender.send(action).map_err(|_| RuntimeError::BusClosed)
    }

    /// Whether the runtime has shut down.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Non-owning handle used by the runtime for its own re-dispatches, so
    /// the bus closes once every external handle is dropped.
    pub(crate) fn downgrade(&self) -> WeakDispatcher {
        WeakDispatcher { sender: self.sender.downgrade() }
    }
}

/// Non-owning bus handle.
#[derive(Debug, Clone)]
pub(crate) struct WeakDispatcher {
    sender: mpsc::WeakUnboundedSender<ViewAction>,
}

impl WeakDispatcher {
    pub(crate) fn dispatch(&self, action: ViewAction) -> Result<(), RuntimeError> {
        let sender = self.sender.upgrade().ok_or(RuntimeError::BusClosed)?;
        sender.send(action).map_err(|_| RuntimeError::BusClosed)
    }
}
