//! Observable controller state.

use std::sync::{Mutex, MutexGuard, PoisonError};

use shared::{error::ApiError, protocol::Envelope};
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
    Success,
    Error,
}

/// Loading/data/error triple tracked by the request-driven controllers.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestState<T> {
    pub loading: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T> Default for RequestState<T> {
    fn default() -> Self {
        Self {
            loading: false,
            data: None,
            error: None,
        }
    }
}

impl<T> RequestState<T> {
    pub fn phase(&self) -> Phase {
        if self.loading {
            Phase::Loading
        } else if self.error.is_some() {
            Phase::Error
        } else if self.data.is_some() {
            Phase::Success
        } else {
            Phase::Idle
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(|err| err.message.as_str())
    }

    pub(crate) fn begin(&mut self) {
        self.loading = true;
        self.error = None;
    }

    pub(crate) fn resolve(&mut self, envelope: Envelope<T>) {
        self.loading = false;
        match envelope {
            Envelope::Data(data) => {
                self.data = Some(data);
                self.error = None;
            }
            Envelope::Error(err) => {
                self.data = None;
                self.error = Some(err);
            }
        }
    }
}

struct Slot<S> {
    state: S,
    live: bool,
}

/// Holds one controller's state and publishes every change to subscribers.
///
/// After [`release`](Self::release) the state is frozen: updates are dropped
/// and nothing more is published.
pub struct StateCell<S> {
    slot: Mutex<Slot<S>>,
    events: broadcast::Sender<S>,
}

impl<S: Clone> StateCell<S> {
    pub fn new(initial: S) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            slot: Mutex::new(Slot {
                state: initial,
                live: true,
            }),
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot<S>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> S {
        self.lock().state.clone()
    }

    /// New observer; dropping the receiver unsubscribes it.
    pub fn subscribe(&self) -> broadcast::Receiver<S> {
        self.events.subscribe()
    }

    pub fn observer_count(&self) -> usize {
        self.events.receiver_count()
    }

    /// Applies `change` and notifies observers. Returns `None` once released.
    pub fn update<R>(&self, change: impl FnOnce(&mut S) -> R) -> Option<R> {
        let mut slot = self.lock();
        if !slot.live {
            return None;
        }
        let outcome = change(&mut slot.state);
        let _ = self.events.send(slot.state.clone());
        Some(outcome)
    }

    pub fn release(&self) {
        self.lock().live = false;
    }

    pub fn is_live(&self) -> bool {
        self.lock().live
    }
}
