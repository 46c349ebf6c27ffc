//! Listener registry for delivered samples.
//!
//! Listeners are plain closures keyed by a generated id. `notify` calls them
//! in registration order on the caller's thread; a listener must not register
//! or unregister from inside its own callback.

use std::sync::{Mutex, MutexGuard};

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum PublisherError {
    #[error("listener {0} not found")]
    ListenerNotFound(Uuid),
}

type Listener<T> = Box<dyn Fn(T) + Send + Sync>;

pub struct Publisher<T> {
    listeners: Mutex<Vec<(Uuid, Listener<T>)>>,
}

impl<T: Clone> Default for Publisher<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Publisher<T> {
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
        }
    }

    fn listeners(&self) -> MutexGuard<'_, Vec<(Uuid, Listener<T>)>> {
        match self.listeners.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn register<F>(&self, listener: F) -> Uuid
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        let id = Uuid::new_v4();
        self.listeners().push((id, Box::new(listener)));
        id
    }

    pub fn unregister(&self, id: Uuid) -> Result<(), PublisherError> {
        let mut listeners = self.listeners();
        let pos = listeners
            .iter()
            .position(|(listener_id, _)| *listener_id == id)
            .ok_or(PublisherError::ListenerNotFound(id))?;
        listeners.remove(pos);
        Ok(())
    }

    pub fn notify(&self, value: T) {
        for (_, listener) in self.listeners().iter() {
            listener(value.clone());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.listeners().is_empty()
    }

    pub fn len(&self) -> usize {
        self.listeners().len()
    }
}
