//! Ordered subscriber fan-out.

use std::sync::{Arc, Mutex};

use anyhow::Result;

use super::lock;

type Callback<T> = Arc<dyn Fn(&T) -> Result<()> + Send + Sync>;

/// Insertion-ordered list of subscriber callbacks.
///
/// Cloning yields another handle to the same list.
pub struct Channel<T> {
    subscribers: Arc<Mutex<Vec<Callback<T>>>>,
}

impl<T> Channel<T> {
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Attach a callback and return the number of subscribers afterwards.
    pub fn attach<F>(&self, callback: F) -> usize
    where
        F: Fn(&T) -> Result<()> + Send + Sync + 'static,
    {
        let mut subscribers = lock(&self.subscribers);
        subscribers.push(Arc::new(callback));
        subscribers.len()
    }

    /// Invoke every attached callback with `value`, in attach order.
    ///
    /// The list is snapshotted first, so a callback may attach further
    /// callbacks (they only see later publishes).
    pub fn publish(&self, value: &T) -> Result<()> {
        let snapshot: Vec<Callback<T>> = lock(&self.subscribers).clone();
        for callback in snapshot {
            callback(value)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        lock(&self.subscribers).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            subscribers: Arc::clone(&self.subscribers),
        }
    }
}

impl<T> Default for Channel<T> {
    fn default() -> Self {
        Self::new()
    }
}
