use std::sync::Arc;

use super::cell::{CellId, Observable, State};
use super::subscription::Subscription;

/// A cell seen through forward/backward mappings.
///
/// Holds no storage of its own: every read maps the source value forward,
/// every write maps back and goes through the source cell's atomic surface.
pub struct ConvertedState<S, T> {
    source: State<S>,
    forward: Arc<dyn Fn(&S) -> T + Send + Sync>,
    backward: Arc<dyn Fn(T) -> S + Send + Sync>,
}

impl<S, T> Clone for ConvertedState<S, T> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            forward: self.forward.clone(),
            backward: self.backward.clone(),
        }
    }
}

impl<S, T> ConvertedState<S, T>
where
    S: Clone + PartialEq + Send + 'static,
    T: Clone + PartialEq + Send + 'static,
{
    pub(crate) fn new(
        source: State<S>,
        forward: Arc<dyn Fn(&S) -> T + Send + Sync>,
        backward: Arc<dyn Fn(T) -> S + Send + Sync>,
    ) -> Self {
        Self {
            source,
            forward,
            backward,
        }
    }

    pub fn source(&self) -> &State<S> {
        &self.source
    }

    pub fn value(&self) -> T {
        (self.forward)(&self.source.value())
    }

    pub fn set(&self, value: T) -> bool {
        self.source.set((self.backward)(value))
    }

    pub fn update<F>(&self, updater: F) -> bool
    where
        F: FnOnce(&T) -> T,
    {
        let forward = &self.forward;
        let backward = &self.backward;
        self.source
            .update(|current| backward(updater(&forward(current))))
    }

    pub fn reset(&self) -> bool {
        self.source.reset()
    }

    /// Subscribe to mapped changes of the source cell.
    pub fn subscribe(&self) -> Subscription<T> {
        Subscription::mapped(self.source.subscribe_raw(), self.forward.clone())
    }
}

impl<S, T> Observable for ConvertedState<S, T>
where
    S: Clone + PartialEq + Send + Sync + 'static,
    T: Clone + PartialEq + Send + 'static,
{
    fn cell_id(&self) -> CellId {
        self.source.id()
    }

    fn version(&self) -> u64 {
        self.source.version()
    }
}
