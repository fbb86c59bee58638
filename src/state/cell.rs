use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::converted::ConvertedState;
use super::subscription::Subscription;

static NEXT_CELL_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(u64);

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cell#{}", self.0)
    }
}

/// Anything whose changes can be observed by version.
///
/// Effect triggers only need to know *whether* a cell moved since the last
/// pass, so they hold one of these instead of the typed cell.
pub trait Observable: Send + Sync {
    fn cell_id(&self) -> CellId;
    fn version(&self) -> u64;
}

/// Sends the owner tag of a view into the tree's dirty channel.
#[derive(Clone)]
pub(crate) struct ChangeNotifier {
    owner: u64,
    tx: mpsc::UnboundedSender<u64>,
}

impl ChangeNotifier {
    pub(crate) fn new(owner: u64, tx: mpsc::UnboundedSender<u64>) -> Self {
        Self { owner, tx }
    }

    fn notify(&self) -> bool {
        self.tx.send(self.owner).is_ok()
    }
}

/// A mutable, observable value with atomic update semantics.
///
/// Cloning the handle does not clone the value: all clones address the same
/// cell. Only the view context that created the cell disposes it.
pub struct State<T> {
    inner: Arc<CellInner<T>>,
}

struct CellInner<T> {
    id: CellId,
    initial: T,
    core: Mutex<CellCore<T>>,
}

struct CellCore<T> {
    value: T,
    version: u64,
    subscribers: Vec<mpsc::UnboundedSender<T>>,
    notifiers: Vec<ChangeNotifier>,
    disposed: bool,
}

impl<T> Clone for State<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for State<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.inner.core.lock();
        f.debug_struct("State")
            .field("id", &self.inner.id)
            .field("value", &core.value)
            .field("version", &core.version)
            .field("disposed", &core.disposed)
            .finish()
    }
}

impl<T> State<T>
where
    T: Clone + PartialEq + Send + 'static,
{
    pub fn new(initial: T) -> Self {
        let id = CellId(NEXT_CELL_ID.fetch_add(1, Ordering::Relaxed));
        Self {
            inner: Arc::new(CellInner {
                id,
                initial: initial.clone(),
                core: Mutex::new(CellCore {
                    value: initial,
                    version: 0,
                    subscribers: Vec::new(),
                    notifiers: Vec::new(),
                    disposed: false,
                }),
            }),
        }
    }

    pub fn id(&self) -> CellId {
        self.inner.id
    }

    /// Current value.
    pub fn value(&self) -> T {
        self.inner.core.lock().value.clone()
    }

    /// Number of changes committed so far.
    pub fn version(&self) -> u64 {
        self.inner.core.lock().version
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.core.lock().disposed
    }

    /// Replace the value. Returns `true` when the value changed and was
    /// published.
    pub fn set(&self, value: T) -> bool {
        let mut core = self.inner.core.lock();
        self.commit(&mut core, value)
    }

    /// Replace the value with `updater(current)`.
    ///
    /// The read and the write happen under the same lock, so concurrent
    /// updaters never lose each other's changes.
    pub fn update<F>(&self, updater: F) -> bool
    where
        F: FnOnce(&T) -> T,
    {
        let mut core = self.inner.core.lock();
        let next = updater(&core.value);
        self.commit(&mut core, next)
    }

    /// Store `value` only if the cell still holds `expected`.
    ///
    /// On mismatch the current value is returned and nothing is published.
    pub fn compare_and_set(&self, expected: &T, value: T) -> Result<(), T> {
        let mut core = self.inner.core.lock();
        if core.value != *expected {
            return Err(core.value.clone());
        }
        self.commit(&mut core, value);
        Ok(())
    }

    /// Restore the value the cell was created with.
    pub fn reset(&self) -> bool {
        self.set(self.inner.initial.clone())
    }

    /// Subscribe to changes. The current value is queued immediately.
    pub fn subscribe(&self) -> Subscription<T> {
        Subscription::new(self.subscribe_raw())
    }

    pub(crate) fn subscribe_raw(&self) -> mpsc::UnboundedReceiver<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut core = self.inner.core.lock();
        if !core.disposed && tx.send(core.value.clone()).is_ok() {
            core.subscribers.push(tx);
        }
        rx
    }

    /// A view of this cell through a pair of mapping functions.
    ///
    /// The mappings run while the source lock is held and must not touch
    /// the source cell themselves.
    pub fn convert<U, F, B>(&self, forward: F, backward: B) -> ConvertedState<T, U>
    where
        U: Clone + PartialEq + Send + 'static,
        F: Fn(&T) -> U + Send + Sync + 'static,
        B: Fn(U) -> T + Send + Sync + 'static,
    {
        ConvertedState::new(self.clone(), Arc::new(forward), Arc::new(backward))
    }

    pub(crate) fn add_notifier(&self, notifier: ChangeNotifier) {
        let mut core = self.inner.core.lock();
        if !core.disposed {
            core.notifiers.push(notifier);
        }
    }

    /// Close every subscription and ignore later writes.
    pub(crate) fn dispose(&self) {
        let mut core = self.inner.core.lock();
        if core.disposed {
            return;
        }
        core.disposed = true;
        core.subscribers.clear();
        core.notifiers.clear();
        tracing::trace!(cell = %self.inner.id, "state disposed");
    }

    fn commit(&self, core: &mut CellCore<T>, next: T) -> bool {
        if core.disposed {
            tracing::trace!(cell = %self.inner.id, "write after dispose ignored");
            return false;
        }
        if core.value == next {
            return false;
        }
        core.value = next;
        core.version += 1;

        let value = &core.value;
        core.subscribers.retain(|tx| tx.send(value.clone()).is_ok());
        core.notifiers.retain(ChangeNotifier::notify);

        tracing::trace!(cell = %self.inner.id, version = core.version, "state committed");
        true
    }
}

impl<T> Observable for State<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn cell_id(&self) -> CellId {
        self.id()
    }

    fn version(&self) -> u64 {
        State::version(self)
    }
}
