use std::sync::{PoisonError, RwLock};
use tokio::sync::watch;

type Listener<S> = Box<dyn Fn(&S) + Send + Sync>;

/// Observable state cell shared by the stores.
///
/// Commits are synchronous: `update` applies the mutation, then hands the new
/// state to every registered listener before returning. Commits from
/// different threads are serialized, so listeners observe states in commit
/// order and the last one they see is the current state. UI layers that
/// prefer to await changes can `subscribe` instead.
pub struct StateCell<S> {
    sender: watch::Sender<S>,
    listeners: RwLock<Vec<Listener<S>>>,
}

impl<S: Clone + Send + Sync + 'static> StateCell<S> {
    pub fn new(initial: S) -> Self {
        let (sender, _) = watch::channel(initial);
        Self {
            sender,
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn get(&self) -> S {
        self.sender.borrow().clone()
    }

    pub fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.sender.borrow())
    }

    pub fn update(&self, f: impl FnOnce(&mut S)) {
        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        // Listeners run under the channel's write lock
        self.sender.send_modify(|state| {
            f(state);
            for listener in listeners.iter() {
                listener(state);
            }
        });
    }

    pub fn subscribe(&self) -> watch::Receiver<S> {
        self.sender.subscribe()
    }

    /// Registers a listener called after every commit. It runs while the
    /// commit holds the state, so it must not read or update this cell.
    pub fn on_change(&self, listener: impl Fn(&S) + Send + Sync + 'static) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(listener));
    }
}
