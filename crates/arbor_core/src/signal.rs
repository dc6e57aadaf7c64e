//! Reactive single-value cells.
//!
//! A [`Signal`] holds `Option<T>`: either empty or the latest value. It has
//! no history. Writers replace the value; dependents register with
//! [`Signal::subscribe`] and are re-run after every change, reading the
//! current value back through [`Signal::with`] or [`Signal::get`].
//!
//! Notifications are push-based and synchronous, on the writer's thread.
//! Observers are snapshotted before they run, so an observer may subscribe,
//! unsubscribe or write other signals while being notified. Writing the
//! *same* signal from inside a [`Signal::with`] closure is a borrow error
//! and must be avoided.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

type Observer = Rc<RefCell<dyn FnMut()>>;
type ObserverList = RefCell<Vec<(u64, Observer)>>;

struct SignalState<T> {
    value: RefCell<Option<T>>,
    version: Cell<u64>,
    observers: Rc<ObserverList>,
    next_observer: Cell<u64>,
}

/// Shared handle to a single-slot reactive cell.
///
/// Cloning the handle shares the slot.
pub struct Signal<T> {
    state: Rc<SignalState<T>>,
}

impl<T> Signal<T> {
    /// Creates an empty signal.
    #[must_use]
    pub fn new() -> Self {
        Self::from_option(None)
    }

    /// Creates a signal already holding `value`.
    #[must_use]
    pub fn with_value(value: T) -> Self {
        Self::from_option(Some(value))
    }

    fn from_option(value: Option<T>) -> Self {
        Self {
            state: Rc::new(SignalState {
                value: RefCell::new(value),
                version: Cell::new(0),
                observers: Rc::new(RefCell::new(Vec::new())),
                next_observer: Cell::new(0),
            }),
        }
    }

    /// Replaces the value and notifies observers.
    ///
    /// Returns the previous value so the writer can release it.
    pub fn set(&self, value: T) -> Option<T> {
        let previous = self.state.value.replace(Some(value));
        self.changed();
        previous
    }

    /// Empties the slot. Observers are only notified if a value was present.
    pub fn clear(&self) -> Option<T> {
        let previous = self.state.value.borrow_mut().take();
        if previous.is_some() {
            self.changed();
        }
        previous
    }

    /// Reads the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> R {
        f(self.state.value.borrow().as_ref())
    }

    /// Returns `true` while the slot holds a value.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.state.value.borrow().is_some()
    }

    /// Monotonic change counter, bumped on every write.
    #[inline]
    #[must_use]
    pub fn version(&self) -> u64 {
        self.state.version.get()
    }

    /// Registers a dependent that re-runs after every change.
    ///
    /// The returned [`Subscription`] unsubscribes when dropped.
    pub fn subscribe(&self, observer: impl FnMut() + 'static) -> Subscription {
        let id = self.state.next_observer.get();
        self.state.next_observer.set(id + 1);
        let observer: Observer = Rc::new(RefCell::new(observer));
        self.state.observers.borrow_mut().push((id, observer));
        Subscription {
            observers: Some(Rc::downgrade(&self.state.observers)),
            id,
        }
    }

    /// Number of live observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.state.observers.borrow().len()
    }

    /// Returns `true` if both handles share the same slot.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    /// Non-owning handle, for observers that need to read the signal they
    /// are subscribed to without keeping it alive.
    #[must_use]
    pub fn downgrade(&self) -> WeakSignal<T> {
        WeakSignal {
            state: Rc::downgrade(&self.state),
        }
    }

    fn changed(&self) {
        self.state.version.set(self.state.version.get().wrapping_add(1));

        let snapshot: Vec<Observer> = self
            .state
            .observers
            .borrow()
            .iter()
            .map(|(_, observer)| Rc::clone(observer))
            .collect();

        for observer in snapshot {
            match observer.try_borrow_mut() {
                Ok(mut run) => run(),
                Err(_) => log::warn!("Signal observer re-entered itself; nested notification skipped"),
            }
        }
    }
}

impl<T: Clone> Signal<T> {
    /// Returns a clone of the current value.
    #[must_use]
    pub fn get(&self) -> Option<T> {
        self.state.value.borrow().clone()
    }
}

impl<T: PartialEq> Signal<T> {
    /// Writes `value` only if it differs from the current one.
    ///
    /// Returns `true` if observers were notified.
    pub fn set_if_changed(&self, value: T) -> bool {
        if self.state.value.borrow().as_ref() == Some(&value) {
            return false;
        }
        self.set(value);
        true
    }
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("value", &self.state.value.borrow())
            .field("version", &self.version())
            .finish_non_exhaustive()
    }
}

/// Weak counterpart of [`Signal`].
pub struct WeakSignal<T> {
    state: Weak<SignalState<T>>,
}

impl<T> WeakSignal<T> {
    #[must_use]
    pub fn upgrade(&self) -> Option<Signal<T>> {
        self.state.upgrade().map(|state| Signal { state })
    }
}

impl<T> Clone for WeakSignal<T> {
    fn clone(&self) -> Self {
        Self {
            state: Weak::clone(&self.state),
        }
    }
}

/// Keeps an observer registered; unsubscribes on drop.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    observers: Option<Weak<ObserverList>>,
    id: u64,
}

impl Subscription {
    /// Unsubscribes now. Safe to call after the signal is gone.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    /// Keeps the observer registered for the lifetime of the signal.
    pub fn forget(mut self) {
        self.observers = None;
    }

    fn release(&mut self) {
        let Some(observers) = self.observers.take().and_then(|weak| weak.upgrade()) else {
            return;
        };
        observers.borrow_mut().retain(|(id, _)| *id != self.id);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
