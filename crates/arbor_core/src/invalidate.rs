//! Demand-based redraw requests.
//!
//! Every mutation that changes what is on screen calls
//! [`Invalidator::invalidate`]. The presentation layer either installs a
//! hook with [`Invalidator::on_invalidate`] or polls [`Invalidator::take`]
//! once per frame to decide whether a redraw is needed.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

type Hook = Rc<dyn Fn()>;

#[derive(Default)]
struct InvalidatorState {
    pending: Cell<bool>,
    requests: Cell<u64>,
    hooks: RefCell<Vec<Hook>>,
}

/// Shared "needs redraw" flag. Clones share the flag.
#[derive(Clone, Default)]
pub struct Invalidator {
    state: Rc<InvalidatorState>,
}

impl Invalidator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a redraw and runs the installed hooks.
    pub fn invalidate(&self) {
        self.state.pending.set(true);
        self.state.requests.set(self.state.requests.get().wrapping_add(1));

        let hooks: Vec<Hook> = self.state.hooks.borrow().iter().map(Rc::clone).collect();
        for hook in hooks {
            hook();
        }
    }

    /// Installs an external invalidation hook.
    pub fn on_invalidate(&self, hook: impl Fn() + 'static) {
        self.state.hooks.borrow_mut().push(Rc::new(hook));
    }

    /// Returns `true` if a redraw was requested since the last [`take`](Self::take).
    #[inline]
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.state.pending.get()
    }

    /// Consumes the pending request.
    pub fn take(&self) -> bool {
        self.state.pending.replace(false)
    }

    /// Total number of requests ever made.
    #[inline]
    #[must_use]
    pub fn request_count(&self) -> u64 {
        self.state.requests.get()
    }
}

impl fmt::Debug for Invalidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invalidator")
            .field("pending", &self.is_pending())
            .field("requests", &self.request_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_consumes_pending_request() {
        let invalidator = Invalidator::new();
        assert!(!invalidator.take());
        invalidator.invalidate();
        invalidator.invalidate();
        assert!(invalidator.take());
        assert!(!invalidator.take());
        assert_eq!(invalidator.request_count(), 2);
    }

    #[test]
    fn hooks_run_on_every_request() {
        let invalidator = Invalidator::new();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        invalidator.on_invalidate(move || counter.set(counter.get() + 1));

        let shared = invalidator.clone();
        shared.invalidate();
        assert_eq!(calls.get(), 1);
        assert!(invalidator.is_pending());
    }
}
