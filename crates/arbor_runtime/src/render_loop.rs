//! Render-Loop Scheduler
//!
//! [`RenderLoop`] owns the per-frame update callbacks of one scene. The host
//! drives it with exactly one [`tick`](RenderLoop::tick) per frame; every
//! registered, non-paused callback then runs once, synchronously, in
//! registration order.
//!
//! # Cancellation
//!
//! [`RenderLoop::register`] returns an [`UpdateHandle`]. Unregistering through
//! it is idempotent and safe from inside the callback being unregistered:
//! each tick iterates a snapshot of the registration set, and each entry is
//! re-checked right before it runs.
//!
//! # Isolation
//!
//! A panicking callback is caught, logged, and skipped; the callbacks after
//! it still run and the loop stays tickable.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut render_loop = RenderLoop::default();
//! let spin = render_loop.register(|frame| {
//!     frame.registry.update("cube", &ObjectPatch::new().rotation(Vec3::Y * frame.elapsed));
//! });
//!
//! render_loop.tick(now, &mut registry);
//! spin.unregister();
//! ```

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::hash::Hash;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::{Rc, Weak};
use std::time::Duration;

use arbor_core::{ArborError, ObjectId, Result};
use arbor_scene::SceneRegistry;
use rustc_hash::FxHashMap;

use crate::settings::LoopSettings;

/// Boxed per-frame callback.
pub type UpdateFn = Box<dyn FnMut(&mut FrameState<'_>)>;

/// Per-frame context handed to every update callback.
pub struct FrameState<'a> {
    /// Seconds since the previous tick, zero on the first tick. Clamped only
    /// when [`LoopSettings::max_delta`] is set.
    pub delta: f32,
    /// Seconds since the first tick.
    pub elapsed: f32,
    /// Index of the current tick, starting at zero.
    pub frame: u64,
    /// The scene the callback may mutate. Mutations through the registry
    /// request a redraw on their own.
    pub registry: &'a mut SceneRegistry,
    handle: UpdateHandle,
}

impl FrameState<'_> {
    /// Handle of the running callback; unregistering through it is allowed.
    #[inline]
    #[must_use]
    pub fn handle(&self) -> &UpdateHandle {
        &self.handle
    }

    /// Requests a redraw for mutations made outside the registry API.
    pub fn invalidate(&self) {
        self.registry.invalidator().invalidate();
    }
}

struct Slot {
    callback: Rc<RefCell<UpdateFn>>,
    paused: bool,
    key: Option<ObjectId>,
}

#[derive(Default)]
struct LoopSlots {
    slots: BTreeMap<u64, Slot>,
    keyed: FxHashMap<ObjectId, u64>,
    next_seq: u64,
}

impl LoopSlots {
    fn insert(&mut self, callback: UpdateFn, key: Option<ObjectId>) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        if let Some(key) = &key {
            self.keyed.insert(key.clone(), seq);
        }
        self.slots.insert(
            seq,
            Slot {
                callback: Rc::new(RefCell::new(callback)),
                paused: false,
                key,
            },
        );
        seq
    }

    fn remove(&mut self, seq: u64) -> Option<Slot> {
        let slot = self.slots.remove(&seq)?;
        if let Some(key) = &slot.key {
            self.keyed.remove(key);
        }
        Some(slot)
    }

    fn set_paused(&mut self, seq: u64, paused: bool) -> bool {
        match self.slots.get_mut(&seq) {
            Some(slot) => {
                slot.paused = paused;
                true
            }
            None => false,
        }
    }

    fn is_runnable(&self, seq: u64) -> bool {
        self.slots.get(&seq).is_some_and(|slot| !slot.paused)
    }
}

type SharedSlots = Rc<RefCell<LoopSlots>>;

fn register_in(slots: &SharedSlots, callback: UpdateFn, key: Option<ObjectId>) -> UpdateHandle {
    let seq = slots.borrow_mut().insert(callback, key);
    UpdateHandle {
        slots: Rc::downgrade(slots),
        seq,
    }
}

fn register_keyed_in(slots: &SharedSlots, id: ObjectId, callback: UpdateFn) -> Result<UpdateHandle> {
    if slots.borrow().keyed.contains_key(&id) {
        log::error!("Update callback '{id}' is already registered");
        return Err(ArborError::DuplicateCallback(id));
    }
    Ok(register_in(slots, callback, Some(id)))
}

fn set_paused_by_id<Q>(slots: &SharedSlots, id: &Q, paused: bool) -> bool
where
    ObjectId: std::borrow::Borrow<Q>,
    Q: Hash + Eq + ?Sized,
{
    let mut slots = slots.borrow_mut();
    let Some(&seq) = slots.keyed.get(id) else {
        return false;
    };
    slots.set_paused(seq, paused)
}

/// Capability to cancel, pause and resume one registration.
///
/// Cheap to clone. Does not keep the loop alive; every operation on a
/// handle whose loop is gone is a no-op.
#[derive(Clone)]
pub struct UpdateHandle {
    slots: Weak<RefCell<LoopSlots>>,
    seq: u64,
}

impl UpdateHandle {
    /// Removes the registration. Returns `true` only for the call that
    /// actually removed it.
    pub fn unregister(&self) -> bool {
        let Some(slots) = self.slots.upgrade() else {
            return false;
        };
        let removed = slots.borrow_mut().remove(self.seq);
        // Dropped outside the borrow: the callback's captures may call back in.
        let found = removed.is_some();
        drop(removed);
        found
    }

    pub fn pause(&self) -> bool {
        self.set_paused(true)
    }

    pub fn resume(&self) -> bool {
        self.set_paused(false)
    }

    fn set_paused(&self, paused: bool) -> bool {
        self.slots
            .upgrade()
            .is_some_and(|slots| slots.borrow_mut().set_paused(self.seq, paused))
    }

    #[must_use]
    pub fn is_registered(&self) -> bool {
        self.slots
            .upgrade()
            .is_some_and(|slots| slots.borrow().slots.contains_key(&self.seq))
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.slots
            .upgrade()
            .and_then(|slots| slots.borrow().slots.get(&self.seq).map(|slot| slot.paused))
            .unwrap_or(false)
    }
}

impl std::fmt::Debug for UpdateHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateHandle").field("seq", &self.seq).finish()
    }
}

/// Weak handle to a [`RenderLoop`], for registering from inside callbacks.
///
/// Registrations made during a tick first run on the next tick.
#[derive(Clone)]
pub struct LoopHandle {
    slots: Weak<RefCell<LoopSlots>>,
}

impl LoopHandle {
    /// Registers `callback`. Returns `None` if the loop is gone.
    pub fn register(&self, callback: impl FnMut(&mut FrameState<'_>) + 'static) -> Option<UpdateHandle> {
        let slots = self.slots.upgrade()?;
        Some(register_in(&slots, Box::new(callback), None))
    }

    /// Registers `callback` under `id`. Returns `Ok(None)` if the loop is gone.
    pub fn register_keyed(
        &self,
        id: impl Into<ObjectId>,
        callback: impl FnMut(&mut FrameState<'_>) + 'static,
    ) -> Result<Option<UpdateHandle>> {
        let Some(slots) = self.slots.upgrade() else {
            return Ok(None);
        };
        register_keyed_in(&slots, id.into(), Box::new(callback)).map(Some)
    }

    pub fn pause<Q>(&self, id: &Q) -> bool
    where
        ObjectId: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.slots
            .upgrade()
            .is_some_and(|slots| set_paused_by_id(&slots, id, true))
    }

    pub fn resume<Q>(&self, id: &Q) -> bool
    where
        ObjectId: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.slots
            .upgrade()
            .is_some_and(|slots| set_paused_by_id(&slots, id, false))
    }
}

/// The per-scene frame scheduler.
pub struct RenderLoop {
    slots: SharedSlots,
    settings: LoopSettings,

    start: Option<Duration>,
    last: Option<Duration>,
    frame_count: u64,
    elapsed: f32,
}

impl Default for RenderLoop {
    fn default() -> Self {
        Self::new(LoopSettings::default())
    }
}

impl RenderLoop {
    #[must_use]
    pub fn new(settings: LoopSettings) -> Self {
        Self {
            slots: Rc::default(),
            settings,
            start: None,
            last: None,
            frame_count: 0,
            elapsed: 0.0,
        }
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &LoopSettings {
        &self.settings
    }

    #[must_use]
    pub fn handle(&self) -> LoopHandle {
        LoopHandle {
            slots: Rc::downgrade(&self.slots),
        }
    }

    /// Adds `callback` to the per-frame set.
    pub fn register(&mut self, callback: impl FnMut(&mut FrameState<'_>) + 'static) -> UpdateHandle {
        register_in(&self.slots, Box::new(callback), None)
    }

    /// Adds `callback` under a stable id so it can be paused by id.
    ///
    /// # Errors
    ///
    /// [`ArborError::DuplicateCallback`] if `id` already has a live
    /// registration; the existing one is kept.
    pub fn register_keyed(
        &mut self,
        id: impl Into<ObjectId>,
        callback: impl FnMut(&mut FrameState<'_>) + 'static,
    ) -> Result<UpdateHandle> {
        register_keyed_in(&self.slots, id.into(), Box::new(callback))
    }

    /// Pauses the callback registered under `id`. Returns `false` if unknown.
    pub fn pause<Q>(&mut self, id: &Q) -> bool
    where
        ObjectId: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        set_paused_by_id(&self.slots, id, true)
    }

    pub fn resume<Q>(&mut self, id: &Q) -> bool
    where
        ObjectId: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        set_paused_by_id(&self.slots, id, false)
    }

    /// Number of live registrations, paused ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.borrow().slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.slots.borrow().slots.values().filter(|slot| !slot.paused).count()
    }

    #[inline]
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Seconds between the first and the latest tick.
    #[inline]
    #[must_use]
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Runs one frame at host timestamp `now`.
    ///
    /// Returns the number of callbacks invoked.
    pub fn tick(&mut self, now: Duration, registry: &mut SceneRegistry) -> usize {
        let start = *self.start.get_or_insert(now);
        let raw_delta = self.last.map_or(0.0, |last| now.saturating_sub(last).as_secs_f32());
        let delta = match self.settings.max_delta {
            Some(max) if raw_delta > max => {
                log::debug!("Frame delta {raw_delta:.3}s clamped to {max:.3}s");
                max
            }
            _ => raw_delta,
        };
        self.last = Some(now);
        self.elapsed = now.saturating_sub(start).as_secs_f32();

        let snapshot: Vec<(u64, Rc<RefCell<UpdateFn>>)> = self
            .slots
            .borrow()
            .slots
            .iter()
            .filter(|(_, slot)| !slot.paused)
            .map(|(&seq, slot)| (seq, Rc::clone(&slot.callback)))
            .collect();

        let mut invoked = 0;
        for (seq, callback) in snapshot {
            // Unregistered or paused by an earlier callback this frame.
            if !self.slots.borrow().is_runnable(seq) {
                continue;
            }
            let Ok(mut callback) = callback.try_borrow_mut() else {
                log::warn!("Update callback #{seq} is already running; skipped");
                continue;
            };

            let mut state = FrameState {
                delta,
                elapsed: self.elapsed,
                frame: self.frame_count,
                registry: &mut *registry,
                handle: UpdateHandle {
                    slots: Rc::downgrade(&self.slots),
                    seq,
                },
            };

            let outcome = catch_unwind(AssertUnwindSafe(|| (*callback)(&mut state)));
            invoked += 1;
            if let Err(payload) = outcome {
                log::error!("Update callback #{seq} panicked: {}", panic_message(payload.as_ref()));
            }
        }

        self.frame_count += 1;
        invoked
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

impl std::fmt::Debug for RenderLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderLoop")
            .field("callbacks", &self.len())
            .field("frame_count", &self.frame_count)
            .field("elapsed", &self.elapsed)
            .finish_non_exhaustive()
    }
}
