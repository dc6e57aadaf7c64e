//! Dirty tracking for scene resources.
//!
//! Geometries, materials and instance buffers each carry a [`ChangeTracker`].
//! A backend remembers the version it last uploaded and re-uploads once
//! [`ChangeTracker::is_newer_than`] reports a change. "Marking a material
//! dirty" is nothing more than bumping its tracker.

/// Monotonic change counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeTracker {
    version: u64,
}

impl ChangeTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one modification.
    #[inline]
    pub fn changed(&mut self) {
        self.version = self.version.wrapping_add(1);
    }

    #[inline]
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Returns `true` if the tracker moved past `seen`.
    #[inline]
    #[must_use]
    pub fn is_newer_than(&self, seen: u64) -> bool {
        self.version != seen
    }

    /// Wraps `data` so that any mutable access through the guard counts as
    /// one modification.
    pub fn guard<'a, T>(&'a mut self, data: &'a mut T) -> MutGuard<'a, T> {
        MutGuard { data, tracker: self }
    }
}

/// Write access that bumps its tracker once, when released.
pub struct MutGuard<'a, T> {
    data: &'a mut T,
    tracker: &'a mut ChangeTracker,
}

impl<'a, T> MutGuard<'a, T> {
    pub fn new(data: &'a mut T, tracker: &'a mut ChangeTracker) -> Self {
        Self { data, tracker }
    }
}

impl<T> std::ops::Deref for MutGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.data
    }
}

impl<T> std::ops::DerefMut for MutGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.data
    }
}

impl<T> Drop for MutGuard<'_, T> {
    fn drop(&mut self) {
        self.tracker.changed();
    }
}
