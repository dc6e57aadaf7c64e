//! Visibility Gate
//!
//! A [`VisibilityGate`] watches whether a boundary rectangle intersects the
//! viewport and exposes the answer as a reactive `Signal<bool>`. Bind it to
//! an [`UpdateHandle`] with [`VisibilityGate::gate`] and the callback is
//! paused while its content is off screen.
//!
//! Hosts without viewport information use [`VisibilityGate::headless`],
//! which always reports visible.

use arbor_core::{Signal, Subscription};
use glam::Vec2;

use crate::render_loop::UpdateHandle;
use crate::settings::VisibilitySettings;

/// Axis-aligned rectangle in viewport units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    #[must_use]
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    /// Rectangle from its top-left corner and size.
    #[must_use]
    pub fn from_origin_size(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self::new(Vec2::new(x, y), Vec2::new(x + width, y + height))
    }

    #[must_use]
    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    #[must_use]
    pub fn area(&self) -> f32 {
        let size = self.size();
        size.x * size.y
    }

    /// Grows every edge by `margin` (shrinks for negative values).
    #[must_use]
    pub fn expand(&self, margin: f32) -> Self {
        let margin = Vec2::splat(margin);
        let min = self.min - margin;
        Self {
            min,
            max: (self.max + margin).max(min),
        }
    }

    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Overlapping region with positive area, if any.
    #[must_use]
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let min = self.min.max(other.min);
        let max = self.max.min(other.max);
        (max.x > min.x && max.y > min.y).then_some(Rect { min, max })
    }
}

pub struct VisibilityGate {
    boundary: Option<Rect>,
    viewport: Option<Rect>,
    supported: bool,
    visible: Signal<bool>,
    settings: VisibilitySettings,
}

impl Default for VisibilityGate {
    fn default() -> Self {
        Self::new(VisibilitySettings::default())
    }
}

impl VisibilityGate {
    /// Gate for hosts that report viewport geometry.
    ///
    /// Reports visible until both a boundary and a viewport are known.
    #[must_use]
    pub fn new(settings: VisibilitySettings) -> Self {
        Self {
            boundary: None,
            viewport: None,
            supported: true,
            visible: Signal::with_value(true),
            settings,
        }
    }

    /// Gate for hosts without visibility observation. Always visible.
    #[must_use]
    pub fn headless() -> Self {
        Self {
            supported: false,
            ..Self::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn is_supported(&self) -> bool {
        self.supported
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &VisibilitySettings {
        &self.settings
    }

    /// Starts (or moves) observation of `boundary`.
    pub fn observe(&mut self, boundary: Rect) {
        if !self.supported {
            log::debug!("Visibility observation unsupported; content stays visible");
            return;
        }
        self.boundary = Some(boundary);
        self.recompute();
    }

    /// Stops observing. Content counts as visible again.
    pub fn unobserve(&mut self) {
        self.boundary = None;
        self.visible.set_if_changed(true);
    }

    /// Host report of the current viewport, e.g. after scroll or resize.
    pub fn set_viewport(&mut self, viewport: Rect) {
        self.viewport = Some(viewport);
        self.recompute();
    }

    fn recompute(&mut self) {
        let (Some(boundary), Some(viewport)) = (self.boundary, self.viewport) else {
            return;
        };
        let visible = self.intersects(&boundary, &viewport);
        if self.visible.set_if_changed(visible) {
            log::debug!("Visibility changed: {visible}");
        }
    }

    fn intersects(&self, boundary: &Rect, viewport: &Rect) -> bool {
        let expanded = viewport.expand(self.settings.margin);
        let area = boundary.area();
        if area <= 0.0 {
            return expanded.contains(boundary.min);
        }
        let Some(overlap) = boundary.intersection(&expanded) else {
            return false;
        };
        overlap.area() / area >= self.settings.threshold
    }

    /// Reactive visibility.
    #[must_use]
    pub fn is_visible(&self) -> Signal<bool> {
        self.visible.clone()
    }

    #[must_use]
    pub fn visible(&self) -> bool {
        self.visible.get().unwrap_or(true)
    }

    /// Pauses `handle` while hidden and resumes it when visible again.
    ///
    /// Applies the current state immediately. Dropping the returned
    /// subscription ends the binding without touching the handle.
    pub fn gate(&self, handle: &UpdateHandle) -> Subscription {
        if !self.visible() {
            handle.pause();
        }

        let handle = handle.clone();
        let visible = self.visible.downgrade();
        self.visible.subscribe(move || {
            let Some(visible) = visible.upgrade() else {
                return;
            };
            if visible.get().unwrap_or(true) {
                handle.resume();
            } else {
                handle.pause();
            }
        })
    }
}

impl std::fmt::Debug for VisibilityGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisibilityGate")
            .field("boundary", &self.boundary)
            .field("viewport", &self.viewport)
            .field("supported", &self.supported)
            .field("visible", &self.visible())
            .finish_non_exhaustive()
    }
}
