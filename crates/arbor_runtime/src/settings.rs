//! Runtime Settings
//!
//! Plain configuration structs with sensible defaults. Override individual
//! fields with struct-update syntax:
//!
//! ```rust,ignore
//! use arbor_runtime::{FrameLoop, StageSettings};
//!
//! let settings = StageSettings {
//!     frameloop: FrameLoop::Demand,
//!     ..Default::default()
//! };
//! ```

// ---------------------------------------------------------------------------
// FrameLoop
// ---------------------------------------------------------------------------

/// When the stage hands frames to the render backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameLoop {
    /// Render after every tick.
    #[default]
    Always,
    /// Render only after something requested a redraw.
    Demand,
    /// Never render automatically; the host calls render itself.
    Never,
}

// ---------------------------------------------------------------------------
// LoopSettings
// ---------------------------------------------------------------------------

/// Render-loop timing configuration.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LoopSettings {
    /// Optional upper bound for a single frame's delta, in seconds.
    ///
    /// Off by default: callbacks see the real time since the previous tick.
    /// Hosts that stall (background tab, debugger) can opt in so that one
    /// huge delta is not fed to every callback.
    pub max_delta: Option<f32>,
}

// ---------------------------------------------------------------------------
// VisibilitySettings
// ---------------------------------------------------------------------------

/// Viewport-intersection configuration for visibility gates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibilitySettings {
    /// Margin added around the viewport, in viewport units. Positive values
    /// report content as visible slightly before it scrolls into view.
    pub margin: f32,
    /// Fraction of the observed area (0..=1) that must intersect the
    /// expanded viewport. Zero means "any overlap".
    pub threshold: f32,
}

impl Default for VisibilitySettings {
    fn default() -> Self {
        Self {
            margin: 50.0,
            threshold: 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// StageSettings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StageSettings {
    pub frameloop: FrameLoop,
    pub loop_settings: LoopSettings,
    pub visibility: VisibilitySettings,
}
