//! Arbor Runtime
//!
//! The frame-driven half of Arbor:
//!
//! - [`render_loop`]: the [`RenderLoop`] scheduler and its [`UpdateHandle`]s
//! - [`visibility`]: the [`VisibilityGate`] that pauses off-screen work
//! - [`assembler`]: the [`ObjectAssembler`] shape/appearance protocol
//! - [`stage`]: the per-scene [`Stage`] coordinator
//! - [`settings`]: runtime configuration

pub mod assembler;
pub mod clock;
pub mod render_loop;
pub mod settings;
pub mod stage;
pub mod visibility;

pub use assembler::{AssemblyState, ObjectAssembler};
pub use clock::FrameClock;
pub use render_loop::{FrameState, LoopHandle, RenderLoop, UpdateFn, UpdateHandle};
pub use settings::{FrameLoop, LoopSettings, StageSettings, VisibilitySettings};
pub use stage::{AssemblerKey, FrameOutcome, Stage};
pub use visibility::{Rect, VisibilityGate};
