//! # Arbor
//!
//! A reactive bridge between independently initializing producers and a
//! retained-mode scene graph.
//!
//! - [`SceneRegistry`]: identifier-keyed ownership of native nodes, with
//!   cascading disposal and a readiness gate
//! - [`RenderLoop`]: one per-frame tick with pausable, cancellable callbacks
//! - [`VisibilityGate`]: pauses callbacks of off-screen content
//! - [`ObjectAssembler`]: turns shape and appearance channels into exactly
//!   one registered node
//! - [`Stage`]: runs the above in frame order, rendering on demand
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use arbor::prelude::*;
//!
//! let mut stage = Stage::default();
//! stage.init_root(Camera::default(), Box::new(HeadlessBackend::default()));
//!
//! let sphere = ObjectAssembler::new("sphere-1", NodeKind::Mesh);
//! let shape = sphere.shape().producer();
//! let appearance = sphere.appearance().producer();
//! let key = stage.spawn(sphere);
//!
//! shape.set(Geometry::new("sphere"));
//! appearance.set(Material::standard(Vec3::new(0.8, 0.2, 0.2)));
//!
//! stage.on_frame(key, |frame| {
//!     let patch = ObjectPatch::new().rotation(Vec3::Y * frame.elapsed);
//!     frame.registry.update("sphere-1", &patch);
//! });
//!
//! loop {
//!     stage.frame();
//! }
//! ```

pub use arbor_core;
pub use arbor_runtime as runtime;
pub use arbor_scene as scene;

pub use arbor_core::{ArborError, ChannelProducer, Invalidator, ObjectId, ResourceChannel, Result, Signal, Subscription};
pub use arbor_runtime::{
    AssemblyState, FrameLoop, FrameState, LoopHandle, LoopSettings, ObjectAssembler, Rect, RenderLoop, Stage,
    StageSettings, UpdateHandle, VisibilityGate, VisibilitySettings,
};
pub use arbor_scene::{
    Camera, DisposalReport, Fog, Geometry, HeadlessBackend, Light, Material, NodeKind, Object3D, ObjectPatch,
    Registration, RenderBackend, RenderFrame, SceneRegistry, Texture, Transform,
};

pub mod prelude {
    //! Everything a typical host needs.

    pub use crate::{
        ArborError, AssemblyState, Camera, FrameLoop, FrameState, Geometry, HeadlessBackend, Light, Material,
        NodeKind, Object3D, ObjectAssembler, ObjectId, ObjectPatch, Registration, RenderBackend, RenderLoop,
        SceneRegistry, Stage, StageSettings, UpdateHandle, VisibilityGate,
    };
    pub use glam::{Affine3A, Quat, Vec3};
}
