//! Stage
//!
//! [`Stage`] is the per-scene coordinator: it owns one [`SceneRegistry`],
//! one [`RenderLoop`] and the [`ObjectAssembler`]s feeding them, and runs
//! the frame in a fixed order:
//!
//! 1. sync assemblers (assemble or swap resources)
//! 2. attach pending entries whose parent is now in the scene
//! 3. tick the render loop
//! 4. render, as configured by [`FrameLoop`]
//!
//! Assemblers may be spawned in any order: a child spawned before its
//! parent is recorded as pending and attached once the parent is.
//!
//! A host with several scenes creates one stage per scene.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut stage = Stage::new(StageSettings { frameloop: FrameLoop::Demand, ..Default::default() });
//! stage.init_root(Camera::default(), Box::new(MyBackend::new()));
//!
//! let key = stage.spawn(ObjectAssembler::new("sphere-1", NodeKind::Mesh));
//! // ... producers write into the assembler's channels ...
//!
//! loop {
//!     let outcome = stage.frame();
//!     if outcome.rendered { present(); }
//! }
//! ```

use std::time::Duration;

use arbor_core::{Invalidator, Result};
use arbor_scene::{Camera, DisposalReport, NodeKey, RenderBackend, SceneRegistry};
use slotmap::{SlotMap, new_key_type};

use crate::assembler::{AssemblyState, ObjectAssembler};
use crate::clock::FrameClock;
use crate::render_loop::{FrameState, RenderLoop, UpdateHandle};
use crate::settings::{FrameLoop, StageSettings};
use crate::visibility::VisibilityGate;

new_key_type! {
    /// Key of an assembler owned by a [`Stage`].
    pub struct AssemblerKey;
}

/// What happened during one [`Stage::advance`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameOutcome {
    /// Assemblers that reached [`AssemblyState::Assembled`] this frame.
    pub assembled: usize,
    /// Pending registry entries attached this frame.
    pub reconciled: usize,
    /// Update callbacks invoked.
    pub callbacks: usize,
    /// Whether a frame was handed to the backend.
    pub rendered: bool,
}

pub struct Stage {
    registry: SceneRegistry,
    render_loop: RenderLoop,
    assemblers: SlotMap<AssemblerKey, ObjectAssembler>,
    clock: FrameClock,
    settings: StageSettings,
}

impl Default for Stage {
    fn default() -> Self {
        Self::new(StageSettings::default())
    }
}

impl Stage {
    #[must_use]
    pub fn new(settings: StageSettings) -> Self {
        Self {
            registry: SceneRegistry::new(),
            render_loop: RenderLoop::new(settings.loop_settings),
            assemblers: SlotMap::with_key(),
            clock: FrameClock::new(),
            settings,
        }
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &StageSettings {
        &self.settings
    }

    pub fn set_frameloop(&mut self, frameloop: FrameLoop) {
        self.settings.frameloop = frameloop;
    }

    #[inline]
    #[must_use]
    pub fn registry(&self) -> &SceneRegistry {
        &self.registry
    }

    #[inline]
    pub fn registry_mut(&mut self) -> &mut SceneRegistry {
        &mut self.registry
    }

    #[inline]
    #[must_use]
    pub fn render_loop(&self) -> &RenderLoop {
        &self.render_loop
    }

    #[inline]
    pub fn render_loop_mut(&mut self) -> &mut RenderLoop {
        &mut self.render_loop
    }

    #[inline]
    #[must_use]
    pub fn invalidator(&self) -> &Invalidator {
        self.registry.invalidator()
    }

    /// Visibility gate configured with this stage's settings.
    #[must_use]
    pub fn visibility_gate(&self) -> VisibilityGate {
        VisibilityGate::new(self.settings.visibility)
    }

    /// Initializes the root triple of the registry.
    pub fn init_root(&mut self, camera: Camera, renderer: Box<dyn RenderBackend>) -> NodeKey {
        self.registry.init_root(camera, renderer)
    }

    /// Takes ownership of `assembler` and syncs it once.
    pub fn spawn(&mut self, mut assembler: ObjectAssembler) -> AssemblerKey {
        assembler.sync(&mut self.registry);
        self.reconcile_pending();
        self.assemblers.insert(assembler)
    }

    fn reconcile_pending(&mut self) -> usize {
        if self.registry.has_pending() { self.registry.reconcile() } else { 0 }
    }

    #[must_use]
    pub fn assembler(&self, key: AssemblerKey) -> Option<&ObjectAssembler> {
        self.assemblers.get(key)
    }

    pub fn assembler_mut(&mut self, key: AssemblerKey) -> Option<&mut ObjectAssembler> {
        self.assemblers.get_mut(key)
    }

    /// Registers a per-frame callback for the assembler at `key`.
    pub fn on_frame(
        &mut self,
        key: AssemblerKey,
        callback: impl FnMut(&mut FrameState<'_>) + 'static,
    ) -> Option<Result<UpdateHandle>> {
        let assembler = self.assemblers.get_mut(key)?;
        Some(assembler.on_frame(&mut self.render_loop, callback))
    }

    /// Destroys and drops the assembler at `key`. Unknown keys are ignored.
    pub fn despawn(&mut self, key: AssemblerKey) -> Option<DisposalReport> {
        let mut assembler = self.assemblers.remove(key)?;
        assembler.destroy(&mut self.registry)
    }

    #[must_use]
    pub fn assembler_count(&self) -> usize {
        self.assemblers.len()
    }

    /// Runs one frame at host timestamp `now`.
    pub fn advance(&mut self, now: Duration) -> FrameOutcome {
        let mut outcome = FrameOutcome::default();

        for assembler in self.assemblers.values_mut() {
            if !assembler.needs_sync() {
                continue;
            }
            let before = assembler.state();
            let after = assembler.sync(&mut self.registry);
            if before != AssemblyState::Assembled && after == AssemblyState::Assembled {
                outcome.assembled += 1;
            }
        }
        outcome.reconciled = self.reconcile_pending();

        outcome.callbacks = self.render_loop.tick(now, &mut self.registry);

        outcome.rendered = match self.settings.frameloop {
            FrameLoop::Always => {
                self.registry.invalidator().take();
                self.registry.render()
            }
            FrameLoop::Demand => self.registry.invalidator().take() && self.registry.render(),
            FrameLoop::Never => false,
        };

        outcome
    }

    /// Runs one frame at the stage clock's current time.
    pub fn frame(&mut self) -> FrameOutcome {
        let now = self.clock.now();
        self.advance(now)
    }

    /// Renders immediately, consuming any pending redraw request.
    pub fn render_now(&mut self) -> bool {
        self.registry.invalidator().take();
        self.registry.render()
    }

    /// Destroys every assembler, drops every callback and clears the registry.
    pub fn teardown(&mut self) -> DisposalReport {
        let mut report = DisposalReport::default();
        for (_, mut assembler) in self.assemblers.drain() {
            if let Some(removed) = assembler.destroy(&mut self.registry) {
                report.merge(removed);
            }
        }
        self.render_loop = RenderLoop::new(self.settings.loop_settings);
        report.merge(self.registry.clear());
        log::info!("Stage torn down");
        report
    }
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("registry", &self.registry)
            .field("render_loop", &self.render_loop)
            .field("assemblers", &self.assemblers.len())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
