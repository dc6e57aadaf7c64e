//! Registry-owned storage for GPU-backed resources.
//!
//! Geometries and materials enter the pool when an object is registered and
//! leave it exactly once, through the registry's disposal path. Handles are
//! slot-map keys: disposing a handle removes its slot, so disposing it again
//! finds nothing and is a no-op instead of a double free.

use std::panic::{AssertUnwindSafe, catch_unwind};

use arbor_core::{ArborError, Result};
use slotmap::{SlotMap, new_key_type};

use crate::backend::{DisposalReport, RenderBackend};
use crate::resources::geometry::Geometry;
use crate::resources::material::Material;

new_key_type! {
    pub struct GeometryHandle;
    pub struct MaterialHandle;
}

#[derive(Default)]
pub struct ResourcePool {
    geometries: SlotMap<GeometryHandle, Geometry>,
    materials: SlotMap<MaterialHandle, Material>,
}

impl ResourcePool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert_geometry(&mut self, geometry: Geometry) -> GeometryHandle {
        self.geometries.insert(geometry)
    }

    pub(crate) fn insert_material(&mut self, material: Material) -> MaterialHandle {
        self.materials.insert(material)
    }

    #[must_use]
    pub fn geometry(&self, handle: GeometryHandle) -> Option<&Geometry> {
        self.geometries.get(handle)
    }

    #[must_use]
    pub fn material(&self, handle: MaterialHandle) -> Option<&Material> {
        self.materials.get(handle)
    }

    pub(crate) fn material_mut(&mut self, handle: MaterialHandle) -> Option<&mut Material> {
        self.materials.get_mut(handle)
    }

    #[must_use]
    pub fn geometry_count(&self) -> usize {
        self.geometries.len()
    }

    #[must_use]
    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    /// Frees a geometry and tells the backend to release its buffers.
    pub(crate) fn dispose_geometry(
        &mut self,
        handle: GeometryHandle,
        backend: &mut Option<Box<dyn RenderBackend>>,
        report: &mut DisposalReport,
    ) {
        let Some(geometry) = self.geometries.remove(handle) else {
            log::trace!("Geometry {handle:?} already disposed");
            return;
        };
        report.geometries += 1;

        if let Some(backend) = backend.as_mut()
            && let Err(err) = run_hook(&geometry.name, || backend.dispose_geometry(handle, &geometry))
        {
            log::error!("Disposing geometry '{}' failed: {err}", geometry.name);
            report.failures.push(err);
        }
    }

    /// Frees a material together with the textures it owns.
    ///
    /// Texture failures do not stop the material itself from being released.
    pub(crate) fn dispose_material(
        &mut self,
        handle: MaterialHandle,
        backend: &mut Option<Box<dyn RenderBackend>>,
        report: &mut DisposalReport,
    ) {
        let Some(material) = self.materials.remove(handle) else {
            log::trace!("Material {handle:?} already disposed");
            return;
        };
        report.materials += 1;
        report.textures += material.maps().len();

        let Some(backend) = backend.as_mut() else {
            return;
        };

        for texture in material.maps() {
            if let Err(err) = run_hook(&texture.name, || backend.dispose_texture(texture)) {
                log::error!("Disposing texture '{}' failed: {err}", texture.name);
                report.failures.push(err);
            }
        }

        if let Err(err) = run_hook(&material.name, || backend.dispose_material(handle, &material)) {
            log::error!("Disposing material '{}' failed: {err}", material.name);
            report.failures.push(err);
        }
    }
}

/// Runs one backend dispose hook; a panic becomes a [`ArborError::Dispose`]
/// so the rest of the teardown still runs.
fn run_hook(resource: &str, hook: impl FnOnce() -> Result<()>) -> Result<()> {
    catch_unwind(AssertUnwindSafe(hook)).unwrap_or_else(|payload| {
        let reason = payload
            .downcast_ref::<&str>()
            .map(|message| (*message).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "backend panicked".to_owned());
        Err(ArborError::dispose(resource, format!("panicked: {reason}")))
    })
}

impl std::fmt::Debug for ResourcePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourcePool")
            .field("geometries", &self.geometries.len())
            .field("materials", &self.materials.len())
            .finish()
    }
}
