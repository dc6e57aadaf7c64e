//! Partial updates applied through [`SceneRegistry::update`](crate::registry::SceneRegistry::update).
//!
//! Every field is optional; `None` leaves the current value untouched.

use glam::Vec3;

use crate::resources::Material;
use crate::transform::Transform;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TransformPatch {
    pub position: Option<Vec3>,
    /// Euler angles (XYZ order, radians).
    pub rotation: Option<Vec3>,
    pub scale: Option<Vec3>,
}

impl TransformPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.position.is_none() && self.rotation.is_none() && self.scale.is_none()
    }

    pub fn apply_to(&self, transform: &mut Transform) {
        if let Some(position) = self.position {
            transform.position = position;
        }
        if let Some(r) = self.rotation {
            transform.set_rotation_euler(r.x, r.y, r.z);
        }
        if let Some(scale) = self.scale {
            transform.scale = scale;
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AppearancePatch {
    pub color: Option<Vec3>,
    pub opacity: Option<f32>,
    pub wireframe: Option<bool>,
    pub transparent: Option<bool>,
}

impl AppearancePatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.color.is_none() && self.opacity.is_none() && self.wireframe.is_none() && self.transparent.is_none()
    }

    /// Writes the set fields into `material`, bumping its version.
    pub fn apply_to(&self, material: &mut Material) {
        if let Some(color) = self.color {
            material.set_color(color);
        }
        if let Some(opacity) = self.opacity {
            material.set_opacity(opacity);
        }
        if let Some(wireframe) = self.wireframe {
            material.set_wireframe(wireframe);
        }
        if let Some(transparent) = self.transparent {
            material.set_transparent(transparent);
        }
        material.mark_dirty();
    }
}

/// Combined transform/appearance/visibility update.
///
/// ```rust,ignore
/// let patch = ObjectPatch::new().position(Vec3::new(1.0, 2.0, 3.0)).opacity(0.5);
/// registry.update("sphere-1", &patch);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ObjectPatch {
    pub transform: TransformPatch,
    pub appearance: AppearancePatch,
    pub visible: Option<bool>,
}

impl ObjectPatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn position(mut self, position: Vec3) -> Self {
        self.transform.position = Some(position);
        self
    }

    #[must_use]
    pub fn rotation(mut self, euler: Vec3) -> Self {
        self.transform.rotation = Some(euler);
        self
    }

    #[must_use]
    pub fn scale(mut self, scale: Vec3) -> Self {
        self.transform.scale = Some(scale);
        self
    }

    #[must_use]
    pub fn color(mut self, color: Vec3) -> Self {
        self.appearance.color = Some(color);
        self
    }

    #[must_use]
    pub fn opacity(mut self, opacity: f32) -> Self {
        self.appearance.opacity = Some(opacity);
        self
    }

    #[must_use]
    pub fn wireframe(mut self, wireframe: bool) -> Self {
        self.appearance.wireframe = Some(wireframe);
        self
    }

    #[must_use]
    pub fn transparent(mut self, transparent: bool) -> Self {
        self.appearance.transparent = Some(transparent);
        self
    }

    #[must_use]
    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = Some(visible);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transform.is_empty() && self.appearance.is_empty() && self.visible.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_patch_leaves_unset_fields() {
        let mut transform = Transform::from_position(Vec3::new(5.0, 5.0, 5.0));
        transform.scale = Vec3::splat(2.0);
        TransformPatch {
            position: Some(Vec3::new(1.0, 2.0, 3.0)),
            ..Default::default()
        }
        .apply_to(&mut transform);

        assert_eq!(transform.position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(transform.scale, Vec3::splat(2.0));
    }

    #[test]
    fn appearance_patch_marks_material_dirty() {
        let mut material = Material::standard(Vec3::ONE);
        let before = material.version();
        ObjectPatch::new().opacity(0.25).appearance.apply_to(&mut material);
        assert!(material.version() > before);
        assert!((material.opacity() - 0.25).abs() < f32::EPSILON);
        assert_eq!(material.color(), Vec3::ONE);
    }
}
