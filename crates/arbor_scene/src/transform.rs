use glam::{Affine3A, EulerRot, Mat4, Quat, Vec3};

/// TRS snapshot the cached local matrix was built from.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Trs {
    position: Vec3,
    rotation: Quat,
    scale: Vec3,
}

/// Node transform.
///
/// `position`, `rotation` and `scale` are plain public fields that patches
/// write directly. The local and world matrices are caches: the local one is
/// rebuilt on [`refresh_local`](Self::refresh_local) when the fields no
/// longer match the snapshot it was built from, the world one is written by
/// the scene graph's hierarchy pass.
#[derive(Debug, Clone)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,

    pub(crate) local: Affine3A,
    pub(crate) world: Affine3A,
    built_from: Option<Trs>,
}

impl Transform {
    #[must_use]
    pub fn new() -> Self {
        Self::from_position(Vec3::ZERO)
    }

    #[must_use]
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            local: Affine3A::IDENTITY,
            world: Affine3A::IDENTITY,
            built_from: None,
        }
    }

    fn trs(&self) -> Trs {
        Trs {
            position: self.position,
            rotation: self.rotation,
            scale: self.scale,
        }
    }

    /// Rebuilds the local matrix if the TRS fields moved.
    ///
    /// Returns `true` when the matrix changed, which forces the world
    /// matrices of the whole subtree to be recomputed.
    pub fn refresh_local(&mut self) -> bool {
        let current = self.trs();
        if self.built_from == Some(current) {
            return false;
        }
        self.local = Affine3A::from_scale_rotation_translation(current.scale, current.rotation, current.position);
        self.built_from = Some(current);
        true
    }

    /// Sets rotation from XYZ Euler angles in radians.
    pub fn set_rotation_euler(&mut self, x: f32, y: f32, z: f32) {
        self.rotation = Quat::from_euler(EulerRot::XYZ, x, y, z);
    }

    #[must_use]
    pub fn rotation_euler(&self) -> Vec3 {
        Vec3::from(self.rotation.to_euler(EulerRot::XYZ))
    }

    #[inline]
    #[must_use]
    pub fn local_matrix(&self) -> &Affine3A {
        &self.local
    }

    #[inline]
    #[must_use]
    pub fn world_matrix(&self) -> &Affine3A {
        &self.world
    }

    /// World matrix in the `Mat4` layout backends upload.
    #[must_use]
    pub fn world_mat4(&self) -> Mat4 {
        Mat4::from(self.world)
    }

    /// Drops the cached local matrix, e.g. after re-parenting.
    pub fn invalidate(&mut self) {
        self.built_from = None;
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}
