use glam::{Affine3A, Mat4};

/// Projection parameters of a [`Camera`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Vertical field of view in radians.
    Perspective { fov_y: f32 },
    /// Half-height of the view volume in world units.
    Orthographic { half_height: f32 },
}

/// Camera of the root triple, or the payload of a camera node.
///
/// Camera nodes get their view matrix refreshed by the scene graph's
/// world-matrix pass; the root camera is positioned by the host.
#[derive(Debug, Clone)]
pub struct Camera {
    pub projection: Projection,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    view: Mat4,
}

impl Camera {
    /// Perspective camera; `fov_degrees` is the vertical field of view.
    #[must_use]
    pub fn perspective(fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            projection: Projection::Perspective {
                fov_y: fov_degrees.to_radians(),
            },
            aspect,
            near,
            far,
            view: Mat4::IDENTITY,
        }
    }

    #[must_use]
    pub fn orthographic(half_height: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            projection: Projection::Orthographic { half_height },
            aspect,
            near,
            far,
            view: Mat4::IDENTITY,
        }
    }

    #[must_use]
    pub fn projection_matrix(&self) -> Mat4 {
        match self.projection {
            Projection::Perspective { fov_y } => Mat4::perspective_rh(fov_y, self.aspect, self.near, self.far),
            Projection::Orthographic { half_height } => {
                let half_width = half_height * self.aspect;
                Mat4::orthographic_rh(-half_width, half_width, -half_height, half_height, self.near, self.far)
            }
        }
    }

    /// Places the camera at `world`; the view matrix is its inverse.
    pub fn update_view(&mut self, world: &Affine3A) {
        self.view = Mat4::from(world.inverse());
    }

    #[inline]
    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        self.view
    }

    #[must_use]
    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::perspective(75.0, 1.0, 0.1, 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    #[test]
    fn view_matrix_inverts_placement() {
        let mut camera = Camera::default();
        let placement = Affine3A::from_translation(Vec3::new(0.0, 0.0, 5.0));
        camera.update_view(&placement);
        let origin = camera.view_matrix().transform_point3(Vec3::new(0.0, 0.0, 5.0));
        assert!(origin.length() < 1e-5);
    }
}
