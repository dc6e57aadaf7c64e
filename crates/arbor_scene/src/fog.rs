use glam::Vec3;

/// Linear distance fog.
#[derive(Debug, Clone, PartialEq)]
pub struct Fog {
    pub color: Vec3,
    pub near: f32,
    pub far: f32,
}

impl Fog {
    #[must_use]
    pub fn new(color: Vec3, near: f32, far: f32) -> Self {
        Self { color, near, far }
    }
}
