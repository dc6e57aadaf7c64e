use arbor_core::ChangeTracker;
use glam::Vec3;
use smallvec::SmallVec;

use crate::resources::texture::Texture;

/// Shading model requested from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialKind {
    Basic,
    Phong,
    Standard,
    Points,
}

/// Appearance data: color, opacity, render flags and owned texture maps.
///
/// Every setter bumps the material's version so the backend re-uploads it
/// on the next frame.
#[derive(Debug, Clone)]
pub struct Material {
    pub name: String,
    kind: MaterialKind,
    color: Vec3,
    opacity: f32,
    wireframe: bool,
    transparent: bool,
    maps: SmallVec<[Texture; 2]>,
    tracker: ChangeTracker,
}

impl Material {
    #[must_use]
    pub fn new(kind: MaterialKind, color: Vec3) -> Self {
        Self {
            name: "Material".to_string(),
            kind,
            color,
            opacity: 1.0,
            wireframe: false,
            transparent: false,
            maps: SmallVec::new(),
            tracker: ChangeTracker::new(),
        }
    }

    #[must_use]
    pub fn basic(color: Vec3) -> Self {
        Self::new(MaterialKind::Basic, color)
    }

    #[must_use]
    pub fn standard(color: Vec3) -> Self {
        Self::new(MaterialKind::Standard, color)
    }

    #[must_use]
    pub fn points(color: Vec3) -> Self {
        Self::new(MaterialKind::Points, color)
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds an owned texture map. The texture is disposed with the material.
    #[must_use]
    pub fn with_map(mut self, texture: Texture) -> Self {
        self.maps.push(texture);
        self
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> MaterialKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub fn color(&self) -> Vec3 {
        self.color
    }

    pub fn set_color(&mut self, color: Vec3) {
        self.color = color;
        self.mark_dirty();
    }

    #[inline]
    #[must_use]
    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = opacity.clamp(0.0, 1.0);
        self.mark_dirty();
    }

    #[inline]
    #[must_use]
    pub fn wireframe(&self) -> bool {
        self.wireframe
    }

    pub fn set_wireframe(&mut self, wireframe: bool) {
        self.wireframe = wireframe;
        self.mark_dirty();
    }

    #[inline]
    #[must_use]
    pub fn transparent(&self) -> bool {
        self.transparent
    }

    pub fn set_transparent(&mut self, transparent: bool) {
        self.transparent = transparent;
        self.mark_dirty();
    }

    #[must_use]
    pub fn maps(&self) -> &[Texture] {
        &self.maps
    }

    /// Flags the material for re-upload.
    #[inline]
    pub fn mark_dirty(&mut self) {
        self.tracker.changed();
    }

    #[inline]
    #[must_use]
    pub fn version(&self) -> u64 {
        self.tracker.version()
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::basic(Vec3::ONE)
    }
}
