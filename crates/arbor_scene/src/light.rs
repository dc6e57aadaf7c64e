use glam::Vec3;

#[derive(Debug, Clone, PartialEq)]
pub struct PointLight {
    pub range: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpotLight {
    pub range: f32,
    pub inner_cone: f32,
    pub outer_cone: f32,
}

/// Light variants supported by the scene graph.
#[derive(Debug, Clone, PartialEq)]
pub enum LightKind {
    Ambient,
    Directional,
    Point(PointLight),
    Spot(SpotLight),
}

/// Light component carried by a light node.
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    pub color: Vec3,
    pub intensity: f32,
    pub kind: LightKind,
    pub cast_shadows: bool,
}

impl Light {
    #[must_use]
    pub fn new_ambient(color: Vec3, intensity: f32) -> Self {
        Self::with_kind(LightKind::Ambient, color, intensity)
    }

    #[must_use]
    pub fn new_directional(color: Vec3, intensity: f32) -> Self {
        Self::with_kind(LightKind::Directional, color, intensity)
    }

    #[must_use]
    pub fn new_point(color: Vec3, intensity: f32, range: f32) -> Self {
        Self::with_kind(LightKind::Point(PointLight { range }), color, intensity)
    }

    #[must_use]
    pub fn new_spot(color: Vec3, intensity: f32, range: f32, inner_cone: f32, outer_cone: f32) -> Self {
        Self::with_kind(
            LightKind::Spot(SpotLight {
                range,
                inner_cone,
                outer_cone,
            }),
            color,
            intensity,
        )
    }

    fn with_kind(kind: LightKind, color: Vec3, intensity: f32) -> Self {
        Self {
            color,
            intensity,
            kind,
            cast_shadows: false,
        }
    }
}
