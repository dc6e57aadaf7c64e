/// Texture owned by a material.
///
/// Only the CPU-side description lives here; the backend keeps whatever GPU
/// object it uploaded and releases it in
/// [`RenderBackend::dispose_texture`](crate::backend::RenderBackend::dispose_texture).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Texture {
    pub name: String,
    pub width: u32,
    pub height: u32,
}

impl Texture {
    #[must_use]
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
        }
    }
}
