use arbor_core::{ChangeTracker, MutGuard};
use rustc_hash::FxHashMap;

/// One vertex attribute stream (planar `f32` data).
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub data: Vec<f32>,
    /// Components per vertex (3 for positions, 2 for UVs, ...).
    pub item_size: u32,
}

impl Attribute {
    #[must_use]
    pub fn new(data: Vec<f32>, item_size: u32) -> Self {
        Self { data, item_size }
    }

    /// Number of vertices stored in this attribute.
    #[must_use]
    pub fn count(&self) -> usize {
        if self.item_size == 0 {
            return 0;
        }
        self.data.len() / self.item_size as usize
    }
}

/// Shape data: named vertex attributes plus an optional index buffer.
///
/// Geometries are produced by shape builders, handed over through a
/// resource channel and moved into the registry's resource pool when the
/// owning object is assembled.
#[derive(Debug, Clone)]
pub struct Geometry {
    pub name: String,
    attributes: FxHashMap<String, Attribute>,
    index: Option<Vec<u32>>,
    tracker: ChangeTracker,
}

impl Geometry {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: FxHashMap::default(),
            index: None,
            tracker: ChangeTracker::new(),
        }
    }

    /// Builder form of [`set_attribute`](Self::set_attribute).
    #[must_use]
    pub fn with_attribute(mut self, name: &str, attribute: Attribute) -> Self {
        self.set_attribute(name, attribute);
        self
    }

    /// Builder form of [`set_index`](Self::set_index).
    #[must_use]
    pub fn with_index(mut self, index: Vec<u32>) -> Self {
        self.set_index(index);
        self
    }

    pub fn set_attribute(&mut self, name: &str, attribute: Attribute) {
        self.attributes.insert(name.to_string(), attribute);
        self.tracker.changed();
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Mutable access to all attributes; bumps the version when released.
    pub fn attributes_mut(&mut self) -> MutGuard<'_, FxHashMap<String, Attribute>> {
        self.tracker.guard(&mut self.attributes)
    }

    pub fn set_index(&mut self, index: Vec<u32>) {
        self.index = Some(index);
        self.tracker.changed();
    }

    #[must_use]
    pub fn index(&self) -> Option<&[u32]> {
        self.index.as_deref()
    }

    /// Vertex count, taken from the `position` attribute.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.attribute("position").map_or(0, Attribute::count)
    }

    #[inline]
    #[must_use]
    pub fn version(&self) -> u64 {
        self.tracker.version()
    }
}
