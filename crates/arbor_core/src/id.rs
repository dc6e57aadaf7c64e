//! Stable object identifiers.
//!
//! An [`ObjectId`] names one live object across the registry, the render
//! loop and the assembler. Ids are cheap to clone (`Arc<str>`) and compare
//! by string value, so `"sphere-1"` passed from two places is the same id.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

/// Opaque, stable identifier of a scene object.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(Arc<str>);

impl ObjectId {
    /// Creates an id from any string-like value.
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    /// Generates a fresh random id (`<prefix>-<uuid v4>`).
    ///
    /// Generated ids never collide with each other, which is what callers
    /// want when an object has no natural name.
    #[must_use]
    pub fn generate(prefix: &str) -> Self {
        Self::new(format!("{prefix}-{}", Uuid::new_v4().simple()))
    }

    /// Returns the id as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({:?})", &*self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ObjectId {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

impl From<&ObjectId> for ObjectId {
    fn from(value: &ObjectId) -> Self {
        value.clone()
    }
}

impl Borrow<str> for ObjectId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ObjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_compare_by_value() {
        assert_eq!(ObjectId::new("sphere-1"), ObjectId::from("sphere-1"));
        assert_ne!(ObjectId::new("sphere-1"), ObjectId::new("sphere-2"));
    }

    #[test]
    fn generated_ids_are_unique_and_prefixed() {
        let a = ObjectId::generate("mesh");
        let b = ObjectId::generate("mesh");
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("mesh-"));
    }
}
