use serde::{Deserialize, Serialize};

/// Unique identifier for a product.
///
/// Product identifiers are six-digit numbers allocated by the inventory
/// service when a product is created. They never change afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(i32);

impl ProductId {
    /// Smallest identifier the allocator hands out.
    pub const MIN: i32 = 100_000;

    /// Largest identifier the allocator hands out.
    pub const MAX: i32 = 999_999;

    /// Creates a product ID from a raw value.
    pub fn new(value: i32) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    pub fn as_i32(&self) -> i32 {
        self.0
    }

    /// Returns true if the value lies in the allocatable six-digit range.
    pub fn is_allocatable(&self) -> bool {
        (Self::MIN..=Self::MAX).contains(&self.0)
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for ProductId {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl From<ProductId> for i32 {
    fn from(id: ProductId) -> Self {
        id.0
    }
}

/// Identifier of a category. Assigned externally, never generated here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(i32);

impl CategoryId {
    pub fn new(value: i32) -> Self {
        Self(value)
    }

    pub fn as_i32(&self) -> i32 {
        self.0
    }
}

impl std::fmt::Display for CategoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for CategoryId {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl From<CategoryId> for i32 {
    fn from(id: CategoryId) -> Self {
        id.0
    }
}

/// The principal on whose behalf a mutation is performed.
///
/// Recorded in `created_by` / `modified_by` on every write.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Actor(String);

impl Actor {
    /// Name of the built-in identity used when no principal is supplied.
    pub const SYSTEM: &'static str = "System";

    /// Creates an actor from a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the built-in system identity.
    pub fn system() -> Self {
        Self(Self::SYSTEM.to_string())
    }

    /// Returns the actor name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Actor {
    fn default() -> Self {
        Self::system()
    }
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Actor {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Actor {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for Actor {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_id_range_bounds_are_inclusive() {
        assert!(ProductId::new(100_000).is_allocatable());
        assert!(ProductId::new(999_999).is_allocatable());
        assert!(!ProductId::new(99_999).is_allocatable());
        assert!(!ProductId::new(1_000_000).is_allocatable());
    }

    #[test]
    fn product_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&ProductId::new(100_001)).unwrap();
        assert_eq!(json, "100001");
        let back: ProductId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ProductId::new(100_001));
    }

    #[test]
    fn category_id_display() {
        assert_eq!(CategoryId::new(5).to_string(), "5");
    }

    #[test]
    fn actor_defaults_to_system() {
        assert_eq!(Actor::default().as_str(), "System");
        assert_eq!(Actor::from("alice").to_string(), "alice");
    }
}
