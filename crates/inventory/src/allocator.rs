//! Product identifier allocation.
//!
//! Allocators check the store for a free six-digit id. The check happens
//! inside the caller's transaction, and the store's uniqueness constraint on
//! insert catches anything that slips past it.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use catalog_store::ProductLookup;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{InventoryError, ProductId};

/// Default cap on existence lookups per allocation.
pub const DEFAULT_MAX_CANDIDATES: u32 = 1_000;

/// Trait for product id generation strategies.
#[async_trait]
pub trait IdAllocator: Send + Sync {
    /// Returns an id in `[ProductId::MIN, ProductId::MAX]` that does not exist
    /// according to `lookup` and is not in `reserved`.
    ///
    /// `reserved` holds ids already handed out for the current batch but not
    /// yet inserted.
    async fn allocate(
        &self,
        lookup: &mut dyn ProductLookup,
        reserved: &HashSet<ProductId>,
    ) -> Result<ProductId, InventoryError>;
}

/// Draws candidates uniformly at random from the six-digit range.
pub struct RandomIdAllocator {
    rng: Mutex<StdRng>,
    max_candidates: u32,
}

impl RandomIdAllocator {
    /// Creates an allocator seeded from the operating system.
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
            max_candidates: DEFAULT_MAX_CANDIDATES,
        }
    }

    /// Creates an allocator with a fixed seed, for reproducible tests.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            max_candidates: DEFAULT_MAX_CANDIDATES,
        }
    }

    /// Sets the maximum number of lookups per allocation.
    pub fn with_max_candidates(mut self, max_candidates: u32) -> Self {
        self.max_candidates = max_candidates.max(1);
        self
    }

    fn next_candidate(&self) -> ProductId {
        // A poisoned lock still holds a usable generator.
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        ProductId::new(rng.random_range(ProductId::MIN..=ProductId::MAX))
    }
}

impl Default for RandomIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdAllocator for RandomIdAllocator {
    async fn allocate(
        &self,
        lookup: &mut dyn ProductLookup,
        reserved: &HashSet<ProductId>,
    ) -> Result<ProductId, InventoryError> {
        for _ in 0..self.max_candidates {
            let candidate = self.next_candidate();
            if reserved.contains(&candidate) {
                continue;
            }
            if !lookup.product_exists(candidate).await? {
                return Ok(candidate);
            }
            metrics::counter!("inventory_id_collisions_total").increment(1);
            tracing::debug!(%candidate, "product id taken, drawing again");
        }

        Err(InventoryError::IdSpaceExhausted {
            candidates: self.max_candidates,
        })
    }
}

/// Walks the range upward, wrapping at the top.
///
/// Deterministic, so tests can predict the ids it hands out.
pub struct SequentialIdAllocator {
    cursor: Mutex<i32>,
    max_candidates: u32,
}

impl SequentialIdAllocator {
    /// Creates an allocator starting at the bottom of the range.
    pub fn new() -> Self {
        Self::starting_at(ProductId::new(ProductId::MIN))
    }

    /// Creates an allocator whose first candidate is `start`, clamped into range.
    pub fn starting_at(start: ProductId) -> Self {
        Self {
            cursor: Mutex::new(start.as_i32().clamp(ProductId::MIN, ProductId::MAX)),
            max_candidates: DEFAULT_MAX_CANDIDATES,
        }
    }

    /// Sets the maximum number of lookups per allocation.
    pub fn with_max_candidates(mut self, max_candidates: u32) -> Self {
        self.max_candidates = max_candidates.max(1);
        self
    }

    fn next_candidate(&self) -> ProductId {
        let mut cursor = self.cursor.lock().unwrap_or_else(|e| e.into_inner());
        let candidate = *cursor;
        *cursor = if candidate >= ProductId::MAX {
            ProductId::MIN
        } else {
            candidate + 1
        };
        ProductId::new(candidate)
    }
}

impl Default for SequentialIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdAllocator for SequentialIdAllocator {
    async fn allocate(
        &self,
        lookup: &mut dyn ProductLookup,
        reserved: &HashSet<ProductId>,
    ) -> Result<ProductId, InventoryError> {
        for _ in 0..self.max_candidates {
            let candidate = self.next_candidate();
            if reserved.contains(&candidate) {
                continue;
            }
            if !lookup.product_exists(candidate).await? {
                return Ok(candidate);
            }
        }

        Err(InventoryError::IdSpaceExhausted {
            candidates: self.max_candidates,
        })
    }
}

#[cfg(test)]
mod tests {
    use catalog_store::StoreError;

    use super::*;

    /// Lookup backed by a fixed set of taken ids.
    struct Taken(HashSet<ProductId>);

    #[async_trait]
    impl ProductLookup for Taken {
        async fn product_exists(&mut self, id: ProductId) -> catalog_store::Result<bool> {
            Ok(self.0.contains(&id))
        }
    }

    struct Broken;

    #[async_trait]
    impl ProductLookup for Broken {
        async fn product_exists(&mut self, _id: ProductId) -> catalog_store::Result<bool> {
            Err(StoreError::Unavailable("offline".to_string()))
        }
    }

    fn taken(ids: &[i32]) -> Taken {
        Taken(ids.iter().copied().map(ProductId::new).collect())
    }

    #[tokio::test]
    async fn test_random_ids_stay_in_range() {
        let allocator = RandomIdAllocator::seeded(7);
        let mut lookup = taken(&[]);
        for _ in 0..200 {
            let id = allocator
                .allocate(&mut lookup, &HashSet::new())
                .await
                .unwrap();
            assert!(id.is_allocatable());
        }
    }

    #[tokio::test]
    async fn test_random_skips_existing_and_reserved() {
        // Same seed, same sequence: learn the first two draws, then block them.
        let allocator = RandomIdAllocator::seeded(42);
        let first = allocator.next_candidate();
        let second = allocator.next_candidate();

        let allocator = RandomIdAllocator::seeded(42);
        let mut lookup = Taken(HashSet::from([first]));
        let reserved = HashSet::from([second]);
        let id = allocator.allocate(&mut lookup, &reserved).await.unwrap();

        assert_ne!(id, first);
        assert_ne!(id, second);
    }

    #[tokio::test]
    async fn test_sequential_allocates_in_order() {
        let allocator = SequentialIdAllocator::new();
        let mut lookup = taken(&[100_000, 100_002]);
        let mut reserved = HashSet::new();

        let a = allocator.allocate(&mut lookup, &reserved).await.unwrap();
        reserved.insert(a);
        let b = allocator.allocate(&mut lookup, &reserved).await.unwrap();

        assert_eq!(a, ProductId::new(100_001));
        assert_eq!(b, ProductId::new(100_003));
    }

    #[tokio::test]
    async fn test_sequential_wraps_at_top_of_range() {
        let allocator = SequentialIdAllocator::starting_at(ProductId::new(ProductId::MAX));
        let mut lookup = taken(&[ProductId::MAX]);
        let id = allocator
            .allocate(&mut lookup, &HashSet::new())
            .await
            .unwrap();
        assert_eq!(id, ProductId::new(ProductId::MIN));
    }

    #[tokio::test]
    async fn test_candidate_limit_reports_exhaustion() {
        let allocator = SequentialIdAllocator::new().with_max_candidates(3);
        let mut lookup = taken(&[100_000, 100_001, 100_002]);
        let err = allocator
            .allocate(&mut lookup, &HashSet::new())
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::IdSpaceExhausted { candidates: 3 }));
    }

    #[tokio::test]
    async fn test_lookup_failure_propagates() {
        let allocator = RandomIdAllocator::seeded(1);
        let err = allocator
            .allocate(&mut Broken, &HashSet::new())
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::Store(StoreError::Unavailable(_))));
    }
}
