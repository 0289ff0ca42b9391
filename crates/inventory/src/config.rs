//! Tunable limits for the inventory service.

/// Limits applied by [`crate::InventoryService`].
///
/// `None` means no limit beyond the range of the underlying integer type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryConfig {
    /// Maximum number of products accepted by a single `add` call.
    pub max_batch_size: Option<usize>,
    /// Maximum stock a product may reach through `increment_stock`.
    ///
    /// `add` and `update` set stock directly and are not held to this cap.
    pub max_stock: Option<i32>,
    /// How many times `add` re-allocates ids after the store reports a collision.
    pub id_allocation_attempts: u32,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            max_batch_size: None,
            max_stock: None,
            id_allocation_attempts: 3,
        }
    }
}

impl InventoryConfig {
    pub fn with_max_batch_size(mut self, max: usize) -> Self {
        self.max_batch_size = Some(max);
        self
    }

    pub fn with_max_stock(mut self, max: i32) -> Self {
        self.max_stock = Some(max);
        self
    }

    pub fn with_id_allocation_attempts(mut self, attempts: u32) -> Self {
        self.id_allocation_attempts = attempts.max(1);
        self
    }

    /// Returns the effective stock ceiling.
    pub fn stock_ceiling(&self) -> i32 {
        self.max_stock.unwrap_or(i32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = InventoryConfig::default();
        assert_eq!(config.max_batch_size, None);
        assert_eq!(config.max_stock, None);
        assert_eq!(config.id_allocation_attempts, 3);
        assert_eq!(config.stock_ceiling(), i32::MAX);
    }

    #[test]
    fn test_attempts_never_zero() {
        let config = InventoryConfig::default().with_id_allocation_attempts(0);
        assert_eq!(config.id_allocation_attempts, 1);
    }
}
