//! Field rules for proposed products.
//!
//! Everything here is pure: no store access. Whether a category actually
//! exists is checked by the service, since that needs a lookup.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{Actor, CategoryId, ProductDraft, ProductId};

/// Maximum product name length, in characters.
pub const NAME_MAX_CHARS: usize = 100;

/// Maximum product description length, in characters.
pub const DESCRIPTION_MAX_CHARS: usize = 500;

/// Maximum acting principal length, in characters.
pub const ACTOR_MAX_CHARS: usize = 100;

/// Maximum number of decimal places in a price.
pub const PRICE_MAX_SCALE: u32 = 2;

/// Exclusive upper bound on a price. Prices are stored as `NUMERIC(18,2)`.
// 10^16 with scale 0 (`Decimal::new` is not const).
pub const PRICE_LIMIT: Decimal = Decimal::from_parts(0x6FC1_0000, 0x0023_86F2, 0, false, 0);

/// A caller-correctable problem with the input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Product name is required.")]
    NameRequired,

    #[error("Product name cannot exceed {max} characters (got {actual}).")]
    NameTooLong { max: usize, actual: usize },

    #[error("Description cannot exceed {max} characters (got {actual}).")]
    DescriptionTooLong { max: usize, actual: usize },

    #[error("CategoryId must be valid (got {0}).")]
    InvalidCategoryId(CategoryId),

    #[error("Stock cannot be negative (got {0}).")]
    NegativeStock(i32),

    #[error("Price must be greater than 0 (got {0}).")]
    NonPositivePrice(Decimal),

    #[error("Price cannot have more than {max} decimal places (got {actual}).")]
    PriceTooPrecise { max: u32, actual: u32 },

    #[error("Price must be less than {limit} (got {actual}).")]
    PriceTooLarge { limit: Decimal, actual: Decimal },

    #[error("Actor cannot exceed {max} characters (got {actual}).")]
    ActorTooLong { max: usize, actual: usize },

    #[error("Product ID must be greater than zero (got {0}).")]
    InvalidProductId(ProductId),

    #[error("Quantity must be greater than zero (got {0}).")]
    InvalidQuantity(i32),

    #[error("Product list cannot be empty.")]
    EmptyBatch,

    #[error("Product list cannot contain more than {max} items (got {actual}).")]
    BatchTooLarge { max: usize, actual: usize },
}

/// Checks a draft's fields. The first failing rule wins.
pub fn validate(draft: &ProductDraft) -> Result<(), ValidationError> {
    if draft.name.trim().is_empty() {
        return Err(ValidationError::NameRequired);
    }

    let name_len = draft.name.chars().count();
    if name_len > NAME_MAX_CHARS {
        return Err(ValidationError::NameTooLong {
            max: NAME_MAX_CHARS,
            actual: name_len,
        });
    }

    if let Some(description) = &draft.description {
        let len = description.chars().count();
        if len > DESCRIPTION_MAX_CHARS {
            return Err(ValidationError::DescriptionTooLong {
                max: DESCRIPTION_MAX_CHARS,
                actual: len,
            });
        }
    }

    if draft.category_id.as_i32() <= 0 {
        return Err(ValidationError::InvalidCategoryId(draft.category_id));
    }

    if draft.stock < 0 {
        return Err(ValidationError::NegativeStock(draft.stock));
    }

    if draft.price <= Decimal::ZERO {
        return Err(ValidationError::NonPositivePrice(draft.price));
    }

    // Trailing zeros are not extra precision.
    let scale = draft.price.normalize().scale();
    if scale > PRICE_MAX_SCALE {
        return Err(ValidationError::PriceTooPrecise {
            max: PRICE_MAX_SCALE,
            actual: scale,
        });
    }

    if draft.price >= PRICE_LIMIT {
        return Err(ValidationError::PriceTooLarge {
            limit: PRICE_LIMIT,
            actual: draft.price,
        });
    }

    Ok(())
}

/// Checks that the acting principal fits the audit columns.
pub fn validate_actor(actor: &Actor) -> Result<(), ValidationError> {
    let len = actor.as_str().chars().count();
    if len > ACTOR_MAX_CHARS {
        return Err(ValidationError::ActorTooLong {
            max: ACTOR_MAX_CHARS,
            actual: len,
        });
    }
    Ok(())
}

pub fn validate_product_id(id: ProductId) -> Result<(), ValidationError> {
    if id.as_i32() <= 0 {
        return Err(ValidationError::InvalidProductId(id));
    }
    Ok(())
}

pub fn validate_quantity(quantity: i32) -> Result<(), ValidationError> {
    if quantity <= 0 {
        return Err(ValidationError::InvalidQuantity(quantity));
    }
    Ok(())
}

/// Checks the size of an `add` batch against an optional maximum.
pub fn validate_batch(len: usize, max: Option<usize>) -> Result<(), ValidationError> {
    if len == 0 {
        return Err(ValidationError::EmptyBatch);
    }
    if let Some(max) = max
        && len > max
    {
        return Err(ValidationError::BatchTooLarge { max, actual: len });
    }
    Ok(())
}
