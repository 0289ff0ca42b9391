//! Default catalog used to bootstrap an empty store.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::{Category, CategoryId, Product, ProductId};

/// Identity recorded as `created_by` on seeded products.
pub const SEEDER: &str = "Seeder";

/// How many rows a seeding run inserted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub categories_inserted: usize,
    pub products_inserted: usize,
}

/// The five built-in categories.
pub fn default_categories() -> Vec<Category> {
    vec![
        Category::new(1, "Kitchenware")
            .with_description("Utensils, cookware, and tools used for cooking and food preparation."),
        Category::new(2, "Clothing")
            .with_description("Apparel and garments for men, women, and children."),
        Category::new(3, "Books").with_description(
            "Printed and digital books across genres such as fiction, non-fiction, and academic.",
        ),
        Category::new(4, "Home Appliances")
            .with_description("Electrical devices and machines for household tasks and convenience."),
        Category::new(5, "Electronics").with_description(
            "Consumer electronic devices including phones, laptops, and accessories.",
        ),
    ]
}

/// One starter product per default category, stamped as created at `now`.
pub fn default_products(now: DateTime<Utc>) -> Vec<Product> {
    let product = |id: i32, name: &str, description: &str, category: i32, stock: i32, price: i64| {
        Product {
            id: ProductId::new(id),
            name: name.to_string(),
            description: Some(description.to_string()),
            category_id: CategoryId::new(category),
            stock,
            price: Decimal::new(price * 100, 2),
            created_by: SEEDER.to_string(),
            created_date: now,
            modified_by: None,
            modified_date: None,
        }
    };

    vec![
        product(
            100_001,
            "Non-stick Frying Pan",
            "Durable non-stick pan suitable for everyday cooking.",
            1,
            50,
            1200,
        ),
        product(
            100_002,
            "Men's Cotton T-Shirt",
            "100% cotton round-neck T-shirt, breathable and comfortable.",
            2,
            200,
            499,
        ),
        product(
            100_003,
            "Rust Programming Guide",
            "Comprehensive guide to ownership, traits, and async Rust.",
            3,
            30,
            899,
        ),
        product(
            100_004,
            "Microwave Oven",
            "800W compact microwave oven with multiple cooking modes.",
            4,
            15,
            7500,
        ),
        product(
            100_005,
            "Smartphone",
            "Latest Android smartphone with 128GB storage and 5G support.",
            5,
            25,
            29_999,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_default_product_references_a_default_category() {
        let categories = default_categories();
        for product in default_products(Utc::now()) {
            assert!(categories.iter().any(|c| c.id == product.category_id));
            assert!(product.id.is_allocatable());
            assert!(product.price > Decimal::ZERO);
        }
    }

    #[test]
    fn prices_keep_two_decimal_places() {
        let products = default_products(Utc::now());
        assert_eq!(products[0].price.to_string(), "1200.00");
    }
}
