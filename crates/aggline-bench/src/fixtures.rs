//! Test data generation for benchmarks.
//!
//! Datasets are generated from a fixed seed so runs are comparable.

use aggline::{Dataset, Order, Product, User};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Default seed for generated datasets.
pub const SEED: u64 = 42;

const CATEGORIES: [&str; 8] = [
    "Books", "Games", "Music", "Garden", "Toys", "Tools", "Sports", "Office",
];

/// Scale factor for benchmark data generation.
#[derive(Clone, Copy, Debug, Default)]
pub enum Scale {
    /// 100 users, 1,000 orders
    Small,
    /// 1,000 users, 20,000 orders
    #[default]
    Medium,
    /// 10,000 users, 200,000 orders
    Large,
}

impl Scale {
    /// Number of users.
    pub fn users(&self) -> usize {
        match self {
            Scale::Small => 100,
            Scale::Medium => 1_000,
            Scale::Large => 10_000,
        }
    }

    /// Number of products.
    pub fn products(&self) -> usize {
        self.users() / 4
    }

    /// Number of orders.
    pub fn orders(&self) -> usize {
        match self {
            Scale::Small => 1_000,
            Scale::Medium => 20_000,
            Scale::Large => 200_000,
        }
    }

    /// Label used in benchmark ids.
    pub fn name(&self) -> &'static str {
        match self {
            Scale::Small => "small",
            Scale::Medium => "medium",
            Scale::Large => "large",
        }
    }
}

/// Generate a dataset. About 2% of orders reference a user or product that
/// does not exist, so lookups exercise the exclusion path.
pub fn generate_dataset(scale: Scale, seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);

    let users: Vec<User> = (0..scale.users())
        .map(|i| User::new(format!("U{}", i), format!("user-{}", i)))
        .collect();

    let products: Vec<Product> = (0..scale.products())
        .map(|i| {
            let price = (rng.gen_range(100..10_000) as f64) / 100.0;
            Product::new(format!("P{}", i), CATEGORIES[i % CATEGORIES.len()], price)
        })
        .collect();

    let dangling_users = (scale.users() / 100).max(1);
    let dangling_products = (scale.products() / 100).max(1);
    let orders: Vec<Order> = (0..scale.orders())
        .map(|i| {
            Order::new(
                i as i64,
                format!("U{}", rng.gen_range(0..scale.users() + dangling_users)),
                format!("P{}", rng.gen_range(0..scale.products() + dangling_products)),
                rng.gen_range(1..10),
            )
        })
        .collect();

    Dataset::new(orders, users, products)
}
