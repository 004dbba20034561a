pub mod postgres;
pub mod store;

pub use postgres::{create_pool, run_migrations};
pub use store::{GiftStore, PostgresGiftStore};

#[cfg(test)]
pub use store::MockGiftStore;
