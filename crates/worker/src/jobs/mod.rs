pub mod runner;
pub mod store;

pub use store::PgFieldValueStore;
