pub mod in_memory_store;
pub mod schema;
pub mod sqlite_store;
pub mod store;

pub use in_memory_store::InMemoryVisitStore;
pub use sqlite_store::SqliteVisitStore;
pub use store::VisitStore;
