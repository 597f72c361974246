//! Repository layer for database persistence.
//!
//! All database access uses Diesel with diesel-async's SQLite wrapper.

pub mod context;
pub mod models;
pub mod pool;
pub mod property;
pub mod provider;
pub mod review;
pub mod reviewer;
pub mod store;
pub mod util;

pub use context::DbContext;
pub use pool::{AsyncSqlitePool, DieselError};
pub use property::PropertyRepository;
pub use provider::ProviderRepository;
pub use review::ReviewRepository;
pub use reviewer::ReviewerRepository;
pub use store::DieselStore;
