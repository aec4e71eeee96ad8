//! Database layer

pub mod users;

pub use users::{MemoryUserStore, PgUserStore, UserRecord, UserStore, UserStoreError};
