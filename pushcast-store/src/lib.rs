pub mod backends;
pub mod config;
pub mod error;
pub mod r#trait;

pub use backends::{
    MemoryContactStore, MemoryHistoryStore, MemoryStatsStore, TestContactStore,
    TestHistoryStore, TestStatsStore,
};
pub use config::{StoreConfig, Stores};
pub use error::{Result, StoreError};
pub use r#trait::{ContactStore, HistoryStore, StatsStore};
