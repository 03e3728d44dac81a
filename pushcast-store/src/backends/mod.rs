//! Backend implementations for the pushcast stores
//!
//! - `memory`: in-process storage guarded by locks
//! - `test`: memory storage with notification hooks and fault injection

pub mod memory;

pub use memory::{MemoryContactStore, MemoryHistoryStore, MemoryStatsStore};
pub use test::{TestContactStore, TestHistoryStore, TestStatsStore};
