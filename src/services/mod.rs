// Service exports
pub mod counters;
pub mod decisions;
pub mod registry;

pub use counters::{CounterError, CounterKey, CounterStore, MemoryCounterStore, RedisCounterStore};
pub use decisions::{DecisionLog, DecisionLogError, MemoryDecisionLog, PostgresDecisionLog};
pub use registry::{RegistryClient, RegistryError};
