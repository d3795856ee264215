//! Atomic sequence ids backed by a shared counter store.
//!
//! `tally` hands out unique, monotonically increasing `u64` ids to callers
//! that may run concurrently across processes and machines. All shared state
//! lives in a [`CounterStore`]: one record per sequence key, mutated only
//! through the store's atomic single-document operations. Nothing is cached
//! in process, so every generator sharing a store also shares its guarantees.
//!
//! - [`SequenceGenerator`] runs the two-phase increment protocol for one
//!   [`GeneratorConfig`].
//! - [`GeneratorRegistry`] maps entity types to their configuration.
//! - [`IdAllocator`] ties both together behind `next_id(entity)`.
//!
//! ## Features
//!
//! - `memory` (default): [`MemoryCounterStore`], an in-process store.
//! - `async-tokio`: [`TimeoutStore`], bounding store calls with tokio timers.
//! - `serde`: declarative registry configuration (`RegistryConfig`).
//! - `tracing`: spans and events around every allocation.
//!
//! ## Guarantees
//!
//! Ids for one key are never issued twice. They are not guaranteed to be
//! gap free: a cancelled call, a timed-out call, or two callers racing to
//! create the same counter can all skip values.

mod allocator;
mod config;
mod error;
mod generator;
mod registry;
mod store;

pub use crate::allocator::*;
pub use crate::config::*;
pub use crate::error::*;
pub use crate::generator::*;
pub use crate::registry::*;
pub use crate::store::*;
