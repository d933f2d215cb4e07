//! Application layer: use cases orchestrating domain logic and infrastructure.
//!
//! Each use case depends only on domain types from `nestboard-core` and on
//! traits defined next to it.  Infrastructure implementations are injected at
//! construction time, so every use case is unit-testable with recording mocks.

pub mod health;
pub mod process_gesture;
pub mod sync_ime;
