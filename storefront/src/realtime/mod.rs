// storefront/src/realtime/mod.rs

//! Change events for dashboard listeners and the per-connection refetch throttle.

pub mod debounce;
pub mod hub;
pub mod sse;

pub use debounce::{EventDeduper, RefetchDebouncer};
pub use hub::{ChangeEvent, ChangeKey, ChangeTable, RealtimeHub};
pub use sse::refetch_stream;
