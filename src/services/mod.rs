//! Room services used by the websocket and admin routes.
//!
//! ARCHITECTURE
//! ============
//! `room` is the coordinator: one actor per room that owns a `queue`, a
//! `ledger`, the `fanout` session registry, the `ghost` simulator and the
//! statements `pool`. The other modules are plain synchronous state (plus
//! the async pool fetch) with no knowledge of tasks or channels.

pub mod fanout;
pub mod ghost;
pub mod ledger;
pub mod noise;
pub mod pool;
pub mod queue;
pub mod room;
