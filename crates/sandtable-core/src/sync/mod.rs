//! Synchronisation primitives shared by the background loops
//!
//! - [`BoundedQueue`]: fixed-capacity blocking FIFO, the only channel between
//!   callers and the transport loop.
//! - [`CancellationToken`]: cooperative stop signal checked once per loop
//!   iteration.

pub mod cancel;
pub mod queue;

pub use cancel::CancellationToken;
pub use queue::BoundedQueue;
