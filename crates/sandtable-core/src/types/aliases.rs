//! Type aliases for commonly used shared-state types.
//!
//! The host runs a handful of cooperating threads (caller, worker loop,
//! transport loop). Anything they share goes through one of these aliases so
//! the locking primitive is chosen in one place.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sandtable_core::types::*;
//!
//! // Instead of: Arc<Mutex<VecDeque<Job>>>
//! let jobs: ThreadSafeDeque<Job> = thread_safe_deque();
//! ```

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// A thread-safe optional slot for state that is filled in later, such as
/// the job a background loop is working on.
///
/// Uses `parking_lot::Mutex`, so locking never returns a poison error.
pub type ThreadSafeOption<T> = Arc<Mutex<Option<T>>>;

/// A thread-safe deque for cross-thread FIFO hand-off.
pub type ThreadSafeDeque<T> = Arc<Mutex<VecDeque<T>>>;

/// Create a new `ThreadSafeOption<T>` initialized to `None`.
#[inline]
pub fn thread_safe_none<T>() -> ThreadSafeOption<T> {
    Arc::new(Mutex::new(None))
}

/// Create a new empty `ThreadSafeDeque<T>`.
#[inline]
pub fn thread_safe_deque<T>() -> ThreadSafeDeque<T> {
    Arc::new(Mutex::new(VecDeque::new()))
}
