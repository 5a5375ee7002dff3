//! Type system utilities and aliases.
//!
//! ## Modules
//!
//! - [`aliases`]: Type aliases for the `Arc<Mutex<T>>` shapes shared between threads.

pub mod aliases;

pub use aliases::*;
