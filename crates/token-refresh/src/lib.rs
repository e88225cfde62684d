//! Deduplicated bearer-token refresh
//!
//! The HTTP pipeline calls `RefreshCoordinator::refresh_token` whenever an
//! upstream answers 401. Many requests can hit that at once; the coordinator
//! makes sure only one call to the registered handler is in flight and every
//! waiter receives that call's outcome.
//!
//! Lifecycle:
//! 1. Application registers a handler via `set_handler`
//! 2. First `refresh_token` while idle invokes the handler (state `Refreshing`)
//! 3. Concurrent `refresh_token` calls join the pending result
//! 4. On settlement (success or failure) the state returns to `Idle`
//! 5. The next call starts a fresh handler invocation; tokens are not cached

pub mod coordinator;
pub mod error;

pub use coordinator::RefreshCoordinator;
pub use error::{RefreshError, Result};
