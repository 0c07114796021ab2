//! Asynchronous execution primitives.
//!
//! A [`TaskRuntime`] owns a tokio runtime, which drives the ordering logic, and a rayon pool, which runs
//! the CPU bound work. Ordering between dependent steps is expressed with [`TaskChain`]: every link takes
//! ownership of the value produced by the previous link, so no locks are needed to serialize mutations.

mod chain;
mod error;
mod executor;
mod future;

pub use chain::TaskChain;
pub use error::{TaskError, TaskResult, panic_message};
pub use executor::{TaskExecutor, TaskRuntime};
pub use future::{Computation, Task};
