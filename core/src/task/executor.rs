use super::{
    chain::TaskChain,
    error::{TaskError, TaskResult, panic_message},
    future::{Computation, Task},
};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::{
    future::Future,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};
use tokio::{
    runtime::{Builder, Handle, Runtime},
    sync::oneshot,
};

/// Owns the threads backing a [`TaskExecutor`].
///
/// The runtime must be dropped from a synchronous context, after all work depending on it has been joined.
pub struct TaskRuntime {
    runtime: Runtime,
    pool: Arc<ThreadPool>,
}

impl TaskRuntime {
    /// Builds a runtime with `runtime_threads` async workers and `pool_threads` compute threads.
    /// Zero `runtime_threads` means a quarter of the logical cores, with a minimum of two.
    /// Zero `pool_threads` means one per logical core.
    pub fn new(runtime_threads: usize, pool_threads: usize) -> TaskResult<Self> {
        let runtime_threads = if runtime_threads == 0 { (num_cpus::get() / 4).max(2) } else { runtime_threads };
        let runtime = Builder::new_multi_thread()
            .worker_threads(runtime_threads)
            .thread_name("blockstream-async")
            .build()
            .map_err(|err| TaskError::Build(err.to_string()))?;
        let pool = ThreadPoolBuilder::new()
            .num_threads(pool_threads)
            .thread_name(|i| format!("blockstream-pool-{i}"))
            .build()
            .map_err(|err| TaskError::Build(err.to_string()))?;
        Ok(Self { runtime, pool: Arc::new(pool) })
    }

    pub fn with_available_cores() -> TaskResult<Self> {
        Self::new(0, 0)
    }

    pub fn executor(&self) -> TaskExecutor {
        TaskExecutor { handle: self.runtime.handle().clone(), pool: self.pool.clone() }
    }
}

/// A cheaply cloneable handle for scheduling work on a [`TaskRuntime`]
#[derive(Clone)]
pub struct TaskExecutor {
    handle: Handle,
    pool: Arc<ThreadPool>,
}

impl TaskExecutor {
    /// Runs `f` on the compute pool. A panic inside `f` resolves to [`TaskError::Panicked`].
    pub fn compute<T, F>(&self, f: F) -> Computation<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (sender, receiver) = oneshot::channel();
        self.pool.spawn(move || {
            let result =
                panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| TaskError::Panicked(panic_message(payload.as_ref())));
            // The receiver may have been dropped, in which case nobody needs the result
            sender.send(result).ok();
        });
        Computation::new(receiver)
    }

    /// Spawns `future` on the async runtime
    pub fn spawn<T, E, F>(&self, future: F) -> Task<T, E>
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        Task::spawned(self.handle.spawn(future))
    }

    /// Blocks the current thread on `future`. Must not be called from within an asynchronous context.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.handle.block_on(future)
    }

    /// Starts a new chain of ordered steps from `initial`
    pub fn chain<T, E>(&self, initial: T) -> TaskChain<T, E>
    where
        T: Send + 'static,
        E: From<TaskError> + Send + 'static,
    {
        TaskChain::new(self.clone(), initial)
    }

    pub fn pool_threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute() {
        let runtime = TaskRuntime::new(1, 2).unwrap();
        let executor = runtime.executor();
        let computations = (0..32u64).map(|i| executor.compute(move || (0..=i).sum::<u64>())).collect::<Vec<_>>();
        let results = executor.block_on(async {
            let mut results = Vec::new();
            for computation in computations {
                results.push(computation.await.unwrap());
            }
            results
        });
        assert_eq!(results, (0..32u64).map(|i| i * (i + 1) / 2).collect::<Vec<_>>());
        assert_eq!(executor.pool_threads(), 2);
    }

    #[test]
    fn test_compute_panic() {
        let runtime = TaskRuntime::new(1, 1).unwrap();
        let executor = runtime.executor();
        let result = executor.compute(|| -> u32 { panic!("leaf hashing failed") }).wait();
        assert_eq!(result, Err(TaskError::Panicked("leaf hashing failed".to_string())));
        // The pool survives the panic
        assert_eq!(executor.compute(|| 7).wait(), Ok(7));
    }

    #[test]
    fn test_spawn_panic() {
        let runtime = TaskRuntime::new(1, 1).unwrap();
        let executor = runtime.executor();
        let fail = true;
        let task: Task<u32> = executor.spawn(async move {
            if fail {
                panic!("boom");
            }
            Ok::<u32, TaskError>(1)
        });
        assert_eq!(executor.block_on(task), Err(TaskError::Panicked("boom".to_string())));
    }

    #[test]
    fn test_task_consumed() {
        let runtime = TaskRuntime::new(1, 1).unwrap();
        let executor = runtime.executor();
        let mut task: Task<u32> = executor.spawn(async { Ok::<u32, TaskError>(3) });
        assert_eq!(executor.block_on(&mut task), Ok(3));
        assert!(task.is_finished());
        assert_eq!(executor.block_on(&mut task), Err(TaskError::Consumed));
    }
}
