use super::{error::TaskError, executor::TaskExecutor, future::Task};
use std::{future::Future, mem};

/// An ordered sequence of asynchronous steps threading a single owned value.
///
/// Each link receives the value produced by the previous link once it resolves, so links run strictly in
/// the order they were appended and never observe the value concurrently. Scheduling a link does not block.
///
/// The first error short-circuits every following link. After a failed [`TaskChain::join`] the chain
/// holds no value and further joins report [`TaskError::Consumed`].
pub struct TaskChain<T, E = TaskError> {
    executor: TaskExecutor,
    tail: Task<T, E>,
}

impl<T, E> TaskChain<T, E>
where
    T: Send + 'static,
    E: From<TaskError> + Send + 'static,
{
    pub fn new(executor: TaskExecutor, initial: T) -> Self {
        Self { executor, tail: Task::ok(initial) }
    }

    pub fn executor(&self) -> &TaskExecutor {
        &self.executor
    }

    /// Appends `link` to the chain
    pub fn then<F, Fut>(&mut self, link: F)
    where
        F: FnOnce(T) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let previous = self.take();
        self.tail = self.executor.spawn(async move { link(previous.await?).await });
    }

    /// Waits for all links appended so far and gives access to the resulting value.
    ///
    /// Must not be called from within an asynchronous context.
    pub fn join(&mut self) -> Result<&mut T, E> {
        let task = self.take();
        let value = self.executor.block_on(task)?;
        self.tail = Task::ok(value);
        self.tail.ready_mut().ok_or_else(|| TaskError::Consumed.into())
    }

    /// Converts the chain into the task resolving once every appended link completed
    pub fn into_task(self) -> Task<T, E> {
        self.tail
    }

    fn take(&mut self) -> Task<T, E> {
        mem::replace(&mut self.tail, Task::consumed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskRuntime;
    use std::{
        sync::{
            Arc,
            atomic::{AtomicBool, Ordering},
        },
        time::Duration,
    };

    #[test]
    fn test_links_run_in_order() {
        let runtime = TaskRuntime::new(2, 4).unwrap();
        let executor = runtime.executor();
        let mut chain: TaskChain<Vec<u64>> = executor.chain(Vec::new());
        for i in 0..64u64 {
            let computation = executor.compute(move || {
                // Later items finish their computation first
                std::thread::sleep(Duration::from_micros(64 - i));
                i
            });
            chain.then(move |mut seen| async move {
                seen.push(computation.await?);
                Ok::<_, TaskError>(seen)
            });
        }
        assert_eq!(chain.join().unwrap().clone(), (0..64).collect::<Vec<_>>());

        // The chain can keep growing after a join
        chain.then(|mut seen| async move {
            seen.clear();
            Ok::<_, TaskError>(seen)
        });
        assert!(chain.join().unwrap().is_empty());
    }

    #[test]
    fn test_join_is_repeatable() {
        let runtime = TaskRuntime::new(1, 1).unwrap();
        let executor = runtime.executor();
        let mut chain: TaskChain<u32> = executor.chain(7);
        assert_eq!(*chain.join().unwrap(), 7);
        *chain.join().unwrap() += 1;
        chain.then(|x| async move { Ok::<_, TaskError>(x * 2) });
        assert_eq!(*chain.join().unwrap(), 16);
        assert_eq!(*chain.join().unwrap(), 16);
    }

    #[test]
    fn test_error_short_circuits() {
        let runtime = TaskRuntime::new(1, 1).unwrap();
        let executor = runtime.executor();
        let reached = Arc::new(AtomicBool::new(false));
        let mut chain: TaskChain<u32> = executor.chain(1);
        chain.then(|x| async move { Ok::<_, TaskError>(x + 1) });
        chain.then(|_| async move { Err::<u32, _>(TaskError::Cancelled) });
        let flag = reached.clone();
        chain.then(move |x| async move {
            flag.store(true, Ordering::SeqCst);
            Ok::<_, TaskError>(x)
        });
        assert_eq!(chain.join().err(), Some(TaskError::Cancelled));
        assert_eq!(chain.join().err(), Some(TaskError::Consumed));
        assert!(!reached.load(Ordering::SeqCst));
    }

    #[test]
    fn test_into_task() {
        let runtime = TaskRuntime::new(1, 1).unwrap();
        let executor = runtime.executor();
        let mut chain: TaskChain<String> = executor.chain(String::from("a"));
        chain.then(|s| async move { Ok::<_, TaskError>(s + "b") });
        let task = chain.into_task();
        assert_eq!(executor.block_on(task), Ok("ab".to_string()));
    }
}
