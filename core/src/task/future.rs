use super::error::{TaskError, TaskResult};
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll, ready},
};
use tokio::{sync::oneshot, task::JoinHandle};

enum TaskState<T, E> {
    Ready(Option<Result<T, E>>),
    Spawned(JoinHandle<Result<T, E>>),
}

/// A unit of asynchronous work producing a `Result<T, E>`.
///
/// A task is either already resolved or running on the executor runtime. Its result can be taken
/// exactly once; polling a task again after completion yields [`TaskError::Consumed`].
/// Dropping a spawned task detaches it, the work keeps running to completion.
pub struct Task<T, E = TaskError> {
    state: TaskState<T, E>,
}

// The state is never structurally pinned
impl<T, E> Unpin for Task<T, E> {}

impl<T, E> Task<T, E> {
    pub fn ready(result: Result<T, E>) -> Self {
        Self { state: TaskState::Ready(Some(result)) }
    }

    pub fn ok(value: T) -> Self {
        Self::ready(Ok(value))
    }

    /// A task whose result was already taken
    pub fn consumed() -> Self {
        Self { state: TaskState::Ready(None) }
    }

    pub(crate) fn spawned(handle: JoinHandle<Result<T, E>>) -> Self {
        Self { state: TaskState::Spawned(handle) }
    }

    pub fn is_finished(&self) -> bool {
        match &self.state {
            TaskState::Ready(_) => true,
            TaskState::Spawned(handle) => handle.is_finished(),
        }
    }

    /// Mutable access to the resolved success value, if any
    pub fn ready_mut(&mut self) -> Option<&mut T> {
        match &mut self.state {
            TaskState::Ready(Some(Ok(value))) => Some(value),
            _ => None,
        }
    }
}

impl<T, E: From<TaskError>> Future for Task<T, E> {
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let joined = match &mut this.state {
            TaskState::Ready(result) => return Poll::Ready(result.take().unwrap_or_else(|| Err(TaskError::Consumed.into()))),
            TaskState::Spawned(handle) => ready!(Pin::new(handle).poll(cx)),
        };
        this.state = TaskState::Ready(None);
        Poll::Ready(joined.unwrap_or_else(|err| Err(TaskError::from(err).into())))
    }
}

/// The pending result of a closure running on the compute pool
pub struct Computation<T> {
    receiver: oneshot::Receiver<TaskResult<T>>,
}

impl<T> Computation<T> {
    pub(crate) fn new(receiver: oneshot::Receiver<TaskResult<T>>) -> Self {
        Self { receiver }
    }

    /// Blocks the current thread until the computation completes.
    ///
    /// Must not be called from within an asynchronous context.
    pub fn wait(self) -> TaskResult<T> {
        self.receiver.blocking_recv().unwrap_or(Err(TaskError::Dropped))
    }
}

impl<T> Future for Computation<T> {
    type Output = TaskResult<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver).poll(cx).map(|received| received.unwrap_or(Err(TaskError::Dropped)))
    }
}
