use std::thread::JoinHandle;

use commit_graph::CancelToken;
use parking_lot::Mutex;

/// A running thread plus the token that asks it to stop
pub struct TaskHandle<T> {
    cancel: CancelToken,
    thread: JoinHandle<T>,
}

impl<T> TaskHandle<T> {
    pub fn new(cancel: CancelToken, thread: JoinHandle<T>) -> Self {
        Self { cancel, thread }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Block until the thread exits. `None` if it panicked.
    pub fn join(self) -> Option<T> {
        self.thread.join().ok()
    }
}

/// Holds at most one task; starting a new one cancels and joins the old one first.
pub struct TaskSupervisor<T> {
    current: Mutex<Option<TaskHandle<T>>>,
}

impl<T> Default for TaskSupervisor<T> {
    fn default() -> Self {
        Self { current: Mutex::new(None) }
    }
}

impl<T> TaskSupervisor<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel and join the current task, then start a new one with a fresh token.
    ///
    /// Returns the superseded task's result, if there was one and it did not panic.
    /// Concurrent callers are serialized.
    pub fn replace<E>(
        &self,
        start: impl FnOnce(CancelToken) -> Result<JoinHandle<T>, E>,
    ) -> Result<Option<T>, E> {
        let mut current = self.current.lock();
        let previous = current.take().and_then(|task| {
            task.cancel();
            task.join()
        });

        let cancel = CancelToken::new();
        let thread = start(cancel.clone())?;
        *current = Some(TaskHandle::new(cancel, thread));
        Ok(previous)
    }

    /// Join the current task without cancelling it
    pub fn wait(&self) -> Option<T> {
        self.current.lock().take().and_then(TaskHandle::join)
    }

    /// Cancel and join the current task
    pub fn cancel(&self) -> Option<T> {
        self.current.lock().take().and_then(|task| {
            task.cancel();
            task.join()
        })
    }

    pub fn is_running(&self) -> bool {
        self.current.lock().as_ref().is_some_and(|task| !task.is_finished())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::thread;
    use std::time::Duration;

    fn spin_until_cancelled(cancel: CancelToken, label: &'static str) -> io::Result<JoinHandle<&'static str>> {
        thread::Builder::new().spawn(move || {
            while !cancel.is_cancelled() {
                thread::sleep(Duration::from_millis(1));
            }
            label
        })
    }

    #[test]
    fn replace_cancels_previous() {
        let supervisor = TaskSupervisor::new();
        let first = supervisor.replace(|c| spin_until_cancelled(c, "first")).unwrap();
        assert_eq!(first, None);
        assert!(supervisor.is_running());

        let previous = supervisor.replace(|c| spin_until_cancelled(c, "second")).unwrap();
        assert_eq!(previous, Some("first"));

        assert_eq!(supervisor.cancel(), Some("second"));
        assert!(!supervisor.is_running());
        assert_eq!(supervisor.wait(), None);
    }

    #[test]
    fn wait_returns_result() {
        let supervisor = TaskSupervisor::new();
        supervisor
            .replace(|_| thread::Builder::new().spawn(|| 7))
            .unwrap();
        assert_eq!(supervisor.wait(), Some(7));
    }

    #[test]
    fn failed_start_leaves_nothing_running() {
        let supervisor: TaskSupervisor<()> = TaskSupervisor::new();
        let err = supervisor.replace(|_| Err::<JoinHandle<()>, _>("no threads")).unwrap_err();
        assert_eq!(err, "no threads");
        assert!(!supervisor.is_running());
    }
}
