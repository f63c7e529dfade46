//! Task queues - hand work to the thread that owns it
//!
//! Tasks run in submission order. A task submitted with an identifier that
//! is already pending replaces the pending task in place, so a producer
//! that keeps resubmitting the same job never grows the queue.
//!
//! Two executors are provided:
//! - [`PollingTaskQueue`]: the owner thread drains it, e.g. once per tick
//! - [`ThreadedTaskQueue`]: a dedicated worker thread drains it

use std::collections::VecDeque;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};

use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::{Condvar, Mutex};

/// Unit of work
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Handle to a submitted task, used for cancellation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TaskToken(u64);

impl TaskToken {
    /// Raw value
    pub fn to_bits(&self) -> u64 {
        self.0
    }
}

/// FIFO execution context with coalescing submission
pub trait TaskQueue: Send + Sync {
    /// Queue a task
    fn add_task(&self, task: Task) -> TaskToken;

    /// Queue a task under `id`. If a task with the same id is still
    /// pending it is replaced and keeps its position and token.
    fn add_coalesced(&self, id: u64, task: Task) -> TaskToken;

    /// Remove a task that has not started yet
    fn cancel_task(&self, token: TaskToken) -> bool;

    /// Number of tasks waiting to run
    fn pending(&self) -> usize;
}

struct Entry {
    token: TaskToken,
    id: Option<u64>,
    task: Task,
}

#[derive(Default)]
struct QueueState {
    entries: VecDeque<Entry>,
    next_token: u64,
}

impl QueueState {
    fn push(&mut self, id: Option<u64>, task: Task) -> TaskToken {
        if let Some(id) = id {
            if let Some(entry) = self.entries.iter_mut().find(|e| e.id == Some(id)) {
                entry.task = task;
                return entry.token;
            }
        }
        self.next_token += 1;
        let token = TaskToken(self.next_token);
        self.entries.push_back(Entry { token, id, task });
        token
    }

    fn cancel(&mut self, token: TaskToken) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.token != token);
        before != self.entries.len()
    }

    fn take_batch(&mut self) -> Vec<Entry> {
        self.entries.drain(..).collect()
    }
}

fn run_batch(queue: &str, batch: Vec<Entry>) -> usize {
    let count = batch.len();
    for entry in batch {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(entry.task)) {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            log::error!("{}: task {:?} panicked: {}", queue, entry.token, message);
        }
    }
    count
}

/// Queue drained explicitly by its owner thread
pub struct PollingTaskQueue {
    name: String,
    state: Mutex<QueueState>,
}

impl PollingTaskQueue {
    /// Create an empty queue
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(QueueState::default()),
        }
    }

    /// Queue name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run every task queued so far. Tasks queued while the batch runs
    /// wait for the next call. Returns how many tasks ran.
    pub fn process_tasks(&self) -> usize {
        let batch = self.state.lock().take_batch();
        if batch.is_empty() {
            return 0;
        }
        log::trace!("{}: running {} tasks", self.name, batch.len());
        run_batch(&self.name, batch)
    }
}

impl TaskQueue for PollingTaskQueue {
    fn add_task(&self, task: Task) -> TaskToken {
        self.state.lock().push(None, task)
    }

    fn add_coalesced(&self, id: u64, task: Task) -> TaskToken {
        self.state.lock().push(Some(id), task)
    }

    fn cancel_task(&self, token: TaskToken) -> bool {
        self.state.lock().cancel(token)
    }

    fn pending(&self) -> usize {
        self.state.lock().entries.len()
    }
}

impl fmt::Debug for PollingTaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollingTaskQueue")
            .field("name", &self.name)
            .field("pending", &self.pending())
            .finish()
    }
}

struct Shared {
    name: String,
    state: Mutex<QueueState>,
    // true while the worker runs a batch; guards batch hand-off for `wait`
    running: Mutex<bool>,
    idle: Condvar,
    stop: AtomicBool,
    worker: Mutex<Option<ThreadId>>,
}

impl Shared {
    fn next_batch(&self) -> Option<Vec<Entry>> {
        let mut running = self.running.lock();
        let batch = self.state.lock().take_batch();
        if batch.is_empty() {
            *running = false;
            self.idle.notify_all();
            None
        } else {
            *running = true;
            Some(batch)
        }
    }

    fn worker_loop(&self, wake: Receiver<()>) {
        *self.worker.lock() = Some(thread::current().id());
        log::debug!("{}: worker started", self.name);
        while wake.recv().is_ok() {
            while let Some(batch) = self.next_batch() {
                run_batch(&self.name, batch);
            }
            if self.stop.load(Ordering::Acquire) {
                break;
            }
        }
        log::debug!("{}: worker stopped", self.name);
    }
}

/// Queue drained by its own worker thread
pub struct ThreadedTaskQueue {
    shared: Arc<Shared>,
    wake: Sender<()>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ThreadedTaskQueue {
    /// Spawn the worker thread
    pub fn new(name: impl Into<String>) -> std::io::Result<Self> {
        let name = name.into();
        let shared = Arc::new(Shared {
            name: name.clone(),
            state: Mutex::new(QueueState::default()),
            running: Mutex::new(false),
            idle: Condvar::new(),
            stop: AtomicBool::new(false),
            worker: Mutex::new(None),
        });
        let (wake, receiver) = bounded(1);
        let worker = shared.clone();
        let handle = thread::Builder::new()
            .name(name)
            .spawn(move || worker.worker_loop(receiver))?;
        Ok(Self {
            shared,
            wake,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Queue name
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Block until every queued task has run. Returns immediately when
    /// called from the worker itself.
    pub fn wait(&self) {
        if *self.shared.worker.lock() == Some(thread::current().id()) {
            log::warn!("{}: wait() called from the worker thread", self.shared.name);
            return;
        }
        let mut running = self.shared.running.lock();
        while *running || !self.shared.state.lock().entries.is_empty() {
            if self.handle.lock().is_none() {
                break;
            }
            self.shared.idle.wait(&mut running);
        }
    }

    /// Run the remaining tasks and join the worker
    pub fn shutdown(&self) {
        let Some(handle) = self.handle.lock().take() else {
            return;
        };
        self.shared.stop.store(true, Ordering::Release);
        self.notify();
        if handle.join().is_err() {
            log::error!("{}: worker thread panicked", self.shared.name);
        }
        // Wake anyone still in `wait`
        let _running = self.shared.running.lock();
        self.shared.idle.notify_all();
    }

    fn notify(&self) {
        // A full channel means a wake-up is already pending
        let _ = self.wake.try_send(());
    }

    fn submit(&self, id: Option<u64>, task: Task) -> TaskToken {
        if self.shared.stop.load(Ordering::Acquire) {
            log::warn!("{}: task queued after shutdown will not run", self.shared.name);
        }
        let token = self.shared.state.lock().push(id, task);
        self.notify();
        token
    }
}

impl TaskQueue for ThreadedTaskQueue {
    fn add_task(&self, task: Task) -> TaskToken {
        self.submit(None, task)
    }

    fn add_coalesced(&self, id: u64, task: Task) -> TaskToken {
        self.submit(Some(id), task)
    }

    fn cancel_task(&self, token: TaskToken) -> bool {
        self.shared.state.lock().cancel(token)
    }

    fn pending(&self) -> usize {
        self.shared.state.lock().entries.len()
    }
}

impl Drop for ThreadedTaskQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for ThreadedTaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadedTaskQueue")
            .field("name", &self.shared.name)
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<u32>>>, impl Fn(u32) -> Task) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        let make = move |n: u32| -> Task {
            let sink = sink.clone();
            Box::new(move || sink.lock().push(n))
        };
        (log, make)
    }

    #[test]
    fn test_fifo_order() {
        let queue = PollingTaskQueue::new("test");
        let (log, task) = recorder();
        queue.add_task(task(1));
        queue.add_task(task(2));
        queue.add_task(task(3));
        assert_eq!(queue.pending(), 3);
        assert_eq!(queue.process_tasks(), 3);
        assert_eq!(*log.lock(), vec![1, 2, 3]);
    }

    #[test]
    fn test_coalescing_keeps_position_and_token() {
        let queue = PollingTaskQueue::new("test");
        let (log, task) = recorder();
        let first = queue.add_coalesced(7, task(1));
        queue.add_task(task(2));
        let second = queue.add_coalesced(7, task(3));
        assert_eq!(first, second);
        assert_eq!(queue.pending(), 2);
        queue.process_tasks();
        assert_eq!(*log.lock(), vec![3, 2]);
    }

    #[test]
    fn test_cancel() {
        let queue = PollingTaskQueue::new("test");
        let (log, task) = recorder();
        let token = queue.add_task(task(1));
        queue.add_task(task(2));
        assert!(queue.cancel_task(token));
        assert!(!queue.cancel_task(token));
        queue.process_tasks();
        assert_eq!(*log.lock(), vec![2]);
    }

    #[test]
    fn test_panicking_task_does_not_stop_batch() {
        let queue = PollingTaskQueue::new("test");
        let (log, task) = recorder();
        queue.add_task(Box::new(|| panic!("boom")));
        queue.add_task(task(5));
        assert_eq!(queue.process_tasks(), 2);
        assert_eq!(*log.lock(), vec![5]);
    }

    #[test]
    fn test_threaded_wait() {
        let queue = ThreadedTaskQueue::new("worker").unwrap();
        let (log, task) = recorder();
        for n in 0..10 {
            queue.add_task(task(n));
        }
        queue.wait();
        assert_eq!(*log.lock(), (0..10).collect::<Vec<_>>());
        queue.shutdown();
    }

    #[test]
    fn test_threaded_shutdown_drains() {
        let queue = ThreadedTaskQueue::new("worker").unwrap();
        let (log, task) = recorder();
        queue.add_task(task(1));
        drop(queue);
        assert_eq!(*log.lock(), vec![1]);
    }
}
