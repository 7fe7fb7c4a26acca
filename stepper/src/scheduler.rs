use std::{
    cmp::Ordering,
    collections::BinaryHeap,
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError},
    thread::{self, JoinHandle},
    time::{Duration, Instant}
};

use log::error;

pub type Task = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle(pub u64);

/// Runs callbacks once after a delay.
pub trait Scheduler: Send + Sync {
    fn schedule_once(&self, delay: Duration, task: Task) -> TaskHandle;

    /// Returns `false` if the task already started or was never scheduled.
    fn cancel(&self, handle: TaskHandle) -> bool;

    /// Blocks until no task is running.
    fn drain(&self);
}

impl<T: Scheduler + ?Sized> Scheduler for Arc<T> {
    fn schedule_once(&self, delay: Duration, task: Task) -> TaskHandle {
        (**self).schedule_once(delay, task)
    }

    fn cancel(&self, handle: TaskHandle) -> bool {
        (**self).cancel(handle)
    }

    fn drain(&self) {
        (**self).drain();
    }
}

struct Pending {
    deadline: Instant,
    id: u64,
    task: Task
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.id == other.id
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Reversed: the heap top is the earliest deadline.
impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        other.deadline.cmp(&self.deadline)
            .then_with(|| other.id.cmp(&self.id))
    }
}

#[derive(Default)]
struct Queue {
    pending: BinaryHeap<Pending>,
    next_id: u64,
    running: bool,
    stopped: bool
}

#[derive(Default)]
struct Inner {
    queue: Mutex<Queue>,
    wakeup: Condvar,
    idle: Condvar
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn run(&self) {
        let mut queue = self.lock();
        while !queue.stopped {
            let now = Instant::now();
            let next_deadline = queue.pending.peek().map(|pending| pending.deadline);
            match next_deadline {
                None => {
                    queue = self.wakeup.wait(queue).unwrap_or_else(PoisonError::into_inner);
                }
                Some(deadline) if deadline > now => {
                    queue = self.wakeup
                        .wait_timeout(queue, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0;
                }
                Some(_) => {
                    let Some(next) = queue.pending.pop() else {
                        continue;
                    };

                    queue.running = true;
                    drop(queue);

                    if panic::catch_unwind(AssertUnwindSafe(next.task)).is_err() {
                        error!("Scheduled task #{} panicked", next.id);
                    }

                    queue = self.lock();
                    queue.running = false;
                    self.idle.notify_all();
                }
            }
        }
    }
}

/// One worker thread firing tasks in deadline order.
pub struct TimerScheduler {
    inner: Arc<Inner>,
    worker: Option<JoinHandle<()>>
}

impl TimerScheduler {
    /// # Errors
    ///
    /// Returns an error if the worker thread can't be spawned.
    pub fn new(name: &str) -> std::io::Result<Self> {
        let inner = Arc::new(Inner::default());
        let worker = thread::Builder::new()
            .name(name.to_string())
            .spawn({
                let inner = Arc::clone(&inner);
                move || inner.run()
            })?;

        Ok(Self { inner, worker: Some(worker) })
    }

    fn on_worker(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|worker| worker.thread().id() == thread::current().id())
    }
}

impl Scheduler for TimerScheduler {
    fn schedule_once(&self, delay: Duration, task: Task) -> TaskHandle {
        let mut queue = self.inner.lock();
        let id = queue.next_id;
        queue.next_id += 1;

        if !queue.stopped {
            queue.pending.push(Pending { deadline: Instant::now() + delay, id, task });
            self.inner.wakeup.notify_one();
        }

        TaskHandle(id)
    }

    fn cancel(&self, handle: TaskHandle) -> bool {
        let mut queue = self.inner.lock();
        let before = queue.pending.len();
        queue.pending.retain(|pending| pending.id != handle.0);
        queue.pending.len() != before
    }

    fn drain(&self) {
        // A task draining its own scheduler would wait for itself.
        if self.on_worker() {
            return;
        }

        let mut queue = self.inner.lock();
        while queue.running {
            queue = self.inner.idle.wait(queue).unwrap_or_else(PoisonError::into_inner);
        }
    }
}

impl Drop for TimerScheduler {
    fn drop(&mut self) {
        {
            let mut queue = self.inner.lock();
            queue.stopped = true;
            queue.pending.clear();
            self.inner.wakeup.notify_all();
        }

        if self.on_worker() {
            return;
        }

        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("Scheduler worker panicked");
            }
        }
    }
}
