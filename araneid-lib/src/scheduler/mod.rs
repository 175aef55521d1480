mod pool;
mod task;

pub use pool::WorkerPool;
pub use task::{TaskId, TimedTask};

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};
use std::sync::{Condvar, Mutex, OnceLock};
use std::thread::JoinHandle;

use crate::callback::BoxedCallback;
use crate::time::{TimeDelta, TimePoint};

struct State {
    heap: BinaryHeap<Reverse<TimedTask>>,
    cancelled: HashSet<TaskId>,
    next_id: TaskId,
    running: bool,
}

/// The process-wide virtual-time driver.
///
/// A single `Scheduler` owns the priority queue of pending tasks and the
/// worker pool that executes them. Access is through [`Scheduler::global`],
/// a lazily-initialized singleton — mirroring the original's
/// `Simulator::GetInstance()` — rather than threading a reference through
/// every device and transmission.
pub struct Scheduler {
    state: Mutex<State>,
    condvar: Condvar,
    pool: Mutex<Option<WorkerPool>>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

static INSTANCE: OnceLock<Scheduler> = OnceLock::new();

impl Scheduler {
    pub fn global() -> &'static Scheduler {
        INSTANCE.get_or_init(|| Scheduler {
            state: Mutex::new(State {
                heap: BinaryHeap::new(),
                cancelled: HashSet::new(),
                next_id: 0,
                running: false,
            }),
            condvar: Condvar::new(),
            pool: Mutex::new(None),
            driver: Mutex::new(None),
        })
    }

    /// Starts the driver thread and a worker pool of `worker_count` threads.
    /// Idempotent: calling `start` on an already-running scheduler is a
    /// no-op, since simulations are expected to call it exactly once but
    /// device setup code may race to do so.
    pub fn start(&'static self, worker_count: usize) {
        let mut state = self.state.lock().unwrap();
        if state.running {
            return;
        }
        state.running = true;
        drop(state);

        *self.pool.lock().unwrap() = Some(WorkerPool::new(worker_count));

        let handle = std::thread::Builder::new()
            .name("araneid-scheduler".to_string())
            .spawn(move || self.drive())
            .expect("failed to spawn scheduler driver thread");
        *self.driver.lock().unwrap() = Some(handle);
    }

    /// Stops the driver loop and joins the worker pool. Pending one-shot
    /// and periodic tasks are dropped unfired; callers that need drain
    /// semantics should track completion themselves via their callbacks.
    pub fn stop(&'static self) {
        {
            let mut state = self.state.lock().unwrap();
            if !state.running {
                return;
            }
            state.running = false;
        }
        self.condvar.notify_all();

        if let Some(handle) = self.driver.lock().unwrap().take() {
            let _ = handle.join();
        }
        if let Some(mut pool) = self.pool.lock().unwrap().take() {
            pool.shutdown();
        }
    }

    pub fn schedule_once(&'static self, delay: TimeDelta, callback: BoxedCallback) -> TaskId {
        self.insert(delay, None, callback)
    }

    pub fn schedule_periodic(
        &'static self,
        initial_delay: TimeDelta,
        period: TimeDelta,
        callback: BoxedCallback,
    ) -> TaskId {
        self.insert(initial_delay, Some(period), callback)
    }

    /// Marks a task as cancelled. Safe to call from within a running
    /// callback (re-entrant scheduling) because it only ever takes the
    /// state lock, which the driver thread releases before invoking any
    /// callback.
    pub fn cancel(&'static self, id: TaskId) {
        let mut state = self.state.lock().unwrap();
        state.cancelled.insert(id);
    }

    fn insert(&'static self, delay: TimeDelta, period: Option<TimeDelta>, callback: BoxedCallback) -> TaskId {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id;
        state.next_id += 1;
        let task = TimedTask { id, fire_at: TimePoint::now() + delay, period, callback };
        state.heap.push(Reverse(task));
        drop(state);
        self.condvar.notify_all();
        id
    }

    fn drive(&'static self) {
        loop {
            let task = {
                let mut state = self.state.lock().unwrap();
                loop {
                    if !state.running {
                        return;
                    }
                    match state.heap.peek() {
                        None => {
                            state = self.condvar.wait(state).unwrap();
                        }
                        Some(Reverse(earliest)) => {
                            let now = TimePoint::now();
                            if earliest.fire_at <= now {
                                let Reverse(task) = state.heap.pop().unwrap();
                                if state.cancelled.remove(&task.id) {
                                    continue;
                                }
                                break task;
                            }
                            let wait_for = earliest.fire_at.duration_since(now).to_std();
                            let (guard, _) = self.condvar.wait_timeout(state, wait_for).unwrap();
                            state = guard;
                        }
                    }
                }
            };

            if let Some(period) = task.period {
                let mut state = self.state.lock().unwrap();
                if !state.cancelled.contains(&task.id) {
                    state.heap.push(Reverse(TimedTask {
                        id: task.id,
                        fire_at: task.fire_at + period,
                        period: Some(period),
                        callback: task.callback.clone(),
                    }));
                }
            }

            if let Some(pool) = self.pool.lock().unwrap().as_ref() {
                pool.dispatch(task.callback);
            }
        }
    }
}
