use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use crate::callback::BoxedCallback;

struct Shared {
    queue: Mutex<VecDeque<BoxedCallback>>,
    condvar: Condvar,
    shutdown: Mutex<bool>,
}

/// A fixed-size pool of worker threads that run scheduler callbacks off
/// the driver thread, so one slow or blocking callback never delays the
/// next tick from being computed.
///
/// A callback that panics is isolated with `catch_unwind`: the panic is
/// logged and the worker keeps pulling jobs. This is the one place the
/// workspace deliberately unwinds instead of aborting, which is why the
/// release profile does not set `panic = "abort"`.
pub struct WorkerPool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::new()),
            condvar: Condvar::new(),
            shutdown: Mutex::new(false),
        });

        let workers = (0..size)
            .map(|idx| {
                let shared = Arc::clone(&shared);
                thread::Builder::new()
                    .name(format!("araneid-worker-{idx}"))
                    .spawn(move || worker_loop(shared))
                    .expect("failed to spawn worker thread")
            })
            .collect();

        WorkerPool { shared, workers }
    }

    pub fn dispatch(&self, job: BoxedCallback) {
        let mut queue = self.shared.queue.lock().unwrap();
        queue.push_back(job);
        self.shared.condvar.notify_one();
    }

    pub fn shutdown(&mut self) {
        *self.shared.shutdown.lock().unwrap() = true;
        self.shared.condvar.notify_all();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            self.shutdown();
        }
    }
}

fn worker_loop(shared: Arc<Shared>) {
    loop {
        let job = {
            let mut queue = shared.queue.lock().unwrap();
            loop {
                if let Some(job) = queue.pop_front() {
                    break Some(job);
                }
                if *shared.shutdown.lock().unwrap() {
                    return;
                }
                queue = shared.condvar.wait(queue).unwrap();
            }
        };

        if let Some(job) = job {
            if let Err(panic) = panic::catch_unwind(AssertUnwindSafe(|| job())) {
                let message = panic_message(&panic);
                tracing::error!(%message, "scheduler callback panicked");
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
