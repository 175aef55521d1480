use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use araneid_lib::callback::boxed;
use araneid_lib::time::TimeDelta;
use araneid_lib::Scheduler;

/// Both invariants below share the process-wide scheduler singleton, so
/// they run in one test rather than two: parallel `#[test]` threads
/// hitting the same `Scheduler::global()` would race each other's
/// `start`/`stop` calls.
#[test]
fn scheduler_dispatch_and_cadence_invariants() {
    let scheduler = Scheduler::global();
    scheduler.start(2);

    let order: Arc<std::sync::Mutex<Vec<u8>>> = Arc::new(std::sync::Mutex::new(Vec::new()));
    let o1 = order.clone();
    scheduler.schedule_once(TimeDelta::millis(60), boxed(move || o1.lock().unwrap().push(3)));
    let o2 = order.clone();
    scheduler.schedule_once(TimeDelta::millis(10), boxed(move || o2.lock().unwrap().push(1)));
    let o3 = order.clone();
    scheduler.schedule_once(TimeDelta::millis(30), boxed(move || o3.lock().unwrap().push(2)));

    let count = Arc::new(AtomicUsize::new(0));
    let c = count.clone();
    scheduler.schedule_periodic(
        TimeDelta::millis(20),
        TimeDelta::millis(20),
        boxed(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }),
    );

    std::thread::sleep(Duration::from_millis(200));
    scheduler.stop();

    assert_eq!(*order.lock().unwrap(), vec![1, 2, 3], "tasks must dispatch in non-decreasing fire-time order");

    let fired = count.load(Ordering::SeqCst);
    assert!(fired >= 4, "expected at least 4 firings in 200ms at a 20ms cadence, got {fired}");
}
