//! Pool exhaustion and reuse (seed scenario 4).

mod common;

use std::sync::atomic::{AtomicU32, Ordering};

use lptask::sched::Scheduler;
use lptask::task::Task;
use sequential_test::sequential;

use common::VirtualPort;

static SCHEDULER: Scheduler<VirtualPort> = Scheduler::new();

static FIRE_COUNT: AtomicU32 = AtomicU32::new(0);

fn on_fire(_t: &Task, _d: *const u8, _n: u8) {
    FIRE_COUNT.fetch_add(1, Ordering::Relaxed);
}

lptask::task_pool!(POOL, VirtualPort, 4, 8);

#[test]
#[sequential]
fn pool_exhaustion_and_reuse() {
    common::init_logging();
    common::reset_clock();
    FIRE_COUNT.store(0, Ordering::Relaxed);
    SCHEDULER.init();

    let mut allocated = Vec::new();
    for _ in 0..4 {
        let task = POOL.alloc(&SCHEDULER).expect("pool should have a free slot");
        assert!(task.config(&SCHEDULER, on_fire, 20, false));
        assert!(task.start(&SCHEDULER));
        allocated.push(task);
    }
    assert_eq!(allocated.len(), 4);
    assert_eq!(POOL.allocated_count(), 4);
    assert_eq!(POOL.free_count(), 0);

    assert!(
        POOL.alloc(&SCHEDULER).is_none(),
        "the 5th alloc on a 4-slot pool must return None"
    );

    let mut elapsed = 0u32;
    while elapsed < 40 {
        let wait = SCHEDULER.step();
        let step = wait.min(40 - elapsed).max(1);
        common::advance(step);
        elapsed += step;
    }

    assert_eq!(FIRE_COUNT.load(Ordering::Relaxed), 4);
    assert_eq!(POOL.allocated_count(), 0);
    assert_eq!(POOL.free_count(), 4);

    let reused = POOL.alloc(&SCHEDULER);
    assert!(reused.is_some(), "a freed slot must be reusable");

    SCHEDULER.stop();
    SCHEDULER.run();
}

#[test]
#[sequential]
fn pool_alloc_rejected_before_scheduler_is_active() {
    assert!(POOL.alloc(&SCHEDULER).is_none());
}
