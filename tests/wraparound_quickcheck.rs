//! Counter-wrap correctness plus property tests for the wraparound arithmetic
//! and the idempotent-stop / config-start-roundtrip laws, run across randomized
//! `u32` time values including ones deliberately chosen near the `2^32`
//! wraparound boundary. The wraparound properties drive a real `Task` through
//! `VirtualPort`'s simulated clock rather than reimplementing the arithmetic
//! inline, so a regression in `Task::elapsed_ms`/`Task::remaining_ms` itself
//! would fail them.

mod common;

use quickcheck::TestResult;
use quickcheck_macros::quickcheck;
use sequential_test::sequential;

use lptask::sched::Scheduler;
use lptask::task::Task;
use lptask::TaskState;

use common::VirtualPort;

static SCHEDULER: Scheduler<VirtualPort> = Scheduler::new();

fn noop(_t: &Task, _d: *const u8, _n: u8) {}

lptask::static_task!(WRAP_TASK);

#[test]
#[sequential]
fn counter_wrap_correctness() {
    common::init_logging();
    common::set_clock(0xFFFF_FFF0);
    SCHEDULER.init();
    assert!(WRAP_TASK.config(&SCHEDULER, noop, 100, false));
    assert!(WRAP_TASK.start(&SCHEDULER));

    // 0xFFFF_FFF0 + 200 wraps past u32::MAX and lands at 184 (200 - 16).
    common::advance(200);
    assert_eq!(WRAP_TASK.remaining_ms::<VirtualPort>(), 0);
    assert!(WRAP_TASK.is_expired::<VirtualPort>());

    SCHEDULER.step();
    assert_eq!(WRAP_TASK.state(), TaskState::Stopped);

    SCHEDULER.stop();
    SCHEDULER.run();
}

lptask::static_task!(PROP_TASK);

/// Resets `PROP_TASK` to `Stopped` so the next property iteration can reconfigure
/// it, without tearing down the (still `Active`) scheduler itself.
fn reset_prop_task() {
    if PROP_TASK.is_active() {
        assert!(PROP_TASK.stop(&SCHEDULER));
    }
}

/// `elapsed + remaining == interval` at any point up to and including the moment
/// of expiration, for any start time and interval — including pairs that wrap the
/// `u32` counter. Once a task is actually overdue, `remaining` clamps to `0` rather
/// than going negative (a deliberate, documented saturation, not a wraparound), so
/// the exact equality only holds for `elapsed <= interval`; this property picks
/// `elapsed` from within that window on every run and reads it back off a real
/// `Task` driven by `VirtualPort`'s simulated clock.
#[quickcheck]
#[sequential]
fn elapsed_plus_remaining_equals_interval(start: u32, interval_raw: u32, frac: u8) -> TestResult {
    common::init_logging();
    SCHEDULER.init();
    reset_prop_task();

    let interval = interval_raw.max(1);
    let elapsed = ((interval as u64) * (frac as u64) / 255) as u32;

    common::set_clock(start);
    if !PROP_TASK.config(&SCHEDULER, noop, interval, false) || !PROP_TASK.start(&SCHEDULER) {
        return TestResult::discard();
    }

    common::set_clock(start.wrapping_add(elapsed));
    let computed_elapsed = PROP_TASK.elapsed_ms::<VirtualPort>();
    let remaining = PROP_TASK.remaining_ms::<VirtualPort>();
    TestResult::from_bool(computed_elapsed == elapsed && computed_elapsed + remaining == interval)
}

/// Once elapsed time exceeds the interval, `remaining` is always exactly `0` —
/// never wraps around to a large value — for any start/interval/overshoot, read
/// back off a real `Task` rather than the raw arithmetic.
#[quickcheck]
#[sequential]
fn remaining_is_zero_once_overdue(start: u32, interval_raw: u32, overshoot_raw: u32) -> TestResult {
    common::init_logging();
    SCHEDULER.init();
    reset_prop_task();

    let interval = interval_raw.max(1);
    let overshoot = overshoot_raw.max(1);
    let elapsed = interval.saturating_add(overshoot).min(u32::MAX);
    if elapsed < interval {
        // The saturating add above clamped; not a useful overdue case.
        return TestResult::discard();
    }

    common::set_clock(start);
    if !PROP_TASK.config(&SCHEDULER, noop, interval, false) || !PROP_TASK.start(&SCHEDULER) {
        return TestResult::discard();
    }

    common::set_clock(start.wrapping_add(elapsed));
    TestResult::from_bool(PROP_TASK.remaining_ms::<VirtualPort>() == 0)
}

lptask::static_task!(IDEMPOTENT_TASK);

#[test]
#[sequential]
fn idempotent_stop_law() {
    common::init_logging();
    common::reset_clock();
    SCHEDULER.init();

    for interval in [1u32, 42, 9_999] {
        assert!(IDEMPOTENT_TASK.config(&SCHEDULER, noop, interval, true));
        assert!(IDEMPOTENT_TASK.start(&SCHEDULER));
        // Stopping twice in a row on an ACTIVE-then-STOPPED task returns true
        // both times and leaves it STOPPED.
        assert!(IDEMPOTENT_TASK.stop(&SCHEDULER));
        assert!(IDEMPOTENT_TASK.stop(&SCHEDULER));
        assert_eq!(IDEMPOTENT_TASK.state(), TaskState::Stopped);
    }

    SCHEDULER.stop();
    SCHEDULER.run();
}

lptask::static_task!(ROUNDTRIP_TASK);

#[test]
#[sequential]
fn config_start_roundtrip_law() {
    common::reset_clock();
    SCHEDULER.init();

    for interval in [1u32, 7, 100, 5000] {
        assert!(ROUNDTRIP_TASK.config(&SCHEDULER, noop, interval, true));
        assert!(ROUNDTRIP_TASK.start(&SCHEDULER));
        assert!(ROUNDTRIP_TASK.remaining_ms::<VirtualPort>() <= interval);

        common::advance(interval);
        assert_eq!(ROUNDTRIP_TASK.remaining_ms::<VirtualPort>(), 0);

        assert!(ROUNDTRIP_TASK.stop(&SCHEDULER));
    }

    SCHEDULER.stop();
    SCHEDULER.run();
}
