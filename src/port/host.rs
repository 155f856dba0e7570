//! A hosted port for POSIX-style (and Windows) development and test use.
//!
//! Grounded on the `r3_port_std` simulation port from the r3-os RTOS: a `spin::Mutex`
//! stands in for the "mask interrupts" primitive of a bare-metal port, and the clock
//! is read from `std::time::Instant`, which every supported `std` platform backs with
//! a monotonic source (`CLOCK_MONOTONIC` on Linux, `mach_continuous_time` on macOS,
//! `QueryPerformanceCounter` on Windows) — never wall-clock time, which is the
//! `CLOCK_MONOTONIC`-vs-`CLOCK_REALTIME` distinction the original POSIX port examples
//! got wrong in some drafts.

extern crate std;

use std::cell::RefCell;
use std::sync::OnceLock;
use std::time::Instant;

use spin::Mutex;

use super::Port;

static EPOCH: OnceLock<Instant> = OnceLock::new();
static LOCK: Mutex<()> = Mutex::new(());

thread_local! {
    // Parks the `lock()` guard between the `lock()`/`free()` call pair. `Port::lock`
    // and `Port::free` are a bare function pair (matching `sched_port_lock`/
    // `sched_port_free`), so there is no guard value to hand back to the caller;
    // this is where it lives instead.
    static GUARD: RefCell<Option<spin::MutexGuard<'static, ()>>> = const { RefCell::new(None) };
}

/// Hosted port backed by `std`: a real monotonic clock, a `spin::Mutex` guarding the
/// scheduler's shared state, and `std::thread::sleep` for cooperative sleeping.
pub struct HostPort;

impl Port for HostPort {
    fn now_ms() -> u32 {
        let epoch = *EPOCH.get_or_init(Instant::now);
        let elapsed = Instant::now().saturating_duration_since(epoch);
        (elapsed.as_millis() % u128::from(u32::MAX)) as u32
    }

    fn lock() {
        let guard = LOCK.lock();
        // SAFETY: `LOCK` is `'static`, so the guard's borrow is valid for as long as
        // we keep it parked; `free()` always drops it before any other thread could
        // observe a dangling reference.
        let guard: spin::MutexGuard<'static, ()> = unsafe { core::mem::transmute(guard) };
        GUARD.with(|slot| {
            let previous = slot.borrow_mut().replace(guard);
            debug_assert!(
                previous.is_none(),
                "HostPort::lock called recursively on the same thread"
            );
        });
    }

    fn free() {
        GUARD.with(|slot| {
            slot.borrow_mut()
                .take()
                .expect("HostPort::free called without a matching lock()");
        });
    }

    fn sleep(ms: u32) {
        std::thread::sleep(std::time::Duration::from_millis(u64::from(ms)));
    }
}
