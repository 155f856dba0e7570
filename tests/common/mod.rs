//! A test-only `Port` with a simulated clock, so integration tests can advance
//! time deterministically instead of sleeping in real time.

use std::cell::RefCell;
use std::sync::atomic::{AtomicU32, Ordering};

use lptask::Port;
use spin::Mutex;

static TIME_MS: AtomicU32 = AtomicU32::new(0);
static LOCK: Mutex<()> = Mutex::new(());

thread_local! {
    static GUARD: RefCell<Option<spin::MutexGuard<'static, ()>>> = const { RefCell::new(None) };
}

/// Initializes `env_logger` once per process so `RUST_LOG=trace cargo test --
/// --nocapture` shows the scheduler's own `log::trace!`/`debug!` output.
/// Idempotent: safe to call at the top of every test.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Simulated-clock port: `now_ms` reads a global counter tests advance directly via
/// [`advance`]; `sleep` is never exercised by these tests (they drive
/// `Scheduler::step` instead of `Scheduler::run`).
pub struct VirtualPort;

impl Port for VirtualPort {
    fn now_ms() -> u32 {
        TIME_MS.load(Ordering::Acquire)
    }

    fn lock() {
        let guard = LOCK.lock();
        let guard: spin::MutexGuard<'static, ()> = unsafe { core::mem::transmute(guard) };
        GUARD.with(|slot| {
            slot.borrow_mut().replace(guard);
        });
    }

    fn free() {
        GUARD.with(|slot| {
            slot.borrow_mut().take();
        });
    }
}

/// Resets the simulated clock to 0. Call at the start of every test that uses
/// [`VirtualPort`] — the clock is a process-wide global shared across tests.
pub fn reset_clock() {
    TIME_MS.store(0, Ordering::Release);
}

/// Sets the simulated clock to an arbitrary value, for exercising behavior near the
/// `u32` wraparound boundary.
pub fn set_clock(ms: u32) {
    TIME_MS.store(ms, Ordering::Release);
}

/// Advances the simulated clock by `ms` milliseconds.
pub fn advance(ms: u32) {
    TIME_MS.fetch_add(ms, Ordering::AcqRel);
}
