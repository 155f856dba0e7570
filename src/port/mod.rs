//! The platform port contract.
//!
//! Everything the core scheduler needs from its environment is captured in [`Port`]:
//! a monotonic millisecond clock, a mutual-exclusion primitive for the registry/cache,
//! and an optional cooperative sleep. This is a direct translation of the original
//! library's `sched_port_*` functions — `now_ms`/`lock`/`free` are mandatory,
//! `sleep`/`init`/`deinit` default to a busy-wait / no-op exactly like the original's
//! `__attribute__((weak))` fallbacks.
//!
//! `Port` implementors are zero-sized marker types (`impl Port for MyPort {}`): the
//! methods are associated functions with no `self`, so the type itself carries no
//! state — all port state lives in whatever statics or peripherals the
//! implementation touches.

cfg_if::cfg_if! {
    if #[cfg(feature = "std")] {
        pub mod host;
    }
}

pub mod critical_section;

/// Platform contract the core scheduler is compiled against.
pub trait Port {
    /// Returns the current value of a free-running, monotonically increasing
    /// millisecond counter. Must never jump backwards or skip forwards except by
    /// the wall-clock time actually elapsed, and must wrap at `2^32` rather than
    /// overflow.
    fn now_ms() -> u32;

    /// Acquires exclusive access to the scheduler's shared state (the registry's
    /// head/tail pointers and the next-expiring-task cache). Implementations may
    /// mask interrupts on a single-core MCU or take a mutex on a hosted platform.
    /// Every `lock()` is followed by exactly one `free()`; the scheduler never
    /// recursively locks.
    fn lock();

    /// Releases the lock taken by a matching [`Port::lock`] call.
    fn free();

    /// Cooperative sleep request for `ms` milliseconds. May return early for any
    /// reason (an interrupt, a spurious wakeup) — the main loop tolerates this by
    /// simply re-running its scan. The default implementation busy-waits, which is
    /// correct but wasteful; ports that can suspend the CPU should override it.
    fn sleep(ms: u32) {
        let start = Self::now_ms();
        while Self::now_ms().wrapping_sub(start) < ms {
            core::hint::spin_loop();
        }
    }

    /// Optional one-time platform setup, run from [`crate::sched::Scheduler::init`].
    fn init() {}

    /// Optional platform teardown, run once the scheduler finishes stopping.
    fn deinit() {}
}
