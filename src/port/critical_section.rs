//! A bare-metal port built on the `critical-section` crate.
//!
//! `critical-section` is the ecosystem-standard way to express "mask interrupts on
//! a single-core MCU, or take a mutex on a hosted target" without the scheduler core
//! having to know which — the embedder links in whichever `critical-section`
//! implementation crate matches their chip (`critical-section/std`,
//! `cortex-m`'s interrupt-masking impl, `riscv`'s, etc.), the same division of
//! responsibility `r3_port_std` gets from `spin` and a bare-metal r3 port would get
//! from its own interrupt controller driver.
//!
//! `now_ms` is intentionally left to the embedder: unlike the lock primitive there is
//! no crate-wide convention for reading a hardware tick counter, so
//! [`CriticalSectionPort::TICK_MS`] is an embedder-supplied [`AtomicU32`] that a
//! timer ISR is expected to increment once per millisecond.

use core::sync::atomic::{AtomicU32, Ordering};

use critical_section::{self as cs, RestoreState};

use super::Port;

/// Bare-metal [`Port`] built on `critical-section`.
///
/// `sleep`/`init`/`deinit` use the trait defaults (busy-wait / no-op); override them
/// in a thin wrapper type if the target has a real low-power sleep instruction.
pub struct CriticalSectionPort;

/// The millisecond tick counter this port reads from. The embedder's timer ISR is
/// responsible for incrementing this once per millisecond (wrapping is fine — it's
/// exactly the `u32` wraparound the core is designed around).
pub static TICK_MS: AtomicU32 = AtomicU32::new(0);

// `critical_section::RestoreState` must be threaded from `acquire` to `release`;
// a single-core port never nests critical sections (the scheduler never locks
// recursively), so one thread-local-free slot suffices on a single hart/core.
static mut RESTORE: Option<RestoreState> = None;

impl Port for CriticalSectionPort {
    fn now_ms() -> u32 {
        TICK_MS.load(Ordering::Acquire)
    }

    fn lock() {
        let restore = unsafe { cs::acquire() };
        // SAFETY: single-core, non-nesting use per the module doc above.
        unsafe { RESTORE = Some(restore) };
    }

    fn free() {
        // SAFETY: paired with the `lock()` that must have run first.
        let restore = unsafe { RESTORE.take() }
            .expect("CriticalSectionPort::free called without a matching lock()");
        unsafe { cs::release(restore) };
    }
}
