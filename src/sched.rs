//! The scheduler singleton: state machine, expiration engine, next-task cache, and
//! the cooperative main loop.
//!
//! This is the direct translation of `scheduler.c`'s `scheduler` static and its
//! `sched_execute_que`/`sched_start`/`sched_stop` trio. The one divergence from the
//! upstream C is generic, not behavioral: `Scheduler<P>` is parameterized over the
//! [`Port`] implementation so the embedder picks [`crate::port::host::HostPort`],
//! [`crate::port::critical_section::CriticalSectionPort`], or their own, entirely at
//! compile time — a compile-time-selected port, not a trait object, so there is no
//! vtable and no runtime branch on which port is active.

use core::marker::PhantomData;
use core::sync::atomic::{AtomicU8, Ordering};

#[cfg(feature = "cache")]
use core::sync::atomic::AtomicPtr;
#[cfg(feature = "cache")]
use core::sync::atomic::AtomicBool;

use crate::port::Port;
use crate::registry::Registry;
use crate::task::Task;
use crate::time::SCHED_MS_MAX;

/// Scheduler-level lifecycle state. Transitions only along
/// `Stopped -> Active -> Stopping -> Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SchedState {
    /// No task handlers may run; [`Scheduler::run`] will return immediately.
    Stopped = 0,
    /// The main loop is (or may be) running.
    Active = 1,
    /// [`Scheduler::stop`] has been requested; the current loop pass will finish
    /// servicing its already-due tasks, then tear down.
    Stopping = 2,
}

impl SchedState {
    const fn from_u8(v: u8) -> SchedState {
        match v {
            0 => SchedState::Stopped,
            1 => SchedState::Active,
            2 => SchedState::Stopping,
            _ => unreachable!(),
        }
    }
}

/// The cooperative task scheduler.
///
/// Declare one `static SCHEDULER: Scheduler<MyPort> = Scheduler::new();` per
/// application (embedded main-loop firmware typically has exactly one; a hosted
/// test harness may create several to isolate test cases). All [`Task`] lifecycle
/// methods take a `&Scheduler<P>` to attach/notify against.
pub struct Scheduler<P: Port> {
    registry: Registry,
    #[cfg(feature = "cache")]
    next: AtomicPtr<Task>,
    #[cfg(feature = "cache")]
    updated: AtomicBool,
    state: AtomicU8,
    _port: PhantomData<fn() -> P>,
}

// SAFETY: every field is either an atomic or `Registry`, which is itself built
// entirely out of atomics; `PhantomData<fn() -> P>` imposes no auto-trait
// requirement on `P`.
unsafe impl<P: Port> Sync for Scheduler<P> {}

impl<P: Port> Scheduler<P> {
    /// Creates a new, `Stopped` scheduler. `const fn` so it can back a `static`.
    pub const fn new() -> Scheduler<P> {
        Scheduler {
            registry: Registry::new(),
            #[cfg(feature = "cache")]
            next: AtomicPtr::new(core::ptr::null_mut()),
            #[cfg(feature = "cache")]
            updated: AtomicBool::new(false),
            state: AtomicU8::new(SchedState::Stopped as u8),
            _port: PhantomData,
        }
    }

    /// Current scheduler-level state.
    pub fn state(&self) -> SchedState {
        SchedState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: SchedState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Runs the platform's `init` hook (if not already `Active`) and moves the
    /// scheduler to `Active`. Tasks may only be [`Task::config`]ured once the
    /// scheduler is `Active`.
    pub fn init(&self) {
        if self.state() == SchedState::Stopped {
            P::init();
            self.registry.clear();
            #[cfg(feature = "cache")]
            {
                self.next.store(core::ptr::null_mut(), Ordering::Release);
                self.updated.store(false, Ordering::Release);
            }
            self.set_state(SchedState::Active);
        }
    }

    /// Requests a stop. If the scheduler is `Active`, the next loop pass finishes
    /// servicing its already-due tasks and then tears down (clears the registry,
    /// runs the platform `deinit` hook, and moves to `Stopped`) before
    /// [`Scheduler::run`] returns. A no-op if already `Stopped`.
    pub fn stop(&self) {
        if self.state() != SchedState::Stopped {
            self.set_state(SchedState::Stopping);
        }
    }

    /// Runs the cooperative main loop until [`Scheduler::stop`] is called (from a
    /// handler or from another context), then tears down and returns.
    ///
    /// ```text
    /// ms_until_next = service_queue()
    /// if ms_until_next > 0: port.sleep(ms_until_next)
    /// ```
    pub fn run(&'static self) {
        while self.state() == SchedState::Active {
            let ms_until_next = self.step();
            if ms_until_next > 0 {
                P::sleep(ms_until_next);
            }
        }
        self.finalize_stop();
    }

    /// Runs exactly one pass of the expiration engine: fires every presently-due
    /// task and returns the number of milliseconds until the next one is due (or
    /// [`SCHED_MS_MAX`] if none are active). A no-op returning `SCHED_MS_MAX` if
    /// the scheduler is not `Active`.
    ///
    /// [`Scheduler::run`] is exactly `loop { let ms = step(); port.sleep(ms) }`;
    /// `step` is exposed directly for embedders who drive their own event loop
    /// (e.g. alongside other `poll`-style work) instead of calling `run`, and for
    /// tests that want to advance a simulated clock between passes.
    pub fn step(&'static self) -> u32 {
        if self.state() != SchedState::Active {
            return SCHED_MS_MAX;
        }
        self.service_queue()
    }

    fn finalize_stop(&self) {
        if self.state() == SchedState::Stopping {
            P::lock();
            self.registry.clear();
            #[cfg(feature = "cache")]
            self.next.store(core::ptr::null_mut(), Ordering::Release);
            P::free();
            P::deinit();
            self.set_state(SchedState::Stopped);
        }
    }

    /// Appends `task` to the registry under the port lock. Called by
    /// [`Task::config`] the first time a task is configured.
    pub(crate) fn attach_task(&self, task: &'static Task) {
        P::lock();
        self.registry.attach(task);
        P::free();
    }

    /// Raises the cache-invalidation flag. Called whenever a task starts or its
    /// interval changes, per the cache-invalidation discipline in the design notes.
    pub(crate) fn notify_started(&self, _task: &'static Task) {
        #[cfg(feature = "cache")]
        self.updated.store(true, Ordering::Release);
    }

    /// Clears the cache if it happens to point at the task being stopped. Not
    /// required for correctness (a stale pointer to a non-`Active` task is always
    /// bypassed safely), but avoids carrying a known-dead hint.
    pub(crate) fn notify_stopped(&self, task: &'static Task) {
        #[cfg(feature = "cache")]
        {
            let task_ptr = task as *const Task as *mut Task;
            let _ = self.next.compare_exchange(
                task_ptr,
                core::ptr::null_mut(),
                Ordering::AcqRel,
                Ordering::Acquire,
            );
        }
    }

    /// Returns whether the registry currently has no configured tasks. Mostly
    /// useful in tests.
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// One iteration of the expiration engine: fires every presently-due task and
    /// returns the number of milliseconds until the next one is due (or
    /// [`SCHED_MS_MAX`] if none are active).
    fn service_queue(&'static self) -> u32 {
        #[cfg(feature = "cache")]
        {
            if self.updated.swap(false, Ordering::AcqRel) {
                return self.full_scan();
            }

            let cached = self.next.load(Ordering::Acquire);
            if !cached.is_null() {
                // SAFETY: every non-null value ever stored in `next` is a live
                // `&'static Task` (either a registry node or null).
                let task: &'static Task = unsafe { &*cached };
                if task.is_active() {
                    let remaining = task.remaining_ms::<P>();
                    if remaining > 0 {
                        return remaining;
                    }
                    task.execute::<P>();
                }
            }
            self.full_scan()
        }

        #[cfg(not(feature = "cache"))]
        {
            self.full_scan()
        }
    }

    /// Walks the whole registry, firing every expired active task and tracking the
    /// soonest remaining time among the rest. Updates the cache (if enabled) with
    /// the result.
    fn full_scan(&'static self) -> u32 {
        let mut next_ms = SCHED_MS_MAX;
        #[cfg(feature = "cache")]
        let mut next_task: Option<&'static Task> = None;

        for task in self.registry.iter() {
            if !task.is_active() {
                continue;
            }
            loop {
                let remaining = task.remaining_ms::<P>();
                if remaining > 0 {
                    if remaining < next_ms {
                        next_ms = remaining;
                        #[cfg(feature = "cache")]
                        {
                            next_task = Some(task);
                        }
                    }
                    break;
                }
                // Expired: fire it, then re-test the *same* task before moving on —
                // it may have re-armed itself with a new interval from inside its
                // own handler. Bounded by the interval>=1 rule for repeating tasks.
                task.execute::<P>();
                if !task.is_active() {
                    break;
                }
            }
        }

        #[cfg(feature = "cache")]
        {
            let ptr = next_task
                .map(|t| t as *const Task as *mut Task)
                .unwrap_or(core::ptr::null_mut());
            self.next.store(ptr, Ordering::Release);
        }

        debug_assert!(next_ms > 0, "full_scan must return a positive sleep interval");
        next_ms
    }
}

impl<P: Port> Default for Scheduler<P> {
    fn default() -> Self {
        Scheduler::new()
    }
}
