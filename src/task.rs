//! Task records: the per-task control block and its lifecycle operations.
//!
//! A [`Task`] is never allocated by this crate. It is declared by the caller —
//! typically as a `static`, via the [`crate::static_task`] / [`crate::static_buffered_task`]
//! macros, or as a slot inside a [`crate::pool::TaskPool`] — and the scheduler only ever
//! holds a non-owning `'static` reference to it. This mirrors the original C library's
//! `sched_task_t`, which is always statically stored by the calling module and linked
//! into the scheduler's que via a raw `p_next` pointer.
//!
//! `state` and `allocated` are the two fields an ISR may observe or modify concurrently
//! with the main loop, so they are backed by atomics with acquire/release ordering
//! rather than plain fields, matching the `volatile` qualifiers on the original
//! `sched_task_t::state` and `sched_task_t::allocated` bit-fields.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, AtomicPtr, AtomicU32, AtomicU8, Ordering};

use crate::port::Port;
use crate::time::SCHED_MS_MAX;

/// Task handler function prototype.
///
/// Called once per expiration with a reference to the task itself, a pointer to the
/// task's data (caller-owned for unbuffered tasks, task-owned for buffered tasks), and
/// the logical size of that data. The handler is a plain function pointer — no closure
/// capture, no allocation — exactly like the original `sched_handler_t`.
pub type Handler = fn(task: &Task, data: *const u8, data_size: u8);

/// Current lifecycle state of a [`Task`].
///
/// See the module-level state diagram in the crate's design notes: a task starts
/// `Uninit`, becomes `Stopped` once [`Task::config`] succeeds, `Active` once started,
/// and transiently `Executing` (repeating) or `Stopping` (one-shot) while its handler
/// runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TaskState {
    /// The task has never been configured (or has been torn down).
    Uninit = 0,
    /// The task has been configured and added to the registry but is not running.
    Stopped = 1,
    /// The task is armed and will fire when its interval elapses.
    Active = 2,
    /// A repeating task's handler is currently executing.
    Executing = 3,
    /// A one-shot task's handler is currently executing; it will become `Stopped`
    /// on return unless the handler restarts it.
    Stopping = 4,
}

impl TaskState {
    const fn from_u8(v: u8) -> TaskState {
        match v {
            0 => TaskState::Uninit,
            1 => TaskState::Stopped,
            2 => TaskState::Active,
            3 => TaskState::Executing,
            4 => TaskState::Stopping,
            _ => unreachable!(),
        }
    }

    /// True for `Active` or `Executing` — the two states in which a task's timer is
    /// running and `remaining_ms`/`elapsed_ms`/`is_expired` report meaningful values.
    pub const fn is_active(self) -> bool {
        matches!(self, TaskState::Active | TaskState::Executing)
    }
}

/// Fields mutated only while a task is known not to be executing: during
/// [`Task::config`]/[`Task::set_data`] preconditioned on `state != Executing/Stopping`,
/// and read only from the single main-loop thread that calls handlers. No ISR touches
/// these, so they do not need to be atomic — only `state`/`allocated` do.
struct TaskConfig {
    handler: Option<Handler>,
    data: *mut u8,
    buff_size: u8,
    data_size: u8,
    repeat: bool,
}

/// A single scheduler task: the interval/handler/data control block plus the
/// intrusive registry link.
///
/// `Task` is `'static` by convention — declare it with [`crate::static_task`] /
/// [`crate::static_buffered_task`], or obtain one from a [`crate::pool::TaskPool`].
#[repr(C)]
pub struct Task {
    start_ms: AtomicU32,
    interval_ms: AtomicU32,
    pub(crate) next: AtomicPtr<Task>,
    state: AtomicU8,
    allocated: AtomicBool,
    config: UnsafeCell<TaskConfig>,
}

// SAFETY: `state`/`allocated`/`next`/`start_ms`/`interval_ms` are atomics. The
// `UnsafeCell<TaskConfig>` is mutated only by `config`/`set_data`, both of which
// require `state` to be `Uninit`/`Stopped` (i.e. no handler invocation can be
// concurrently reading it), and is otherwise only read from the single thread
// that drives the scheduler's main loop.
unsafe impl Sync for Task {}

impl Task {
    /// Creates a new, unconfigured task in the `Uninit` state.
    ///
    /// This is a `const fn` so it can initialize a `static`, matching the original
    /// library's requirement that tasks be statically allocated by the caller.
    pub const fn new() -> Task {
        Task {
            start_ms: AtomicU32::new(0),
            interval_ms: AtomicU32::new(0),
            next: AtomicPtr::new(core::ptr::null_mut()),
            state: AtomicU8::new(TaskState::Uninit as u8),
            allocated: AtomicBool::new(false),
            config: UnsafeCell::new(TaskConfig {
                handler: None,
                data: core::ptr::null_mut(),
                buff_size: 0,
                data_size: 0,
                repeat: false,
            }),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TaskState {
        TaskState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: TaskState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// True once the task has been marked allocated by a [`crate::pool::TaskPool`].
    /// Always `false` for a task declared with [`crate::static_task`].
    pub fn is_allocated(&self) -> bool {
        self.allocated.load(Ordering::Acquire)
    }

    pub(crate) fn set_allocated(&self, allocated: bool) {
        self.allocated.store(allocated, Ordering::Release);
    }

    /// True if `buff_size > 0`, i.e. this task owns its data rather than pointing at
    /// caller-owned memory.
    pub fn is_buffered(&self) -> bool {
        unsafe { (*self.config.get()).buff_size > 0 }
    }

    /// True if the task is `Active` or `Executing`.
    pub fn is_active(&self) -> bool {
        self.state().is_active()
    }

    /// Time in mS since the task was last (re)started, wrapping `mod 2^32`.
    ///
    /// Returns `0` for an inactive task, matching `sched_task_elapsed_ms`.
    pub fn elapsed_ms<P: Port>(&self) -> u32 {
        if !self.is_active() {
            return 0;
        }
        P::now_ms().wrapping_sub(self.start_ms.load(Ordering::Acquire))
    }

    /// Time in mS until the task's timer expires, or `0` if it already has.
    ///
    /// Returns [`SCHED_MS_MAX`] for an inactive task, matching `sched_task_remaining_ms`.
    pub fn remaining_ms<P: Port>(&self) -> u32 {
        if !self.is_active() {
            return SCHED_MS_MAX;
        }
        let elapsed = P::now_ms().wrapping_sub(self.start_ms.load(Ordering::Acquire));
        let interval = self.interval_ms.load(Ordering::Acquire);
        interval.saturating_sub(elapsed)
    }

    /// True if the task is active and its interval has elapsed.
    pub fn is_expired<P: Port>(&self) -> bool {
        self.is_active() && self.remaining_ms::<P>() == 0
    }

    /// Returns whichever of two (possibly absent) tasks expires sooner.
    ///
    /// An inactive task never "wins": if only one argument is active it is returned,
    /// if both are inactive `None` is returned, and ties favor `a`. This is the
    /// `sched_task_compare` analogue used to keep the next-expiring-task cache honest.
    pub fn sooner<'a, P: Port>(a: Option<&'a Task>, b: Option<&'a Task>) -> Option<&'a Task> {
        match (a.filter(|t| t.is_active()), b.filter(|t| t.is_active())) {
            (Some(ta), Some(tb)) => {
                if ta.remaining_ms::<P>() <= tb.remaining_ms::<P>() {
                    Some(ta)
                } else {
                    Some(tb)
                }
            }
            (Some(ta), None) => Some(ta),
            (None, Some(tb)) => Some(tb),
            (None, None) => None,
        }
    }

    fn interval_set(&self, interval_ms: u32, repeat: bool) {
        let clamped = if repeat && interval_ms == 0 {
            // Repeating tasks must have interval >= 1 or they would monopolize the
            // main loop, starving every other task.
            1
        } else {
            core::cmp::min(interval_ms, SCHED_MS_MAX)
        };
        self.interval_ms.store(clamped, Ordering::Release);
    }

    /// Configures (or reconfigures) the task's handler, interval and repeat flag.
    ///
    /// On first configuration (`state == Uninit`) the task is appended to the
    /// scheduler's registry. A task may be reconfigured while `Stopped`; it is
    /// rejected while `Active`/`Executing`/`Stopping`. Succeeds and returns `true`
    /// unless a precondition is violated, in which case it returns `false` and leaves
    /// the task untouched. With the `buff-clear` feature enabled, a buffered task's
    /// backing buffer is zeroed on every successful config/reconfig.
    pub fn config<P: Port>(
        &'static self,
        scheduler: &crate::sched::Scheduler<P>,
        handler: Handler,
        interval_ms: u32,
        repeat: bool,
    ) -> bool {
        if scheduler.state() != crate::sched::SchedState::Active {
            log::warn!("task config rejected: scheduler is not active");
            return false;
        }
        match self.state() {
            TaskState::Executing | TaskState::Stopping => {
                log::warn!("task config rejected: handler currently executing");
                false
            }
            TaskState::Active => {
                log::warn!("task config rejected: task is active, stop it first");
                false
            }
            state => {
                if state == TaskState::Uninit {
                    scheduler.attach_task(self);
                }
                unsafe {
                    let cfg = &mut *self.config.get();
                    cfg.handler = Some(handler);
                    cfg.repeat = repeat;
                }
                self.interval_set(interval_ms, repeat);
                #[cfg(feature = "buff-clear")]
                self.clear_buffer();
                self.set_state(TaskState::Stopped);
                log::debug!("task configured: interval_ms={interval_ms} repeat={repeat}");
                true
            }
        }
    }

    /// Arms the task: `Stopped -> Active`, `Stopping -> Executing` (the task is
    /// restarting itself from inside its own still-running handler). Fails (returns
    /// `false`) from `Uninit`. Always stamps `start_ms = now_ms()`.
    pub fn start<P: Port>(&'static self, scheduler: &crate::sched::Scheduler<P>) -> bool {
        match self.state() {
            TaskState::Uninit => {
                log::warn!("task start rejected: not configured");
                false
            }
            TaskState::Stopped => {
                self.set_state(TaskState::Active);
                self.start_ms.store(P::now_ms(), Ordering::Release);
                scheduler.notify_started(self);
                true
            }
            TaskState::Stopping => {
                // A restart racing (or issued from) the still-executing handler.
                // The post-handler epilogue resolves this back to `Active`; the
                // cache does not need an eager `updated` nudge here because the
                // scan that follows the handler return will refresh it anyway.
                self.set_state(TaskState::Executing);
                self.start_ms.store(P::now_ms(), Ordering::Release);
                true
            }
            TaskState::Active | TaskState::Executing => {
                self.start_ms.store(P::now_ms(), Ordering::Release);
                scheduler.notify_started(self);
                true
            }
        }
    }

    /// Rewrites the interval (subject to the same clamping rules as [`Task::config`])
    /// and restarts the task.
    pub fn update<P: Port>(
        &'static self,
        scheduler: &crate::sched::Scheduler<P>,
        interval_ms: u32,
    ) -> bool {
        let repeat = unsafe { (*self.config.get()).repeat };
        self.interval_set(interval_ms, repeat);
        self.start(scheduler)
    }

    /// Cancels the task: `Active -> Stopped` immediately, `Executing -> Stopping`
    /// (finalized once the handler returns). Fails from `Uninit`.
    pub fn stop<P: Port>(&'static self, scheduler: &crate::sched::Scheduler<P>) -> bool {
        match self.state() {
            TaskState::Uninit => {
                log::warn!("task stop rejected: not configured");
                false
            }
            TaskState::Active => {
                self.set_state(TaskState::Stopped);
                self.set_allocated(false);
                scheduler.notify_stopped(self);
                true
            }
            TaskState::Executing => {
                self.set_state(TaskState::Stopping);
                scheduler.notify_stopped(self);
                true
            }
            TaskState::Stopped | TaskState::Stopping => true,
        }
    }

    /// Sets the task's data. Only permitted while `Stopped`; any other state returns
    /// `0` without modifying the task.
    ///
    /// Buffered tasks copy up to `buff_size` bytes into the task's own buffer and
    /// return the stored length; `data == None` stores a length of `0`. Unbuffered
    /// tasks just remember the pointer/length the caller supplied, which must stay
    /// valid until the handler observes it.
    pub fn set_data(&self, data: Option<&[u8]>) -> u8 {
        if self.state() != TaskState::Stopped {
            return 0;
        }
        unsafe {
            let cfg = &mut *self.config.get();
            if cfg.buff_size > 0 {
                match data {
                    None => {
                        cfg.data_size = 0;
                    }
                    Some(bytes) => {
                        let len = core::cmp::min(bytes.len(), cfg.buff_size as usize) as u8;
                        let dst = core::slice::from_raw_parts_mut(cfg.data, len as usize);
                        dst.copy_from_slice(&bytes[..len as usize]);
                        cfg.data_size = len;
                    }
                }
                cfg.data_size
            } else {
                match data {
                    None => {
                        cfg.data = core::ptr::null_mut();
                        cfg.data_size = 0;
                    }
                    Some(bytes) => {
                        cfg.data = bytes.as_ptr() as *mut u8;
                        cfg.data_size = bytes.len() as u8;
                    }
                }
                cfg.data_size
            }
        }
    }

    /// Wires a buffered task's internal storage. Used by [`crate::static_buffered_task`]
    /// and [`crate::pool::TaskPool`] at construction time; not part of the public
    /// lifecycle API.
    pub(crate) fn bind_buffer(&self, data: *mut u8, buff_size: u8) {
        unsafe {
            let cfg = &mut *self.config.get();
            cfg.data = data;
            cfg.buff_size = buff_size;
        }
    }

    #[cfg(feature = "buff-clear")]
    pub(crate) fn clear_buffer(&self) {
        unsafe {
            let cfg = &mut *self.config.get();
            if cfg.buff_size > 0 && !cfg.data.is_null() {
                core::ptr::write_bytes(cfg.data, 0, cfg.buff_size as usize);
            }
        }
    }

    pub(crate) fn reset_uninit(&self) {
        self.set_state(TaskState::Uninit);
    }

    /// Runs the task's handler and applies the post-handler epilogue described in
    /// the main loop design: `Executing -> Active`, `Stopping -> Stopped` (freeing
    /// the slot if pool-allocated).
    pub(crate) fn execute<P: Port>(&'static self) {
        let (handler, repeat) = unsafe {
            let cfg = &*self.config.get();
            (cfg.handler, cfg.repeat)
        };
        let handler = handler.expect("expired task must have a handler");

        if repeat {
            self.set_state(TaskState::Executing);
            // Stamp the restart time before calling the handler so the handler's
            // own execution time doesn't shift the schedule.
            self.start_ms.store(P::now_ms(), Ordering::Release);
        } else {
            self.set_state(TaskState::Stopping);
        }

        let (data_ptr, data_size) = unsafe {
            let cfg = &*self.config.get();
            (cfg.data as *const u8, cfg.data_size)
        };
        log::trace!("firing task handler, data_size={data_size}");
        handler(self, data_ptr, data_size);

        match self.state() {
            TaskState::Executing => self.set_state(TaskState::Active),
            TaskState::Stopping => {
                self.set_state(TaskState::Stopped);
                self.set_allocated(false);
            }
            other => {
                log::error!("task left handler in unexpected state {other:?}");
                debug_assert!(false, "task left handler in unexpected state {other:?}");
            }
        }
    }
}

impl Default for Task {
    fn default() -> Self {
        Task::new()
    }
}
