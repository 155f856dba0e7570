//! The fixed-capacity, allocation-free task pool.
//!
//! Mirrors `sched_task_pool_t` / `sched_task_alloc` from the original scheduler: a
//! pool owns neither the tasks nor their backing buffer (both are embedded in the
//! pool's own `'static` storage, declared once at compile time), it only arbitrates
//! exclusive use of each slot via the task's `allocated` flag. Capacity and per-task
//! buffer size are const generics (`TaskPool<P, const N: usize, const BUF: usize>`)
//! rather than the runtime `task_cnt`/`buff_size` fields of the C struct, so a pool's
//! footprint is entirely compile-time-known — no heap, no `Vec`.

use core::cell::UnsafeCell;
use core::marker::PhantomData;
use core::mem::MaybeUninit;
use core::sync::atomic::{AtomicBool, Ordering};

use crate::port::Port;
use crate::task::Task;

/// A pool of `N` buffered tasks, each with its own `BUF`-byte data buffer, arbitrated
/// through the port `P`.
///
/// Declare one as a `static`, typically via [`crate::task_pool`]:
///
/// ```ignore
/// static POOL: TaskPool<MyPort, 4, 16> = TaskPool::new();
/// ```
///
/// [`TaskPool::alloc`] hands out `&'static Task` references from the pool; the task
/// returns to the pool automatically once it reaches `Stopped` (see
/// [`crate::task::Task::execute`]).
pub struct TaskPool<P: Port, const N: usize, const BUF: usize> {
    tasks: [Task; N],
    buffers: UnsafeCell<[[u8; BUF]; N]>,
    initialized: AtomicBool,
    _port: PhantomData<fn() -> P>,
}

// SAFETY: `tasks` is `[Task; N]` and `Task` is already `Sync`. `buffers` is only
// ever touched through the pointers handed to `Task::bind_buffer`, which the task's
// own `state`-gated safety invariant protects exactly as it does for any other
// buffered task. `PhantomData<fn() -> P>` imposes no auto-trait requirement on `P`.
unsafe impl<P: Port, const N: usize, const BUF: usize> Sync for TaskPool<P, N, BUF> {}

impl<P: Port, const N: usize, const BUF: usize> TaskPool<P, N, BUF> {
    /// Creates an uninitialized pool. Slot wiring (pointing each task's data pointer
    /// at its buffer slice) is deferred to the first [`TaskPool::alloc`] call,
    /// matching the original library's lazy `sched_task_pool_init`.
    pub const fn new() -> TaskPool<P, N, BUF> {
        TaskPool {
            tasks: const_task_array(),
            buffers: UnsafeCell::new([[0u8; BUF]; N]),
            initialized: AtomicBool::new(false),
            _port: PhantomData,
        }
    }

    fn init(&'static self) {
        for i in 0..N {
            // SAFETY: runs once, before any task in the pool is reachable by a
            // caller (the pool itself is the only thing that can hand out a
            // reference, and it doesn't until after this loop completes).
            let data = unsafe { (*self.buffers.get())[i].as_mut_ptr() };
            self.tasks[i].bind_buffer(data, BUF as u8);
        }
        self.initialized.store(true, Ordering::Release);
    }

    /// Allocates the first free slot, initializing the pool on first use.
    ///
    /// Returns `None` if the scheduler is not `Active`, or if every slot is
    /// currently allocated. The returned task is `Uninit` and ready for
    /// [`crate::task::Task::config`].
    pub fn alloc(
        &'static self,
        scheduler: &crate::sched::Scheduler<P>,
    ) -> Option<&'static Task> {
        if scheduler.state() != crate::sched::SchedState::Active {
            log::warn!("pool alloc rejected: scheduler is not active");
            return None;
        }

        if !self.initialized.load(Ordering::Acquire) {
            self.init();
        }

        for task in &self.tasks {
            if task.is_allocated() {
                continue;
            }
            P::lock();
            let won = if task.is_allocated() {
                false
            } else {
                task.set_allocated(true);
                true
            };
            P::free();

            if !won {
                // Lost a race to another allocator; keep scanning.
                continue;
            }

            #[cfg(feature = "buff-clear")]
            task.clear_buffer();

            log::debug!("pool task allocated");
            return Some(task);
        }
        log::warn!("task pool exhausted");
        None
    }

    /// Number of slots currently allocated.
    pub fn allocated_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.is_allocated()).count()
    }

    /// Number of slots currently free.
    pub fn free_count(&self) -> usize {
        N - self.allocated_count()
    }

    /// Total pool capacity, i.e. `N`.
    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<P: Port, const N: usize, const BUF: usize> Default for TaskPool<P, N, BUF> {
    fn default() -> Self {
        TaskPool::new()
    }
}

/// Builds a `[Task; N]` at compile time without requiring `Task: Copy` (it can't
/// be: its fields are atomics). Grounded on the `const_array_from_fn!` pattern used
/// elsewhere in this codebase's lineage for const-generic array construction over
/// non-`Copy` element types.
const fn const_task_array<const N: usize>() -> [Task; N] {
    let mut array: [MaybeUninit<Task>; N] = unsafe { MaybeUninit::uninit().assume_init() };
    let mut i = 0;
    while i < N {
        array[i] = MaybeUninit::new(Task::new());
        i += 1;
    }
    // SAFETY: every element has just been initialized by the loop above, and
    // `[MaybeUninit<Task>; N]` and `[Task; N]` are guaranteed to share the same
    // size and layout for any given `N`.
    unsafe { core::mem::transmute::<[MaybeUninit<Task>; N], [Task; N]>(array) }
}
