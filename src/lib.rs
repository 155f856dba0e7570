//! A cooperative, allocation-free task scheduler for embedded main loops and
//! hosted POSIX-style programs.
//!
//! Tasks are declared as `'static` records (see [`static_task!`], [`static_buffered_task!`]
//! and [`task_pool!`]), configured with an interval and a handler, and started.
//! A single [`sched::Scheduler`] walks them each pass of [`sched::Scheduler::run`],
//! firing handlers whose interval has elapsed and sleeping for the remainder of the
//! soonest one otherwise. There is no heap allocation anywhere in this crate: task
//! storage, the registry links, and (optionally) a pool's data buffers all live in
//! caller-declared statics.
//!
//! ```no_run
//! use lptask::port::host::HostPort;
//! use lptask::sched::Scheduler;
//! use lptask::task::Task;
//!
//! static SCHEDULER: Scheduler<HostPort> = Scheduler::new();
//! lptask::static_task!(BLINK);
//!
//! fn blink(_task: &Task, _data: *const u8, _data_size: u8) {
//!     println!("blink");
//! }
//!
//! fn main() {
//!     SCHEDULER.init();
//!     BLINK.config(&SCHEDULER, blink, lptask::time::ms(0, 0, 0, 1, 0), true);
//!     BLINK.start(&SCHEDULER);
//!     SCHEDULER.run();
//! }
//! ```
//!
//! Everything the core needs from its environment — a monotonic clock and a lock —
//! is captured in the [`port::Port`] trait; [`port::host::HostPort`] and
//! [`port::critical_section::CriticalSectionPort`] are the two implementations this
//! crate ships, and an embedder is free to write their own.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod macros;
#[cfg(feature = "pool")]
pub mod pool;
pub mod port;
mod registry;
pub mod sched;
pub mod task;
pub mod time;

#[cfg(feature = "pool")]
pub use pool::TaskPool;
pub use port::Port;
pub use sched::{SchedState, Scheduler};
pub use task::{Handler, Task, TaskState};
pub use time::{ms, SCHED_MS_MAX};
