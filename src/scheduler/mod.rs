//! # Per-guild command scheduling.
//!
//! [`CommandScheduler`] owns one serial queue per guild. Commands of one guild
//! run strictly in submission order and never overlap; different guilds run
//! fully concurrently.
//!
//! ## Architecture
//! ```text
//! submit(guild A, cmd) ──► [unbounded queue A] ──► worker A ──► interceptors ──► cmd.run()
//! submit(guild B, cmd) ──► [unbounded queue B] ──► worker B ──► interceptors ──► cmd.run()
//!                                                       │
//!                                                       └─► panic caught → TaskPanicked, next command
//! ```
//!
//! ## Lifecycle
//! ```text
//! first submit for guild ─► queue + worker created (QueueCreated)
//! close_all()            ─► senders dropped, further submits fail with SchedulerError::Closed
//!                           workers finish what is queued, then exit (QueueDrained)
//! join_all(deadline)     ─► waits for pending == 0 (and worker exit once closed)
//! ```
//!
//! Idle queues are kept for the process lifetime.

mod interceptor;
mod queue;
mod scheduler;

pub use interceptor::CommandInterceptor;
pub use scheduler::CommandScheduler;
