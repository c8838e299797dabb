//! # Coordinated shutdown.
//!
//! - [`ShutdownRegistry`]: explicit set of [`Shutdownable`] components, built at startup
//! - [`ForcedExitTimer`]: cancellable deadline that terminates the process
//! - [`ShutdownOrchestrator`]: the ordered shutdown sequence
//! - [`EventSource`], [`Persistence`], [`Listener`]: collaborators stopped at the end
//! - [`wait_for_shutdown_signal`]: OS signal helper
//!
//! ## Sequence
//! ```text
//! shutdown(deadline)
//!   ├─► arm ForcedExitTimer(deadline)           (process exit if anything below hangs)
//!   ├─► listeners removed, status idle
//!   ├─► scheduler.close_all()
//!   ├─► scheduler.join_all(deadline)            Running → Draining
//!   ├─► registry.shutdown_all(remaining)        Draining → StoppingListeners
//!   ├─► event_source.disconnect(), persistence.close()
//!   └─► timer.cancel()                          → Complete
//! ```

mod orchestrator;
mod registry;
mod signals;
mod source;
mod timer;

pub use orchestrator::{ShutdownOrchestrator, ShutdownState};
pub use registry::{ShutdownRegistry, Shutdownable};
pub use signals::wait_for_shutdown_signal;
pub use source::{EventSource, Listener, OnlineStatus, Persistence};
pub use timer::{ExitHook, ForcedExitTimer, process_exit};
