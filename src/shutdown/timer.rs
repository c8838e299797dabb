//! # Forced-exit timer.
//!
//! Safety net for the shutdown sequence: once armed, the timer terminates the
//! process when its deadline elapses unless it is cancelled first.
//!
//! The countdown runs on a dedicated OS thread, so it fires even when every
//! runtime worker is stuck inside a command. Dropping the timer counts as
//! cancelling it.

use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::events::{Bus, Event, EventKind};

/// Action performed when the timer fires; receives the configured exit code.
pub type ExitHook = Arc<dyn Fn(i32) + Send + Sync>;

/// Exit hook terminating the current process.
pub fn process_exit() -> ExitHook {
    Arc::new(|code| std::process::exit(code))
}

/// Cancellable deadline that runs an [`ExitHook`] when it elapses.
pub struct ForcedExitTimer {
    cancel: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
    bus: Bus,
}

impl ForcedExitTimer {
    /// Starts the countdown.
    pub fn arm(deadline: Duration, exit_code: i32, hook: ExitHook, bus: Bus) -> Self {
        let (tx, rx) = mpsc::channel::<()>();
        let bus_for_thread = bus.clone();

        let spawned = std::thread::Builder::new()
            .name("forced-exit".into())
            .spawn(move || {
                if let Err(RecvTimeoutError::Timeout) = rx.recv_timeout(deadline) {
                    bus_for_thread
                        .publish(Event::new(EventKind::ForcedExitFired).with_deadline(deadline));
                    tracing::error!(?deadline, exit_code, "shutdown deadline exceeded, forcing exit");
                    hook(exit_code);
                }
            });

        let thread = match spawned {
            Ok(handle) => {
                bus.publish(Event::new(EventKind::ForcedExitArmed).with_deadline(deadline));
                Some(handle)
            }
            Err(error) => {
                tracing::error!(%error, "failed to start forced-exit thread");
                None
            }
        };

        Self {
            cancel: Some(tx),
            thread,
            bus,
        }
    }

    /// Returns true while the countdown thread is alive.
    pub fn is_armed(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stops the countdown and waits for the timer thread to exit.
    pub fn cancel(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let fired = self.thread.as_ref().is_some_and(|t| t.is_finished());
        if let Some(tx) = self.cancel.take() {
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
            if !fired {
                self.bus.publish(Event::new(EventKind::ForcedExitCancelled));
            }
        }
    }
}

impl Drop for ForcedExitTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};

    fn recording_hook() -> (ExitHook, Arc<AtomicI32>) {
        let code = Arc::new(AtomicI32::new(-1));
        let seen = code.clone();
        (Arc::new(move |c| seen.store(c, Ordering::SeqCst)), code)
    }

    #[test]
    fn test_fires_after_deadline() {
        let (hook, code) = recording_hook();
        let timer = ForcedExitTimer::arm(Duration::from_millis(20), 3, hook, Bus::new(8));
        std::thread::sleep(Duration::from_millis(200));
        assert_eq!(code.load(Ordering::SeqCst), 3);
        assert!(!timer.is_armed());
    }

    #[test]
    fn test_cancel_prevents_exit() {
        let (hook, code) = recording_hook();
        let timer = ForcedExitTimer::arm(Duration::from_millis(100), 3, hook, Bus::new(8));
        assert!(timer.is_armed());
        timer.cancel();
        std::thread::sleep(Duration::from_millis(200));
        assert_eq!(code.load(Ordering::SeqCst), -1);
    }
}
