use std::sync::{Mutex, MutexGuard, PoisonError};

pub mod api_key;
pub mod chat;
mod controller;
pub mod handshake;
pub mod probe;
pub mod scheduler;
pub mod transport;

pub use controller::{ConnectionController, ConnectionObserver};
pub use scheduler::{ManualClock, Scheduler, TokioScheduler};
pub use transport::{HandshakeTimings, HandshakeTransport, SimulatedTransport};

/// Locks `mutex`, recovering the data if a previous holder panicked. Every
/// critical section in this crate leaves its data consistent before any call
/// that could panic.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
