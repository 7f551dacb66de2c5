//! Connection-state controller for the MCP service.
//!
//! Policy for overlapping calls:
//! - `connect` while `Connecting` supersedes the running attempt. The earlier
//!   caller receives [`ConnectionError::Superseded`] and only the newest
//!   attempt may move the state out of `Connecting`.
//! - `connect` while `Connected` is rejected with
//!   [`ConnectionError::AlreadyConnected`] and leaves state untouched.
//! - `disconnect` cancels any running attempt; its caller receives
//!   [`ConnectionError::Cancelled`].
//!
//! Every attempt carries a generation number. State is only written when the
//! writer's generation is still current, so a stale completion can never
//! transition state.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use shared::{
    domain::{ConnectionConfig, ConnectionState},
    error::ConnectionError,
};
use tokio_util::sync::CancellationToken;

use crate::{
    handshake::HandshakeMachine,
    lock,
    scheduler::{Scheduler, TokioScheduler},
    transport::{HandshakeTimings, HandshakeTransport, SimulatedTransport},
};

/// Display surface notified after every state transition.
///
/// Called in transition order while the controller holds its notification
/// lock: implementations may read [`ConnectionController::current_state`] but
/// must not call `connect`, `disconnect` or `dispose`.
pub trait ConnectionObserver: Send + Sync {
    fn on_state_change(&self, state: &ConnectionState);
}

impl<F> ConnectionObserver for F
where
    F: Fn(&ConnectionState) + Send + Sync,
{
    fn on_state_change(&self, state: &ConnectionState) {
        self(state)
    }
}

struct Attempt {
    generation: u64,
    token: CancellationToken,
    superseded: Arc<AtomicBool>,
}

impl Attempt {
    fn interruption(&self) -> ConnectionError {
        if self.superseded.load(Ordering::SeqCst) {
            ConnectionError::Superseded
        } else {
            ConnectionError::Cancelled
        }
    }
}

#[derive(Default)]
struct ControllerState {
    current: ConnectionState,
    generation: u64,
    in_flight: Option<(CancellationToken, Arc<AtomicBool>)>,
    observer: Option<Arc<dyn ConnectionObserver>>,
}

impl ControllerState {
    fn cancel_in_flight(&mut self, superseded: bool) {
        if let Some((token, flag)) = self.in_flight.take() {
            flag.store(superseded, Ordering::SeqCst);
            token.cancel();
        }
    }
}

pub struct ConnectionController {
    transport: Arc<dyn HandshakeTransport>,
    scheduler: Arc<dyn Scheduler>,
    stage_timeout: Option<Duration>,
    state: Mutex<ControllerState>,
    notify_lock: Mutex<()>,
}

impl ConnectionController {
    pub fn new(transport: Arc<dyn HandshakeTransport>, scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            transport,
            scheduler,
            stage_timeout: None,
            state: Mutex::new(ControllerState::default()),
            notify_lock: Mutex::new(()),
        }
    }

    /// Controller over the simulated transport and the tokio timer.
    pub fn simulated(timings: HandshakeTimings) -> Self {
        let scheduler: Arc<dyn Scheduler> = Arc::new(TokioScheduler);
        let transport = Arc::new(SimulatedTransport::new(scheduler.clone(), timings));
        Self::new(transport, scheduler)
    }

    pub fn with_stage_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.stage_timeout = timeout;
        self
    }

    pub fn with_observer(self, observer: Arc<dyn ConnectionObserver>) -> Self {
        lock(&self.state).observer = Some(observer);
        self
    }

    pub fn current_state(&self) -> ConnectionState {
        lock(&self.state).current.clone()
    }

    pub async fn connect(&self, config: ConnectionConfig) -> Result<(), ConnectionError> {
        let attempt = self.begin_attempt()?;

        let outcome = self.run_handshake(&attempt, &config).await;
        let (next, result) = match outcome {
            Ok(()) => (ConnectionState::Connected, Ok(())),
            Err(err) if err.is_policy_rejection() => return Err(err),
            Err(err) => (ConnectionState::Error(err.to_string()), Err(err)),
        };

        if self.finish_attempt(attempt.generation, next) {
            result
        } else {
            Err(attempt.interruption())
        }
    }

    pub fn disconnect(&self) {
        let _ordering = lock(&self.notify_lock);
        let observer = {
            let mut state = lock(&self.state);
            state.cancel_in_flight(false);
            state.generation += 1;
            state.current = ConnectionState::Disconnected;
            state.observer.clone()
        };
        if let Some(observer) = observer {
            observer.on_state_change(&ConnectionState::Disconnected);
        }
    }

    /// Cancels any running attempt, resets to `Disconnected` and detaches the
    /// observer without a final notification.
    pub fn dispose(&self) {
        let _ordering = lock(&self.notify_lock);
        let mut state = lock(&self.state);
        state.cancel_in_flight(false);
        state.generation += 1;
        state.current = ConnectionState::Disconnected;
        state.observer = None;
    }

    fn begin_attempt(&self) -> Result<Attempt, ConnectionError> {
        let _ordering = lock(&self.notify_lock);
        let (attempt, observer) = {
            let mut state = lock(&self.state);
            if state.current.is_connected() {
                return Err(ConnectionError::AlreadyConnected);
            }
            state.cancel_in_flight(true);
            state.generation += 1;

            let token = CancellationToken::new();
            let superseded = Arc::new(AtomicBool::new(false));
            state.in_flight = Some((token.clone(), superseded.clone()));
            state.current = ConnectionState::Connecting;

            let attempt = Attempt {
                generation: state.generation,
                token,
                superseded,
            };
            (attempt, state.observer.clone())
        };
        if let Some(observer) = observer {
            observer.on_state_change(&ConnectionState::Connecting);
        }
        Ok(attempt)
    }

    /// Writes the attempt's final state if it is still the current attempt.
    fn finish_attempt(&self, generation: u64, next: ConnectionState) -> bool {
        let _ordering = lock(&self.notify_lock);
        let observer = {
            let mut state = lock(&self.state);
            if state.generation != generation {
                return false;
            }
            state.in_flight = None;
            state.current = next.clone();
            state.observer.clone()
        };
        if let Some(observer) = observer {
            observer.on_state_change(&next);
        }
        true
    }

    async fn run_handshake(
        &self,
        attempt: &Attempt,
        config: &ConnectionConfig,
    ) -> Result<(), ConnectionError> {
        let mut machine = HandshakeMachine::start(config)?;

        while let Some(stage) = machine.current_stage() {
            if attempt.token.is_cancelled() {
                return Err(attempt.interruption());
            }

            let outcome = tokio::select! {
                biased;
                _ = attempt.token.cancelled() => return Err(attempt.interruption()),
                result = self.transport.run_stage(stage, config) => result,
                _ = stage_deadline(self.scheduler.as_ref(), self.stage_timeout) => {
                    Err(format!(
                        "timed out after {}ms",
                        self.stage_timeout.unwrap_or_default().as_millis()
                    ))
                }
            };

            machine.finish_stage(outcome)?;
        }

        Ok(())
    }
}

async fn stage_deadline(scheduler: &dyn Scheduler, timeout: Option<Duration>) {
    match timeout {
        Some(timeout) => scheduler.sleep(timeout).await,
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
