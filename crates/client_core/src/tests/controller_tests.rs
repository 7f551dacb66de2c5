use super::*;
use crate::scheduler::ManualClock;
use shared::domain::HandshakeStage;

use async_trait::async_trait;

#[derive(Default)]
struct RecordingObserver {
    seen: Mutex<Vec<ConnectionState>>,
}

impl RecordingObserver {
    fn seen(&self) -> Vec<ConnectionState> {
        lock(&self.seen).clone()
    }
}

impl ConnectionObserver for RecordingObserver {
    fn on_state_change(&self, state: &ConnectionState) {
        lock(&self.seen).push(state.clone());
    }
}

/// Transport whose stages never finish on their own.
struct StalledTransport;

#[async_trait]
impl HandshakeTransport for StalledTransport {
    async fn run_stage(
        &self,
        _stage: HandshakeStage,
        _config: &ConnectionConfig,
    ) -> Result<(), String> {
        std::future::pending().await
    }
}

struct Harness {
    clock: Arc<ManualClock>,
    observer: Arc<RecordingObserver>,
    controller: Arc<ConnectionController>,
}

fn harness() -> Harness {
    let clock = Arc::new(ManualClock::new());
    let observer = Arc::new(RecordingObserver::default());
    let transport = Arc::new(SimulatedTransport::new(
        clock.clone(),
        HandshakeTimings::default(),
    ));
    let controller = Arc::new(
        ConnectionController::new(transport, clock.clone()).with_observer(observer.clone()),
    );
    Harness {
        clock,
        observer,
        controller,
    }
}

fn good_config() -> ConnectionConfig {
    ConnectionConfig::new("http://x/mcp", "abcdefghij")
}

fn spawn_connect(
    controller: &Arc<ConnectionController>,
    config: ConnectionConfig,
) -> tokio::task::JoinHandle<Result<(), ConnectionError>> {
    let controller = controller.clone();
    tokio::spawn(async move { controller.connect(config).await })
}

/// Drives the manual clock through every stage of the default timings.
/// `prior_calls` is the number of sleeps issued before this attempt started.
async fn run_all_stages(clock: &ManualClock, prior_calls: usize) {
    for (i, stage) in HandshakeStage::ALL.into_iter().enumerate() {
        clock.wait_for_sleep_calls(prior_calls + i + 1).await;
        clock.advance(HandshakeTimings::default().for_stage(stage));
    }
}

#[tokio::test]
async fn starts_disconnected_without_notifying() {
    let h = harness();
    assert_eq!(h.controller.current_state(), ConnectionState::Disconnected);
    assert!(h.observer.seen().is_empty());
}

#[tokio::test]
async fn successful_connect_notifies_connecting_then_connected() {
    let h = harness();
    let task = spawn_connect(&h.controller, good_config());

    run_all_stages(&h.clock, 0).await;

    task.await.expect("join").expect("connect succeeds");
    assert_eq!(h.controller.current_state(), ConnectionState::Connected);
    assert_eq!(
        h.observer.seen(),
        vec![ConnectionState::Connecting, ConnectionState::Connected]
    );
    assert_eq!(
        h.clock.requested(),
        vec![
            Duration::from_millis(1000),
            Duration::from_millis(1000),
            Duration::from_millis(800),
            Duration::from_millis(500),
        ]
    );
}

#[tokio::test]
async fn stages_do_not_overlap() {
    let h = harness();
    let task = spawn_connect(&h.controller, good_config());

    h.clock.wait_for_sleepers(1).await;
    // Validation takes 1000ms; advancing 999ms must not start establishment.
    h.clock.advance(Duration::from_millis(999));
    tokio::task::yield_now().await;
    assert_eq!(h.clock.requested().len(), 1);
    assert_eq!(h.controller.current_state(), ConnectionState::Connecting);

    h.clock.advance(Duration::from_millis(1));
    h.clock.wait_for_sleep_calls(2).await;
    assert_eq!(h.clock.sleepers(), 1);

    h.controller.disconnect();
    assert_eq!(
        task.await.expect("join"),
        Err(ConnectionError::Cancelled)
    );
}

#[tokio::test]
async fn short_credential_fails_with_invalid_configuration() {
    let h = harness();
    let task = spawn_connect(&h.controller, ConnectionConfig::new("http://x/mcp", "short"));

    h.clock.wait_for_sleepers(1).await;
    h.clock.advance(Duration::from_millis(1000));

    let err = task.await.expect("join").expect_err("short credential");
    assert!(matches!(err, ConnectionError::ConfigurationInvalid { .. }));
    assert!(matches!(
        h.controller.current_state(),
        ConnectionState::Error(_)
    ));
    // Failure lands right after validation; establishment never ran.
    assert_eq!(h.clock.requested().len(), 1);
    assert_eq!(h.observer.seen().len(), 2);
}

#[tokio::test]
async fn invalid_endpoint_fails_during_establishment() {
    let h = harness();
    let task = spawn_connect(
        &h.controller,
        ConnectionConfig::new("http://invalid/mcp", "abcdefghij"),
    );

    h.clock.wait_for_sleep_calls(1).await;
    h.clock.advance(Duration::from_millis(1000));
    h.clock.wait_for_sleep_calls(2).await;
    h.clock.advance(Duration::from_millis(1000));

    let err = task.await.expect("join").expect_err("invalid endpoint");
    assert!(matches!(
        err,
        ConnectionError::HandshakeFailed {
            stage: HandshakeStage::Establish,
            ..
        }
    ));
    let state = h.controller.current_state();
    assert_eq!(state.error_reason(), Some(err.to_string().as_str()));
}

#[tokio::test]
async fn missing_credential_is_reported_and_reflected_in_state() {
    let h = harness();
    let err = h
        .controller
        .connect(ConnectionConfig::new("http://x/mcp", ""))
        .await
        .expect_err("missing credential");

    assert_eq!(
        err,
        ConnectionError::ConfigurationMissing {
            field: "credential"
        }
    );
    assert_eq!(
        h.observer.seen(),
        vec![
            ConnectionState::Connecting,
            ConnectionState::Error(err.to_string())
        ]
    );
    assert!(h.clock.requested().is_empty());
}

#[tokio::test]
async fn disconnect_always_lands_in_disconnected_with_one_notification() {
    let h = harness();

    h.controller.disconnect();
    assert_eq!(h.controller.current_state(), ConnectionState::Disconnected);
    assert_eq!(h.observer.seen(), vec![ConnectionState::Disconnected]);

    let task = spawn_connect(&h.controller, good_config());
    run_all_stages(&h.clock, 0).await;
    task.await.expect("join").expect("connect");

    h.controller.disconnect();
    assert_eq!(h.controller.current_state(), ConnectionState::Disconnected);
    assert_eq!(
        h.observer.seen(),
        vec![
            ConnectionState::Disconnected,
            ConnectionState::Connecting,
            ConnectionState::Connected,
            ConnectionState::Disconnected,
        ]
    );
}

#[tokio::test]
async fn disconnect_from_error_lands_in_disconnected_with_one_notification() {
    let h = harness();
    h.controller
        .connect(ConnectionConfig::new("", "abcdefghij"))
        .await
        .expect_err("missing endpoint");
    assert!(matches!(
        h.controller.current_state(),
        ConnectionState::Error(_)
    ));

    h.controller.disconnect();

    assert_eq!(h.controller.current_state(), ConnectionState::Disconnected);
    let seen = h.observer.seen();
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[0], ConnectionState::Connecting);
    assert!(matches!(seen[1], ConnectionState::Error(_)));
    assert_eq!(seen[2], ConnectionState::Disconnected);
}

#[tokio::test]
async fn disconnect_mid_handshake_cancels_without_stale_completion() {
    let h = harness();
    let task = spawn_connect(&h.controller, good_config());

    h.clock.wait_for_sleepers(1).await;
    h.controller.disconnect();

    assert_eq!(task.await.expect("join"), Err(ConnectionError::Cancelled));

    // Time passing after cancellation must not resurrect the attempt.
    h.clock.advance(Duration::from_secs(10));
    tokio::task::yield_now().await;

    assert_eq!(h.controller.current_state(), ConnectionState::Disconnected);
    assert_eq!(
        h.observer.seen(),
        vec![ConnectionState::Connecting, ConnectionState::Disconnected]
    );
    assert_eq!(h.clock.sleepers(), 0);
}

#[tokio::test]
async fn newer_connect_supersedes_in_flight_attempt() {
    let h = harness();
    let first = spawn_connect(&h.controller, good_config());
    h.clock.wait_for_sleepers(1).await;

    let second = spawn_connect(&h.controller, good_config());
    assert_eq!(first.await.expect("join"), Err(ConnectionError::Superseded));

    run_all_stages(&h.clock, 1).await;
    second.await.expect("join").expect("second connect");

    let seen = h.observer.seen();
    let connected = seen
        .iter()
        .filter(|state| **state == ConnectionState::Connected)
        .count();
    assert_eq!(connected, 1);
    assert_eq!(
        seen,
        vec![
            ConnectionState::Connecting,
            ConnectionState::Connecting,
            ConnectionState::Connected,
        ]
    );
}

#[tokio::test]
async fn connect_while_connected_is_rejected_as_no_op() {
    let h = harness();
    let task = spawn_connect(&h.controller, good_config());
    run_all_stages(&h.clock, 0).await;
    task.await.expect("join").expect("connect");

    let err = h
        .controller
        .connect(good_config())
        .await
        .expect_err("already connected");
    assert_eq!(err, ConnectionError::AlreadyConnected);
    assert_eq!(h.controller.current_state(), ConnectionState::Connected);
    assert_eq!(h.observer.seen().len(), 2);
}

#[tokio::test]
async fn retry_from_error_is_allowed() {
    let h = harness();
    h.controller
        .connect(ConnectionConfig::new("", "abcdefghij"))
        .await
        .expect_err("missing endpoint");
    assert!(matches!(
        h.controller.current_state(),
        ConnectionState::Error(_)
    ));

    let task = spawn_connect(&h.controller, good_config());
    run_all_stages(&h.clock, 0).await;
    task.await.expect("join").expect("retry succeeds");
    assert_eq!(h.controller.current_state(), ConnectionState::Connected);
}

#[tokio::test]
async fn stalled_stage_times_out_into_error() {
    let clock = Arc::new(ManualClock::new());
    let observer = Arc::new(RecordingObserver::default());
    let controller = Arc::new(
        ConnectionController::new(Arc::new(StalledTransport), clock.clone())
            .with_stage_timeout(Some(Duration::from_secs(5)))
            .with_observer(observer.clone()),
    );

    let task = spawn_connect(&controller, good_config());
    clock.wait_for_sleepers(1).await;
    clock.advance(Duration::from_secs(5));

    let err = task.await.expect("join").expect_err("timeout");
    assert_eq!(
        err,
        ConnectionError::HandshakeFailed {
            stage: HandshakeStage::ValidateCredential,
            reason: "timed out after 5000ms".into(),
        }
    );
    assert!(matches!(controller.current_state(), ConnectionState::Error(_)));
}

#[tokio::test]
async fn dispose_resets_and_detaches_observer() {
    let h = harness();
    let task = spawn_connect(&h.controller, good_config());
    h.clock.wait_for_sleepers(1).await;

    h.controller.dispose();
    assert_eq!(task.await.expect("join"), Err(ConnectionError::Cancelled));
    assert_eq!(h.controller.current_state(), ConnectionState::Disconnected);

    h.controller.disconnect();
    assert_eq!(h.observer.seen(), vec![ConnectionState::Connecting]);
}

#[tokio::test]
async fn closure_observer_receives_transitions() {
    let clock = Arc::new(ManualClock::new());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let observer = move |state: &ConnectionState| lock(&sink).push(state.to_string());
    let transport = Arc::new(SimulatedTransport::new(
        clock.clone(),
        HandshakeTimings::default(),
    ));
    let controller =
        ConnectionController::new(transport, clock).with_observer(Arc::new(observer));

    controller.disconnect();
    assert_eq!(lock(&seen).clone(), vec!["disconnected".to_string()]);
}
