use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::spec::HeaderList;
use super::timer::DurationTimer;
use super::{
    CancellationSignal, DurationUnit, RunCoordinator, RunMode, RunPhase, RunSpec, RunSpecMessage,
};
use crate::args::ShardingPolicy;
use crate::distributed::{SlaveCoordinator, SlaveRegistry};
use crate::error::{AppError, AppResult};
use crate::http::{PreparedRequest, RequestIssuer, RequestOutcome, build_control_client};

const TARGET: &str = "http://127.0.0.1:9/load";
const SETTLE: Duration = Duration::from_millis(30);

fn run_async_test<F>(future: F) -> AppResult<()>
where
    F: Future<Output = AppResult<()>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::validation(format!("Failed to build runtime: {}", err)))?;
    runtime.block_on(future)
}

/// Issuer that never touches the network and counts every call.
#[derive(Default)]
struct CountingIssuer {
    calls: AtomicU64,
}

impl CountingIssuer {
    fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl RequestIssuer for CountingIssuer {
    async fn issue(&self, _request: &PreparedRequest) -> RequestOutcome {
        self.calls.fetch_add(1, Ordering::Relaxed);
        tokio::time::sleep(Duration::from_millis(1)).await;
        RequestOutcome::Success {
            status: 200,
            elapsed: Duration::from_millis(1),
        }
    }
}

/// Issuer whose every request takes `SLOW_REQUEST` to complete.
struct SlowIssuer;

const SLOW_REQUEST: Duration = Duration::from_millis(200);

#[async_trait]
impl RequestIssuer for SlowIssuer {
    async fn issue(&self, _request: &PreparedRequest) -> RequestOutcome {
        tokio::time::sleep(SLOW_REQUEST).await;
        RequestOutcome::Success {
            status: 200,
            elapsed: SLOW_REQUEST,
        }
    }
}

fn coordinator<I: RequestIssuer + 'static>(issuer: &Arc<I>) -> AppResult<RunCoordinator> {
    let client = build_control_client(Duration::from_secs(1))?;
    let issuer: Arc<dyn RequestIssuer> = Arc::clone(issuer) as Arc<dyn RequestIssuer>;
    Ok(RunCoordinator::new(
        issuer,
        SlaveCoordinator::new(client, ShardingPolicy::Replicate),
        SlaveRegistry::new(),
    ))
}

#[test]
fn start_then_stop_leaves_idle() -> AppResult<()> {
    run_async_test(async {
        let issuer = Arc::new(CountingIssuer::default());
        let coordinator = coordinator(&issuer)?;

        let outcome = coordinator
            .start(RunSpec::new(TARGET).with_users(3))
            .await?;
        if outcome.mode != RunMode::Local || outcome.users != 3 {
            return Err(AppError::validation(format!(
                "Unexpected start outcome: {:?}",
                outcome
            )));
        }

        let running = coordinator.snapshot();
        if running.phase != RunPhase::Running || running.active_user_count != 3 {
            return Err(AppError::validation(format!(
                "Unexpected running state: {:?}",
                running
            )));
        }
        if running.run_id.as_deref() != Some(outcome.run_id.as_str()) {
            return Err(AppError::validation("Snapshot run id mismatch"));
        }
        if running.start_timestamp_ms <= 0 {
            return Err(AppError::validation("Start timestamp not recorded"));
        }

        if !coordinator.stop().await.stopped() {
            return Err(AppError::validation("Stop should report a stopped run"));
        }
        let stopped = coordinator.snapshot();
        if !stopped.is_idle() || stopped.active_user_count != 0 || stopped.run_id.is_some() {
            return Err(AppError::validation(format!(
                "Unexpected stopped state: {:?}",
                stopped
            )));
        }
        Ok(())
    })
}

#[test]
fn start_while_running_is_rejected_without_state_change() -> AppResult<()> {
    run_async_test(async {
        let issuer = Arc::new(CountingIssuer::default());
        let coordinator = coordinator(&issuer)?;
        coordinator
            .start(RunSpec::new(TARGET).with_users(2))
            .await?;
        let before = coordinator.snapshot();

        match coordinator
            .start(RunSpec::new(TARGET).with_users(7))
            .await
        {
            Ok(outcome) => {
                return Err(AppError::validation(format!(
                    "Second start should fail: {:?}",
                    outcome
                )));
            }
            Err(err) if err.is_already_running() => {}
            Err(err) => return Err(AppError::Run(err)),
        }

        let after = coordinator.snapshot();
        if after.phase != before.phase
            || after.active_user_count != 2
            || after.run_id != before.run_id
            || after.start_timestamp_ms != before.start_timestamp_ms
        {
            return Err(AppError::validation(format!(
                "State changed by rejected start: {:?} -> {:?}",
                before, after
            )));
        }
        drop(coordinator.stop().await);
        Ok(())
    })
}

#[test]
fn zero_users_is_an_invalid_spec() -> AppResult<()> {
    run_async_test(async {
        let issuer = Arc::new(CountingIssuer::default());
        let coordinator = coordinator(&issuer)?;

        match coordinator
            .start(RunSpec::new(TARGET).with_users(0))
            .await
        {
            Ok(_) => return Err(AppError::validation("Zero users should be rejected")),
            Err(err) if err.is_invalid_spec() => {}
            Err(err) => return Err(AppError::Run(err)),
        }
        if !coordinator.snapshot().is_idle() {
            return Err(AppError::validation("State changed by invalid spec"));
        }
        tokio::time::sleep(SETTLE).await;
        if issuer.calls() != 0 {
            return Err(AppError::validation("Requests issued for invalid spec"));
        }
        Ok(())
    })
}

#[test]
fn malformed_target_is_an_invalid_spec() -> AppResult<()> {
    run_async_test(async {
        let issuer = Arc::new(CountingIssuer::default());
        let coordinator = coordinator(&issuer)?;

        for target in ["", "not a url", "ftp://example.com/file"] {
            match coordinator.start(RunSpec::new(target)).await {
                Ok(_) => {
                    return Err(AppError::validation(format!(
                        "Target '{}' should be rejected",
                        target
                    )));
                }
                Err(err) if err.is_invalid_spec() => {}
                Err(err) => return Err(AppError::Run(err)),
            }
        }
        if !coordinator.snapshot().is_idle() {
            return Err(AppError::validation("State changed by invalid spec"));
        }
        Ok(())
    })
}

#[test]
fn stop_is_idempotent() -> AppResult<()> {
    run_async_test(async {
        let issuer = Arc::new(CountingIssuer::default());
        let coordinator = coordinator(&issuer)?;

        if coordinator.stop().await.stopped() {
            return Err(AppError::validation("Stop while idle should be a no-op"));
        }

        coordinator
            .start(RunSpec::new(TARGET).with_users(4))
            .await?;
        let (first, second) = tokio::join!(coordinator.stop(), coordinator.stop());
        if first.stopped() == second.stopped() {
            return Err(AppError::validation(
                "Exactly one concurrent stop should stop the run",
            ));
        }
        if coordinator.stop().await.stopped() {
            return Err(AppError::validation("Third stop should be a no-op"));
        }
        if !coordinator.snapshot().is_idle() {
            return Err(AppError::validation("Expected idle after stops"));
        }
        Ok(())
    })
}

#[test]
fn no_requests_are_issued_after_stop() -> AppResult<()> {
    run_async_test(async {
        let issuer = Arc::new(CountingIssuer::default());
        let coordinator = coordinator(&issuer)?;

        coordinator
            .start(RunSpec::new(TARGET).with_users(5))
            .await?;
        tokio::time::sleep(SETTLE).await;
        drop(coordinator.stop().await);
        if issuer.calls() == 0 {
            return Err(AppError::validation("Workers never issued a request"));
        }

        // Let requests already in flight finish.
        tokio::time::sleep(SETTLE).await;
        let settled = issuer.calls();
        tokio::time::sleep(SETTLE).await;
        if issuer.calls() != settled {
            return Err(AppError::validation(format!(
                "Requests issued after stop: {} -> {}",
                settled,
                issuer.calls()
            )));
        }
        if coordinator.snapshot().requests_sent < settled {
            return Err(AppError::validation("Counters lag the issued requests"));
        }
        Ok(())
    })
}

#[test]
fn stopped_run_does_not_count_into_the_next_run() -> AppResult<()> {
    run_async_test(async {
        let coordinator = coordinator(&Arc::new(SlowIssuer))?;

        coordinator
            .start(RunSpec::new(TARGET).with_users(5))
            .await?;
        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(coordinator.stop().await);

        coordinator
            .start(RunSpec::new(TARGET).with_users(1))
            .await?;
        // The first run's five requests complete while the second run has
        // none finished yet.
        tokio::time::sleep(Duration::from_millis(170)).await;
        let state = coordinator.snapshot();
        if state.requests_sent != 0 {
            return Err(AppError::validation(format!(
                "Second run counted {} requests before finishing one",
                state.requests_sent
            )));
        }

        tokio::time::sleep(Duration::from_millis(150)).await;
        let sent = coordinator.snapshot().requests_sent;
        if !(1..=2).contains(&sent) {
            return Err(AppError::validation(format!(
                "Second run should count only its own requests, got {}",
                sent
            )));
        }
        drop(coordinator.stop().await);
        Ok(())
    })
}

#[test]
fn duration_expiry_returns_to_idle_without_stop() -> AppResult<()> {
    run_async_test(async {
        let issuer = Arc::new(CountingIssuer::default());
        let coordinator = coordinator(&issuer)?;

        coordinator
            .start(
                RunSpec::new(TARGET)
                    .with_users(10)
                    .with_duration(1, DurationUnit::Seconds),
            )
            .await?;
        if coordinator.snapshot().phase != RunPhase::Running {
            return Err(AppError::validation("Expected running"));
        }

        let mut state_rx = coordinator.subscribe();
        tokio::time::timeout(
            Duration::from_secs(3),
            state_rx.wait_for(|state| state.is_idle()),
        )
        .await
        .map_err(|err| AppError::validation(format!("Run did not expire: {}", err)))?
        .map_err(|err| AppError::validation(format!("State channel closed: {}", err)))?;

        let settled = issuer.calls();
        tokio::time::sleep(SETTLE).await;
        tokio::time::sleep(SETTLE).await;
        if issuer.calls() > settled.saturating_add(10) {
            return Err(AppError::validation("Workers kept running after expiry"));
        }
        if coordinator.stop().await.stopped() {
            return Err(AppError::validation("Expired run should already be stopped"));
        }
        Ok(())
    })
}

#[test]
fn manual_stop_cancels_the_duration_timer() -> AppResult<()> {
    run_async_test(async {
        let issuer = Arc::new(CountingIssuer::default());
        let coordinator = coordinator(&issuer)?;

        coordinator
            .start(
                RunSpec::new(TARGET)
                    .with_users(1)
                    .with_duration(1, DurationUnit::Seconds),
            )
            .await?;
        drop(coordinator.stop().await);

        let second = coordinator
            .start(RunSpec::new(TARGET).with_users(1))
            .await?;
        tokio::time::sleep(Duration::from_millis(1300)).await;

        let state = coordinator.snapshot();
        if state.phase != RunPhase::Running
            || state.run_id.as_deref() != Some(second.run_id.as_str())
        {
            return Err(AppError::validation(format!(
                "Earlier run's timer stopped the newer run: {:?}",
                state
            )));
        }
        drop(coordinator.stop().await);
        Ok(())
    })
}

#[test]
fn signal_closes_exactly_once() -> AppResult<()> {
    run_async_test(async {
        let signal = CancellationSignal::new();
        let clone = signal.clone();
        if signal.is_closed() {
            return Err(AppError::validation("New signal should be open"));
        }

        let waiter = tokio::spawn(async move { clone.closed().await });
        if !signal.close() {
            return Err(AppError::validation("First close should report true"));
        }
        if signal.close() {
            return Err(AppError::validation("Second close should report false"));
        }
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .map_err(|err| AppError::validation(format!("closed() never resolved: {}", err)))??;
        Ok(())
    })
}

#[test]
fn timer_fires_once_and_disarm_cancels() -> AppResult<()> {
    run_async_test(async {
        let fired = Arc::new(AtomicU64::new(0));

        let mut timer = DurationTimer::new();
        let counter = Arc::clone(&fired);
        timer.arm_after(Duration::from_millis(10), move || async move {
            counter.fetch_add(1, Ordering::Relaxed);
        });
        if !timer.is_armed() {
            return Err(AppError::validation("Timer should be armed"));
        }
        tokio::time::sleep(SETTLE).await;
        if fired.load(Ordering::Relaxed) != 1 {
            return Err(AppError::validation("Timer should fire exactly once"));
        }
        if timer.disarm() {
            return Err(AppError::validation("Disarm after firing is a no-op"));
        }

        let counter = Arc::clone(&fired);
        timer.arm_after(Duration::from_millis(10), move || async move {
            counter.fetch_add(1, Ordering::Relaxed);
        });
        if !timer.disarm() {
            return Err(AppError::validation("Disarm should cancel a pending timer"));
        }
        tokio::time::sleep(SETTLE).await;
        if fired.load(Ordering::Relaxed) != 1 {
            return Err(AppError::validation("Disarmed timer fired"));
        }
        Ok(())
    })
}

#[test]
fn timer_without_unit_is_not_armed() -> AppResult<()> {
    run_async_test(async {
        let mut timer = DurationTimer::new();
        if timer.arm(5, DurationUnit::None, || async {}) {
            return Err(AppError::validation("No unit must not arm a timer"));
        }
        if timer.arm(0, DurationUnit::Seconds, || async {}) {
            return Err(AppError::validation("Zero amount must not arm a timer"));
        }
        if DurationUnit::Minutes.to_duration(2) != Some(Duration::from_secs(120)) {
            return Err(AppError::validation("Minutes conversion is off"));
        }
        Ok(())
    })
}

#[test]
fn run_spec_message_accepts_control_api_forms() -> AppResult<()> {
    let body = r#"{
        "target_url": "http://localhost:3000/api",
        "method": "post",
        "headers": "Content-Type: application/json; X-Trace: abc",
        "payload": "{\"k\":1}",
        "user_count": 12,
        "duration": 30,
        "format": "seconds"
    }"#;
    let message: RunSpecMessage = serde_json::from_str(body)?;
    let expected = HeaderList::Joined("Content-Type: application/json; X-Trace: abc".to_owned());
    if message.headers != expected {
        return Err(AppError::validation("Expected joined headers"));
    }

    let spec = message.into_spec()?;
    if spec.headers != vec!["Content-Type: application/json", "X-Trace: abc"] {
        return Err(AppError::validation(format!(
            "Unexpected headers: {:?}",
            spec.headers
        )));
    }
    if spec.user_count != 12 || spec.payload.as_ref() != b"{\"k\":1}" {
        return Err(AppError::validation("Unexpected user count or payload"));
    }
    if spec.time_limit() != Some(Duration::from_secs(30)) {
        return Err(AppError::validation("Unexpected time limit"));
    }
    PreparedRequest::from_spec(&spec)?;
    Ok(())
}

#[test]
fn wire_message_carries_binary_payload_and_user_share() -> AppResult<()> {
    let spec = RunSpec::new("http://localhost/upload")
        .with_method("PUT")
        .with_users(9)
        .with_payload(vec![0_u8, 159, 146, 150]);
    let message = RunSpecMessage::from_spec(&spec, 3);
    if message.payload_b64.is_none() || message.users != 3 {
        return Err(AppError::validation("Expected base64 payload and share"));
    }

    let decoded = message.into_spec()?;
    if decoded.payload != spec.payload || decoded.user_count != 3 || decoded.method != "PUT" {
        return Err(AppError::validation(format!(
            "Wire decode mismatch: {:?}",
            decoded
        )));
    }
    Ok(())
}

#[test]
fn invalid_base64_payload_is_rejected() -> AppResult<()> {
    let body = r#"{"url": "http://localhost/", "users": 1, "payload_b64": "!!!"}"#;
    let message: RunSpecMessage = serde_json::from_str(body)?;
    if message.into_spec().is_ok() {
        return Err(AppError::validation("Expected base64 error"));
    }
    Ok(())
}
