//! Debounced scheduling of scaler runs.
//!
//! A burst of `schedule_run` calls for one environment collapses into a
//! single armed timer; every later call replaces the armed delay (last
//! writer wins). When the timer elapses the run deregisters itself and
//! only then invokes the scaler, so a placement failure during the pass
//! can always arm a follow-up run.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error};

use crate::scaler::EnvironmentScaler;

/// Armed per-environment timers: environment id → signal path for
/// replacing the delay. At most one entry per environment.
type RunRegistry = Mutex<HashMap<String, mpsc::Sender<Duration>>>;

/// Coalesces repeated scaler-run requests into debounced passes.
///
/// Each armed run is its own background task waiting on either its timer
/// or its signal channel. The registry is the only shared state; its
/// critical sections are O(1) and never span a channel send.
pub struct ScheduleDispatcher {
    scaler: Arc<EnvironmentScaler>,
    runs: Arc<RunRegistry>,
}

impl ScheduleDispatcher {
    pub fn new(scaler: Arc<EnvironmentScaler>) -> Self {
        Self {
            scaler,
            runs: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Arm (or re-arm) a scaler run for the environment.
    ///
    /// If a run is already armed its delay is replaced; otherwise a timer
    /// task is spawned. The call returns once the request is accepted and
    /// never waits on the scale pass itself.
    pub async fn schedule_run(&self, environment_id: &str, delay: Duration) {
        loop {
            let sender = {
                let mut runs = self.runs.lock().await;
                match runs.get(environment_id) {
                    Some(sender) => sender.clone(),
                    None => {
                        let sender = self.spawn_run(environment_id, delay);
                        runs.insert(environment_id.to_string(), sender);
                        debug!(%environment_id, ?delay, "scaler run armed");
                        return;
                    }
                }
            };

            if sender.send(delay).await.is_ok() {
                return;
            }
            // The armed run fired between lookup and send; go around and
            // register a fresh one instead of dropping the request.
        }
    }

    /// The scaler behind this dispatcher, for force-runs.
    pub fn scaler(&self) -> &Arc<EnvironmentScaler> {
        &self.scaler
    }

    /// True iff a run is currently armed for the environment.
    pub async fn is_armed(&self, environment_id: &str) -> bool {
        let runs = self.runs.lock().await;
        runs.contains_key(environment_id)
    }

    /// Environments with an armed run.
    pub async fn armed_environments(&self) -> Vec<String> {
        let runs = self.runs.lock().await;
        runs.keys().cloned().collect()
    }

    fn spawn_run(&self, environment_id: &str, delay: Duration) -> mpsc::Sender<Duration> {
        let (sender, receiver) = mpsc::channel(1);
        let environment_id = environment_id.to_string();
        let scaler = Arc::clone(&self.scaler);
        let runs = Arc::clone(&self.runs);

        tokio::spawn(run_timer(environment_id, delay, receiver, scaler, runs));
        sender
    }
}

/// The armed-timer loop for one environment.
async fn run_timer(
    environment_id: String,
    mut delay: Duration,
    mut signal: mpsc::Receiver<Duration>,
    scaler: Arc<EnvironmentScaler>,
    runs: Arc<RunRegistry>,
) {
    loop {
        debug!(%environment_id, ?delay, "scaling in");

        tokio::select! {
            Some(new_delay) = signal.recv() => {
                delay = new_delay;
                debug!(%environment_id, ?delay, "new delay set");
            }
            _ = tokio::time::sleep(delay) => {
                // Deregister before scaling so a failure during the pass
                // can arm a follow-up run. Closing and draining the signal
                // path while the registry is locked keeps a racing re-arm
                // from being dropped: a delay that was accepted before the
                // close re-arms this run on a fresh channel; a send that
                // observes the close retries against the registry.
                let mut runs_guard = runs.lock().await;
                signal.close();
                if let Ok(new_delay) = signal.try_recv() {
                    let (sender, receiver) = mpsc::channel(1);
                    runs_guard.insert(environment_id.clone(), sender);
                    drop(runs_guard);
                    signal = receiver;
                    delay = new_delay;
                    debug!(%environment_id, ?delay, "new delay set");
                } else {
                    runs_guard.remove(&environment_id);
                    drop(runs_guard);
                    break;
                }
            }
        }
    }

    debug!(%environment_id, "scaling now");
    match scaler.scale(&environment_id).await {
        Ok(outcome) => {
            for err in &outcome.errors {
                error!(%environment_id, error = %err, "scaler run completed with error");
            }
        }
        Err(err) => {
            error!(%environment_id, error = %err, "scaler run failed");
        }
    }
}
