use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::Sampler;
use crate::persistence::StorageSink;
use crate::provider::{ContainerRuntime, MetricsProvider};
use crate::sample;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopped,
}

/// Starts a round every `interval`, the first one immediately.
pub struct Scheduler<P, R, S> {
    sampler: Arc<Sampler<P, R, S>>,
    interval: Duration,
}

impl<P, R, S> Scheduler<P, R, S>
where
    P: MetricsProvider,
    R: ContainerRuntime,
    S: StorageSink,
{
    pub fn new(sampler: Arc<Sampler<P, R, S>>, interval: Duration) -> Self {
        Self { sampler, interval }
    }

    /// Spawns the tick loop. Rounds are detached: a slow round never delays the
    /// next tick, and stopping does not cancel rounds already started.
    pub fn start(self) -> SchedulerHandle {
        let (state_tx, state_rx) = watch::channel(SchedulerState::Idle);
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            state_tx.send_replace(SchedulerState::Running);
            log::debug!("Scheduler running: interval={:?}", self.interval);

            loop {
                tokio::select! {
                    biased;
                    _ = stop_rx.wait_for(|stopped| *stopped) => break,
                    _ = ticker.tick() => {
                        let timestamp = sample::now();
                        log::trace!("Starting round: round={}", timestamp);
                        self.sampler.spawn_round(timestamp);
                    }
                }
            }

            state_tx.send_replace(SchedulerState::Stopped);
            log::debug!("Scheduler stopped");
        });

        SchedulerHandle {
            state: state_rx,
            stop: stop_tx,
            task,
        }
    }
}

pub struct SchedulerHandle {
    state: watch::Receiver<SchedulerState>,
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    /// Asks the loop to stop; no round starts after the loop observes it.
    pub fn stop(&self) {
        self.stop.send_replace(true);
    }

    /// Waits for the loop to exit. Call [`SchedulerHandle::stop`] first.
    pub async fn join(self) -> Result<(), tokio::task::JoinError> {
        self.task.await
    }
}
