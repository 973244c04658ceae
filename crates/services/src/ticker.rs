use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use quiz_core::countdown::RunId;

/// Period of the countdown tick source.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Background tick source for one countdown run.
///
/// Sends `run` over the channel once per period, starting one period after spawn, until
/// cancelled or dropped. The receiver feeds each tick to the engine, which discards
/// ticks for runs it has retired.
#[derive(Debug)]
pub struct Ticker {
    run: RunId,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl Ticker {
    /// Spawn on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn spawn(run: RunId, period: Duration, ticks: UnboundedSender<RunId>) -> Self {
        let token = CancellationToken::new();
        let stop = token.clone();

        let handle = tokio::spawn(async move {
            let mut timer = interval_at(Instant::now() + period, period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    () = stop.cancelled() => break,
                    _ = timer.tick() => {
                        if ticks.send(run).is_err() {
                            break;
                        }
                    }
                }
            }
            debug!(?run, "ticker stopped");
        });

        debug!(?run, period_ms = period.as_millis(), "ticker spawned");
        Self { run, token, handle }
    }

    #[must_use]
    pub fn run(&self) -> RunId {
        self.run
    }

    /// Stop sending ticks. Idempotent.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::countdown::Clock;
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn sends_run_id_once_per_period() {
        let run = Clock::new().start(30);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let ticker = Ticker::spawn(run, TICK_PERIOD, tx);

        tokio::time::sleep(Duration::from_millis(3_500)).await;
        let mut received = Vec::new();
        while let Ok(tick) = rx.try_recv() {
            received.push(tick);
        }
        assert_eq!(received, vec![run, run, run]);
        assert_eq!(ticker.run(), run);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_ticks() {
        let run = Clock::new().start(30);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let ticker = Ticker::spawn(run, TICK_PERIOD, tx);

        ticker.cancel();
        ticker.cancel();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
        assert!(ticker.is_finished());
    }
}
