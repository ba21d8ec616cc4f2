//! Background fetch, cleanup and health jobs.
//!
//! Each job runs on its own fixed interval in its own task. A failed run is
//! retried after `retry_delay_secs`, at most `max_attempts` times in total,
//! and then waits for the next tick. Every job fires once immediately on
//! start.

use std::{future::Future, sync::Arc, time::Duration};

use goalline_core::store::FeedStore;
use tokio::{
  sync::broadcast,
  task::JoinHandle,
  time::MissedTickBehavior,
};
use tracing::{error, info, warn};

use crate::{
  config::FeedsConfig,
  error::{Error, Result},
  fetcher::FeedFetcher,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Job {
  Fetch,
  Cleanup,
  Health,
}

impl Job {
  const ALL: [Job; 3] = [Job::Fetch, Job::Cleanup, Job::Health];

  fn name(self) -> &'static str {
    match self {
      Job::Fetch => "fetch",
      Job::Cleanup => "cleanup",
      Job::Health => "health",
    }
  }

  fn interval(self, config: &FeedsConfig) -> Duration {
    let secs = match self {
      Job::Fetch => config.fetch_interval_secs,
      Job::Cleanup => config.cleanup_interval_secs,
      Job::Health => config.health_interval_secs,
    };
    Duration::from_secs(secs.max(1))
  }

  async fn run<S: FeedStore>(self, fetcher: &FeedFetcher<S>) -> Result<()> {
    match self {
      Job::Fetch => {
        let summary = fetcher.fetch_all_active().await?;
        if summary.sources_processed > 0 && summary.sources_successful == 0 {
          return Err(Error::AllSourcesFailed(summary.sources_processed));
        }
      }
      Job::Cleanup => {
        fetcher.cleanup().await?;
      }
      Job::Health => {
        fetcher.health().await?;
      }
    }
    Ok(())
  }
}

#[derive(Debug, Clone, Copy)]
struct RetryPolicy {
  max_attempts: u32,
  delay:        Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunOutcome {
  Completed,
  Failed,
  Cancelled,
}

/// Owns the job tasks. Dropping the handle without [`stop`](Self::stop)
/// also ends them at their next wake-up.
pub struct SchedulerHandle {
  cancel_tx: broadcast::Sender<()>,
  joins:     Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
  pub async fn stop(self) -> Result<()> {
    let _ = self.cancel_tx.send(());
    for join in self.joins {
      join.await?;
    }
    Ok(())
  }
}

pub fn spawn_scheduler<S>(fetcher: Arc<FeedFetcher<S>>) -> SchedulerHandle
where
  S: FeedStore + 'static,
{
  let (cancel_tx, _) = broadcast::channel(1);
  let joins = Job::ALL
    .into_iter()
    .map(|job| spawn_job(job, Arc::clone(&fetcher), cancel_tx.subscribe()))
    .collect();
  SchedulerHandle { cancel_tx, joins }
}

fn spawn_job<S>(
  job: Job,
  fetcher: Arc<FeedFetcher<S>>,
  mut cancel_rx: broadcast::Receiver<()>,
) -> JoinHandle<()>
where
  S: FeedStore + 'static,
{
  let period = job.interval(fetcher.config());
  let policy = RetryPolicy {
    max_attempts: fetcher.config().max_attempts.max(1),
    delay:        fetcher.config().retry_delay(),
  };

  tokio::spawn(async move {
    info!(job = job.name(), every = ?period, "scheduled job started");
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
      tokio::select! {
        _ = cancel_rx.recv() => {
          info!(job = job.name(), "scheduler shutdown requested");
          break;
        }
        _ = ticker.tick() => {
          let outcome =
            run_with_retry(job.name(), policy, &mut cancel_rx, || job.run(&fetcher)).await;
          if outcome == RunOutcome::Cancelled {
            break;
          }
        }
      }
    }
  })
}

async fn run_with_retry<F, Fut>(
  name: &str,
  policy: RetryPolicy,
  cancel_rx: &mut broadcast::Receiver<()>,
  mut run: F,
) -> RunOutcome
where
  F: FnMut() -> Fut,
  Fut: Future<Output = Result<()>>,
{
  let mut attempt = 1;
  loop {
    match run().await {
      Ok(()) => return RunOutcome::Completed,
      Err(err) if attempt >= policy.max_attempts => {
        error!(job = name, attempt, error = %err, "job failed, giving up until next run");
        return RunOutcome::Failed;
      }
      Err(err) => {
        warn!(job = name, attempt, error = %err, retry_in = ?policy.delay, "job failed, retrying");
        tokio::select! {
          _ = cancel_rx.recv() => return RunOutcome::Cancelled,
          _ = tokio::time::sleep(policy.delay) => {}
        }
        attempt += 1;
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicU32, Ordering};

  use goalline_core::feed::SourceKind;

  use super::*;

  const POLICY: RetryPolicy = RetryPolicy {
    max_attempts: 3,
    delay:        Duration::from_millis(5),
  };

  #[tokio::test]
  async fn retries_until_success() {
    let (_tx, mut rx) = broadcast::channel(1);
    let calls = AtomicU32::new(0);

    let outcome = run_with_retry("test", POLICY, &mut rx, || {
      let n = calls.fetch_add(1, Ordering::SeqCst);
      async move {
        if n < 2 {
          Err(Error::UnknownSource(SourceKind::Guardian))
        } else {
          Ok(())
        }
      }
    })
    .await;

    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn gives_up_after_max_attempts() {
    let (_tx, mut rx) = broadcast::channel(1);
    let calls = AtomicU32::new(0);

    let outcome = run_with_retry("test", POLICY, &mut rx, || {
      calls.fetch_add(1, Ordering::SeqCst);
      async { Err(Error::UnknownSource(SourceKind::BbcSport)) }
    })
    .await;

    assert_eq!(outcome, RunOutcome::Failed);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn cancellation_interrupts_the_retry_wait() {
    let (tx, mut rx) = broadcast::channel(1);
    tx.send(()).unwrap();
    let policy = RetryPolicy {
      max_attempts: 3,
      delay:        Duration::from_secs(60),
    };

    let outcome = run_with_retry("test", policy, &mut rx, || async {
      Err(Error::UnknownSource(SourceKind::SkySports))
    })
    .await;

    assert_eq!(outcome, RunOutcome::Cancelled);
  }
}
