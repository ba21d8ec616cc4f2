//! In-process mail queue.
//!
//! [`Outbox`] is the [`Notifier`] handed to the rest of the application.
//! Every queued notice becomes its own delivery task, so a recipient whose
//! server keeps failing only delays itself.

use std::{sync::Arc, time::Duration};

use goalline_core::subscription::{Notifier, PublishNotice};
use tokio::{
  sync::mpsc,
  task::{JoinHandle, JoinSet},
};
use tracing::{error, info, warn};

use crate::{config::MailConfig, error::Result, transport::MailTransport};

#[derive(Debug, Clone, Copy)]
pub struct DeliveryPolicy {
  pub max_attempts: u32,
  pub retry_delay:  Duration,
}

impl From<&MailConfig> for DeliveryPolicy {
  fn from(config: &MailConfig) -> Self {
    Self {
      max_attempts: config.max_attempts.max(1),
      retry_delay:  config.retry_delay(),
    }
  }
}

/// Sending half of the queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Outbox {
  tx: mpsc::UnboundedSender<PublishNotice>,
}

impl Notifier for Outbox {
  fn enqueue(&self, notices: Vec<PublishNotice>) -> usize {
    let mut accepted = 0;
    for notice in notices {
      if self.tx.send(notice).is_err() {
        warn!("mail dispatcher has stopped; dropping remaining notices");
        break;
      }
      accepted += 1;
    }
    accepted
  }
}

pub struct DispatcherHandle {
  join: JoinHandle<()>,
}

impl DispatcherHandle {
  /// Wait for the dispatcher to drain. It finishes once every [`Outbox`]
  /// clone has been dropped and all in-flight deliveries are done.
  pub async fn finish(self) -> Result<()> {
    self.join.await?;
    Ok(())
  }
}

pub fn spawn_dispatcher<T: MailTransport>(
  transport: T,
  policy: DeliveryPolicy,
) -> (Outbox, DispatcherHandle) {
  let (tx, mut rx) = mpsc::unbounded_channel();
  let transport = Arc::new(transport);

  let join = tokio::spawn(async move {
    let mut jobs = JoinSet::new();
    loop {
      tokio::select! {
        notice = rx.recv() => match notice {
          Some(notice) => {
            jobs.spawn(deliver(Arc::clone(&transport), notice, policy));
          }
          None => break,
        },
        Some(_) = jobs.join_next(), if !jobs.is_empty() => {}
      }
    }
    while jobs.join_next().await.is_some() {}
    info!("mail dispatcher stopped");
  });

  (Outbox { tx }, DispatcherHandle { join })
}

/// Returns whether the notice was delivered.
async fn deliver<T: MailTransport>(
  transport: Arc<T>,
  notice: PublishNotice,
  policy: DeliveryPolicy,
) -> bool {
  let max_attempts = policy.max_attempts.max(1);
  for attempt in 1..=max_attempts {
    match transport.send(&notice).await {
      Ok(()) => {
        info!(to = %notice.to, story = %notice.story_id, attempt, "notice delivered");
        return true;
      }
      Err(err) if attempt < max_attempts => {
        warn!(to = %notice.to, attempt, error = %err, "notice delivery failed, retrying");
        tokio::time::sleep(policy.retry_delay).await;
      }
      Err(err) => {
        error!(to = %notice.to, attempt, error = %err, "notice undeliverable, giving up");
      }
    }
  }
  false
}
