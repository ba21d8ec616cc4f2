//! Ways of getting a [`PublishNotice`] to its recipient.

use std::future::Future;

use goalline_core::subscription::PublishNotice;
use lettre::{
  AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
  message::{Mailbox, header::ContentType},
  transport::smtp::authentication::Credentials,
};
use tracing::info;

use crate::{
  config::{MailConfig, TransportKind},
  error::{Error, Result},
};

/// Sends one notice. Called once per attempt; retrying is the caller's job.
pub trait MailTransport: Send + Sync + 'static {
  fn send(&self, notice: &PublishNotice) -> impl Future<Output = Result<()>> + Send;
}

fn mailbox(address: &str) -> Result<Mailbox> {
  address.parse().map_err(|source| Error::Address {
    address: address.to_owned(),
    source,
  })
}

// ─── SMTP ────────────────────────────────────────────────────────────────────

pub struct SmtpMailer {
  transport: AsyncSmtpTransport<Tokio1Executor>,
  from:      Mailbox,
}

impl SmtpMailer {
  /// Must be called inside a tokio runtime: the connection pool spawns its
  /// own maintenance task.
  pub fn new(config: &MailConfig) -> Result<Self> {
    let from = mailbox(&config.from)?;
    let mut builder = if config.tls {
      AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
    } else {
      AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
    };
    builder = builder.port(config.port);
    if let (Some(username), Some(password)) = (&config.username, &config.password) {
      builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
    }
    Ok(Self {
      transport: builder.build(),
      from,
    })
  }

  fn message(&self, notice: &PublishNotice) -> Result<Message> {
    let message = Message::builder()
      .from(self.from.clone())
      .to(mailbox(&notice.to)?)
      .subject(notice.subject.clone())
      .header(ContentType::TEXT_PLAIN)
      .body(notice.body.clone())?;
    Ok(message)
  }
}

impl MailTransport for SmtpMailer {
  async fn send(&self, notice: &PublishNotice) -> Result<()> {
    let message = self.message(notice)?;
    self.transport.send(message).await?;
    Ok(())
  }
}

// ─── Log ─────────────────────────────────────────────────────────────────────

/// Development transport: the message goes to the log and nowhere else.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

impl MailTransport for LogMailer {
  async fn send(&self, notice: &PublishNotice) -> Result<()> {
    info!(
      to = %notice.to,
      subject = %notice.subject,
      body = %notice.body,
      "mail (log transport)"
    );
    Ok(())
  }
}

// ─── Selection ───────────────────────────────────────────────────────────────

/// The transport picked by [`MailConfig::transport`].
pub enum Mailer {
  Smtp(SmtpMailer),
  Log(LogMailer),
}

impl Mailer {
  pub fn from_config(config: &MailConfig) -> Result<Self> {
    Ok(match config.transport {
      TransportKind::Smtp => Self::Smtp(SmtpMailer::new(config)?),
      TransportKind::Log => Self::Log(LogMailer),
    })
  }
}

impl MailTransport for Mailer {
  async fn send(&self, notice: &PublishNotice) -> Result<()> {
    match self {
      Self::Smtp(mailer) => mailer.send(notice).await,
      Self::Log(mailer) => mailer.send(notice).await,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn bad_from_address_is_rejected() {
    let config = MailConfig {
      transport: TransportKind::Smtp,
      tls: false,
      from: "not an address".into(),
      ..MailConfig::default()
    };
    assert!(matches!(SmtpMailer::new(&config), Err(Error::Address { .. })));
  }

  #[test]
  fn default_config_logs() {
    assert!(matches!(
      Mailer::from_config(&MailConfig::default()),
      Ok(Mailer::Log(_))
    ));
  }
}
