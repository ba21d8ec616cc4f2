//! Subscriber email delivery for Goal Line Report.
//!
//! Publishing a story produces one [`PublishNotice`] per active subscriber.
//! The [`Outbox`] queues them and a background dispatcher sends each one
//! through a [`MailTransport`]: SMTP via `lettre`, or the log in
//! development.
//!
//! [`PublishNotice`]: goalline_core::subscription::PublishNotice

pub mod config;
pub mod error;
pub mod outbox;
pub mod transport;

pub use config::{MailConfig, TransportKind};
pub use error::{Error, Result};
pub use outbox::{DeliveryPolicy, DispatcherHandle, Outbox, spawn_dispatcher};
pub use transport::{LogMailer, MailTransport, Mailer, SmtpMailer};
