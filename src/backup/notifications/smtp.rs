use crate::backup::function_path;
use crate::backup::notifications::Notification;
use crate::backup::redacted::RedactedString;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::{WithDebugObjectAndFnName, WithMsg};
use bon::Builder;
use function_name::named;
use getset::Getters;
use itertools::Itertools;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use validator::Validate;

/// SMTP account used to mail the run summary
///
/// The recipient is not part of the settings, it comes from the command line.
/// The password is a `RedactedString` so it never shows up in logs.
#[derive(Clone, Debug, Serialize, Deserialize, Validate, Builder, Getters)]
#[serde(deny_unknown_fields)]
#[getset(get = "pub")]
pub struct SmtpNotificationConfig {
    #[validate(length(min = 1))]
    #[builder(into)]
    host: String,
    #[builder(into)]
    smtp_mode: SmtpMode,
    #[builder(into)]
    from: Mailbox,
    #[builder(into)]
    username: String,
    #[validate(nested)]
    #[builder(into)]
    password: RedactedString,
}

/// How the connection to `host` is secured
///
/// `Ssl` wraps the connection in TLS from the first byte, `StartTls` upgrades
/// a plain connection, `Unsecured` is only meant for local relays and tests.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum SmtpMode {
    Unsecured,
    Ssl,
    StartTls,
}

impl SmtpNotificationConfig {
    fn message(&self, to: &Mailbox, topic: String, body: String) -> Result<Message> {
        Message::builder()
            .from(self.from.clone())
            .to(to.clone())
            .subject(topic)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(Error::from)
            .with_msg(format!("Cannot build mail from {} to {}", self.from, to))
    }

    fn transport(&self) -> Result<SmtpTransport> {
        let builder = match self.smtp_mode {
            SmtpMode::Unsecured => Ok(SmtpTransport::builder_dangerous(self.host.as_str())),
            SmtpMode::Ssl => SmtpTransport::relay(self.host.as_str()),
            SmtpMode::StartTls => SmtpTransport::starttls_relay(self.host.as_str()),
        }
        .map_err(Error::from)
        .with_msg(format!(
            "Cannot set up smtp client for {:?} ({:?})",
            self.host, self.smtp_mode
        ))?;

        let creds = Credentials::new(self.username.clone(), self.password.inner().clone());
        Ok(builder.credentials(creds).build())
    }
}

impl Notification for SmtpNotificationConfig {
    #[named]
    fn send<D1: Display, D2: Display>(&self, to: &Mailbox, topic: D1, msg: D2) -> Result<()> {
        tracing::info!("Mailing backup outcome to {} via {}", to, self.host);
        let response = self
            .message(to, topic.to_string(), msg.to_string())
            .and_then(|email| self.transport()?.send(&email).map_err(Error::from))
            .with_debug_object_and_fn_name(self.clone(), function_path!())?;

        if response.is_positive() {
            return Ok(());
        }
        Err(Error::from(
            response
                .message()
                .map(|line| Error::smtp_send_error(line.to_owned()))
                .collect_vec(),
        ))
    }
}
