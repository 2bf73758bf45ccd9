//! Notification dispatch.
//!
//! The pipeline hands a rendered document to a `Notifier`; the SMTP
//! implementation is configured from the environment (`.env` is loaded by
//! `app::run`) and refuses to start when any required value is absent.

use std::time::Duration;

use lettre::message::{Mailbox, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::{debug, info};

use crate::error::AppError;

pub const ENV_SENDER: &str = "EMAIL_SENDER";
pub const ENV_PASSWORD: &str = "SMTP_KEY";
pub const ENV_RECEIVER: &str = "EMAIL_RECEIVER";
pub const ENV_SERVER: &str = "SMTP_SERVER";
pub const ENV_PORT: &str = "SMTP_PORT";

const DEFAULT_SERVER: &str = "smtp.gmail.com";
const DEFAULT_PORT: u16 = 587;
const IMPLICIT_TLS_PORT: u16 = 465;

/// Sink for rendered reports.
pub trait Notifier {
    fn send(&self, subject: &str, html_body: &str) -> Result<(), AppError>;
}

/// SMTP credentials and endpoints.
#[derive(Clone, PartialEq)]
pub struct MailSettings {
    pub sender: String,
    pub password: String,
    pub receiver: String,
    pub server: String,
    pub port: u16,
}

impl std::fmt::Debug for MailSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailSettings")
            .field("sender", &self.sender)
            .field("password", &"<redacted>")
            .field("receiver", &self.receiver)
            .field("server", &self.server)
            .field("port", &self.port)
            .finish()
    }
}

impl MailSettings {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup. Empty values count as absent.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let sender = get(ENV_SENDER);
        let password = get(ENV_PASSWORD);
        let receiver = get(ENV_RECEIVER);

        let (Some(sender), Some(password), Some(receiver)) =
            (sender.clone(), password.clone(), receiver.clone())
        else {
            let missing = [
                (ENV_SENDER, sender.is_none()),
                (ENV_PASSWORD, password.is_none()),
                (ENV_RECEIVER, receiver.is_none()),
            ]
            .into_iter()
            .filter(|(_, absent)| *absent)
            .map(|(key, _)| key.to_string())
            .collect();
            return Err(AppError::ConfigurationMissing(missing));
        };

        let server = get(ENV_SERVER).unwrap_or_else(|| DEFAULT_SERVER.to_string());
        let port = match get(ENV_PORT) {
            Some(raw) => raw
                .parse()
                .map_err(|_| {
                    AppError::invalid_config(format!(
                        "{ENV_PORT} must be a port number, got '{raw}'."
                    ))
                })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            sender,
            password,
            receiver,
            server,
            port,
        })
    }
}

/// Sends reports as HTML mail over SMTP (STARTTLS, or implicit TLS on 465).
#[derive(Debug)]
pub struct SmtpNotifier {
    settings: MailSettings,
    from: Mailbox,
    to: Mailbox,
    timeout: Duration,
}

impl SmtpNotifier {
    pub fn new(settings: MailSettings) -> Result<Self, AppError> {
        let from: Mailbox = settings
            .sender
            .parse()
            .map_err(|e| {
                AppError::invalid_config(format!("Invalid {ENV_SENDER} '{}': {e}", settings.sender))
            })?;
        let to: Mailbox = settings
            .receiver
            .parse()
            .map_err(|e| {
                AppError::invalid_config(format!(
                    "Invalid {ENV_RECEIVER} '{}': {e}",
                    settings.receiver
                ))
            })?;

        Ok(Self {
            settings,
            from,
            to,
            timeout: Duration::from_secs(30),
        })
    }

    fn transport(&self) -> Result<SmtpTransport, AppError> {
        let builder = if self.settings.port == IMPLICIT_TLS_PORT {
            SmtpTransport::relay(&self.settings.server)
        } else {
            SmtpTransport::starttls_relay(&self.settings.server)
        }
        .map_err(|e| {
            AppError::notify(format!(
                "Failed to set up SMTP relay '{}': {e}",
                self.settings.server
            ))
        })?;

        Ok(builder
            .port(self.settings.port)
            .credentials(Credentials::new(
                self.settings.sender.clone(),
                self.settings.password.clone(),
            ))
            .timeout(Some(self.timeout))
            .build())
    }
}

impl Notifier for SmtpNotifier {
    fn send(&self, subject: &str, html_body: &str) -> Result<(), AppError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body.to_string())
            .map_err(|e| AppError::notify(format!("Failed to build message: {e}")))?;

        debug!(server = %self.settings.server, port = self.settings.port, "sending report mail");
        self.transport()?
            .send(&message)
            .map_err(|e| AppError::notify(format!("SMTP delivery failed: {e}")))?;

        info!(receiver = %self.settings.receiver, "report mail sent");
        Ok(())
    }
}
