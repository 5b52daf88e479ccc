//! Outbound email notifications.
//!
//! Wraps an authenticated SMTP relay and exposes the two templated
//! sends the habit tracker uses. Send failures are reported as a
//! boolean and logged; nothing here panics or propagates errors.

use std::time::Duration;

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{error, info, warn};

use crate::config::SmtpConfig;

const SMTP_HOST: &str = "smtp.gmail.com";
const SMTP_PORT: u16 = 587;
// Bounds both connection setup and the full send attempt.
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

pub struct Mailer {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from: Option<Mailbox>,
}

impl Mailer {
    pub fn from_config(smtp: Option<&SmtpConfig>) -> Self {
        let Some(smtp) = smtp else {
            error!("Missing required email configuration!");
            warn!("Email notifications will fail until GMAIL_USER and GMAIL_APP_PASSWORD are set");
            return Self::disabled();
        };
        Self::with_relay(smtp, SMTP_HOST, SMTP_PORT)
    }

    fn with_relay(smtp: &SmtpConfig, host: &str, port: u16) -> Self {
        let from: Mailbox = match smtp.user.parse() {
            Ok(from) => from,
            Err(e) => {
                error!("Invalid sender address {}: {}", smtp.user, e);
                return Self::disabled();
            }
        };

        match AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host) {
            Ok(builder) => {
                let transport = builder
                    .port(port)
                    .credentials(Credentials::new(smtp.user.clone(), smtp.password.clone()))
                    .timeout(Some(SEND_TIMEOUT))
                    .build();
                Self {
                    transport: Some(transport),
                    from: Some(from),
                }
            }
            Err(e) => {
                error!("Failed to build mail transport: {}", e);
                Self::disabled()
            }
        }
    }

    /// A mailer with no transport; every send returns false.
    pub fn disabled() -> Self {
        Self {
            transport: None,
            from: None,
        }
    }

    /// Startup connectivity self-check. Diagnostic logging only; the
    /// send functions stay available whatever the outcome.
    pub async fn verify(&self) {
        let Some(transport) = &self.transport else {
            return;
        };
        match transport.test_connection().await {
            Ok(true) => info!("Email server is ready"),
            Ok(false) => warn!("Email service connection failed: relay rejected the connection"),
            Err(e) => {
                warn!("Email service connection failed: {}", e);
                warn!("Email notifications will be unavailable. Check your network/firewall settings.");
            }
        }
    }

    pub async fn send_reminder_email(&self, to: &str, habit_name: &str, time: &str) -> bool {
        let subject = format!("Reminder: Time for your habit - {}", habit_name);
        let body = format!(
            r#"<div style="font-family: Arial, sans-serif; color: #333;">
  <h2>&#9200; Time for your habit!</h2>
  <p>Hey there! This is a friendly reminder that it's time for:</p>
  <h3 style="color: #A2BFFE;">{}</h3>
  <p>Scheduled for: {}</p>
  <p>Keep up the great work!</p>
</div>"#,
            habit_name, time
        );
        self.send(to, &subject, body).await
    }

    pub async fn send_missed_habit_email(&self, to: &str, habit_name: &str) -> bool {
        let subject = format!("Missed your habit? - {}", habit_name);
        let body = format!(
            r#"<div style="font-family: Arial, sans-serif; color: #333;">
  <h2>&#128075; Quick Check-in</h2>
  <p>We noticed you haven't marked your habit as complete:</p>
  <h3 style="color: #A2BFFE;">{}</h3>
  <p>Did you complete it? Don't forget to mark it in the app!</p>
  <p>Remember: consistency is key to building lasting habits.</p>
</div>"#,
            habit_name
        );
        self.send(to, &subject, body).await
    }

    /// One attempt, bounded by SEND_TIMEOUT. No retry, no queueing.
    async fn send(&self, to: &str, subject: &str, body: String) -> bool {
        let (Some(transport), Some(from)) = (&self.transport, &self.from) else {
            warn!("Email sending failed to {}: mail transport not configured", to);
            return false;
        };

        let recipient: Mailbox = match to.parse() {
            Ok(mailbox) => mailbox,
            Err(e) => {
                warn!("Email sending failed to {}: {}", to, e);
                return false;
            }
        };

        let email = match Message::builder()
            .from(from.clone())
            .to(recipient)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(body)
        {
            Ok(email) => email,
            Err(e) => {
                warn!("Email sending failed to {}: {}", to, e);
                return false;
            }
        };

        match tokio::time::timeout(SEND_TIMEOUT, transport.send(email)).await {
            Ok(Ok(_)) => {
                info!("Email sent successfully to {}", to);
                true
            }
            Ok(Err(e)) => {
                warn!("Email sending failed to {}: {}", to, e);
                false
            }
            Err(_) => {
                warn!(
                    "Email sending failed to {}: timed out after {:?}",
                    to, SEND_TIMEOUT
                );
                false
            }
        }
    }
}
